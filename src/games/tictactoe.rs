use std::fmt::{Display, Formatter};
use crate::utils::*;

// ---------- Reference engine: 3x3 tic-tac-toe ----------

/// One of the nine cells, numbered row-major from the top left.
/// The numbering is also the move alphabet (`val_to_move`) and the iteration order.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Debug)]
pub struct Square(u8);

impl Square {
    pub const ALL: [Square; 9] = [Square(0), Square(1), Square(2), Square(3), Square(4), Square(5), Square(6), Square(7), Square(8)];

    pub fn new(index: usize) -> Option<Square> {
        if index < 9 { Some(Square(index as u8)) } else { None }
    }
    pub fn index(self) -> usize { self.0 as usize }
    fn row(self) -> usize { self.index() / 3 }
    fn col(self) -> usize { self.index() % 3 }
    fn at(row: usize, col: usize) -> Square { Square((row * 3 + col) as u8) }

    /// Quarter turn clockwise: (row, col) -> (col, 2 - row)
    pub fn rotate(self) -> Square { Square::at(self.col(), 2 - self.row()) }
    /// Left-right reflection: (row, col) -> (row, 2 - col)
    pub fn mirror(self) -> Square { Square::at(self.row(), 2 - self.col()) }
}

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2], [3, 4, 5], [6, 7, 8],  // rows
    [0, 3, 6], [1, 4, 7], [2, 5, 8],  // columns
    [0, 4, 8], [2, 4, 6],             // diagonals
];

#[derive(Clone, Debug, Default)]
pub struct TicTacToe {
    board: [Option<Player>; 9],
    history: Vec<Square>,
}

impl TicTacToe {
    pub fn cell(&self, square: Square) -> Option<Player> {
        self.board[square.index()]
    }

    fn count(&self, player: Player) -> usize {
        self.board.iter().filter(|c| **c == Some(player)).count()
    }

    fn has_line(&self, player: Player) -> bool {
        LINES.iter().any(|line| line.iter().all(|&i| self.board[i] == Some(player)))
    }

    fn is_full(&self) -> bool {
        self.board.iter().all(|c| c.is_some())
    }

    /// Rebuild the board cell by cell through a square map (used by the symmetries)
    fn remap(&self, f: fn(Square) -> Square) -> Self {
        let mut board = [None; 9];
        for sq in Square::ALL {
            board[f(sq).index()] = self.board[sq.index()];
        }
        Self { board, history: self.history.iter().map(|&sq| f(sq)).collect() }
    }
}

impl Game for TicTacToe {
    /// Nine decimal digits, row-major: 1 empty, 2 first player, 3 second player
    type Key = u32;
    type Action = Square;

    fn new() -> Self {
        Self::default()
    }

    fn from_key(key: u32) -> Option<Self> {
        let mut board = [None; 9];
        let mut rest = key;
        for i in (0..9).rev() {
            board[i] = match rest % 10 {
                1 => None,
                2 => Some(Player::P1),
                3 => Some(Player::P2),
                _ => return None,
            };
            rest /= 10;
        }
        if rest != 0 { return None; }
        Some(Self { board, history: vec![] })
    }

    fn key(&self) -> u32 {
        self.board.iter().fold(0, |k, cell| k * 10 + match cell {
            None => 1,
            Some(Player::P1) => 2,
            Some(Player::P2) => 3,
        })
    }

    fn action_from_index(index: usize) -> Option<Square> {
        Square::new(index)
    }

    fn active_player(&self) -> Player {
        if self.count(Player::P1) == self.count(Player::P2) { Player::P1 } else { Player::P2 }
    }

    fn available_actions(&self) -> Vec<Square> {
        Square::ALL.into_iter().filter(|sq| self.cell(*sq).is_none()).collect()
    }

    fn play(&self, action: &Square) -> Self {
        debug_assert!(self.cell(*action).is_none(), "square {:?} is taken", action);
        let mut s = self.clone();
        s.board[action.index()] = Some(self.active_player());
        s.history.push(*action);
        s
    }

    fn history(&self) -> &[Square] {
        &self.history
    }

    fn is_win(&self) -> bool {
        self.has_line(self.active_player())
    }

    fn is_lose(&self) -> bool {
        self.has_line(self.active_player().other())
    }

    fn is_draw(&self) -> bool {
        self.is_full() && !self.has_line(Player::P1) && !self.has_line(Player::P2)
    }

    fn is_consistent(&self) -> bool {
        let (p1, p2) = (self.count(Player::P1), self.count(Player::P2));
        let counts_ok = p1 == p2 || p1 == p2 + 1;
        counts_ok && !self.is_win() && !(self.has_line(Player::P1) && self.has_line(Player::P2))
    }
}

impl Symmetric for TicTacToe {
    fn rotate(&self) -> Self { self.remap(Square::rotate) }
    fn mirror(&self) -> Self { self.remap(Square::mirror) }
    fn rotate_action(action: &Square) -> Square { action.rotate() }
    fn mirror_action(action: &Square) -> Square { action.mirror() }
}

impl Display for TicTacToe {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} {:?}", self.key(), self.active_player())?;
        for row in self.board.chunks(3) {
            let line: String = row.iter().map(|c| match c {
                Some(Player::P1) => 'o',
                Some(Player::P2) => 'x',
                None => '-',
            }).collect();
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
