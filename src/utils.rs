use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::ops::Neg;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

// ---------- Tune-ables ---------- //
pub const TARGET_STATES: usize = 5478;  // Reachable tic-tac-toe positions (terminal ones included)
pub const SCORE_THRESHOLD: f64 = 0.2;  // |score| above this counts as a decisive network estimate
pub const LOG_EVERY: u64 = 10_000;  // Playouts between enumeration progress lines

// ---------- Basic types (renamed for pretty) ---------- //
pub type Score = f64;
pub type Trajectory<A> = Vec<A>;

/// Two player, alternating, no chance nodes
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Player { P1, P2 }

impl Player {
    #[inline] pub fn other(self) -> Player {
        match self { Player::P1 => Player::P2, Player::P2 => Player::P1 }
    }
}

/// Game theoretic value from the perspective of the player to move.
/// Serialized as -1 / 0 / 1.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Outcome { Loss, Draw, Win }

impl Neg for Outcome {
    type Output = Outcome;
    fn neg(self) -> Outcome {
        match self { Outcome::Loss => Outcome::Win, Outcome::Draw => Outcome::Draw, Outcome::Win => Outcome::Loss }
    }
}

impl From<Outcome> for i8 {
    fn from(outcome: Outcome) -> i8 {
        match outcome { Outcome::Loss => -1, Outcome::Draw => 0, Outcome::Win => 1 }
    }
}

impl TryFrom<i8> for Outcome {
    type Error = String;
    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Outcome::Loss),
            0 => Ok(Outcome::Draw),
            1 => Ok(Outcome::Win),
            v => Err(format!("outcome must be -1, 0 or 1, got {}", v)),
        }
    }
}

// ---------- Traits the game must provide ----------
/// Properties we want all game actions to have (Ord gives a reproducible iteration order)
pub trait ActionI: Clone + Eq + Hash + Ord + Debug {}
impl<T: Clone + Eq + Hash + Ord + Debug> ActionI for T {}
/// Properties we want all state keys to have. Keys are written to and read back from json
pub trait KeyI: Copy + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned {}
impl<T: Copy + Eq + Hash + Ord + Debug + Display + Serialize + DeserializeOwned> KeyI for T {}

/// The state algebra of a finite, deterministic, two player zero-sum game.
/// Everything in this crate only talks to the board through this trait.
pub trait Game: Sized + Clone + Debug {
    /// Canonical identity of a position (configuration + side to move)
    type Key: KeyI;
    /// The actions that could possibly be taken
    type Action: ActionI;

    /// The initial position
    fn new() -> Self;
    /// Rebuild a position from its key. None if the key does not decode to a board
    fn from_key(key: Self::Key) -> Option<Self>;
    /// Identity of this position. Transpositions share a key
    fn key(&self) -> Self::Key;
    /// Map the raw move alphabet (0..9 for a 3x3 board) onto actions
    fn action_from_index(index: usize) -> Option<Self::Action>;

    /// The player whose turn it is
    fn active_player(&self) -> Player;
    /// Legal actions for the active player, in their stable total order
    fn available_actions(&self) -> Vec<Self::Action>;
    /// Create a new copy of the game after this specified action is taken
    fn play(&self, action: &Self::Action) -> Self;
    /// Moves played since the initial position (empty for positions built from a key)
    fn history(&self) -> &[Self::Action];

    /// The player to move has already won (never true inside the legal game graph)
    fn is_win(&self) -> bool;
    /// The previous move ended the game against the player to move
    fn is_lose(&self) -> bool;
    /// No moves left and nobody won
    fn is_draw(&self) -> bool;
    fn is_over(&self) -> bool {
        self.is_lose() || self.is_draw()
    }
    /// Whether this position could appear in legal play (piece counts, flags)
    fn is_consistent(&self) -> bool {
        !self.is_win()
    }
    /// Outcome decided by the board alone, if the game is over
    fn terminal_outcome(&self) -> Option<Outcome> {
        if self.is_lose() { Some(Outcome::Loss) }
        else if self.is_draw() { Some(Outcome::Draw) }
        else if self.is_win() { Some(Outcome::Win) }
        else { None }
    }
}

/// Games whose board has the symmetries of a square. The two generators are
/// enough to build the whole dihedral group (see `symmetry`).
pub trait Symmetric: Game {
    /// Quarter turn of the board (history is remapped too)
    fn rotate(&self) -> Self;
    /// Reflection of the board (history is remapped too)
    fn mirror(&self) -> Self;
    fn rotate_action(action: &Self::Action) -> Self::Action;
    fn mirror_action(action: &Self::Action) -> Self::Action;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_negation_is_an_involution() {
        for o in [Outcome::Loss, Outcome::Draw, Outcome::Win] {
            assert_eq!(-(-o), o);
        }
        assert_eq!(-Outcome::Win, Outcome::Loss);
        assert_eq!(-Outcome::Draw, Outcome::Draw);
    }

    #[test]
    fn outcome_order_matches_value() {
        assert!(Outcome::Loss < Outcome::Draw);
        assert!(Outcome::Draw < Outcome::Win);
        assert_eq!([Outcome::Draw, Outcome::Win, Outcome::Loss].iter().max(), Some(&Outcome::Win));
    }

    #[test]
    fn outcome_json_is_numeric() {
        assert_eq!(serde_json::to_string(&Outcome::Loss).unwrap(), "-1");
        assert_eq!(serde_json::from_str::<Outcome>("1").unwrap(), Outcome::Win);
        assert!(serde_json::from_str::<Outcome>("2").is_err());
    }
}
