//! # Board Symmetries
//!
//! The dihedral group D4 built from the engine's two generators. An element
//! rotates the board `turns` quarter turns and then, if `mirrored`, reflects it.
//! All 8 elements are distinct, every composition lands back in the group and
//! every element has an inverse.

use crate::utils::*;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Symmetry {
    turns: u8,
    mirrored: bool,
}

impl Symmetry {
    pub const IDENTITY: Symmetry = Symmetry { turns: 0, mirrored: false };

    pub fn new(turns: u8, mirrored: bool) -> Self {
        Self { turns: turns % 4, mirrored }
    }

    /// Identity, the three rotations, then each of those followed by the mirror
    pub fn all() -> impl Iterator<Item = Symmetry> {
        [false, true].into_iter().flat_map(|mirrored| (0..4).map(move |turns| Symmetry { turns, mirrored }))
    }

    pub fn turns(self) -> u8 { self.turns }
    pub fn mirrored(self) -> bool { self.mirrored }

    /// Apply `self`, then `then`.
    /// A reflection reverses the sense of any rotation applied after it (M R = R^-1 M).
    pub fn compose(self, then: Symmetry) -> Symmetry {
        let turns = if self.mirrored {
            self.turns + 4 - then.turns
        } else {
            self.turns + then.turns
        };
        Symmetry::new(turns, self.mirrored ^ then.mirrored)
    }

    pub fn inverse(self) -> Symmetry {
        if self.mirrored {
            self  // reflections are involutions
        } else {
            Symmetry::new(4 - self.turns, false)
        }
    }

    pub fn apply<G: Symmetric>(self, game: &G) -> G {
        let mut g = game.clone();
        for _ in 0..self.turns {
            g = g.rotate();
        }
        if self.mirrored { g.mirror() } else { g }
    }

    pub fn apply_action<G: Symmetric>(self, action: &G::Action) -> G::Action {
        let mut a = action.clone();
        for _ in 0..self.turns {
            a = G::rotate_action(&a);
        }
        if self.mirrored { G::mirror_action(&a) } else { a }
    }
}

/// Keys of the 8 images of a position, in `Symmetry::all` order (repeats kept)
pub fn orbit<G: Symmetric>(game: &G) -> Vec<G::Key> {
    Symmetry::all().map(|s| s.apply(game).key()).collect()
}

/// Representative of a position's symmetry class: the smallest key in its orbit
pub fn canonical_key<G: Symmetric>(game: &G) -> G::Key {
    Symmetry::all()
        .map(|s| s.apply(game).key())
        .min()
        .unwrap_or_else(|| game.key())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::{Square, TicTacToe};
    use std::collections::HashSet;

    fn replay(moves: &[usize]) -> TicTacToe {
        moves.iter().fold(TicTacToe::new(), |g, &m| g.play(&Square::new(m).unwrap()))
    }

    #[test]
    fn group_has_eight_distinct_elements() {
        let all: HashSet<Symmetry> = Symmetry::all().collect();
        assert_eq!(all.len(), 8);
        // no two elements act the same on a board with no symmetry of its own
        let g = replay(&[0, 1, 5]);
        let images: HashSet<u32> = orbit(&g).into_iter().collect();
        assert_eq!(images.len(), 8);
    }

    #[test]
    fn composition_matches_sequential_application() {
        let g = replay(&[0, 1, 5, 6]);
        for a in Symmetry::all() {
            for b in Symmetry::all() {
                let sequential = b.apply(&a.apply(&g));
                let composed = a.compose(b).apply(&g);
                assert_eq!(sequential.key(), composed.key(), "{:?} then {:?}", a, b);
                for sq in Square::ALL {
                    let step = b.apply_action::<TicTacToe>(&a.apply_action::<TicTacToe>(&sq));
                    assert_eq!(step, a.compose(b).apply_action::<TicTacToe>(&sq));
                }
            }
        }
    }

    #[test]
    fn every_element_has_an_inverse() {
        for s in Symmetry::all() {
            assert_eq!(s.compose(s.inverse()), Symmetry::IDENTITY);
            assert_eq!(s.inverse().compose(s), Symmetry::IDENTITY);
        }
    }

    #[test]
    fn identity_is_neutral() {
        for s in Symmetry::all() {
            assert_eq!(Symmetry::IDENTITY.compose(s), s);
            assert_eq!(s.compose(Symmetry::IDENTITY), s);
        }
    }

    #[test]
    fn board_and_moves_transform_consistently() {
        let g = replay(&[2, 4, 3, 8]);
        for s in Symmetry::all() {
            let moved = g.history().iter().map(|a| s.apply_action::<TicTacToe>(a));
            let replayed = moved.fold(TicTacToe::new(), |p, a| p.play(&a));
            assert_eq!(replayed.key(), s.apply(&g).key());
        }
    }

    #[test]
    fn canonical_key_is_shared_by_the_orbit() {
        let g = replay(&[1, 4]);
        let c = canonical_key(&g);
        for s in Symmetry::all() {
            assert_eq!(canonical_key(&s.apply(&g)), c);
        }
        // the empty board is its own class
        assert_eq!(canonical_key(&TicTacToe::new()), 111_111_111);
    }
}
