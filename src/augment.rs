//! # Symmetry Augmentation
//!
//! Multiplies training data by the board symmetries. A trajectory is
//! transformed move by move and replayed, so each variant is a real game that
//! ends on the transformed position. Labels ride along unchanged: outcome and
//! score do not depend on how the board is turned.
//!
//! Only training data goes through here. Oracle labels always come from the
//! `oracle` module.

use std::collections::HashSet;
use crate::error::{OracleError, Result};
use crate::records::TrainingRecord;
use crate::store::merge_records;
use crate::symmetry::Symmetry;
use crate::utils::*;

/// One symmetric variant of a labelled trajectory
#[derive(Debug, Clone, PartialEq)]
pub struct Augmented<A, K> {
    pub symmetry: Symmetry,
    pub trajectory: Trajectory<A>,
    /// Key of the position the trajectory ends on
    pub key: K,
    pub score: Option<Score>,
    pub outcome: Option<Outcome>,
}

impl<A, K: Copy> Augmented<A, K> {
    pub fn record(&self) -> TrainingRecord<K> {
        TrainingRecord::new(self.key, self.score, self.outcome)
    }
}

/// Play a trajectory out from the initial position, checking every move
pub fn replay<G: Game>(trajectory: &[G::Action]) -> Result<G> {
    let mut game = G::new();
    for (ply, action) in trajectory.iter().enumerate() {
        if game.is_over() || !game.available_actions().contains(action) {
            return Err(OracleError::PreconditionViolation(format!(
                "move {:?} at ply {} is not legal in position {}", action, ply, game.key()
            )));
        }
        game = game.play(action);
    }
    Ok(game)
}

/// All distinct symmetric variants of a trajectory (1 to 8 of them; symmetric
/// trajectories map onto themselves and are emitted once)
pub fn expand<G: Symmetric>(trajectory: &[G::Action], score: Option<Score>, outcome: Option<Outcome>) -> Result<Vec<Augmented<G::Action, G::Key>>> {
    let mut seen = HashSet::new();
    let mut variants = vec![];
    for symmetry in Symmetry::all() {
        let moved: Vec<G::Action> = trajectory.iter().map(|a| symmetry.apply_action::<G>(a)).collect();
        if !seen.insert(moved.clone()) {
            continue;
        }
        let key = replay::<G>(&moved)?.key();
        variants.push(Augmented { symmetry, trajectory: moved, key, score, outcome });
    }
    Ok(variants)
}

/// Expand the game that led to `game`
pub fn expand_game<G: Symmetric>(game: &G, score: Option<Score>, outcome: Option<Outcome>) -> Result<Vec<Augmented<G::Action, G::Key>>> {
    expand::<G>(game.history(), score, outcome)
}

/// Records carry no trajectory, so the keyed position itself is transformed.
/// One record per distinct key in the orbit, the original first
pub fn expand_record<G: Symmetric>(record: &TrainingRecord<G::Key>) -> Result<Vec<TrainingRecord<G::Key>>> {
    let game = G::from_key(record.p).ok_or_else(|| {
        OracleError::PreconditionViolation(format!("key {} does not decode to a position", record.p))
    })?;
    let mut seen = HashSet::new();
    Ok(Symmetry::all()
        .map(|s| s.apply(&game).key())
        .filter(|key| seen.insert(*key))
        .map(|key| TrainingRecord::new(key, record.s, record.r))
        .collect())
}

/// Augment a whole dataset. Keys already present (directly or as an earlier
/// record's image) keep their first record
pub fn expand_records<G: Symmetric>(records: &[TrainingRecord<G::Key>]) -> Result<Vec<TrainingRecord<G::Key>>> {
    let mut out = Vec::with_capacity(records.len() * 8);
    out.extend(records.iter().cloned());
    for record in records {
        out.extend(expand_record::<G>(record)?);
    }
    let merged = merge_records(std::iter::once(out));
    log::info!("augmented {} records into {}", records.len(), merged.len());
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enumerate::reachable_keys;
    use crate::games::tictactoe::{Square, TicTacToe};
    use crate::oracle::Oracle;

    fn moves(indices: &[usize]) -> Vec<Square> {
        indices.iter().map(|&i| Square::new(i).unwrap()).collect()
    }

    #[test]
    fn asymmetric_game_has_eight_variants() {
        let trajectory = moves(&[0, 1, 5]);
        let end = replay::<TicTacToe>(&trajectory).unwrap();
        let variants = expand::<TicTacToe>(&trajectory, Some(0.3), Some(Outcome::Win)).unwrap();
        assert_eq!(variants.len(), 8);
        for v in &variants {
            assert_eq!(v.key, v.symmetry.apply(&end).key());
            assert_eq!(v.score, Some(0.3));
            assert_eq!(v.outcome, Some(Outcome::Win));
        }
        assert_eq!(variants[0].trajectory, trajectory);
    }

    #[test]
    fn symmetric_games_collapse() {
        assert_eq!(expand::<TicTacToe>(&[], None, None).unwrap().len(), 1);
        assert_eq!(expand::<TicTacToe>(&moves(&[4]), None, None).unwrap().len(), 1);
        assert_eq!(expand::<TicTacToe>(&moves(&[0]), None, None).unwrap().len(), 4);
    }

    #[test]
    fn illegal_trajectories_are_rejected() {
        assert!(matches!(replay::<TicTacToe>(&moves(&[0, 0])), Err(OracleError::PreconditionViolation(_))));
        // game already over after the top row
        assert!(replay::<TicTacToe>(&moves(&[0, 3, 1, 4, 2, 5])).is_err());
    }

    #[test]
    fn labels_stay_true_under_every_symmetry() {
        let mut oracle = Oracle::<TicTacToe>::default();
        for key in reachable_keys::<TicTacToe>() {
            let g = TicTacToe::from_key(key).unwrap();
            let value = oracle.solve(&g).unwrap();
            for s in Symmetry::all() {
                assert_eq!(oracle.solve(&s.apply(&g)).unwrap(), value, "key {} under {:?}", key, s);
            }
        }
    }

    #[test]
    fn records_expand_to_their_orbit() {
        let corner = TrainingRecord::new(211_111_111u32, Some(0.1), Some(Outcome::Draw));
        let images = expand_record::<TicTacToe>(&corner).unwrap();
        assert_eq!(images.len(), 4);
        assert_eq!(images[0], corner);
        assert!(images.iter().all(|r| r.s == Some(0.1) && r.r == Some(Outcome::Draw)));

        // the second record is an image of the first, so its own label is kept
        let other_corner = TrainingRecord::new(112_111_111u32, Some(0.9), Some(Outcome::Draw));
        let data = expand_records::<TicTacToe>(&[corner.clone(), other_corner.clone()]).unwrap();
        assert_eq!(data.len(), 4);
        assert!(data.contains(&other_corner));
    }
}
