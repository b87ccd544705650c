//! # Outcome Oracle
//!
//! Exact game values by negamax backward induction:
//! `value(P) = -max over moves m of value(P.next(m))`.
//!
//! Values are always from the perspective of the player to move. The only
//! cutoff is the one-sided one at `Win`, which is safe because nothing beats it.
//! Native recursion depth is bounded by the number of empty cells (9 here);
//! `solve_iterative` gives the same answers with an explicit stack for deeper games.

use std::collections::{BTreeMap, HashMap};
use serde::{Deserialize, Serialize};
use crate::error::{OracleError, Result};
use crate::utils::*;

/// Terminal checks shared by every solver. `Ok(None)` means keep searching
fn settle<G: Game>(game: &G) -> Result<Option<Outcome>> {
    if !game.is_consistent() || game.is_win() {
        return Err(OracleError::PreconditionViolation(format!(
            "position {} is not part of the game graph", game.key()
        )));
    }
    if game.is_lose() {
        return Ok(Some(Outcome::Loss));
    }
    if game.is_draw() {
        return Ok(Some(Outcome::Draw));
    }
    Ok(None)
}

fn no_moves<G: Game>(game: &G) -> OracleError {
    OracleError::PreconditionViolation(format!(
        "position {} is not terminal but has no legal moves", game.key()
    ))
}

/// Plain negamax, no memory
pub fn negamax<G: Game>(game: &G) -> Result<Outcome> {
    if let Some(outcome) = settle(game)? {
        return Ok(outcome);
    }
    let mut best: Option<Outcome> = None;
    for action in game.available_actions() {
        let value = -negamax(&game.play(&action))?;
        if value == Outcome::Win {
            return Ok(value);
        }
        best = best.max(Some(value));
    }
    best.ok_or_else(|| no_moves(game))
}

/// Negamax with an explicit stack of frames instead of native recursion
pub fn solve_iterative<G: Game>(game: &G) -> Result<Outcome> {
    struct Frame<G: Game> {
        game: G,
        actions: Vec<G::Action>,
        next: usize,
        best: Option<Outcome>,
    }
    fn open<G: Game>(game: G) -> Result<std::result::Result<Outcome, Frame<G>>> {
        Ok(match settle(&game)? {
            Some(outcome) => Ok(outcome),
            None => {
                let actions = game.available_actions();
                Err(Frame { game, actions, next: 0, best: None })
            }
        })
    }

    let mut stack = match open(game.clone())? {
        Ok(outcome) => return Ok(outcome),
        Err(frame) => vec![frame],
    };
    // value of the child just finished, from the child's perspective
    let mut returned: Option<Outcome> = None;
    while let Some(frame) = stack.last_mut() {
        if let Some(child) = returned.take() {
            let value = -child;
            frame.best = frame.best.max(Some(value));
            if value == Outcome::Win {
                frame.next = frame.actions.len();
            }
        }
        if frame.next < frame.actions.len() {
            let child = frame.game.play(&frame.actions[frame.next]);
            frame.next += 1;
            match open(child)? {
                Ok(outcome) => returned = Some(outcome),
                Err(child_frame) => stack.push(child_frame),
            }
            continue;
        }
        let done = stack.pop().ok_or_else(|| no_moves(game))?;
        returned = Some(done.best.ok_or_else(|| no_moves(&done.game))?);
    }
    returned.ok_or_else(|| no_moves(game))
}

/// Memoizing solver. The memo is keyed by position identity, so transpositions are solved once
pub struct Oracle<G: Game> {
    memo: HashMap<G::Key, Outcome>,
}

impl<G: Game> Default for Oracle<G> {
    fn default() -> Self {
        Self { memo: HashMap::new() }
    }
}

impl<G: Game> Oracle<G> {
    pub fn solve(&mut self, game: &G) -> Result<Outcome> {
        let key = game.key();
        if let Some(outcome) = self.memo.get(&key) {
            return Ok(*outcome);
        }
        let outcome = match settle(game)? {
            Some(outcome) => outcome,
            None => {
                let mut best: Option<Outcome> = None;
                for action in game.available_actions() {
                    let value = -self.solve(&game.play(&action))?;
                    best = best.max(Some(value));
                    if value == Outcome::Win {
                        break;
                    }
                }
                best.ok_or_else(|| no_moves(game))?
            }
        };
        self.memo.insert(key, outcome);
        Ok(outcome)
    }

    /// Solve a position given only its key
    pub fn solve_key(&mut self, key: G::Key) -> Result<Outcome> {
        let game = G::from_key(key).ok_or_else(|| {
            OracleError::PreconditionViolation(format!("key {} does not decode to a position", key))
        })?;
        self.solve(&game)
    }

    /// Number of distinct positions solved so far
    pub fn solved(&self) -> usize {
        self.memo.len()
    }
}

/// Key -> exact outcome, total over the keys it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRecord<K: KeyI> {
    outcomes: BTreeMap<K, Outcome>,
}

/// One row of `oracle_result.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleEntry<K> {
    pub p: K,
    pub r: Outcome,
}

impl<K: KeyI> OracleRecord<K> {
    pub fn get(&self, key: &K) -> Option<Outcome> {
        self.outcomes.get(key).copied()
    }
    pub fn len(&self) -> usize { self.outcomes.len() }
    pub fn is_empty(&self) -> bool { self.outcomes.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&K, &Outcome)> {
        self.outcomes.iter()
    }
    /// Rows in key order
    pub fn entries(&self) -> Vec<OracleEntry<K>> {
        self.outcomes.iter().map(|(&p, &r)| OracleEntry { p, r }).collect()
    }
}

impl<K: KeyI> FromIterator<OracleEntry<K>> for OracleRecord<K> {
    fn from_iter<I: IntoIterator<Item = OracleEntry<K>>>(iter: I) -> Self {
        Self { outcomes: iter.into_iter().map(|e| (e.p, e.r)).collect() }
    }
}

/// Label every key. Covers exactly the given keys (duplicates collapse)
pub fn build_oracle<G: Game>(keys: &[G::Key]) -> Result<OracleRecord<G::Key>> {
    let mut oracle = Oracle::<G>::default();
    let mut outcomes = BTreeMap::new();
    for &key in keys {
        outcomes.insert(key, oracle.solve_key(key)?);
    }
    log::info!("labelled {} keys ({} positions searched)", outcomes.len(), oracle.solved());
    Ok(OracleRecord { outcomes })
}

// ---------- Network estimate validation ---------- //

/// Threshold a continuous network estimate into a discrete outcome
pub fn classify_score(score: Score) -> Outcome {
    if score > SCORE_THRESHOLD {
        Outcome::Win
    } else if score < -SCORE_THRESHOLD {
        Outcome::Loss
    } else {
        Outcome::Draw
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport<K> {
    pub total: usize,
    pub agree: usize,
    /// (key, predicted, oracle)
    pub mismatches: Vec<(K, Outcome, Outcome)>,
    /// Estimates for keys the oracle does not know
    pub unknown: Vec<K>,
}

impl<K> ValidationReport<K> {
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.agree as f64 / self.total as f64 }
    }
}

/// Compare network estimates against the oracle. Terminal positions are judged
/// by the board itself rather than the estimate
pub fn validate<G: Game>(record: &OracleRecord<G::Key>, estimates: &[(G::Key, Score)]) -> Result<ValidationReport<G::Key>> {
    let mut report = ValidationReport { total: 0, agree: 0, mismatches: vec![], unknown: vec![] };
    for &(key, score) in estimates {
        let Some(truth) = record.get(&key) else {
            report.unknown.push(key);
            continue;
        };
        let game = G::from_key(key).ok_or_else(|| {
            OracleError::PreconditionViolation(format!("key {} does not decode to a position", key))
        })?;
        let predicted = game.terminal_outcome().unwrap_or_else(|| classify_score(score));
        report.total += 1;
        if predicted == truth {
            report.agree += 1;
        } else {
            report.mismatches.push((key, predicted, truth));
        }
    }
    Ok(report)
}
