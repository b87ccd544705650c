//! # State Space Enumeration
//!
//! Finds every reachable position by playing uniformly random games until a
//! known number of distinct keys has been seen. Coverage is probabilistic, so
//! every run carries a `Budget` and gives up with `CoverageTimeout` instead of
//! looping forever.

use std::collections::{BTreeMap, HashSet};
use std::time::{Duration, Instant};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use crate::error::{OracleError, Result};
use crate::utils::*;

/// Key -> visit count for one enumeration run. Only ever grows.
#[derive(Debug, Clone)]
pub struct DiscoverySet<K: KeyI> {
    visits: BTreeMap<K, u64>,
}

impl<K: KeyI> Default for DiscoverySet<K> {
    fn default() -> Self {
        Self { visits: BTreeMap::new() }
    }
}

impl<K: KeyI> DiscoverySet<K> {
    /// Count a visit. Returns true the first time a key is seen
    pub fn record(&mut self, key: K) -> bool {
        let count = self.visits.entry(key).or_insert(0);
        *count += 1;
        *count == 1
    }
    pub fn len(&self) -> usize { self.visits.len() }
    pub fn is_empty(&self) -> bool { self.visits.is_empty() }
    pub fn visits(&self, key: &K) -> u64 {
        self.visits.get(key).copied().unwrap_or(0)
    }
    /// Sorted, deduplicated keys
    pub fn keys(&self) -> Vec<K> {
        self.visits.keys().copied().collect()
    }
    pub fn into_keys(self) -> Vec<K> {
        self.visits.into_keys().collect()
    }
}

/// How long an enumeration may run. `None` means unbounded in that dimension
#[derive(Debug, Clone, Copy, Default)]
pub struct Budget {
    pub max_playouts: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl Budget {
    pub fn playouts(max_playouts: u64) -> Self {
        Self { max_playouts: Some(max_playouts), time_limit: None }
    }
}

pub struct Enumerator<R: Rng = StdRng> {
    rng: R,
    budget: Budget,
}

impl Enumerator<StdRng> {
    pub fn seeded(seed: u64, budget: Budget) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), budget)
    }
    pub fn from_entropy(budget: Budget) -> Self {
        Self::with_rng(StdRng::from_rng(&mut rand::rng()), budget)
    }
}

impl<R: Rng> Enumerator<R> {
    pub fn with_rng(rng: R, budget: Budget) -> Self {
        Self { rng, budget }
    }

    /// Play random games until exactly `target` distinct keys are known
    pub fn discover<G: Game>(&mut self, target: usize) -> Result<DiscoverySet<G::Key>> {
        let start = Instant::now();
        let mut set = DiscoverySet::default();
        let mut playouts: u64 = 0;
        while set.len() < target {
            let out_of_playouts = self.budget.max_playouts.is_some_and(|max| playouts >= max);
            let out_of_time = self.budget.time_limit.is_some_and(|limit| start.elapsed() >= limit);
            if out_of_playouts || out_of_time {
                return Err(OracleError::CoverageTimeout { playouts, discovered: set.len(), target });
            }
            self.playout::<G>(&mut set);
            playouts += 1;
            if playouts % LOG_EVERY == 0 {
                log::debug!("try:{} num:{}", playouts, set.len());
            }
        }
        if set.len() > target {
            return Err(OracleError::TargetExceeded { target, discovered: set.len() });
        }
        log::info!("discovered {} states in {} playouts ({:.2?})", set.len(), playouts, start.elapsed());
        Ok(set)
    }

    /// Sorted keys of the whole reachable state space
    pub fn enumerate<G: Game>(&mut self, target: usize) -> Result<Vec<G::Key>> {
        self.discover::<G>(target).map(DiscoverySet::into_keys)
    }

    /// One game from the initial position. Every position is recorded before the
    /// terminal check, so terminal positions are discovered too. Returns the number of new keys
    pub fn playout<G: Game>(&mut self, set: &mut DiscoverySet<G::Key>) -> usize {
        let mut game = G::new();
        let mut fresh = 0;
        loop {
            if set.record(game.key()) {
                fresh += 1;
            }
            if game.is_over() {
                break;
            }
            let actions = game.available_actions();
            match actions.choose(&mut self.rng) {
                Some(action) => game = game.play(action),
                None => break,
            }
        }
        fresh
    }
}

/// Exhaustive walk of the game graph (explicit stack, transpositions visited once).
/// Used to check a target count rather than trust it.
pub fn reachable_keys<G: Game>() -> Vec<G::Key> {
    let mut seen = HashSet::new();
    let mut stack = vec![G::new()];
    while let Some(game) = stack.pop() {
        if !seen.insert(game.key()) || game.is_over() {
            continue;
        }
        for action in game.available_actions() {
            stack.push(game.play(&action));
        }
    }
    let mut keys: Vec<G::Key> = seen.into_iter().collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tictactoe::TicTacToe;

    #[test]
    fn exhaustive_walk_finds_every_state() {
        let keys = reachable_keys::<TicTacToe>();
        assert_eq!(keys.len(), TARGET_STATES);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(keys.contains(&TicTacToe::new().key()));
    }

    #[test]
    fn playouts_grow_the_set_monotonically() {
        let mut e = Enumerator::seeded(7, Budget::default());
        let mut set = DiscoverySet::default();
        let mut last = 0;
        for _ in 0..500 {
            let fresh = e.playout::<TicTacToe>(&mut set);
            assert_eq!(set.len(), last + fresh);
            assert!(set.len() <= TARGET_STATES);
            last = set.len();
        }
        // the initial position is visited once per game
        assert_eq!(set.visits(&TicTacToe::new().key()), 500);
    }

    #[test]
    fn random_play_reaches_full_coverage() {
        let mut e = Enumerator::seeded(42, Budget::playouts(2_000_000));
        let keys = e.enumerate::<TicTacToe>(TARGET_STATES).unwrap();
        assert_eq!(keys, reachable_keys::<TicTacToe>());
    }

    #[test]
    fn tiny_budget_times_out_with_context() {
        let mut e = Enumerator::seeded(1, Budget::playouts(3));
        match e.enumerate::<TicTacToe>(TARGET_STATES) {
            Err(OracleError::CoverageTimeout { playouts, discovered, target }) => {
                assert_eq!(playouts, 3);
                assert!(discovered > 0 && discovered < TARGET_STATES);
                assert_eq!(target, TARGET_STATES);
            }
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[test]
    fn undersized_target_is_reported() {
        // a single game already finds more than two states
        let mut e = Enumerator::seeded(3, Budget::playouts(10));
        match e.enumerate::<TicTacToe>(2) {
            Err(OracleError::TargetExceeded { target: 2, discovered }) => assert!(discovered > 2),
            other => panic!("expected TargetExceeded, got {:?}", other),
        }
    }

    #[test]
    fn zero_time_limit_gives_up_immediately() {
        let budget = Budget { max_playouts: None, time_limit: Some(Duration::ZERO) };
        let mut e = Enumerator::seeded(5, budget);
        assert!(matches!(
            e.enumerate::<TicTacToe>(TARGET_STATES),
            Err(OracleError::CoverageTimeout { playouts: 0, .. })
        ));
    }
}
