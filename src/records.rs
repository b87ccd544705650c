//! # Records
//!
//! Typed versions of the json rows that move between runs. Labels are
//! validated when a shard is parsed, so nothing downstream sees sentinels.

use std::collections::BTreeMap;
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};
use crate::utils::*;

/// Outcome written by self-play before the game result is known
pub const UNRESOLVED: f64 = -99.0;

/// Raw unit of training data: a position with an optional network score and
/// an optional discrete outcome label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord<K> {
    pub p: K,
    #[serde(default)]
    pub s: Option<Score>,
    #[serde(default, deserialize_with = "label")]
    pub r: Option<Outcome>,
}

impl<K> TrainingRecord<K> {
    pub fn new(p: K, s: Option<Score>, r: Option<Outcome>) -> Self {
        Self { p, s, r }
    }
}

/// Accepts -1 / 0 / 1 (integer or float), null, and the unresolved sentinel
fn label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Outcome>, D::Error> {
    let Some(raw) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw == UNRESOLVED {
        return Ok(None);
    }
    if raw.fract() != 0.0 || raw.abs() > 1.0 {
        return Err(D::Error::custom(format!("outcome label must be -1, 0 or 1, got {}", raw)));
    }
    Outcome::try_from(raw as i8).map(Some).map_err(D::Error::custom)
}

/// Collects (key, score) pairs along one self-play game; labels them once the
/// result is known. This is how shard producers build the rows of a
/// `resolved*.json` file; the crate itself only consumes those files
#[derive(Debug, Clone)]
pub struct ReplayBuffer<K> {
    entries: Vec<(K, Score)>,
}

impl<K> Default for ReplayBuffer<K> {
    fn default() -> Self {
        Self { entries: vec![] }
    }
}

impl<K> ReplayBuffer<K> {
    pub fn push(&mut self, key: K, score: Score) {
        self.entries.push((key, score));
    }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// `result` is from the perspective of the player to move at the first entry;
    /// each following ply flips the sign
    pub fn overwrite_result(self, result: Outcome) -> Vec<TrainingRecord<K>> {
        let mut r = result;
        self.entries.into_iter().map(|(p, s)| {
            let record = TrainingRecord::new(p, Some(s), Some(r));
            r = -r;
            record
        }).collect()
    }
}

/// Key -> number of visits, as stored in `count*.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountShard<K: Ord> {
    counts: BTreeMap<K, u64>,
}

impl<K: Ord> Default for CountShard<K> {
    fn default() -> Self {
        Self { counts: BTreeMap::new() }
    }
}

impl<K: KeyI> CountShard<K> {
    /// Count one visit
    pub fn update(&mut self, key: K) {
        self.add(key, 1);
    }
    pub fn add(&mut self, key: K, count: u64) {
        *self.counts.entry(key).or_insert(0) += count;
    }
    pub fn get(&self, key: &K) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }
    pub fn len(&self) -> usize { self.counts.len() }
    pub fn is_empty(&self) -> bool { self.counts.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = (&K, &u64)> {
        self.counts.iter()
    }

    /// Drop rarely visited keys until at most `limit` remain. The cutoff starts
    /// at one visit and rises by one per round
    pub fn prune(&mut self, limit: usize) {
        let mut threshold = 1;
        while self.counts.len() > limit {
            self.counts.retain(|_, count| *count >= threshold);
            threshold += 1;
        }
    }
}

impl<K: KeyI> FromIterator<(K, u64)> for CountShard<K> {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut shard = CountShard::default();
        for (key, count) in iter {
            shard.add(key, count);
        }
        shard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_labels_are_validated() {
        let rows: Vec<TrainingRecord<u32>> = serde_json::from_str(
            r#"[{"p":1,"s":0.5,"r":1},{"p":2,"s":-0.1,"r":-1.0},{"p":3,"s":0.0,"r":-99},{"p":4},{"p":5,"s":null,"r":null}]"#
        ).unwrap();
        assert_eq!(rows[0], TrainingRecord::new(1, Some(0.5), Some(Outcome::Win)));
        assert_eq!(rows[1].r, Some(Outcome::Loss));
        assert_eq!(rows[2].r, None);
        assert_eq!(rows[3], TrainingRecord::new(4, None, None));
        assert_eq!(rows[4], TrainingRecord::new(5, None, None));
    }

    #[test]
    fn bad_labels_are_rejected() {
        for bad in [r#"[{"p":1,"r":2}]"#, r#"[{"p":1,"r":0.5}]"#, r#"[{"p":1,"r":"win"}]"#, r#"[{"s":0.1,"r":0}]"#] {
            assert!(serde_json::from_str::<Vec<TrainingRecord<u32>>>(bad).is_err(), "{}", bad);
        }
    }

    #[test]
    fn records_write_the_shard_shape() {
        let json = serde_json::to_string(&TrainingRecord::new(7u32, Some(0.25), Some(Outcome::Loss))).unwrap();
        assert_eq!(json, r#"{"p":7,"s":0.25,"r":-1}"#);
    }

    #[test]
    fn replay_buffer_alternates_the_result() {
        let mut buffer = ReplayBuffer::default();
        for (k, s) in [(10u32, 0.1), (20, -0.2), (30, 0.3)] {
            buffer.push(k, s);
        }
        let records = buffer.overwrite_result(Outcome::Win);
        let labels: Vec<_> = records.iter().map(|r| r.r).collect();
        assert_eq!(labels, vec![Some(Outcome::Win), Some(Outcome::Loss), Some(Outcome::Win)]);
        assert_eq!(records[1].s, Some(-0.2));
    }

    #[test]
    fn count_shards_use_string_keys() {
        let shard: CountShard<u32> = [(5, 2), (3, 1), (5, 1)].into_iter().collect();
        assert_eq!(shard.get(&5), 3);
        assert_eq!(serde_json::to_string(&shard).unwrap(), r#"{"3":1,"5":3}"#);
        let back: CountShard<u32> = serde_json::from_str(r#"{"3":1,"5":3}"#).unwrap();
        assert_eq!(back, shard);
    }

    #[test]
    fn pruning_drops_rare_keys_first() {
        let mut shard: CountShard<u32> = [(1, 1), (2, 2), (3, 3), (4, 3)].into_iter().collect();
        shard.prune(10);
        assert_eq!(shard.len(), 4);
        shard.prune(2);
        assert_eq!(shard.len(), 2);
        assert_eq!(shard.get(&3), 3);
        assert_eq!(shard.get(&1), 0);
        shard.prune(0);
        assert!(shard.is_empty());
    }
}
