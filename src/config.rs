//! # Configuration
//!
//! File locations and run budgets for the batch operations. Loaded from an
//! optional json file; anything missing falls back to the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::enumerate::Budget;
use crate::error::Result;
use crate::store::load_json;
use crate::utils::TARGET_STATES;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Distinct states enumeration must find (5478 for 3x3 tic-tac-toe)
    pub target_states: usize,
    pub max_playouts: Option<u64>,
    pub time_limit_secs: Option<f64>,
    /// Fixed seed for reproducible enumeration; fresh entropy when absent
    pub seed: Option<u64>,
    /// Where shards and the consolidated dataset live
    pub data_dir: PathBuf,
    pub all_pos_path: PathBuf,
    pub oracle_path: PathBuf,
    pub resolved_prefix: String,
    pub count_prefix: String,
    /// Directory holding the count shards
    pub count_dir: PathBuf,
    /// File name of the consolidated dataset inside `data_dir`
    pub consolidated_name: String,
    /// Count shards are pruned down to this many keys after a merge
    pub count_limit: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            target_states: TARGET_STATES,
            max_playouts: Some(10_000_000),
            time_limit_secs: None,
            seed: None,
            data_dir: PathBuf::from("data"),
            all_pos_path: PathBuf::from("all_pos.json"),
            oracle_path: PathBuf::from("oracle_result.json"),
            resolved_prefix: "resolved".to_string(),
            count_prefix: "count".to_string(),
            count_dir: PathBuf::from("."),
            consolidated_name: "const.json".to_string(),
            count_limit: 1_000_000,
        }
    }
}

impl OracleConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = load_json(path)?;
        log::debug!("loaded config from {:?}: {:?}", path, config);
        Ok(config)
    }

    pub fn budget(&self) -> Budget {
        Budget {
            max_playouts: self.max_playouts,
            time_limit: self.time_limit_secs.map(Duration::from_secs_f64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"seed": 9, "time_limit_secs": 1.5}"#).unwrap();
        let config = OracleConfig::load(&path).unwrap();
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.target_states, TARGET_STATES);
        assert_eq!(config.consolidated_name, "const.json");
        let budget = config.budget();
        assert_eq!(budget.time_limit, Some(Duration::from_millis(1500)));
        assert_eq!(budget.max_playouts, Some(10_000_000));
    }

    #[test]
    fn broken_config_is_a_decode_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ seed: ").unwrap();
        assert!(matches!(OracleConfig::load(&path), Err(crate::error::OracleError::Decode { .. })));
    }
}
