//! # Errors
//!
//! Local failures (a shard that will not decode) are collected and reported
//! without aborting a batch. Global failures (coverage timeouts, positions
//! outside the game graph) abort the operation and carry enough context to
//! retry or diagnose.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, OracleError>;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// Malformed or truncated shard content
    #[error("decode error in {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Enumeration ran out of budget before finding every state
    #[error("coverage timeout after {playouts} playouts: found {discovered} of {target} states")]
    CoverageTimeout { playouts: u64, discovered: usize, target: usize },

    /// Enumeration found more states than the configured target
    #[error("discovered {discovered} states but the target is {target}")]
    TargetExceeded { target: usize, discovered: usize },

    /// Position is not part of the legal game graph
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// Another process holds the store lock. `holder` is the pid written in the
    /// lock file; if that process no longer exists the file is stale and can be removed
    #[error("merge lock {path:?} is held by pid {}; remove the file if that process is gone",
        .holder.map_or_else(|| "unknown".to_string(), |pid| pid.to_string()))]
    Locked { path: PathBuf, holder: Option<u32> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
