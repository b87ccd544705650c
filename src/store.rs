//! # Record Store
//!
//! Consolidates shards written by many independent runs into one keyed
//! dataset. Merging is first-come-first-kept for records and additive for
//! visit counts.
//!
//! The store directory is a shared resource: every consolidation holds an
//! exclusive lock file for its duration, and every file it writes is committed
//! with a temp-file-then-rename so readers never observe a half written file.
//! A successful merge consumes its source shards. A shard that fails to decode
//! is reported and left where it is.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use crate::error::{OracleError, Result};
use crate::records::{CountShard, TrainingRecord};
use crate::utils::*;

const LOCK_NAME: &str = ".merge.lock";

/// Sum visit counts key by key. Keys missing from a shard count as zero
pub fn merge_counts<K: KeyI>(shards: impl IntoIterator<Item = CountShard<K>>) -> CountShard<K> {
    let mut merged = CountShard::default();
    for shard in shards {
        for (&key, &count) in shard.iter() {
            merged.add(key, count);
        }
    }
    merged
}

/// Keep the first record seen for every key, in shard then record order
pub fn merge_records<K: KeyI>(shards: impl IntoIterator<Item = Vec<TrainingRecord<K>>>) -> Vec<TrainingRecord<K>> {
    let mut seen = HashSet::new();
    shards.into_iter()
        .flatten()
        .filter(|record| seen.insert(record.p))
        .collect()
}

/// Read a json artifact. Parse failures become `Decode` errors naming the file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| OracleError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write a json artifact atomically (temp file in the same directory, then rename)
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;
    let tmp = NamedTempFile::new_in(&dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Held for the duration of a consolidation; releases the lock file on drop.
/// The file holds the pid of the process that took it. A process that dies
/// mid-merge leaves it behind; once that pid is gone the file can be deleted by hand
#[derive(Debug)]
pub struct MergeLock {
    path: PathBuf,
}

impl Drop for MergeLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("could not release {:?}: {}", self.path, e);
        }
    }
}

/// What a consolidation did
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Shards that were read and merged
    pub merged: Vec<PathBuf>,
    /// Per-shard failures; these shards were left untouched
    pub skipped: Vec<OracleError>,
    /// Distinct keys in the consolidated output
    pub keys: usize,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Take the single-writer lock, failing if another merge holds it
    pub fn lock(&self) -> Result<MergeLock> {
        let path = self.dir.join(LOCK_NAME);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let lock = MergeLock { path };
                write!(file, "{}", std::process::id())?;
                Ok(lock)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let holder = holder_pid(&path);
                Err(OracleError::Locked { path, holder })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `<prefix>*.json` files in the store, in name order
    pub fn shards(&self, prefix: &str) -> Result<Vec<PathBuf>> {
        let mut paths = vec![];
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let matches = path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix) && n.ends_with(".json"));
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Decode every shard, collecting failures instead of stopping on them
    fn read_all<T: DeserializeOwned>(&self, paths: Vec<PathBuf>, report: &mut MergeReport) -> Vec<T> {
        let mut decoded = vec![];
        for path in paths {
            match load_json::<T>(&path) {
                Ok(value) => {
                    decoded.push(value);
                    report.merged.push(path);
                }
                Err(e) => {
                    log::warn!("skipping shard: {}", e);
                    report.skipped.push(e);
                }
            }
        }
        decoded
    }

    /// Merge every `<prefix>*.json` record shard into `output` and delete the
    /// shards that made it in. Records already in `output` take precedence, so
    /// running this again on the same inputs changes nothing
    pub fn consolidate_records<K: KeyI>(&self, prefix: &str, output: &str) -> Result<MergeReport> {
        let _lock = self.lock()?;
        let output_path = self.dir.join(output);
        let mut report = MergeReport::default();

        let mut shards: Vec<Vec<TrainingRecord<K>>> = vec![];
        if output_path.exists() {
            shards.push(load_json(&output_path)?);
        }
        let paths = self.shards(prefix)?.into_iter().filter(|p| *p != output_path).collect();
        shards.extend(self.read_all::<Vec<TrainingRecord<K>>>(paths, &mut report));

        let merged = merge_records(shards);
        report.keys = merged.len();
        save_json(&output_path, &merged)?;
        for path in &report.merged {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("merged {:?} but could not remove it: {}", path, e);
            }
        }
        log::info!("consolidated {} shards into {:?} ({} keys, {} skipped)",
            report.merged.len(), output_path, report.keys, report.skipped.len());
        Ok(report)
    }

    /// Sum every `<prefix>*.json` count shard and overwrite each of them with the
    /// merged totals, pruned down to at most `limit` keys
    pub fn consolidate_counts<K: KeyI>(&self, prefix: &str, limit: usize) -> Result<(CountShard<K>, MergeReport)> {
        let _lock = self.lock()?;
        let mut report = MergeReport::default();
        let paths = self.shards(prefix)?;
        let mut merged = merge_counts(self.read_all::<CountShard<K>>(paths, &mut report));
        if merged.len() > limit {
            let before = merged.len();
            merged.prune(limit);
            log::info!("pruned merged counts from {} to {} keys", before, merged.len());
        }
        report.keys = merged.len();
        for path in &report.merged {
            save_json(path, &merged)?;
        }
        log::info!("merged {} count shards ({} keys, {} skipped)",
            report.merged.len(), report.keys, report.skipped.len());
        Ok((merged, report))
    }

    /// How often each position occurs across the `<prefix>*.json` record shards.
    /// Read only: shards are neither locked nor consumed
    pub fn position_counts<K: KeyI>(&self, prefix: &str) -> Result<(CountShard<K>, MergeReport)> {
        let mut report = MergeReport::default();
        let paths = self.shards(prefix)?;
        let mut counts = CountShard::default();
        for shard in self.read_all::<Vec<TrainingRecord<K>>>(paths, &mut report) {
            for record in shard {
                counts.update(record.p);
            }
        }
        report.keys = counts.len();
        Ok((counts, report))
    }
}

/// Pid written into an existing lock file, if it can be read
fn holder_pid(path: &Path) -> Option<u32> {
    let mut text = String::new();
    File::open(path).ok()?.read_to_string(&mut text).ok()?;
    text.trim().parse().ok()
}
