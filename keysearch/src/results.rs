/// This module implements the search result types.
///
/// # Ownership of Results
///
/// A run builds exactly one [`ResultMap`]. While workers are running it is owned by
/// the aggregator and only reachable through a lock (or, for process workers, through
/// the pipe each child writes to). Once every worker has joined, the coordinator takes
/// the map back by value and hands it to the caller, so no reference to the shared
/// state outlives the run:
/// ```rust,ignore
/// let shared = SharedResults::new(ResultMap::with_keywords(keywords));
/// // ... workers record into &shared ...
/// let results: ResultMap = shared.into_inner(); // exclusive ownership again
/// ```
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ConcurrencyModel;

/// Keyword to matching file paths
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultMap {
    entries: BTreeMap<String, Vec<PathBuf>>,
}

impl ResultMap {
    /// Creates a map with one empty match list per keyword
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: keywords
                .into_iter()
                .map(|k| (k.into(), Vec::new()))
                .collect(),
        }
    }

    /// Appends `path` to the match list of `keyword`
    pub fn record(&mut self, keyword: &str, path: &Path) {
        match self.entries.get_mut(keyword) {
            Some(paths) => paths.push(path.to_path_buf()),
            None => {
                self.entries
                    .insert(keyword.to_string(), vec![path.to_path_buf()]);
            }
        }
    }

    /// Matches for one keyword
    pub fn get(&self, keyword: &str) -> Option<&[PathBuf]> {
        self.entries.get(keyword).map(Vec::as_slice)
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (keyword, file) pairs recorded
    pub fn total_matches(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Every (keyword, file) pair, independent of match-list order
    pub fn pairs(&self) -> BTreeSet<(String, PathBuf)> {
        self.entries
            .iter()
            .flat_map(|(k, paths)| paths.iter().map(move |p| (k.clone(), p.clone())))
            .collect()
    }

    /// True when both maps hold the same keywords and the same pairs
    pub fn same_matches(&self, other: &ResultMap) -> bool {
        self.keywords().eq(other.keywords()) && self.pairs() == other.pairs()
    }

    /// Sorts each match list so output is stable across runs
    pub fn sort_paths(&mut self) {
        for paths in self.entries.values_mut() {
            paths.sort();
        }
    }
}

/// Outcome of scanning one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResult {
    /// The path to the file
    pub path: PathBuf,
    /// Size of the decoded text in bytes
    pub bytes: usize,
    /// Keywords found in the file, at most once each
    pub keywords: Vec<String>,
}

/// Per-worker counters returned when a worker finishes its chunk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub scanned: usize,
    pub failed: usize,
    pub matches: usize,
}

impl WorkerSummary {
    pub fn merge(&mut self, other: WorkerSummary) {
        self.scanned += other.scanned;
        self.failed += other.failed;
        self.matches += other.matches;
    }
}

/// Timing and counters for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub model: ConcurrencyModel,
    pub workers: usize,
    /// Wall-clock time from just before spawn to just after the last join
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    pub files_scanned: usize,
    pub files_failed: usize,
}

/// Everything a run hands back to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchReport {
    pub results: ResultMap,
    pub run: RunReport,
}

impl SearchReport {
    /// Report for a run that spawned no workers
    pub fn empty(results: ResultMap, model: ConcurrencyModel, workers: usize) -> Self {
        Self {
            results,
            run: RunReport {
                model,
                workers,
                elapsed: Duration::ZERO,
                files_scanned: 0,
                files_failed: 0,
            },
        }
    }
}

mod duration_millis {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64() * 1000.0)
    }
}
