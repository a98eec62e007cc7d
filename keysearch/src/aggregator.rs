//! The result sink workers merge their per-file matches into.
//!
//! A worker calls [`ResultSink::merge_file`] once per file with every keyword that
//! file matched. Reading and matching happen before the call; only the append is
//! serialized. Two realizations exist:
//!
//! - [`SharedResults`]: the [`ResultMap`] sits behind one mutex in the caller's
//!   address space. Thread workers use it directly; the parent side of process
//!   workers replays each child's `matched` messages into it.
//! - `PipeChannel` (in `search::process`): inside a worker process the merge is
//!   serialized onto stdout and applied by the parent.
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;

use crate::errors::SearchResult;
use crate::results::ResultMap;

/// Destination for the matches found in one file
pub trait ResultSink: Send + Sync {
    /// Appends `path` to each keyword's match list in one critical section
    fn merge_file(&self, path: &Path, keywords: &[String]) -> SearchResult<()>;
}

/// [`ResultMap`] guarded by a mutex
#[derive(Debug, Default)]
pub struct SharedResults {
    inner: Mutex<ResultMap>,
}

/// Exclusive access to the shared map, held for one file's worth of appends
pub struct RecordGuard<'a> {
    map: MutexGuard<'a, ResultMap>,
}

impl RecordGuard<'_> {
    /// Appends `path` to the list for `keyword`
    pub fn record(&mut self, keyword: &str, path: &Path) {
        self.map.record(keyword, path);
    }
}

impl SharedResults {
    pub fn new(map: ResultMap) -> Self {
        Self {
            inner: Mutex::new(map),
        }
    }

    /// Acquires the exclusion primitive
    pub fn lock(&self) -> RecordGuard<'_> {
        RecordGuard {
            map: self.inner.lock(),
        }
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> ResultMap {
        self.inner.lock().clone()
    }

    /// Takes the map back once every writer is done
    pub fn into_inner(self) -> ResultMap {
        self.inner.into_inner()
    }
}

impl ResultSink for SharedResults {
    fn merge_file(&self, path: &Path, keywords: &[String]) -> SearchResult<()> {
        let mut guard = self.lock();
        for keyword in keywords {
            guard.record(keyword, path);
        }
        Ok(())
    }
}
