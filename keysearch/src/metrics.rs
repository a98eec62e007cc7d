use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Cumulative counters shared by the pattern matcher and the log telemetry
#[derive(Debug, Clone)]
pub struct SearchMetrics {
    // File processing metrics
    files_scanned: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
    files_not_found: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    keyword_hits: Arc<AtomicU64>,

    // Pattern cache metrics
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl SearchMetrics {
    /// Creates a new SearchMetrics instance
    pub fn new() -> Self {
        Self {
            files_scanned: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
            files_not_found: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            keyword_hits: Arc::new(AtomicU64::new(0)),
            cache_hits: Arc::new(AtomicU64::new(0)),
            cache_misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a successfully scanned file
    pub fn record_file_scanned(&self, bytes: u64, matched: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.keyword_hits.fetch_add(matched, Ordering::Relaxed);
        debug!("Scanned {} bytes, total: {} bytes", bytes, total);
    }

    /// Records a file that could not be read
    pub fn record_file_failed(&self, not_found: bool) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
        if not_found {
            self.files_not_found.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a pattern cache lookup
    pub fn record_cache_operation(&self, hit: bool) {
        if hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }

    /// Gets a snapshot of every counter
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            files_not_found: self.files_not_found.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            keyword_hits: self.keyword_hits.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Search stats:\n\
             Files scanned/failed (not found): {}/{} ({})\n\
             Bytes read: {}\n\
             Keyword hits: {}\n\
             Pattern cache hits/misses: {}/{}",
            stats.files_scanned,
            stats.files_failed,
            stats.files_not_found,
            stats.bytes_read,
            stats.keyword_hits,
            stats.cache_hits,
            stats.cache_misses
        );
    }
}

impl Default for SearchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`SearchMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_scanned: u64,
    pub files_failed: u64,
    pub files_not_found: u64,
    pub bytes_read: u64,
    pub keyword_hits: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}
