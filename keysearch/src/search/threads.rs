use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use tracing::debug;

use super::matcher::Matcher;
use super::processor::FileProcessor;
use super::worker::Worker;
use crate::aggregator::ResultSink;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::WorkerSummary;
use crate::telemetry::Telemetry;

/// Runs one worker thread per chunk and blocks until all of them return.
///
/// The pool is sized to the number of chunks and `broadcast` runs the closure exactly
/// once on every pool thread, so thread `i` owns chunk `i` and nothing is stolen or
/// rebalanced.
pub(crate) fn run_threads(
    chunks: &[&[PathBuf]],
    matcher: &dyn Matcher,
    sink: &dyn ResultSink,
    telemetry: &dyn Telemetry,
    encoding_mode: EncodingMode,
) -> SearchResult<Vec<WorkerSummary>> {
    let pool = ThreadPoolBuilder::new()
        .num_threads(chunks.len())
        .thread_name(|i| format!("keysearch-worker-{}", i))
        .build()
        .map_err(|e| SearchError::worker_failed(0, format!("failed to start thread pool: {}", e)))?;

    debug!("Started {} worker threads", pool.current_num_threads());

    pool.broadcast(|ctx| {
        let id = ctx.index();
        let worker = Worker::new(
            id,
            FileProcessor::new(matcher, encoding_mode),
            sink,
            telemetry,
        );
        worker.run(chunks[id])
    })
    .into_iter()
    .collect()
}
