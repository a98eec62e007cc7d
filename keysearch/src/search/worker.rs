use std::path::PathBuf;
use tracing::debug;

use super::processor::FileProcessor;
use crate::aggregator::ResultSink;
use crate::errors::SearchResult;
use crate::results::WorkerSummary;
use crate::telemetry::Telemetry;

/// Scans one chunk of the file list, in order, against every keyword.
///
/// A file that cannot be read is reported to telemetry and skipped; it never stops
/// the chunk. A worker only returns an error that is not tied to one file, such as
/// a sink failure, which means the results can no longer be delivered at all.
pub struct Worker<'a> {
    id: usize,
    processor: FileProcessor<'a>,
    sink: &'a dyn ResultSink,
    telemetry: &'a dyn Telemetry,
}

impl<'a> Worker<'a> {
    pub fn new(
        id: usize,
        processor: FileProcessor<'a>,
        sink: &'a dyn ResultSink,
        telemetry: &'a dyn Telemetry,
    ) -> Self {
        Self {
            id,
            processor,
            sink,
            telemetry,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Processes every file of `chunk`
    pub fn run(&self, chunk: &[PathBuf]) -> SearchResult<WorkerSummary> {
        debug!(worker = self.id, "Worker starting with {} files", chunk.len());
        let mut summary = WorkerSummary::default();

        for path in chunk {
            match self.processor.process_file(path) {
                Ok(found) => {
                    if !found.keywords.is_empty() {
                        self.sink.merge_file(path, &found.keywords)?;
                    }
                    self.telemetry
                        .file_scanned(self.id, path, found.bytes, found.keywords.len());
                    summary.scanned += 1;
                    summary.matches += found.keywords.len();
                }
                Err(e) if e.is_file_level() => {
                    self.telemetry.file_failed(self.id, path, &e);
                    summary.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        debug!(
            worker = self.id,
            "Worker finished: {} scanned, {} failed", summary.scanned, summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::SharedResults;
    use crate::config::EncodingMode;
    use crate::errors::SearchError;
    use crate::results::ResultMap;
    use crate::search::matcher::{Matcher, PatternMatcher};
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        scanned: Mutex<Vec<PathBuf>>,
        failed: Mutex<Vec<(PathBuf, String)>>,
    }

    impl Telemetry for Recorder {
        fn file_scanned(&self, _worker: usize, path: &Path, _bytes: usize, _matched: usize) {
            self.scanned.lock().push(path.to_path_buf());
        }

        fn file_failed(&self, _worker: usize, path: &Path, error: &SearchError) {
            self.failed
                .lock()
                .push((path.to_path_buf(), error.to_string()));
        }
    }

    #[test]
    fn test_missing_file_does_not_stop_chunk() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let missing = dir.path().join("c.txt");
        fs::write(&a, "career future").unwrap();
        fs::write(&b, "kitchen table").unwrap();

        let matcher = PatternMatcher::new(vec![
            "career".to_string(),
            "kitchen".to_string(),
            "miss".to_string(),
        ])
        .unwrap();
        let shared = SharedResults::new(ResultMap::with_keywords(matcher.keywords().to_vec()));
        let telemetry = Recorder::default();

        let worker = Worker::new(
            0,
            FileProcessor::new(&matcher, EncodingMode::FailFast),
            &shared,
            &telemetry,
        );
        let summary = worker
            .run(&[a.clone(), missing.clone(), b.clone()])
            .unwrap();

        assert_eq!(summary.scanned, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.matches, 2);

        let results = shared.into_inner();
        assert_eq!(results.get("career").unwrap(), &[a.clone()]);
        assert_eq!(results.get("kitchen").unwrap(), &[b.clone()]);
        assert!(results.get("miss").unwrap().is_empty());

        // Files are processed strictly in chunk order
        assert_eq!(*telemetry.scanned.lock(), vec![a, b]);
        let failed = telemetry.failed.lock();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, missing);
        assert!(failed[0].1.starts_with("File not found"));
    }

    #[test]
    fn test_empty_chunk_completes() {
        let matcher = PatternMatcher::new(vec!["career".to_string()]).unwrap();
        let shared = SharedResults::default();
        let telemetry = Recorder::default();

        let worker = Worker::new(
            3,
            FileProcessor::new(&matcher, EncodingMode::FailFast),
            &shared,
            &telemetry,
        );
        assert_eq!(worker.id(), 3);
        assert_eq!(worker.run(&[]).unwrap(), WorkerSummary::default());
    }
}
