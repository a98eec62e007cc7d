use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::matcher::{Matcher, PatternMatcher};
use super::process::ProcessLauncher;
use super::threads::run_threads;
use crate::aggregator::SharedResults;
use crate::config::{ConcurrencyModel, EncodingMode, SearchConfig};
use crate::errors::{SearchError, SearchResult};
use crate::filters::list_files;
use crate::metrics::SearchMetrics;
use crate::partition::partition;
use crate::results::{ResultMap, RunReport, SearchReport, WorkerSummary};
use crate::telemetry::{LogTelemetry, Telemetry};

/// Which substrate runs the workers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Threads,
    Processes(ProcessLauncher),
}

impl Backend {
    pub fn model(&self) -> ConcurrencyModel {
        match self {
            Backend::Threads => ConcurrencyModel::Threads,
            Backend::Processes(_) => ConcurrencyModel::Processes,
        }
    }
}

/// Splits a file list across a fixed pool of workers and collects their matches
#[derive(Debug, Clone)]
pub struct Coordinator {
    workers: NonZeroUsize,
    backend: Backend,
    encoding_mode: EncodingMode,
}

impl Coordinator {
    /// Fails with `InvalidConfiguration` unless `worker_count >= 1`
    pub fn new(worker_count: usize, backend: Backend) -> SearchResult<Self> {
        let workers = NonZeroUsize::new(worker_count).ok_or_else(|| {
            SearchError::invalid_configuration(format!(
                "worker count must be at least 1, got {}",
                worker_count
            ))
        })?;

        Ok(Self {
            workers,
            backend,
            encoding_mode: EncodingMode::default(),
        })
    }

    /// Builds the coordinator a configuration asks for
    pub fn from_config(config: &SearchConfig) -> SearchResult<Self> {
        let backend = match config.concurrency_model {
            ConcurrencyModel::Threads => Backend::Threads,
            ConcurrencyModel::Processes => Backend::Processes(match &config.worker_program {
                Some(program) => ProcessLauncher::new(program),
                None => ProcessLauncher::current_exe()?,
            }),
        };
        Ok(Self::new(config.worker_count, backend)?.with_encoding_mode(config.encoding_mode))
    }

    pub fn with_encoding_mode(mut self, encoding_mode: EncodingMode) -> Self {
        self.encoding_mode = encoding_mode;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    pub fn model(&self) -> ConcurrencyModel {
        self.backend.model()
    }

    /// Searches `files` for every keyword of `matcher`.
    ///
    /// Blocks until every worker has finished; there is no timeout. Per-file failures
    /// are reported to `telemetry` and never fail the run.
    ///
    /// Process workers rebuild a [`PatternMatcher`] from `matcher.keywords()` on their
    /// side of the pipe, so a custom [`Matcher`] only takes effect with threads.
    pub fn run(
        &self,
        files: &[PathBuf],
        matcher: &dyn Matcher,
        telemetry: &dyn Telemetry,
    ) -> SearchResult<SearchReport> {
        let keywords = matcher.keywords();
        let model = self.model();

        if files.is_empty() {
            info!("No files to search");
            return Ok(SearchReport::empty(
                ResultMap::with_keywords(keywords.iter().cloned()),
                model,
                self.workers(),
            ));
        }

        let chunks = partition(files, self.workers);
        debug!(
            "Split {} files into {} chunks of {:?}",
            files.len(),
            chunks.len(),
            chunks.iter().map(|c| c.len()).collect::<Vec<_>>()
        );

        let shared = SharedResults::new(ResultMap::with_keywords(keywords.iter().cloned()));

        let start = Instant::now();
        let summaries = match &self.backend {
            Backend::Threads => {
                run_threads(&chunks, matcher, &shared, telemetry, self.encoding_mode)?
            }
            Backend::Processes(launcher) => {
                launcher.run(&chunks, keywords, self.encoding_mode, &shared, telemetry)?
            }
        };
        let elapsed = start.elapsed();

        let mut total = WorkerSummary::default();
        for summary in summaries {
            total.merge(summary);
        }

        let run = RunReport {
            model,
            workers: self.workers(),
            elapsed,
            files_scanned: total.scanned,
            files_failed: total.failed,
        };
        telemetry.run_completed(&run);

        Ok(SearchReport {
            results: shared.into_inner(),
            run,
        })
    }
}

/// Lists the configured directory and searches it with the configured model
pub fn search(config: &SearchConfig) -> SearchResult<SearchReport> {
    info!("Starting search for keywords: {:?}", config.keywords);
    config.validate()?;

    let metrics = Arc::new(SearchMetrics::new());
    let matcher = PatternMatcher::with_metrics(config.keywords.clone(), metrics.clone())?;
    let coordinator = Coordinator::from_config(config)?;

    if matcher.keywords().is_empty() {
        warn!("No keywords provided, returning empty result");
        return Ok(SearchReport::empty(
            ResultMap::default(),
            coordinator.model(),
            coordinator.workers(),
        ));
    }

    let files = list_files(&config.root_path, &config.extension, config.recursive);
    let telemetry = LogTelemetry::with_metrics(metrics);
    coordinator.run(&files, &matcher, &telemetry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SearchError;
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recorder {
        scanned: Mutex<usize>,
        not_found: Mutex<Vec<PathBuf>>,
        completed: Mutex<Vec<RunReport>>,
    }

    impl Telemetry for Recorder {
        fn file_scanned(&self, _worker: usize, _path: &Path, _bytes: usize, _matched: usize) {
            *self.scanned.lock() += 1;
        }

        fn file_failed(&self, _worker: usize, path: &Path, error: &SearchError) {
            if matches!(error, SearchError::FileNotFound(_)) {
                self.not_found.lock().push(path.to_path_buf());
            }
        }

        fn run_completed(&self, report: &RunReport) {
            self.completed.lock().push(report.clone());
        }
    }

    fn keywords(words: &[&str]) -> PatternMatcher {
        PatternMatcher::new(words.iter().map(|w| w.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_example_scenario() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let c = dir.path().join("c.txt");
        fs::write(&a, "career future").unwrap();
        fs::write(&b, "kitchen table").unwrap();

        let matcher = keywords(&["career", "kitchen", "miss"]);
        let telemetry = Recorder::default();
        let coordinator = Coordinator::new(2, Backend::Threads).unwrap();
        let report = coordinator
            .run(&[a.clone(), b.clone(), c.clone()], &matcher, &telemetry)
            .unwrap();

        assert_eq!(report.results.get("career").unwrap(), &[a]);
        assert_eq!(report.results.get("kitchen").unwrap(), &[b]);
        assert!(report.results.get("miss").unwrap().is_empty());
        assert_eq!(report.results.len(), 3);

        assert_eq!(*telemetry.not_found.lock(), vec![c]);
        assert_eq!(*telemetry.scanned.lock(), 2);
        assert_eq!(report.run.files_scanned, 2);
        assert_eq!(report.run.files_failed, 1);
        assert_eq!(report.run.workers, 2);
        assert_eq!(report.run.model, ConcurrencyModel::Threads);
        assert_eq!(telemetry.completed.lock().len(), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let err = Coordinator::new(0, Backend::Threads).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_file_list_spawns_nothing() {
        let matcher = keywords(&["career", "kitchen"]);
        let telemetry = Recorder::default();
        // A launcher that cannot start proves no process is spawned
        let coordinator = Coordinator::new(
            4,
            Backend::Processes(ProcessLauncher::new("/nonexistent/keysearch-worker")),
        )
        .unwrap();

        let report = coordinator.run(&[], &matcher, &telemetry).unwrap();
        assert_eq!(report.results, ResultMap::with_keywords(["career", "kitchen"]));
        assert_eq!(report.run.elapsed, std::time::Duration::ZERO);
        assert!(telemetry.completed.lock().is_empty());
    }

    #[test]
    fn test_more_workers_than_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.txt");
        fs::write(&a, "Kitchen").unwrap();

        let matcher = keywords(&["kitchen"]);
        let report = Coordinator::new(8, Backend::Threads)
            .unwrap()
            .run(&[a.clone()], &matcher, &Recorder::default())
            .unwrap();
        assert_eq!(report.results.get("kitchen").unwrap(), &[a]);
        assert_eq!(report.run.workers, 8);
    }

    #[test]
    fn test_worker_counts_agree() {
        let dir = tempdir().unwrap();
        let words = ["kitchen", "career", "subject", "miss"];
        let files: Vec<PathBuf> = (0..37)
            .map(|i| {
                let path = dir.path().join(format!("file_{}.txt", i));
                let text = format!("{} and {}", words[i % 4], words[(i / 4) % 4].to_uppercase());
                fs::write(&path, text).unwrap();
                path
            })
            .collect();

        let matcher = keywords(&words);
        let reference = Coordinator::new(1, Backend::Threads)
            .unwrap()
            .run(&files, &matcher, &Recorder::default())
            .unwrap();
        assert!(reference.results.total_matches() > 0);

        for workers in [4, 8] {
            let report = Coordinator::new(workers, Backend::Threads)
                .unwrap()
                .run(&files, &matcher, &Recorder::default())
                .unwrap();
            assert!(report.results.same_matches(&reference.results));
        }
    }

    #[test]
    fn test_search_from_config() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "career future").unwrap();
        fs::write(dir.path().join("b.txt"), "kitchen table").unwrap();
        fs::write(dir.path().join("c.md"), "career").unwrap();

        let config = SearchConfig {
            keywords: vec!["career".into(), "kitchen".into(), "miss".into()],
            root_path: dir.path().to_path_buf(),
            worker_count: 2,
            ..SearchConfig::default()
        };

        let report = search(&config).unwrap();
        assert_eq!(
            report.results.get("career").unwrap(),
            &[dir.path().join("a.txt")]
        );
        assert_eq!(report.run.files_scanned, 2);
    }

    #[test]
    fn test_search_missing_directory_is_empty_run() {
        let dir = tempdir().unwrap();
        let config = SearchConfig {
            keywords: vec!["career".into()],
            root_path: dir.path().join("missing"),
            worker_count: 2,
            ..SearchConfig::default()
        };

        let report = search(&config).unwrap();
        assert_eq!(report.results, ResultMap::with_keywords(["career"]));
        assert_eq!(report.run.files_scanned, 0);
    }

    #[test]
    fn test_search_rejects_zero_workers_before_listing() {
        let config = SearchConfig {
            keywords: vec!["career".into()],
            root_path: PathBuf::from("/nonexistent"),
            worker_count: 0,
            ..SearchConfig::default()
        };
        let err = search(&config).unwrap_err();
        assert!(matches!(err, SearchError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_search_without_keywords() {
        let config = SearchConfig {
            worker_count: 1,
            ..SearchConfig::default()
        };
        let report = search(&config).unwrap();
        assert!(report.results.is_empty());
    }
}
