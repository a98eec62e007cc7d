//! Worker processes.
//!
//! Each worker is a separate OS process with its own address space. The parent and a
//! child share nothing but two pipes:
//!
//! ```text
//! parent ── stdin:  WorkerRequest (one JSON document) ──────────────▶ child
//! parent ◀── stdout: WorkerMessage (newline-delimited JSON) ───────── child
//! ```
//!
//! Inside the child, [`PipeChannel`] stands in for both the result sink and the
//! telemetry: every merge and every diagnostic is serialized and flushed as it
//! happens. The parent drains each child on its own thread and replays the messages
//! into the shared [`ResultMap`](crate::results::ResultMap) and its own telemetry.
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use tracing::{debug, warn};

use super::matcher::PatternMatcher;
use super::processor::FileProcessor;
use super::worker::Worker;
use crate::aggregator::ResultSink;
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::WorkerSummary;
use crate::telemetry::Telemetry;

/// Subcommand a worker executable is invoked with
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Work order sent to a child on stdin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub worker_id: usize,
    pub keywords: Vec<String>,
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub encoding_mode: EncodingMode,
}

/// Events a child reports on stdout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// Merge of one file's matches into the result map
    Matched { path: PathBuf, keywords: Vec<String> },
    Scanned {
        path: PathBuf,
        bytes: usize,
        matched: usize,
    },
    Failed { path: PathBuf, failure: FileFailure },
    /// Last message of a healthy child
    Finished { scanned: usize, failed: usize },
}

/// A per-file error in a form that survives serialization.
///
/// Only the cause travels; the path is carried by the enclosing message, so the
/// parent rebuilds an error that displays exactly like the child's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub kind: FailureKind,
    #[serde(default)]
    pub cause: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    PermissionDenied,
    Encoding,
    Io,
    Other,
}

impl FileFailure {
    pub fn from_error(err: &SearchError) -> Self {
        let (kind, cause) = match err {
            SearchError::FileNotFound(_) => (FailureKind::NotFound, String::new()),
            SearchError::PermissionDenied(_) => (FailureKind::PermissionDenied, String::new()),
            SearchError::EncodingError { reason, .. } => (FailureKind::Encoding, reason.clone()),
            SearchError::ReadFailed { reason, .. } => (FailureKind::Other, reason.clone()),
            SearchError::IoError(e) => (FailureKind::Io, e.to_string()),
            other => (FailureKind::Other, other.to_string()),
        };
        Self { kind, cause }
    }

    /// Rebuilds the error on the parent side
    pub fn into_error(self, path: &Path) -> SearchError {
        match self.kind {
            FailureKind::NotFound => SearchError::file_not_found(path),
            FailureKind::PermissionDenied => SearchError::permission_denied(path),
            FailureKind::Encoding => SearchError::encoding_error(path, self.cause),
            FailureKind::Io => {
                SearchError::IoError(io::Error::new(io::ErrorKind::Other, self.cause))
            }
            FailureKind::Other => SearchError::read_failed(path, self.cause),
        }
    }
}

/// Child-side result sink and telemetry writing to the parent pipe
pub struct PipeChannel<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> PipeChannel<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Writes one message as a line and flushes it
    pub fn send(&self, message: &WorkerMessage) -> SearchResult<()> {
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, message)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn send_or_warn(&self, message: &WorkerMessage) {
        if let Err(e) = self.send(message) {
            warn!("Failed to report to parent: {}", e);
        }
    }
}

impl<W: Write + Send> ResultSink for PipeChannel<W> {
    fn merge_file(&self, path: &Path, keywords: &[String]) -> SearchResult<()> {
        self.send(&WorkerMessage::Matched {
            path: path.to_path_buf(),
            keywords: keywords.to_vec(),
        })
    }
}

impl<W: Write + Send> Telemetry for PipeChannel<W> {
    fn file_scanned(&self, _worker: usize, path: &Path, bytes: usize, matched: usize) {
        self.send_or_warn(&WorkerMessage::Scanned {
            path: path.to_path_buf(),
            bytes,
            matched,
        });
    }

    fn file_failed(&self, _worker: usize, path: &Path, error: &SearchError) {
        self.send_or_warn(&WorkerMessage::Failed {
            path: path.to_path_buf(),
            failure: FileFailure::from_error(error),
        });
    }
}

/// Entry point of a worker process: read the request, scan, report.
///
/// The CLI's hidden `worker` subcommand calls this with stdin and stdout.
pub fn run_worker_process<R: Read, W: Write + Send>(input: R, output: W) -> SearchResult<()> {
    let request: WorkerRequest = serde_json::from_reader(input)?;
    debug!(
        worker = request.worker_id,
        "Worker process received {} files", request.files.len()
    );

    let matcher = PatternMatcher::new(request.keywords)?;
    let channel = PipeChannel::new(output);
    let worker = Worker::new(
        request.worker_id,
        FileProcessor::new(&matcher, request.encoding_mode),
        &channel,
        &channel,
    );

    let summary = worker.run(&request.files)?;
    channel.send(&WorkerMessage::Finished {
        scanned: summary.scanned,
        failed: summary.failed,
    })
}

/// Replays one child's messages into the parent's sink and telemetry
pub fn drain_worker<R: BufRead>(
    worker: usize,
    reader: R,
    sink: &dyn ResultSink,
    telemetry: &dyn Telemetry,
) -> SearchResult<WorkerSummary> {
    let mut summary = WorkerSummary::default();

    for line in reader.lines() {
        let line = line.map_err(|e| SearchError::worker_failed(worker, e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }

        let message: WorkerMessage = serde_json::from_str(&line).map_err(|e| {
            SearchError::worker_failed(worker, format!("malformed message {:?}: {}", line, e))
        })?;

        match message {
            WorkerMessage::Matched { path, keywords } => {
                sink.merge_file(&path, &keywords)?;
                summary.matches += keywords.len();
            }
            WorkerMessage::Scanned {
                path,
                bytes,
                matched,
            } => {
                telemetry.file_scanned(worker, &path, bytes, matched);
                summary.scanned += 1;
            }
            WorkerMessage::Failed { path, failure } => {
                let err = failure.into_error(&path);
                telemetry.file_failed(worker, &path, &err);
                summary.failed += 1;
            }
            WorkerMessage::Finished { scanned, failed } => {
                if scanned != summary.scanned || failed != summary.failed {
                    return Err(SearchError::worker_failed(
                        worker,
                        format!(
                            "reported {}/{} scanned/failed but {}/{} were received",
                            scanned, failed, summary.scanned, summary.failed
                        ),
                    ));
                }
                return Ok(summary);
            }
        }
    }

    Err(SearchError::worker_failed(
        worker,
        "output ended before the worker finished",
    ))
}

/// How to start a worker process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessLauncher {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ProcessLauncher {
    /// Launches `program worker`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: vec![OsString::from(WORKER_SUBCOMMAND)],
        }
    }

    /// Launches the running executable as the worker
    pub fn current_exe() -> SearchResult<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    fn spawn(&self, worker: usize, request: &WorkerRequest) -> SearchResult<Child> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                SearchError::worker_failed(
                    worker,
                    format!("failed to spawn {}: {}", self.program.display(), e),
                )
            })?;

        // The child reads its whole request before writing anything, so writing
        // it here cannot deadlock against a full stdout pipe.
        let written = match child.stdin.take() {
            Some(mut stdin) => serde_json::to_writer(&mut stdin, request)
                .map_err(SearchError::from)
                .and_then(|_| stdin.write_all(b"\n").map_err(SearchError::from)),
            None => Err(SearchError::worker_failed(worker, "stdin was not captured")),
        };

        match written {
            Ok(()) => Ok(child),
            Err(e) => {
                reap(&mut child);
                Err(SearchError::worker_failed(
                    worker,
                    format!("failed to send request: {}", e),
                ))
            }
        }
    }

    /// Starts one process per chunk and blocks until every one has exited
    pub(crate) fn run(
        &self,
        chunks: &[&[PathBuf]],
        keywords: &[String],
        encoding_mode: EncodingMode,
        sink: &dyn ResultSink,
        telemetry: &dyn Telemetry,
    ) -> SearchResult<Vec<WorkerSummary>> {
        let mut children = Vec::with_capacity(chunks.len());
        for (id, chunk) in chunks.iter().enumerate() {
            let request = WorkerRequest {
                worker_id: id,
                keywords: keywords.to_vec(),
                files: chunk.to_vec(),
                encoding_mode,
            };
            match self.spawn(id, &request) {
                Ok(child) => children.push(child),
                Err(e) => {
                    children.iter_mut().for_each(reap);
                    return Err(e);
                }
            }
        }
        debug!("Started {} worker processes", children.len());

        let outcomes: Vec<SearchResult<WorkerSummary>> = thread::scope(|scope| {
            let handles: Vec<_> = children
                .into_iter()
                .enumerate()
                .map(|(id, child)| {
                    scope.spawn(move || supervise(id, child, sink, telemetry))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(id, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        Err(SearchError::worker_failed(id, "reader thread panicked"))
                    })
                })
                .collect()
        });

        outcomes.into_iter().collect()
    }
}

/// Drains a child's output, then waits for it to exit
fn supervise(
    worker: usize,
    mut child: Child,
    sink: &dyn ResultSink,
    telemetry: &dyn Telemetry,
) -> SearchResult<WorkerSummary> {
    let drained = match child.stdout.take() {
        Some(stdout) => drain_worker(worker, BufReader::new(stdout), sink, telemetry),
        None => Err(SearchError::worker_failed(worker, "stdout was not captured")),
    };

    if drained.is_err() {
        reap(&mut child);
        return drained;
    }

    let status = child
        .wait()
        .map_err(|e| SearchError::worker_failed(worker, e.to_string()))?;
    if !status.success() {
        return Err(SearchError::worker_failed(
            worker,
            format!("exited with {}", status),
        ));
    }
    drained
}

/// Kills a child that is no longer wanted and collects its exit status
fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
