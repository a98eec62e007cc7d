/// This module implements the keyword search itself and the two ways of running it in parallel:
/// shared-memory threads and isolated worker processes.
///
/// # Threads vs Processes
///
/// Both models split the file list into the same contiguous chunks, one per worker, and both
/// feed matches into a single keyword-to-paths map. They differ only in where the workers live:
///
/// 1. **Threads**
///    Workers run on a dedicated Rayon pool with exactly one thread per chunk. Each worker
///    locks the shared map once per file:
///    ```rust,ignore
///    pool.broadcast(|ctx| worker.run(chunks[ctx.index()]));
///    ```
///
/// 2. **Processes**
///    Each chunk is handed to a child process over stdin. The child streams its matches back
///    as newline-delimited JSON and the parent replays them into the same map:
///    ```rust,ignore
///    let launcher = ProcessLauncher::current_exe()?;
///    let coordinator = Coordinator::new(4, Backend::Processes(launcher))?;
///    ```
///
/// # Error Handling
///
/// A file that cannot be read never fails the run. It is logged through the
/// [`Telemetry`](crate::telemetry::Telemetry) seam and the worker moves on. Only setup
/// failures (bad worker count, invalid pattern, a worker that cannot start) surface as `Err`:
/// ```rust,ignore
/// match search(&config) {
///     Ok(report) => // Print report.results,
///     Err(e) => // Configuration or worker failure
/// }
/// ```
pub mod engine;
pub mod matcher;
pub mod process;
pub mod processor;
pub mod threads;
pub mod worker;

pub use engine::{search, Backend, Coordinator};
pub use matcher::{Matcher, PatternMatcher};
pub use process::{drain_worker, run_worker_process, ProcessLauncher, WorkerMessage, WorkerRequest};
pub use processor::FileProcessor;
pub use worker::Worker;
