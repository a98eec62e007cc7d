pub mod aggregator;
pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod partition;
pub mod results;
pub mod search;
pub mod telemetry;

pub use aggregator::{ResultSink, SharedResults};
pub use config::{ConcurrencyModel, ConfigOverrides, EncodingMode, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use results::{FileResult, ResultMap, RunReport, SearchReport, WorkerSummary};
pub use search::{search, Backend, Coordinator, Matcher, PatternMatcher, ProcessLauncher};
pub use telemetry::{LogTelemetry, Telemetry};
