/// This module defines the error taxonomy for keysearch, demonstrating Rust's error handling
/// compared to .NET's exception system.
///
/// # Rust vs .NET Error Handling
///
/// .NET uses exceptions for error handling:
/// ```csharp
/// try {
///     var text = File.ReadAllText(path);
/// } catch (FileNotFoundException ex) {
///     // Handle missing file
/// } catch (IOException ex) {
///     // Handle other read errors
/// }
/// ```
///
/// Rust uses Result types with custom errors:
/// ```rust,ignore
/// match processor.process_file(path) {
///     Ok(found) => // Merge matches,
///     Err(SearchError::FileNotFound(path)) => // Log and move on,
///     Err(e) => // Log the cause and move on
/// }
/// ```
///
/// # Failure Scopes
///
/// Errors fall into two scopes:
///
/// 1. **Per-file failures** (`FileNotFound`, `PermissionDenied`, `EncodingError`,
///    `ReadFailed`, `IoError`) are isolated by the worker: they are reported to
///    telemetry and the file contributes no matches.
/// 2. **Run failures** (`InvalidConfiguration`, `InvalidPattern`, `WorkerFailed`, ...)
///    abort the run and are returned to the caller.
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },
    #[error("Invalid UTF-8 in file {path}: {reason}")]
    EncodingError { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Worker {worker} failed: {reason}")]
    WorkerFailed { worker: usize, reason: String },
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SearchError {
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound(path.into())
    }

    pub fn permission_denied(path: impl Into<PathBuf>) -> Self {
        Self::PermissionDenied(path.into())
    }

    pub fn read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_pattern(pattern: impl Into<String>) -> Self {
        Self::InvalidPattern(pattern.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn worker_failed(worker: usize, reason: impl Into<String>) -> Self {
        Self::WorkerFailed {
            worker,
            reason: reason.into(),
        }
    }

    pub fn encoding_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::EncodingError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Maps an I/O error raised while opening or reading `path`
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::file_not_found(path),
            std::io::ErrorKind::PermissionDenied => Self::permission_denied(path),
            _ => Self::IoError(err),
        }
    }

    /// Returns true for errors that only affect a single file
    pub fn is_file_level(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound(_)
                | Self::PermissionDenied(_)
                | Self::ReadFailed { .. }
                | Self::EncodingError { .. }
                | Self::IoError(_)
        )
    }
}
