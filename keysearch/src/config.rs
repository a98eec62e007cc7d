use config::{Config as ConfigBuilder, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{SearchError, SearchResult};

/// Configuration for a keyword search run.
///
/// # Configuration Locations
///
/// The configuration can be loaded from multiple locations in order of precedence:
/// 1. Custom config file specified via `--config` flag
/// 2. Local `.keysearch.yaml` in the current directory
/// 3. Global `$HOME/.config/keysearch/config.yaml`
///
/// # Configuration Format
///
/// The configuration uses YAML format. Example:
/// ```yaml
/// # Keywords to look for (case-insensitive, simple regex allowed)
/// keywords: ["kitchen", "career", "subject", "miss"]
///
/// # Directory holding the files
/// root_path: "./my_files"
///
/// # Only files with this extension are searched
/// extension: "txt"
///
/// # Number of workers (default: CPU cores)
/// worker_count: 4
///
/// # threads | processes
/// concurrency_model: "processes"
///
/// # failfast | lossy
/// encoding_mode: "failfast"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
///
/// # CLI Integration
///
/// When using the CLI, command-line arguments take precedence over config file values.
/// The merging behavior is defined in the `merge_with_cli` method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Keywords to search for
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Directory whose files are searched
    #[serde(default = "default_root_path")]
    pub root_path: PathBuf,

    /// File extension filter (e.g. "txt"); empty means every file
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Number of workers the file list is split across
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Whether workers are threads or separate processes
    #[serde(default)]
    pub concurrency_model: ConcurrencyModel,

    /// How to handle invalid UTF-8 in files
    #[serde(default)]
    pub encoding_mode: EncodingMode,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Executable launched for process workers. Defaults to the current executable.
    #[serde(default)]
    pub worker_program: Option<PathBuf>,
}

/// Concurrency substrate backing the workers and the result aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyModel {
    /// Worker threads sharing one address space
    #[default]
    Threads,
    /// Worker processes reporting over a serialized pipe
    Processes,
}

impl ConcurrencyModel {
    pub const ALL: [ConcurrencyModel; 2] = [ConcurrencyModel::Threads, ConcurrencyModel::Processes];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConcurrencyModel::Threads => "threads",
            ConcurrencyModel::Processes => "processes",
        }
    }
}

impl fmt::Display for ConcurrencyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConcurrencyModel {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "threads" | "thread" => Ok(ConcurrencyModel::Threads),
            "processes" | "process" => Ok(ConcurrencyModel::Processes),
            other => Err(SearchError::invalid_configuration(format!(
                "unknown concurrency model '{}' (expected threads or processes)",
                other
            ))),
        }
    }
}

/// How invalid UTF-8 sequences are handled when decoding a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// Invalid UTF-8 is a read failure for that file
    #[default]
    FailFast,
    /// Invalid sequences are replaced with U+FFFD
    Lossy,
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMode::FailFast => f.write_str("failfast"),
            EncodingMode::Lossy => f.write_str("lossy"),
        }
    }
}

impl FromStr for EncodingMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failfast" => Ok(EncodingMode::FailFast),
            "lossy" => Ok(EncodingMode::Lossy),
            other => Err(SearchError::invalid_configuration(format!(
                "unknown encoding mode '{}' (expected failfast or lossy)",
                other
            ))),
        }
    }
}

/// Values supplied on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub keywords: Vec<String>,
    pub root_path: Option<PathBuf>,
    pub extension: Option<String>,
    pub recursive: bool,
    pub worker_count: Option<usize>,
    pub concurrency_model: Option<ConcurrencyModel>,
    pub encoding_mode: Option<EncodingMode>,
    pub log_level: Option<String>,
}

fn default_root_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    "txt".to_string()
}

fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            root_path: default_root_path(),
            extension: default_extension(),
            recursive: false,
            worker_count: default_worker_count(),
            concurrency_model: ConcurrencyModel::default(),
            encoding_mode: EncodingMode::default(),
            log_level: default_log_level(),
            worker_program: None,
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Loads configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        // Default config locations
        let config_files = [
            dirs::config_dir().map(|p| p.join("keysearch/config.yaml")),
            Some(PathBuf::from(".keysearch.yaml")),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicit file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder.build()?.try_deserialize()
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if !cli.keywords.is_empty() {
            self.keywords = cli.keywords;
        }
        if let Some(root_path) = cli.root_path {
            self.root_path = root_path;
        }
        if let Some(extension) = cli.extension {
            self.extension = extension;
        }
        if cli.recursive {
            self.recursive = true;
        }
        if let Some(worker_count) = cli.worker_count {
            self.worker_count = worker_count;
        }
        if let Some(model) = cli.concurrency_model {
            self.concurrency_model = model;
        }
        if let Some(mode) = cli.encoding_mode {
            self.encoding_mode = mode;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        self
    }

    /// Rejects configurations that cannot start a run
    pub fn validate(&self) -> SearchResult<()> {
        if self.worker_count < 1 {
            return Err(SearchError::invalid_configuration(format!(
                "worker count must be at least 1, got {}",
                self.worker_count
            )));
        }
        Ok(())
    }
}
