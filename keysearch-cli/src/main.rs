use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use keysearch::{
    config::{ConcurrencyModel, ConfigOverrides, EncodingMode, SearchConfig},
    results::SearchReport,
    search,
    search::run_worker_process,
    SearchError,
};
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Result<T> = std::result::Result<T, SearchError>;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CliSearchConfig {
    /// Keyword to search for (can be specified multiple times)
    #[arg(short = 'k', long = "keyword", num_args = 1..)]
    keywords: Vec<String>,

    /// Directory whose files are searched
    #[arg(short = 'd', long)]
    root: Option<PathBuf>,

    /// File extension to include (e.g. txt); empty string for every file
    #[arg(short = 'e', long)]
    extension: Option<String>,

    /// Descend into subdirectories
    #[arg(short = 'R', long)]
    recursive: bool,

    /// Number of workers the file list is split across
    #[arg(short = 'j', long = "workers")]
    workers: Option<usize>,

    /// How to handle invalid UTF-8 sequences (failfast|lossy)
    #[arg(long)]
    encoding: Option<EncodingMode>,

    /// Configuration file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search files for keywords
    Search {
        #[command(flatten)]
        config: Box<CliSearchConfig>,

        /// Run workers as threads or as separate processes
        #[arg(short = 'm', long = "model")]
        model: Option<ConcurrencyModel>,
    },

    /// Run the same search with threads and with processes and compare the results
    Compare(Box<CliSearchConfig>),

    /// Worker process entry point
    #[command(hide = true)]
    Worker,
}

fn main() -> Result<ExitCode> {
    run()
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { config, model } => {
            let search_config = load_config(&config, model)?;
            init_logging(&search_config.log_level);

            let mut report = search(&search_config)?;
            report.results.sort_paths();
            if config.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_search_report(&report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Compare(config) => {
            let base = load_config(&config, None)?;
            init_logging(&base.log_level);

            let mut reports = Vec::with_capacity(ConcurrencyModel::ALL.len());
            for model in ConcurrencyModel::ALL {
                let search_config = SearchConfig {
                    concurrency_model: model,
                    ..base.clone()
                };
                let mut report = search(&search_config)?;
                report.results.sort_paths();
                reports.push(report);
            }

            if config.json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_search_report(report);
                }
            }

            let agree = reports
                .windows(2)
                .all(|pair| pair[0].results.same_matches(&pair[1].results));
            if agree {
                info!("All concurrency models found the same matches");
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("{}", "Concurrency models disagree on the matches".red());
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Worker => {
            // stdout carries the protocol; diagnostics go to the parent as messages
            init_logging("warn");
            run_worker_process(io::stdin().lock(), BufWriter::new(io::stdout()))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &CliSearchConfig, model: Option<ConcurrencyModel>) -> Result<SearchConfig> {
    let config = SearchConfig::load_from(cli.config.as_deref())
        .map_err(|e| SearchError::config_error(e.to_string()))?;

    Ok(config.merge_with_cli(ConfigOverrides {
        keywords: cli.keywords.clone(),
        root_path: cli.root.clone(),
        extension: cli.extension.clone(),
        recursive: cli.recursive,
        worker_count: cli.workers,
        concurrency_model: model,
        encoding_mode: cli.encoding,
        log_level: cli.log_level.clone(),
    }))
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
    {
        warn!("Logging already initialized: {}", e);
    }
}

fn print_search_report(report: &SearchReport) {
    let separator = "-".repeat(80);
    println!("{}", separator);
    println!("{}", report.run.model.to_string().bold());
    for (keyword, paths) in report.results.iter() {
        let listed: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        println!("{}: [{}]", keyword.green(), listed.join(", "));
    }
    println!("{}", separator);
    println!(
        "Searched {} files with {} workers in {} ({} failed)",
        report.run.files_scanned,
        report.run.workers,
        format!("{:.3?}", report.run.elapsed).blue(),
        report.run.files_failed
    );
}
