//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::constants::DEFAULT_CONFIG_PATH;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Command-line options.
///
/// # Examples
///
/// ```bash
/// # Fetch the last 7 days of every configured account
/// bounce_analyzer run --days 7
///
/// # Show what was found today, including message details
/// bounce_analyzer report --detail
///
/// # Forget a day so the next run processes it again
/// bounce_analyzer cleanup 2026-02-10
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "bounce_analyzer",
    about = "Analyzes IMAP bounce mails, classifies 5xx errors with Ollama and writes JSON reports.",
    disable_version_flag = true
)]
pub struct Cli {
    /// Path to the JSON configuration file
    #[arg(short = 'c', long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, global = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Enable debug logging (shorthand for `--log-level debug`)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Effective log level after applying `--verbose`.
    pub fn effective_log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level.clone()
        }
    }
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, classify and report bounces for every configured account
    Run(RunArgs),
    /// Delete the report files and cache entries of a date (default: today)
    Cleanup {
        /// Date as YYYY-MM-DD, YYYY/MM/DD or YYYYMMDD
        date: Option<String>,
    },
    /// Show the stored report of a date (default: today)
    Report(ReportArgs),
    /// Print the version and exit
    Version,
}

/// Options of the `run` subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Lookback window in days (default: `default_days` from the config, else 30)
    #[arg(long)]
    pub days: Option<u32>,
}

/// Options of the `report` subcommand.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Date as YYYY-MM-DD, YYYY/MM/DD or YYYYMMDD
    pub date: Option<String>,

    /// Categories to include (comma-separated, default: all)
    #[arg(long, value_delimiter = ',')]
    pub category: Vec<String>,

    /// Accounts to include (comma-separated, default: all)
    #[arg(long, value_delimiter = ',')]
    pub accounts: Vec<String>,

    /// Show sender, recipient, subject and body of every record
    #[arg(long)]
    pub detail: bool,

    /// Also write an HTML report into the report directory
    #[arg(long)]
    pub html: bool,
}
