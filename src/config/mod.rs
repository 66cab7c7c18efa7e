//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, limits, etc.)
//! - CLI option types and parsing
//! - JSON configuration file loading

mod constants;
mod file;
mod types;

// Re-export all constants
pub use constants::*;
pub use file::{load_config, parse_config, AccountConfig, AppConfig, OllamaConfig, Security};
pub use types::{Cli, Command, LogFormat, LogLevel, ReportArgs, RunArgs};
