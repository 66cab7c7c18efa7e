//! bounce_analyzer library: IMAP bounce analysis
//!
//! This library scans IMAP mailboxes for delivery-failure notifications,
//! extracts permanent (5xx) failures, classifies each by probable cause with an
//! Ollama-compatible model and writes daily target/excluded JSON reports.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bounce_analyzer::classify::{Classifier, OllamaClient};
//! use bounce_analyzer::config::load_config;
//! use bounce_analyzer::initialization::{init_crypto_provider, init_inference_client, init_semaphore};
//! use bounce_analyzer::mailbox::ImapConnector;
//! use bounce_analyzer::run::run_analysis;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! init_crypto_provider();
//! let config = load_config(std::path::Path::new("config.json"))?;
//! let ollama = OllamaClient::new(init_inference_client(&config.ollama)?, &config.ollama);
//! let classifier = Classifier::new(
//!     Arc::new(ollama),
//!     init_semaphore(config.max_concurrency),
//!     &config.ollama,
//! );
//! let connector = Arc::new(ImapConnector::new(config.mailbox_timeout));
//! let today = chrono::Local::now().date_naive();
//!
//! let report = run_analysis(&config, 30, today, connector, classifier, CancellationToken::new()).await;
//! println!("{} account(s) processed, {} failed", report.accounts.len(), report.failures.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

pub mod app;
pub mod classify;
pub mod config;
pub mod error_handling;
pub mod fingerprint;
pub mod initialization;
pub mod mailbox;
pub mod parse;
pub mod report;
pub mod run;
mod utils;

// Re-export public API
pub use classify::{Category, Classification, Classifier, Disposition};
pub use config::{AccountConfig, AppConfig, Cli, LogFormat, LogLevel};
pub use parse::{parse_bounce, parse_bounces, BounceRecord};
pub use run::{run_analysis, run_cleanup, RunReport};
pub use utils::{parse_date, parse_date_or_today};
