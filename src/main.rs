//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `bounce_analyzer` library that handles:
//! - Command-line argument parsing
//! - Environment variable loading (.env file)
//! - Logger initialization
//! - Mapping command outcomes to exit codes
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use bounce_analyzer::app::execute;
use bounce_analyzer::initialization::{init_crypto_provider, init_logger_with};
use bounce_analyzer::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Passwords may be supplied through `password_env` variables kept in .env
    // Try loading from current directory first, then from the executable's directory
    if dotenvy::dotenv().is_err() {
        if let Ok(exe_path) = std::env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let env_path = exe_dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                }
            }
        }
    }

    let cli = Cli::parse();

    init_logger_with(cli.effective_log_level().into(), cli.log_format.clone())
        .context("Failed to initialize logger")?;

    // Initialize crypto provider for IMAP TLS connections
    init_crypto_provider();

    match execute(&cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("bounce_analyzer error: {:#}", e);
            process::exit(1);
        }
    }
}
