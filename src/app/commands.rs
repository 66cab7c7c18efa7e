//! Subcommand implementations.
//!
//! Every command returns the process exit code; errors that end a command
//! early are returned with context and mapped to exit code 1 by the binary.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;

use crate::classify::{Category, Classifier, OllamaClient};
use crate::config::{load_config, AppConfig, Cli, Command, ReportArgs, RunArgs};
use crate::initialization::{init_inference_client, init_semaphore};
use crate::mailbox::ImapConnector;
use crate::report::{html_report_path, load_day, render_html, render_text, ReportFilter};
use crate::run::{log_run_summary, probe_inference, run_analysis, run_cleanup};
use crate::utils::{parse_date_or_today, today, write_atomic};

use super::shutdown::{cancel_on_ctrl_c, shutdown_gracefully};

/// Runs the command selected on the command line.
///
/// # Errors
///
/// Returns an error for configuration and usage problems and for failures
/// that abort a command.
pub async fn execute(cli: &Cli) -> Result<i32> {
    if let Command::Version = cli.command {
        println!("bounce_analyzer {}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }

    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    match &cli.command {
        Command::Run(args) => run_command(&config, args).await,
        Command::Cleanup { date } => cleanup_command(&config, date.as_deref()).await,
        Command::Report(args) => report_command(&config, args).await,
        Command::Version => Ok(0),
    }
}

async fn run_command(config: &AppConfig, args: &RunArgs) -> Result<i32> {
    let days = config.lookback_days(args.days);
    log::debug!("Fetch window: {days} day(s)");

    let client = init_inference_client(&config.ollama).context("Failed to initialize HTTP client")?;
    let ollama = OllamaClient::new(client, &config.ollama);
    probe_inference(&ollama).await;

    let classifier = Classifier::new(
        Arc::new(ollama),
        init_semaphore(config.max_concurrency),
        &config.ollama,
    );
    let connector = Arc::new(ImapConnector::new(config.mailbox_timeout));

    let cancel = CancellationToken::new();
    let listener = cancel_on_ctrl_c(cancel.clone());
    let report = run_analysis(config, days, today(), connector, classifier, cancel.clone()).await;
    shutdown_gracefully(cancel, listener).await;

    log_run_summary(&report);
    Ok(report.exit_code())
}

async fn cleanup_command(config: &AppConfig, date: Option<&str>) -> Result<i32> {
    let date = parse_date_or_today(date).map_err(|e| anyhow!(e))?;
    run_cleanup(config, date).await?;
    Ok(0)
}

async fn report_command(config: &AppConfig, args: &ReportArgs) -> Result<i32> {
    let date = parse_date_or_today(args.date.as_deref()).map_err(|e| anyhow!(e))?;
    let filter = match ReportFilter::from_args(&args.category, &args.accounts, args.detail) {
        Ok(filter) => filter,
        Err(e) => {
            let valid: Vec<&str> = Category::iter().map(|c| c.as_str()).collect();
            bail!("{e} (valid categories: {})", valid.join(", "));
        }
    };

    let view = load_day(&config.log_dir, date).await;
    let filtered = filter.apply(&view);
    print!("{}", render_text(&filtered, &filter));

    if args.html {
        if view.accounts.is_empty() {
            log::info!("No report data for {date}; skipping HTML generation.");
        } else {
            let path = html_report_path(&config.report_dir, date);
            write_atomic(&path, render_html(date, &filtered).as_bytes())
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("HTML report: {}", path.display());
        }
    }
    Ok(0)
}
