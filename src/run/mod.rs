//! Run orchestration.
//!
//! This module drives the `run` and `cleanup` commands:
//! - Accounts are processed concurrently, bounded by `max_accounts_in_parallel`
//! - One account failing never stops the others
//! - A [`RunReport`] collects per-account summaries, failures and statistics

mod account;
mod cleanup;
mod summary;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Days, NaiveDate};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::classify::{Classifier, OllamaClient};
use crate::config::AppConfig;
use crate::error_handling::{AccountError, ErrorType, ProcessingStats};
use crate::mailbox::MailboxConnector;

pub use account::AccountSummary;
pub use cleanup::{run_cleanup, CleanupReport};
pub use summary::{format_account_line, log_run_summary};

/// Shared, read-only state of one run.
pub(crate) struct RunContext {
    pub run_date: NaiveDate,
    /// First day of the lookback window
    pub window_start: NaiveDate,
    pub log_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub max_concurrency: usize,
    pub classifier: Classifier,
    pub stats: Arc<ProcessingStats>,
    pub cancel: CancellationToken,
}

/// Result of a `run`.
#[derive(Debug)]
pub struct RunReport {
    /// Date the artifacts were written for
    pub run_date: NaiveDate,
    /// First day of the lookback window
    pub window_start: NaiveDate,
    /// Successfully processed accounts, by account name
    pub accounts: Vec<AccountSummary>,
    /// Accounts that could not be processed
    pub failures: Vec<(String, AccountError)>,
    /// Counters of the whole run
    pub stats: Arc<ProcessingStats>,
    /// Whether the run was interrupted
    pub cancelled: bool,
}

impl RunReport {
    /// Process exit code: 0 when every account succeeded, 2 when some failed,
    /// 1 when none succeeded.
    pub fn exit_code(&self) -> i32 {
        match (self.accounts.is_empty(), self.failures.is_empty()) {
            (_, true) => 0,
            (true, false) => 1,
            (false, false) => 2,
        }
    }

    /// Whether any successfully processed account produced target records.
    pub fn has_target_records(&self) -> bool {
        self.accounts.iter().any(|summary| summary.target > 0)
    }
}

/// First day of an `days` long window ending on `run_date`.
pub fn window_start(run_date: NaiveDate, days: u32) -> NaiveDate {
    run_date
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Processes every configured account.
///
/// Artifacts are written for `run_date`; the lookback window covers `days`
/// days before it. Cancelling `cancel` stops fetching and committing; already
/// committed records are still written.
pub async fn run_analysis(
    config: &AppConfig,
    days: u32,
    run_date: NaiveDate,
    connector: Arc<dyn MailboxConnector>,
    classifier: Classifier,
    cancel: CancellationToken,
) -> RunReport {
    let stats = Arc::new(ProcessingStats::new());
    let ctx = RunContext {
        run_date,
        window_start: window_start(run_date, days),
        log_dir: config.log_dir.clone(),
        cache_dir: config.cache_dir(),
        max_concurrency: config.max_concurrency.max(1),
        classifier: classifier.with_stats(Arc::clone(&stats)),
        stats: Arc::clone(&stats),
        cancel,
    };
    log::info!(
        "Processing {} account(s), window {} .. {}",
        config.accounts.len(),
        ctx.window_start,
        run_date
    );

    let ctx_ref = &ctx;
    let connector_ref = connector.as_ref();
    let outcomes: Vec<(String, Result<AccountSummary, AccountError>)> =
        stream::iter(config.accounts.values())
            .map(|account| async move {
                log::debug!("--- Processing account: {} ---", account.name);
                let outcome = account::process_account(account, connector_ref, ctx_ref).await;
                (account.name.clone(), outcome)
            })
            .buffer_unordered(config.max_accounts_in_parallel.max(1))
            .collect()
            .await;

    let mut report = RunReport {
        run_date,
        window_start: ctx.window_start,
        accounts: Vec::new(),
        failures: Vec::new(),
        stats,
        cancelled: ctx.cancel.is_cancelled(),
    };
    for (name, outcome) in outcomes {
        match outcome {
            Ok(summary) => report.accounts.push(summary),
            Err(e) => {
                log::error!("Account '{name}' failed: {e}");
                if matches!(e, AccountError::Mailbox(_)) {
                    report.stats.increment_error(ErrorType::MailboxError);
                }
                report.failures.push((name, e));
            }
        }
    }
    report.accounts.sort_by(|a, b| a.account.cmp(&b.account));
    report.failures.sort_by(|a, b| a.0.cmp(&b.0));
    report
}

/// Checks the inference service before a run.
///
/// Problems are only logged; affected records degrade to the default category.
pub async fn probe_inference(client: &OllamaClient) {
    match client.check_model().await {
        Ok(true) => log::debug!("Inference model {} is available", client.model()),
        Ok(false) => log::warn!(
            "Model {} is not available on the inference service; bounces will be classified as server_error",
            client.model()
        ),
        Err(e) => log::warn!(
            "Inference service check failed: {e}; bounces will be classified as server_error"
        ),
    }
}
