//! End-of-run summary logging.

use super::{AccountSummary, RunReport};

/// One summary line: per-category counts and the account total.
pub fn format_account_line(summary: &AccountSummary) -> String {
    let parts: Vec<String> = summary
        .categories
        .iter()
        .map(|(category, count)| format!("{category}: {count}"))
        .collect();
    let counts = if parts.is_empty() {
        "no records".to_string()
    } else {
        parts.join(", ")
    };
    format!("{}: {counts} (total: {})", summary.account, summary.total())
}

/// Logs the per-account record summary, failures and run statistics.
pub fn log_run_summary(report: &RunReport) {
    if report.accounts.iter().all(|summary| summary.total() == 0) {
        log::info!("No bounce records found across all accounts.");
    } else {
        log::info!("=== Bounce record summary ===");
        for summary in &report.accounts {
            log::info!("  {}", format_account_line(summary));
        }
        if report.accounts.len() > 1 {
            let grand_total: usize = report.accounts.iter().map(AccountSummary::total).sum();
            log::info!("  Grand total: {grand_total}");
        }
    }

    for (account, error) in &report.failures {
        log::error!("  {account}: FAILED ({error})");
    }
    if report.cancelled {
        log::warn!("Run was interrupted; remaining messages will be processed by the next run");
    }

    report.stats.log_summary();

    if report.has_target_records() {
        log::info!(
            "Tip: bounce_analyzer report {} shows the records that need action",
            report.run_date
        );
    }
}
