//! The `cleanup` command.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::config::AppConfig;
use crate::fingerprint::FingerprintCache;
use crate::report::remove_day;

/// What a cleanup removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub files_deleted: usize,
    pub cache_entries_removed: usize,
}

/// Deletes the artifacts of `date` and the cache entries first seen on it, so
/// that the next run processes that day from scratch.
///
/// # Errors
///
/// Returns an error if an artifact cannot be deleted or a cache cannot be
/// written back.
pub async fn run_cleanup(config: &AppConfig, date: NaiveDate) -> Result<CleanupReport> {
    let deleted = remove_day(&config.log_dir, date)
        .await
        .context("Failed to delete report files")?;
    if deleted.is_empty() {
        log::info!("No report files found for {}", date.format("%Y%m%d"));
    }

    let cache_dir = config.cache_dir();
    let mut removed_total = 0;
    for account in config.accounts.keys() {
        let path = FingerprintCache::path_for(&cache_dir, account);
        let mut cache = FingerprintCache::load(path).await;
        let removed = cache.remove_date(date);
        if removed > 0 {
            cache
                .flush()
                .await
                .with_context(|| format!("Failed to update cache of account '{account}'"))?;
            log::debug!("Removed {removed} cache entries of account '{account}'");
        }
        removed_total += removed;
    }
    if removed_total == 0 {
        log::info!("No cache entries found for {date}");
    }

    let report = CleanupReport {
        files_deleted: deleted.len(),
        cache_entries_removed: removed_total,
    };
    log::info!(
        "Cleanup complete: {} file(s) deleted, {} cache entry(ies) removed.",
        report.files_deleted,
        report.cache_entries_removed
    );
    Ok(report)
}
