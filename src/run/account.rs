//! Processing of a single account.
//!
//! Fetching and parsing are sequential. New bounces are classified
//! concurrently, and the results are committed in fetch order. The cache is
//! only touched by the committing loop, never across a network call.

use std::collections::{BTreeMap, HashSet};

use futures::stream::{self, StreamExt};

use crate::classify::{Category, Disposition};
use crate::config::AccountConfig;
use crate::error_handling::{AccountError, ErrorType, InfoType, MailboxError};
use crate::fingerprint::{Fingerprint, FingerprintCache};
use crate::mailbox::{MailboxConnector, MailboxSession, RawMessage};
use crate::parse::{try_parse_bounces, BounceRecord};
use crate::report::{write_account_report, AccountReport, ReportRecord};

use super::RunContext;

/// Outcome of a successfully processed account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountSummary {
    /// Account name
    pub account: String,
    /// Messages fetched from the mailbox
    pub scanned: usize,
    /// Messages skipped because they were processed before
    pub already_processed: usize,
    /// Classified records per category
    pub categories: BTreeMap<Category, usize>,
    /// Target records of this run
    pub target: usize,
    /// Excluded records of this run
    pub excluded: usize,
    /// Whether processing stopped early on cancellation
    pub interrupted: bool,
}

impl AccountSummary {
    pub fn total(&self) -> usize {
        self.target + self.excluded
    }
}

/// A fetched bounce waiting for classification.
struct PendingMessage {
    fingerprint: Fingerprint,
    records: Vec<BounceRecord>,
}

/// Runs fetch → parse → classify → report for `account`.
///
/// # Errors
///
/// Returns an `AccountError` if the mailbox cannot be opened or read, or if
/// the artifacts or the cache cannot be written.
pub(crate) async fn process_account(
    account: &AccountConfig,
    connector: &dyn MailboxConnector,
    ctx: &RunContext,
) -> Result<AccountSummary, AccountError> {
    let mut cache = load_cache(account, ctx).await;
    let pruned = cache.prune(ctx.window_start);
    if pruned > 0 {
        log::debug!("[{}] Pruned {pruned} stale cache entries", account.name);
        ctx.stats.add_info(InfoType::CachePruned, pruned);
    }

    let mut summary = AccountSummary {
        account: account.name.clone(),
        ..AccountSummary::default()
    };

    let mut session = connector.connect(account).await?;
    let collected = collect_bounces(account, session.as_mut(), &mut cache, &mut summary, ctx).await;
    if let Err(e) = session.logout().await {
        log::debug!("[{}] Logout failed: {e}", account.name);
    }
    let pending = collected?;

    let mut report = AccountReport::default();
    let expected = pending.len();
    let mut committed = 0;
    {
        let classifier = &ctx.classifier;
        let classified = stream::iter(pending)
            .map(|message| async move {
                let mut records = Vec::with_capacity(message.records.len());
                for record in message.records {
                    let classification = classifier.classify_or_default(&record).await;
                    log::debug!(
                        "5xx [{}] {} -> {}",
                        record.error_code.as_deref().unwrap_or("---"),
                        classification.disposition(),
                        record.to_addr
                    );
                    records.push(ReportRecord::new(record, classification));
                }
                (message.fingerprint, records)
            })
            .buffered(ctx.max_concurrency)
            .take_until(ctx.cancel.cancelled());
        let mut classified = std::pin::pin!(classified);

        while let Some((fingerprint, records)) = classified.next().await {
            for record in records {
                if let Some(category) = record.category() {
                    *summary.categories.entry(category).or_insert(0) += 1;
                    match category.disposition() {
                        Disposition::Target => {
                            summary.target += 1;
                            ctx.stats.increment_info(InfoType::TargetRecord);
                        }
                        Disposition::Excluded => {
                            summary.excluded += 1;
                            ctx.stats.increment_info(InfoType::ExcludedRecord);
                        }
                    }
                }
                report.push(record);
            }
            cache.record(&fingerprint, ctx.run_date);
            committed += 1;
        }
    }
    if committed < expected {
        log::warn!(
            "[{}] Interrupted: {} bounce message(s) left for the next run",
            account.name,
            expected - committed
        );
        summary.interrupted = true;
    }

    write_account_report(&ctx.log_dir, ctx.run_date, &account.name, &report)
        .await
        .inspect_err(|_| ctx.stats.increment_error(ErrorType::ReportIoError))?;
    cache
        .flush()
        .await
        .inspect_err(|_| ctx.stats.increment_error(ErrorType::CacheIoError))?;

    log::info!(
        "Account '{}': {} bounce record(s), {} target, {} excluded (recipient)",
        account.name,
        summary.total(),
        summary.target,
        summary.excluded
    );
    Ok(summary)
}

async fn load_cache(account: &AccountConfig, ctx: &RunContext) -> FingerprintCache {
    let path = FingerprintCache::path_for(&ctx.cache_dir, &account.name);
    match FingerprintCache::try_load(path.clone()).await {
        Ok(cache) => cache,
        Err(e) => {
            log::error!("[{}] {e}; starting with an empty cache", account.name);
            ctx.stats.increment_error(ErrorType::CacheIoError);
            FingerprintCache::empty(path)
        }
    }
}

/// Fetches and parses every message of the window that is not cached yet.
///
/// Non-bounces and malformed messages are recorded in the cache right away;
/// bounces are returned for classification.
async fn collect_bounces(
    account: &AccountConfig,
    session: &mut dyn MailboxSession,
    cache: &mut FingerprintCache,
    summary: &mut AccountSummary,
    ctx: &RunContext,
) -> Result<Vec<PendingMessage>, MailboxError> {
    let mut pending = Vec::new();
    let mut queued: HashSet<Fingerprint> = HashSet::new();

    'folders: for folder in &account.folders {
        let uids = match session.list(folder, ctx.window_start).await {
            Ok(uids) => uids,
            Err(MailboxError::Rejected { command, response }) => {
                log::warn!(
                    "[{}] Skipping folder {folder}: {command} rejected: {response}",
                    account.name
                );
                ctx.stats.increment_error(ErrorType::MailboxError);
                continue;
            }
            Err(e) => return Err(e),
        };
        log::info!(
            "[{}] Found {} message(s) in {folder} since {}",
            account.name,
            uids.len(),
            ctx.window_start
        );

        for uid in uids {
            if ctx.cancel.is_cancelled() {
                summary.interrupted = true;
                break 'folders;
            }
            let raw = match session.fetch(folder, uid).await {
                Ok(Some(raw)) => raw,
                Ok(None) => {
                    log::debug!("[{}] Message {uid} in {folder} vanished", account.name);
                    continue;
                }
                Err(e @ (MailboxError::Rejected { .. } | MailboxError::Protocol(_))) => {
                    log::warn!("[{}] Failed to fetch {uid} in {folder}: {e}", account.name);
                    ctx.stats.increment_error(ErrorType::FetchError);
                    continue;
                }
                Err(e) => return Err(e),
            };
            summary.scanned += 1;
            ctx.stats.increment_info(InfoType::MessageScanned);

            if let Some(message) =
                inspect_message(account, &raw, cache, &mut queued, summary, ctx)
            {
                pending.push(message);
            }
        }
    }
    Ok(pending)
}

/// Cache-gated parse of one message.
fn inspect_message(
    account: &AccountConfig,
    raw: &RawMessage,
    cache: &mut FingerprintCache,
    queued: &mut HashSet<Fingerprint>,
    summary: &mut AccountSummary,
    ctx: &RunContext,
) -> Option<PendingMessage> {
    let fingerprint = Fingerprint::of_message(&raw.bytes);
    if cache.seen(&fingerprint) || queued.contains(&fingerprint) {
        summary.already_processed += 1;
        ctx.stats.increment_info(InfoType::CacheHit);
        return None;
    }

    let mut records = match try_parse_bounces(raw) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("[{}] {e}", account.name);
            ctx.stats.increment_error(ErrorType::ParseError);
            cache.record(&fingerprint, ctx.run_date);
            return None;
        }
    };
    if records.is_empty() {
        ctx.stats.increment_info(InfoType::NotBounce);
        cache.record(&fingerprint, ctx.run_date);
        return None;
    }

    ctx.stats.add_info(InfoType::BounceParsed, records.len());
    for record in &mut records {
        if record.from_addr.is_empty() {
            record.from_addr = account.username.clone();
        }
    }
    queued.insert(fingerprint.clone());
    Some(PendingMessage {
        fingerprint,
        records,
    })
}
