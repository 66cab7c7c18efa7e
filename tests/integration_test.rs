//! End-to-end tests of the run pipeline.
//!
//! These tests drive `run_analysis()` with an in-memory mailbox and a scripted
//! inference service, and inspect the artifacts and caches it leaves in a
//! temporary directory. They do not make network requests.

mod helpers;

use std::sync::Arc;

use bounce_analyzer::classify::{Category, Disposition};
use bounce_analyzer::error_handling::{ErrorType, InfoType};
use bounce_analyzer::report::{artifact_path, load_day};
use bounce_analyzer::run::{run_analysis, run_cleanup, RunReport};
use bounce_analyzer::AppConfig;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use helpers::{
    classifier, dsn_bounce, plain_message, run_date, test_config, CodeKeyedInference,
    MemoryConnector,
};

fn recipient_side_inference() -> Arc<CodeKeyedInference> {
    Arc::new(CodeKeyedInference::new(&[
        ("552", Category::MailboxFull),
        ("550", Category::UnknownRecipient),
        ("554", Category::IpBlock),
    ]))
}

fn two_bounce_mailbox() -> MemoryConnector {
    let connector = MemoryConnector::new();
    connector.add_message(
        "acct1",
        "INBOX",
        dsn_bounce("b1", "full@remote.example", "5.2.2", "552 5.2.2 Mailbox full"),
    );
    connector.add_message(
        "acct1",
        "INBOX",
        dsn_bounce("b2", "nobody@remote.example", "5.1.1", "550 5.1.1 No such user"),
    );
    connector
}

async fn run_once(
    config: &AppConfig,
    connector: &MemoryConnector,
    inference: &Arc<CodeKeyedInference>,
) -> RunReport {
    run_analysis(
        config,
        7,
        run_date(),
        Arc::new(connector.clone()),
        classifier(config, inference.clone()),
        CancellationToken::new(),
    )
    .await
}

#[tokio::test]
async fn test_recipient_failures_land_in_excluded() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = two_bounce_mailbox();
    let inference = recipient_side_inference();

    let report = run_once(&config, &connector, &inference).await;
    assert_eq!(report.exit_code(), 0);
    assert!(!report.has_target_records());
    assert_eq!(report.accounts.len(), 1);
    let summary = &report.accounts[0];
    assert_eq!(summary.scanned, 2);
    assert_eq!(summary.excluded, 2);
    assert_eq!(summary.target, 0);
    assert_eq!(summary.categories.get(&Category::MailboxFull), Some(&1));
    assert_eq!(summary.categories.get(&Category::UnknownRecipient), Some(&1));

    let view = load_day(&config.log_dir, run_date()).await;
    let acct1 = &view.accounts["acct1"];
    assert!(acct1.target.is_empty());
    assert_eq!(acct1.excluded.len(), 2);
    assert_eq!(acct1.excluded[0].error_code.as_deref(), Some("552"));
    assert_eq!(acct1.excluded[0].to_addr, "full@remote.example");
    assert_eq!(acct1.excluded[0].category(), Some(Category::MailboxFull));
    assert_eq!(acct1.excluded[1].error_code.as_deref(), Some("550"));
    assert_eq!(acct1.excluded[1].category(), Some(Category::UnknownRecipient));

    // Both artifacts exist, the target one as an empty array
    let target = artifact_path(&config.log_dir, run_date(), "acct1", Disposition::Target);
    let content = std::fs::read_to_string(&target).expect("target artifact should exist");
    let parsed: serde_json::Value = serde_json::from_str(&content).expect("valid JSON");
    assert_eq!(parsed, serde_json::json!([]));
}

#[tokio::test]
async fn test_rerun_skips_processed_messages() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = two_bounce_mailbox();
    let inference = recipient_side_inference();

    run_once(&config, &connector, &inference).await;
    assert_eq!(inference.calls(), 2);

    let second = run_once(&config, &connector, &inference).await;
    assert_eq!(second.exit_code(), 0);
    assert_eq!(inference.calls(), 2, "cached messages must not be classified again");
    assert_eq!(second.accounts[0].already_processed, 2);
    assert_eq!(second.accounts[0].total(), 0);
    assert_eq!(second.stats.get_info_count(InfoType::CacheHit), 2);

    let view = load_day(&config.log_dir, run_date()).await;
    assert_eq!(view.total_records(), 2, "artifacts must not gain duplicates");
}

#[tokio::test]
async fn test_cleanup_allows_reprocessing() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = two_bounce_mailbox();
    let inference = recipient_side_inference();

    run_once(&config, &connector, &inference).await;

    let cleanup = run_cleanup(&config, run_date())
        .await
        .expect("cleanup should succeed");
    assert_eq!(cleanup.files_deleted, 2);
    assert_eq!(cleanup.cache_entries_removed, 2);
    assert!(load_day(&config.log_dir, run_date()).await.accounts.is_empty());

    let rerun = run_once(&config, &connector, &inference).await;
    assert_eq!(rerun.accounts[0].total(), 2);
    assert_eq!(inference.calls(), 4);
    assert_eq!(load_day(&config.log_dir, run_date()).await.total_records(), 2);
}

#[tokio::test]
async fn test_cleanup_without_data_is_noop() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);

    let cleanup = run_cleanup(&config, run_date())
        .await
        .expect("cleanup should succeed");
    assert_eq!(cleanup.files_deleted, 0);
    assert_eq!(cleanup.cache_entries_removed, 0);
}

#[tokio::test]
async fn test_non_bounces_are_cached() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = MemoryConnector::new();
    connector.add_message("acct1", "INBOX", plain_message("lunch-1"));
    let inference = recipient_side_inference();

    let first = run_once(&config, &connector, &inference).await;
    assert_eq!(first.stats.get_info_count(InfoType::NotBounce), 1);
    assert_eq!(first.accounts[0].total(), 0);

    let second = run_once(&config, &connector, &inference).await;
    assert_eq!(second.stats.get_info_count(InfoType::NotBounce), 0);
    assert_eq!(second.stats.get_info_count(InfoType::CacheHit), 1);
    assert_eq!(inference.calls(), 0);
}

#[tokio::test]
async fn test_unclassifiable_record_degrades_to_target() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = MemoryConnector::new();
    connector.add_message(
        "acct1",
        "INBOX",
        dsn_bounce("b9", "x@remote.example", "5.0.0", "571 5.0.0 Delivery not authorized"),
    );
    // No scripted answer for 571: the service reports 404 and is not retried
    let inference = recipient_side_inference();

    let report = run_once(&config, &connector, &inference).await;
    assert_eq!(inference.calls(), 1);
    assert_eq!(report.stats.get_error_count(ErrorType::ClassificationError), 1);
    assert!(report.has_target_records());

    let view = load_day(&config.log_dir, run_date()).await;
    let record = &view.accounts["acct1"].target[0];
    assert_eq!(record.category(), Some(Category::DEFAULT));
    assert!(record.ai_reason.starts_with("Classification failed"));
}

#[tokio::test]
async fn test_failed_account_does_not_stop_others() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1", "acct2"]);
    let connector = two_bounce_mailbox();
    connector.refuse("acct2");
    let inference = recipient_side_inference();

    let report = run_once(&config, &connector, &inference).await;
    assert_eq!(report.exit_code(), 2);
    assert_eq!(report.accounts.len(), 1);
    assert_eq!(report.accounts[0].account, "acct1");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "acct2");
    assert_eq!(report.stats.get_error_count(ErrorType::MailboxError), 1);

    let view = load_day(&config.log_dir, run_date()).await;
    assert!(view.accounts.contains_key("acct1"));
    assert!(!view.accounts.contains_key("acct2"));
}

#[tokio::test]
async fn test_all_accounts_failed_exit_code() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = MemoryConnector::new();
    connector.refuse("acct1");

    let report = run_once(&config, &connector, &recipient_side_inference()).await;
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn test_cancelled_run_leaves_messages_for_next_run() {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let config = test_config(dir.path(), &["acct1"]);
    let connector = two_bounce_mailbox();
    let inference = recipient_side_inference();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = run_analysis(
        &config,
        7,
        run_date(),
        Arc::new(connector.clone()),
        classifier(&config, inference.clone()),
        cancel,
    )
    .await;
    assert!(report.cancelled);
    assert!(report.accounts[0].interrupted);
    assert_eq!(connector.fetch_count(), 0);
    assert_eq!(inference.calls(), 0);

    let resumed = run_once(&config, &connector, &inference).await;
    assert!(!resumed.cancelled);
    assert_eq!(resumed.accounts[0].total(), 2);
}
