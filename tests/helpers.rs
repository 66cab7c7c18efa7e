// Shared test helpers: bounce message builders, an in-memory mailbox and a
// scripted inference service.
//
// This module provides common utilities used across multiple test files to reduce duplication.

#![allow(dead_code)] // Each test binary uses a different subset

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use bounce_analyzer::classify::{Category, Classifier, Inference};
use bounce_analyzer::config::{parse_config, AccountConfig, AppConfig};
use bounce_analyzer::error_handling::{InferenceError, MailboxError};
use bounce_analyzer::initialization::init_semaphore;
use bounce_analyzer::mailbox::{MailboxConnector, MailboxSession, RawMessage};

/// The run date used by the end-to-end scenarios.
pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 10).expect("valid date")
}

/// A configuration with the given accounts whose directories live in `dir`.
///
/// Retries are fast so that degraded classifications do not slow tests down.
pub fn test_config(dir: &Path, accounts: &[&str]) -> AppConfig {
    let accounts: Vec<String> = accounts
        .iter()
        .map(|name| {
            format!(
                r#""{name}": {{"host": "imap.example.com", "port": 993, "username": "{name}@ourco.example", "password": "p", "security": "ssl", "check": ["INBOX"]}}"#
            )
        })
        .collect();
    let json = format!(
        r#"{{
            "max_concurrency": 2,
            "ollama": {{"timeout_secs": 5, "max_attempts": 2, "retry_initial_delay_ms": 2}},
            "accounts": {{{}}}
        }}"#,
        accounts.join(",")
    );
    parse_config(&json, dir).expect("valid test config")
}

/// A DSN bounce (multipart/report) for one failed recipient.
///
/// `id` makes the Message-ID unique; `status` is the `5.x.y` status and
/// `diagnostic` the SMTP reply (`"552 5.2.2 Mailbox full"`).
pub fn dsn_bounce(id: &str, recipient: &str, status: &str, diagnostic: &str) -> Vec<u8> {
    format!(
        "From: Mail Delivery System <MAILER-DAEMON@mx.remote.example>
To: sender@ourco.example
Subject: Undelivered Mail Returned to Sender
Date: Tue, 10 Feb 2026 09:15:00 +0000
Message-ID: <{id}@mx.remote.example>
MIME-Version: 1.0
Content-Type: multipart/report; report-type=delivery-status; boundary=\"BOUNDARY\"

--BOUNDARY
Content-Type: text/plain; charset=utf-8

This is the mail system at host mx.remote.example.
Your message could not be delivered to {recipient}.

--BOUNDARY
Content-Type: message/delivery-status

Reporting-MTA: dns; mx.remote.example

Final-Recipient: rfc822; {recipient}
Action: failed
Status: {status}
Diagnostic-Code: smtp; {diagnostic}

--BOUNDARY
Content-Type: message/rfc822

From: Sender <sender@ourco.example>
To: {recipient}
Subject: Monthly newsletter
Date: Tue, 10 Feb 2026 09:14:50 +0000
Message-ID: <orig-{id}@ourco.example>

Hello!

--BOUNDARY--
"
    )
    .replace('\n', "\r\n")
    .into_bytes()
}

/// A regular message that is not a bounce.
pub fn plain_message(id: &str) -> Vec<u8> {
    format!(
        "From: colleague@ourco.example
To: sender@ourco.example
Subject: Lunch?
Date: Tue, 10 Feb 2026 11:00:00 +0000
Message-ID: <{id}@ourco.example>

Noon at the usual place?
"
    )
    .replace('\n', "\r\n")
    .into_bytes()
}

type Folders = BTreeMap<String, Vec<Vec<u8>>>;

/// In-memory mailbox keyed by account and folder.
///
/// UIDs are 1-based positions in the folder. Accounts marked with
/// [`MemoryConnector::refuse`] fail to connect.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    mailboxes: Arc<Mutex<HashMap<String, Folders>>>,
    refused: Arc<Mutex<HashSet<String>>>,
    fetches: Arc<AtomicUsize>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&self, account: &str, folder: &str, bytes: Vec<u8>) {
        self.mailboxes
            .lock()
            .expect("lock")
            .entry(account.to_string())
            .or_default()
            .entry(folder.to_string())
            .or_default()
            .push(bytes);
    }

    pub fn refuse(&self, account: &str) {
        self.refused.lock().expect("lock").insert(account.to_string());
    }

    /// Messages fetched so far, across all sessions.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailboxConnector for MemoryConnector {
    async fn connect(
        &self,
        account: &AccountConfig,
    ) -> Result<Box<dyn MailboxSession>, MailboxError> {
        if self.refused.lock().expect("lock").contains(&account.name) {
            return Err(MailboxError::Rejected {
                command: "LOGIN".to_string(),
                response: "NO [AUTHENTICATIONFAILED] Invalid credentials".to_string(),
            });
        }
        let folders = self
            .mailboxes
            .lock()
            .expect("lock")
            .get(&account.name)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(MemorySession {
            folders,
            fetches: Arc::clone(&self.fetches),
        }))
    }
}

struct MemorySession {
    folders: Folders,
    fetches: Arc<AtomicUsize>,
}

#[async_trait]
impl MailboxSession for MemorySession {
    async fn list(&mut self, folder: &str, _since: NaiveDate) -> Result<Vec<u32>, MailboxError> {
        let count = self.folders.get(folder).map_or(0, Vec::len);
        Ok((1..=count as u32).collect())
    }

    async fn fetch(&mut self, folder: &str, uid: u32) -> Result<Option<RawMessage>, MailboxError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .folders
            .get(folder)
            .and_then(|messages| messages.get(uid as usize - 1))
            .cloned();
        Ok(bytes.map(|bytes| RawMessage::new(folder, uid, bytes)))
    }

    async fn logout(&mut self) -> Result<(), MailboxError> {
        Ok(())
    }
}

/// Answers with a fixed category per SMTP reply code found in the prompt.
#[derive(Default)]
pub struct CodeKeyedInference {
    answers: HashMap<String, Category>,
    calls: AtomicUsize,
}

impl CodeKeyedInference {
    pub fn new(answers: &[(&str, Category)]) -> Self {
        Self {
            answers: answers
                .iter()
                .map(|(code, category)| (code.to_string(), *category))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Inference for CodeKeyedInference {
    async fn infer(&self, prompt: &str) -> Result<String, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let code = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Error Code: "))
            .unwrap_or_default()
            .trim();
        match self.answers.get(code) {
            Some(category) => Ok(format!(
                r#"{{"category": "{category}", "responsible_party": "recipient", "reason": "code {code}"}}"#
            )),
            None => Err(InferenceError::Status {
                status: 404,
                message: "model not found".to_string(),
            }),
        }
    }
}

/// A classifier over `inference` using the test config's retry settings.
pub fn classifier(config: &AppConfig, inference: Arc<dyn Inference>) -> Classifier {
    Classifier::new(inference, init_semaphore(config.max_concurrency), &config.ollama)
}
