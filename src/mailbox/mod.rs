//! Mailbox access.
//!
//! The run only talks to mailboxes through the [`MailboxConnector`] and
//! [`MailboxSession`] traits, so tests can substitute an in-memory mailbox.
//! [`ImapConnector`] is the production implementation.

mod imap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::config::AccountConfig;
use crate::error_handling::MailboxError;

pub use imap::ImapConnector;

/// A fetched message with its envelope metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Folder the message was fetched from
    pub folder: String,
    /// Mailbox UID
    pub uid: u32,
    /// Server receive time (IMAP `INTERNALDATE`), when reported
    pub received: Option<DateTime<FixedOffset>>,
    /// Full RFC 5322 message
    pub bytes: Vec<u8>,
}

impl RawMessage {
    pub fn new(folder: impl Into<String>, uid: u32, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            folder: folder.into(),
            uid,
            received: None,
            bytes: bytes.into(),
        }
    }
}

/// Opens authenticated sessions for accounts.
#[async_trait]
pub trait MailboxConnector: Send + Sync {
    /// Connects and logs in.
    ///
    /// # Errors
    ///
    /// Returns a `MailboxError` if the connection, TLS setup or login fails.
    async fn connect(
        &self,
        account: &AccountConfig,
    ) -> Result<Box<dyn MailboxSession>, MailboxError>;
}

/// An authenticated, read-only mailbox session.
#[async_trait]
pub trait MailboxSession: Send {
    /// UIDs of the messages in `folder` received on or after `since`.
    async fn list(&mut self, folder: &str, since: NaiveDate) -> Result<Vec<u32>, MailboxError>;

    /// Fetches one message without marking it as seen.
    ///
    /// Returns `Ok(None)` if the message no longer exists.
    async fn fetch(&mut self, folder: &str, uid: u32) -> Result<Option<RawMessage>, MailboxError>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<(), MailboxError>;
}
