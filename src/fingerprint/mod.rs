//! Message fingerprints and the per-account processed-message cache.
//!
//! A fingerprint is a SHA-256 digest over the canonicalized identity headers of
//! a message (Message-ID, From, To, Date, Subject). The folder, UID and fetch
//! order never participate, so a bounce moved between folders or re-fetched
//! later maps to the same fingerprint.

mod cache;

use std::fmt;

use mail_parser::MessageParser;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::normalize_whitespace;

pub use cache::FingerprintCache;

/// Separates fields in the digest input
const FIELD_SEPARATOR: char = '\u{1f}';
/// Version prefix of the digest input, bumped if canonicalization changes
const IDENTITY_VERSION: &str = "v1";

/// Hex encoded SHA-256 identity of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of a raw RFC 5322 message.
    ///
    /// Messages without any identity header are hashed over their full
    /// content instead.
    pub fn of_message(bytes: &[u8]) -> Self {
        let identity = MessageIdentity::from_bytes(bytes);
        if identity.is_empty() {
            let mut hasher = Sha256::new();
            hasher.update(b"raw");
            hasher.update(bytes);
            return Self(format!("{:x}", hasher.finalize()));
        }
        Self::of_identity(&identity)
    }

    /// Fingerprint of already extracted identity fields.
    pub fn of_identity(identity: &MessageIdentity) -> Self {
        let input = [
            IDENTITY_VERSION,
            identity.message_id.as_str(),
            identity.from.as_str(),
            identity.to.as_str(),
            identity.date.as_str(),
            identity.subject.as_str(),
        ]
        .join(&FIELD_SEPARATOR.to_string());

        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Canonicalized identity headers of a message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MessageIdentity {
    /// Message-ID without angle brackets, lowercased
    pub message_id: String,
    /// First From address, lowercased
    pub from: String,
    /// All To addresses, lowercased and comma separated
    pub to: String,
    /// Raw Date header with whitespace collapsed
    pub date: String,
    /// Decoded Subject with whitespace collapsed
    pub subject: String,
}

impl MessageIdentity {
    /// Extracts the identity headers; unparseable input yields empty fields.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let Some(message) = MessageParser::default().parse(bytes) else {
            return Self::default();
        };

        let to = message
            .to()
            .map(|list| {
                list.iter()
                    .filter_map(|a| a.address())
                    .map(|a| a.trim().to_lowercase())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .unwrap_or_default();

        Self {
            message_id: message
                .message_id()
                .map(|id| id.trim().trim_matches(['<', '>']).to_lowercase())
                .unwrap_or_default(),
            from: message
                .from()
                .and_then(|addr| addr.first())
                .and_then(|a| a.address())
                .map(|a| a.trim().to_lowercase())
                .unwrap_or_default(),
            to,
            date: message
                .header_raw("Date")
                .map(normalize_whitespace)
                .unwrap_or_default(),
            subject: message
                .subject()
                .map(normalize_whitespace)
                .unwrap_or_default(),
        }
    }

    fn is_empty(&self) -> bool {
        self.message_id.is_empty()
            && self.from.is_empty()
            && self.to.is_empty()
            && self.date.is_empty()
            && self.subject.is_empty()
    }
}
