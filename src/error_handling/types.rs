//! Error type definitions.
//!
//! This module defines all error and info types used throughout the application.

use std::path::PathBuf;

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] reqwest::Error),
}

/// Errors raised while loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Cannot read config file {}: {source}", path.display())]
    Read {
        /// Path that was read
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file is not valid JSON or has wrong value types.
    #[error("Invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    /// An account lacks a required field.
    #[error("Account '{account}' missing required field: {field}")]
    MissingField {
        /// Account name
        account: String,
        /// Missing field name
        field: &'static str,
    },

    /// `password_env` names an unset environment variable.
    #[error("Account '{account}': environment variable {var} is not set")]
    MissingEnv {
        /// Account name
        account: String,
        /// Variable name
        var: String,
    },

    /// The inference base URL cannot be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// Configured URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// No account is configured.
    #[error("No accounts configured")]
    NoAccounts,
}

/// A message that could not be parsed as MIME.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The payload is not a MIME message at all.
    #[error("Malformed message (uid {uid} in {folder})")]
    Malformed {
        /// Folder the message came from
        folder: String,
        /// Mailbox UID
        uid: u32,
    },
}

/// Failures of a single inference call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The call did not finish within the configured timeout.
    #[error("Inference request timed out")]
    Timeout,

    /// The service could not be reached.
    #[error("Inference service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The service answered with a non-success HTTP status.
    #[error("Inference service returned HTTP {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// The response envelope could not be decoded.
    #[error("Invalid inference response: {0}")]
    InvalidResponse(String),
}

/// Classification of a bounce failed after all attempts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    /// The inference service failed.
    #[error("Classification unavailable: {0}")]
    Unavailable(#[from] InferenceError),

    /// The service answered but no category could be read from it.
    #[error("Unparseable classification answer: {0}")]
    Unparseable(String),
}

/// A category label that is not part of the taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown category: {0}")]
pub struct UnknownCategoryError(pub String);

/// The fingerprint cache file could not be read or written.
#[derive(Error, Debug)]
pub enum CacheIoError {
    /// Reading or writing the file failed.
    #[error("Cache file {}: {source}", path.display())]
    Io {
        /// Cache file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file content is not a fingerprint → date mapping.
    #[error("Corrupt cache file {}: {source}", path.display())]
    Corrupt {
        /// Cache file path
        path: PathBuf,
        /// Decoder error
        source: serde_json::Error,
    },
}

/// A report artifact could not be read or written.
#[derive(Error, Debug)]
pub enum ReportIoError {
    /// Reading or writing the file failed.
    #[error("Report file {}: {source}", path.display())]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// The file content is not a record array.
    #[error("Invalid report file {}: {source}", path.display())]
    Json {
        /// Artifact path
        path: PathBuf,
        /// Decoder error
        source: serde_json::Error,
    },
}

/// Failures of the mailbox collaborator.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Socket level failure.
    #[error("Mailbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS setup failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The operation exceeded the mailbox timeout.
    #[error("Mailbox operation timed out: {0}")]
    Timeout(&'static str),

    /// The server rejected a command.
    #[error("Server rejected {command}: {response}")]
    Rejected {
        /// Command verb
        command: String,
        /// Server response line
        response: String,
    },

    /// The server sent something that is not valid IMAP.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// Fatal failure of one account; other accounts keep running.
#[derive(Error, Debug)]
pub enum AccountError {
    /// Connecting, logging in or listing failed.
    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    /// The day's artifacts could not be written.
    #[error(transparent)]
    Report(#[from] ReportIoError),

    /// The cache could not be flushed.
    #[error(transparent)]
    Cache(#[from] CacheIoError),
}

/// Types of errors counted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    /// A message could not be parsed
    ParseError,
    /// A single message could not be fetched
    FetchError,
    /// Classification fell back to the default category
    ClassificationError,
    /// The cache could not be loaded or flushed
    CacheIoError,
    /// An artifact could not be written
    ReportIoError,
    /// An account could not connect or list its folders
    MailboxError,
}

/// Types of informational metrics counted during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum InfoType {
    /// Messages fetched from the mailbox
    MessageScanned,
    /// Messages skipped because their fingerprint was cached
    CacheHit,
    /// Messages that are not 5xx bounces
    NotBounce,
    /// Bounce records extracted
    BounceParsed,
    /// Classified records that need action
    TargetRecord,
    /// Classified records excluded from action
    ExcludedRecord,
    /// Cache entries dropped by pruning
    CachePruned,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    /// Human readable label
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ParseError => "Message parse error",
            ErrorType::FetchError => "Message fetch error",
            ErrorType::ClassificationError => "Classification fallback",
            ErrorType::CacheIoError => "Cache I/O error",
            ErrorType::ReportIoError => "Report I/O error",
            ErrorType::MailboxError => "Mailbox error",
        }
    }
}

impl std::fmt::Display for InfoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl InfoType {
    /// Human readable label
    pub fn as_str(&self) -> &'static str {
        match self {
            InfoType::MessageScanned => "Messages scanned",
            InfoType::CacheHit => "Already processed",
            InfoType::NotBounce => "Not a 5xx bounce",
            InfoType::BounceParsed => "Bounce records",
            InfoType::TargetRecord => "Target records",
            InfoType::ExcludedRecord => "Excluded records",
            InfoType::CachePruned => "Cache entries pruned",
        }
    }
}
