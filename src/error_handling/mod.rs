//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions, one enum per failure domain
//! - Processing statistics tracking (errors and info metrics)
//! - Retry strategy configuration and retriability rules
//!
//! Per-message failures (parse, fetch, classification) are counted and
//! skipped; per-account failures are collected by the run and reported.

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{
    get_retry_strategy, is_retriable_classification_error, is_retriable_inference_error,
};
pub use stats::ProcessingStats;
pub use types::{
    AccountError, CacheIoError, ClassificationError, ConfigError, ErrorType, InferenceError,
    InfoType, InitializationError, MailboxError, ParseError, ReportIoError, UnknownCategoryError,
};
