//! Configuration constants.
//!
//! This module defines the defaults and limits used throughout the application,
//! including timeouts, excerpt sizes and retry parameters.

use std::time::Duration;

/// Default path of the JSON configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config.json";
/// Lookback window in days when neither `--days` nor `default_days` is set
pub const DEFAULT_DAYS: u32 = 30;
/// Directory (relative to the config file) holding JSON artifacts and the cache
pub const DEFAULT_LOG_DIR: &str = "logs";
/// Directory (relative to the config file) holding rendered HTML reports
pub const DEFAULT_REPORT_DIR: &str = "reports";
/// Subdirectory of the log directory holding per-account fingerprint caches
pub const CACHE_SUBDIR: &str = "cache";
/// Folder scanned when an account does not list any
pub const DEFAULT_FOLDER: &str = "INBOX";

// Concurrency
/// Maximum concurrent inference calls (shared by all accounts)
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
/// Maximum accounts processed at the same time
pub const DEFAULT_MAX_ACCOUNTS_IN_PARALLEL: usize = 4;

// Network operation timeouts
/// Timeout for a single mailbox operation (connect, login, search, fetch)
pub const DEFAULT_MAILBOX_TIMEOUT_SECS: u64 = 60;
/// Timeout for a single inference call
/// Small local models can take well over a minute on a cold start.
pub const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 120;
/// Timeout for the inference reachability probe
pub const INFERENCE_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

// Inference service
/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
/// Default model used for classification
pub const DEFAULT_OLLAMA_MODEL: &str = "gemma3:4b";

// Retry strategy
/// Maximum number of classification attempts (initial attempt + retries)
pub const RETRY_MAX_ATTEMPTS: usize = 3;
/// Delay before the first retry in milliseconds; doubles on every retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 1000;
/// Upper bound for a single retry delay in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 30;

// Excerpt limits
/// Maximum characters kept per body excerpt of a bounce record
pub const MAX_BODY_EXCERPT_CHARS: usize = 1000;
/// Maximum characters of the notice body embedded in the classification prompt
pub const MAX_PROMPT_BODY_CHARS: usize = 500;
/// Maximum characters of an inference answer echoed into logs
pub const MAX_ANSWER_PREVIEW_CHARS: usize = 200;

// HTTP status codes (for clarity and consistency)
/// HTTP 429 Too Many Requests status code
pub const HTTP_STATUS_TOO_MANY_REQUESTS: u16 = 429;

// IMAP
/// Largest fetched message passed on for parsing
pub const MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;
