//! Shared helpers.
//!
//! This module provides:
//! - Text normalization and truncation for excerpts and prompts
//! - Date argument parsing and formatting
//! - Atomic file writes for the cache and report artifacts

pub mod date;
pub mod fs;
pub mod sanitize;

pub use date::{compact, parse_date, parse_date_or_today, today};
pub use fs::write_atomic;
pub use sanitize::{excerpt, normalize_whitespace, strip_control_chars, truncate_chars};
