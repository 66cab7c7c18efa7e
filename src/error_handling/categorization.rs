//! Retry strategy and error retriability.
//!
//! This module decides which classification failures are worth another attempt
//! and configures the backoff between attempts.

use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;

use super::types::{ClassificationError, InferenceError};
use crate::config::{HTTP_STATUS_TOO_MANY_REQUESTS, RETRY_MAX_DELAY_SECS};

/// Creates an exponential backoff retry strategy.
///
/// The strategy yields `max_attempts - 1` delays (the first attempt is not
/// delayed), starting at `initial_delay` and doubling each time, capped at
/// `RETRY_MAX_DELAY_SECS`. With the defaults the delays are 1s and 2s.
///
/// `ExponentialBackoff` raises its base to the attempt number and multiplies
/// by the factor, so a base of 2 with a factor of `initial / 2` yields
/// `initial, 2 * initial, 4 * initial, ...`.
pub fn get_retry_strategy(
    initial_delay: Duration,
    max_attempts: usize,
) -> impl Iterator<Item = Duration> {
    let half_initial_ms = (initial_delay.as_millis() / 2).max(1);
    let factor = u64::try_from(half_initial_ms).unwrap_or(u64::MAX);
    ExponentialBackoff::from_millis(2)
        .factor(factor)
        .max_delay(Duration::from_secs(RETRY_MAX_DELAY_SECS))
        .take(max_attempts.saturating_sub(1))
}

/// Determines if an inference failure is transient.
///
/// # Retriable
///
/// - Timeouts and connection failures
/// - Server errors (5xx) and rate limiting (429)
/// - Responses whose envelope could not be decoded (truncated answers)
///
/// # Non-Retriable
///
/// - Client errors (4xx except 429), e.g. an unknown model
pub fn is_retriable_inference_error(error: &InferenceError) -> bool {
    match error {
        InferenceError::Timeout
        | InferenceError::ServiceUnavailable(_)
        | InferenceError::InvalidResponse(_) => true,
        InferenceError::Status { status, .. } => {
            *status == HTTP_STATUS_TOO_MANY_REQUESTS || !(400..500).contains(status)
        }
    }
}

/// Determines if a classification attempt should be repeated.
///
/// Unparseable answers are retried since sampling may produce a valid answer
/// on the next attempt.
pub fn is_retriable_classification_error(error: &ClassificationError) -> bool {
    match error {
        ClassificationError::Unavailable(inner) => is_retriable_inference_error(inner),
        ClassificationError::Unparseable(_) => true,
    }
}
