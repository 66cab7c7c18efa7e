//! Bounce classification.
//!
//! This module provides:
//! - The closed failure taxonomy and its target/excluded disposition
//! - Prompt construction and tolerant answer parsing
//! - The inference seam ([`Inference`]) and its Ollama implementation
//! - [`Classifier`], which adds retries, timeouts and the shared concurrency limit

mod category;
mod ollama;
mod prompt;
mod response;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_retry::RetryIf;

use crate::config::OllamaConfig;
use crate::error_handling::{
    get_retry_strategy, is_retriable_classification_error, ClassificationError, ErrorType,
    InferenceError, ProcessingStats,
};
use crate::parse::BounceRecord;

pub use category::{Category, Disposition};
pub use ollama::{Inference, OllamaClient};
pub use prompt::build_prompt;
pub use response::{parse_answer, ParsedAnswer};

/// Outcome of classifying one bounce record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    /// Who has to act, as named by the model
    pub responsible_party: String,
    /// One sentence explanation
    pub reason: String,
}

impl Classification {
    pub fn disposition(&self) -> Disposition {
        self.category.disposition()
    }

    /// Classification used when the service could not classify a record.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self {
            category: Category::DEFAULT,
            responsible_party: String::new(),
            reason: reason.into(),
        }
    }
}

impl From<ParsedAnswer> for Classification {
    fn from(answer: ParsedAnswer) -> Self {
        Self {
            category: answer.category,
            responsible_party: answer.responsible_party,
            reason: answer.reason,
        }
    }
}

/// Classifies bounce records through an [`Inference`] service.
///
/// Cloning is cheap; clones share the service and the concurrency limit.
#[derive(Clone)]
pub struct Classifier {
    inference: Arc<dyn Inference>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
    max_attempts: usize,
    retry_initial_delay: Duration,
    stats: Option<Arc<ProcessingStats>>,
}

impl Classifier {
    pub fn new(
        inference: Arc<dyn Inference>,
        semaphore: Arc<Semaphore>,
        config: &OllamaConfig,
    ) -> Self {
        Self {
            inference,
            semaphore,
            timeout: config.timeout,
            max_attempts: config.max_attempts.max(1),
            retry_initial_delay: config.retry_initial_delay,
            stats: None,
        }
    }

    /// Counts degraded classifications in `stats`.
    pub fn with_stats(mut self, stats: Arc<ProcessingStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Classifies `record`, retrying transient failures with backoff.
    ///
    /// # Errors
    ///
    /// Returns the last `ClassificationError` once all attempts are used or a
    /// non-retriable error occurs.
    pub async fn classify(
        &self,
        record: &BounceRecord,
    ) -> Result<Classification, ClassificationError> {
        let prompt: Arc<str> = Arc::from(build_prompt(record));
        let attempt_count = Arc::new(AtomicU32::new(0));

        let result = RetryIf::start(
            get_retry_strategy(self.retry_initial_delay, self.max_attempts),
            {
                let prompt = Arc::clone(&prompt);
                let attempt_count = Arc::clone(&attempt_count);
                move || {
                    let attempt = attempt_count.fetch_add(1, Ordering::SeqCst) + 1;
                    let prompt = Arc::clone(&prompt);
                    async move {
                        let result = self.attempt(&prompt).await;
                        if let Err(e) = &result {
                            log::debug!("Classification attempt {attempt} failed: {e}");
                        }
                        result
                    }
                }
            },
            is_retriable_classification_error,
        )
        .await;

        let attempts = attempt_count.load(Ordering::SeqCst);
        if attempts > 1 {
            log::debug!("Classification took {attempts} attempts");
        }
        result
    }

    /// Classifies `record`, degrading to [`Category::DEFAULT`] on failure.
    pub async fn classify_or_default(&self, record: &BounceRecord) -> Classification {
        match self.classify(record).await {
            Ok(classification) => classification,
            Err(e) => {
                if let Some(stats) = &self.stats {
                    stats.increment_error(ErrorType::ClassificationError);
                }
                log::warn!(
                    "Could not classify bounce to {} ({}): {e}",
                    record.to_addr,
                    record.error_code.as_deref().unwrap_or("no code")
                );
                Classification::fallback(format!("Classification failed: {e}"))
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Result<Classification, ClassificationError> {
        let _permit = self.semaphore.acquire().await.map_err(|_| {
            ClassificationError::Unavailable(InferenceError::ServiceUnavailable(
                "concurrency limiter closed".to_string(),
            ))
        })?;
        let answer = tokio::time::timeout(self.timeout, self.inference.infer(prompt))
            .await
            .map_err(|_| InferenceError::Timeout)??;
        parse_answer(&answer).map(Classification::from)
    }
}
