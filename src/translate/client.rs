//! Chunk translation with structural validation and a shared retry budget.

use crate::config::{Config, Tone};
use crate::subtitle::is_valid;
use crate::translate::{Completion, RetryReason, TranslationOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum attempts per chunk.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Fixed wait after a failed request.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Translates chunks through a [`Completion`] backend.
///
/// Invalid responses and failed requests draw from the same retry budget;
/// only failed requests wait before the next attempt. When the budget runs
/// out the original chunk is returned as a fallback.
pub struct TranslationClient {
    completion: Arc<dyn Completion>,
    target_language: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl TranslationClient {
    pub fn new(completion: Box<dyn Completion>, target_language: impl Into<String>) -> Self {
        Self {
            completion: Arc::from(completion),
            target_language: target_language.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Build a client using the language and retry settings from `config`.
    pub fn from_config(completion: Box<dyn Completion>, config: &Config) -> Self {
        Self::new(completion, config.target_language.clone())
            .with_max_retries(config.max_retries)
            .with_retry_delay(Duration::from_secs(config.retry_delay_secs))
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }

    /// Build the translation instruction for one chunk.
    pub fn build_prompt(&self, text: &str, tone: Tone) -> String {
        let directive = tone.instruction();
        let language = if directive.is_empty() {
            self.target_language.clone()
        } else {
            format!("{} {}", self.target_language, directive)
        };

        format!(
            "Translate the following subtitle text into {language}, but keep the subtitle number and timeline unchanged: \n{text}"
        )
    }

    /// Translate one chunk. Never fails; see [`TranslationOutcome`].
    pub async fn translate(&self, text: &str, tone: Tone) -> TranslationOutcome {
        if text.trim().is_empty() {
            return TranslationOutcome::Translated(text.to_string());
        }

        let prompt = self.build_prompt(text, tone);
        let mut retries = 0;
        let mut last_reason = RetryReason::InvalidStructure;

        while retries < self.max_retries {
            let reason = match self.completion.complete(&prompt).await {
                Ok(translated) if is_valid(text, &translated) => {
                    debug!("Chunk translated after {} retries", retries);
                    return TranslationOutcome::Translated(translated);
                }
                Ok(_) => RetryReason::InvalidStructure,
                Err(e) => {
                    if !self.retry_delay.is_zero() {
                        warn!(
                            "{} request failed, sleeping {}s",
                            self.completion.name(),
                            self.retry_delay.as_secs()
                        );
                        tokio::time::sleep(self.retry_delay).await;
                    }
                    RetryReason::RequestFailed(e.to_string())
                }
            };

            retries += 1;
            warn!("{}. Retrying ({}/{})", reason, retries, self.max_retries);
            last_reason = reason;
        }

        warn!(
            "Unable to get a valid translation after {} retries, keeping the original text",
            self.max_retries
        );
        TranslationOutcome::FallbackToOriginal {
            text: text.to_string(),
            reason: last_reason,
        }
    }
}
