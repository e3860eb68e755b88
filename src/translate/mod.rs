pub mod cache;
pub mod client;
pub mod openai;

pub use cache::TranslationCache;
pub use client::TranslationClient;
pub use openai::OpenAiClient;

use crate::error::Result;
use async_trait::async_trait;

/// A text completion capability: instruction in, response text out.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Why an attempt did not produce a usable translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// The response did not keep the chunk's caption indices.
    InvalidStructure,
    /// The completion request itself failed.
    RequestFailed(String),
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryReason::InvalidStructure => write!(f, "invalid structure"),
            RetryReason::RequestFailed(e) => write!(f, "request failed: {}", e),
        }
    }
}

/// Result of translating one chunk. Never an error: an exhausted retry
/// budget falls back to the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    FallbackToOriginal { text: String, reason: RetryReason },
}

impl TranslationOutcome {
    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::FallbackToOriginal { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            TranslationOutcome::Translated(text) => text,
            TranslationOutcome::FallbackToOriginal { text, .. } => text,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, TranslationOutcome::FallbackToOriginal { .. })
    }
}
