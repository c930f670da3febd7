// Translation of individual subtitle entries
//
// - prompt: prompt construction and per-language style guides
// - sanitize: cleanup of raw model output
// - ollama: HTTP client for the inference endpoint

pub mod prompt;
pub mod sanitize;
pub mod ollama;

use async_trait::async_trait;

pub use ollama::OllamaClient;
pub use prompt::{PromptBuilder, StyleGuides};
pub use sanitize::Sanitizer;

/// Per-job translation parameters shared by every entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    pub target_language: String,
    pub model: String,
    pub context: Option<String>,
}

/// Backend used by the workflow to translate entries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Translator: Send + Sync {
    /// Whether the model can be used. Never fails; unreachable means unavailable.
    async fn check_availability(&self, model: &str) -> bool;

    /// Translate one entry's text, falling back to `text` itself on failure
    async fn translate_one(&self, text: &str, request: &TranslationRequest) -> String;
}
