//! Fail-open translation between the user's language and English.
//!
//! Translation is an enhancement, never the primary value: every internal
//! failure (network, timeout, malformed output) is logged and the original
//! text is returned unchanged, so a translation-path failure can never lose
//! the answer. Callers observe failure only through the `translated` flag
//! and the logs.

pub mod client;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::TranslateConfig;
use crate::error::Result;
use crate::{detect, sanitize, terms};

pub use client::OllamaClient;

/// Outcome of a translation call. Never an error: on failure `text` equals
/// the input and `translated` is false. Lengths are carried for lightweight
/// telemetry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationResult {
    pub text: String,
    pub source_chars: usize,
    pub translated_chars: usize,
    pub translated: bool,
}

impl TranslationResult {
    /// The input passed through unchanged (detector short-circuit or failure).
    pub fn passthrough(source: &str) -> Self {
        let chars = source.chars().count();
        Self {
            text: source.to_string(),
            source_chars: chars,
            translated_chars: chars,
            translated: false,
        }
    }

    pub fn translated(source: &str, text: String) -> Self {
        Self {
            source_chars: source.chars().count(),
            translated_chars: text.chars().count(),
            text,
            translated: true,
        }
    }
}

/// Seam the pipeline talks to; mocked in pipeline tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Normalize arbitrary input to English. Identity when the text already
    /// looks English or on any internal failure.
    async fn to_english(&self, text: &str) -> TranslationResult;

    /// Render an English reply in Vietnamese, keeping medical terminology
    /// bilingual. Identity on any internal failure.
    async fn to_vietnamese(&self, text: &str) -> TranslationResult;
}

/// LLM-backed translator with term preservation and output sanitizing.
pub struct Translator {
    client: OllamaClient,
    config: TranslateConfig,
}

impl Translator {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(config.clone())?,
            config,
        })
    }

    fn build_english_prompt(text: &str) -> String {
        format!(
            "Translate the following text to English. If it's already in English, \
             return it unchanged. Only return the translation without any explanation:\n\n{}",
            text
        )
    }

    fn build_vietnamese_prompt(placeholdered: &str) -> String {
        format!(
            "Translate the following English text to Vietnamese. Keep any placeholder \
             text (like __TERM_0__) unchanged. Provide a natural, fluent Vietnamese \
             translation. Only return the translation without any explanation:\n\n{}",
            placeholdered
        )
    }
}

#[async_trait]
impl TranslationService for Translator {
    async fn to_english(&self, text: &str) -> TranslationResult {
        // Cost optimization, not a correctness requirement: skip the model
        // call entirely when the text already looks English.
        if detect::looks_like_english(text) {
            debug!("Input already looks English, skipping normalization");
            return TranslationResult::passthrough(text);
        }

        let prompt = Self::build_english_prompt(text);
        match self
            .client
            .generate(&prompt, self.config.max_tokens_to_english)
            .await
        {
            Ok(raw) => {
                let cleaned = sanitize::clean(&raw);
                if cleaned.is_empty() {
                    warn!("English normalization produced empty output, keeping original");
                    return TranslationResult::passthrough(text);
                }
                TranslationResult::translated(text, cleaned)
            }
            Err(e) => {
                warn!("English normalization failed, keeping original: {}", e);
                TranslationResult::passthrough(text)
            }
        }
    }

    async fn to_vietnamese(&self, text: &str) -> TranslationResult {
        let (placeholdered, term_map) = terms::extract(text);
        let prompt = Self::build_vietnamese_prompt(&placeholdered);

        match self
            .client
            .generate(&prompt, self.config.max_tokens_to_vietnamese)
            .await
        {
            Ok(raw) => {
                let cleaned = sanitize::clean(&raw);
                if cleaned.is_empty() {
                    warn!("Vietnamese translation produced empty output, keeping original");
                    return TranslationResult::passthrough(text);
                }
                let restored = terms::restore(&cleaned, &term_map);
                TranslationResult::translated(text, restored)
            }
            Err(e) => {
                warn!("Vietnamese translation failed, keeping original: {}", e);
                TranslationResult::passthrough(text)
            }
        }
    }
}
