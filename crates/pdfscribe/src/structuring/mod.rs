//! Optional LLM restructuring of extracted text.
//!
//! Without an API key the text is passed through untouched. With one, the
//! text is sent to an OpenRouter chat model that splits it into readable
//! blocks. A failed request never loses the document: callers go through
//! [`structure_with_fallback`], which returns the raw text instead.

pub mod chunking;
pub mod openrouter;
pub mod prompt;

pub use openrouter::OpenRouterStructurer;

use crate::Result;
use crate::core::config::StructuringConfig;
use async_trait::async_trait;
use std::sync::Arc;

/// Turns raw extracted text into structured text.
#[async_trait]
pub trait TextStructurer: Send + Sync {
    fn name(&self) -> &str;

    /// Whether this structurer changes text at all.
    fn is_enabled(&self) -> bool {
        true
    }

    async fn structure(&self, text: &str) -> Result<String>;
}

/// Returns text unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughStructurer;

#[async_trait]
impl TextStructurer for PassthroughStructurer {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn structure(&self, text: &str) -> Result<String> {
        Ok(text.to_string())
    }
}

/// Result of [`structure_with_fallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredText {
    pub text: String,
    /// False when the raw text was returned.
    pub structured: bool,
}

/// Structure `text`, returning it unchanged if structuring fails.
pub async fn structure_with_fallback(structurer: &dyn TextStructurer, text: &str) -> StructuredText {
    if text.trim().is_empty() || !structurer.is_enabled() {
        return StructuredText {
            text: text.to_string(),
            structured: false,
        };
    }

    match structurer.structure(text).await {
        Ok(structured) => StructuredText {
            text: structured,
            structured: true,
        },
        Err(e) => {
            tracing::warn!(structurer = structurer.name(), "Structuring failed, using raw text: {}", e);
            StructuredText {
                text: text.to_string(),
                structured: false,
            }
        }
    }
}

/// OpenRouter when an API key is configured, passthrough otherwise.
pub fn from_config(config: &StructuringConfig) -> Result<Arc<dyn TextStructurer>> {
    if config.is_enabled() {
        let structurer = OpenRouterStructurer::new(config)?;
        tracing::info!(model = structurer.model(), "LLM structuring enabled");
        Ok(Arc::new(structurer))
    } else {
        tracing::info!("OPENROUTER_API_KEY not set, text is sent without structuring");
        Ok(Arc::new(PassthroughStructurer))
    }
}
