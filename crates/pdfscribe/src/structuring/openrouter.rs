use super::TextStructurer;
use super::chunking::{CHUNK_SEPARATOR, split_into_chunks};
use super::prompt::build_prompt;
use crate::core::config::StructuringConfig;
use crate::{Result, ScribeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 500;

/// Chat-completions client for OpenRouter (or any OpenAI-compatible API).
pub struct OpenRouterStructurer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    prompt_template: Option<String>,
    max_chunk_chars: usize,
    referer: Option<String>,
    app_title: Option<String>,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpenRouterStructurer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterStructurer")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl OpenRouterStructurer {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// `ScribeError::Validation` when no API key is configured.
    pub fn new(config: &StructuringConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ScribeError::validation("OPENROUTER_API_KEY is not set"))?
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScribeError::structuring_with_source("Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            prompt_template: config.prompt_template.clone(),
            max_chunk_chars: config.max_chunk_chars.max(1),
            referer: config.referer.clone(),
            app_title: config.app_title.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut request = self.client.post(&self.endpoint).bearer_auth(&self.api_key).json(&body);
        if let Some(referer) = &self.referer {
            request = request.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.app_title {
            request = request.header("X-Title", title);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScribeError::structuring_with_source(
                    format!("OpenRouter request timed out after {}s", self.timeout_secs),
                    e,
                )
            } else {
                ScribeError::structuring_with_source("OpenRouter request failed", e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(ScribeError::structuring(format!(
                "OpenRouter returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ScribeError::structuring_with_source("Invalid OpenRouter response", e))?;

        if let Some(error) = parsed.error {
            let code = error.code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string());
            return Err(ScribeError::structuring(format!(
                "OpenRouter provider error ({}): {}",
                code, error.message
            )));
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ScribeError::structuring("OpenRouter response contained no choices"))?;

        let content = content.trim();
        if content.is_empty() {
            return Err(ScribeError::structuring("OpenRouter returned an empty completion"));
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl TextStructurer for OpenRouterStructurer {
    fn name(&self) -> &str {
        "openrouter"
    }

    #[tracing::instrument(level = "debug", skip_all, fields(model = %self.model, chars = text.chars().count()))]
    async fn structure(&self, text: &str) -> Result<String> {
        let chunks = split_into_chunks(text, self.max_chunk_chars);
        if chunks.len() > 1 {
            tracing::debug!(chunks = chunks.len(), "Structuring document in chunks");
        }

        let mut structured = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let prompt = build_prompt(self.prompt_template.as_deref(), chunk);
            structured.push(self.complete(&prompt).await?);
        }
        Ok(structured.join(CHUNK_SEPARATOR))
    }
}
