//! Configuration loading and management.
//!
//! Configuration is layered: built-in defaults, then a TOML file (explicit
//! path or a discovered `pdfscribe.toml`), then environment variables. The
//! CLI applies its flags last.

use crate::{Result, ScribeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Name of the configuration file searched for by [`ScribeConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "pdfscribe.toml";

/// Largest file the Bot API lets bots download with `getFile`.
pub const TELEGRAM_MAX_DOWNLOAD_BYTES: u64 = 20 * 1024 * 1024;

/// Top-level service configuration.
///
/// # Example
///
/// ```rust
/// use pdfscribe::core::config::ScribeConfig;
///
/// let config: ScribeConfig = toml::from_str(r#"
/// [server]
/// port = 8080
///
/// [extraction.ocr]
/// language = "eng"
/// "#).unwrap();
///
/// assert_eq!(config.server.port, 8080);
/// assert_eq!(config.extraction.ocr.language, "eng");
/// assert_eq!(config.server.webhook_path, "/webhook");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScribeConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub structuring: StructuringConfig,
}

/// Telegram Bot API settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Never serialized.
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,

    /// Bot API root, without the `/bot<token>` suffix.
    pub api_base_url: String,

    /// Public HTTPS URL registered with `setWebhook` at startup.
    pub webhook_url: Option<String>,

    /// Value Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`.
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,

    pub request_timeout_secs: u64,

    /// Documents larger than this are refused before download.
    pub max_download_bytes: u64,

    /// Ask Telegram to discard updates queued while the bot was down.
    pub drop_pending_updates: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base_url: "https://api.telegram.org".to_string(),
            webhook_url: None,
            webhook_secret: None,
            request_timeout_secs: 60,
            max_download_bytes: TELEGRAM_MAX_DOWNLOAD_BYTES,
            drop_pending_updates: false,
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &redact(&self.bot_token))
            .field("api_base_url", &self.api_base_url)
            .field("webhook_url", &self.webhook_url)
            .field("webhook_secret", &redact(&self.webhook_secret))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_download_bytes", &self.max_download_bytes)
            .field("drop_pending_updates", &self.drop_pending_updates)
            .finish()
    }
}

/// HTTP listener and update queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub webhook_path: String,
    pub max_request_body_bytes: usize,
    /// Updates buffered between the webhook and the workers.
    pub queue_capacity: usize,
    /// Updates processed at the same time.
    pub max_concurrent_updates: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            webhook_path: "/webhook".to_string(),
            max_request_body_bytes: 1024 * 1024,
            queue_capacity: 256,
            max_concurrent_updates: 4,
        }
    }
}

impl ServerConfig {
    /// Parse `host:port` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|e| ScribeError::validation(format!("Invalid host address '{}': {}", self.host, e)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// PDF text extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// OCR every page even when the PDF has a usable text layer.
    pub force_ocr: bool,

    /// Documents with more pages are rejected.
    pub max_pages: usize,

    pub ocr: OcrConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            force_ocr: false,
            max_pages: 200,
            ocr: OcrConfig::default(),
        }
    }
}

/// OCR configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Fall back to OCR for pages without a usable text layer.
    pub enabled: bool,

    /// Tesseract language codes joined with `+`.
    pub language: String,

    /// Tesseract page segmentation mode.
    pub psm: u8,

    /// Render resolution for scanned pages.
    pub dpi: u32,

    /// Timeout for a single tesseract or pdftoppm run.
    pub timeout_secs: u64,

    /// Explicit `OMP_THREAD_LIMIT` for tesseract (None = inherit).
    pub thread_limit: Option<u32>,

    /// Pages rendered and OCR'd at the same time within one document.
    pub max_concurrent_pages: usize,

    pub tesseract_path: String,
    pub pdftoppm_path: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "rus+eng".to_string(),
            psm: 3,
            dpi: 300,
            timeout_secs: 120,
            thread_limit: None,
            max_concurrent_pages: 2,
            tesseract_path: "tesseract".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
        }
    }
}

/// LLM restructuring settings (OpenRouter chat completions).
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuringConfig {
    /// OpenRouter key. Without it text is returned as extracted.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,

    /// Longer inputs are split and structured chunk by chunk.
    pub max_chunk_chars: usize,

    /// Custom prompt; `{text}` is replaced with the document text.
    pub prompt_template: Option<String>,

    /// Sent as `HTTP-Referer` for OpenRouter app attribution.
    pub referer: Option<String>,

    /// Sent as `X-Title` for OpenRouter app attribution.
    pub app_title: Option<String>,
}

impl Default for StructuringConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "meta-llama/llama-3-8b-instruct:free".to_string(),
            timeout_secs: 120,
            max_chunk_chars: 12_000,
            prompt_template: None,
            referer: None,
            app_title: None,
        }
    }
}

impl fmt::Debug for StructuringConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuringConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_chunk_chars", &self.max_chunk_chars)
            .field("prompt_template", &self.prompt_template.as_ref().map(|_| "<custom>"))
            .field("referer", &self.referer)
            .field("app_title", &self.app_title)
            .finish()
    }
}

impl StructuringConfig {
    /// Structuring only runs with a non-empty API key.
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ScribeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ScribeError::Validation` if the file cannot be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ScribeError::validation(format!("Failed to read config file {}: {}", path.as_ref().display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| ScribeError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))
    }

    /// Discover `pdfscribe.toml` in the current directory or its parents.
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(ScribeError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }

    /// Load from `path` (or discovery when `None`) and apply the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration file");
                Self::from_toml_file(path)?
            }
            None => match Self::discover()? {
                Some(config) => {
                    tracing::info!("Loaded configuration from discovered {}", CONFIG_FILE_NAME);
                    config
                }
                None => {
                    tracing::info!("No {} found, using default configuration", CONFIG_FILE_NAME);
                    Self::default()
                }
            },
        };

        config.apply_env();
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlay values from an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset. Numbers that fail to parse are
    /// ignored with a warning.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_empty(lookup(key));

        if let Some(token) = get("BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(url) = get("WEBHOOK_URL") {
            self.telegram.webhook_url = Some(url);
        }
        if let Some(secret) = get("WEBHOOK_SECRET") {
            self.telegram.webhook_secret = Some(secret);
        }
        if let Some(api) = get("TELEGRAM_API_URL") {
            self.telegram.api_base_url = api;
        }
        if let Some(key) = get("OPENROUTER_API_KEY") {
            self.structuring.api_key = Some(key);
        }
        if let Some(model) = get("OPENROUTER_MODEL") {
            self.structuring.model = model;
        }
        if let Some(base) = get("OPENROUTER_BASE_URL") {
            self.structuring.base_url = base;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(value) = get("PORT") {
            match value.parse::<u16>() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Failed to parse PORT='{}', must be a valid port number", value),
            }
        }
        if let Some(language) = get("OCR_LANGUAGE") {
            self.extraction.ocr.language = language;
        }
        if let Some(value) = get("OMP_THREAD_LIMIT") {
            match value.parse::<u32>() {
                Ok(limit) if limit > 0 => self.extraction.ocr.thread_limit = Some(limit),
                _ => tracing::warn!(
                    "Failed to parse OMP_THREAD_LIMIT='{}', must be a positive integer",
                    value
                ),
            }
        }
    }

    /// Check settings shared by every command.
    pub fn validate(&self) -> Result<()> {
        let ocr = &self.extraction.ocr;
        if ocr.enabled || self.extraction.force_ocr {
            crate::ocr::validate_language_code(&ocr.language)?;
            crate::ocr::PSMMode::from_u8(ocr.psm)?;
        }
        if ocr.dpi == 0 {
            return Err(ScribeError::validation("extraction.ocr.dpi must be greater than zero"));
        }
        if ocr.max_concurrent_pages == 0 {
            return Err(ScribeError::validation(
                "extraction.ocr.max_concurrent_pages must be greater than zero",
            ));
        }
        if self.extraction.max_pages == 0 {
            return Err(ScribeError::validation("extraction.max_pages must be greater than zero"));
        }
        for (name, value) in [
            ("extraction.ocr.timeout_secs", ocr.timeout_secs),
            ("telegram.request_timeout_secs", self.telegram.request_timeout_secs),
            ("structuring.timeout_secs", self.structuring.timeout_secs),
        ] {
            if value == 0 {
                return Err(ScribeError::validation(format!("{} must be greater than zero", name)));
            }
        }
        if self.structuring.max_chunk_chars == 0 {
            return Err(ScribeError::validation(
                "structuring.max_chunk_chars must be greater than zero",
            ));
        }
        if let Some(template) = &self.structuring.prompt_template
            && !template.contains(crate::structuring::prompt::TEXT_PLACEHOLDER)
        {
            return Err(ScribeError::validation(format!(
                "structuring.prompt_template must contain the {} placeholder",
                crate::structuring::prompt::TEXT_PLACEHOLDER
            )));
        }
        Ok(())
    }

    /// Check everything the webhook server needs to start.
    pub fn validate_for_serve(&self) -> Result<()> {
        self.validate()?;

        if self.telegram.bot_token.as_deref().is_none_or(|t| t.trim().is_empty()) {
            return Err(ScribeError::validation("BOT_TOKEN is not set"));
        }
        if let Some(url) = &self.telegram.webhook_url
            && !url.starts_with("https://")
        {
            return Err(ScribeError::validation(format!(
                "Webhook URL must use https:// (Telegram refuses plain HTTP): {}",
                url
            )));
        }
        if let Some(secret) = &self.telegram.webhook_secret {
            let valid_chars = secret.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if secret.is_empty() || secret.len() > 256 || !valid_chars {
                return Err(ScribeError::validation(
                    "WEBHOOK_SECRET must be 1-256 characters of A-Z, a-z, 0-9, _ and -",
                ));
            }
        }
        if !self.server.webhook_path.starts_with('/') {
            return Err(ScribeError::validation(format!(
                "server.webhook_path must start with '/': {}",
                self.server.webhook_path
            )));
        }
        if self.server.queue_capacity == 0 || self.server.max_concurrent_updates == 0 {
            return Err(ScribeError::validation(
                "server.queue_capacity and server.max_concurrent_updates must be greater than zero",
            ));
        }
        self.server.socket_addr()?;
        Ok(())
    }
}
