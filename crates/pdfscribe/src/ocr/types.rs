use serde::{Deserialize, Serialize};

use super::error::OcrError;

/// Page Segmentation Mode for Tesseract OCR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PSMMode {
    OsdOnly = 0,
    AutoOsd = 1,
    AutoOnly = 2,
    Auto = 3,
    SingleColumn = 4,
    SingleBlockVertical = 5,
    SingleBlock = 6,
    SingleLine = 7,
    SingleWord = 8,
    CircleWord = 9,
    SingleChar = 10,
    SparseText = 11,
    SparseTextOsd = 12,
    RawLine = 13,
}

impl PSMMode {
    pub fn from_u8(value: u8) -> Result<Self, OcrError> {
        match value {
            0 => Ok(PSMMode::OsdOnly),
            1 => Ok(PSMMode::AutoOsd),
            2 => Ok(PSMMode::AutoOnly),
            3 => Ok(PSMMode::Auto),
            4 => Ok(PSMMode::SingleColumn),
            5 => Ok(PSMMode::SingleBlockVertical),
            6 => Ok(PSMMode::SingleBlock),
            7 => Ok(PSMMode::SingleLine),
            8 => Ok(PSMMode::SingleWord),
            9 => Ok(PSMMode::CircleWord),
            10 => Ok(PSMMode::SingleChar),
            11 => Ok(PSMMode::SparseText),
            12 => Ok(PSMMode::SparseTextOsd),
            13 => Ok(PSMMode::RawLine),
            _ => Err(OcrError::InvalidConfiguration(format!("Invalid PSM mode value: {}", value))),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Per-invocation settings for the tesseract CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Language codes joined with `+`, e.g. `rus+eng`.
    pub language: String,
    pub psm: PSMMode,
    /// Resolution hint passed with `--dpi`; matches the render resolution.
    pub dpi: u32,
    /// Value for `OMP_THREAD_LIMIT` in the child environment.
    pub thread_limit: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            language: "rus+eng".to_string(),
            psm: PSMMode::Auto,
            dpi: 300,
            thread_limit: None,
            timeout_secs: 120,
        }
    }
}

impl TesseractConfig {
    pub fn validate(&self) -> Result<(), OcrError> {
        super::validation::validate_language_code(&self.language)?;
        if matches!(self.psm, PSMMode::OsdOnly) {
            return Err(OcrError::InvalidConfiguration(
                "PSM 0 only detects orientation and produces no text".to_string(),
            ));
        }
        if self.dpi == 0 {
            return Err(OcrError::InvalidConfiguration("dpi must be greater than zero".to_string()));
        }
        if self.thread_limit == Some(0) {
            return Err(OcrError::InvalidConfiguration(
                "thread_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<&crate::core::config::OcrConfig> for TesseractConfig {
    fn from(config: &crate::core::config::OcrConfig) -> Self {
        Self {
            language: config.language.clone(),
            psm: PSMMode::from_u8(config.psm).unwrap_or(PSMMode::Auto),
            dpi: config.dpi,
            thread_limit: config.thread_limit,
            timeout_secs: config.timeout_secs,
        }
    }
}
