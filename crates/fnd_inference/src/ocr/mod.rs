//! Text extraction from images.
//!
//! OCR support is optional. Whether a usable engine exists is decided once at
//! startup by [`TesseractLocator`] and carried around as an [`OcrCapability`],
//! so callers check a flag instead of matching on error text.

use async_trait::async_trait;
use image::RgbImage;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use fnd_core::Result;

pub mod locator;
pub mod tesseract;

pub use locator::{Candidate, ProbeAttempt, Resolution, TesseractLocator};
pub use tesseract::TesseractEngine;

#[async_trait]
pub trait OcrEngine: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Runs OCR over an RGB image and returns the raw text, untrimmed.
    async fn extract_text(&self, image: &RgbImage) -> Result<String>;
}

#[derive(Debug, Clone)]
pub enum OcrCapability {
    Available {
        binary: PathBuf,
        version: String,
        strategy: &'static str,
    },
    Unavailable {
        reason: String,
    },
}

impl OcrCapability {
    pub fn is_available(&self) -> bool {
        matches!(self, OcrCapability::Available { .. })
    }

    /// Builds the engine for an available capability.
    pub fn engine(&self, language: &str) -> Option<Arc<dyn OcrEngine>> {
        match self {
            OcrCapability::Available { binary, .. } => {
                Some(Arc::new(TesseractEngine::new(binary.clone(), language)))
            }
            OcrCapability::Unavailable { .. } => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&str> {
        match self {
            OcrCapability::Available { .. } => None,
            OcrCapability::Unavailable { reason } => Some(reason),
        }
    }
}

/// Diagnostic view of OCR configuration, as reported by `check-ocr`.
#[derive(Debug, Clone, Serialize)]
pub struct OcrStatus {
    pub tesseract_configured: bool,
    pub tesseract_path: Option<String>,
    pub tesseract_version: Option<String>,
    pub resolved_by: Option<String>,
    pub attempts: Vec<ProbeAttempt>,
    pub message: String,
    pub error: Option<String>,
}

impl From<&Resolution> for OcrStatus {
    fn from(resolution: &Resolution) -> Self {
        match &resolution.capability {
            OcrCapability::Available {
                binary,
                version,
                strategy,
            } => Self {
                tesseract_configured: true,
                tesseract_path: Some(binary.display().to_string()),
                tesseract_version: Some(version.clone()),
                resolved_by: Some(strategy.to_string()),
                attempts: resolution.attempts.clone(),
                message: "Tesseract OCR is properly configured!".to_string(),
                error: None,
            },
            OcrCapability::Unavailable { reason } => Self {
                tesseract_configured: false,
                tesseract_path: None,
                tesseract_version: None,
                resolved_by: None,
                attempts: resolution.attempts.clone(),
                message: "Tesseract executable not found. Install Tesseract OCR, add it to PATH, or set TESSERACT_CMD.".to_string(),
                error: Some(reason.clone()),
            },
        }
    }
}
