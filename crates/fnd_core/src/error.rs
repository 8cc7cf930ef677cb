use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model or vectorizer not loaded properly: {0}")]
    ModelUnavailable(String),

    #[error("{0}")]
    Input(String),

    #[error("Could not extract sufficient text from image ({length} characters). Please ensure the image contains readable text.")]
    InsufficientText { length: usize },

    #[error("OCR not available: {0}")]
    OcrUnavailable(String),

    #[error("Failed to extract text from image: {0}")]
    OcrExtraction(String),

    #[error("Article {index} failed: {message}")]
    BatchItem { index: usize, message: String },

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Inference error: {0}")]
    Inference(String),
}

impl Error {
    /// Stable identifier for the error class, used in response payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::ModelUnavailable(_) => "model_unavailable",
            Error::Input(_) => "input",
            Error::InsufficientText { .. } => "insufficient_text",
            Error::OcrUnavailable(_) => "ocr_unavailable",
            Error::OcrExtraction(_) => "ocr_extraction",
            Error::BatchItem { .. } => "batch_item",
            Error::Artifact(_) => "artifact",
            Error::Dataset(_) => "dataset",
            Error::Inference(_) => "inference",
        }
    }

    /// True when the request itself was at fault and resubmitting it unchanged cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Input(_) | Error::InsufficientText { .. } | Error::BatchItem { .. }
        )
    }

    pub fn input(message: impl Into<String>) -> Self {
        Error::Input(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_are_distinct_for_ocr_failures() {
        let unavailable = Error::OcrUnavailable("tesseract not found".to_string());
        let failed = Error::OcrExtraction("exit status 1".to_string());
        assert_ne!(unavailable.kind(), failed.kind());
        assert!(!unavailable.is_client_error());
        assert!(!failed.is_client_error());
    }

    #[test]
    fn test_insufficient_text_reports_length() {
        let err = Error::InsufficientText { length: 4 };
        assert!(err.to_string().contains("4 characters"));
        assert!(err.is_client_error());
    }
}
