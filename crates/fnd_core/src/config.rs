//! Fixed limits shared by the inference pipeline and the HTTP layer.

/// Image extensions accepted by the upload path, compared case-insensitively.
pub const ALLOWED_IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "webp"];

/// 10 MiB ceiling on uploaded images.
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// 16 MiB ceiling on any request body.
pub const MAX_REQUEST_SIZE: usize = 16 * 1024 * 1024;

/// OCR output shorter than this (after trimming) is treated as noise.
pub const MIN_OCR_TEXT_CHARS: usize = 10;

/// Extracted text echoed back to the caller is capped at this many characters.
pub const EXTRACTED_TEXT_ECHO_LIMIT: usize = 500;

pub const TRUNCATION_MARKER: &str = "...";

pub const DEFAULT_MODEL_PATH: &str = "finalized_model.json";
pub const DEFAULT_VECTORIZER_PATH: &str = "tfidf_vectorizer.json";
pub const DEFAULT_TRAINING_DATA_PATH: &str = "news.csv";

pub fn max_image_size_mb() -> f64 {
    MAX_IMAGE_SIZE as f64 / (1024.0 * 1024.0)
}
