use crate::config::{EXTRACTED_TEXT_ECHO_LIMIT, MIN_OCR_TEXT_CHARS, TRUNCATION_MARKER};
use crate::{Error, Result};

/// Joins title and body with a single space. The vocabulary was fitted over
/// the same convention, so an empty title still produces the leading space.
pub fn normalize(title: &str, text: &str) -> String {
    format!("{} {}", title, text)
}

/// Trims OCR output and rejects anything shorter than the minimum usable length.
pub fn validate_ocr_text(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if length < MIN_OCR_TEXT_CHARS {
        return Err(Error::InsufficientText { length });
    }
    Ok(trimmed.to_string())
}

/// Caps text for echoing back to a caller, appending the truncation marker when cut.
pub fn echo_capped(text: &str) -> String {
    match text.char_indices().nth(EXTRACTED_TEXT_ECHO_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
