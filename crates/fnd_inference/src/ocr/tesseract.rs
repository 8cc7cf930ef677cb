use async_trait::async_trait;
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use fnd_core::{Error, Result};

use super::OcrEngine;

/// Runs the local `tesseract` binary, feeding a PNG on stdin and reading text from stdout.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
}

impl TesseractEngine {
    pub fn new(binary: PathBuf, language: impl Into<String>) -> Self {
        Self {
            binary,
            language: language.into(),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn extract_text(&self, image: &RgbImage) -> Result<String> {
        let image = image.clone();
        let png = tokio::task::spawn_blocking(move || encode_png(&image))
            .await
            .map_err(|e| Error::OcrExtraction(format!("image encoding task failed: {}", e)))??;

        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout", "-l", self.language.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    Error::OcrUnavailable(format!("{}: {}", self.binary.display(), e))
                }
                _ => Error::OcrExtraction(format!("cannot start tesseract: {}", e)),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::OcrExtraction("tesseract stdin unavailable".to_string()))?;
        stdin
            .write_all(&png)
            .await
            .map_err(|e| Error::OcrExtraction(format!("cannot send image to tesseract: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| Error::OcrExtraction(format!("tesseract did not finish: {}", e)))?;
        if !output.status.success() {
            return Err(Error::OcrExtraction(format!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        tracing::debug!("tesseract extracted {} characters", text.chars().count());
        Ok(text)
    }
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| Error::OcrExtraction(format!("cannot encode image for OCR: {}", e)))?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_png_roundtrips_dimensions() {
        let png = encode_png(&RgbImage::new(5, 3)).unwrap();
        assert_eq!(&png[..4], &[0x89, b'P', b'N', b'G']);
        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (5, 3));
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(dir.path().join("no-tesseract-here"), "eng");
        let err = engine.extract_text(&RgbImage::new(8, 8)).await.unwrap_err();
        assert!(matches!(err, Error::OcrUnavailable(_)));
    }
}
