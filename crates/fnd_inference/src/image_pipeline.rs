//! Image upload → OCR text → prediction.
//!
//! Stages run in order: cheap validation, decoding, text extraction, metadata,
//! prediction. Any stage may reject the request; metadata is best-effort and
//! never aborts it.

use image::{ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use fnd_core::config::{ALLOWED_IMAGE_EXTENSIONS, MAX_IMAGE_SIZE};
use fnd_core::normalize::{echo_capped, validate_ocr_text};
use fnd_core::{Article, Error, ImageMetadata, ImagePrediction, Result};

use crate::ocr::{OcrCapability, OcrEngine};
use crate::predictor::Predictor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStage {
    Received,
    Validated,
    Decoded,
    TextExtracted,
    MetadataExtracted,
    Predicted,
}

impl fmt::Display for ImageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageStage::Received => "received",
            ImageStage::Validated => "validated",
            ImageStage::Decoded => "decoded",
            ImageStage::TextExtracted => "text_extracted",
            ImageStage::MetadataExtracted => "metadata_extracted",
            ImageStage::Predicted => "predicted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImagePipeline {
    predictor: Predictor,
    ocr: Option<Arc<dyn OcrEngine>>,
    unavailable_reason: String,
}

impl ImagePipeline {
    pub fn new(predictor: Predictor, ocr: Option<Arc<dyn OcrEngine>>) -> Self {
        Self {
            predictor,
            ocr,
            unavailable_reason: "no OCR engine configured".to_string(),
        }
    }

    pub fn from_capability(predictor: Predictor, capability: &OcrCapability, language: &str) -> Self {
        let pipeline = Self::new(predictor, capability.engine(language));
        match capability.unavailable_reason() {
            Some(reason) => pipeline.with_unavailable_reason(reason),
            None => pipeline,
        }
    }

    /// Reason reported when an upload arrives and no OCR engine is present.
    pub fn with_unavailable_reason(mut self, reason: impl Into<String>) -> Self {
        self.unavailable_reason = reason.into();
        self
    }

    pub fn image_support(&self) -> bool {
        self.ocr.is_some()
    }

    pub async fn process(&self, upload: ImageUpload) -> Result<ImagePrediction> {
        trace_stage(ImageStage::Received, &upload.filename);
        self.predictor.ensure_available()?;
        validate_upload(&upload.filename, upload.bytes.len())?;
        let ocr = self
            .ocr
            .as_ref()
            .ok_or_else(|| Error::OcrUnavailable(self.unavailable_reason.clone()))?;
        trace_stage(ImageStage::Validated, &upload.filename);

        let bytes = Arc::new(upload.bytes);
        let decoded = {
            let bytes = Arc::clone(&bytes);
            tokio::task::spawn_blocking(move || decode(&bytes))
                .await
                .map_err(|e| Error::Inference(format!("image decoding task failed: {}", e)))??
        };
        let (image, rgb) = decoded;
        trace_stage(ImageStage::Decoded, &upload.filename);

        let raw = ocr.extract_text(&rgb).await?;
        let text = validate_ocr_text(&raw)?;
        trace_stage(ImageStage::TextExtracted, &upload.filename);

        let image_metadata = best_effort_metadata(&bytes, &image);
        trace_stage(ImageStage::MetadataExtracted, &upload.filename);

        let result = self.predictor.predict_article(&Article::untitled(text.as_str()))?;
        trace_stage(ImageStage::Predicted, &upload.filename);

        Ok(ImagePrediction {
            result,
            extracted_text: echo_capped(&text),
            extracted_text_length: text.chars().count(),
            image_metadata,
        })
    }
}

fn trace_stage(stage: ImageStage, filename: &str) {
    tracing::debug!(stage = %stage, "image {}", filename);
}

/// Extension and size checks, done before any decoding.
pub fn validate_upload(filename: &str, size: usize) -> Result<()> {
    if filename.trim().is_empty() {
        return Err(Error::input("No image file selected"));
    }
    let allowed = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .is_some_and(|ext| ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()));
    if !allowed {
        return Err(Error::input(format!(
            "File type not allowed. Allowed types: {}",
            ALLOWED_IMAGE_EXTENSIONS.join(", ")
        )));
    }
    if size > MAX_IMAGE_SIZE {
        return Err(Error::input(format!(
            "File too large. Maximum size: {}MB",
            MAX_IMAGE_SIZE / (1024 * 1024)
        )));
    }
    Ok(())
}

fn decode(bytes: &[u8]) -> Result<(DynamicImage, RgbImage)> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| Error::input(format!("Could not decode image: {}", e)))?;
    let rgb = image.to_rgb8();
    Ok((image, rgb))
}

/// Metadata for the response. A failure here is logged and reported as absent.
fn best_effort_metadata(bytes: &[u8], image: &DynamicImage) -> Option<ImageMetadata> {
    match extract_metadata(bytes, image) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!("Image metadata unavailable: {}", e);
            None
        }
    }
}

/// An unreadable EXIF block only clears `has_exif`; the other fields survive.
pub fn extract_metadata(bytes: &[u8], image: &DynamicImage) -> Result<ImageMetadata> {
    let format = image::guess_format(bytes)
        .map_err(|e| Error::Inference(format!("unknown image format: {}", e)))?;
    let has_exif = has_exif(bytes, format).unwrap_or_else(|e| {
        tracing::warn!("Treating image as having no EXIF data: {}", e);
        false
    });
    Ok(ImageMetadata {
        format: format_name(format),
        width: image.width(),
        height: image.height(),
        color_mode: color_mode(image.color()),
        has_exif,
        size_bytes: bytes.len() as u64,
    })
}

fn has_exif(bytes: &[u8], format: ImageFormat) -> Result<bool> {
    let mut decoder = ImageReader::with_format(Cursor::new(bytes), format)
        .into_decoder()
        .map_err(|e| Error::Inference(format!("cannot reopen image: {}", e)))?;
    let exif = decoder
        .exif_metadata()
        .map_err(|e| Error::Inference(format!("cannot read EXIF block: {}", e)))?;
    Ok(exif.is_some_and(|block| !block.is_empty()))
}

fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "I;16".to_string(),
        ColorType::La16 => "LA;16".to_string(),
        ColorType::Rgb16 => "RGB;16".to_string(),
        ColorType::Rgba16 => "RGBA;16".to_string(),
        ColorType::Rgb32F => "RGB;F".to_string(),
        ColorType::Rgba32F => "RGBA;F".to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{available_store, unavailable_store};
    use async_trait::async_trait;
    use fnd_core::config::{EXTRACTED_TEXT_ECHO_LIMIT, TRUNCATION_MARKER};
    use fnd_core::Label;
    use image::{GrayImage, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct ScriptedOcr {
        text: String,
        calls: AtomicUsize,
    }

    impl ScriptedOcr {
        fn returning(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl OcrEngine for ScriptedOcr {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn extract_text(&self, _image: &RgbImage) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }

    #[derive(Debug)]
    struct FailingOcr;

    #[async_trait]
    impl OcrEngine for FailingOcr {
        fn name(&self) -> &str {
            "failing"
        }

        async fn extract_text(&self, _image: &RgbImage) -> Result<String> {
            Err(Error::OcrExtraction("engine crashed".to_string()))
        }
    }

    fn png_bytes() -> Vec<u8> {
        let image = GrayImage::from_pixel(6, 4, Luma([200u8]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn upload(filename: &str, bytes: Vec<u8>) -> ImageUpload {
        ImageUpload {
            filename: filename.to_string(),
            bytes,
        }
    }

    fn pipeline(ocr: Arc<dyn OcrEngine>) -> ImagePipeline {
        ImagePipeline::new(Predictor::new(available_store()), Some(ocr))
    }

    #[test]
    fn test_validate_upload_extensions() {
        assert!(validate_upload("photo.PNG", 10).is_ok());
        assert!(validate_upload("scan.final.webp", 10).is_ok());
        for name in ["photo.txt", "png", "archive.png.zip", ""] {
            assert!(matches!(validate_upload(name, 10), Err(Error::Input(_))), "{}", name);
        }
        assert!(matches!(
            validate_upload("big.jpg", MAX_IMAGE_SIZE + 1),
            Err(Error::Input(msg)) if msg.contains("too large")
        ));
        assert!(validate_upload("edge.jpg", MAX_IMAGE_SIZE).is_ok());
    }

    #[tokio::test]
    async fn test_disallowed_extension_rejected_before_decoding() {
        let ocr = ScriptedOcr::returning("Shocking secret cure revealed");
        let err = pipeline(ocr.clone())
            .process(upload("photo.txt", b"definitely not an image".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(msg) if msg.contains("File type not allowed")));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_image_prediction() {
        let ocr = ScriptedOcr::returning("\n  Shocking secret miracle cure they hide  \n");
        let prediction = pipeline(ocr)
            .process(upload("news.png", png_bytes()))
            .await
            .unwrap();

        assert_eq!(prediction.result.label(), Label::Fake);
        assert!(prediction.result.is_fake());
        assert_eq!(prediction.extracted_text, "Shocking secret miracle cure they hide");
        assert_eq!(prediction.extracted_text_length, 38);

        let metadata = prediction.image_metadata.unwrap();
        assert_eq!(metadata.format, "PNG");
        assert_eq!((metadata.width, metadata.height), (6, 4));
        assert_eq!(metadata.color_mode, "L");
        assert!(!metadata.has_exif);
        assert_eq!(metadata.size_bytes, png_bytes().len() as u64);
    }

    #[tokio::test]
    async fn test_short_text_is_insufficient() {
        let err = pipeline(ScriptedOcr::returning("   a b c  "))
            .process(upload("blank.png", png_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientText { length: 5 }));
    }

    #[tokio::test]
    async fn test_long_text_echo_is_capped() {
        let long = "senate budget report ".repeat(60);
        let prediction = pipeline(ScriptedOcr::returning(&long))
            .process(upload("long.png", png_bytes()))
            .await
            .unwrap();
        assert!(prediction.extracted_text.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            prediction.extracted_text.chars().count(),
            EXTRACTED_TEXT_ECHO_LIMIT + TRUNCATION_MARKER.len()
        );
        assert_eq!(prediction.extracted_text_length, long.trim().chars().count());
    }

    #[tokio::test]
    async fn test_undecodable_bytes_are_rejected() {
        let ocr = ScriptedOcr::returning("Shocking secret cure revealed");
        let err = pipeline(ocr.clone())
            .process(upload("broken.jpg", vec![0u8; 64]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Input(msg) if msg.contains("decode")));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ocr_unavailable_and_failed_are_distinct() {
        let capability = OcrCapability::Unavailable {
            reason: "tesseract not found".to_string(),
        };
        let disabled =
            ImagePipeline::from_capability(Predictor::new(available_store()), &capability, "eng");
        assert!(!disabled.image_support());
        let err = disabled
            .process(upload("news.png", png_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OcrUnavailable(reason) if reason.contains("tesseract")));

        let err = pipeline(Arc::new(FailingOcr))
            .process(upload("news.png", png_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::OcrExtraction(_)));
    }

    #[tokio::test]
    async fn test_unavailable_model_fails_image_path() {
        let pipeline = ImagePipeline::new(
            Predictor::new(unavailable_store()),
            Some(ScriptedOcr::returning("Shocking secret cure revealed")),
        );
        let err = pipeline
            .process(upload("news.png", png_bytes()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[test]
    fn test_metadata_reports_rgba() {
        let image = image::RgbaImage::new(3, 2);
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        let metadata = extract_metadata(&bytes, &decoded).unwrap();
        assert_eq!(metadata.color_mode, "RGBA");
        assert_eq!(metadata.format, "PNG");
    }

    #[test]
    fn test_metadata_absent_when_format_unknown() {
        let decoded = image::load_from_memory(&png_bytes()).unwrap();
        assert!(best_effort_metadata(b"not an image", &decoded).is_none());
        assert!(best_effort_metadata(&png_bytes(), &decoded).is_some());
    }

    #[test]
    fn test_unreadable_exif_keeps_other_metadata() {
        let bytes = png_bytes();
        let decoded = image::load_from_memory(&bytes).unwrap();
        // Signature only: the format is known but the decoder cannot reopen it.
        let truncated = &bytes[..8];
        let metadata = best_effort_metadata(truncated, &decoded).unwrap();
        assert_eq!(metadata.format, "PNG");
        assert_eq!((metadata.width, metadata.height), (6, 4));
        assert_eq!(metadata.color_mode, "L");
        assert!(!metadata.has_exif);
        assert_eq!(metadata.size_bytes, 8);
    }
}
