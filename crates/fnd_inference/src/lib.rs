//! Text classification and OCR pipeline for the fake news detector.

pub mod artifacts;
pub mod dataset;
pub mod image_pipeline;
pub mod info;
pub mod linear;
pub mod ocr;
pub mod predictor;
pub mod stop_words;
pub mod tfidf;
pub mod training;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use super::artifacts::{save_artifacts, ArtifactPaths, ArtifactStore, VectorizerSource};
    pub use super::image_pipeline::{ImagePipeline, ImageUpload};
    pub use super::info::model_info;
    pub use super::linear::LinearClassifier;
    pub use super::ocr::{OcrCapability, OcrEngine, OcrStatus, TesseractLocator};
    pub use super::predictor::Predictor;
    pub use super::tfidf::{TfidfConfig, TfidfVectorizer};
    pub use super::training::{train, TrainingConfig, TrainingReport};
    pub use fnd_core::{Error, Result};
}

pub use artifacts::{ArtifactPaths, ArtifactStore};
pub use image_pipeline::{ImagePipeline, ImageUpload};
pub use predictor::Predictor;
