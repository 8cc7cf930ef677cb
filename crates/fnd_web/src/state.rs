use std::sync::Arc;
use tokio::sync::RwLock;

use fnd_core::{Error, Result};
use fnd_inference::artifacts::{ArtifactPaths, ArtifactStore};
use fnd_inference::ocr::{OcrEngine, Resolution};
use fnd_inference::{ImagePipeline, Predictor};

/// Shared handler state. The artifact store sits behind a lock only so that
/// a reload can swap it; handlers clone the `Arc` and release the lock before
/// running inference.
pub struct AppState {
    store: RwLock<Arc<ArtifactStore>>,
    paths: ArtifactPaths,
    ocr_resolution: Resolution,
    ocr_engine: Option<Arc<dyn OcrEngine>>,
}

impl AppState {
    pub fn new(
        store: Arc<ArtifactStore>,
        paths: ArtifactPaths,
        ocr_resolution: Resolution,
        ocr_language: &str,
    ) -> Self {
        let ocr_engine = ocr_resolution.capability.engine(ocr_language);
        Self {
            store: RwLock::new(store),
            paths,
            ocr_resolution,
            ocr_engine,
        }
    }

    /// Replaces the engine built from the OCR resolution.
    pub fn with_ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.ocr_engine = Some(engine);
        self
    }

    pub async fn store(&self) -> Arc<ArtifactStore> {
        self.store.read().await.clone()
    }

    pub async fn predictor(&self) -> Predictor {
        Predictor::new(self.store().await)
    }

    pub fn image_pipeline(&self, predictor: Predictor) -> ImagePipeline {
        let pipeline = ImagePipeline::new(predictor, self.ocr_engine.clone());
        match self.ocr_resolution.capability.unavailable_reason() {
            Some(reason) if self.ocr_engine.is_none() => pipeline.with_unavailable_reason(reason),
            _ => pipeline,
        }
    }

    pub fn image_support(&self) -> bool {
        self.ocr_engine.is_some()
    }

    pub fn ocr_resolution(&self) -> &Resolution {
        &self.ocr_resolution
    }

    /// Loads the artifacts again from the configured paths and swaps them in.
    /// Requests already holding the previous snapshot finish against it.
    pub async fn reload(&self) -> Result<Arc<ArtifactStore>> {
        let paths = self.paths.clone();
        let store = tokio::task::spawn_blocking(move || ArtifactStore::load(&paths))
            .await
            .map_err(|e| Error::Artifact(format!("artifact reload task failed: {}", e)))?;
        let store = Arc::new(store);
        *self.store.write().await = Arc::clone(&store);
        tracing::info!("Artifacts reloaded, available: {}", store.is_available());
        Ok(store)
    }
}
