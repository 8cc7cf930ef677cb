use fnd_core::config::{max_image_size_mb, ALLOWED_IMAGE_EXTENSIONS};
use fnd_core::types::FeatureConfig;
use fnd_core::{Classifier, ModelInfo, Vectorizer};

use crate::artifacts::ArtifactStore;

/// Describes the loaded artifacts and the service limits. Training facts are
/// only reported when the classifier artifact recorded them.
pub fn model_info(store: &ArtifactStore, image_support: bool) -> ModelInfo {
    let mut info = ModelInfo {
        model_type: "PassiveAggressiveClassifier".to_string(),
        vectorizer: "TfidfVectorizer".to_string(),
        available: store.is_available(),
        failure_reason: store.failure_reason().map(str::to_string),
        vectorizer_source: None,
        accuracy: None,
        training_samples: None,
        trained_at: None,
        features: None,
        model_params: None,
        image_support,
        allowed_image_formats: ALLOWED_IMAGE_EXTENSIONS
            .iter()
            .map(|ext| ext.to_string())
            .collect(),
        max_image_size_mb: max_image_size_mb(),
    };

    if let Ok(bundle) = store.bundle() {
        info.model_type = bundle.classifier.name().to_string();
        info.vectorizer = bundle.vectorizer.kind().to_string();
        info.vectorizer_source = Some(bundle.vectorizer_source.as_str().to_string());
        info.features = Some(FeatureConfig {
            stop_words: bundle.vectorizer.config().stop_words.as_str().to_string(),
            max_df: bundle.vectorizer.config().max_df,
            vocabulary_size: bundle.vectorizer.vocabulary_size(),
        });
        info.model_params = Some(bundle.classifier.params().clone());
        if let Some(metadata) = bundle.classifier.metadata() {
            info.accuracy = Some(format_accuracy(metadata.accuracy));
            info.training_samples = Some(metadata.training_samples);
            info.trained_at = Some(metadata.trained_at);
        }
    }
    info
}

fn format_accuracy(accuracy: f64) -> String {
    format!("{:.2}%", accuracy * 100.0)
}
