//! Loading and holding the fitted vectorizer and classifier.
//!
//! The store is built once and never mutated. When either artifact cannot be
//! used it keeps the reason instead of a bundle, and every inference call
//! fails fast with `ModelUnavailable`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use fnd_core::config::{DEFAULT_MODEL_PATH, DEFAULT_TRAINING_DATA_PATH, DEFAULT_VECTORIZER_PATH};
use fnd_core::{Classifier, Error, Result, Vectorizer};

use crate::dataset;
use crate::linear::LinearClassifier;
use crate::tfidf::{TfidfConfig, TfidfVectorizer};

#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub vectorizer: PathBuf,
    /// Labeled CSV used to refit the vectorizer when its artifact is missing.
    pub training_data: Option<PathBuf>,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from(DEFAULT_MODEL_PATH),
            vectorizer: PathBuf::from(DEFAULT_VECTORIZER_PATH),
            training_data: Some(PathBuf::from(DEFAULT_TRAINING_DATA_PATH)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorizerSource {
    Artifact,
    RefitFromDataset,
}

impl VectorizerSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorizerSource::Artifact => "artifact",
            VectorizerSource::RefitFromDataset => "refit_from_dataset",
        }
    }
}

#[derive(Debug)]
pub struct ArtifactBundle {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LinearClassifier,
    pub vectorizer_source: VectorizerSource,
}

#[derive(Debug)]
pub struct ArtifactStore {
    state: std::result::Result<ArtifactBundle, String>,
    model_loaded: bool,
    vectorizer_loaded: bool,
}

impl ArtifactStore {
    pub fn load(paths: &ArtifactPaths) -> Self {
        let classifier = read_json::<LinearClassifier>(&paths.model)
            .and_then(|c| c.validate().map(|_| c))
            .map_err(|e| format!("model {}: {}", paths.model.display(), e));
        let vectorizer = load_vectorizer(paths);
        let (model_loaded, vectorizer_loaded) = (classifier.is_ok(), vectorizer.is_ok());

        let store = match (classifier, vectorizer) {
            (Ok(classifier), Ok((vectorizer, vectorizer_source))) => {
                Self::from_bundle(ArtifactBundle {
                    vectorizer,
                    classifier,
                    vectorizer_source,
                })
            }
            (classifier, vectorizer) => {
                let reasons: Vec<String> = [classifier.err(), vectorizer.err()]
                    .into_iter()
                    .flatten()
                    .collect();
                let mut store = Self::unavailable(reasons.join("; "));
                store.model_loaded = model_loaded;
                store.vectorizer_loaded = vectorizer_loaded;
                store
            }
        };

        match store.failure_reason() {
            None => tracing::info!(
                "Artifacts loaded: {} features, vectorizer from {}",
                store.bundle().map(|b| b.vectorizer.dimension()).unwrap_or(0),
                store
                    .bundle()
                    .map(|b| b.vectorizer_source.as_str())
                    .unwrap_or("unknown")
            ),
            Some(reason) => tracing::error!("Artifacts unavailable: {}", reason),
        }
        store
    }

    /// Wraps an in-memory bundle, rejecting it when the two halves disagree on dimension.
    pub fn from_bundle(bundle: ArtifactBundle) -> Self {
        let (vectorizer_dim, classifier_dim) =
            (bundle.vectorizer.dimension(), bundle.classifier.dimension());
        if vectorizer_dim != classifier_dim {
            let mut store = Self::unavailable(format!(
                "vectorizer produces {} features but the classifier expects {}",
                vectorizer_dim, classifier_dim
            ));
            store.model_loaded = true;
            store.vectorizer_loaded = true;
            return store;
        }
        Self {
            state: Ok(bundle),
            model_loaded: true,
            vectorizer_loaded: true,
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: Err(reason.into()),
            model_loaded: false,
            vectorizer_loaded: false,
        }
    }

    pub fn bundle(&self) -> Result<&ArtifactBundle> {
        self.state
            .as_ref()
            .map_err(|reason| Error::ModelUnavailable(reason.clone()))
    }

    pub fn is_available(&self) -> bool {
        self.state.is_ok()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.state.as_ref().err().map(String::as_str)
    }

    pub fn model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn vectorizer_loaded(&self) -> bool {
        self.vectorizer_loaded
    }
}

fn load_vectorizer(paths: &ArtifactPaths) -> std::result::Result<(TfidfVectorizer, VectorizerSource), String> {
    let describe = |e: Error| format!("vectorizer {}: {}", paths.vectorizer.display(), e);
    match read_json::<TfidfVectorizer>(&paths.vectorizer) {
        Ok(vectorizer) => {
            vectorizer.validate().map_err(describe)?;
            Ok((vectorizer, VectorizerSource::Artifact))
        }
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            let Some(data) = paths.training_data.as_deref() else {
                return Err(describe(Error::Io(e)));
            };
            tracing::warn!(
                "{} not found, refitting vectorizer from {}",
                paths.vectorizer.display(),
                data.display()
            );
            refit_vectorizer(data)
                .map(|v| (v, VectorizerSource::RefitFromDataset))
                .map_err(|refit| {
                    format!(
                        "vectorizer {}: not found, and refit from {} failed: {}",
                        paths.vectorizer.display(),
                        data.display(),
                        refit
                    )
                })
        }
        Err(e) => Err(describe(e)),
    }
}

fn refit_vectorizer(data: &Path) -> Result<TfidfVectorizer> {
    let texts = dataset::read_texts(data)?;
    TfidfVectorizer::fit(&texts, TfidfConfig::default())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

/// Writes both artifacts where `load` will look for them.
pub fn save_artifacts(
    paths: &ArtifactPaths,
    vectorizer: &TfidfVectorizer,
    classifier: &LinearClassifier,
) -> Result<()> {
    write_json(&paths.vectorizer, vectorizer)?;
    write_json(&paths.model, classifier)?;
    tracing::info!(
        "Saved artifacts: {} and {}",
        paths.model.display(),
        paths.vectorizer.display()
    );
    Ok(())
}
