use std::sync::Arc;

use fnd_core::normalize::normalize;
use fnd_core::{
    Article, ArticleRequest, BatchEntry, BatchItemResult, Classifier, Error, ErrorDescriptor,
    PredictionResult, Result, Vectorizer,
};

use crate::artifacts::{ArtifactBundle, ArtifactStore};

/// Runs normalize → vectorize → classify against a snapshot of the artifact store.
#[derive(Debug, Clone)]
pub struct Predictor {
    store: Arc<ArtifactStore>,
}

impl Predictor {
    pub fn new(store: Arc<ArtifactStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn ensure_available(&self) -> Result<()> {
        self.store.bundle().map(|_| ())
    }

    pub fn predict_one(&self, request: ArticleRequest) -> Result<PredictionResult> {
        let bundle = self.store.bundle()?;
        let article = request.into_article()?;
        run(bundle, &article)
    }

    pub fn predict_article(&self, article: &Article) -> Result<PredictionResult> {
        run(self.store.bundle()?, article)
    }

    /// One result per entry, in input order. A bad entry is reported at its
    /// index and does not stop the rest of the batch.
    pub fn predict_batch(&self, entries: Vec<BatchEntry>) -> Result<Vec<BatchItemResult>> {
        let bundle = self.store.bundle()?;
        if entries.is_empty() {
            return Err(Error::input("Articles must be a non-empty array"));
        }

        let results: Vec<BatchItemResult> = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                match entry.into_article().and_then(|article| run(bundle, &article)) {
                    Ok(result) => BatchItemResult::Success { index, result },
                    Err(e) => {
                        let item = Error::BatchItem {
                            index,
                            message: e.to_string(),
                        };
                        tracing::warn!("{}", item);
                        BatchItemResult::Failure {
                            index,
                            error: ErrorDescriptor::from(&item),
                        }
                    }
                }
            })
            .collect();

        tracing::debug!(
            "Batch finished: {} items, {} failed",
            results.len(),
            results.iter().filter(|r| r.error().is_some()).count()
        );
        Ok(results)
    }
}

fn run(bundle: &ArtifactBundle, article: &Article) -> Result<PredictionResult> {
    let features = bundle
        .vectorizer
        .vectorize(&normalize(&article.title, &article.text));
    let label = bundle.classifier.classify(&features).map_err(|e| match e {
        Error::Inference(_) => e,
        other => Error::Inference(other.to_string()),
    })?;
    Ok(PredictionResult::new(label))
}
