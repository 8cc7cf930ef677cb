use std::sync::Arc;

use fnd_core::types::ModelParams;
use fnd_core::{Label, Vectorizer};

use crate::artifacts::{ArtifactBundle, ArtifactStore, VectorizerSource};
use crate::dataset::LabeledArticle;
use crate::linear::LinearClassifier;
use crate::tfidf::{TfidfConfig, TfidfVectorizer};

const REAL: [&str; 10] = [
    "Senate committee approves annual budget after lengthy debate",
    "Officials confirm quarterly economic report shows modest growth",
    "Federal court ruling upholds state election procedures",
    "Central bank holds interest rates steady citing inflation data",
    "Governor signs infrastructure funding bill for highways",
    "Researchers publish peer reviewed study on vaccine efficacy",
    "Parliament debates trade agreement with neighbouring countries",
    "Census bureau releases updated population statistics",
    "Senate hearing examines budget oversight and official audits",
    "Economic analysts expect steady employment figures this quarter",
];

const FAKE: [&str; 10] = [
    "Shocking secret cure doctors hide from everyone",
    "Clickbait conspiracy reveals celebrity alien cover up",
    "You won't believe this miracle hoax they banned",
    "Secret elites plot shocking mind control scheme",
    "Miracle pill melts fat overnight insiders shocked",
    "Conspiracy insiders expose hidden hoax cover up",
    "Unbelievable alien sighting covered up by elites",
    "Banned video shows shocking truth about miracle cure",
    "Hoax exposed secret clickbait scheme goes viral",
    "Celebrity conspiracy shocking secret revealed tonight",
];

pub(crate) fn labeled_corpus() -> Vec<LabeledArticle> {
    REAL.iter()
        .map(|t| (t, Label::Real))
        .chain(FAKE.iter().map(|t| (t, Label::Fake)))
        .map(|(text, label)| LabeledArticle {
            title: String::new(),
            text: text.to_string(),
            label,
        })
        .collect()
}

pub(crate) fn params() -> ModelParams {
    ModelParams {
        c: 1.0,
        max_iter: 50,
        loss: "hinge".to_string(),
    }
}

pub(crate) fn fitted_vectorizer() -> TfidfVectorizer {
    let texts: Vec<&str> = REAL.iter().chain(FAKE.iter()).copied().collect();
    TfidfVectorizer::fit(&texts, TfidfConfig::default()).unwrap()
}

/// Hand-weighted classifier: words from the fake half push towards FAKE,
/// everything else towards REAL.
pub(crate) fn keyword_classifier(vectorizer: &TfidfVectorizer) -> LinearClassifier {
    let mut coef = vec![0.5; vectorizer.dimension()];
    for text in FAKE {
        for token in vectorizer.tokens(text) {
            if let Some(column) = vectorizer.column(&token) {
                coef[column] = -1.0;
            }
        }
    }
    LinearClassifier::new(coef, 0.0, params())
}

pub(crate) fn available_store() -> Arc<ArtifactStore> {
    let vectorizer = fitted_vectorizer();
    let classifier = keyword_classifier(&vectorizer);
    Arc::new(ArtifactStore::from_bundle(ArtifactBundle {
        vectorizer,
        classifier,
        vectorizer_source: VectorizerSource::Artifact,
    }))
}

pub(crate) fn unavailable_store() -> Arc<ArtifactStore> {
    Arc::new(ArtifactStore::unavailable("finalized_model.json: not found"))
}
