//! Offline training job that produces the two artifacts the service loads.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use fnd_core::types::{ModelParams, TrainingMetadata};
use fnd_core::{Classifier, Error, FeatureVector, Label, Result, Vectorizer};

use crate::dataset::LabeledArticle;
use crate::linear::LinearClassifier;
use crate::tfidf::{TfidfConfig, TfidfVectorizer};

#[derive(Debug, Clone)]
pub struct PassiveAggressiveConfig {
    pub c: f64,
    pub max_iter: usize,
    /// Stop once the epoch loss has not improved by `tol * n` for `n_iter_no_change` epochs.
    pub tol: Option<f64>,
    pub n_iter_no_change: usize,
    pub seed: u64,
}

impl Default for PassiveAggressiveConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 50,
            tol: Some(1e-3),
            n_iter_no_change: 5,
            seed: 0,
        }
    }
}

/// PA-I with hinge loss. `Real` is the positive class.
pub fn fit_passive_aggressive(
    vectors: &[FeatureVector],
    labels: &[Label],
    dimension: usize,
    config: &PassiveAggressiveConfig,
) -> Result<LinearClassifier> {
    if vectors.len() != labels.len() {
        return Err(Error::Dataset(format!(
            "{} feature vectors but {} labels",
            vectors.len(),
            labels.len()
        )));
    }
    if !labels.contains(&Label::Fake) || !labels.contains(&Label::Real) {
        return Err(Error::Dataset(
            "training data must contain both FAKE and REAL samples".to_string(),
        ));
    }

    let mut weights = vec![0.0; dimension];
    let mut bias = 0.0;
    let mut order: Vec<usize> = (0..vectors.len()).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut best_loss = f64::INFINITY;
    let mut no_improvement = 0usize;
    let mut epochs = 0usize;

    for _ in 0..config.max_iter {
        epochs += 1;
        order.shuffle(&mut rng);
        let mut epoch_loss = 0.0;
        for &i in &order {
            let x = &vectors[i];
            let y = if labels[i] == Label::Real { 1.0 } else { -1.0 };
            let margin = y * (x.dot(&weights) + bias);
            let loss = (1.0 - margin).max(0.0);
            epoch_loss += loss;
            if loss == 0.0 {
                continue;
            }
            let sq_norm = x.squared_norm();
            if sq_norm == 0.0 {
                continue;
            }
            let step = config.c.min(loss / sq_norm) * y;
            for (column, value) in x.entries() {
                weights[*column] += step * value;
            }
            bias += step;
        }

        if let Some(tol) = config.tol {
            if epoch_loss > best_loss - tol * vectors.len() as f64 {
                no_improvement += 1;
            } else {
                no_improvement = 0;
            }
            if epoch_loss < best_loss {
                best_loss = epoch_loss;
            }
            if no_improvement >= config.n_iter_no_change {
                break;
            }
        }
    }
    tracing::debug!("Passive-aggressive training stopped after {} epochs", epochs);

    Ok(LinearClassifier::new(
        weights,
        bias,
        ModelParams {
            c: config.c,
            max_iter: config.max_iter,
            loss: "hinge".to_string(),
        },
    ))
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub test_size: f64,
    pub seed: u64,
    pub tfidf: TfidfConfig,
    pub classifier: PassiveAggressiveConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 20,
            tfidf: TfidfConfig::default(),
            classifier: PassiveAggressiveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub accuracy: f64,
    /// Rows are actual FAKE/REAL, columns predicted FAKE/REAL.
    pub confusion: [[usize; 2]; 2],
    pub training_samples: usize,
    pub test_samples: usize,
    pub vocabulary_size: usize,
}

#[derive(Debug)]
pub struct TrainedModel {
    pub vectorizer: TfidfVectorizer,
    pub classifier: LinearClassifier,
    pub report: TrainingReport,
}

/// Splits, fits the vectorizer on training texts, trains and evaluates the classifier.
pub fn train(samples: &[LabeledArticle], config: &TrainingConfig) -> Result<TrainedModel> {
    if samples.len() < 2 {
        return Err(Error::Dataset(format!(
            "need at least 2 labeled samples, got {}",
            samples.len()
        )));
    }

    let mut indices: Vec<usize> = (0..samples.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(config.seed));
    let test_count = ((samples.len() as f64 * config.test_size).ceil() as usize)
        .min(samples.len() - 1);
    let (test_idx, train_idx) = indices.split_at(test_count);

    let train_texts: Vec<&str> = train_idx.iter().map(|&i| samples[i].text.as_str()).collect();
    let train_labels: Vec<Label> = train_idx.iter().map(|&i| samples[i].label).collect();

    tracing::info!(
        "Fitting TF-IDF vectorizer on {} training samples ({} held out)",
        train_idx.len(),
        test_idx.len()
    );
    let vectorizer = TfidfVectorizer::fit(&train_texts, config.tfidf.clone())?;
    let train_vectors: Vec<FeatureVector> =
        train_texts.iter().map(|t| vectorizer.vectorize(t)).collect();

    tracing::info!("Training classifier over {} features", vectorizer.dimension());
    let classifier = fit_passive_aggressive(
        &train_vectors,
        &train_labels,
        vectorizer.dimension(),
        &config.classifier,
    )?;

    let mut confusion = [[0usize; 2]; 2];
    for &i in test_idx {
        let predicted = classifier.classify(&vectorizer.vectorize(&samples[i].text))?;
        confusion[label_slot(samples[i].label)][label_slot(predicted)] += 1;
    }
    let correct = confusion[0][0] + confusion[1][1];
    let accuracy = if test_idx.is_empty() {
        0.0
    } else {
        correct as f64 / test_idx.len() as f64
    };

    let report = TrainingReport {
        accuracy,
        confusion,
        training_samples: train_idx.len(),
        test_samples: test_idx.len(),
        vocabulary_size: vectorizer.dimension(),
    };
    let classifier = classifier.with_metadata(TrainingMetadata {
        accuracy,
        training_samples: report.training_samples,
        test_samples: report.test_samples,
        trained_at: Utc::now(),
    });

    Ok(TrainedModel {
        vectorizer,
        classifier,
        report,
    })
}

fn label_slot(label: Label) -> usize {
    match label {
        Label::Fake => 0,
        Label::Real => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::labeled_corpus;

    #[test]
    fn test_pa_separates_training_data() {
        let samples = labeled_corpus();
        let texts: Vec<&str> = samples.iter().map(|s| s.text.as_str()).collect();
        let labels: Vec<Label> = samples.iter().map(|s| s.label).collect();
        let vectorizer = TfidfVectorizer::fit(&texts, TfidfConfig::default()).unwrap();
        let vectors: Vec<FeatureVector> = texts.iter().map(|t| vectorizer.vectorize(t)).collect();

        let classifier = fit_passive_aggressive(
            &vectors,
            &labels,
            vectorizer.dimension(),
            &PassiveAggressiveConfig {
                tol: None,
                ..PassiveAggressiveConfig::default()
            },
        )
        .unwrap();

        for (vector, label) in vectors.iter().zip(&labels) {
            assert_eq!(classifier.classify(vector).unwrap(), *label);
        }
    }

    #[test]
    fn test_single_class_is_rejected() {
        let vectors = vec![FeatureVector::new(1, vec![(0, 1.0)])];
        let err = fit_passive_aggressive(
            &vectors,
            &[Label::Fake],
            1,
            &PassiveAggressiveConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("both"));
    }

    #[test]
    fn test_train_reports_split_and_metadata() {
        let samples = labeled_corpus();
        let model = train(&samples, &TrainingConfig::default()).unwrap();
        let report = &model.report;
        assert_eq!(report.training_samples + report.test_samples, samples.len());
        assert_eq!(report.test_samples, (samples.len() as f64 * 0.2).ceil() as usize);
        let evaluated: usize = report.confusion.iter().flatten().sum();
        assert_eq!(evaluated, report.test_samples);
        assert!((0.0..=1.0).contains(&report.accuracy));

        let metadata = model.classifier.metadata().unwrap();
        assert_eq!(metadata.training_samples, report.training_samples);
        assert_eq!(model.classifier.dimension(), model.vectorizer.dimension());
    }

    #[test]
    fn test_training_is_reproducible() {
        let samples = labeled_corpus();
        let first = train(&samples, &TrainingConfig::default()).unwrap();
        let second = train(&samples, &TrainingConfig::default()).unwrap();
        assert_eq!(first.classifier.coef(), second.classifier.coef());
        assert_eq!(first.report.confusion, second.report.confusion);
    }
}
