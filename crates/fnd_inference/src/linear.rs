use serde::{Deserialize, Serialize};

use fnd_core::types::{ModelParams, TrainingMetadata};
use fnd_core::{Classifier, Error, FeatureVector, Label, Result};

/// Binary linear model: `weights · x + bias`, positive scores map to the
/// second class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearClassifier {
    classes: [Label; 2],
    coef: Vec<f64>,
    intercept: f64,
    params: ModelParams,
    #[serde(default)]
    metadata: Option<TrainingMetadata>,
}

impl LinearClassifier {
    pub fn new(coef: Vec<f64>, intercept: f64, params: ModelParams) -> Self {
        Self {
            classes: [Label::Fake, Label::Real],
            coef,
            intercept,
            params,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: TrainingMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn classes(&self) -> [Label; 2] {
        self.classes
    }

    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn metadata(&self) -> Option<&TrainingMetadata> {
        self.metadata.as_ref()
    }

    pub fn decision_function(&self, vector: &FeatureVector) -> Result<f64> {
        if vector.dimension() != self.coef.len() {
            return Err(Error::Inference(format!(
                "feature vector has {} columns but the classifier expects {}",
                vector.dimension(),
                self.coef.len()
            )));
        }
        Ok(vector.dot(&self.coef) + self.intercept)
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes[0] == self.classes[1] {
            return Err(Error::Artifact(format!(
                "classifier labels must be distinct, got {:?}",
                self.classes
            )));
        }
        if let Some(position) = self
            .coef
            .iter()
            .chain(std::iter::once(&self.intercept))
            .position(|w| !w.is_finite())
        {
            return Err(Error::Artifact(format!(
                "classifier weight {} is not finite",
                position
            )));
        }
        Ok(())
    }
}

impl Classifier for LinearClassifier {
    fn name(&self) -> &str {
        "PassiveAggressiveClassifier"
    }

    fn dimension(&self) -> usize {
        self.coef.len()
    }

    fn classify(&self, vector: &FeatureVector) -> Result<Label> {
        let score = self.decision_function(vector)?;
        Ok(if score > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        })
    }
}
