use std::fmt;

use crate::types::{FeatureVector, Label};
use crate::Result;

/// Turns raw text into a feature vector over a vocabulary frozen at fit time.
pub trait Vectorizer: Send + Sync + fmt::Debug {
    /// Short name of the fitted transform, reported by model introspection.
    fn kind(&self) -> &str;

    /// Number of columns in every produced vector.
    fn dimension(&self) -> usize;

    /// Pure transform; identical input yields an identical vector.
    fn vectorize(&self, text: &str) -> FeatureVector;
}

/// Maps a feature vector to one of the frozen labels.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    fn classify(&self, vector: &FeatureVector) -> Result<Label>;
}
