pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod types;

pub use error::{Error, Result};
pub use models::{Classifier, Vectorizer};
pub use types::{
    Article, ArticleRequest, BatchEntry, BatchItemResult, BatchRequest, ErrorDescriptor, FeatureVector,
    ImageMetadata, ImagePrediction, Label, ModelInfo, PredictionResult,
};

pub mod prelude {
    pub use super::types::*;
    pub use super::{Classifier, Error, Result, Vectorizer};
}
