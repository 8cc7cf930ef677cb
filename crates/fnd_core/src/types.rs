use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// An article ready for inference. The title defaults to empty; the text is required.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Article {
    pub title: String,
    pub text: String,
}

impl Article {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }

    pub fn untitled(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }
}

/// Request shape for a single article, as received on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl ArticleRequest {
    pub fn into_article(self) -> Result<Article> {
        let text = self.text.ok_or_else(|| {
            Error::input("No text provided. Please send JSON with 'text' field")
        })?;
        Ok(Article {
            title: self.title.unwrap_or_default(),
            text,
        })
    }
}

impl From<Article> for ArticleRequest {
    fn from(article: Article) -> Self {
        Self {
            title: Some(article.title),
            text: Some(article.text),
        }
    }
}

/// One element of a batch request. Anything that does not fit the article
/// shape is kept verbatim so it can be reported against its index.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Article(ArticleRequest),
    Malformed(serde_json::Value),
}

impl BatchEntry {
    pub fn into_article(self) -> Result<Article> {
        match self {
            BatchEntry::Article(request) => request.into_article(),
            BatchEntry::Malformed(value) => Err(Error::input(format!(
                "Malformed article entry: expected an object with a string 'text' field, got {}",
                describe_json(&value)
            ))),
        }
    }
}

impl From<Article> for BatchEntry {
    fn from(article: Article) -> Self {
        BatchEntry::Article(article.into())
    }
}

/// Body of a batch request. `articles` is kept loose so a non-array value
/// can be rejected with a clear message instead of a deserializer error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub articles: Option<serde_json::Value>,
}

impl BatchRequest {
    pub fn into_entries(self) -> Result<Vec<BatchEntry>> {
        let articles = self.articles.ok_or_else(|| {
            Error::input("No articles provided. Please send JSON with 'articles' array")
        })?;
        match articles {
            serde_json::Value::Array(items) if !items.is_empty() => Ok(items
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item.clone()).unwrap_or(BatchEntry::Malformed(item))
                })
                .collect()),
            _ => Err(Error::input("Articles must be a non-empty array")),
        }
    }
}

fn describe_json(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object with invalid fields",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "FAKE")]
    Fake,
    #[serde(rename = "REAL")]
    Real,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Fake => "FAKE",
            Label::Real => "REAL",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FAKE" => Some(Label::Fake),
            "REAL" => Some(Label::Real),
            _ => None,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A label plus the derived `is_fake` flag. Only constructible from a label,
/// so the flag cannot disagree with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PredictionResult {
    #[serde(rename = "prediction")]
    label: Label,
    is_fake: bool,
}

impl PredictionResult {
    pub fn new(label: Label) -> Self {
        Self {
            label,
            is_fake: label == Label::Fake,
        }
    }

    pub fn label(&self) -> Label {
        self.label
    }

    pub fn is_fake(&self) -> bool {
        self.is_fake
    }
}

impl From<Label> for PredictionResult {
    fn from(label: Label) -> Self {
        Self::new(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDescriptor {
    #[serde(rename = "error")]
    pub message: String,
    pub kind: String,
}

impl From<&Error> for ErrorDescriptor {
    fn from(err: &Error) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchItemResult {
    Success {
        index: usize,
        #[serde(flatten)]
        result: PredictionResult,
    },
    Failure {
        index: usize,
        #[serde(flatten)]
        error: ErrorDescriptor,
    },
}

impl BatchItemResult {
    pub fn index(&self) -> usize {
        match self {
            BatchItemResult::Success { index, .. } | BatchItemResult::Failure { index, .. } => *index,
        }
    }

    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            BatchItemResult::Success { result, .. } => Some(result),
            BatchItemResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        match self {
            BatchItemResult::Success { .. } => None,
            BatchItemResult::Failure { error, .. } => Some(error),
        }
    }
}

/// Sparse feature vector over a fixed vocabulary. Entries are sorted by column.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dimension: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    pub fn new(dimension: usize, mut entries: Vec<(usize, f64)>) -> Self {
        entries.sort_by_key(|(column, _)| *column);
        Self { dimension, entries }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dot(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .map(|(column, value)| dense.get(*column).copied().unwrap_or(0.0) * value)
            .sum()
    }

    pub fn squared_norm(&self) -> f64 {
        self.entries.iter().map(|(_, value)| value * value).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub format: String,
    pub width: u32,
    pub height: u32,
    pub color_mode: String,
    pub has_exif: bool,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImagePrediction {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub extracted_text: String,
    pub extracted_text_length: usize,
    pub image_metadata: Option<ImageMetadata>,
}

/// Facts recorded by the offline training job alongside the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub accuracy: f64,
    pub training_samples: usize,
    pub test_samples: usize,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    #[serde(rename = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub loss: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureConfig {
    pub stop_words: String,
    pub max_df: f64,
    pub vocabulary_size: usize,
}

/// Introspection payload describing the loaded model and service limits.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub vectorizer: String,
    pub available: bool,
    pub failure_reason: Option<String>,
    pub vectorizer_source: Option<String>,
    pub accuracy: Option<String>,
    pub training_samples: Option<usize>,
    pub trained_at: Option<DateTime<Utc>>,
    pub features: Option<FeatureConfig>,
    pub model_params: Option<ModelParams>,
    pub image_support: bool,
    pub allowed_image_formats: Vec<String>,
    pub max_image_size_mb: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_fake_follows_label() {
        assert!(PredictionResult::new(Label::Fake).is_fake());
        assert!(!PredictionResult::new(Label::Real).is_fake());
        let value = serde_json::to_value(PredictionResult::new(Label::Fake)).unwrap();
        assert_eq!(value, json!({"prediction": "FAKE", "is_fake": true}));
    }

    #[test]
    fn test_batch_entries_classify_shapes() {
        let entries: Vec<BatchEntry> = serde_json::from_value(json!([
            {"title": "t", "text": "body"},
            {},
            42,
            {"text": 7},
            {"title": null, "text": "x"}
        ]))
        .unwrap();

        assert_eq!(
            entries[0].clone().into_article().unwrap(),
            Article::new("t", "body")
        );
        assert!(matches!(entries[1].clone().into_article(), Err(Error::Input(msg)) if msg.contains("text")));
        assert!(matches!(entries[2], BatchEntry::Malformed(_)));
        assert!(matches!(entries[3], BatchEntry::Malformed(_)));
        assert_eq!(entries[4].clone().into_article().unwrap(), Article::untitled("x"));
    }

    #[test]
    fn test_batch_item_serialization() {
        let ok = BatchItemResult::Success {
            index: 0,
            result: PredictionResult::new(Label::Real),
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"index": 0, "prediction": "REAL", "is_fake": false})
        );

        let err = Error::BatchItem {
            index: 1,
            message: "missing text".to_string(),
        };
        let failed = BatchItemResult::Failure {
            index: 1,
            error: ErrorDescriptor::from(&err),
        };
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["index"], 1);
        assert_eq!(value["kind"], "batch_item");
        assert!(value["error"].as_str().unwrap().contains("missing text"));
    }

    #[test]
    fn test_feature_vector_sorted_and_dot() {
        let vector = FeatureVector::new(4, vec![(3, 0.5), (1, 2.0)]);
        assert_eq!(vector.entries(), &[(1, 2.0), (3, 0.5)]);
        assert_eq!(vector.dot(&[1.0, 1.0, 1.0, 2.0]), 3.0);
        assert_eq!(vector.squared_norm(), 4.25);
    }

    #[test]
    fn test_batch_request_requires_non_empty_array() {
        let missing: BatchRequest = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(missing.into_entries(), Err(Error::Input(msg)) if msg.contains("No articles")));

        for articles in [json!([]), json!("text"), json!({"text": "x"}), json!(null)] {
            let request: BatchRequest = serde_json::from_value(json!({ "articles": articles })).unwrap();
            assert!(request.into_entries().is_err());
        }

        let request: BatchRequest =
            serde_json::from_value(json!({"articles": [{"text": "a"}, 3]})).unwrap();
        let entries = request.into_entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[1], BatchEntry::Malformed(_)));
    }

    #[test]
    fn test_label_parse() {
        assert_eq!(Label::parse(" fake "), Some(Label::Fake));
        assert_eq!(Label::parse("REAL"), Some(Label::Real));
        assert_eq!(Label::parse("satire"), None);
    }
}
