//! Labeled news dataset in CSV form (`title`, `text`, `label` columns; extra
//! columns are ignored).

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use fnd_core::{Error, Label, Result};

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArticle {
    pub title: String,
    pub text: String,
    pub label: Label,
}

pub fn read_labeled(path: &Path) -> Result<Vec<LabeledArticle>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Dataset(format!("cannot open {}: {}", path.display(), e)))?;
    read_labeled_from(file)
}

/// Reads labeled rows, dropping rows with an empty text or an unknown label.
pub fn read_labeled_from<R: Read>(reader: R) -> Result<Vec<LabeledArticle>> {
    let mut articles = Vec::new();
    let mut dropped = 0usize;
    for row in rows(reader)? {
        let row = row?;
        let label = row.label.as_deref().and_then(Label::parse);
        match (row.text, label) {
            (Some(text), Some(label)) if !text.trim().is_empty() => articles.push(LabeledArticle {
                title: row.title.unwrap_or_default(),
                text,
                label,
            }),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        tracing::warn!("Dropped {} incomplete dataset rows", dropped);
    }
    Ok(articles)
}

/// Reads only the `text` column, for refitting a vectorizer without labels.
pub fn read_texts(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Dataset(format!("cannot open {}: {}", path.display(), e)))?;
    let mut texts = Vec::new();
    for row in rows(file)? {
        if let Some(text) = row?.text {
            if !text.trim().is_empty() {
                texts.push(text);
            }
        }
    }
    if texts.is_empty() {
        return Err(Error::Dataset(format!(
            "{} has no usable 'text' column values",
            path.display()
        )));
    }
    Ok(texts)
}

fn rows<R: Read>(reader: R) -> Result<impl Iterator<Item = Result<Row>>> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader
        .headers()
        .map_err(|e| Error::Dataset(format!("cannot read CSV header: {}", e)))?;
    if !headers.iter().any(|h| h == "text") {
        return Err(Error::Dataset("CSV header has no 'text' column".to_string()));
    }
    Ok(csv_reader
        .into_deserialize::<Row>()
        .map(|row| row.map_err(|e| Error::Dataset(format!("malformed CSV row: {}", e)))))
}
