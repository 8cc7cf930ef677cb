//! TF-IDF transform over a vocabulary frozen at fit time.
//!
//! Tokens are runs of two or more word characters, lowercased, with English
//! stop words removed. Weights are raw term counts times the smoothed IDF
//! `ln((1 + n) / (1 + df)) + 1`, and every vector is L2-normalized. Terms
//! whose fit-time document frequency exceeded `max_df` never enter the
//! vocabulary, so at inference they are ignored like any other unseen term.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use fnd_core::{Error, FeatureVector, Result, Vectorizer};

use crate::stop_words::is_english_stop_word;

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w\w+\b").unwrap_or_else(|e| panic!("Failed to compile token pattern: {e}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopWords {
    English,
    None,
}

impl StopWords {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopWords::English => "english",
            StopWords::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    pub stop_words: StopWords,
    /// Terms present in a larger fraction of fit documents than this are dropped.
    pub max_df: f64,
    pub lowercase: bool,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            stop_words: StopWords::English,
            max_df: 0.7,
            lowercase: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    config: TfidfConfig,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    n_documents: usize,
    #[serde(default)]
    pruned_terms: usize,
}

impl TfidfVectorizer {
    /// Fits vocabulary and IDF weights over `documents`.
    pub fn fit<S: AsRef<str>>(documents: &[S], config: TfidfConfig) -> Result<Self> {
        if documents.is_empty() {
            return Err(Error::Dataset("cannot fit a vectorizer on an empty corpus".to_string()));
        }
        if !(config.max_df > 0.0 && config.max_df <= 1.0) {
            return Err(Error::Dataset(format!(
                "max_df must be in (0, 1], got {}",
                config.max_df
            )));
        }

        let n_documents = documents.len();
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for doc in documents {
            let unique: HashSet<String> = analyze(&config, doc.as_ref()).into_iter().collect();
            for token in unique {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        let max_doc_count = config.max_df * n_documents as f64;
        let total_terms = document_frequency.len();
        let kept: BTreeMap<String, usize> = document_frequency
            .into_iter()
            .filter(|(_, df)| *df as f64 <= max_doc_count)
            .collect();
        if kept.is_empty() {
            return Err(Error::Dataset(
                "after pruning, no terms remain; try a higher max_df or a larger corpus".to_string(),
            ));
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(kept.len());
        for (column, (term, df)) in kept.into_iter().enumerate() {
            idf.push(((1.0 + n_documents as f64) / (1.0 + df as f64)).ln() + 1.0);
            vocabulary.insert(term, column);
        }

        tracing::debug!(
            "Fitted TF-IDF vocabulary: {} terms kept, {} pruned, {} documents",
            vocabulary.len(),
            total_terms - vocabulary.len(),
            n_documents
        );

        Ok(Self {
            config,
            pruned_terms: total_terms - vocabulary.len(),
            vocabulary,
            idf,
            n_documents,
        })
    }

    pub fn config(&self) -> &TfidfConfig {
        &self.config
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn n_documents(&self) -> usize {
        self.n_documents
    }

    pub fn pruned_terms(&self) -> usize {
        self.pruned_terms
    }

    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    /// Checks that a deserialized artifact is internally consistent.
    pub fn validate(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(Error::Artifact(format!(
                "vectorizer has {} vocabulary terms but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if let Some((term, column)) = self.vocabulary.iter().find(|(_, c)| **c >= self.idf.len()) {
            return Err(Error::Artifact(format!(
                "vocabulary term '{}' points at column {} outside {}",
                term,
                column,
                self.idf.len()
            )));
        }
        Ok(())
    }

    pub fn tokens(&self, text: &str) -> Vec<String> {
        analyze(&self.config, text)
    }
}

impl Vectorizer for TfidfVectorizer {
    fn kind(&self) -> &str {
        "TfidfVectorizer"
    }

    fn dimension(&self) -> usize {
        self.idf.len()
    }

    fn vectorize(&self, text: &str) -> FeatureVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in analyze(&self.config, text) {
            if let Some(&column) = self.vocabulary.get(&token) {
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(column, count)| (column, count * self.idf[column]))
            .collect();
        entries.sort_by_key(|(column, _)| *column);

        let norm = entries.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in entries.iter_mut() {
                *value /= norm;
            }
        }

        FeatureVector::new(self.idf.len(), entries)
    }
}

fn analyze(config: &TfidfConfig, text: &str) -> Vec<String> {
    let text = if config.lowercase {
        text.to_lowercase()
    } else {
        text.to_string()
    };
    TOKEN_PATTERN
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|token| match config.stop_words {
            StopWords::English => !is_english_stop_word(token),
            StopWords::None => true,
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec![
            "The senate passed the budget bill",
            "Shocking secret the elites hide",
            "Budget talks continue in the senate",
            "Secret cure they hide from you",
            "Common word here",
        ]
    }

    #[test]
    fn test_tokenizer_lowercases_and_drops_stop_words() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let tokens = vectorizer.tokens("The SENATE and a Budget, x y z 42!");
        assert_eq!(tokens, vec!["senate", "budget", "42"]);
    }

    #[test]
    fn test_vocabulary_is_sorted_and_closed() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let budget = vectorizer.column("budget").unwrap();
        let senate = vectorizer.column("senate").unwrap();
        assert!(budget < senate);
        assert!(vectorizer.column("the").is_none());

        let unseen = vectorizer.vectorize("zebra quantum xylophone");
        assert!(unseen.is_empty());
        assert_eq!(unseen.dimension(), vectorizer.dimension());
    }

    #[test]
    fn test_max_df_prunes_frequent_terms() {
        let docs = vec!["alpha beta", "alpha gamma", "alpha delta", "epsilon zeta"];
        let vectorizer = TfidfVectorizer::fit(&docs, TfidfConfig::default()).unwrap();
        // alpha appears in 3/4 = 0.75 > 0.7
        assert!(vectorizer.column("alpha").is_none());
        assert!(vectorizer.column("beta").is_some());
        assert_eq!(vectorizer.pruned_terms(), 1);
    }

    #[test]
    fn test_vectors_are_l2_normalized_and_weighted() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let vector = vectorizer.vectorize("budget budget secret");
        assert!((vector.squared_norm() - 1.0).abs() < 1e-12);

        let budget = vectorizer.column("budget").unwrap();
        let secret = vectorizer.column("secret").unwrap();
        let weight = |column: usize| {
            vector
                .entries()
                .iter()
                .find(|(c, _)| *c == column)
                .map(|(_, v)| *v)
                .unwrap()
        };
        // both terms have df = 2, so the doubled count dominates
        assert!((weight(budget) / weight(secret) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_vectorize_is_bit_identical() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let text = " Shocking budget secret in the senate, secret budget";
        let first = vectorizer.vectorize(text);
        let second = vectorizer.vectorize(text);
        assert_eq!(first.entries().len(), second.entries().len());
        for (a, b) in first.entries().iter().zip(second.entries()) {
            assert_eq!(a.0, b.0);
            assert_eq!(a.1.to_bits(), b.1.to_bits());
        }
    }

    #[test]
    fn test_fit_rejects_empty_corpus() {
        let docs: Vec<String> = Vec::new();
        assert!(TfidfVectorizer::fit(&docs, TfidfConfig::default()).is_err());
    }

    #[test]
    fn test_artifact_round_trip_keeps_transform() {
        let vectorizer = TfidfVectorizer::fit(&corpus(), TfidfConfig::default()).unwrap();
        let json = serde_json::to_string(&vectorizer).unwrap();
        let restored: TfidfVectorizer = serde_json::from_str(&json).unwrap();
        restored.validate().unwrap();
        assert_eq!(
            restored.vectorize("senate secret"),
            vectorizer.vectorize("senate secret")
        );
    }
}
