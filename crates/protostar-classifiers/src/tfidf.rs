//! TF-IDF scorer over a fixed, persisted n-gram vocabulary
//!
//! The vocabulary artifact is loaded once and shared. Inverse document
//! frequencies are read from the artifact and only ever applied; they are
//! never fit on the text being scored.

use crate::features::FeatureSource;
use protostar_core::{Error, FeatureRow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// On-disk vocabulary format: term -> column index, plus optional IDF weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyArtifact {
    pub vocabulary: HashMap<String, usize>,
    #[serde(default)]
    pub idf: Option<Vec<f64>>,
}

/// Immutable ordered n-gram vocabulary with per-term IDF weights
#[derive(Debug, Clone)]
pub struct Vocabulary {
    terms: Vec<String>,
    index: HashMap<String, usize>,
    idf: Vec<f64>,
    max_ngram: usize,
}

impl Vocabulary {
    /// Build from an artifact, checking that indices are exactly `0..n`.
    ///
    /// Without persisted IDF weights every term gets weight 1, which gives
    /// the same row as an IDF fit on the single scored document.
    pub fn from_artifact(artifact: VocabularyArtifact) -> Result<Self> {
        let size = artifact.vocabulary.len();
        let mut slots: Vec<Option<String>> = vec![None; size];
        for (term, idx) in artifact.vocabulary {
            let slot = slots.get_mut(idx).ok_or_else(|| {
                Error::config(format!("vocabulary index {idx} out of range for {size} terms"))
            })?;
            if slot.is_some() {
                return Err(Error::config(format!("vocabulary index {idx} is used twice")));
            }
            *slot = Some(term);
        }
        let terms: Vec<String> = slots.into_iter().flatten().collect();

        let idf = match artifact.idf {
            Some(idf) if idf.len() != size => {
                return Err(Error::config(format!(
                    "vocabulary has {size} terms but {} idf weights",
                    idf.len()
                )))
            }
            Some(idf) => idf,
            None => vec![1.0; size],
        };

        let max_ngram = terms
            .iter()
            .map(|t| t.split(' ').count())
            .max()
            .unwrap_or(1);
        let index = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        Ok(Self {
            terms,
            index,
            idf,
            max_ngram,
        })
    }

    /// Load the JSON vocabulary artifact from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::artifact(path, e))?;
        let artifact: VocabularyArtifact =
            serde_json::from_str(&content).map_err(|e| Error::artifact(path, e))?;
        let vocabulary = Self::from_artifact(artifact).map_err(|e| Error::artifact(path, e))?;
        info!(
            "Loaded vocabulary of {} terms from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Terms in column order
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Longest n-gram present in the vocabulary
    pub fn max_ngram(&self) -> usize {
        self.max_ngram
    }

    fn position(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }
}

/// Vectorizes a single text against a shared [`Vocabulary`]
pub struct TfidfScorer {
    vocabulary: Arc<Vocabulary>,
    token_pattern: Regex,
    ngram_range: (usize, usize),
}

impl TfidfScorer {
    /// Create a scorer counting 1- to 4-grams
    pub fn new(vocabulary: Arc<Vocabulary>) -> Result<Self> {
        Self::with_ngram_range(vocabulary, (1, 4))
    }

    pub fn with_ngram_range(vocabulary: Arc<Vocabulary>, ngram_range: (usize, usize)) -> Result<Self> {
        let (min_n, max_n) = ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(Error::config(format!(
                "invalid n-gram range ({min_n}, {max_n})"
            )));
        }
        let token_pattern = Regex::new(r"\b\w\w+\b").map_err(|e| {
            Error::classifier(format!("Failed to compile tf-idf token pattern: {e}"))
        })?;
        Ok(Self {
            vocabulary,
            token_pattern,
            ngram_range,
        })
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Raw n-gram counts per vocabulary column
    fn term_counts(&self, text: &str) -> Vec<f64> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let mut counts = vec![0.0; self.vocabulary.len()];
        let (min_n, max_n) = self.ngram_range;
        let max_n = max_n.min(self.vocabulary.max_ngram());
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(idx) = self.vocabulary.position(&gram) {
                    counts[idx] += 1.0;
                }
            }
        }
        counts
    }

    /// L2-normalised TF-IDF values in vocabulary order
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut values = self.term_counts(text);
        for (value, idf) in values.iter_mut().zip(self.vocabulary.idf()) {
            *value *= idf;
        }

        let norm = values.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut values {
                *value /= norm;
            }
        }
        values
    }

    /// Score `text` into a row keyed by vocabulary term
    pub fn score(&self, text: &str) -> FeatureRow {
        let values = self.transform(text);
        let mut row = FeatureRow::with_capacity(values.len());
        for (term, value) in self.vocabulary.terms().iter().zip(values) {
            row.push(term.clone(), value);
        }
        row
    }
}

impl FeatureSource for TfidfScorer {
    fn name(&self) -> &str {
        "tfidf"
    }

    fn schema(&self) -> Vec<String> {
        self.vocabulary.terms().to_vec()
    }

    fn extract(&self, text: &str) -> Result<FeatureRow> {
        Ok(self.score(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary(idf: Option<Vec<f64>>) -> Arc<Vocabulary> {
        let terms = ["are", "are dumb", "dumb", "you", "you are dumb"];
        let artifact = VocabularyArtifact {
            vocabulary: terms
                .iter()
                .enumerate()
                .map(|(i, t)| (t.to_string(), i))
                .collect(),
            idf,
        };
        Arc::new(Vocabulary::from_artifact(artifact).unwrap())
    }

    #[test]
    fn test_columns_follow_index_order() {
        let scorer = TfidfScorer::new(vocabulary(None)).unwrap();
        let row = scorer.score("anything");
        assert_eq!(
            row.columns(),
            &["are", "are dumb", "dumb", "you", "you are dumb"]
        );
    }

    #[test]
    fn test_no_vocabulary_terms_is_all_zero() {
        let scorer = TfidfScorer::new(vocabulary(None)).unwrap();
        let row = scorer.score("completely unrelated words here");
        assert!(row.values().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_unit_idf_matches_single_document_fit() {
        let scorer = TfidfScorer::new(vocabulary(None)).unwrap();
        let row = scorer.score("You are DUMB");
        // five matching n-grams, one each, l2-normalised
        let expected = 1.0 / 5f64.sqrt();
        for (_, value) in row.iter() {
            assert!((value - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_persisted_idf_is_applied() {
        let scorer =
            TfidfScorer::new(vocabulary(Some(vec![1.0, 1.0, 3.0, 1.0, 1.0]))).unwrap();
        let row = scorer.score("dumb dumb you");
        let dumb = row.get("dumb").unwrap();
        let you = row.get("you").unwrap();
        // dumb: 2 * 3 = 6, you: 1 * 1 = 1
        assert!((dumb / you - 6.0).abs() < 1e-12);
        let norm: f64 = row.values().iter().map(|v| v * v).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_character_tokens_are_ignored() {
        let scorer = TfidfScorer::new(vocabulary(None)).unwrap();
        // "u" is dropped by the token pattern, so "u are dumb" only yields
        // "are", "are dumb" and "dumb"
        let row = scorer.score("u are dumb");
        assert_eq!(row.get("you"), Some(0.0));
        assert!(row.get("are dumb").unwrap() > 0.0);
    }

    #[test]
    fn test_rejects_bad_artifacts() {
        let gap = VocabularyArtifact {
            vocabulary: [("a".to_string(), 0), ("b".to_string(), 2)].into_iter().collect(),
            idf: None,
        };
        assert!(Vocabulary::from_artifact(gap).is_err());

        let short_idf = VocabularyArtifact {
            vocabulary: [("a".to_string(), 0)].into_iter().collect(),
            idf: Some(vec![]),
        };
        assert!(Vocabulary::from_artifact(short_idf).is_err());

        assert!(TfidfScorer::with_ngram_range(vocabulary(None), (2, 1)).is_err());
    }

    #[test]
    fn test_vocabulary_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tfidf_vocab.json");
        std::fs::write(&path, r#"{"vocabulary": {"hello": 0, "hello world": 1}}"#).unwrap();

        let vocabulary = Vocabulary::from_file(&path).unwrap();
        assert_eq!(vocabulary.len(), 2);
        assert_eq!(vocabulary.max_ngram(), 2);

        std::fs::write(&path, "not json").unwrap();
        let err = Vocabulary::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Artifact { .. }));

        assert!(Vocabulary::from_file(dir.path().join("missing.json")).is_err());
    }
}
