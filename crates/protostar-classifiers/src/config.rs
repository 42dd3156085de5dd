//! Configuration for the scoring pipeline and its artifacts

use protostar_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scoring pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Serialized classifier artifact
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Serialized TF-IDF vocabulary artifact
    #[serde(default = "default_vocabulary_path")]
    pub vocabulary_path: PathBuf,

    /// Probability at or above which text is labelled hateful
    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default)]
    pub lexicon: LexiconConfig,

    #[serde(default)]
    pub tfidf: TfidfConfig,
}

/// Lexicon scorer options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexiconConfig {
    /// Replacement lexicon file; the built-in lexicon is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Match multi-word lexicon keys as phrases.
    ///
    /// Off by default: the shipped model was trained with those columns
    /// always zero.
    #[serde(default)]
    pub match_phrases: bool,
}

/// TF-IDF scorer options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfConfig {
    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
            vocabulary_path: default_vocabulary_path(),
            threshold: default_threshold(),
            lexicon: LexiconConfig::default(),
            tfidf: TfidfConfig::default(),
        }
    }
}

impl ScoringConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(Error::config(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            )));
        }
        if self.tfidf.ngram_min == 0 || self.tfidf.ngram_min > self.tfidf.ngram_max {
            return Err(Error::config(format!(
                "invalid tfidf n-gram range ({}, {})",
                self.tfidf.ngram_min, self.tfidf.ngram_max
            )));
        }
        Ok(())
    }
}

fn default_model_path() -> PathBuf {
    PathBuf::from("protostar/model.json")
}

fn default_vocabulary_path() -> PathBuf {
    PathBuf::from("protostar/tfidf_vocab.json")
}

fn default_threshold() -> f64 {
    0.5
}

fn default_ngram_min() -> usize {
    1
}

fn default_ngram_max() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: ScoringConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.model_path, PathBuf::from("protostar/model.json"));
        assert_eq!(config.threshold, 0.5);
        assert_eq!((config.tfidf.ngram_min, config.tfidf.ngram_max), (1, 4));
        assert!(!config.lexicon.match_phrases);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
model_path: artifacts/model.json
threshold: 0.7
lexicon:
  match_phrases: true
tfidf:
  ngram_max: 2
"#;
        let config: ScoringConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.model_path, PathBuf::from("artifacts/model.json"));
        assert_eq!(config.threshold, 0.7);
        assert!(config.lexicon.match_phrases);
        assert_eq!(config.tfidf.ngram_max, 2);
    }

    #[test]
    fn test_validate_rejects_bad_ranges() {
        let mut config = ScoringConfig::default();
        config.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = ScoringConfig::default();
        config.tfidf.ngram_min = 3;
        config.tfidf.ngram_max = 2;
        assert!(config.validate().is_err());
    }
}
