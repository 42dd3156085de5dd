//! End-to-end hate scoring pipeline
//!
//! text -> (sentiment, lexicon, tf-idf) -> assembled row -> classifier.
//! All artifacts are loaded once and shared read-only, so a pipeline can be
//! wrapped in an `Arc` and used from any number of request handlers.

use crate::config::ScoringConfig;
use crate::features::{FeatureAssembler, FeatureSource};
use crate::lexicon::{Lexicon, LexiconScorer, WEIGHT_COLUMN};
use crate::model::{check_schema, HateModel, LogisticModel};
use crate::sentiment::SentimentScorer;
use crate::tfidf::{TfidfScorer, Vocabulary};
use protostar_core::{display_score, Error, FeatureRow, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub const HATEFUL: &str = "hateful";
pub const CLEAN: &str = "clean";

/// Outcome of scoring one text
#[derive(Debug, Clone, Serialize)]
pub struct HateAssessment {
    /// Classifier probability of the hateful class, in [0, 1]
    pub probability: f64,

    /// `probability` on the 0-100 display scale, rounded to 4 decimals
    pub hate_score: f64,

    /// `hateful` or `clean`
    pub label: &'static str,

    /// Lexicon terms that scored, with their weighted value
    pub flagged_terms: Vec<(String, f64)>,

    /// Scoring latency in microseconds
    pub latency_us: u64,
}

/// Scores text for hateful content
pub struct ScoringPipeline {
    sentiment: Arc<SentimentScorer>,
    lexicon: Arc<LexiconScorer>,
    tfidf: Arc<TfidfScorer>,
    assembler: FeatureAssembler,
    model: Arc<dyn HateModel>,
    threshold: f64,
}

impl ScoringPipeline {
    /// Assemble a pipeline from already-built parts
    pub fn new(
        sentiment: Arc<SentimentScorer>,
        lexicon: Arc<LexiconScorer>,
        tfidf: Arc<TfidfScorer>,
        model: Arc<dyn HateModel>,
    ) -> Self {
        Self {
            sentiment,
            lexicon,
            tfidf,
            assembler: FeatureAssembler::new(),
            model,
            threshold: 0.5,
        }
    }

    /// Set the probability at or above which text is labelled hateful
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Load every artifact named by `config` and check the model schema.
    ///
    /// Any missing artifact or schema mismatch is returned as an error; the
    /// service treats that as fatal at startup.
    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        config.validate()?;

        let lexicon = match &config.lexicon.path {
            Some(path) => {
                info!("Loading lexicon from: {}", path.display());
                Lexicon::from_file(path)?
            }
            None => Lexicon::builtin(),
        };
        let lexicon = Arc::new(lexicon);
        let lexicon = if config.lexicon.match_phrases {
            LexiconScorer::with_phrase_matching(lexicon)?
        } else {
            LexiconScorer::new(lexicon)?
        };

        let sentiment = SentimentScorer::new();

        let vocabulary = Arc::new(Vocabulary::from_file(&config.vocabulary_path)?);
        let tfidf = TfidfScorer::with_ngram_range(
            vocabulary,
            (config.tfidf.ngram_min, config.tfidf.ngram_max),
        )?;

        let model = LogisticModel::from_file(&config.model_path)?;

        let pipeline = Self::new(
            Arc::new(sentiment),
            Arc::new(lexicon),
            Arc::new(tfidf),
            Arc::new(model),
        )
        .with_threshold(config.threshold);

        pipeline.validate()?;
        info!(
            "Scoring pipeline ready: {} lexicon terms, {} vocabulary terms, {} features",
            pipeline.lexicon.lexicon().len(),
            pipeline.tfidf.vocabulary().len(),
            pipeline.model.feature_names().len()
        );
        Ok(pipeline)
    }

    /// Column names of every assembled row, in order
    pub fn schema(&self) -> Vec<String> {
        self.assembler.schema(
            &self.sentiment.schema(),
            &self.lexicon.schema(),
            &self.tfidf.schema(),
        )
    }

    /// Check the assembled schema against the model's trained features
    pub fn validate(&self) -> Result<()> {
        check_schema(self.model.feature_names(), &self.schema())
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Assemble the feature row for `text`
    pub fn features(&self, text: &str) -> Result<FeatureRow> {
        self.extract(text).map(|(row, _)| row)
    }

    fn extract(&self, text: &str) -> Result<(FeatureRow, Vec<(String, f64)>)> {
        let sentiment = self.sentiment.extract(text)?;
        let lexicon = self.lexicon.extract(text)?;
        let tfidf = self.tfidf.extract(text)?;

        let flagged = lexicon
            .iter()
            .filter(|(name, value)| *name != WEIGHT_COLUMN && *value > 0.0)
            .map(|(name, value)| (name.to_string(), value))
            .collect();

        Ok((self.assembler.assemble(sentiment, lexicon, tfidf), flagged))
    }

    /// `[P(not hateful), P(hateful)]` for `text`
    pub fn predict_proba(&self, text: &str) -> Result<[f64; 2]> {
        let row = self.features(text)?;
        self.predict_row(&row)
    }

    fn predict_row(&self, row: &FeatureRow) -> Result<[f64; 2]> {
        let proba = self.model.predict_proba(row)?;
        if proba.iter().any(|p| !p.is_finite() || !(0.0..=1.0).contains(p)) {
            return Err(Error::classifier(format!(
                "model returned invalid probabilities {proba:?}"
            )));
        }
        Ok(proba)
    }

    /// Score `text` end to end
    pub fn score(&self, text: &str) -> Result<HateAssessment> {
        let start = Instant::now();

        let (row, flagged_terms) = self.extract(text)?;
        let [_, probability] = self.predict_row(&row)?;
        let label = if probability >= self.threshold {
            HATEFUL
        } else {
            CLEAN
        };

        let latency_us = start.elapsed().as_micros() as u64;
        debug!(
            probability,
            label,
            flagged = flagged_terms.len(),
            latency_us,
            "Scored text"
        );

        Ok(HateAssessment {
            probability,
            hate_score: display_score(probability),
            label,
            flagged_terms,
            latency_us,
        })
    }
}
