//! Protostar Classifiers
//!
//! Hate-speech scoring for user posts. Three independent feature sources
//! feed a pre-trained classifier:
//! - Lexicon: weighted counts of known hateful/offensive terms
//! - Sentiment: VADER polarity scores
//! - TF-IDF: n-gram weights over a persisted vocabulary
//!
//! The assembled row's column order is a contract with the trained model and
//! is checked once when the pipeline is built.

pub mod config;
pub mod features;
pub mod lexicon;
pub mod model;
pub mod pipeline;
pub mod sentiment;
pub mod tfidf;

pub use config::{LexiconConfig, ScoringConfig, TfidfConfig};
pub use features::{FeatureAssembler, FeatureSource};
pub use lexicon::{Lexicon, LexiconEntry, LexiconScorer};
pub use model::{check_schema, HateModel, LogisticModel};
pub use pipeline::{HateAssessment, ScoringPipeline};
pub use sentiment::{PolarityScores, SentimentScorer};
pub use tfidf::{TfidfScorer, Vocabulary, VocabularyArtifact};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::features::FeatureSource;
    pub use crate::model::HateModel;
    pub use crate::pipeline::{HateAssessment, ScoringPipeline};
}
