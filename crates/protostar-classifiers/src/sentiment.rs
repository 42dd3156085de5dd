//! VADER polarity scorer
//!
//! Produces the four valence scores (`neg`, `neu`, `pos`, `compound`) with
//! the reference VADER analyzer and its full bundled lexicon. The scores are
//! passed through unmodified: the classifier was trained on them as-is.

use crate::features::FeatureSource;
use protostar_core::{FeatureRow, Result};
use serde::Serialize;
use vader_sentiment::SentimentIntensityAnalyzer;

/// Column names, in output order
pub const SENTIMENT_COLUMNS: [&str; 4] = ["neg", "neu", "pos", "compound"];

/// The four polarity scores for one text
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

impl PolarityScores {
    /// Convert into a feature row with the fixed column order
    pub fn to_row(&self) -> FeatureRow {
        let mut row = FeatureRow::with_capacity(SENTIMENT_COLUMNS.len());
        row.push(SENTIMENT_COLUMNS[0], self.neg);
        row.push(SENTIMENT_COLUMNS[1], self.neu);
        row.push(SENTIMENT_COLUMNS[2], self.pos);
        row.push(SENTIMENT_COLUMNS[3], self.compound);
        row
    }
}

/// Stateless polarity scorer, built once and shared read-only
pub struct SentimentScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Compute polarity scores for `text`
    pub fn polarity_scores(&self, text: &str) -> PolarityScores {
        let scores = self.analyzer.polarity_scores(text);
        let get = |key: &str| scores.get(key).copied().unwrap_or(0.0);

        PolarityScores {
            neg: get("neg"),
            neu: get("neu"),
            pos: get("pos"),
            compound: get("compound"),
        }
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureSource for SentimentScorer {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn schema(&self) -> Vec<String> {
        SENTIMENT_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn extract(&self, text: &str) -> Result<FeatureRow> {
        Ok(self.polarity_scores(text).to_row())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_reference_positive_sentence() {
        let scores = SentimentScorer::new().polarity_scores("VADER is smart, handsome, and funny.");
        assert_close(scores.neg, 0.0);
        assert_close(scores.neu, 0.254);
        assert_close(scores.pos, 0.746);
        assert_close(scores.compound, 0.8316);
    }

    #[test]
    fn test_reference_booster_sentence() {
        let scores = SentimentScorer::new().polarity_scores("A really bad, horrible book.");
        assert_close(scores.neg, 0.791);
        assert_close(scores.pos, 0.0);
        assert_close(scores.compound, -0.8211);
    }

    #[test]
    fn test_reference_single_rated_word() {
        let scores = SentimentScorer::new().polarity_scores("The book was good.");
        assert_close(scores.compound, 0.4404);
        assert_eq!(scores.neg, 0.0);
    }

    #[test]
    fn test_charged_words_are_rated() {
        let scores = SentimentScorer::new().polarity_scores("such a hateful, vile, repulsive person");
        assert!(scores.compound < -0.5, "compound {}", scores.compound);
        assert!(scores.neg > scores.pos);

        let scores = SentimentScorer::new().polarity_scores("you are dumb");
        assert!(scores.compound < 0.0);
    }

    #[test]
    fn test_neutral_text() {
        let scores = SentimentScorer::new().polarity_scores("the train leaves at noon");
        assert_eq!(scores.compound, 0.0);
        assert_eq!(scores.neg, 0.0);
        assert_eq!(scores.pos, 0.0);
    }

    #[test]
    fn test_empty_text() {
        let scores = SentimentScorer::new().polarity_scores("");
        assert_eq!(scores.compound, 0.0);
        assert_eq!(scores.neg, 0.0);
        assert_eq!(scores.pos, 0.0);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let scorer = SentimentScorer::new();
        assert!(scorer.polarity_scores("this is good").compound > 0.0);
        assert!(scorer.polarity_scores("this is not good").compound < 0.0);
    }

    #[test]
    fn test_row_columns() {
        let row = SentimentScorer::new().extract("fine").unwrap();
        assert_eq!(row.columns(), &["neg", "neu", "pos", "compound"]);
    }
}
