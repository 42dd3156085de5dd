//! Scoring pipeline tests
//!
//! Uses a stub model with a fixed probability pair so that the feature
//! plumbing can be checked independently of any trained artifact.

use protostar_classifiers::{
    check_schema, HateModel, Lexicon, LexiconScorer, ScoringConfig, ScoringPipeline,
    SentimentScorer, TfidfScorer, Vocabulary, VocabularyArtifact,
};
use protostar_core::{Error, FeatureRow, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A model returning a fixed probability pair for any well-formed row
struct StubModel {
    features: Vec<String>,
    proba: [f64; 2],
    calls: AtomicU32,
}

impl StubModel {
    fn new(features: Vec<String>, proba: [f64; 2]) -> Self {
        Self {
            features,
            proba,
            calls: AtomicU32::new(0),
        }
    }
}

impl HateModel for StubModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<[f64; 2]> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        check_schema(&self.features, row.columns())?;
        Ok(self.proba)
    }
}

fn vocabulary() -> Arc<Vocabulary> {
    let terms = ["are", "are dumb", "dumb", "hello", "you", "you are"];
    let artifact = VocabularyArtifact {
        vocabulary: terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect(),
        idf: None,
    };
    Arc::new(Vocabulary::from_artifact(artifact).unwrap())
}

fn parts() -> (Arc<SentimentScorer>, Arc<LexiconScorer>, Arc<TfidfScorer>) {
    (
        Arc::new(SentimentScorer::new()),
        Arc::new(LexiconScorer::new(Arc::new(Lexicon::builtin())).unwrap()),
        Arc::new(TfidfScorer::new(vocabulary()).unwrap()),
    )
}

/// Pipeline whose stub model accepts exactly the assembled schema
fn pipeline_with(proba: [f64; 2]) -> (ScoringPipeline, Arc<StubModel>) {
    let (sentiment, lexicon, tfidf) = parts();
    let schema_source = ScoringPipeline::new(
        sentiment.clone(),
        lexicon.clone(),
        tfidf.clone(),
        Arc::new(StubModel::new(vec![], proba)),
    );
    let model = Arc::new(StubModel::new(schema_source.schema(), proba));
    let pipeline = ScoringPipeline::new(sentiment, lexicon, tfidf, model.clone());
    (pipeline, model)
}

#[test]
fn test_you_are_dumb_end_to_end() {
    let (pipeline, model) = pipeline_with([0.2, 0.8]);

    let row = pipeline.features("you are dumb").unwrap();
    assert_eq!(row.get("dumb_x"), Some(0.5));
    let weight = row.get("weight").unwrap();
    assert!((weight - 0.5 / 12.0).abs() < 1e-12);
    assert!(row.get("compound").unwrap() < 0.0);

    let assessment = pipeline.score("you are dumb").unwrap();
    assert_eq!(assessment.hate_score, 80.0);
    assert_eq!(assessment.probability, 0.8);
    assert_eq!(assessment.label, "hateful");
    assert_eq!(assessment.flagged_terms, vec![("dumb".to_string(), 0.5)]);
    assert_eq!(model.calls.load(Ordering::Relaxed), 1);
}

#[test]
fn test_schema_layout() {
    let (pipeline, _) = pipeline_with([0.5, 0.5]);
    let schema = pipeline.schema();

    assert_eq!(&schema[..4], &["neg", "neu", "pos", "compound"]);
    let lexicon_len = Lexicon::builtin().len();
    assert_eq!(schema[4 + lexicon_len], "weight");
    // "dumb" is both a lexicon term and a vocabulary term
    assert!(schema.contains(&"dumb_x".to_string()));
    assert!(schema.contains(&"dumb_y".to_string()));
    assert!(!schema.contains(&"dumb".to_string()));
    assert_eq!(schema.len(), 4 + lexicon_len + 1 + vocabulary().len());
    assert!(pipeline.validate().is_ok());
}

#[test]
fn test_schema_is_stable_across_inputs() {
    let (pipeline, _) = pipeline_with([0.5, 0.5]);
    let texts = [
        "",
        "hello",
        "you are dumb",
        "Kill the boer!!! KILL",
        "a perfectly pleasant afternoon by the river",
    ];
    let expected = pipeline.schema();
    for text in texts {
        let row = pipeline.features(text).unwrap();
        assert_eq!(row.columns(), expected.as_slice(), "schema drift for {text:?}");
    }
}

#[test]
fn test_scoring_is_idempotent() {
    let (pipeline, _) = pipeline_with([0.9, 0.1]);
    let first = pipeline.features("you are a stupid moron").unwrap();
    let second = pipeline.features("you are a stupid moron").unwrap();
    assert_eq!(first, second);

    let a = pipeline.score("you are a stupid moron").unwrap();
    let b = pipeline.score("you are a stupid moron").unwrap();
    assert_eq!(a.probability, b.probability);
    assert_eq!(a.label, "clean");
}

#[test]
fn test_empty_text_scores_without_error() {
    let (pipeline, _) = pipeline_with([0.7, 0.3]);
    let row = pipeline.features("").unwrap();
    assert_eq!(row.get("weight"), Some(0.0));
    assert!(pipeline.score("").is_ok());
}

#[test]
fn test_schema_mismatch_is_reported() {
    let (sentiment, lexicon, tfidf) = parts();
    let model = Arc::new(StubModel::new(
        vec!["neg".to_string(), "neu".to_string()],
        [0.5, 0.5],
    ));
    let pipeline = ScoringPipeline::new(sentiment, lexicon, tfidf, model);

    assert!(pipeline.validate().unwrap_err().is_feature_mismatch());
    assert!(pipeline.score("hello").unwrap_err().is_feature_mismatch());
}

#[test]
fn test_invalid_probabilities_are_rejected() {
    let (pipeline, _) = pipeline_with([0.5, 1.5]);
    let err = pipeline.score("hello").unwrap_err();
    assert!(matches!(err, Error::Classifier(_)));
}

#[test]
fn test_pipeline_from_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let vocab_path = dir.path().join("tfidf_vocab.json");
    let model_path = dir.path().join("model.json");

    std::fs::write(
        &vocab_path,
        r#"{"vocabulary": {"hello": 0, "you": 1, "you are": 2}, "idf": [1.2, 1.0, 2.5]}"#,
    )
    .unwrap();

    // Derive the trained schema the same way the service will
    let config = ScoringConfig {
        model_path: model_path.clone(),
        vocabulary_path: vocab_path.clone(),
        ..ScoringConfig::default()
    };
    let vocabulary = Arc::new(Vocabulary::from_file(&vocab_path).unwrap());
    let (sentiment, lexicon, _) = parts();
    let schema_source = ScoringPipeline::new(
        sentiment,
        lexicon,
        Arc::new(TfidfScorer::new(vocabulary).unwrap()),
        Arc::new(StubModel::new(vec![], [0.5, 0.5])),
    );
    let features = schema_source.schema();
    let model = serde_json::json!({
        "features": features,
        "coefficients": vec![0.0; features.len()],
        "intercept": 4f64.ln(),
    });
    std::fs::write(&model_path, model.to_string()).unwrap();

    let pipeline = ScoringPipeline::from_config(&config).unwrap();
    let assessment = pipeline.score("hello you").unwrap();
    assert_eq!(assessment.hate_score, 80.0);
    assert_eq!(assessment.label, "hateful");

    // A model trained on a different schema is fatal at load time
    let stale = serde_json::json!({
        "features": ["neg", "neu"],
        "coefficients": [0.0, 0.0],
        "intercept": 0.0,
    });
    std::fs::write(&model_path, stale.to_string()).unwrap();
    let err = ScoringPipeline::from_config(&config).err().unwrap();
    assert!(err.is_feature_mismatch());

    // Missing artifacts are fatal too
    let missing = ScoringConfig {
        vocabulary_path: dir.path().join("nope.json"),
        ..config
    };
    let err = ScoringPipeline::from_config(&missing).err().unwrap();
    assert!(matches!(err, Error::Artifact { .. }));
}
