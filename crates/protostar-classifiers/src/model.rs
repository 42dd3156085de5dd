//! Pre-trained hate classifier artifacts
//!
//! The classifier is opaque to the pipeline: anything that can name its
//! trained feature columns and turn a matching row into a probability pair
//! implements [`HateModel`].

use protostar_core::{Error, FeatureRow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// A trained binary classifier over assembled feature rows
pub trait HateModel: Send + Sync {
    /// Feature columns the model was trained on, in order
    fn feature_names(&self) -> &[String];

    /// `[P(not hateful), P(hateful)]` for a row matching `feature_names()`
    fn predict_proba(&self, row: &FeatureRow) -> Result<[f64; 2]>;
}

/// Fail with `FeatureMismatch` unless `actual` equals `expected` exactly
pub fn check_schema(expected: &[String], actual: &[String]) -> Result<()> {
    if expected == actual {
        return Ok(());
    }

    let position = expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .unwrap_or_else(|| expected.len().min(actual.len()));
    let name_at = |names: &[String]| {
        names
            .get(position)
            .cloned()
            .unwrap_or_else(|| "<missing>".to_string())
    };

    Err(Error::FeatureMismatch {
        expected: expected.len(),
        actual: actual.len(),
        position,
        expected_name: name_at(expected),
        actual_name: name_at(actual),
    })
}

/// Logistic regression exported as `{features, coefficients, intercept}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    features: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LogisticModel {
    pub fn new(features: Vec<String>, coefficients: Vec<f64>, intercept: f64) -> Result<Self> {
        let model = Self {
            features,
            coefficients,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.features.len() != self.coefficients.len() {
            return Err(Error::config(format!(
                "model has {} features but {} coefficients",
                self.features.len(),
                self.coefficients.len()
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(Error::config("model contains non-finite parameters"));
        }
        Ok(())
    }

    /// Load a JSON model artifact
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::artifact(path, e))?;
        let model: Self = serde_json::from_str(&content).map_err(|e| Error::artifact(path, e))?;
        model.validate().map_err(|e| Error::artifact(path, e))?;
        info!(
            "Loaded logistic model with {} features from {}",
            model.features.len(),
            path.display()
        );
        Ok(model)
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl HateModel for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<[f64; 2]> {
        check_schema(&self.features, row.columns())?;

        let z = self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.values())
                .map(|(w, x)| w * x)
                .sum::<f64>();
        let p = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - p, p])
    }
}
