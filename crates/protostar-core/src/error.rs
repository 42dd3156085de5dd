//! Error types for Protostar

/// Result type alias using Protostar's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Protostar operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A model, vocabulary or lexicon artifact is missing or unreadable
    #[error("artifact error ({path}): {reason}")]
    Artifact { path: String, reason: String },

    /// The assembled feature row does not match the classifier's trained schema
    #[error(
        "feature mismatch: expected {expected} columns, got {actual}; \
         first difference at column {position} (expected '{expected_name}', got '{actual_name}')"
    )]
    FeatureMismatch {
        expected: usize,
        actual: usize,
        position: usize,
        expected_name: String,
        actual_name: String,
    },

    /// Classifier execution errors
    #[error("classifier error: {0}")]
    Classifier(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Network/IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new artifact error
    pub fn artifact(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::Artifact {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a new classifier error
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::Classifier(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the error is a schema mismatch between features and model
    pub fn is_feature_mismatch(&self) -> bool {
        matches!(self, Self::FeatureMismatch { .. })
    }
}
