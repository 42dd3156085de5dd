//! Protostar Core
//!
//! Core types and error handling shared across Protostar components.
//!
//! This crate provides:
//! - The error type and result alias used by the scoring pipeline and server
//! - `FeatureRow`, the ordered feature vector handed to the classifier
//! - Hate score formatting helpers

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{display_score, FeatureRow};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{display_score, FeatureRow};
}
