//! Core types for Protostar

use serde::{Deserialize, Serialize};

/// A single record of named feature values, in column order.
///
/// The classifier consumes rows positionally, so column order is part of the
/// contract with the trained model artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `capacity` columns
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            columns: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append a column
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.columns.push(name.into());
        self.values.push(value);
    }

    /// Look up a column value by name (first match)
    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.values[idx])
    }

    /// True if a column with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Column values in order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Iterate over `(name, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Rename the column at `idx`
    pub fn rename(&mut self, idx: usize, name: impl Into<String>) {
        if let Some(column) = self.columns.get_mut(idx) {
            *column = name.into();
        }
    }

    /// Append every column of `other`, consuming it
    pub fn extend(&mut self, other: FeatureRow) {
        self.columns.extend(other.columns);
        self.values.extend(other.values);
    }
}

/// Rescale a probability to the 0-100 display scale, rounded to 4 decimals
pub fn display_score(probability: f64) -> f64 {
    (probability * 100.0 * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_row_keeps_order() {
        let mut row = FeatureRow::new();
        row.push("neg", 0.5);
        row.push("dumb", 0.5);
        row.push("weight", 0.04);

        assert_eq!(row.columns(), &["neg", "dumb", "weight"]);
        assert_eq!(row.values(), &[0.5, 0.5, 0.04]);
        assert_eq!(row.get("weight"), Some(0.04));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_rename_and_extend() {
        let mut left = FeatureRow::new();
        left.push("a", 1.0);
        let mut right = FeatureRow::new();
        right.push("b", 2.0);

        left.extend(right);
        left.rename(0, "a_x");

        assert_eq!(left.len(), 2);
        assert!(left.contains("a_x"));
        assert!(!left.contains("a"));
    }

    #[test]
    fn test_display_score() {
        assert_eq!(display_score(0.8), 80.0);
        assert_eq!(display_score(0.123456789), 12.3457);
        assert_eq!(display_score(0.0), 0.0);
    }
}
