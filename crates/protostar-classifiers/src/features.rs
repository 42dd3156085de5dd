//! Feature sources and the assembler that joins them into one row

use protostar_core::{FeatureRow, Result};
use std::collections::HashSet;

/// A scorer that turns text into a single feature row with a fixed schema
pub trait FeatureSource: Send + Sync {
    /// Source name, used in logs
    fn name(&self) -> &str;

    /// Column names every extracted row will carry, in order
    fn schema(&self) -> Vec<String>;

    /// Extract the feature row for `text`
    fn extract(&self, text: &str) -> Result<FeatureRow>;
}

/// Suffix given to a colliding column from the accumulated (left) row
pub const LEFT_SUFFIX: &str = "_x";
/// Suffix given to a colliding column from the incoming (right) row
pub const RIGHT_SUFFIX: &str = "_y";

/// Joins the sentiment, lexicon and TF-IDF rows into the classifier input.
///
/// Each source is merged exactly once, in that order. When a column name is
/// present on both sides of a merge, both copies are kept and suffixed with
/// `_x` (left) and `_y` (right).
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureAssembler;

impl FeatureAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the three source rows into one wide row
    pub fn assemble(&self, sentiment: FeatureRow, lexicon: FeatureRow, tfidf: FeatureRow) -> FeatureRow {
        let row = merge(sentiment, lexicon);
        merge(row, tfidf)
    }

    /// Column names the assembled row will have for the given source schemas
    pub fn schema(&self, sentiment: &[String], lexicon: &[String], tfidf: &[String]) -> Vec<String> {
        let zeros = |names: &[String]| {
            let mut row = FeatureRow::with_capacity(names.len());
            for name in names {
                row.push(name.clone(), 0.0);
            }
            row
        };
        self.assemble(zeros(sentiment), zeros(lexicon), zeros(tfidf))
            .columns()
            .to_vec()
    }
}

/// Merge two single-record rows side by side
pub fn merge(mut left: FeatureRow, mut right: FeatureRow) -> FeatureRow {
    let left_names: HashSet<&str> = left.columns().iter().map(String::as_str).collect();
    let overlap: HashSet<String> = right
        .columns()
        .iter()
        .filter(|c| left_names.contains(c.as_str()))
        .cloned()
        .collect();

    if !overlap.is_empty() {
        suffix_columns(&mut left, &overlap, LEFT_SUFFIX);
        suffix_columns(&mut right, &overlap, RIGHT_SUFFIX);
    }

    left.extend(right);
    left
}

fn suffix_columns(row: &mut FeatureRow, names: &HashSet<String>, suffix: &str) {
    let targets: Vec<(usize, String)> = row
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, c)| names.contains(*c))
        .map(|(i, c)| (i, format!("{c}{suffix}")))
        .collect();
    for (idx, name) in targets {
        row.rename(idx, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, f64)]) -> FeatureRow {
        let mut row = FeatureRow::new();
        for (name, value) in pairs {
            row.push(*name, *value);
        }
        row
    }

    #[test]
    fn test_assemble_keeps_source_order() {
        let assembled = FeatureAssembler::new().assemble(
            row(&[("neg", 0.6), ("compound", -0.5)]),
            row(&[("dumb", 0.5), ("weight", 0.04)]),
            row(&[("are", 0.7), ("you", 0.7)]),
        );
        assert_eq!(
            assembled.columns(),
            &["neg", "compound", "dumb", "weight", "are", "you"]
        );
        assert_eq!(assembled.values(), &[0.6, -0.5, 0.5, 0.04, 0.7, 0.7]);
    }

    #[test]
    fn test_each_source_merged_once() {
        let assembled = FeatureAssembler::new().assemble(
            row(&[("neg", 0.0)]),
            row(&[("dumb", 0.5), ("weight", 0.1)]),
            row(&[]),
        );
        assert_eq!(assembled.len(), 3);
    }

    #[test]
    fn test_collisions_are_suffixed() {
        let assembled = FeatureAssembler::new().assemble(
            row(&[("neg", 0.1)]),
            row(&[("dumb", 0.5), ("weight", 0.04)]),
            row(&[("dumb", 0.9), ("you", 0.4)]),
        );
        assert_eq!(
            assembled.columns(),
            &["neg", "dumb_x", "weight", "dumb_y", "you"]
        );
        assert_eq!(assembled.get("dumb_x"), Some(0.5));
        assert_eq!(assembled.get("dumb_y"), Some(0.9));
    }

    #[test]
    fn test_schema_matches_assembled_columns() {
        let assembler = FeatureAssembler::new();
        let names = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let schema = assembler.schema(
            &names(&["neg"]),
            &names(&["dumb", "weight"]),
            &names(&["dumb", "you"]),
        );
        assert_eq!(schema, names(&["neg", "dumb_x", "weight", "dumb_y", "you"]));
    }
}
