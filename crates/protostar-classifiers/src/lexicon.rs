//! Weighted hate-term lexicon scorer
//!
//! Counts occurrences of lexicon terms among the tokens of the lowercased
//! text and emits one `count * weight` column per term, followed by an
//! aggregate `weight` column.
//!
//! Tokens follow Penn Treebank conventions: contractions and possessives
//! (`n't`, `'ll`, `'re`, `'ve`, `'s`, `'m`, `'d`) at the end of a word are
//! split into their own token, so `thug's` counts as `thug`. Apostrophes
//! inside a word (`bhut'sisi`) are kept.

use crate::features::FeatureSource;
use aho_corasick::AhoCorasick;
use protostar_core::{Error, FeatureRow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Name of the aggregate column appended after the per-term columns
pub const WEIGHT_COLUMN: &str = "weight";

/// Built-in lexicon, in column order.
const BUILTIN_TERMS: &[(&str, f64)] = &[
    ("dumb", 0.5),
    ("muthafuckin", 0.4),
    ("muthafucking", 0.4),
    ("motherfucking", 0.4),
    ("motherfucker", 0.4),
    ("motherfuckers", 0.4),
    ("moron", 0.5),
    ("stupid", 0.5),
    ("slaughter", 0.5),
    ("massacre", 0.3),
    ("genocide", 0.4),
    ("criminal", 0.3),
    ("thug", 0.4),
    ("violent", 0.3),
    ("faggot", 0.7),
    ("sissy", 0.7),
    ("fucking", 0.5),
    ("disgusting", 0.6),
    ("baboon", 0.4),
    ("coward", 0.4),
    ("foreigner", 0.3),
    ("outsider", 0.3),
    ("ugly", 0.5),
    ("uncivilised", 0.5),
    ("kaffir", 1.0),
    ("kaffirs", 1.0),
    ("kaffer", 1.0),
    ("kaffers", 1.0),
    ("kafer", 1.0),
    ("kafers", 1.0),
    ("kafir", 1.0),
    ("kafirs", 1.0),
    ("kuli", 0.8),
    ("coolie", 0.7),
    ("hoe", 0.7),
    ("hoes", 0.6),
    ("whore", 0.8),
    ("whores", 0.7),
    ("pig", 0.5),
    ("fake", 0.4),
    ("fong kong", 0.4),
    ("sodomy", 0.4),
    ("whitey", 0.6),
    ("hottentot", 0.6),
    ("chinaman", 0.6),
    ("chink", 0.6),
    ("chinkie", 0.6),
    ("coon", 0.5),
    ("half breed", 0.7),
    ("hairyback", 0.7),
    ("jungle bunny", 0.6),
    ("kraut", 0.5),
    ("goy", 0.5),
    ("shiksa", 0.6),
    ("yid", 0.6),
    ("fag", 0.4),
    ("dyke", 0.6),
    ("hooligan", 0.6),
    ("shithole", 0.6),
    ("slave", 0.3),
    ("bulldyke", 0.7),
    ("muppet", 0.5),
    ("lunatic", 0.5),
    ("shoot", 0.4),
    ("nansy pansy", 0.5),
    ("terrorist", 0.4),
    ("monkey", 0.3),
    ("moffie", 0.7),
    ("redneck", 0.7),
    ("rednecks", 0.7),
    ("kike", 0.7),
    ("kikes", 0.6),
    ("abomination", 0.5),
    ("lawless", 0.4),
    ("amakwerekwere", 0.6),
    ("kwerekwere", 0.6),
    ("ofay", 0.5),
    ("mohammedan", 0.5),
    ("lesbo", 0.5),
    ("barbaric", 0.7),
    ("barbarics", 0.7),
    ("barbarians", 0.8),
    ("barbarian", 0.8),
    ("ape", 0.4),
    ("carpet muncher", 0.7),
    ("rag muncher", 0.7),
    ("bigot", 0.5),
    ("bigots", 0.5),
    ("loot", 0.4),
    ("thieves", 0.2),
    ("steal", 0.4),
    ("dirty", 0.5),
    ("garden boy", 0.6),
    ("trash", 0.6),
    ("garbage", 0.6),
    ("honky", 0.6),
    ("nigger", 0.8),
    ("negro", 0.7),
    ("nigga", 0.6),
    ("niggas", 0.8),
    ("negros", 0.7),
    ("niggers", 0.8),
    ("bastard", 0.6),
    ("bastards", 0.6),
    ("gook", 0.6),
    ("sand nigger", 0.7),
    ("sand nigga", 0.7),
    ("sand niggas", 0.7),
    ("sand niggers", 0.7),
    ("ghetto", 0.5),
    ("ratchet", 0.5),
    ("tranny", 0.7),
    ("thot", 0.6),
    ("cunt", 0.5),
    ("sicko", 0.5),
    ("sickos", 0.5),
    ("coconut", 0.5),
    ("amabujwas", 0.5),
    ("mabujwa", 0.5),
    ("clever blacks", 0.2),
    ("oreo", 0.3),
    ("coloniser", 0.3),
    ("colonialist", 0.3),
    ("colonizer", 0.3),
    ("butthumper", 0.7),
    ("istabane", 0.8),
    ("stabane", 0.8),
    ("sodomite", 0.7),
    ("sodomis", 0.6),
    ("trassie", 0.6),
    ("sisBhuti", 0.7),
    ("bhut'sisi", 0.7),
    ("umanzi", 0.5),
    ("trap", 0.3),
    ("kill the boers", 0.8),
    ("kill the boer", 0.8),
    ("kill te boer", 0.6),
    ("dubula ibhunu", 0.6),
    ("shoot the boer", 0.7),
    ("kill", 0.5),
];

/// A single lexicon term and its severity weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub term: String,
    pub weight: f64,
}

/// Immutable, ordered mapping from term to severity weight
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
}

impl Lexicon {
    /// Build a lexicon from ordered entries.
    ///
    /// Terms must be unique, non-blank and carry a positive weight.
    pub fn new(entries: Vec<LexiconEntry>) -> Result<Self> {
        let mut seen = std::collections::HashSet::with_capacity(entries.len());
        for entry in &entries {
            if entry.term.trim().is_empty() {
                return Err(Error::config("lexicon contains a blank term"));
            }
            if !(entry.weight.is_finite() && entry.weight > 0.0) {
                return Err(Error::config(format!(
                    "lexicon term '{}' has non-positive weight {}",
                    entry.term, entry.weight
                )));
            }
            if !seen.insert(entry.term.as_str()) {
                return Err(Error::config(format!(
                    "lexicon term '{}' is listed twice",
                    entry.term
                )));
            }
        }
        Ok(Self { entries })
    }

    /// The lexicon the shipped classifier was trained against
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_TERMS
                .iter()
                .map(|(term, weight)| LexiconEntry {
                    term: (*term).to_string(),
                    weight: *weight,
                })
                .collect(),
        }
    }

    /// Load a lexicon from a YAML (or JSON) list of `{term, weight}` entries
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::artifact(path, e))?;
        let entries: Vec<LexiconEntry> =
            serde_yaml::from_str(&content).map_err(|e| Error::artifact(path, e))?;
        Self::new(entries)
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Weight of a term, by its exact key
    pub fn weight(&self, term: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.term == term)
            .map(|e| e.weight)
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Scores text against a [`Lexicon`].
///
/// Matching is done on lowercased tokens. Multi-word keys only ever match
/// when phrase matching is enabled; otherwise a token can never contain a
/// space and those columns stay at zero, which is what the shipped model was
/// trained on.
pub struct LexiconScorer {
    lexicon: Arc<Lexicon>,
    token_pattern: Regex,
    /// Lowercased key -> entry indices
    by_token: HashMap<String, Vec<usize>>,
    /// Automaton over multi-word keys plus pattern -> entry index
    phrases: Option<(AhoCorasick, Vec<usize>)>,
}

impl LexiconScorer {
    /// Create a scorer with single-token matching only
    pub fn new(lexicon: Arc<Lexicon>) -> Result<Self> {
        Self::build(lexicon, false)
    }

    /// Create a scorer that also matches multi-word keys on token boundaries
    pub fn with_phrase_matching(lexicon: Arc<Lexicon>) -> Result<Self> {
        Self::build(lexicon, true)
    }

    fn build(lexicon: Arc<Lexicon>, match_phrases: bool) -> Result<Self> {
        let token_pattern = Regex::new(r"\w+(?:'\w+)*").map_err(|e| {
            Error::classifier(format!("Failed to compile lexicon token pattern: {e}"))
        })?;

        let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();
        let mut phrase_keys = Vec::new();
        let mut phrase_ids = Vec::new();

        for (idx, entry) in lexicon.entries().iter().enumerate() {
            let key = entry.term.to_lowercase();
            let normalized = key.split_whitespace().collect::<Vec<_>>().join(" ");
            if match_phrases && normalized.contains(' ') {
                phrase_keys.push(normalized);
                phrase_ids.push(idx);
            } else {
                by_token.entry(key).or_default().push(idx);
            }
        }

        let phrases = if phrase_keys.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::new(&phrase_keys).map_err(|e| {
                Error::classifier(format!("Failed to build lexicon phrase matcher: {e}"))
            })?;
            Some((automaton, phrase_ids))
        };

        debug!(
            terms = lexicon.len(),
            match_phrases, "Built lexicon scorer"
        );

        Ok(Self {
            lexicon,
            token_pattern,
            by_token,
            phrases,
        })
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Per-entry hit counts for already-lowercased text
    fn count_hits(&self, lowered: &str) -> Vec<usize> {
        let mut counts = vec![0usize; self.lexicon.len()];
        let mut tokens: Vec<&str> = Vec::new();
        for word in self.token_pattern.find_iter(lowered).map(|m| m.as_str()) {
            let (stem, clitic) = split_clitic(word);
            tokens.push(stem);
            tokens.extend(clitic);
        }

        for token in &tokens {
            if let Some(ids) = self.by_token.get(*token) {
                for &id in ids {
                    counts[id] += 1;
                }
            }
        }

        if let Some((automaton, ids)) = &self.phrases {
            let joined = tokens.join(" ");
            let bytes = joined.as_bytes();
            for m in automaton.find_overlapping_iter(&joined) {
                let starts_on_token = m.start() == 0 || bytes[m.start() - 1] == b' ';
                let ends_on_token = m.end() == bytes.len() || bytes[m.end()] == b' ';
                if starts_on_token && ends_on_token {
                    counts[ids[m.pattern().as_usize()]] += 1;
                }
            }
        }

        counts
    }

    /// Score `text`: one `count * weight` column per term, then `weight`.
    ///
    /// `weight` is the summed weighted hits divided by the character length
    /// of the lowercased text, and 0 for empty text.
    pub fn score(&self, text: &str) -> FeatureRow {
        let lowered = text.to_lowercase();
        let counts = self.count_hits(&lowered);

        let mut row = FeatureRow::with_capacity(self.lexicon.len() + 1);
        let mut weighted_total = 0.0;
        for (entry, count) in self.lexicon.entries().iter().zip(counts) {
            let value = count as f64 * entry.weight;
            weighted_total += value;
            row.push(entry.term.clone(), value);
        }

        let length = lowered.chars().count();
        let ratio = if length == 0 {
            0.0
        } else {
            weighted_total / length as f64
        };
        row.push(WEIGHT_COLUMN, ratio);
        row
    }

    /// Terms with a non-zero score for `text`, in lexicon order
    pub fn hits(&self, text: &str) -> Vec<(String, f64)> {
        self.score(text)
            .iter()
            .filter(|(name, value)| *name != WEIGHT_COLUMN && *value > 0.0)
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

/// Word-final clitics split off as separate tokens, longest first
const CLITICS: [&str; 7] = ["n't", "'ll", "'re", "'ve", "'s", "'m", "'d"];

/// Split a trailing clitic off a lowercased word: `thug's` -> (`thug`, `'s`)
fn split_clitic(word: &str) -> (&str, Option<&str>) {
    for clitic in CLITICS {
        if let Some(stem) = word.strip_suffix(clitic) {
            if !stem.is_empty() && !stem.ends_with('\'') {
                return (stem, Some(&word[stem.len()..]));
            }
        }
    }
    (word, None)
}

impl FeatureSource for LexiconScorer {
    fn name(&self) -> &str {
        "lexicon"
    }

    fn schema(&self) -> Vec<String> {
        self.lexicon
            .entries()
            .iter()
            .map(|e| e.term.clone())
            .chain(std::iter::once(WEIGHT_COLUMN.to_string()))
            .collect()
    }

    fn extract(&self, text: &str) -> Result<FeatureRow> {
        Ok(self.score(text))
    }
}
