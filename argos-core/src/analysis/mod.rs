//! Lexical analysis pipeline
//!
//! Turns raw text into the normalized, ordered term sequence shared by the
//! indexing and query paths. A pipeline is an ordered list of stages:
//! - Heuristics: strips hyphens after sense-changing prefixes
//! - Tokenize: splits into maximal runs of word characters
//! - StopFilter: drops high-frequency function words
//! - Stem: Snowball English stemming via rust-stemmers
//!
//! Pipelines are deterministic, order-preserving, idempotent when re-run on
//! their own output, and the identity on empty input. A pipeline is built
//! once per engine and shared between indexing and querying so both sides
//! agree on the vocabulary.

mod stopwords;

pub use stopwords::{parse_stop_list, DEFAULT_STOP_WORDS};

use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};

/// A single lexical stage: an ordered sequence of strings in, an ordered
/// sequence of strings out.
pub trait Stage: Send + Sync {
    fn process(&self, input: Vec<String>) -> Vec<String>;
}

/// Names for the built-in stages, in their default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Heuristics,
    Tokenize,
    Stop,
    Stem,
}

impl StageKind {
    /// The default stage order: heuristics, tokenize, stop, stem.
    pub const DEFAULT: [StageKind; 4] = [
        StageKind::Heuristics,
        StageKind::Tokenize,
        StageKind::Stop,
        StageKind::Stem,
    ];

    /// Resolve a stage name as it appears in configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "heuristics" => Some(StageKind::Heuristics),
            "tokenize" => Some(StageKind::Tokenize),
            "stop" => Some(StageKind::Stop),
            "stem" => Some(StageKind::Stem),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageKind::Heuristics => "heuristics",
            StageKind::Tokenize => "tokenize",
            StageKind::Stop => "stop",
            StageKind::Stem => "stem",
        };
        f.write_str(name)
    }
}

/// Hyphens after these prefixes change the sense of the word and must stay
/// attached ("re-cycled" is not "cycled"). Other hyphenations are left for
/// the tokenizer to split.
static HYPHEN_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(re|pre|non|de)-(\w)").unwrap());

/// Joins inputs into a single newline-separated string and removes hyphens
/// at word-internal positions after the prefixes `re`, `pre`, `non`, `de`.
#[derive(Debug, Clone, Default)]
pub struct Heuristics;

impl Stage for Heuristics {
    fn process(&self, input: Vec<String>) -> Vec<String> {
        let joined = input.join("\n");
        vec![HYPHEN_PREFIX.replace_all(&joined, "${1}${2}").into_owned()]
    }
}

/// Splits on non-word characters, emitting maximal runs of letters, digits,
/// and underscores in their original order.
#[derive(Debug, Clone, Default)]
pub struct Tokenize;

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Stage for Tokenize {
    fn process(&self, input: Vec<String>) -> Vec<String> {
        input
            .iter()
            .flat_map(|text| {
                text.split(|c: char| !is_word_char(c))
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
            })
            .collect()
    }
}

/// A lowercased stop-word set.
#[derive(Debug, Clone)]
pub struct StopSet {
    words: HashSet<String>,
}

impl StopSet {
    /// The built-in English list.
    pub fn builtin() -> Self {
        Self::from_source(DEFAULT_STOP_WORDS)
    }

    /// Parse a replacement list: whitespace-separated words, `#` lines are
    /// comments.
    pub fn from_source(source: &str) -> Self {
        Self {
            words: parse_stop_list(source),
        }
    }

    /// Membership test against an already-lowercased word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for StopSet {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Drops tokens whose lowercased form is in the stop set.
#[derive(Debug, Clone, Default)]
pub struct StopFilter {
    set: StopSet,
}

impl StopFilter {
    pub fn new(set: StopSet) -> Self {
        Self { set }
    }
}

impl Stage for StopFilter {
    fn process(&self, input: Vec<String>) -> Vec<String> {
        input
            .into_iter()
            .filter(|token| !self.set.contains(&token.to_lowercase()))
            .collect()
    }
}

/// Lowercases and stems tokens that contain at least one alphabetic
/// character; tokens without letters pass through unchanged, in position.
/// The stage never drops tokens.
pub struct Stem {
    stemmer: Stemmer,
}

impl Stem {
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for Stem {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage for Stem {
    fn process(&self, input: Vec<String>) -> Vec<String> {
        input
            .into_iter()
            .map(|token| {
                if token.chars().any(char::is_alphabetic) {
                    let lower = token.to_lowercase();
                    self.stemmer.stem(&lower).into_owned()
                } else {
                    token
                }
            })
            .collect()
    }
}

/// An ordered composition of lexical stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// An empty pipeline: the identity on any input sequence.
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    /// The default pipeline with the built-in stop list.
    pub fn standard() -> Self {
        Self::from_kinds(&StageKind::DEFAULT, StopSet::builtin())
    }

    /// Build a pipeline from configured stage names and a stop set.
    pub fn from_kinds(kinds: &[StageKind], stop_set: StopSet) -> Self {
        let mut pipeline = Self::empty();
        for kind in kinds {
            match kind {
                StageKind::Heuristics => pipeline.push(Box::new(Heuristics)),
                StageKind::Tokenize => pipeline.push(Box::new(Tokenize)),
                StageKind::Stop => pipeline.push(Box::new(StopFilter::new(stop_set.clone()))),
                StageKind::Stem => pipeline.push(Box::new(Stem::new())),
            }
        }
        pipeline
    }

    /// Append a stage, including user-supplied ones.
    pub fn push(&mut self, stage: Box<dyn Stage>) {
        self.stages.push(stage);
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage in order over the input sequence.
    pub fn run(&self, inputs: &[&str]) -> Vec<String> {
        let mut sequence: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        for stage in &self.stages {
            sequence = stage.process(sequence);
        }
        sequence
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
