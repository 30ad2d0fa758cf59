use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Per-sentence label assigned by the partitioner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Unset,
    T1,
    T2,
    Drop,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unset => "unset",
            Status::T1 => "t1",
            Status::T2 => "t2",
            Status::Drop => "drop",
        }
    }

    /// The two time slices, in output order
    pub fn slices() -> [Status; 2] {
        [Status::T1, Status::T2]
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated trajectory of a target's second sense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeResult {
    Gain,
    Loss,
    Constant,
}

impl ChangeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeResult::Gain => "gain",
            ChangeResult::Loss => "loss",
            ChangeResult::Constant => "constant",
        }
    }
}

impl fmt::Display for ChangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the primary (pre-change) sense of a target is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SenseMode {
    /// `base_sense` is the sense before the change, `other_sense` the new one
    #[default]
    BaseOther,
    /// The more frequent sense is the sense before the change
    Frequency,
}

impl FromStr for SenseMode {
    type Err = SimError;

    fn from_str(s: &str) -> SimResult<Self> {
        match s {
            "base_other" => Ok(SenseMode::BaseOther),
            "frequency" => Ok(SenseMode::Frequency),
            other => Err(SimError::InvalidConfig(format!(
                "unknown sense mode `{}` (expected base_other or frequency)",
                other
            ))),
        }
    }
}

impl fmt::Display for SenseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenseMode::BaseOther => f.write_str("base_other"),
            SenseMode::Frequency => f.write_str("frequency"),
        }
    }
}

/// One word or punctuation occurrence of the corpus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRow {
    pub sentence_id: String,
    pub word_id: String,
    pub text: String,
    pub lemma: String,
    pub sense: Option<String>,
    #[serde(rename = "universalPOS")]
    pub pos: String,
}

impl TokenRow {
    /// Whether this token is an occurrence of `lemma`, optionally restricted to `pos`
    pub fn is_lemma(&self, lemma: &str, pos: Option<&str>) -> bool {
        self.lemma == lemma && pos.map_or(true, |p| self.pos == p)
    }

    pub fn has_sense(&self, sense: &str) -> bool {
        self.sense.as_deref() == Some(sense)
    }
}

/// Corpus row as read from disk, before required fields are checked
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTokenRow {
    pub sentence_id: Option<String>,
    pub word_id: Option<String>,
    pub text: Option<String>,
    pub lemma: Option<String>,
    pub sense: Option<String>,
    #[serde(rename = "universalPOS")]
    pub pos: Option<String>,
}

impl RawTokenRow {
    pub fn into_token(self, row: usize) -> SimResult<TokenRow> {
        Ok(TokenRow {
            sentence_id: require(self.sentence_id, row, "sentence_id")?,
            word_id: require(self.word_id, row, "word_id")?,
            text: self.text.unwrap_or_default(),
            lemma: require(self.lemma, row, "lemma")?,
            sense: self.sense.filter(|s| !s.is_empty()),
            pos: self.pos.unwrap_or_default(),
        })
    }
}

/// A candidate target lemma with its two competing senses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCandidate {
    pub lemma: String,
    #[serde(rename = "universalPOS")]
    pub pos: Option<String>,
    pub base_sense: String,
    pub other_sense: String,
    pub base_count: Option<u64>,
    pub other_count: Option<u64>,
}

impl TargetCandidate {
    pub fn new(lemma: &str, pos: Option<&str>, base_sense: &str, other_sense: &str) -> Self {
        Self {
            lemma: lemma.to_string(),
            pos: pos.map(str::to_string),
            base_sense: base_sense.to_string(),
            other_sense: other_sense.to_string(),
            base_count: None,
            other_count: None,
        }
    }
}

/// Target list row as read from disk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCandidate {
    pub lemma: Option<String>,
    #[serde(rename = "universalPOS")]
    pub pos: Option<String>,
    pub base_sense: Option<String>,
    pub other_sense: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub base_count: Option<u64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub other_count: Option<u64>,
}

impl RawCandidate {
    pub fn into_candidate(self, row: usize) -> SimResult<TargetCandidate> {
        Ok(TargetCandidate {
            lemma: require(self.lemma, row, "lemma")?,
            pos: self.pos.filter(|p| !p.is_empty()),
            base_sense: require(self.base_sense, row, "base_sense")?,
            other_sense: require(self.other_sense, row, "other_sense")?,
            base_count: self.base_count,
            other_count: self.other_count,
        })
    }
}

fn require(value: Option<String>, row: usize, field: &'static str) -> SimResult<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(SimError::MalformedRow { row, field }),
    }
}

/// A lemma substitution to be realized by a morphological generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRow {
    pub sentence_id: String,
    pub word_id: String,
    pub old_lemma: String,
    pub new_lemma: String,
}

/// Row of an exported slice: a sentence id, optionally joined with a substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRow {
    pub sentence_id: String,
    pub word_id: Option<String>,
    pub old_lemma: Option<String>,
    pub new_lemma: Option<String>,
}

impl SliceRow {
    pub fn plain(sentence_id: &str) -> Self {
        Self {
            sentence_id: sentence_id.to_string(),
            word_id: None,
            old_lemma: None,
            new_lemma: None,
        }
    }
}

impl From<ReplacementRow> for SliceRow {
    fn from(row: ReplacementRow) -> Self {
        Self {
            sentence_id: row.sentence_id,
            word_id: Some(row.word_id),
            old_lemma: Some(row.old_lemma),
            new_lemma: Some(row.new_lemma),
        }
    }
}

/// One line of the changes manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRow {
    pub lemma: String,
    pub pos: String,
    pub change_type: String,
    pub change_result: ChangeResult,
    pub base_sense: String,
    pub other_sense: String,
    pub counts_before: String,
    pub counts_after: String,
}
