use crate::change::SimulatedChange;
use crate::store::CorpusTable;
use crate::types::{ReplacementRow, SliceRow, Status};
use std::collections::{HashMap, HashSet};

/// Change types whose other sense is realized by a different lemma
pub const DEFAULT_REPLACEMENT_TYPES: [&str; 2] = ["taxonomy-hypernym", "taxonomy-hyponym"];

#[derive(Debug, Clone)]
pub struct ReplacementMarker {
    change_types: HashSet<String>,
}

impl Default for ReplacementMarker {
    fn default() -> Self {
        Self::new(DEFAULT_REPLACEMENT_TYPES.iter().map(|t| t.to_string()))
    }
}

impl ReplacementMarker {
    pub fn new(change_types: impl IntoIterator<Item = String>) -> Self {
        Self {
            change_types: change_types.into_iter().collect(),
        }
    }

    pub fn applies_to(&self, change: &SimulatedChange) -> bool {
        self.change_types.contains(change.change_type())
    }

    /// Substitutions for every other-sense token in a `timestep` sentence
    ///
    /// Each such token gets its lemma replaced by the target lemma. Only
    /// replacement change types with a distribution plan contribute.
    pub fn mark_replacements(
        &self,
        corpus: &CorpusTable,
        changes: &[SimulatedChange],
        timestep: Status,
    ) -> Vec<ReplacementRow> {
        let mut replacements = Vec::new();
        for change in changes.iter().filter(|c| self.applies_to(c) && c.plan().is_some()) {
            let rows = corpus
                .tokens_where(|token, status| status == timestep && token.has_sense(change.other_sense()))
                .map(|token| ReplacementRow {
                    sentence_id: token.sentence_id.clone(),
                    word_id: token.word_id.clone(),
                    old_lemma: token.lemma.clone(),
                    new_lemma: change.lemma().to_string(),
                });
            replacements.extend(rows);
        }
        replacements
    }
}

/// Sentence ids of a slice, left-joined with that slice's substitutions
pub fn join_replacements(sentence_ids: &[String], replacements: Vec<ReplacementRow>) -> Vec<SliceRow> {
    let mut by_sentence: HashMap<String, Vec<ReplacementRow>> = HashMap::new();
    for row in replacements {
        by_sentence.entry(row.sentence_id.clone()).or_default().push(row);
    }
    let mut rows = Vec::with_capacity(sentence_ids.len());
    for id in sentence_ids {
        match by_sentence.remove(id) {
            Some(subs) => rows.extend(subs.into_iter().map(SliceRow::from)),
            None => rows.push(SliceRow::plain(id)),
        }
    }
    rows
}
