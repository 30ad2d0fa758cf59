use crate::types::{Status, TokenRow};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Status of every sentence, in order of first appearance in the corpus
///
/// Statuses only move away from `Unset`. Once a sentence is `t1`, `t2` or
/// `drop` it keeps that label for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct SentenceStatuses {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    status: Vec<Status>,
}

impl SentenceStatuses {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, sentence_id: &str) {
        if !self.index.contains_key(sentence_id) {
            self.index.insert(sentence_id.to_string(), self.ids.len());
            self.ids.push(sentence_id.to_string());
            self.status.push(Status::Unset);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Current status of a sentence, `None` for unknown ids
    pub fn get(&self, sentence_id: &str) -> Option<Status> {
        self.index.get(sentence_id).map(|&i| self.status[i])
    }

    /// Label a sentence. Returns true if the status changed.
    ///
    /// A sentence that already carries a different label is left untouched.
    pub fn assign(&mut self, sentence_id: &str, status: Status) -> bool {
        let Some(&i) = self.index.get(sentence_id) else {
            return false;
        };
        if self.status[i] == Status::Unset && status != Status::Unset {
            self.status[i] = status;
            true
        } else {
            false
        }
    }

    /// Label all given sentences, returning how many changed
    pub fn assign_all<'a>(&mut self, sentence_ids: impl IntoIterator<Item = &'a String>, status: Status) -> usize {
        sentence_ids
            .into_iter()
            .filter(|id| self.assign(id, status))
            .count()
    }

    /// How many more of `sentence_ids` must carry `status` to reach `target`
    pub fn amount_still_needed(&self, sentence_ids: &[String], status: Status, target: usize) -> usize {
        let already = sentence_ids
            .iter()
            .filter(|id| self.get(id) == Some(status))
            .count();
        target.saturating_sub(already)
    }

    /// The subset of `sentence_ids` still without a label
    pub fn unset_among(&self, sentence_ids: &[String]) -> Vec<String> {
        sentence_ids
            .iter()
            .filter(|id| self.get(id) == Some(Status::Unset))
            .cloned()
            .collect()
    }

    pub fn with_status(&self, status: Status) -> Vec<String> {
        self.ids
            .iter()
            .zip(&self.status)
            .filter(|(_, s)| **s == status)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn count(&self, status: Status) -> usize {
        self.status.iter().filter(|s| **s == status).count()
    }

    /// Split every unset sentence evenly and at random between `t1` and `t2`
    ///
    /// An odd leftover sentence is dropped so both slices receive the same
    /// amount of background material. Returns the number of sentences placed
    /// in a slice.
    pub fn finalize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut remaining = self.with_status(Status::Unset);
        if remaining.is_empty() {
            return 0;
        }
        remaining.shuffle(rng);
        let half = remaining.len() / 2;
        let mut labeled = 0;
        for (pos, id) in remaining.iter().enumerate() {
            let status = if pos < half {
                Status::T1
            } else if pos < 2 * half {
                Status::T2
            } else {
                Status::Drop
            };
            if self.assign(id, status) && status != Status::Drop {
                labeled += 1;
            }
        }
        debug!("Background pass labeled {} sentences ({} per slice)", labeled, half);
        labeled
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Status)> {
        self.ids.iter().map(String::as_str).zip(self.status.iter().copied())
    }
}

/// Token table plus the per-sentence status map the partitioner writes to
#[derive(Debug, Clone, Default)]
pub struct CorpusTable {
    tokens: Vec<TokenRow>,
    statuses: SentenceStatuses,
    // Token positions per sentence
    by_sentence: HashMap<String, Vec<usize>>,
}

impl CorpusTable {
    pub fn new(tokens: Vec<TokenRow>) -> Self {
        let mut statuses = SentenceStatuses::new();
        let mut by_sentence: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, token) in tokens.iter().enumerate() {
            statuses.register(&token.sentence_id);
            by_sentence
                .entry(token.sentence_id.clone())
                .or_insert_with(Vec::new)
                .push(i);
        }
        Self {
            tokens,
            statuses,
            by_sentence,
        }
    }

    /// Concatenate several corpora into one table
    pub fn concat(corpora: impl IntoIterator<Item = Vec<TokenRow>>) -> Self {
        Self::new(corpora.into_iter().flatten().collect())
    }

    pub fn tokens(&self) -> &[TokenRow] {
        &self.tokens
    }

    pub fn statuses(&self) -> &SentenceStatuses {
        &self.statuses
    }

    pub fn statuses_mut(&mut self) -> &mut SentenceStatuses {
        &mut self.statuses
    }

    pub fn status_of(&self, sentence_id: &str) -> Option<Status> {
        self.statuses.get(sentence_id)
    }

    pub fn sentence_count(&self) -> usize {
        self.statuses.len()
    }

    /// Tokens of one sentence in corpus order
    pub fn sentence_tokens(&self, sentence_id: &str) -> Vec<&TokenRow> {
        self.by_sentence
            .get(sentence_id)
            .map(|rows| rows.iter().map(|&i| &self.tokens[i]).collect())
            .unwrap_or_default()
    }

    /// Distinct ids of sentences with at least one token matching `pred`,
    /// in order of first appearance
    pub fn sentences_where<F>(&self, mut pred: F) -> Vec<String>
    where
        F: FnMut(&TokenRow, Status) -> bool,
    {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for token in &self.tokens {
            let status = self.statuses.get(&token.sentence_id).unwrap_or_default();
            if pred(token, status) && seen.insert(token.sentence_id.as_str()) {
                ids.push(token.sentence_id.clone());
            }
        }
        ids
    }

    /// Tokens matching `pred`, together with their sentence status
    pub fn tokens_where<F>(&self, mut pred: F) -> impl Iterator<Item = &TokenRow>
    where
        F: FnMut(&TokenRow, Status) -> bool,
    {
        self.tokens.iter().filter(move |token| {
            let status = self.statuses.get(&token.sentence_id).unwrap_or_default();
            pred(token, status)
        })
    }

    /// Running text of a sentence, tokens joined by single spaces
    pub fn sentence_text(&self, sentence_id: &str) -> String {
        self.sentence_tokens(sentence_id)
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Sentence ids in corpus order, optionally restricted to one status
    pub fn sentence_ids(&self, status: Option<Status>) -> Vec<String> {
        match status {
            Some(s) => self.statuses.with_status(s),
            None => self.statuses.iter().map(|(id, _)| id.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn token(sentence_id: &str, word_id: usize, lemma: &str) -> TokenRow {
        TokenRow {
            sentence_id: sentence_id.to_string(),
            word_id: word_id.to_string(),
            text: lemma.to_string(),
            lemma: lemma.to_string(),
            sense: None,
            pos: "NOUN".to_string(),
        }
    }

    fn table(sentences: usize) -> CorpusTable {
        let mut tokens = Vec::new();
        for s in 0..sentences {
            tokens.push(token(&format!("s{}", s), 0, "cat"));
            tokens.push(token(&format!("s{}", s), 1, "sat"));
        }
        CorpusTable::new(tokens)
    }

    #[test]
    fn test_assign_is_monotonic() {
        let mut corpus = table(2);
        let statuses = corpus.statuses_mut();
        assert!(statuses.assign("s0", Status::T1));
        assert!(!statuses.assign("s0", Status::Drop));
        assert!(!statuses.assign("s0", Status::T1));
        assert!(!statuses.assign("s0", Status::Unset));
        assert!(!statuses.assign("missing", Status::T2));
        assert_eq!(statuses.get("s0"), Some(Status::T1));
        assert_eq!(statuses.get("s1"), Some(Status::Unset));
    }

    #[test]
    fn test_amount_still_needed_clamps_at_zero() {
        let mut corpus = table(4);
        let ids = corpus.sentence_ids(None);
        corpus.statuses_mut().assign_all(&ids[..3], Status::T1);
        let statuses = corpus.statuses();
        assert_eq!(statuses.amount_still_needed(&ids, Status::T1, 5), 2);
        assert_eq!(statuses.amount_still_needed(&ids, Status::T1, 2), 0);
        assert_eq!(statuses.amount_still_needed(&ids, Status::T2, 2), 2);
        assert_eq!(statuses.unset_among(&ids), vec!["s3".to_string()]);
    }

    #[test]
    fn test_finalize_splits_evenly_and_drops_odd_leftover() {
        let mut corpus = table(7);
        corpus.statuses_mut().assign("s0", Status::Drop);
        let mut rng = StdRng::seed_from_u64(3);
        let labeled = corpus.statuses_mut().finalize(&mut rng);
        assert_eq!(labeled, 6);
        assert_eq!(corpus.statuses().count(Status::T1), 3);
        assert_eq!(corpus.statuses().count(Status::T2), 3);
        assert_eq!(corpus.statuses().count(Status::Unset), 0);

        let mut corpus = table(8);
        corpus.statuses_mut().finalize(&mut rng);
        assert_eq!(corpus.statuses().count(Status::T1), 4);
        assert_eq!(corpus.statuses().count(Status::T2), 4);
        assert_eq!(corpus.statuses().count(Status::Drop), 0);
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let mut corpus = table(10);
        let mut rng = StdRng::seed_from_u64(11);
        corpus.statuses_mut().finalize(&mut rng);
        let before: Vec<(String, Status)> = corpus
            .statuses()
            .iter()
            .map(|(id, s)| (id.to_string(), s))
            .collect();
        assert_eq!(corpus.statuses_mut().finalize(&mut rng), 0);
        let after: Vec<(String, Status)> = corpus
            .statuses()
            .iter()
            .map(|(id, s)| (id.to_string(), s))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_sentence_queries() {
        let corpus = table(3);
        assert_eq!(corpus.sentence_count(), 3);
        assert_eq!(corpus.sentence_text("s1"), "cat sat");
        let ids = corpus.sentences_where(|t, _| t.lemma == "sat");
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
        assert_eq!(corpus.tokens_where(|t, _| t.lemma == "cat").count(), 3);
    }
}
