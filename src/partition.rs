//! Allocation of sentences to the two time slices.
//!
//! Records are processed in order and the first record to claim a shared
//! sentence keeps it. Every record first gets its contaminated sentences
//! dropped, then each record in turn is planned, sampled and cleaned up, and a
//! final pass spreads the untouched background evenly over both slices.

use crate::change::{SenseCounts, SimulatedChange};
use crate::error::{SimError, SimResult};
use crate::store::CorpusTable;
use crate::types::{SenseMode, Status, TokenRow};
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// A record that could not be realized, with the reason
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedChange {
    pub change: String,
    pub reason: String,
}

/// Outcome of a full partitioning run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionReport {
    pub contaminated: usize,
    pub realized: usize,
    pub skipped: Vec<SkippedChange>,
    pub residual: usize,
    pub background: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CorpusPartitioner {
    mode: SenseMode,
}

/// Whether a token belongs to the material tracked by `change`
fn is_target_token(token: &TokenRow, change: &SimulatedChange) -> bool {
    token.is_lemma(change.lemma(), change.pos()) || token.has_sense(change.other_sense())
}

impl CorpusPartitioner {
    pub fn new(mode: SenseMode) -> Self {
        Self { mode }
    }

    /// Run every pass over `changes` and label the whole corpus
    pub fn split<R: Rng + ?Sized>(
        &self,
        corpus: &mut CorpusTable,
        changes: &mut [SimulatedChange],
        rng: &mut R,
    ) -> PartitionReport {
        let mut report = PartitionReport::default();

        for change in changes.iter() {
            report.contaminated += self.drop_contaminated(corpus, change);
        }
        info!("Dropped {} sentences with unrelated senses of a target", report.contaminated);

        for change in changes.iter_mut() {
            match self.realize(corpus, change, rng) {
                Ok(residual) => {
                    report.realized += 1;
                    report.residual += residual;
                }
                Err(err @ SimError::InsufficientOccurrence { .. }) => {
                    warn!("{}. Skipping {}.", err, change);
                    report.skipped.push(SkippedChange {
                        change: change.to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(err @ SimError::PlanAlreadyComputed { .. }) => {
                    warn!("{}. Skipping {}.", err, change);
                    report.skipped.push(SkippedChange {
                        change: change.to_string(),
                        reason: err.to_string(),
                    });
                }
                Err(
                    err @ (SimError::InvalidConfig(_)
                    | SimError::InsufficientPool { .. }
                    | SimError::DuplicateTarget { .. }
                    | SimError::MalformedRow { .. }
                    | SimError::Io(_)
                    | SimError::Csv(_)
                    | SimError::Json(_)),
                ) => {
                    error!("There seems to be something wrong with target {}: {}. Skipping.", change, err);
                    report.skipped.push(SkippedChange {
                        change: change.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        report.background = corpus.statuses_mut().finalize(rng);
        info!(
            "Realized {} of {} changes, {} background sentences distributed",
            report.realized,
            changes.len(),
            report.background
        );
        report
    }

    /// Drop sentences where the target lemma carries neither of its two senses
    pub fn drop_contaminated(&self, corpus: &mut CorpusTable, change: &SimulatedChange) -> usize {
        let [base, other] = change.senses();
        let ids = corpus.sentences_where(|token, _| {
            token.is_lemma(change.lemma(), change.pos()) && !token.has_sense(base) && !token.has_sense(other)
        });
        let dropped = corpus.statuses_mut().assign_all(&ids, Status::Drop);
        debug!("{}: {} contaminated sentences dropped", change, dropped);
        dropped
    }

    /// Occurrences per sense among the not-dropped target material
    ///
    /// A sentence counts once for every distinct sense it carries.
    pub fn count_senses(&self, corpus: &CorpusTable, change: &SimulatedChange) -> SenseCounts {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut counts = SenseCounts::new();
        for token in corpus.tokens_where(|t, status| status != Status::Drop && is_target_token(t, change)) {
            if let Some(sense) = token.sense.as_deref() {
                if seen.insert((token.sentence_id.as_str(), sense)) {
                    *counts.entry(sense.to_string()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Plan, sample and clean up one record. Returns the residual drop count.
    ///
    /// Nothing is written to the corpus when planning fails.
    pub fn realize<R: Rng + ?Sized>(
        &self,
        corpus: &mut CorpusTable,
        change: &mut SimulatedChange,
        rng: &mut R,
    ) -> SimResult<usize> {
        let counts = self.count_senses(corpus, change);
        change.compute_distribution_plan(&counts, self.mode)?;
        if let Some(plan) = change.plan() {
            if plan.primary != change.base_sense() {
                warn!(
                    "{}: {} is more frequent than base sense {}; manifest keeps the base/other labels",
                    change,
                    plan.primary,
                    change.base_sense()
                );
            }
        }
        self.sample(corpus, change, rng);
        Ok(self.drop_residual(corpus, change))
    }

    /// Move sentences of both senses into the slices until the plan is met
    ///
    /// Sentences already placed by an earlier record count toward the plan;
    /// a slice that is already over its planned amount is left as it is.
    pub fn sample<R: Rng + ?Sized>(&self, corpus: &mut CorpusTable, change: &SimulatedChange, rng: &mut R) {
        let Some(plan) = change.plan() else {
            return;
        };
        for sense in change.senses() {
            let pool = corpus.sentences_where(|token, status| {
                status != Status::Drop && token.has_sense(sense) && is_target_token(token, change)
            });
            for slice in Status::slices() {
                let statuses = corpus.statuses_mut();
                let needed = statuses.amount_still_needed(&pool, slice, plan.planned(slice, sense));
                let free = statuses.unset_among(&pool);
                if needed > free.len() {
                    debug!(
                        "{}: {} needs {} more {} sentences but only {} are free",
                        change,
                        slice,
                        needed,
                        sense,
                        free.len()
                    );
                }
                let chosen: Vec<String> = free.choose_multiple(rng, needed.min(free.len())).cloned().collect();
                statuses.assign_all(&chosen, slice);
            }
        }
    }

    /// Drop target material the plan did not ask for
    pub fn drop_residual(&self, corpus: &mut CorpusTable, change: &SimulatedChange) -> usize {
        let ids = corpus.sentences_where(|token, status| status == Status::Unset && is_target_token(token, change));
        let dropped = corpus.statuses_mut().assign_all(&ids, Status::Drop);
        debug!("{}: {} surplus sentences dropped", change, dropped);
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeResult, TargetCandidate};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sentence(id: &str, lemma: &str, sense: Option<&str>) -> Vec<TokenRow> {
        vec![
            TokenRow {
                sentence_id: id.to_string(),
                word_id: "0".to_string(),
                text: "the".to_string(),
                lemma: "the".to_string(),
                sense: None,
                pos: "DET".to_string(),
            },
            TokenRow {
                sentence_id: id.to_string(),
                word_id: "1".to_string(),
                text: lemma.to_string(),
                lemma: lemma.to_string(),
                sense: sense.map(str::to_string),
                pos: "NOUN".to_string(),
            },
        ]
    }

    /// `base` sentences with the base sense, `other` with the other sense,
    /// `foreign` with a third sense, plus `filler` unrelated sentences
    fn corpus(base: usize, other: usize, foreign: usize, filler: usize) -> CorpusTable {
        let mut tokens = Vec::new();
        let mut add = |prefix: &str, count: usize, lemma: &str, sense: Option<&str>| {
            for i in 0..count {
                tokens.extend(sentence(&format!("{}{}", prefix, i), lemma, sense));
            }
        };
        add("b", base, "bank", Some("bank.base"));
        add("o", other, "bank", Some("bank.other"));
        add("x", foreign, "bank", Some("bank.third"));
        add("f", filler, "river", None);
        CorpusTable::new(tokens)
    }

    fn change(result: ChangeResult) -> SimulatedChange {
        let candidate = TargetCandidate::new("bank", Some("NOUN"), "bank.base", "bank.other");
        SimulatedChange::new(&candidate, "metaphor", result)
    }

    fn slice_count(corpus: &CorpusTable, prefix: &str, status: Status) -> usize {
        corpus
            .statuses()
            .iter()
            .filter(|(id, s)| id.starts_with(prefix) && *s == status)
            .count()
    }

    #[test]
    fn test_contaminated_sentences_are_dropped() {
        let mut corpus = corpus(40, 20, 5, 0);
        let partitioner = CorpusPartitioner::new(SenseMode::BaseOther);
        let dropped = partitioner.drop_contaminated(&mut corpus, &change(ChangeResult::Gain));
        assert_eq!(dropped, 5);
        assert_eq!(slice_count(&corpus, "x", Status::Drop), 5);
        assert_eq!(slice_count(&corpus, "b", Status::Unset), 40);
    }

    #[test]
    fn test_gain_realizes_plan() {
        let mut corpus = corpus(40, 20, 3, 10);
        let mut changes = vec![change(ChangeResult::Gain)];
        let mut rng = StdRng::seed_from_u64(42);
        let report = CorpusPartitioner::new(SenseMode::BaseOther).split(&mut corpus, &mut changes, &mut rng);

        assert_eq!(report.realized, 1);
        assert_eq!(report.contaminated, 3);
        assert!(report.skipped.is_empty());
        assert_eq!(slice_count(&corpus, "b", Status::T1), 25);
        assert_eq!(slice_count(&corpus, "o", Status::T1), 0);
        assert_eq!(slice_count(&corpus, "b", Status::T2), 15);
        assert_eq!(slice_count(&corpus, "o", Status::T2), 15);
        // Surplus other-sense sentences are not background material
        assert_eq!(slice_count(&corpus, "o", Status::Drop), 5);
        assert_eq!(report.residual, 5);
        assert_eq!(slice_count(&corpus, "f", Status::T1), 5);
        assert_eq!(slice_count(&corpus, "f", Status::T2), 5);
        assert_eq!(corpus.statuses().count(Status::Unset), 0);
    }

    #[test]
    fn test_loss_puts_second_sense_first() {
        let mut corpus = corpus(40, 20, 0, 0);
        let mut changes = vec![change(ChangeResult::Loss)];
        let mut rng = StdRng::seed_from_u64(7);
        CorpusPartitioner::new(SenseMode::BaseOther).split(&mut corpus, &mut changes, &mut rng);
        assert_eq!(slice_count(&corpus, "o", Status::T1), 15);
        assert_eq!(slice_count(&corpus, "b", Status::T1), 15);
        assert_eq!(slice_count(&corpus, "b", Status::T2), 25);
        assert_eq!(slice_count(&corpus, "o", Status::T2), 0);
    }

    #[test]
    fn test_constant_keeps_ratio() {
        let mut corpus = corpus(41, 17, 0, 0);
        let mut changes = vec![change(ChangeResult::Constant)];
        let mut rng = StdRng::seed_from_u64(1);
        CorpusPartitioner::new(SenseMode::BaseOther).split(&mut corpus, &mut changes, &mut rng);
        assert_eq!(slice_count(&corpus, "b", Status::T1), 20);
        assert_eq!(slice_count(&corpus, "b", Status::T2), 20);
        assert_eq!(slice_count(&corpus, "o", Status::T1), 8);
        assert_eq!(slice_count(&corpus, "o", Status::T2), 8);
        assert_eq!(changes[0].senses_before_change(), changes[0].senses_after_change());
    }

    #[test]
    fn test_insufficient_target_is_skipped_without_writes() {
        let mut corpus = corpus(30, 5, 0, 4);
        let mut changes = vec![change(ChangeResult::Gain)];
        let mut rng = StdRng::seed_from_u64(3);
        let report = CorpusPartitioner::new(SenseMode::BaseOther).split(&mut corpus, &mut changes, &mut rng);
        assert_eq!(report.realized, 0);
        assert_eq!(report.skipped.len(), 1);
        assert!(changes[0].plan().is_none());
        // The target's sentences fall through to the background pass
        assert_eq!(report.background, 38);
        assert_eq!(corpus.statuses().count(Status::Drop), 1);
        assert_eq!(corpus.statuses().count(Status::Unset), 0);
    }

    #[test]
    fn test_insufficient_target_leaves_other_records_intact() {
        let mut tokens = Vec::new();
        for i in 0..30 {
            tokens.extend(sentence(&format!("m{}", i), "mouse", Some("mouse.base")));
        }
        for i in 0..5 {
            tokens.extend(sentence(&format!("n{}", i), "mouse", Some("mouse.other")));
        }
        for i in 0..40 {
            tokens.extend(sentence(&format!("b{}", i), "bank", Some("bank.base")));
        }
        for i in 0..20 {
            tokens.extend(sentence(&format!("o{}", i), "bank", Some("bank.other")));
        }
        let mut corpus = CorpusTable::new(tokens);
        let mouse = TargetCandidate::new("mouse", Some("NOUN"), "mouse.base", "mouse.other");
        let mut changes = vec![
            SimulatedChange::new(&mouse, "metaphor", ChangeResult::Gain),
            change(ChangeResult::Gain),
        ];
        let mut rng = StdRng::seed_from_u64(8);
        let report = CorpusPartitioner::new(SenseMode::BaseOther).split(&mut corpus, &mut changes, &mut rng);

        assert_eq!(report.realized, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].change.starts_with("mouse"));
        assert!(changes[0].plan().is_none());
        assert_eq!(changes[0].export_row().unwrap(), None);

        assert_eq!(slice_count(&corpus, "b", Status::T1), 25);
        assert_eq!(slice_count(&corpus, "o", Status::T1), 0);
        assert_eq!(slice_count(&corpus, "b", Status::T2), 15);
        assert_eq!(slice_count(&corpus, "o", Status::T2), 15);
        assert!(changes[1].export_row().unwrap().is_some());
    }

    #[test]
    fn test_earlier_assignments_count_toward_plan() {
        let mut corpus = corpus(40, 20, 0, 0);
        let mut target = change(ChangeResult::Gain);
        let partitioner = CorpusPartitioner::new(SenseMode::BaseOther);
        // Pretend an earlier record already placed 30 base sentences in t1
        let early: Vec<String> = (0..30).map(|i| format!("b{}", i)).collect();
        corpus.statuses_mut().assign_all(&early, Status::T1);

        let mut rng = StdRng::seed_from_u64(2);
        partitioner.realize(&mut corpus, &mut target, &mut rng).unwrap();
        // t1 is over-satisfied and keeps all 30; t2 takes the remaining 10
        assert_eq!(slice_count(&corpus, "b", Status::T1), 30);
        assert_eq!(slice_count(&corpus, "b", Status::T2), 10);
        assert_eq!(slice_count(&corpus, "o", Status::T2), 15);
    }

    #[test]
    fn test_count_senses_counts_sentences() {
        let mut tokens = sentence("s0", "bank", Some("bank.base"));
        tokens.extend(sentence("s0", "bank", Some("bank.base")));
        tokens.extend(sentence("s1", "shore", Some("bank.other")));
        let corpus = CorpusTable::new(tokens);
        let counts = CorpusPartitioner::default().count_senses(&corpus, &change(ChangeResult::Gain));
        assert_eq!(counts.get("bank.base"), Some(&1));
        assert_eq!(counts.get("bank.other"), Some(&1));
    }
}
