use crate::change::SimulatedChange;
use crate::config::SimulationConfig;
use crate::error::{SimError, SimResult};
use crate::outcome::select_result;
use crate::partition::{CorpusPartitioner, PartitionReport};
use crate::replace::{join_replacements, ReplacementMarker};
use crate::selector::{ClaimedTargets, TargetSelector};
use crate::store::CorpusTable;
use crate::types::{ManifestRow, ReplacementRow, SliceRow, Status, TargetCandidate};
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A named change type with its pool of candidate targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeTypeData {
    pub name: String,
    pub candidates: Vec<TargetCandidate>,
}

/// Owns a simulation run: the corpus, the selected changes and the random source
#[derive(Debug)]
pub struct Simulator<R: Rng = StdRng> {
    config: SimulationConfig,
    corpus: CorpusTable,
    change_types: Vec<ChangeTypeData>,
    changes: Vec<SimulatedChange>,
    report: Option<PartitionReport>,
    rng: R,
}

impl Simulator<StdRng> {
    /// Validate the configuration, then select targets for every change type
    ///
    /// The random source is seeded from `config.seed` when given.
    pub fn new(config: SimulationConfig, corpus: CorpusTable, change_types: Vec<ChangeTypeData>) -> SimResult<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, corpus, change_types, rng)
    }
}

impl<R: Rng> Simulator<R> {
    pub fn with_rng(
        config: SimulationConfig,
        corpus: CorpusTable,
        change_types: Vec<ChangeTypeData>,
        rng: R,
    ) -> SimResult<Self> {
        config.validate()?;
        let mut simulator = Self {
            config,
            corpus,
            change_types,
            changes: Vec::new(),
            report: None,
            rng,
        };
        // Sequential so that each change type sees the targets claimed before it
        for i in 0..simulator.change_types.len() {
            let selected = simulator.select_target_words(i);
            simulator.changes.extend(selected);
        }
        info!(
            "Selected {} targets across {} change types",
            simulator.changes.len(),
            simulator.change_types.len()
        );
        Ok(simulator)
    }

    /// Draw the targets of the `i`th change type and assign their outcomes
    ///
    /// Returns no changes when the candidate pool is too small, which skips the
    /// change type.
    pub fn select_target_words(&mut self, i: usize) -> Vec<SimulatedChange> {
        let Some(change_type) = self.change_types.get(i) else {
            return Vec::new();
        };
        let n = self.config.targets_per_type;
        let claimed = ClaimedTargets::from_changes(&self.changes);
        let selector = TargetSelector::new(&change_type.name, &change_type.candidates);
        match selector.select(n, &claimed, &mut self.rng) {
            Ok(selection) => selection
                .targets
                .iter()
                .enumerate()
                .map(|(j, target)| {
                    SimulatedChange::new(target, &change_type.name, select_result(j, n, self.config.loss))
                })
                .collect(),
            Err(err @ SimError::InsufficientPool { .. }) => {
                warn!("The number of targets is too high for the given list of possible target words: {}", err);
                Vec::new()
            }
            Err(
                err @ (SimError::InvalidConfig(_)
                | SimError::InsufficientOccurrence { .. }
                | SimError::DuplicateTarget { .. }
                | SimError::MalformedRow { .. }
                | SimError::PlanAlreadyComputed { .. }
                | SimError::Io(_)
                | SimError::Csv(_)
                | SimError::Json(_)),
            ) => {
                error!("Could not select targets for {}: {}", change_type.name, err);
                Vec::new()
            }
        }
    }

    /// Label every sentence of the corpus as `t1`, `t2` or `drop`
    pub fn split_corpora(&mut self) -> &PartitionReport {
        let partitioner = CorpusPartitioner::new(self.config.mode);
        let report = partitioner.split(&mut self.corpus, &mut self.changes, &mut self.rng);
        self.report.insert(report)
    }

    /// Lemma substitutions for the sentences of one slice
    pub fn mark_replacements(&self, timestep: Status) -> Vec<ReplacementRow> {
        let marker = ReplacementMarker::new(self.config.replacement_types.iter().cloned());
        marker.mark_replacements(&self.corpus, &self.changes, timestep)
    }

    /// Ids of the sentences labeled `timestep`, in corpus order
    pub fn slice_sentences(&self, timestep: Status) -> Vec<String> {
        self.corpus.sentence_ids(Some(timestep))
    }

    /// Sentence ids of one slice, joined with its substitutions
    pub fn slice_rows(&self, timestep: Status) -> Vec<SliceRow> {
        join_replacements(&self.slice_sentences(timestep), self.mark_replacements(timestep))
    }

    /// Lemma and POS of every selected target
    pub fn targets(&self) -> Vec<(&str, Option<&str>)> {
        self.changes.iter().map(|c| (c.lemma(), c.pos())).collect()
    }

    /// One manifest row per change that received a distribution plan
    pub fn manifest(&self) -> SimResult<Vec<ManifestRow>> {
        let mut rows = Vec::new();
        for change in &self.changes {
            if let Some(row) = change.export_row()? {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    /// Sentence count per status
    pub fn status_summary(&self) -> Vec<(Status, usize)> {
        [Status::T1, Status::T2, Status::Drop, Status::Unset]
            .into_iter()
            .map(|s| (s, self.corpus.statuses().count(s)))
            .collect()
    }

    pub fn corpus(&self) -> &CorpusTable {
        &self.corpus
    }

    pub fn changes(&self) -> &[SimulatedChange] {
        &self.changes
    }

    pub fn report(&self) -> Option<&PartitionReport> {
        self.report.as_ref()
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}
