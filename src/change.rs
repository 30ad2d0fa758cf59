use crate::error::{SimError, SimResult};
use crate::types::{ChangeResult, ManifestRow, SenseMode, Status, TargetCandidate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Minimum occurrences of the primary sense for a target to be simulated
pub const MIN_PRIMARY_OCCURRENCES: usize = 38;
/// Minimum occurrences of the secondary sense for a target to be simulated
pub const MIN_SECONDARY_OCCURRENCES: usize = 13;
/// Occurrences of the primary sense kept in the slice without the secondary sense
pub const MIN_UNCHANGED_OCCURRENCES: usize = 25;

/// Occurrence counts per sense label
pub type SenseCounts = BTreeMap<String, usize>;

/// How many occurrences of each sense go into each time slice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionPlan {
    pub primary: String,
    pub secondary: String,
    pub before: SenseCounts,
    pub after: SenseCounts,
}

impl DistributionPlan {
    /// Plan the split of `primary`/`secondary` occurrences for a change result
    ///
    /// Fails with `InsufficientOccurrence` below 38 primary or 13 secondary
    /// occurrences.
    pub fn compute(
        lemma: &str,
        result: ChangeResult,
        (primary, freq_primary): (&str, usize),
        (secondary, freq_secondary): (&str, usize),
    ) -> SimResult<Self> {
        if freq_primary < MIN_PRIMARY_OCCURRENCES || freq_secondary < MIN_SECONDARY_OCCURRENCES {
            return Err(SimError::InsufficientOccurrence {
                lemma: lemma.to_string(),
                primary: primary.to_string(),
                primary_count: freq_primary,
                secondary: secondary.to_string(),
                secondary_count: freq_secondary,
            });
        }

        let slice = |p: usize, s: usize| -> SenseCounts {
            let mut counts = SenseCounts::new();
            counts.insert(primary.to_string(), p);
            counts.insert(secondary.to_string(), s);
            counts
        };

        let (before, after) = match result {
            ChangeResult::Constant => {
                let both = slice(freq_primary / 2, freq_secondary / 2);
                (both.clone(), both)
            }
            ChangeResult::Gain | ChangeResult::Loss => {
                let unchanged = MIN_UNCHANGED_OCCURRENCES.max(freq_primary.saturating_sub(freq_secondary));
                let shared = freq_primary - unchanged;
                let without_secondary = slice(unchanged, 0);
                let with_secondary = slice(shared, shared);
                if result == ChangeResult::Gain {
                    (without_secondary, with_secondary)
                } else {
                    (with_secondary, without_secondary)
                }
            }
        };

        Ok(Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            before,
            after,
        })
    }

    /// Planned number of `sense` occurrences in the given slice
    pub fn planned(&self, slice: Status, sense: &str) -> usize {
        let counts = match slice {
            Status::T1 => &self.before,
            Status::T2 => &self.after,
            _ => return 0,
        };
        counts.get(sense).copied().unwrap_or(0)
    }
}

/// One target's intended transformation
///
/// Built once from a selected candidate; the only mutation afterwards is
/// [`SimulatedChange::compute_distribution_plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedChange {
    lemma: String,
    pos: Option<String>,
    change_type: String,
    change_result: ChangeResult,
    base_sense: String,
    other_sense: String,
    plan: Option<DistributionPlan>,
}

impl SimulatedChange {
    pub fn new(candidate: &TargetCandidate, change_type: &str, change_result: ChangeResult) -> Self {
        Self {
            lemma: candidate.lemma.clone(),
            pos: candidate.pos.clone(),
            change_type: change_type.to_string(),
            change_result,
            base_sense: candidate.base_sense.clone(),
            other_sense: candidate.other_sense.clone(),
            plan: None,
        }
    }

    pub fn lemma(&self) -> &str {
        &self.lemma
    }

    pub fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }

    pub fn change_type(&self) -> &str {
        &self.change_type
    }

    pub fn change_result(&self) -> ChangeResult {
        self.change_result
    }

    pub fn base_sense(&self) -> &str {
        &self.base_sense
    }

    pub fn other_sense(&self) -> &str {
        &self.other_sense
    }

    /// The two tracked senses, base first
    pub fn senses(&self) -> [&str; 2] {
        [&self.base_sense, &self.other_sense]
    }

    pub fn plan(&self) -> Option<&DistributionPlan> {
        self.plan.as_ref()
    }

    pub fn senses_before_change(&self) -> Option<&SenseCounts> {
        self.plan.as_ref().map(|p| &p.before)
    }

    pub fn senses_after_change(&self) -> Option<&SenseCounts> {
        self.plan.as_ref().map(|p| &p.after)
    }

    /// Fix the per-slice sense counts from the observed `counts`
    ///
    /// In frequency mode the more frequent of the two senses becomes the
    /// primary one; ties keep the base sense primary.
    pub fn compute_distribution_plan(&mut self, counts: &SenseCounts, mode: SenseMode) -> SimResult<&DistributionPlan> {
        if self.plan.is_some() {
            return Err(SimError::PlanAlreadyComputed {
                lemma: self.lemma.clone(),
            });
        }
        let count = |sense: &str| counts.get(sense).copied().unwrap_or(0);
        let base = (self.base_sense.as_str(), count(&self.base_sense));
        let other = (self.other_sense.as_str(), count(&self.other_sense));
        let (primary, secondary) = match mode {
            SenseMode::BaseOther => (base, other),
            SenseMode::Frequency if other.1 > base.1 => (other, base),
            SenseMode::Frequency => (base, other),
        };
        let plan = DistributionPlan::compute(&self.lemma, self.change_result, primary, secondary)?;
        Ok(&*self.plan.insert(plan))
    }

    /// Manifest line for this change, `None` until a plan exists
    pub fn export_row(&self) -> SimResult<Option<ManifestRow>> {
        let Some(plan) = &self.plan else {
            return Ok(None);
        };
        Ok(Some(ManifestRow {
            lemma: self.lemma.clone(),
            pos: self.pos.clone().unwrap_or_default(),
            change_type: self.change_type.clone(),
            change_result: self.change_result,
            base_sense: self.base_sense.clone(),
            other_sense: self.other_sense.clone(),
            counts_before: serde_json::to_string(&plan.before)?,
            counts_after: serde_json::to_string(&plan.after)?,
        }))
    }
}

impl fmt::Display for SimulatedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}, {}",
            self.lemma,
            self.pos.as_deref().unwrap_or("NaN"),
            self.change_type,
            self.change_result
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(result: ChangeResult) -> SimulatedChange {
        let candidate = TargetCandidate::new("bank", Some("NOUN"), "base", "other");
        SimulatedChange::new(&candidate, "metaphor", result)
    }

    fn counts(base: usize, other: usize) -> SenseCounts {
        let mut counts = SenseCounts::new();
        counts.insert("base".to_string(), base);
        counts.insert("other".to_string(), other);
        counts
    }

    #[test]
    fn test_gain_plan() {
        let mut target = change(ChangeResult::Gain);
        let plan = target
            .compute_distribution_plan(&counts(40, 20), SenseMode::BaseOther)
            .unwrap()
            .clone();
        assert_eq!(plan.before, counts(25, 0));
        assert_eq!(plan.after, counts(15, 15));
        assert_eq!(target.senses_before_change(), Some(&counts(25, 0)));
    }

    #[test]
    fn test_loss_plan_is_reversed() {
        let mut target = change(ChangeResult::Loss);
        target
            .compute_distribution_plan(&counts(100, 20), SenseMode::BaseOther)
            .unwrap();
        assert_eq!(target.senses_before_change(), Some(&counts(20, 20)));
        assert_eq!(target.senses_after_change(), Some(&counts(80, 0)));
    }

    #[test]
    fn test_constant_plan_halves_both_senses() {
        let mut target = change(ChangeResult::Constant);
        target
            .compute_distribution_plan(&counts(41, 17), SenseMode::BaseOther)
            .unwrap();
        assert_eq!(target.senses_before_change(), Some(&counts(20, 8)));
        assert_eq!(target.senses_before_change(), target.senses_after_change());
    }

    #[test]
    fn test_insufficient_occurrence() {
        let mut target = change(ChangeResult::Gain);
        let err = target
            .compute_distribution_plan(&counts(30, 5), SenseMode::BaseOther)
            .unwrap_err();
        assert!(matches!(err, SimError::InsufficientOccurrence { primary_count: 30, secondary_count: 5, .. }));
        assert!(target.plan().is_none());

        // A sense that never occurs counts as zero occurrences
        let err = target
            .compute_distribution_plan(&SenseCounts::new(), SenseMode::BaseOther)
            .unwrap_err();
        assert!(matches!(err, SimError::InsufficientOccurrence { primary_count: 0, .. }));
    }

    #[test]
    fn test_plan_is_computed_once() {
        let mut target = change(ChangeResult::Constant);
        target
            .compute_distribution_plan(&counts(40, 20), SenseMode::BaseOther)
            .unwrap();
        assert!(matches!(
            target.compute_distribution_plan(&counts(40, 20), SenseMode::BaseOther),
            Err(SimError::PlanAlreadyComputed { .. })
        ));
    }

    #[test]
    fn test_frequency_mode_swaps_primary_sense() {
        let mut target = change(ChangeResult::Gain);
        let plan = target
            .compute_distribution_plan(&counts(20, 40), SenseMode::Frequency)
            .unwrap();
        assert_eq!(plan.primary, "other");
        assert_eq!(plan.planned(Status::T1, "other"), 25);
        assert_eq!(plan.planned(Status::T1, "base"), 0);
        assert_eq!(plan.planned(Status::T2, "base"), 15);
        assert_eq!(plan.planned(Status::Drop, "base"), 0);
    }

    #[test]
    fn test_export_row() {
        let mut target = change(ChangeResult::Gain);
        assert_eq!(target.export_row().unwrap(), None);
        target
            .compute_distribution_plan(&counts(40, 20), SenseMode::BaseOther)
            .unwrap();
        let row = target.export_row().unwrap().unwrap();
        assert_eq!(row.lemma, "bank");
        assert_eq!(row.pos, "NOUN");
        assert_eq!(row.counts_before, r#"{"base":25,"other":0}"#);
        assert_eq!(row.counts_after, r#"{"base":15,"other":15}"#);
        assert_eq!(target.to_string(), "bank (NOUN): metaphor, gain");
    }
}
