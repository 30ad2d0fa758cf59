use crate::change::SimulatedChange;
use crate::error::{SimError, SimResult};
use crate::types::TargetCandidate;
use log::{debug, info};
use rand::seq::index::sample;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Lemmas and senses already taken by selected targets
#[derive(Debug, Clone, Default)]
pub struct ClaimedTargets {
    lemmas: HashSet<String>,
    base_senses: HashSet<String>,
    other_senses: HashSet<String>,
}

impl ClaimedTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_changes<'a>(changes: impl IntoIterator<Item = &'a SimulatedChange>) -> Self {
        let mut claimed = Self::new();
        for change in changes {
            claimed.lemmas.insert(change.lemma().to_string());
            claimed.base_senses.insert(change.base_sense().to_string());
            claimed.other_senses.insert(change.other_sense().to_string());
        }
        claimed
    }

    pub fn claim(&mut self, candidate: &TargetCandidate) {
        self.lemmas.insert(candidate.lemma.clone());
        self.base_senses.insert(candidate.base_sense.clone());
        self.other_senses.insert(candidate.other_sense.clone());
    }

    /// Whether any field of `candidate` is already taken
    pub fn collides(&self, candidate: &TargetCandidate) -> bool {
        self.lemmas.contains(&candidate.lemma)
            || self.base_senses.contains(&candidate.base_sense)
            || self.other_senses.contains(&candidate.other_sense)
    }
}

/// Targets drawn for one change type
#[derive(Debug, Clone)]
pub struct Selection {
    pub targets: Vec<TargetCandidate>,
    /// Number of re-draws needed to resolve collisions
    pub retries: usize,
}

/// Draws `n` targets of one change type
#[derive(Debug)]
pub struct TargetSelector<'a> {
    change_type: &'a str,
    pool: &'a [TargetCandidate],
}

impl<'a> TargetSelector<'a> {
    pub fn new(change_type: &'a str, pool: &'a [TargetCandidate]) -> Self {
        Self { change_type, pool }
    }

    /// Sample `n` candidates uniformly without replacement
    ///
    /// Rows that collide with `claimed` or with an earlier row of the same draw
    /// are discarded and replaced by fresh draws from the rest of the pool until
    /// the draw is clean. Fails with `InsufficientPool` once the pool cannot
    /// supply enough replacements.
    pub fn select<R: Rng + ?Sized>(&self, n: usize, claimed: &ClaimedTargets, rng: &mut R) -> SimResult<Selection> {
        let mut available: Vec<TargetCandidate> = self.pool.to_vec();
        let mut targets: Vec<TargetCandidate> = self.draw(&mut available, n, rng)?;
        let mut retries = 0;

        loop {
            match find_duplicates(&targets, claimed) {
                Ok(()) => break,
                Err((offending, err)) => {
                    info!("{}, retrying.", err);
                    let mut index = 0;
                    targets.retain(|_| {
                        let keep = !offending.contains(&index);
                        index += 1;
                        keep
                    });
                    let replacements = self.draw(&mut available, offending.len(), rng)?;
                    targets.extend(replacements);
                    retries += 1;
                }
            }
        }

        debug!(
            "Selected {} targets for {} after {} retries",
            targets.len(),
            self.change_type,
            retries
        );
        Ok(Selection { targets, retries })
    }

    /// Move `k` random rows out of `available`
    fn draw<R: Rng + ?Sized>(
        &self,
        available: &mut Vec<TargetCandidate>,
        k: usize,
        rng: &mut R,
    ) -> SimResult<Vec<TargetCandidate>> {
        if available.len() < k {
            return Err(SimError::InsufficientPool {
                change_type: self.change_type.to_string(),
                requested: k,
                available: available.len(),
            });
        }
        let mut picked = sample(rng, available.len(), k).into_vec();
        picked.sort_unstable_by(|a, b| b.cmp(a));
        // Descending order keeps swap_remove from moving a row that is still to be picked
        let mut drawn: Vec<TargetCandidate> = picked.into_iter().map(|i| available.swap_remove(i)).collect();
        drawn.shuffle(rng);
        Ok(drawn)
    }
}

/// Positions of rows that repeat a lemma or sense of an earlier row or of a
/// claimed target
fn find_duplicates(
    targets: &[TargetCandidate],
    claimed: &ClaimedTargets,
) -> Result<(), (HashSet<usize>, SimError)> {
    let mut seen = ClaimedTargets::new();
    let mut offending = HashSet::new();
    let mut lemmas = Vec::new();
    for (i, target) in targets.iter().enumerate() {
        if claimed.collides(target) || seen.collides(target) {
            offending.insert(i);
            lemmas.push(target.lemma.clone());
        } else {
            seen.claim(target);
        }
    }
    if offending.is_empty() {
        Ok(())
    } else {
        Err((offending, SimError::DuplicateTarget { lemmas }))
    }
}
