//! Vortex candidates and the per-timestep candidate arena
//!
//! Candidates are stored in one arena per timestep and addressed by stable
//! [`CandidateId`]s instead of holding direct references to each other.
//! Successor links always point into the next timestep's arena and
//! predecessor links into the previous one, so the link structure is acyclic
//! by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::geo::GeoPos;

/// Stable address of a candidate: timestep index plus slot within that step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateId {
    /// Index of the timestep within the processed date range
    pub step: usize,
    /// Slot within that timestep's arena (equals the candidate's `index`)
    pub slot: usize,
}

/// A weaker nearby candidate suppressed into a stronger one
///
/// Suppressed candidates are removed from the active arena, so their data is
/// kept by value on the surviving candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondaryVortex {
    pub pos: GeoPos,
    pub strength: f64,
}

/// One detected extremum at one timestep (the "vortmax")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VortexCandidate {
    /// Sample date of the timestep this candidate belongs to
    pub date: DateTime<Utc>,
    /// Geographic position of the extremum
    pub pos: GeoPos,
    /// Scalar value at the extremum, signed so that larger means stronger
    pub strength: f64,
    /// Stable ordinal among the candidates of this timestep
    pub index: usize,
    /// Suppressed nearby weaker candidates merged into this one
    pub secondary: Vec<SecondaryVortex>,
    /// Link to the matched candidate at the next timestep
    ///
    /// Assigned by the linker; at most one at all times.
    pub successor: Option<CandidateId>,
    /// Links from matched candidates at the previous timestep
    ///
    /// May transiently hold several entries during linking; conflict
    /// resolution reduces it to at most one.
    pub predecessors: Vec<CandidateId>,
}

impl VortexCandidate {
    #[must_use]
    pub fn new(date: DateTime<Utc>, pos: GeoPos, strength: f64) -> Self {
        Self {
            date,
            pos,
            strength,
            index: 0,
            secondary: Vec::new(),
            successor: None,
            predecessors: Vec::new(),
        }
    }
}

/// All candidates of one timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestepCandidates {
    pub date: DateTime<Utc>,
    pub candidates: Vec<VortexCandidate>,
}

/// Candidate arenas for a contiguous date range, one per timestep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSeries {
    steps: Vec<TimestepCandidates>,
}

impl CandidateSeries {
    #[must_use]
    pub fn new(steps: Vec<TimestepCandidates>) -> Self {
        Self { steps }
    }

    #[must_use]
    pub fn steps(&self) -> &[TimestepCandidates] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [TimestepCandidates] {
        &mut self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Candidate behind an id
    ///
    /// # Panics
    ///
    /// Panics if the id does not address a live candidate. Ids are only ever
    /// minted by the detector for this series, so a miss is a logic error.
    #[must_use]
    pub fn get(&self, id: CandidateId) -> &VortexCandidate {
        &self.steps[id.step].candidates[id.slot]
    }

    /// Iterate over every (id, candidate) pair in step then slot order
    pub fn iter_ids(&self) -> impl Iterator<Item = (CandidateId, &VortexCandidate)> {
        self.steps.iter().enumerate().flat_map(|(step, ts)| {
            ts.candidates
                .iter()
                .enumerate()
                .map(move |(slot, c)| (CandidateId { step, slot }, c))
        })
    }

    /// Total candidate count across all timesteps
    #[must_use]
    pub fn total_candidates(&self) -> usize {
        self.steps.iter().map(|ts| ts.candidates.len()).sum()
    }
}
