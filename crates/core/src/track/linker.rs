//! Linking candidates across consecutive timesteps
//!
//! Linking runs in two phases. First, every candidate greedily picks its
//! nearest neighbour at the next timestep within the cutoff distance as its
//! successor, recording itself as a predecessor on the target. Several
//! candidates may converge on one target in this phase. Second, every
//! candidate with multiple predecessors keeps only the nearest one; the
//! losing predecessors have their successor link severed and their chains
//! end there. After both phases every candidate carries at most one
//! successor and at most one predecessor.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core_types::candidate::{CandidateId, CandidateSeries};
use crate::core_types::geo::DistanceMetric;
use crate::error::TrackError;

/// Configuration of the candidate linker
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Distance metric for successor matching
    pub metric: DistanceMetric,
    /// Maximum distance a vortex may travel in one timestep, metric units
    pub cutoff: f64,
}

impl Default for LinkerConfig {
    /// Eight grid steps of a 2-degree grid per 6-hour timestep
    fn default() -> Self {
        let metric = DistanceMetric::GreatCircle;
        Self {
            metric,
            cutoff: metric.grid_step_cutoff(2.0, 8.0),
        }
    }
}

/// Link candidates of consecutive timesteps into successor chains
///
/// # Errors
///
/// Returns [`TrackError::Consistency`] if the final link structure violates
/// the one-successor/one-predecessor invariant.
pub fn link_candidates(
    series: &mut CandidateSeries,
    config: &LinkerConfig,
) -> Result<(), TrackError> {
    // Phase 1: greedy nearest-neighbour matching, forward in time. Ties go
    // to the lower slot so results do not depend on scan order.
    for step in 0..series.len().saturating_sub(1) {
        let (head, tail) = series.steps_mut().split_at_mut(step + 1);
        let current = &mut head[step];
        let next = &mut tail[0];

        for (slot, candidate) in current.candidates.iter_mut().enumerate() {
            let mut best: Option<(usize, f64)> = None;
            for (next_slot, target) in next.candidates.iter().enumerate() {
                let dist = config.metric.distance(candidate.pos, target.pos);
                if dist < config.cutoff && best.is_none_or(|(_, d)| dist < d) {
                    best = Some((next_slot, dist));
                }
            }
            if let Some((next_slot, _)) = best {
                candidate.successor = Some(CandidateId {
                    step: step + 1,
                    slot: next_slot,
                });
                next.candidates[next_slot].predecessors.push(CandidateId { step, slot });
            }
        }
    }

    // Phase 2: resolve convergences. Each contested candidate keeps the
    // nearest predecessor; the rest lose their successor link.
    for step in 1..series.len() {
        let mut resolutions: Vec<(usize, CandidateId, Vec<CandidateId>)> = Vec::new();
        for (slot, candidate) in series.steps()[step].candidates.iter().enumerate() {
            if candidate.predecessors.len() <= 1 {
                continue;
            }
            let mut winner = candidate.predecessors[0];
            let mut winner_dist = config.metric.distance(series.get(winner).pos, candidate.pos);
            for &pred in &candidate.predecessors[1..] {
                let dist = config.metric.distance(series.get(pred).pos, candidate.pos);
                if dist < winner_dist {
                    winner = pred;
                    winner_dist = dist;
                }
            }
            let losers = candidate
                .predecessors
                .iter()
                .copied()
                .filter(|&p| p != winner)
                .collect();
            resolutions.push((slot, winner, losers));
        }

        for (slot, winner, losers) in resolutions {
            debug!(
                "Resolving {} predecessors at step {step} slot {slot}",
                losers.len() + 1
            );
            for loser in losers {
                series.steps_mut()[loser.step].candidates[loser.slot].successor = None;
            }
            series.steps_mut()[step].candidates[slot].predecessors = vec![winner];
        }
    }

    verify_links(series)
}

/// Check the one-successor/one-predecessor invariant and link reciprocity
fn verify_links(series: &CandidateSeries) -> Result<(), TrackError> {
    for (id, candidate) in series.iter_ids() {
        if candidate.predecessors.len() > 1 {
            return Err(TrackError::Consistency(format!(
                "candidate at step {} slot {} kept {} predecessors after resolution",
                id.step,
                id.slot,
                candidate.predecessors.len()
            )));
        }
        if let Some(succ) = candidate.successor {
            if !series.get(succ).predecessors.contains(&id) {
                return Err(TrackError::Consistency(format!(
                    "successor link from step {} slot {} is not reciprocated",
                    id.step, id.slot
                )));
            }
        }
    }
    Ok(())
}
