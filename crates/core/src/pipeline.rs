//! The end-to-end detection pipeline
//!
//! Detection, linking, track building and field sampling wired together for
//! one member or a whole ensemble. Every stage takes its configuration from
//! one [`PipelineConfig`]; nothing here keeps state between runs.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_types::track::MemberTracks;
use crate::data::{
    ensemble_diff, ensemble_mean, AnalysisConfig, EnsembleSelection, MemberSeries,
};
use crate::detect::{find_candidates, DetectorConfig};
use crate::error::TrackError;
use crate::sample::{sample_tracks, SamplerConfig};
use crate::track::{build_tracks, link_candidates, BuilderConfig, LinkerConfig};

/// Configuration of every pipeline stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub detector: DetectorConfig,
    pub linker: LinkerConfig,
    pub builder: BuilderConfig,
    pub sampler: SamplerConfig,
}

/// Run the full pipeline for one member series
///
/// `member_index` is recorded on the produced tracks; for aggregated series
/// (ensemble mean or spread) it is conventionally zero.
///
/// # Errors
///
/// Propagates stage failures: range and configuration errors from the date
/// range, consistency errors from the cross-check and the link structure,
/// lookup errors from sampling.
pub fn run_member(
    member: &MemberSeries,
    member_index: usize,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &PipelineConfig,
) -> Result<MemberTracks, TrackError> {
    info!("Tracking member {member_index}: {start} to {end}");
    let mut candidates = find_candidates(member, start, end, &config.detector, &config.analysis)?;
    info!(
        "Member {member_index}: {} candidates over {} timesteps",
        candidates.total_candidates(),
        candidates.len()
    );
    link_candidates(&mut candidates, &config.linker)?;
    let mut member_tracks = build_tracks(&candidates, member_index, &config.builder)?;
    sample_tracks(member, &mut member_tracks.tracks, &config.sampler)?;
    Ok(member_tracks)
}

/// Run the pipeline for an ensemble under the given selection
///
/// `Member(i)` and the two aggregates produce one `MemberTracks` entry;
/// `Full` produces one per member, in member order, processed in parallel.
///
/// # Errors
///
/// Returns [`TrackError::Configuration`] for an invalid selection and
/// propagates per-member failures.
pub fn run_ensemble(
    members: &[MemberSeries],
    selection: EnsembleSelection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    config: &PipelineConfig,
) -> Result<Vec<MemberTracks>, TrackError> {
    selection.validate(members.len())?;
    match selection {
        EnsembleSelection::Member(i) => {
            Ok(vec![run_member(&members[i], i, start, end, config)?])
        }
        EnsembleSelection::Mean => {
            let mean = ensemble_mean(members)?;
            Ok(vec![run_member(&mean, 0, start, end, config)?])
        }
        EnsembleSelection::Diff => {
            let diff = ensemble_diff(members)?;
            Ok(vec![run_member(&diff, 0, start, end, config)?])
        }
        EnsembleSelection::Full => members
            .par_iter()
            .enumerate()
            .map(|(i, member)| run_member(member, i, start, end, config))
            .collect(),
    }
}
