//! Per-timestep vortex candidate detection
//!
//! Raw extrema of the target field become typed candidates, are filtered by
//! a geographic bounding box and a magnitude cutoff, and finally deduplicated:
//! of any two surviving candidates closer than the dedup cutoff, the weaker
//! is merged into the stronger as a secondary vortex and removed from the
//! active set. Surviving candidates get stable ordinals in discovery order.
//!
//! Detection is stateless per timestep and runs in parallel across the
//! requested date range.

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core_types::candidate::{
    CandidateSeries, SecondaryVortex, TimestepCandidates, VortexCandidate,
};
use crate::core_types::geo::{DistanceMetric, GeoPos};
use crate::data::{analyze_step, AnalysisConfig, MemberSeries};
use crate::error::TrackError;

/// Which field's extrema seed the candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectionTarget {
    /// Relative-vorticity maxima (the default storm proxy)
    #[default]
    VorticityMaxima,
    /// Sea-level-pressure minima (storm-centre variant)
    PressureMinima,
}

/// Geographic bounding box filter, degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl GeoBounds {
    #[must_use]
    pub fn contains(&self, pos: GeoPos) -> bool {
        self.lon_min < pos.lon
            && pos.lon < self.lon_max
            && self.lat_min < pos.lat
            && pos.lat < self.lat_max
    }
}

impl Default for GeoBounds {
    /// North Atlantic tropical-cyclone basin
    fn default() -> Self {
        Self {
            lon_min: 260.0,
            lon_max: 340.0,
            lat_min: 0.0,
            lat_max: 60.0,
        }
    }
}

/// Configuration of the candidate finder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub target: DetectionTarget,
    /// Geographic range filter; `None` disables it
    pub bounds: Option<GeoBounds>,
    /// Minimum signed strength; `None` disables the cutoff
    pub strength_cutoff: Option<f64>,
    /// Distance metric for secondary-vortex suppression
    pub metric: DistanceMetric,
    /// Suppression distance, in the metric's units; `None` disables dedup
    pub dedup_cutoff: Option<f64>,
}

impl Default for DetectorConfig {
    /// Vorticity-maxima detection tuned for a 2-degree grid
    fn default() -> Self {
        let metric = DistanceMetric::GreatCircle;
        Self {
            target: DetectionTarget::VorticityMaxima,
            bounds: Some(GeoBounds::default()),
            strength_cutoff: Some(2.5e-5),
            metric,
            dedup_cutoff: Some(metric.grid_step_cutoff(2.0, 5.0)),
        }
    }
}

impl DetectorConfig {
    /// Pressure-minima detection: same spatial filters, no magnitude cutoff
    #[must_use]
    pub fn pressure_minima() -> Self {
        Self {
            target: DetectionTarget::PressureMinima,
            strength_cutoff: None,
            ..Self::default()
        }
    }
}

/// Signed strength of a raw extremum: larger always means stronger
///
/// Pressure minima are negated so that deeper lows rank above shallower ones
/// under the same comparisons as vorticity maxima.
fn signed_strength(target: DetectionTarget, value: f64) -> f64 {
    match target {
        DetectionTarget::VorticityMaxima => value,
        DetectionTarget::PressureMinima => -value,
    }
}

/// Detect candidates for one timestep from its raw extrema
fn detect_step(
    date: DateTime<Utc>,
    raw: &[(f64, GeoPos)],
    config: &DetectorConfig,
) -> TimestepCandidates {
    let mut active: Vec<VortexCandidate> = Vec::new();
    for &(value, pos) in raw {
        if let Some(bounds) = &config.bounds {
            if !bounds.contains(pos) {
                continue;
            }
        }
        let strength = signed_strength(config.target, value);
        if let Some(cutoff) = config.strength_cutoff {
            if strength < cutoff {
                continue;
            }
        }
        active.push(VortexCandidate::new(date, pos, strength));
    }

    if let Some(cutoff) = config.dedup_cutoff {
        // Pairwise pass over the filtered set; the weaker of any close pair
        // is attached to the stronger and marked for removal. Ties demote
        // the earlier-found candidate, keeping the scan order stable.
        let n = active.len();
        let mut suppressed = vec![false; n];
        for i in 0..n {
            for j in i + 1..n {
                if config.metric.distance(active[i].pos, active[j].pos) >= cutoff {
                    continue;
                }
                let (winner, loser) = if active[i].strength > active[j].strength {
                    (i, j)
                } else {
                    (j, i)
                };
                let satellite = SecondaryVortex {
                    pos: active[loser].pos,
                    strength: active[loser].strength,
                };
                active[winner].secondary.push(satellite);
                suppressed[loser] = true;
            }
        }
        let mut keep = suppressed.iter();
        active.retain(|_| !keep.next().copied().unwrap_or(false));
    }

    for (i, c) in active.iter_mut().enumerate() {
        c.index = i;
    }
    TimestepCandidates {
        date,
        candidates: active,
    }
}

/// Find vortex candidates over a date range of one member series
///
/// The range is inclusive and must lie fully inside the series' sample
/// dates. Timesteps are processed in parallel.
///
/// # Errors
///
/// Returns [`TrackError::Range`] for an out-of-range date,
/// [`TrackError::Configuration`] for a reversed range, and propagates
/// analysis failures (vorticity cross-check).
pub fn find_candidates(
    member: &MemberSeries,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    detector: &DetectorConfig,
    analysis: &AnalysisConfig,
) -> Result<CandidateSeries, TrackError> {
    let (start_idx, end_idx) = member.range_indices(start, end)?;
    let coords = member.coords();
    let spacing = coords.spacing();

    let steps: Result<Vec<TimestepCandidates>, TrackError> = (start_idx..=end_idx)
        .into_par_iter()
        .map(|idx| {
            let date = member.dates()[idx];
            info!("Finding vortex candidates: {date}");
            let step_analysis = analyze_step(&member.steps()[idx], coords, &spacing, analysis)?;
            let raw = match detector.target {
                DetectionTarget::VorticityMaxima => &step_analysis.vort_maxima,
                DetectionTarget::PressureMinima => &step_analysis.pressure_minima,
            };
            Ok(detect_step(date, raw, detector))
        })
        .collect();

    Ok(CandidateSeries::new(steps?))
}
