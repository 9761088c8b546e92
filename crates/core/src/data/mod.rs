//! Per-timestep input fields and ensemble handling
//!
//! The engine consumes already-materialized grids: per timestep a pressure
//! field, the two wind components and optional auxiliary scalars, all shaped
//! by one set of coordinate arrays. There is no ambient "current date" state
//! anywhere; every query takes the step context explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::geo::GeoPos;
use crate::core_types::grid::{GridCoords, GridSpacing, ScalarGrid};
use crate::error::TrackError;
use crate::fields::extrema::find_extrema;
use crate::fields::smoothing::gaussian_smooth;
use crate::fields::vorticity::{compute_vorticity, VorticityConfig};

/// Optional auxiliary scalar fields of one timestep
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxFields {
    /// Temperature at 850 hPa (K)
    pub t850: Option<ScalarGrid>,
    /// Near-surface temperature (K)
    pub t995: Option<ScalarGrid>,
    /// Convective available potential energy (J/kg)
    pub cape: Option<ScalarGrid>,
    /// Precipitable water (kg/m2)
    pub pwat: Option<ScalarGrid>,
}

/// The input grids of one timestep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFields {
    /// Sea-level pressure (Pa)
    pub psl: ScalarGrid,
    /// Zonal wind component (m/s)
    pub u: ScalarGrid,
    /// Meridional wind component (m/s)
    pub v: ScalarGrid,
    /// Auxiliary scalars, sampled per track cell only
    pub aux: AuxFields,
}

/// One ensemble member's contiguous time series of input fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSeries {
    coords: GridCoords,
    dates: Vec<DateTime<Utc>>,
    steps: Vec<StepFields>,
}

impl MemberSeries {
    /// Assemble a series from grids and their sample dates
    ///
    /// # Panics
    ///
    /// Panics if no dates are given, the dates are not strictly increasing,
    /// the step count does not match the date count, or any grid's shape
    /// disagrees with the coordinate arrays. These are caller contract
    /// violations, not runtime conditions.
    #[must_use]
    pub fn new(coords: GridCoords, dates: Vec<DateTime<Utc>>, steps: Vec<StepFields>) -> Self {
        assert!(!dates.is_empty(), "A member series needs at least one timestep");
        assert_eq!(dates.len(), steps.len(), "One field set per sample date");
        assert!(
            dates.windows(2).all(|w| w[0] < w[1]),
            "Sample dates must be strictly increasing"
        );
        for step in &steps {
            assert!(
                coords.matches(&step.psl) && coords.matches(&step.u) && coords.matches(&step.v),
                "Field shapes must match the coordinate arrays"
            );
        }
        Self {
            coords,
            dates,
            steps,
        }
    }

    #[must_use]
    pub fn coords(&self) -> &GridCoords {
        &self.coords
    }

    #[must_use]
    pub fn dates(&self) -> &[DateTime<Utc>] {
        &self.dates
    }

    #[must_use]
    pub fn steps(&self) -> &[StepFields] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Index of an exact sample date
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Range`] when the date is not a sample of this
    /// series — a request error, never silently clamped.
    pub fn date_index(&self, date: DateTime<Utc>) -> Result<usize, TrackError> {
        self.dates
            .iter()
            .position(|&d| d == date)
            .ok_or_else(|| TrackError::Range {
                requested: date,
                first: self.dates[0],
                last: self.dates[self.dates.len() - 1],
            })
    }

    /// Inclusive index range for a start/end date pair
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Range`] when either date is not a sample, and
    /// [`TrackError::Configuration`] when the dates are reversed.
    pub fn range_indices(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(usize, usize), TrackError> {
        let start_idx = self.date_index(start)?;
        let end_idx = self.date_index(end)?;
        if start_idx > end_idx {
            return Err(TrackError::Configuration(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        Ok((start_idx, end_idx))
    }
}

/// Which realization(s) of the ensemble to process
///
/// Closed variant type; each case carries only the data it needs and the
/// pipeline matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnsembleSelection {
    /// One member by index
    Member(usize),
    /// Cell-wise ensemble mean of every field
    Mean,
    /// Cell-wise ensemble spread (max minus min) of every field
    Diff,
    /// Every member, processed independently
    Full,
}

impl EnsembleSelection {
    /// Check the selection against the available member count
    ///
    /// # Errors
    ///
    /// Returns [`TrackError::Configuration`] for an out-of-range member
    /// index; the message enumerates the valid modes.
    pub fn validate(self, n_members: usize) -> Result<(), TrackError> {
        if n_members == 0 {
            return Err(TrackError::Configuration(
                "No ensemble members supplied; valid selections are \
                 Member(i), Mean, Diff and Full"
                    .to_string(),
            ));
        }
        if let EnsembleSelection::Member(i) = self {
            if i >= n_members {
                return Err(TrackError::Configuration(format!(
                    "Ensemble member {i} out of range 0..{n_members}; \
                     valid selections are Member(i), Mean, Diff and Full"
                )));
            }
        }
        Ok(())
    }
}

fn check_members_aligned(members: &[MemberSeries]) -> Result<(), TrackError> {
    let first = &members[0];
    for m in &members[1..] {
        if m.coords != first.coords || m.dates != first.dates {
            return Err(TrackError::Consistency(
                "Ensemble members must share coordinates and sample dates".to_string(),
            ));
        }
    }
    Ok(())
}

fn combine_grids<F: Fn(&mut f64, f64)>(acc: &mut ScalarGrid, other: &ScalarGrid, f: F) {
    for (a, &b) in acc.as_mut_slice().iter_mut().zip(other.as_slice()) {
        f(a, b);
    }
}

fn aggregate_steps<F: Fn(&[&ScalarGrid]) -> ScalarGrid>(
    members: &[MemberSeries],
    combine: F,
) -> Vec<StepFields> {
    let n_steps = members[0].len();
    (0..n_steps)
        .map(|s| {
            let pick = |get: fn(&StepFields) -> &ScalarGrid| {
                let grids: Vec<&ScalarGrid> = members.iter().map(|m| get(&m.steps[s])).collect();
                combine(&grids)
            };
            StepFields {
                psl: pick(|f| &f.psl),
                u: pick(|f| &f.u),
                v: pick(|f| &f.v),
                // Auxiliary fields are member-level diagnostics; aggregated
                // series carry none.
                aux: AuxFields::default(),
            }
        })
        .collect()
}

/// Cell-wise ensemble mean of every field
///
/// # Errors
///
/// Returns [`TrackError::Consistency`] when members disagree on coordinates
/// or dates, [`TrackError::Configuration`] when no members are supplied.
pub fn ensemble_mean(members: &[MemberSeries]) -> Result<MemberSeries, TrackError> {
    EnsembleSelection::Mean.validate(members.len())?;
    check_members_aligned(members)?;
    let n = members.len() as f64;
    let steps = aggregate_steps(members, |grids| {
        let mut acc = grids[0].clone();
        for g in &grids[1..] {
            combine_grids(&mut acc, g, |a, b| *a += b);
        }
        for a in acc.as_mut_slice() {
            *a /= n;
        }
        acc
    });
    Ok(MemberSeries::new(
        members[0].coords.clone(),
        members[0].dates.clone(),
        steps,
    ))
}

/// Cell-wise ensemble spread (max minus min) of every field
///
/// # Errors
///
/// Returns [`TrackError::Consistency`] when members disagree on coordinates
/// or dates, [`TrackError::Configuration`] when no members are supplied.
pub fn ensemble_diff(members: &[MemberSeries]) -> Result<MemberSeries, TrackError> {
    EnsembleSelection::Diff.validate(members.len())?;
    check_members_aligned(members)?;
    let steps = aggregate_steps(members, |grids| {
        let mut max = grids[0].clone();
        let mut min = grids[0].clone();
        for g in &grids[1..] {
            combine_grids(&mut max, g, |a, b| *a = a.max(b));
            combine_grids(&mut min, g, |a, b| *a = a.min(b));
        }
        combine_grids(&mut max, &min, |a, b| *a -= b);
        max
    });
    Ok(MemberSeries::new(
        members[0].coords.clone(),
        members[0].dates.clone(),
        steps,
    ))
}

/// Configuration of the per-step derived-field analysis
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub vorticity: VorticityConfig,
    /// Gaussian sigma (in cells) applied to the vorticity field before
    /// extrema detection; `None` disables smoothing
    pub smoothing_sigma: Option<f64>,
}

/// Derived fields and extrema of one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct StepAnalysis {
    /// Relative vorticity (second-order stencil, optionally smoothed)
    pub vort: ScalarGrid,
    /// Vorticity maxima as (value, position)
    pub vort_maxima: Vec<(f64, GeoPos)>,
    /// Pressure minima as (value, position)
    pub pressure_minima: Vec<(f64, GeoPos)>,
}

/// Analyze one timestep: vorticity plus the extrema of both target fields
///
/// Pure function of its inputs; safe to run in parallel across timesteps.
///
/// # Errors
///
/// Returns [`TrackError::Consistency`] when the vorticity cross-check is
/// enabled and fails.
pub fn analyze_step(
    fields: &StepFields,
    coords: &GridCoords,
    spacing: &GridSpacing,
    config: &AnalysisConfig,
) -> Result<StepAnalysis, TrackError> {
    let mut vort = compute_vorticity(&fields.u, &fields.v, spacing, &config.vorticity)?;
    if let Some(sigma) = config.smoothing_sigma {
        vort = gaussian_smooth(&vort, sigma);
    }

    let vort_maxima = find_extrema(&vort).valued(&vort, coords).maxima;
    let pressure_minima = find_extrema(&fields.psl)
        .valued(&fields.psl, coords)
        .minima;

    Ok(StepAnalysis {
        vort,
        vort_maxima,
        pressure_minima,
    })
}
