//! Cyclone Detection and Tracking Core Library
//!
//! Detects and tracks cyclonic vortices in gridded atmospheric reanalysis
//! fields. Vortices are found as local extrema of derived relative vorticity
//! (or of sea-level pressure), linked across timesteps by nearest-neighbour
//! matching, materialized into tracks and annotated with local field
//! statistics such as peak windspeed and refined pressure minima.
//!
//! ## Pipeline
//!
//! - Per-timestep analysis: vorticity stencils, optional smoothing, extrema
//! - Candidate detection: basin and strength filters, secondary-vortex merging
//! - Linking: greedy nearest-neighbour matching with conflict resolution
//! - Track building: maximal chains, minimum-length filter
//! - Sampling: windowed field statistics attached to every track point
//!
//! Ensembles are handled explicitly: run one member, a cell-wise aggregate
//! (mean or spread), or every member independently.

// Shared data model
pub mod core_types;

// Input fields and ensemble aggregation
pub mod data;

// Derived-field computation
pub mod fields;

// Detection, linking, building, sampling
pub mod detect;
pub mod sample;
pub mod track;

// End-to-end driver and result storage
pub mod error;
pub mod persistence;
pub mod pipeline;

// Analytic test inputs
pub mod synthetic;

// Re-export the data model
pub use core_types::{
    CandidateId, CandidateSeries, DistanceMetric, GeoPos, GridCoords, GridSpacing, MemberTracks,
    ScalarGrid, SecondaryVortex, TimestepCandidates, Track, TrackPoint, VortexCandidate,
};

// Re-export the pipeline surface
pub use data::{ensemble_diff, ensemble_mean, AnalysisConfig, EnsembleSelection, MemberSeries, StepFields};
pub use detect::{find_candidates, DetectionTarget, DetectorConfig, GeoBounds};
pub use error::TrackError;
pub use persistence::{load_tracks, save_tracks, PersistenceError};
pub use pipeline::{run_ensemble, run_member, PipelineConfig};
pub use sample::{sample_tracks, SamplerConfig};
pub use track::{build_tracks, link_candidates, BuilderConfig, LinkerConfig};

// Route tracing output through the test harness, filtered by RUST_LOG.
#[cfg(test)]
#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
