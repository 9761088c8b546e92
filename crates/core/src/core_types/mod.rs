//! Core types and utilities

pub mod candidate;
pub mod geo;
pub mod grid;
pub mod track;

pub use candidate::{
    CandidateId, CandidateSeries, SecondaryVortex, TimestepCandidates, VortexCandidate,
};
pub use geo::{
    great_circle_dist, planar_dist, DistanceMetric, GeoPos, EARTH_CIRC_KM, EARTH_CIRC_M,
    EARTH_RADIUS_KM,
};
pub use grid::{GridCoords, GridSpacing, ScalarGrid};
pub use track::{AuxSample, MemberTracks, Track, TrackAnnotations, TrackPoint};
