//! Linking candidates through time and materializing tracks

pub mod builder;
pub mod linker;

pub use builder::{build_tracks, BuilderConfig};
pub use linker::{link_candidates, LinkerConfig};
