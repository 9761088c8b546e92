//! Derived-field computation: vorticity stencils, extrema scan, smoothing

pub mod extrema;
pub mod smoothing;
pub mod vorticity;

pub use extrema::{find_extrema, ExtremaSet, GridPoint, ValuedExtrema};
pub use smoothing::gaussian_smooth;
pub use vorticity::{compute_vorticity, vorticity_2nd, vorticity_4th, VorticityConfig};
