// Density module
// Pitch-activity density curve and emphasis windows

pub mod analyzer;
pub mod curve;

pub use analyzer::{
    analyze_density, DensityAnalysis, DensityGroup, DensitySettings, EmphasisWindow, PitchSample,
};
pub use curve::{DensityBreakpoint, DensityCurve, DEFAULT_LEVEL, MAX_LEVEL};
