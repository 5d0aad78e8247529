// Density Curve - Step function from relative song position to intensity level
// Queried once per phrase by the arrangement director

use serde::{Deserialize, Serialize};

use crate::error::ArrangementError;

/// Highest density level
pub const MAX_LEVEL: u8 = 9;

/// Level used whenever no breakpoint interval matches
pub const DEFAULT_LEVEL: u8 = 5;

/// One curve breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityBreakpoint {
    /// Relative position in the song [0.0, 1.0]
    pub position: f64,

    /// Density level [0, 9]
    pub level: u8,
}

/// Ordered breakpoints with non-decreasing positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DensityCurve {
    breakpoints: Vec<DensityBreakpoint>,
    default_level: u8,
}

impl Default for DensityCurve {
    fn default() -> Self {
        DensityCurve::uniform()
    }
}

impl DensityCurve {
    /// Build a curve from explicit breakpoints
    ///
    /// Rejects levels above 9, positions outside [0, 1] and decreasing positions.
    pub fn new(breakpoints: Vec<DensityBreakpoint>) -> Result<Self, ArrangementError> {
        for (i, bp) in breakpoints.iter().enumerate() {
            if bp.level > MAX_LEVEL {
                return Err(ArrangementError::config(format!(
                    "breakpoint {} has level {}, maximum is {}",
                    i, bp.level, MAX_LEVEL
                )));
            }
            if !(0.0..=1.0).contains(&bp.position) {
                return Err(ArrangementError::config(format!(
                    "breakpoint {} has position {} outside [0, 1]",
                    i, bp.position
                )));
            }
        }

        if let Some(i) = breakpoints.windows(2).position(|w| w[1].position < w[0].position) {
            return Err(ArrangementError::config(format!(
                "breakpoint positions decrease between {} and {}",
                i,
                i + 1
            )));
        }

        Ok(DensityCurve {
            breakpoints,
            default_level: DEFAULT_LEVEL,
        })
    }

    /// A curve without breakpoints: every lookup yields the default level
    pub fn uniform() -> Self {
        DensityCurve {
            breakpoints: Vec::new(),
            default_level: DEFAULT_LEVEL,
        }
    }

    /// Replace the fallback level (clamped to 0-9)
    pub fn with_default_level(mut self, level: u8) -> Self {
        self.default_level = level.min(MAX_LEVEL);
        self
    }

    pub fn breakpoints(&self) -> &[DensityBreakpoint] {
        &self.breakpoints
    }

    pub fn default_level(&self) -> u8 {
        self.default_level
    }

    /// Level at a relative position
    ///
    /// Returns the level of the first breakpoint `i` whose interval
    /// `[i-1, i]` contains `position`, or the default level.
    pub fn level_at(&self, position: f64) -> u8 {
        self.breakpoints
            .windows(2)
            .find(|w| w[0].position <= position && position <= w[1].position)
            .map(|w| w[1].level)
            .unwrap_or(self.default_level)
    }
}
