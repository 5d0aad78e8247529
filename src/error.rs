// Arrangement errors
// The single fatal error kind shared by every stage of the arrangement pass

use thiserror::Error;

/// Fatal, non-recoverable errors raised while building an arrangement
///
/// Everything that can be recovered locally (quantization fallbacks,
/// degenerate density input, chord diversity exhaustion) never reaches
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrangementError {
    /// Upstream data is corrupt, e.g. a chord root outside the pitch table
    #[error("Invalid musical data: {0}")]
    InvalidMusicalData(String),

    /// A configuration table or setting is malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl ArrangementError {
    pub fn musical(message: impl Into<String>) -> Self {
        ArrangementError::InvalidMusicalData(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        ArrangementError::InvalidConfiguration(message.into())
    }
}
