//! Simulation error types
//!
//! Rejected impacts are ordinary control flow for the input layer; everything
//! else is a setup-time or allocation failure that should abort the session.

use std::collections::TryReserveError;
use std::fmt;

use thiserror::Error;

/// Why an impact was refused before touching any state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Coordinates fall outside `[0, N) x [0, N)`
    OutOfBounds,
    /// Cell is on the grid but not part of the disc
    OutsideDisc,
    /// Cell has already broken
    AlreadyBroken,
    /// Session is not accepting impacts (preview or finished)
    NotPlaying,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectReason::OutOfBounds => "out of bounds",
            RejectReason::OutsideDisc => "outside the disc",
            RejectReason::AlreadyBroken => "cell already broken",
            RejectReason::NotPlaying => "session is not playing",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("impact at ({x}, {y}) rejected: {reason}")]
    ImpactRejected { x: i32, y: i32, reason: RejectReason },

    #[error("unknown silhouette `{0}`")]
    UnknownSilhouette(String),

    #[error("silhouette `{name}` is degenerate: {detail}")]
    DegenerateSilhouette { name: String, detail: String },

    #[error("crack queue could not grow beyond {capacity} entries")]
    QueueGrowth {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("failed to read settings: {0}")]
    SettingsIo(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    SettingsParse(#[from] serde_json::Error),
}

impl SimError {
    /// True for impacts refused without side effects; callers skip downstream effects
    pub fn is_rejection(&self) -> bool {
        matches!(self, SimError::ImpactRejected { .. })
    }

    /// Rejection reason, if this is a rejected impact
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            SimError::ImpactRejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub(crate) fn degenerate(name: &str, detail: impl Into<String>) -> Self {
        SimError::DegenerateSilhouette {
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_is_not_fatal() {
        let err = SimError::ImpactRejected {
            x: 3,
            y: 4,
            reason: RejectReason::AlreadyBroken,
        };
        assert!(err.is_rejection());
        assert_eq!(err.reject_reason(), Some(RejectReason::AlreadyBroken));
        assert_eq!(
            err.to_string(),
            "impact at (3, 4) rejected: cell already broken"
        );
    }

    #[test]
    fn test_degenerate_message() {
        let err = SimError::degenerate("star", "only 2 vertices");
        assert!(!err.is_rejection());
        assert!(err.to_string().contains("`star`"));
    }
}
