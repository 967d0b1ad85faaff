//! Error types for grade scale construction and mark lookup.
//!
//! Only structural problems are errors. Per-record problems found while
//! grading a batch are collected as [`crate::diagnostics::Diagnostics`]
//! instead of aborting the run.

use serde::Serialize;
use thiserror::Error;

/// An invalid grade scale or threshold definition. Always fatal.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigurationError {
    #[error("grade scale has no bands")]
    EmptyScale,

    #[error("band '{letter}' has a non-finite bound")]
    NonFiniteBound { letter: String },

    #[error("band '{letter}' bounds [{lower}, {upper}] fall outside [0, 100]")]
    BoundsOutOfRange { letter: String, lower: f64, upper: f64 },

    #[error("band '{letter}' is empty: lower bound {lower} is not below upper bound {upper}")]
    EmptyBand { letter: String, lower: f64, upper: f64 },

    #[error("lowest band '{letter}' starts at {lower}, expected 0")]
    DoesNotStartAtZero { letter: String, lower: f64 },

    #[error("highest band '{letter}' ends at {upper}, expected 100")]
    DoesNotReachHundred { letter: String, upper: f64 },

    #[error("gap between band '{below}' (ends {upper}) and band '{above}' (starts {lower})")]
    Gap {
        below: String,
        above: String,
        upper: f64,
        lower: f64,
    },

    #[error("band '{below}' (ends {upper}) overlaps band '{above}' (starts {lower})")]
    Overlap {
        below: String,
        above: String,
        upper: f64,
        lower: f64,
    },

    #[error("grade points decrease from '{below}' ({below_points}) to '{above}' ({above_points})")]
    ReversedPoints {
        below: String,
        above: String,
        below_points: f64,
        above_points: f64,
    },

    #[error("letter '{letter}' is used by more than one band")]
    DuplicateLetter { letter: String },

    #[error("band '{letter}' has a non-finite grade point")]
    NonFiniteGradePoint { letter: String },

    #[error("unknown grade scale preset '{name}'")]
    UnknownPreset { name: String },

    #[error("invalid {name} threshold {value}: must be finite and non-negative")]
    InvalidThreshold { name: String, value: f64 },

    #[error("proportional scale_max {value} must be finite and positive")]
    InvalidScaleMax { value: f64 },

    #[error("scale spec must set exactly one of \"preset\" or \"bands\"")]
    MalformedScaleSpec,
}

/// A mark outside `[0, 100]`, or not a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize)]
#[error("marks {marks} outside [0, 100]")]
pub struct OutOfRangeError {
    pub marks: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_band() {
        let err = ConfigurationError::Gap {
            below: "F".into(),
            above: "D".into(),
            upper: 59.0,
            lower: 60.0,
        };
        assert_eq!(
            err.to_string(),
            "gap between band 'F' (ends 59) and band 'D' (starts 60)"
        );
    }

    #[test]
    fn test_out_of_range_display() {
        let err = OutOfRangeError { marks: 150.0 };
        assert_eq!(err.to_string(), "marks 150 outside [0, 100]");
    }
}
