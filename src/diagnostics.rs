//! Non-fatal issues collected while grading and aggregating a batch.
//!
//! Every result that can encounter bad data carries a [`Diagnostics`] next
//! to it, so callers decide whether to halt or proceed.

use serde::Serialize;
use tracing::warn;

use crate::error::OutOfRangeError;

/// Why a record was excluded from grading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    OutOfRange(OutOfRangeError),
    InvalidCreditHours { credit_hours: f64 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::OutOfRange(e) => write!(f, "{e}"),
            SkipReason::InvalidCreditHours { credit_hours } => {
                write!(f, "credit hours {credit_hours} must be finite and non-negative")
            }
        }
    }
}

/// A record left out of every computation, with its position in the set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub student_id: String,
    pub course_code: String,
    pub reason: SkipReason,
}

/// Suspicious input that was resolved with a documented fallback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// A later record disagrees with the first-seen name or department.
    /// The first value is kept.
    ConflictingMetadata {
        student_id: String,
        field: String,
        kept: String,
        conflicting: String,
    },
    /// Two or more departments tie for the largest share of a student's
    /// credit hours. The student is attributed to `chosen`.
    AmbiguousDepartment {
        student_id: String,
        candidates: Vec<String>,
        chosen: String,
    },
    /// The label has no recognisable season and year, so it sorts into the
    /// trailing unordered bucket.
    UnparseableSemester { label: String },
}

/// A metric that could not be computed and was marked undefined.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UndefinedResultWarning {
    ZeroCreditHours { student_id: String },
    EmptyCohort { scope: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub skipped: Vec<SkippedRecord>,
    pub data_quality: Vec<DataQualityWarning>,
    pub undefined: Vec<UndefinedResultWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.data_quality.is_empty() && self.undefined.is_empty()
    }

    pub fn skip(&mut self, record: SkippedRecord) {
        warn!(
            index = record.index,
            student_id = %record.student_id,
            course_code = %record.course_code,
            reason = %record.reason,
            "Record skipped"
        );
        self.skipped.push(record);
    }

    pub fn data_quality(&mut self, warning: DataQualityWarning) {
        warn!(?warning, "Data quality issue");
        self.data_quality.push(warning);
    }

    pub fn undefined(&mut self, warning: UndefinedResultWarning) {
        warn!(?warning, "Metric undefined");
        self.undefined.push(warning);
    }

    /// Appends `other`, keeping its entries after the existing ones.
    pub fn extend(&mut self, other: Diagnostics) {
        self.skipped.extend(other.skipped);
        self.data_quality.extend(other.data_quality);
        self.undefined.extend(other.undefined);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_diagnostics_are_clean() {
        assert!(Diagnostics::new().is_clean());
    }

    #[test]
    fn test_extend_preserves_order() {
        let mut a = Diagnostics::new();
        a.undefined(UndefinedResultWarning::EmptyCohort {
            scope: "cohort".into(),
        });
        let mut b = Diagnostics::new();
        b.undefined(UndefinedResultWarning::ZeroCreditHours {
            student_id: "S9".into(),
        });

        a.extend(b);

        assert_eq!(a.undefined.len(), 2);
        assert!(matches!(
            a.undefined[1],
            UndefinedResultWarning::ZeroCreditHours { .. }
        ));
    }

    #[test]
    fn test_skip_reason_serializes_with_kind() {
        let reason = SkipReason::OutOfRange(OutOfRangeError { marks: 150.0 });
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "out_of_range");
        assert_eq!(json["marks"], 150.0);
    }
}
