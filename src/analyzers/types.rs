//! Read-only summary views produced by the aggregations.

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::metric::Metric;

/// An aggregation result with the issues found while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis<T> {
    pub result: T,
    pub diagnostics: Diagnostics,
}

impl<T> Analysis<T> {
    pub fn new(result: T, diagnostics: Diagnostics) -> Self {
        Self {
            result,
            diagnostics,
        }
    }
}

/// GPA statistics over a set of students.
///
/// Only students with a defined GPA enter the statistics and the pass rate;
/// `student_count` counts everyone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    pub student_count: usize,
    pub defined_gpa_count: usize,
    /// Distinct course codes among the students' valid records.
    pub course_count: usize,
    pub total_credit_hours: f64,
    pub mean_gpa: Metric,
    pub median_gpa: Metric,
    pub std_gpa: Metric,
    pub min_gpa: Metric,
    pub max_gpa: Metric,
    /// Fraction (0..=1) of students whose GPA meets the passing threshold.
    pub pass_rate: Metric,
    pub passing_count: usize,
    pub failing_count: usize,
}

/// Highest-marks record in a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopScore {
    pub student_id: String,
    pub name: String,
    pub marks: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectSummary {
    pub course_code: String,
    pub course_name: String,
    pub credit_hours: f64,
    /// Valid records for this course.
    pub enrollment: usize,
    pub mean_marks: Metric,
    /// Fraction (0..=1) of records at or above the passing grade point.
    pub pass_rate: Metric,
    pub passing_count: usize,
    pub top_scorer: Option<TopScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentSummary {
    pub department: String,
    #[serde(flatten)]
    pub summary: CohortSummary,
}

/// Which department a student was counted under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentAttribution {
    pub student_id: String,
    pub department: String,
    /// Credit hours the student earned in `department`.
    pub credit_hours: f64,
    /// True when another department tied for the largest share.
    pub ambiguous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

/// Sort key for a semester label. Parsed labels order by year then season;
/// [`SemesterOrder::Unordered`] sorts after all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemesterOrder {
    Chronological { year: i32, season: Season },
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemesterPoint {
    pub semester: String,
    pub order: SemesterOrder,
    pub student_count: usize,
    pub record_count: usize,
    /// Mean of the students' term GPAs.
    pub mean_gpa: Metric,
    pub median_gpa: Metric,
    /// Fraction (0..=1) of students whose term GPA meets the passing threshold.
    pub pass_rate: Metric,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SemesterTrend {
    /// Chronological points first, then the unordered bucket.
    pub points: Vec<SemesterPoint>,
}

impl SemesterTrend {
    fn split(&self) -> usize {
        self.points
            .partition_point(|p| p.order != SemesterOrder::Unordered)
    }

    pub fn ordered(&self) -> &[SemesterPoint] {
        &self.points[..self.split()]
    }

    /// Labels that could not be placed on the timeline.
    pub fn unordered(&self) -> &[SemesterPoint] {
        &self.points[self.split()..]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRank {
    pub rank: usize,
    pub student_id: String,
    pub name: String,
    pub department: String,
    pub gpa: f64,
    pub total_credit_hours: f64,
    pub course_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub letter: String,
    pub count: usize,
    /// Fraction (0..=1) of valid records with this letter.
    pub share: Metric,
}
