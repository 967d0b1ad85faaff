use std::collections::HashSet;

use tracing::info;

use crate::analyzers::types::{Analysis, CohortSummary};
use crate::analyzers::utility::{max, mean, median, min, stddev};
use crate::diagnostics::{Diagnostics, UndefinedResultWarning};
use crate::gpa::{GpaReport, StudentGpa};
use crate::metric::Metric;
use crate::records::RecordSet;
use crate::scale::Thresholds;

/// Summarizes the whole cohort in `gpa`.
///
/// Never fails: an empty record set gives zero counts with every statistic
/// undefined and an [`UndefinedResultWarning::EmptyCohort`] in the
/// diagnostics.
#[tracing::instrument(skip_all, fields(students = gpa.len()))]
pub fn cohort_summary(
    records: &RecordSet,
    gpa: &GpaReport,
    thresholds: &Thresholds,
) -> Analysis<CohortSummary> {
    let mut diagnostics = carried_diagnostics(gpa);

    let students: Vec<&StudentGpa> = gpa.students.iter().collect();
    let course_count = distinct_courses(records, gpa, |_| true);
    let summary = summarize_students(&students, course_count, thresholds);

    if summary.defined_gpa_count == 0 {
        diagnostics.undefined(UndefinedResultWarning::EmptyCohort {
            scope: "cohort".to_string(),
        });
    }

    info!(
        students = summary.student_count,
        pass_rate = %summary.pass_rate,
        "Cohort summary computed"
    );
    Analysis::new(summary, diagnostics)
}

/// GPA statistics over `students`. Shared by the cohort and per-department
/// summaries so both have the same shape and semantics.
pub(crate) fn summarize_students(
    students: &[&StudentGpa],
    course_count: usize,
    thresholds: &Thresholds,
) -> CohortSummary {
    let gpas: Vec<f64> = students.iter().filter_map(|s| s.gpa.value()).collect();
    let passing_count = gpas
        .iter()
        .filter(|&&g| g >= thresholds.passing_gpa)
        .count();

    let mean_gpa = mean(&gpas);

    CohortSummary {
        student_count: students.len(),
        defined_gpa_count: gpas.len(),
        course_count,
        total_credit_hours: students.iter().map(|s| s.total_credit_hours).sum(),
        mean_gpa,
        median_gpa: median(&gpas),
        std_gpa: stddev(&gpas, mean_gpa),
        min_gpa: min(&gpas),
        max_gpa: max(&gpas),
        pass_rate: Metric::ratio(passing_count as f64, gpas.len() as f64),
        passing_count,
        failing_count: gpas.len() - passing_count,
    }
}

/// Distinct course codes among valid records whose student passes `keep`.
pub(crate) fn distinct_courses<F>(records: &RecordSet, gpa: &GpaReport, keep: F) -> usize
where
    F: Fn(&str) -> bool,
{
    records
        .iter()
        .enumerate()
        .filter(|(i, r)| gpa.grade_of(*i).is_some() && keep(r.student_id.as_str()))
        .map(|(_, r)| r.course_code.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Starts an aggregation's diagnostics with everything the GPA stage found:
/// skipped records, metadata conflicts and undefined GPAs.
pub(crate) fn carried_diagnostics(gpa: &GpaReport) -> Diagnostics {
    gpa.diagnostics.clone()
}
