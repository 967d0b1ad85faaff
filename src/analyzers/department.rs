//! Department attribution and per-department summaries.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::analyzers::aggregate::{carried_diagnostics, distinct_courses, summarize_students};
use crate::analyzers::grouping::Groups;
use crate::analyzers::types::{Analysis, DepartmentAttribution, DepartmentSummary};
use crate::diagnostics::{DataQualityWarning, Diagnostics, UndefinedResultWarning};
use crate::gpa::{GpaReport, StudentGpa};
use crate::records::RecordSet;
use crate::scale::Thresholds;

/// Assigns every student in `gpa` to the department holding the largest
/// share of their valid credit hours.
///
/// A tie is resolved in favor of the department that appears first in the
/// student's records and reported as [`DataQualityWarning::AmbiguousDepartment`].
/// A student without credited records keeps their first-seen department.
pub fn attribute_departments(
    records: &RecordSet,
    gpa: &GpaReport,
    diagnostics: &mut Diagnostics,
) -> Vec<DepartmentAttribution> {
    let rows = records.records();
    let by_student = Groups::build(0..rows.len(), |i| rows[i].student_id.as_str());

    gpa.students
        .iter()
        .map(|student| {
            // (department, credit hours) in first-appearance order.
            let mut credits: Vec<(&str, f64)> = Vec::new();
            for &i in by_student.get(&student.student_id) {
                if gpa.grade_of(i).is_none() {
                    continue;
                }
                let record = &rows[i];
                match credits.iter_mut().find(|(d, _)| *d == record.department) {
                    Some((_, hours)) => *hours += record.credit_hours,
                    None => credits.push((record.department.as_str(), record.credit_hours)),
                }
            }

            let best = credits.iter().map(|&(_, h)| h).fold(0.0, f64::max);
            if best <= 0.0 {
                return DepartmentAttribution {
                    student_id: student.student_id.clone(),
                    department: student.department.clone(),
                    credit_hours: 0.0,
                    ambiguous: false,
                };
            }

            let tied: Vec<&str> = credits
                .iter()
                .filter(|&&(_, h)| h == best)
                .map(|&(d, _)| d)
                .collect();
            let chosen = tied[0].to_string();
            let ambiguous = tied.len() > 1;
            if ambiguous {
                diagnostics.data_quality(DataQualityWarning::AmbiguousDepartment {
                    student_id: student.student_id.clone(),
                    candidates: tied.iter().map(|d| d.to_string()).collect(),
                    chosen: chosen.clone(),
                });
            }

            DepartmentAttribution {
                student_id: student.student_id.clone(),
                department: chosen,
                credit_hours: best,
                ambiguous,
            }
        })
        .collect()
}

/// One [`CohortSummary`](crate::analyzers::types::CohortSummary) per
/// department, listed in order of first appearance in the records.
///
/// Every department named in the records is listed, including those left
/// with no students after attribution.
#[tracing::instrument(skip_all, fields(students = gpa.len()))]
pub fn department_summaries(
    records: &RecordSet,
    gpa: &GpaReport,
    thresholds: &Thresholds,
) -> Analysis<Vec<DepartmentSummary>> {
    let mut diagnostics = carried_diagnostics(gpa);
    let attributions = attribute_departments(records, gpa, &mut diagnostics);

    let home: HashMap<&str, &str> = attributions
        .iter()
        .map(|a| (a.student_id.as_str(), a.department.as_str()))
        .collect();
    let mut departments = Groups::default();
    for department in records.departments() {
        departments.insert_key(department);
    }
    for (i, a) in attributions.iter().enumerate() {
        departments.insert(a.department.as_str(), i);
    }
    debug!(departments = departments.len(), "Students attributed");

    let summaries: Vec<DepartmentSummary> = departments
        .iter()
        .map(|(department, members)| {
            let students: Vec<&StudentGpa> = members.iter().map(|&i| &gpa.students[i]).collect();
            let course_count = distinct_courses(records, gpa, |id| {
                home.get(id).is_some_and(|d| *d == department)
            });
            let summary = summarize_students(&students, course_count, thresholds);
            if summary.defined_gpa_count == 0 {
                diagnostics.undefined(UndefinedResultWarning::EmptyCohort {
                    scope: format!("department {department}"),
                });
            }
            DepartmentSummary {
                department: department.to_string(),
                summary,
            }
        })
        .collect();

    info!(departments = summaries.len(), "Department summaries computed");
    Analysis::new(summaries, diagnostics)
}
