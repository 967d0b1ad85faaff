//! Credit-weighted GPA per student.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::diagnostics::{
    DataQualityWarning, Diagnostics, SkipReason, SkippedRecord, UndefinedResultWarning,
};
use crate::metric::Metric;
use crate::records::{CourseRecord, RecordSet};
use crate::scale::GradeScale;

/// The grade a single valid record received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradedRecord {
    /// Index into [`GradeScale::bands`].
    pub band: usize,
    pub grade_point: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentGpa {
    pub student_id: String,
    /// First-seen name; later disagreements are reported, not applied.
    pub name: String,
    /// First-seen department.
    pub department: String,
    pub total_weighted_points: f64,
    pub total_credit_hours: f64,
    /// Undefined when the student has no valid credit hours.
    pub gpa: Metric,
    /// Number of valid records contributing to the GPA.
    pub course_count: usize,
}

impl StudentGpa {
    fn first_seen(record: &CourseRecord) -> Self {
        Self {
            student_id: record.student_id.clone(),
            name: record.name.clone(),
            department: record.department.clone(),
            total_weighted_points: 0.0,
            total_credit_hours: 0.0,
            gpa: Metric::Undefined,
            course_count: 0,
        }
    }
}

/// Output of [`compute`]: students in order of first appearance, plus the
/// grade of every input record (`None` where the record was skipped).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaReport {
    pub students: Vec<StudentGpa>,
    pub graded: Vec<Option<GradedRecord>>,
    pub diagnostics: Diagnostics,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl GpaReport {
    pub fn get(&self, student_id: &str) -> Option<&StudentGpa> {
        self.index.get(student_id).map(|&i| &self.students[i])
    }

    /// Grade of the record at `index` in the source [`RecordSet`].
    pub fn grade_of(&self, index: usize) -> Option<GradedRecord> {
        self.graded.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }
}

/// Grades every record against `scale` and folds the results into one
/// [`StudentGpa`] per student id.
///
/// Records with marks outside `[0, 100]` or unusable credit hours are
/// skipped and reported in the diagnostics; the rest of the batch is still
/// graded. Zero credit hours are valid but carry no weight.
#[tracing::instrument(skip_all, fields(records = records.len(), scale = scale.name()))]
pub fn compute(records: &RecordSet, scale: &GradeScale) -> GpaReport {
    let mut diagnostics = Diagnostics::new();
    let mut students: Vec<StudentGpa> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut graded = Vec::with_capacity(records.len());
    let mut reported = HashSet::new();

    for (i, record) in records.iter().enumerate() {
        let slot = *index.entry(record.student_id.clone()).or_insert_with(|| {
            students.push(StudentGpa::first_seen(record));
            students.len() - 1
        });

        check_metadata(&students[slot], record, &mut reported, &mut diagnostics);

        match grade_record(record, scale) {
            Ok(grade) => {
                let student = &mut students[slot];
                student.total_weighted_points += grade.grade_point * record.credit_hours;
                student.total_credit_hours += record.credit_hours;
                student.course_count += 1;
                graded.push(Some(grade));
            }
            Err(reason) => {
                diagnostics.skip(SkippedRecord {
                    index: i,
                    student_id: record.student_id.clone(),
                    course_code: record.course_code.clone(),
                    reason,
                });
                graded.push(None);
            }
        }
    }

    for student in &mut students {
        student.gpa = Metric::ratio(student.total_weighted_points, student.total_credit_hours);
        if student.gpa.is_undefined() {
            diagnostics.undefined(UndefinedResultWarning::ZeroCreditHours {
                student_id: student.student_id.clone(),
            });
        }
    }

    debug!(
        graded = graded.iter().filter(|g| g.is_some()).count(),
        "Records graded"
    );
    info!(
        students = students.len(),
        skipped = diagnostics.skipped.len(),
        "GPA computed"
    );

    GpaReport {
        students,
        graded,
        diagnostics,
        index,
    }
}

/// Credit-weighted mean of `(grade_point, credit_hours)` pairs.
pub fn weighted_average(pairs: impl IntoIterator<Item = (f64, f64)>) -> Metric {
    let (points, credits) = pairs
        .into_iter()
        .fold((0.0, 0.0), |(p, c), (gp, ch)| (p + gp * ch, c + ch));
    Metric::ratio(points, credits)
}

fn grade_record(record: &CourseRecord, scale: &GradeScale) -> Result<GradedRecord, SkipReason> {
    let grade = scale.lookup(record.marks).map_err(SkipReason::OutOfRange)?;
    if !record.credit_hours.is_finite() || record.credit_hours < 0.0 {
        return Err(SkipReason::InvalidCreditHours {
            credit_hours: record.credit_hours,
        });
    }
    Ok(GradedRecord {
        band: grade.band,
        grade_point: grade.grade_point,
    })
}

/// Reports each distinct conflicting name or department once per student.
fn check_metadata(
    student: &StudentGpa,
    record: &CourseRecord,
    reported: &mut HashSet<(String, &'static str, String)>,
    diagnostics: &mut Diagnostics,
) {
    for (field, kept, seen) in [
        ("name", &student.name, &record.name),
        ("department", &student.department, &record.department),
    ] {
        if kept != seen && reported.insert((student.student_id.clone(), field, seen.clone())) {
            diagnostics.data_quality(DataQualityWarning::ConflictingMetadata {
                student_id: student.student_id.clone(),
                field: field.to_string(),
                kept: kept.clone(),
                conflicting: seen.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutOfRangeError;

    fn scale() -> GradeScale {
        GradeScale::us_four_point().unwrap()
    }

    fn assert_gpa(report: &GpaReport, student_id: &str, expected: f64) {
        let gpa = report.get(student_id).unwrap().gpa.value().unwrap();
        assert!((gpa - expected).abs() < 1e-9, "{student_id}: {gpa} != {expected}");
    }

    fn record(student: &str, course: &str, credits: f64, marks: f64) -> CourseRecord {
        CourseRecord::new(student, course, credits, marks).with_student("Ada", "CS")
    }

    #[test]
    fn test_two_equal_weight_courses_average() {
        let records = RecordSet::new(vec![
            record("S001", "CS101", 3.0, 85.0),
            record("S001", "CS102", 3.0, 90.0),
        ]);

        let report = compute(&records, &scale());

        // 85 -> B (3.0), 90 -> A- (3.7)
        assert_gpa(&report, "S001", 3.35);
        assert_eq!(report.get("S001").unwrap().total_credit_hours, 6.0);
        assert!(report.diagnostics.is_clean());
    }

    #[test]
    fn test_single_course_gpa_equals_grade_point() {
        let records = RecordSet::new(vec![record("S001", "CS101", 4.0, 78.0)]);
        let report = compute(&records, &scale());
        assert_eq!(report.get("S001").unwrap().gpa, Metric::Defined(2.3));
    }

    #[test]
    fn test_credit_hours_weight_the_average() {
        let records = RecordSet::new(vec![
            record("S001", "CS101", 1.0, 95.0),
            record("S001", "CS102", 3.0, 50.0),
        ]);
        let report = compute(&records, &scale());
        // (4.0 * 1 + 0.0 * 3) / 4
        assert_eq!(report.get("S001").unwrap().gpa, Metric::Defined(1.0));
    }

    #[test]
    fn test_gpa_unchanged_by_reordering() {
        let rows = vec![
            record("S001", "A", 3.0, 91.0),
            record("S001", "B", 4.0, 67.5),
            record("S001", "C", 1.5, 83.0),
            record("S001", "D", 2.0, 99.0),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let a = compute(&RecordSet::new(rows), &scale());
        let b = compute(&RecordSet::new(reversed), &scale());

        let ga = a.get("S001").unwrap().gpa.value().unwrap();
        let gb = b.get("S001").unwrap().gpa.value().unwrap();
        assert!((ga - gb).abs() < 1e-12);
    }

    #[test]
    fn test_zero_credit_hours_yields_undefined() {
        let records = RecordSet::new(vec![record("S001", "CS101", 0.0, 88.0)]);
        let report = compute(&records, &scale());

        assert_eq!(report.get("S001").unwrap().gpa, Metric::Undefined);
        assert_eq!(
            report.diagnostics.undefined,
            vec![UndefinedResultWarning::ZeroCreditHours {
                student_id: "S001".into()
            }]
        );
    }

    #[test]
    fn test_out_of_range_record_is_excluded_and_reported() {
        let records = RecordSet::new(vec![
            record("S001", "CS101", 3.0, 150.0),
            record("S001", "CS102", 3.0, 90.0),
            record("S002", "CS101", 3.0, 70.0),
        ]);

        let report = compute(&records, &scale());

        assert_gpa(&report, "S001", 3.7);
        assert_gpa(&report, "S002", 1.7);
        assert_eq!(report.diagnostics.skipped.len(), 1);
        assert_eq!(report.diagnostics.skipped[0].index, 0);
        assert_eq!(
            report.diagnostics.skipped[0].reason,
            SkipReason::OutOfRange(OutOfRangeError { marks: 150.0 })
        );
        assert_eq!(report.grade_of(0), None);
        assert!(report.grade_of(1).is_some());
    }

    #[test]
    fn test_student_with_only_invalid_records_is_undefined() {
        let records = RecordSet::new(vec![
            record("S001", "CS101", -3.0, 80.0),
            record("S001", "CS102", 3.0, f64::NAN),
        ]);
        let report = compute(&records, &scale());

        assert_eq!(report.len(), 1);
        assert_eq!(report.get("S001").unwrap().gpa, Metric::Undefined);
        assert_eq!(report.diagnostics.skipped.len(), 2);
        assert!(matches!(
            report.diagnostics.skipped[0].reason,
            SkipReason::InvalidCreditHours { .. }
        ));
    }

    #[test]
    fn test_output_keeps_first_appearance_order() {
        let records = RecordSet::new(vec![
            record("S003", "X", 3.0, 70.0),
            record("S001", "X", 3.0, 70.0),
            record("S003", "Y", 3.0, 70.0),
            record("S002", "X", 3.0, 70.0),
        ]);
        let report = compute(&records, &scale());
        let ids: Vec<_> = report.students.iter().map(|s| s.student_id.as_str()).collect();
        assert_eq!(ids, vec!["S003", "S001", "S002"]);
    }

    #[test]
    fn test_conflicting_metadata_keeps_first_and_warns_once() {
        let records = RecordSet::new(vec![
            CourseRecord::new("S001", "A", 3.0, 80.0).with_student("Ada", "CS"),
            CourseRecord::new("S001", "B", 3.0, 80.0).with_student("Ada L.", "CS"),
            CourseRecord::new("S001", "C", 3.0, 80.0).with_student("Ada L.", "CS"),
        ]);
        let report = compute(&records, &scale());

        assert_eq!(report.get("S001").unwrap().name, "Ada");
        assert_eq!(report.diagnostics.data_quality.len(), 1);
        assert!(matches!(
            &report.diagnostics.data_quality[0],
            DataQualityWarning::ConflictingMetadata { field, .. } if field == "name"
        ));
    }

    #[test]
    fn test_empty_record_set() {
        let report = compute(&RecordSet::default(), &scale());
        assert!(report.is_empty());
        assert!(report.diagnostics.is_clean());
    }

    #[test]
    fn test_weighted_average_of_nothing_is_undefined() {
        assert_eq!(weighted_average(Vec::<(f64, f64)>::new()), Metric::Undefined);
        assert_eq!(
            weighted_average(vec![(4.0, 1.0), (2.0, 1.0)]),
            Metric::Defined(3.0)
        );
    }
}
