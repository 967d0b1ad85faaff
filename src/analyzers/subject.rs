//! Per-course statistics ranked as a leaderboard.

use std::cmp::Ordering;

use tracing::info;

use crate::analyzers::aggregate::carried_diagnostics;
use crate::analyzers::grouping::Groups;
use crate::analyzers::types::{Analysis, SubjectSummary, TopScore};
use crate::analyzers::utility::{cmp_desc, mean};
use crate::diagnostics::UndefinedResultWarning;
use crate::gpa::GpaReport;
use crate::metric::Metric;
use crate::records::{CourseRecord, RecordSet};
use crate::scale::Thresholds;

/// One summary per `course_code`, ranked by mean marks (highest first),
/// then enrollment (largest first), then course code.
///
/// The pass rate here counts records, not students: a record passes when
/// its grade point meets `thresholds.passing_grade_point`. A course whose
/// records were all skipped still appears, with undefined statistics.
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn subject_summaries(
    records: &RecordSet,
    gpa: &GpaReport,
    thresholds: &Thresholds,
) -> Analysis<Vec<SubjectSummary>> {
    let mut diagnostics = carried_diagnostics(gpa);
    let rows = records.records();
    let courses = Groups::build(0..rows.len(), |i| rows[i].course_code.as_str());

    let mut summaries: Vec<SubjectSummary> = courses
        .iter()
        .map(|(course_code, members)| {
            let first = &rows[members[0]];
            let valid: Vec<(usize, f64)> = members
                .iter()
                .filter_map(|&i| gpa.grade_of(i).map(|g| (i, g.grade_point)))
                .collect();

            let marks: Vec<f64> = valid.iter().map(|&(i, _)| rows[i].marks).collect();
            let passing_count = valid
                .iter()
                .filter(|&&(_, points)| points >= thresholds.passing_grade_point)
                .count();

            // First occurrence wins on equal marks.
            let top_scorer = valid
                .iter()
                .map(|&(i, _)| &rows[i])
                .fold(None, |best: Option<&CourseRecord>, r| match best {
                    Some(b) if b.marks >= r.marks => Some(b),
                    _ => Some(r),
                })
                .map(|r| TopScore {
                    student_id: r.student_id.clone(),
                    name: r.name.clone(),
                    marks: r.marks,
                });

            if valid.is_empty() {
                diagnostics.undefined(UndefinedResultWarning::EmptyCohort {
                    scope: format!("course {course_code}"),
                });
            }

            SubjectSummary {
                course_code: course_code.to_string(),
                course_name: first.course_name.clone(),
                credit_hours: first.credit_hours,
                enrollment: valid.len(),
                mean_marks: mean(&marks),
                pass_rate: Metric::ratio(passing_count as f64, valid.len() as f64),
                passing_count,
                top_scorer,
            }
        })
        .collect();

    summaries.sort_by(leaderboard_order);

    info!(courses = summaries.len(), "Subject summaries computed");
    Analysis::new(summaries, diagnostics)
}

fn leaderboard_order(a: &SubjectSummary, b: &SubjectSummary) -> Ordering {
    cmp_desc(a.mean_marks, b.mean_marks)
        .then_with(|| b.enrollment.cmp(&a.enrollment))
        .then_with(|| a.course_code.cmp(&b.course_code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpa;
    use crate::scale::GradeScale;

    fn run(records: Vec<CourseRecord>) -> Analysis<Vec<SubjectSummary>> {
        let scale = GradeScale::us_four_point().unwrap();
        let records = RecordSet::new(records);
        let report = gpa::compute(&records, &scale);
        subject_summaries(&records, &report, &Thresholds::for_scale(&scale))
    }

    fn codes(analysis: &Analysis<Vec<SubjectSummary>>) -> Vec<&str> {
        analysis
            .result
            .iter()
            .map(|s| s.course_code.as_str())
            .collect()
    }

    #[test]
    fn test_ranked_by_mean_marks() {
        let analysis = run(vec![
            CourseRecord::new("S1", "LOW", 3.0, 60.0),
            CourseRecord::new("S1", "HIGH", 3.0, 95.0),
            CourseRecord::new("S2", "MID", 3.0, 80.0),
        ]);
        assert_eq!(codes(&analysis), vec!["HIGH", "MID", "LOW"]);
    }

    #[test]
    fn test_ties_break_on_enrollment_then_code() {
        let analysis = run(vec![
            CourseRecord::new("S1", "ZZZ", 3.0, 80.0),
            CourseRecord::new("S2", "ZZZ", 3.0, 80.0),
            CourseRecord::new("S1", "BBB", 3.0, 80.0),
            CourseRecord::new("S1", "AAA", 3.0, 80.0),
        ]);
        assert_eq!(codes(&analysis), vec!["ZZZ", "AAA", "BBB"]);

        // Same result regardless of input order.
        let reversed = run(vec![
            CourseRecord::new("S1", "AAA", 3.0, 80.0),
            CourseRecord::new("S1", "BBB", 3.0, 80.0),
            CourseRecord::new("S2", "ZZZ", 3.0, 80.0),
            CourseRecord::new("S1", "ZZZ", 3.0, 80.0),
        ]);
        assert_eq!(codes(&reversed), codes(&analysis));
    }

    #[test]
    fn test_pass_rate_counts_records() {
        let analysis = run(vec![
            CourseRecord::new("S1", "CS101", 3.0, 63.0), // D, 1.0: passes
            CourseRecord::new("S2", "CS101", 3.0, 62.0), // F
            CourseRecord::new("S3", "CS101", 3.0, 90.0),
            CourseRecord::new("S4", "CS101", 3.0, 10.0),
        ]);
        let s = &analysis.result[0];
        assert_eq!(s.enrollment, 4);
        assert_eq!(s.passing_count, 2);
        assert_eq!(s.pass_rate, Metric::Defined(0.5));
        assert_eq!(s.mean_marks, Metric::Defined(56.25));
    }

    #[test]
    fn test_top_scorer_first_occurrence_wins() {
        let analysis = run(vec![
            CourseRecord::new("S1", "CS101", 3.0, 70.0).with_student("Ada", "CS"),
            CourseRecord::new("S2", "CS101", 3.0, 92.0).with_student("Grace", "CS"),
            CourseRecord::new("S3", "CS101", 3.0, 92.0).with_student("Alan", "CS"),
        ]);
        let top = analysis.result[0].top_scorer.as_ref().unwrap();
        assert_eq!(top.student_id, "S2");
        assert_eq!(top.marks, 92.0);
    }

    #[test]
    fn test_course_with_only_skipped_records_is_kept_and_flagged() {
        let analysis = run(vec![
            CourseRecord::new("S1", "BAD", 3.0, 120.0),
            CourseRecord::new("S1", "OK", 3.0, 75.0),
        ]);
        assert_eq!(codes(&analysis), vec!["OK", "BAD"]);
        let bad = &analysis.result[1];
        assert_eq!(bad.enrollment, 0);
        assert_eq!(bad.mean_marks, Metric::Undefined);
        assert_eq!(bad.top_scorer, None);
        assert_eq!(analysis.diagnostics.skipped.len(), 1);
        assert_eq!(analysis.diagnostics.undefined.len(), 1);
    }

    #[test]
    fn test_empty_input_gives_no_subjects() {
        let analysis = run(vec![]);
        assert!(analysis.result.is_empty());
    }
}
