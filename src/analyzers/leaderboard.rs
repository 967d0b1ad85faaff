use std::cmp::Ordering;

use tracing::debug;

use crate::analyzers::types::StudentRank;
use crate::gpa::{GpaReport, StudentGpa};

/// The `n` highest-GPA students. Students with an undefined GPA are left out.
///
/// Ties on GPA go to the student with more credit hours, then the lower
/// student id.
pub fn top_students(gpa: &GpaReport, n: usize) -> Vec<StudentRank> {
    let mut ranked: Vec<(&StudentGpa, f64)> = gpa
        .students
        .iter()
        .filter_map(|s| s.gpa.value().map(|g| (s, g)))
        .collect();
    ranked.sort_by(|a, b| rank_order(*a, *b));
    ranked.truncate(n);

    debug!(requested = n, returned = ranked.len(), "Top students ranked");

    ranked
        .into_iter()
        .enumerate()
        .map(|(i, (student, gpa))| StudentRank {
            rank: i + 1,
            student_id: student.student_id.clone(),
            name: student.name.clone(),
            department: student.department.clone(),
            gpa,
            total_credit_hours: student.total_credit_hours,
            course_count: student.course_count,
        })
        .collect()
}

fn rank_order(a: (&StudentGpa, f64), b: (&StudentGpa, f64)) -> Ordering {
    b.1.total_cmp(&a.1)
        .then_with(|| b.0.total_credit_hours.total_cmp(&a.0.total_credit_hours))
        .then_with(|| a.0.student_id.cmp(&b.0.student_id))
}
