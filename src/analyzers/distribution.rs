use tracing::debug;

use crate::analyzers::types::GradeCount;
use crate::gpa::GpaReport;
use crate::metric::Metric;
use crate::scale::GradeScale;

/// Valid records per letter grade, top band first. Letters nobody received
/// are listed with a zero count.
pub fn grade_distribution(gpa: &GpaReport, scale: &GradeScale) -> Vec<GradeCount> {
    let mut counts = vec![0usize; scale.bands().len()];
    for graded in gpa.graded.iter().flatten() {
        if let Some(count) = counts.get_mut(graded.band) {
            *count += 1;
        }
    }
    let total: usize = counts.iter().sum();
    debug!(records = total, letters = counts.len(), "Grade distribution counted");

    scale
        .bands()
        .iter()
        .zip(counts)
        .rev()
        .map(|(band, count)| GradeCount {
            letter: band.letter.clone(),
            count,
            share: Metric::ratio(count as f64, total as f64),
        })
        .collect()
}
