//! Term GPA trend across semesters.

use tracing::{debug, info};

use crate::analyzers::aggregate::carried_diagnostics;
use crate::analyzers::grouping::Groups;
use crate::analyzers::types::{Analysis, Season, SemesterOrder, SemesterPoint, SemesterTrend};
use crate::analyzers::utility::{mean, median};
use crate::diagnostics::{DataQualityWarning, UndefinedResultWarning};
use crate::gpa::{GpaReport, weighted_average};
use crate::metric::Metric;
use crate::records::RecordSet;
use crate::scale::Thresholds;

/// Parses labels like `"Fall 2023"`, `"2024-spring"` or `"SP 2024"` into a
/// `(year, season)` pair. Returns `None` unless the label has exactly one
/// season and one four-digit year.
pub fn parse_semester(label: &str) -> Option<(i32, Season)> {
    let mut year = None;
    let mut season = None;

    for token in label
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '_' | '/' | ','))
        .filter(|t| !t.is_empty())
    {
        let lower = token.to_ascii_lowercase();
        if let Some(s) = season_of(&lower) {
            if season.replace(s).is_some() {
                return None;
            }
        } else if lower.len() == 4 && lower.bytes().all(|b| b.is_ascii_digit()) {
            if year.replace(lower.parse().ok()?).is_some() {
                return None;
            }
        } else if !matches!(lower.as_str(), "semester" | "term" | "session") {
            return None;
        }
    }

    Some((year?, season?))
}

fn season_of(token: &str) -> Option<Season> {
    match token {
        "winter" | "wi" => Some(Season::Winter),
        "spring" | "sp" => Some(Season::Spring),
        "summer" | "su" => Some(Season::Summer),
        "fall" | "autumn" | "fa" => Some(Season::Fall),
        _ => None,
    }
}

pub fn semester_order(label: &str) -> SemesterOrder {
    match parse_semester(label) {
        Some((year, season)) => SemesterOrder::Chronological { year, season },
        None => SemesterOrder::Unordered,
    }
}

/// One point per semester label with the mean, median and pass rate of the
/// students' term GPAs in that semester.
///
/// Points are ordered chronologically; labels that do not parse follow in
/// order of first appearance and are reported as
/// [`DataQualityWarning::UnparseableSemester`].
#[tracing::instrument(skip_all, fields(records = records.len()))]
pub fn semester_trend(
    records: &RecordSet,
    gpa: &GpaReport,
    thresholds: &Thresholds,
) -> Analysis<SemesterTrend> {
    let mut diagnostics = carried_diagnostics(gpa);
    let rows = records.records();
    let valid = (0..rows.len()).filter(|&i| gpa.grade_of(i).is_some());
    let semesters = Groups::build(valid, |i| rows[i].semester.as_str());
    debug!(semesters = semesters.len(), "Records grouped by semester");

    let mut points: Vec<SemesterPoint> = semesters
        .iter()
        .map(|(label, members)| {
            let order = semester_order(label);
            if order == SemesterOrder::Unordered {
                diagnostics.data_quality(DataQualityWarning::UnparseableSemester {
                    label: label.to_string(),
                });
            }

            let students = Groups::build(members.iter().copied(), |i| rows[i].student_id.as_str());
            let term_gpas: Vec<f64> = students
                .iter()
                .filter_map(|(_, taken)| {
                    weighted_average(taken.iter().filter_map(|&i| {
                        gpa.grade_of(i)
                            .map(|g| (g.grade_point, rows[i].credit_hours))
                    }))
                    .value()
                })
                .collect();
            if term_gpas.is_empty() {
                diagnostics.undefined(UndefinedResultWarning::EmptyCohort {
                    scope: format!("semester {label}"),
                });
            }
            let passing = term_gpas
                .iter()
                .filter(|&&g| g >= thresholds.passing_gpa)
                .count();

            SemesterPoint {
                semester: label.to_string(),
                order,
                student_count: students.len(),
                record_count: members.len(),
                mean_gpa: mean(&term_gpas),
                median_gpa: median(&term_gpas),
                pass_rate: Metric::ratio(passing as f64, term_gpas.len() as f64),
            }
        })
        .collect();

    // Stable: unordered labels keep their first-appearance order.
    points.sort_by_key(|p| p.order);
    let trend = SemesterTrend { points };

    info!(
        semesters = trend.points.len(),
        unordered = trend.unordered().len(),
        "Semester trend computed"
    );
    Analysis::new(trend, diagnostics)
}
