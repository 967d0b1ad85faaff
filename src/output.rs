//! Output formatting and persistence for analytics results.
//!
//! Supports pretty-printing, JSON export, and the student GPA table as CSV.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info};

use crate::gpa::GpaReport;

/// Logs any value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `value` as pretty-printed JSON to `path`, creating parent
/// directories as needed.
pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    create_parent(path)?;
    let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("Failed to write JSON to {path}"))?;
    info!(path, "JSON written");
    Ok(())
}

/// One row of the exported GPA table. `gpa` is empty when undefined.
#[derive(Debug, Serialize)]
struct StudentRow<'a> {
    student_id: &'a str,
    name: &'a str,
    department: &'a str,
    course_count: usize,
    total_credit_hours: f64,
    gpa: Option<f64>,
}

/// Writes one row per student to `path`, replacing any existing file.
pub fn write_student_csv(path: &str, report: &GpaReport) -> Result<()> {
    create_parent(path)?;
    debug!(path, students = report.len(), "Writing student CSV");

    let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);

    for student in &report.students {
        writer.serialize(StudentRow {
            student_id: &student.student_id,
            name: &student.name,
            department: &student.department,
            course_count: student.course_count,
            total_credit_hours: student.total_credit_hours,
            gpa: student.gpa.value(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

fn create_parent(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}
