//! CSV ingestion into a [`RecordSet`].
//!
//! Headers are matched case-insensitively against the canonical names
//! (`StudentID`, `Name`, ...) and a few common aliases. Rows that cannot be
//! parsed are kept as [`RejectedRow`]s instead of failing the load.

use std::io::Read;

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info, warn};

use crate::records::{CourseRecord, RecordSet, RejectedRow};

/// Canonical header names in the order records list their fields.
pub const HEADERS: [&str; 8] = [
    "StudentID",
    "Name",
    "Department",
    "Semester",
    "CourseCode",
    "CourseName",
    "CreditHours",
    "Marks",
];

const ALIASES: &[(&str, &str)] = &[
    ("student_id", "StudentID"),
    ("student_name", "Name"),
    ("name", "Name"),
    ("dept", "Department"),
    ("department", "Department"),
    ("sem", "Semester"),
    ("semester", "Semester"),
    ("course_code", "CourseCode"),
    ("course_name", "CourseName"),
    ("credits", "CreditHours"),
    ("credit_hours", "CreditHours"),
    ("marks", "Marks"),
];

/// Loads course records from the CSV file at `path`.
pub fn load_csv(path: &str) -> Result<RecordSet> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {path}"))?;
    let records = read_records(file).with_context(|| format!("Failed to load {path}"))?;
    info!(
        path,
        records = records.len(),
        rejected = records.rejected().len(),
        "CSV loaded"
    );
    Ok(records)
}

/// Reads course records from any CSV source.
///
/// # Errors
///
/// Fails on I/O errors, an empty input, or a header row missing any of
/// [`HEADERS`]. Bad data rows are rejected individually.
pub fn read_records<R: Read>(source: R) -> Result<RecordSet> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(false)
        .from_reader(source);

    let headers = canonical_headers(reader.headers()?)?;
    debug!(?headers, "CSV headers resolved");

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut row = StringRecord::new();

    loop {
        match reader.read_record(&mut row) {
            Ok(false) => break,
            Ok(true) => {
                let line = row.position().map(|p| p.line());
                match parse_row(&row, &headers) {
                    Ok(record) => records.push(record),
                    Err(reason) => reject(&mut rejected, line, reason),
                }
            }
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                let line = err.position().map(|p| p.line());
                reject(&mut rejected, line, err.to_string());
            }
        }
    }

    Ok(RecordSet::with_rejected(records, rejected))
}

fn canonical_headers(raw: &StringRecord) -> Result<StringRecord> {
    if raw.is_empty() {
        bail!("CSV has no header row");
    }
    let headers: StringRecord = raw.iter().map(canonical_name).collect();

    let missing: Vec<&str> = HEADERS
        .iter()
        .copied()
        .filter(|h| !headers.iter().any(|found| found == *h))
        .collect();
    if !missing.is_empty() {
        bail!("Required columns missing: {}", missing.join(", "));
    }
    Ok(headers)
}

fn canonical_name(header: &str) -> String {
    let lower = header.trim().to_ascii_lowercase();
    HEADERS
        .iter()
        .find(|h| h.to_ascii_lowercase() == lower)
        .or_else(|| {
            ALIASES
                .iter()
                .find(|(alias, _)| *alias == lower)
                .map(|(_, canonical)| canonical)
        })
        .map_or_else(|| header.trim().to_string(), |h| h.to_string())
}

fn parse_row(row: &StringRecord, headers: &StringRecord) -> Result<CourseRecord, String> {
    let record = row
        .deserialize::<CourseRecord>(Some(headers))
        .map_err(|e| e.to_string())?
        .normalized();

    for (field, value) in [
        ("StudentID", &record.student_id),
        ("Name", &record.name),
        ("CourseCode", &record.course_code),
    ] {
        if value.is_empty() {
            return Err(format!("{field} is empty"));
        }
    }
    Ok(record)
}

fn reject(rejected: &mut Vec<RejectedRow>, line: Option<u64>, reason: String) {
    warn!(line, reason = %reason, "CSV row rejected");
    rejected.push(RejectedRow { line, reason });
}
