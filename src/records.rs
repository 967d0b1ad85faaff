//! Course records and the validated batch the engine operates on.

use serde::{Deserialize, Serialize};

use crate::cache::{Fingerprint, FingerprintBuilder};

/// One row per (student, course, semester).
///
/// Header names follow the upload format (`StudentID`, `CreditHours`, ...);
/// snake_case aliases are accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(rename = "StudentID", alias = "student_id")]
    pub student_id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Department", alias = "department")]
    pub department: String,
    #[serde(rename = "Semester", alias = "semester")]
    pub semester: String,
    #[serde(rename = "CourseCode", alias = "course_code")]
    pub course_code: String,
    #[serde(rename = "CourseName", alias = "course_name")]
    pub course_name: String,
    #[serde(rename = "CreditHours", alias = "credit_hours")]
    pub credit_hours: f64,
    #[serde(rename = "Marks", alias = "marks")]
    pub marks: f64,
}

impl CourseRecord {
    /// Creates a record with empty name, department, semester and course name.
    pub fn new(student_id: &str, course_code: &str, credit_hours: f64, marks: f64) -> Self {
        CourseRecord {
            student_id: student_id.to_string(),
            name: String::new(),
            department: String::new(),
            semester: String::new(),
            course_code: course_code.to_string(),
            course_name: String::new(),
            credit_hours,
            marks,
        }
    }

    /// Set student metadata (name and department)
    pub fn with_student(mut self, name: &str, department: &str) -> Self {
        self.name = name.to_string();
        self.department = department.to_string();
        self
    }

    pub fn in_semester(mut self, semester: &str) -> Self {
        self.semester = semester.to_string();
        self
    }

    pub fn with_course_name(mut self, course_name: &str) -> Self {
        self.course_name = course_name.to_string();
        self
    }

    /// Trims every text field and upper-cases the course code.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.student_id,
            &mut self.name,
            &mut self.department,
            &mut self.semester,
            &mut self.course_name,
        ] {
            *field = field.trim().to_string();
        }
        self.course_code = self.course_code.trim().to_uppercase();
        self
    }

    fn feed(&self, hasher: &mut FingerprintBuilder) {
        hasher
            .str(&self.student_id)
            .str(&self.name)
            .str(&self.department)
            .str(&self.semester)
            .str(&self.course_code)
            .str(&self.course_name)
            .f64(self.credit_hours)
            .f64(self.marks);
    }
}

/// A row the loader could not turn into a [`CourseRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    /// 1-based line in the source file, when known.
    pub line: Option<u64>,
    pub reason: String,
}

/// Restricts a [`RecordSet`] to a subset of the cohort.
///
/// `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordFilter {
    pub departments: Option<Vec<String>>,
    pub semesters: Option<Vec<String>>,
    /// Case-insensitive substring match against student id or name.
    pub student_search: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &CourseRecord) -> bool {
        if let Some(departments) = &self.departments {
            if !departments.iter().any(|d| d == &record.department) {
                return false;
            }
        }
        if let Some(semesters) = &self.semesters {
            if !semesters.iter().any(|s| s == &record.semester) {
                return false;
            }
        }
        if let Some(search) = &self.student_search {
            let needle = search.to_lowercase();
            if !record.student_id.to_lowercase().contains(&needle)
                && !record.name.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// The immutable batch of course records for one analysis session, plus the
/// rows the loader rejected on the way in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<CourseRecord>,
    rejected: Vec<RejectedRow>,
}

impl RecordSet {
    pub fn new(records: Vec<CourseRecord>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
        }
    }

    pub fn with_rejected(records: Vec<CourseRecord>, rejected: Vec<RejectedRow>) -> Self {
        Self { records, rejected }
    }

    pub fn records(&self) -> &[CourseRecord] {
        &self.records
    }

    pub fn rejected(&self) -> &[RejectedRow] {
        &self.rejected
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CourseRecord> {
        self.records.iter()
    }

    /// Content fingerprint of the records, in order.
    ///
    /// Two sets built from identical rows share a fingerprint regardless of
    /// where they came from. Rejected rows do not contribute.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = FingerprintBuilder::new("record_set");
        hasher.u64(self.records.len() as u64);
        for record in &self.records {
            record.feed(&mut hasher);
        }
        hasher.finish()
    }

    /// Returns a new set holding only the records that match `filter`.
    /// Rejected rows are carried over unchanged.
    pub fn filter(&self, filter: &RecordFilter) -> RecordSet {
        RecordSet {
            records: self
                .records
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
            rejected: self.rejected.clone(),
        }
    }

    /// Distinct departments in order of first appearance.
    pub fn departments(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.department.as_str()))
    }

    /// Distinct semester labels in order of first appearance.
    pub fn semesters(&self) -> Vec<&str> {
        distinct(self.records.iter().map(|r| r.semester.as_str()))
    }
}

impl FromIterator<CourseRecord> for RecordSet {
    fn from_iter<I: IntoIterator<Item = CourseRecord>>(iter: I) -> Self {
        RecordSet::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a CourseRecord;
    type IntoIter = std::slice::Iter<'a, CourseRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = std::collections::HashSet::new();
    values.filter(|v| seen.insert(*v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RecordSet {
        RecordSet::new(vec![
            CourseRecord::new("S001", "CS101", 3.0, 85.0)
                .with_student("Ada Lovelace", "Computer Science")
                .in_semester("Fall 2023"),
            CourseRecord::new("S002", "MA101", 4.0, 72.0)
                .with_student("Carl Gauss", "Mathematics")
                .in_semester("Spring 2024"),
            CourseRecord::new("S001", "CS102", 3.0, 90.0)
                .with_student("Ada Lovelace", "Computer Science")
                .in_semester("Spring 2024"),
        ])
    }

    #[test]
    fn test_fingerprint_is_content_addressed() {
        let a = sample();
        let b = sample();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_marks() {
        let a = sample();
        let mut records = a.records().to_vec();
        records[0].marks = 86.0;
        let b = RecordSet::new(records);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_ignores_rejected_rows() {
        let a = sample();
        let b = RecordSet::with_rejected(
            a.records().to_vec(),
            vec![RejectedRow {
                line: Some(7),
                reason: "bad marks".into(),
            }],
        );
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_filter_by_department_and_search() {
        let set = sample();

        let by_dept = set.filter(&RecordFilter {
            departments: Some(vec!["Mathematics".into()]),
            ..Default::default()
        });
        assert_eq!(by_dept.len(), 1);
        assert_eq!(by_dept.records()[0].student_id, "S002");

        let by_name = set.filter(&RecordFilter {
            student_search: Some("ada".into()),
            ..Default::default()
        });
        assert_eq!(by_name.len(), 2);
    }

    #[test]
    fn test_distinct_values_keep_first_appearance() {
        let set = sample();
        assert_eq!(set.semesters(), vec!["Fall 2023", "Spring 2024"]);
        assert_eq!(set.departments(), vec!["Computer Science", "Mathematics"]);
    }

    #[test]
    fn test_normalized_trims_and_uppercases() {
        let record = CourseRecord::new("  S001 ", " cs101 ", 3.0, 80.0).normalized();
        assert_eq!(record.student_id, "S001");
        assert_eq!(record.course_code, "CS101");
    }
}
