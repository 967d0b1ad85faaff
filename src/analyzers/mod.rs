//! Cohort, subject, department and semester aggregation.
//!
//! Every aggregation reads a [`RecordSet`](crate::records::RecordSet) and the
//! [`GpaReport`](crate::gpa::GpaReport) computed from it, groups record
//! indices by an explicit key, and returns an [`Analysis`](types::Analysis)
//! carrying the result and its diagnostics.

pub mod aggregate;
pub mod department;
pub mod distribution;
pub mod grouping;
pub mod leaderboard;
pub mod semester;
pub mod subject;
pub mod types;
pub mod utility;
