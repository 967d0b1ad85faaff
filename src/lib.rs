//! Grading and analytics over per-course academic records.
//!
//! Marks are mapped to grade points through a validated [`scale::GradeScale`],
//! folded into credit-weighted GPAs by [`gpa::compute`], and aggregated into
//! cohort, subject, department and semester views by [`analyzers`]. An
//! [`session::AnalysisSession`] ties one record set to a scale and memoizes
//! every view in a content-addressed [`cache::AnalyticsCache`].

pub mod analyzers;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod gpa;
pub mod loader;
pub mod metric;
pub mod output;
pub mod records;
pub mod scale;
pub mod session;
