//! One analysis session: a record set, a grade scale and pass thresholds,
//! with every operation memoized in an [`AnalyticsCache`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::analyzers::types::{
    Analysis, CohortSummary, DepartmentSummary, GradeCount, SemesterTrend, StudentRank,
    SubjectSummary,
};
use crate::analyzers::{aggregate, department, distribution, leaderboard, semester, subject};
use crate::cache::{AnalyticsCache, CacheKey, Fingerprint, FingerprintBuilder};
use crate::gpa::{self, GpaReport};
use crate::records::{RecordSet, RejectedRow};
use crate::scale::{GradeScale, Thresholds};

/// Number of students in [`AnalyticsBundle::top_students`].
pub const BUNDLE_TOP_N: usize = 10;

/// Everything the engine can report about one session, ready for export.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsBundle {
    pub generated_at: DateTime<Utc>,
    pub scale: GradeScale,
    pub thresholds: Thresholds,
    pub records_fingerprint: Fingerprint,
    pub rejected_rows: Vec<RejectedRow>,
    pub gpa: GpaReport,
    pub cohort: Analysis<CohortSummary>,
    pub subjects: Analysis<Vec<SubjectSummary>>,
    pub departments: Analysis<Vec<DepartmentSummary>>,
    pub semesters: Analysis<SemesterTrend>,
    pub top_students: Vec<StudentRank>,
    pub grade_distribution: Vec<GradeCount>,
}

#[derive(Debug)]
pub struct AnalysisSession {
    records: RecordSet,
    scale: GradeScale,
    thresholds: Thresholds,
    records_fp: Fingerprint,
    scale_fp: Fingerprint,
    cache: Arc<AnalyticsCache>,
}

impl AnalysisSession {
    /// Starts a session with a private cache.
    pub fn new(records: RecordSet, scale: GradeScale, thresholds: Thresholds) -> Self {
        Self::with_cache(records, scale, thresholds, Arc::new(AnalyticsCache::new()))
    }

    /// Starts a session backed by a shared cache. Sessions over identical
    /// inputs reuse each other's results.
    pub fn with_cache(
        records: RecordSet,
        scale: GradeScale,
        thresholds: Thresholds,
        cache: Arc<AnalyticsCache>,
    ) -> Self {
        let records_fp = records.fingerprint();
        let scale_fp = scale.fingerprint();
        info!(
            records = records.len(),
            rejected = records.rejected().len(),
            scale = scale.name(),
            fingerprint = %records_fp,
            "Analysis session started"
        );
        Self {
            records,
            scale,
            thresholds,
            records_fp,
            scale_fp,
            cache,
        }
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn scale(&self) -> &GradeScale {
        &self.scale
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn cache(&self) -> &Arc<AnalyticsCache> {
        &self.cache
    }

    /// Swaps in a new record set. Cached results for the previous content
    /// are dropped unless the new set is identical.
    pub fn replace_records(&mut self, records: RecordSet) {
        let fingerprint = records.fingerprint();
        if fingerprint != self.records_fp {
            let dropped = self.cache.invalidate_inputs(self.records_fp, self.scale_fp);
            info!(dropped, fingerprint = %fingerprint, "Records replaced");
            self.records_fp = fingerprint;
        }
        self.records = records;
    }

    /// Swaps in a new grade scale. Cached results for the previous scale
    /// are dropped unless the new scale has the same bands and mapping.
    pub fn replace_scale(&mut self, scale: GradeScale) {
        let fingerprint = scale.fingerprint();
        if fingerprint != self.scale_fp {
            let dropped = self.cache.invalidate_inputs(self.records_fp, self.scale_fp);
            info!(dropped, scale = scale.name(), "Scale replaced");
            self.scale_fp = fingerprint;
        }
        self.scale = scale;
    }

    /// Thresholds are part of each cache key, so no invalidation is needed.
    pub fn set_thresholds(&mut self, thresholds: Thresholds) {
        self.thresholds = thresholds;
    }

    fn key(&self, operation: &str, params: impl FnOnce(&mut FingerprintBuilder)) -> CacheKey {
        CacheKey::with_params(self.records_fp, self.scale_fp, operation, params)
    }

    fn thresholds_key(&self, operation: &str) -> CacheKey {
        let thresholds = self.thresholds;
        self.key(operation, |h| thresholds.feed(h))
    }

    pub fn gpa(&self) -> Arc<GpaReport> {
        self.cache.get_or_compute(self.key("gpa", |_| {}), || {
            Arc::new(gpa::compute(&self.records, &self.scale))
        })
    }

    pub fn cohort_summary(&self) -> Analysis<CohortSummary> {
        self.cache
            .get_or_compute(self.thresholds_key("cohort_summary"), || {
                aggregate::cohort_summary(&self.records, &self.gpa(), &self.thresholds)
            })
    }

    pub fn subject_summaries(&self) -> Analysis<Vec<SubjectSummary>> {
        self.cache
            .get_or_compute(self.thresholds_key("subject_summaries"), || {
                subject::subject_summaries(&self.records, &self.gpa(), &self.thresholds)
            })
    }

    pub fn department_summaries(&self) -> Analysis<Vec<DepartmentSummary>> {
        self.cache
            .get_or_compute(self.thresholds_key("department_summaries"), || {
                department::department_summaries(&self.records, &self.gpa(), &self.thresholds)
            })
    }

    pub fn semester_trend(&self) -> Analysis<SemesterTrend> {
        self.cache
            .get_or_compute(self.thresholds_key("semester_trend"), || {
                semester::semester_trend(&self.records, &self.gpa(), &self.thresholds)
            })
    }

    pub fn top_students(&self, n: usize) -> Vec<StudentRank> {
        let key = self.key("top_students", |h| {
            h.u64(n as u64);
        });
        self.cache
            .get_or_compute(key, || leaderboard::top_students(&self.gpa(), n))
    }

    pub fn grade_distribution(&self) -> Vec<GradeCount> {
        self.cache.get_or_compute(self.key("grade_distribution", |_| {}), || {
            distribution::grade_distribution(&self.gpa(), &self.scale)
        })
    }

    /// Runs every aggregation and collects the results for export.
    pub fn bundle(&self) -> AnalyticsBundle {
        AnalyticsBundle {
            generated_at: Utc::now(),
            scale: self.scale.clone(),
            thresholds: self.thresholds,
            records_fingerprint: self.records_fp,
            rejected_rows: self.records.rejected().to_vec(),
            gpa: GpaReport::clone(&self.gpa()),
            cohort: self.cohort_summary(),
            subjects: self.subject_summaries(),
            departments: self.department_summaries(),
            semesters: self.semester_trend(),
            top_students: self.top_students(BUNDLE_TOP_N),
            grade_distribution: self.grade_distribution(),
        }
    }
}
