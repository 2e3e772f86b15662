use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::store::{CounselStore, StoreError};

use super::domain::{AnalyticsPeriod, AnalyticsSummary, SubmissionRecord, SubmissionSummary};
use super::scoring::{score_assessment, AssessmentAnswers, ScoringError};

const DEFAULT_LISTING_LIMIT: u32 = 50;
const MAX_LISTING_LIMIT: u32 = 100;

/// Service wrapping scoring and submission persistence.
pub struct AssessmentService<S> {
    store: Arc<S>,
}

#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl<S> AssessmentService<S>
where
    S: CounselStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Score a submission and persist the immutable record. The stored
    /// section 3 answers carry the reversed q8 value, so re-reading the
    /// record never re-applies the reversal.
    pub fn submit(&self, answers: AssessmentAnswers) -> Result<SubmissionRecord, AssessmentError> {
        let scored = score_assessment(answers)?;
        let record = SubmissionRecord {
            submission_id: Uuid::new_v4().to_string(),
            submitted_at: Utc::now(),
            section1_answers: scored.answers.section1,
            section2_answers: scored.answers.section2,
            section3_answers: scored.answers.section3,
            section1_score: scored.section1_score,
            section2_score: scored.section2_score,
            section3_score: scored.section3_score,
            overall_score: scored.overall_score,
            stress_level: scored.stress_level,
            recommendation: scored.recommendation.to_string(),
        };
        self.store.insert_submission(&record)?;
        tracing::info!(
            submission_id = %record.submission_id,
            stress_level = %record.stress_level,
            "assessment submitted"
        );
        Ok(record)
    }

    pub fn submission(&self, submission_id: &str) -> Result<Option<SubmissionRecord>, AssessmentError> {
        Ok(self.store.fetch_submission(submission_id)?)
    }

    /// Newest-first page of submissions. Limit is clamped to keep a single
    /// response bounded.
    pub fn recent_submissions(
        &self,
        skip: u32,
        limit: Option<u32>,
    ) -> Result<Vec<SubmissionSummary>, AssessmentError> {
        let limit = limit
            .unwrap_or(DEFAULT_LISTING_LIMIT)
            .clamp(1, MAX_LISTING_LIMIT);
        Ok(self.store.list_submissions(skip, limit)?)
    }

    pub fn analytics(&self, period: AnalyticsPeriod) -> Result<AnalyticsSummary, AssessmentError> {
        let since = period.since(Utc::now());
        Ok(self.store.assessment_analytics(since)?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::store::MemoryStore;

    fn answers(section1: u8, section2: u8, section3: u8) -> AssessmentAnswers {
        let section = |value: u8| -> BTreeMap<String, u8> {
            (1..=10).map(|n| (format!("q{n}"), value)).collect()
        };
        AssessmentAnswers {
            section1: section(section1),
            section2: section(section2),
            section3: section(section3),
        }
    }

    fn service() -> AssessmentService<MemoryStore> {
        AssessmentService::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn submit_persists_a_scored_record() {
        let service = service();
        let record = service.submit(answers(2, 1, 2)).expect("valid submission");
        assert_eq!(record.overall_score, 1.73);

        let fetched = service
            .submission(&record.submission_id)
            .expect("store reachable")
            .expect("record present");
        assert_eq!(fetched, record);
    }

    #[test]
    fn invalid_answers_are_rejected_before_any_write() {
        let service = service();
        let mut bad = answers(2, 1, 2);
        bad.section1.remove("q10");
        assert!(matches!(
            service.submit(bad),
            Err(AssessmentError::Scoring(ScoringError::MissingAnswer { .. }))
        ));
        assert!(service
            .recent_submissions(0, None)
            .expect("store reachable")
            .is_empty());
    }

    #[test]
    fn listing_limit_is_clamped() {
        let service = service();
        for _ in 0..3 {
            service.submit(answers(1, 1, 1)).expect("valid submission");
        }
        let listed = service
            .recent_submissions(0, Some(100_000))
            .expect("store reachable");
        assert_eq!(listed.len(), 3);
        let one = service
            .recent_submissions(0, Some(1))
            .expect("store reachable");
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn analytics_counts_stress_bands() {
        let service = service();
        service.submit(answers(1, 1, 1)).expect("low");
        service.submit(answers(5, 5, 5)).expect("high");

        let summary = service
            .analytics(AnalyticsPeriod::All)
            .expect("store reachable");
        assert_eq!(summary.total_assessments, 2);
        assert_eq!(summary.low_stress, 1);
        assert_eq!(summary.high_stress, 1);
    }
}
