//! Anonymous stress self-assessment: static questionnaire, scoring, and
//! submission records.

pub mod domain;
pub mod questions;
pub mod router;
pub mod scoring;
pub mod service;

pub use domain::{AnalyticsPeriod, AnalyticsSummary, SubmissionRecord, SubmissionSummary};
pub use questions::questionnaire;
pub use router::assessment_router;
pub use scoring::{score_assessment, AssessmentAnswers, ScoringError, StressLevel};
pub use service::{AssessmentError, AssessmentService};
