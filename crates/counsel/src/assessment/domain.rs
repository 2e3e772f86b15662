use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::scoring::StressLevel;

/// An immutable record of one completed self-assessment. Scores are computed
/// once at submission time and never recomputed; `section3_answers` carries
/// the reversed value for q8.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub submission_id: String,
    pub submitted_at: DateTime<Utc>,
    pub section1_answers: BTreeMap<String, u8>,
    pub section2_answers: BTreeMap<String, u8>,
    pub section3_answers: BTreeMap<String, u8>,
    pub section1_score: f64,
    pub section2_score: f64,
    pub section3_score: f64,
    pub overall_score: f64,
    pub stress_level: StressLevel,
    pub recommendation: String,
}

/// Compact listing entry for counselors reviewing recent submissions.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionSummary {
    pub submission_id: String,
    pub submitted_at: DateTime<Utc>,
    pub overall_score: f64,
    pub stress_level: StressLevel,
    pub recommendation: String,
}

/// Aggregates over stored submissions for the analytics endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_assessments: u64,
    pub average_score: f64,
    pub low_stress: u64,
    pub moderate_stress: u64,
    pub high_stress: u64,
}

/// Reporting window for assessment analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsPeriod {
    Last7Days,
    Last30Days,
    Last90Days,
    All,
}

impl AnalyticsPeriod {
    /// Parse the query-string form; unknown values fall back to `All`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "7days" => AnalyticsPeriod::Last7Days,
            "30days" => AnalyticsPeriod::Last30Days,
            "90days" => AnalyticsPeriod::Last90Days,
            _ => AnalyticsPeriod::All,
        }
    }

    pub fn since(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            AnalyticsPeriod::Last7Days => 7,
            AnalyticsPeriod::Last30Days => 30,
            AnalyticsPeriod::Last90Days => 90,
            AnalyticsPeriod::All => return None,
        };
        Some(now - Duration::days(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_period_means_all_time() {
        assert_eq!(AnalyticsPeriod::parse("7days"), AnalyticsPeriod::Last7Days);
        assert_eq!(AnalyticsPeriod::parse("everything"), AnalyticsPeriod::All);
        assert_eq!(AnalyticsPeriod::All.since(Utc::now()), None);
    }

    #[test]
    fn windowed_period_counts_back_from_now() {
        let now = Utc::now();
        let since = AnalyticsPeriod::Last30Days.since(now).expect("windowed");
        assert_eq!(now - since, Duration::days(30));
    }
}
