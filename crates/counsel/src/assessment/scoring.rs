//! Pure scoring for the three-section stress self-assessment.
//!
//! Each section carries exactly ten answers. Sections 1 and 3 use a 1-5
//! scale, section 2 is binary (YES=1 / NO=5). Section 3 question 8 is the
//! one positive-valence question in a negative section and is score-reversed
//! (`6 - raw`) before aggregation; the reversed value is what gets persisted.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const QUESTIONS_PER_SECTION: usize = 10;
const REVERSED_QUESTION: &str = "q8";

/// Raw client answers, one map per questionnaire section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAnswers {
    pub section1: BTreeMap<String, u8>,
    pub section2: BTreeMap<String, u8>,
    pub section3: BTreeMap<String, u8>,
}

/// Questionnaire sections, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    MentalHealthQuality,
    UniversityLife,
    SelfAssessment,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Section::MentalHealthQuality => "section 1",
            Section::UniversityLife => "section 2",
            Section::SelfAssessment => "section 3",
        };
        f.write_str(name)
    }
}

/// Malformed scoring input. Raised before any score is computed; values are
/// never silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoringError {
    #[error("{section}: missing answer for {question}")]
    MissingAnswer { section: Section, question: String },
    #[error("{section}: unexpected question '{question}'")]
    UnexpectedQuestion { section: Section, question: String },
    #[error("{section}: answer {value} for {question} is outside the allowed scale")]
    AnswerOutOfRange {
        section: Section,
        question: String,
        value: u8,
    },
}

/// Three-level stress classification derived from the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

const LOW_RECOMMENDATION: &str = "Your assessment indicates a low stress level. \
You're managing well! Continue maintaining healthy habits and reach out if you need support.";

const MODERATE_RECOMMENDATION: &str = "Your assessment indicates a moderate stress level. \
Consider speaking with a counselor to discuss strategies for managing stress and improving \
your well-being.";

const HIGH_RECOMMENDATION: &str = "Your assessment indicates a high stress level. \
We strongly recommend booking an appointment with a counselor to discuss your concerns \
and develop a support plan.";

impl StressLevel {
    /// Classify a rounded overall score. Boundaries are closed on the upper
    /// side: 2.33 is Low, 3.66 is Moderate.
    pub fn classify(overall_score: f64) -> Self {
        if overall_score <= 2.33 {
            StressLevel::Low
        } else if overall_score <= 3.66 {
            StressLevel::Moderate
        } else {
            StressLevel::High
        }
    }

    pub const fn recommendation(self) -> &'static str {
        match self {
            StressLevel::Low => LOW_RECOMMENDATION,
            StressLevel::Moderate => MODERATE_RECOMMENDATION,
            StressLevel::High => HIGH_RECOMMENDATION,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            StressLevel::Low => "Low",
            StressLevel::Moderate => "Moderate",
            StressLevel::High => "High",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Low" => Some(StressLevel::Low),
            "Moderate" => Some(StressLevel::Moderate),
            "High" => Some(StressLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for StressLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The validated, scored outcome of one submission. `answers.section3`
/// already carries the reversed value for q8.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAssessment {
    pub answers: AssessmentAnswers,
    pub section1_score: f64,
    pub section2_score: f64,
    pub section3_score: f64,
    pub overall_score: f64,
    pub stress_level: StressLevel,
    pub recommendation: &'static str,
}

/// Reverse a 1-5 answer so the scale points the other way.
pub fn reverse_scale(answer: u8) -> u8 {
    6 - answer
}

/// Validate the raw answers, apply the section 3 q8 reversal, and compute
/// section scores, overall score, and classification.
///
/// Scores are `sum / 10.0` per section and the mean of the three sections
/// overall, each rounded to two decimals with ties rounding away from zero
/// (equivalent to round-half-up for these non-negative values).
pub fn score_assessment(mut answers: AssessmentAnswers) -> Result<ScoredAssessment, ScoringError> {
    validate_section(Section::MentalHealthQuality, &answers.section1, |v| {
        (1..=5).contains(&v)
    })?;
    validate_section(Section::UniversityLife, &answers.section2, |v| {
        v == 1 || v == 5
    })?;
    validate_section(Section::SelfAssessment, &answers.section3, |v| {
        (1..=5).contains(&v)
    })?;

    if let Some(raw) = answers.section3.get_mut(REVERSED_QUESTION) {
        *raw = reverse_scale(*raw);
    }

    let section1_score = section_score(&answers.section1);
    let section2_score = section_score(&answers.section2);
    let section3_score = section_score(&answers.section3);
    let overall_score = round2((section1_score + section2_score + section3_score) / 3.0);
    let stress_level = StressLevel::classify(overall_score);

    Ok(ScoredAssessment {
        answers,
        section1_score,
        section2_score,
        section3_score,
        overall_score,
        stress_level,
        recommendation: stress_level.recommendation(),
    })
}

fn section_score(answers: &BTreeMap<String, u8>) -> f64 {
    let sum: u32 = answers.values().map(|&v| u32::from(v)).sum();
    round2(f64::from(sum) / QUESTIONS_PER_SECTION as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_section(
    section: Section,
    answers: &BTreeMap<String, u8>,
    allowed: fn(u8) -> bool,
) -> Result<(), ScoringError> {
    for index in 1..=QUESTIONS_PER_SECTION {
        let question = format!("q{index}");
        match answers.get(&question) {
            None => {
                return Err(ScoringError::MissingAnswer { section, question });
            }
            Some(&value) if !allowed(value) => {
                return Err(ScoringError::AnswerOutOfRange {
                    section,
                    question,
                    value,
                });
            }
            Some(_) => {}
        }
    }

    if answers.len() != QUESTIONS_PER_SECTION {
        let question = answers
            .keys()
            .find(|key| !is_expected_question(key))
            .cloned()
            .unwrap_or_default();
        return Err(ScoringError::UnexpectedQuestion { section, question });
    }

    Ok(())
}

fn is_expected_question(key: &str) -> bool {
    (1..=QUESTIONS_PER_SECTION).any(|index| key == format!("q{index}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_section(value: u8) -> BTreeMap<String, u8> {
        (1..=QUESTIONS_PER_SECTION)
            .map(|index| (format!("q{index}"), value))
            .collect()
    }

    fn answers(s1: u8, s2: u8, s3: u8) -> AssessmentAnswers {
        AssessmentAnswers {
            section1: uniform_section(s1),
            section2: uniform_section(s2),
            section3: uniform_section(s3),
        }
    }

    #[test]
    fn worked_example_scores_low() {
        let scored = score_assessment(answers(2, 1, 2)).expect("valid input scores");

        assert_eq!(scored.section1_score, 2.0);
        assert_eq!(scored.section2_score, 1.0);
        // q8 raw 2 reverses to 4: (2 * 9 + 4) / 10 = 2.2
        assert_eq!(scored.section3_score, 2.2);
        assert_eq!(scored.overall_score, 1.73);
        assert_eq!(scored.stress_level, StressLevel::Low);
        assert_eq!(scored.recommendation, StressLevel::Low.recommendation());
    }

    #[test]
    fn reversed_value_is_what_gets_kept() {
        let scored = score_assessment(answers(1, 1, 2)).expect("valid input scores");
        assert_eq!(scored.answers.section3.get("q8"), Some(&4));
        assert_eq!(scored.answers.section3.get("q7"), Some(&2));
    }

    #[test]
    fn reversal_law_holds() {
        for raw in 1..=5u8 {
            assert_eq!(reverse_scale(reverse_scale(raw)), raw);
        }
        assert_eq!(reverse_scale(1), 5);
        assert_eq!(reverse_scale(5), 1);
        assert_eq!(reverse_scale(3), 3);
    }

    #[test]
    fn section_scores_stay_in_scale_bounds() {
        for value in [1u8, 5u8] {
            let scored = score_assessment(answers(value, value, value)).expect("valid input");
            for score in [
                scored.section1_score,
                scored.section2_score,
                scored.section3_score,
                scored.overall_score,
            ] {
                assert!((1.0..=5.0).contains(&score), "score {score} out of range");
            }
        }
    }

    #[test]
    fn classification_boundaries_are_closed_above() {
        assert_eq!(StressLevel::classify(2.33), StressLevel::Low);
        assert_eq!(StressLevel::classify(2.34), StressLevel::Moderate);
        assert_eq!(StressLevel::classify(3.66), StressLevel::Moderate);
        assert_eq!(StressLevel::classify(3.67), StressLevel::High);
    }

    #[test]
    fn high_classification_end_to_end() {
        let scored = score_assessment(answers(5, 5, 5)).expect("valid input");
        // q8 raw 5 reverses to 1: (5 * 9 + 1) / 10 = 4.6
        assert_eq!(scored.section3_score, 4.6);
        assert_eq!(scored.overall_score, 4.87);
        assert_eq!(scored.stress_level, StressLevel::High);
    }

    #[test]
    fn mixed_answers_round_to_two_decimals() {
        // section 1: five 1s and five 2s -> 15 / 10 = 1.5
        // section 3: all 1s with q8 reversed to 5 -> 14 / 10 = 1.4
        let mut input = answers(1, 1, 1);
        for index in 6..=QUESTIONS_PER_SECTION {
            input.section1.insert(format!("q{index}"), 2);
        }
        let scored = score_assessment(input).expect("valid input");
        assert_eq!(scored.section1_score, 1.5);
        assert_eq!(scored.section3_score, 1.4);
        assert_eq!(scored.overall_score, 1.3);
    }

    #[test]
    fn missing_answer_is_rejected() {
        let mut input = answers(2, 1, 2);
        input.section1.remove("q4");
        let err = score_assessment(input).expect_err("missing key rejected");
        assert_eq!(
            err,
            ScoringError::MissingAnswer {
                section: Section::MentalHealthQuality,
                question: "q4".to_string(),
            }
        );
    }

    #[test]
    fn unexpected_question_is_rejected() {
        let mut input = answers(2, 1, 2);
        input.section3.insert("q11".to_string(), 3);
        let err = score_assessment(input).expect_err("extra key rejected");
        assert_eq!(
            err,
            ScoringError::UnexpectedQuestion {
                section: Section::SelfAssessment,
                question: "q11".to_string(),
            }
        );
    }

    #[test]
    fn out_of_range_answer_is_rejected() {
        let mut input = answers(2, 1, 2);
        input.section1.insert("q2".to_string(), 6);
        let err = score_assessment(input).expect_err("out of range rejected");
        assert_eq!(
            err,
            ScoringError::AnswerOutOfRange {
                section: Section::MentalHealthQuality,
                question: "q2".to_string(),
                value: 6,
            }
        );
    }

    #[test]
    fn binary_section_rejects_mid_scale_values() {
        let mut input = answers(2, 1, 2);
        input.section2.insert("q6".to_string(), 3);
        let err = score_assessment(input).expect_err("binary section enforced");
        assert_eq!(
            err,
            ScoringError::AnswerOutOfRange {
                section: Section::UniversityLife,
                question: "q6".to_string(),
                value: 3,
            }
        );
    }
}
