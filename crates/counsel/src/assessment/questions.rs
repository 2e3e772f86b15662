//! Static questionnaire served to clients before they submit answers.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Questionnaire {
    pub section1: QuestionSection,
    pub section2: QuestionSection,
    pub section3: QuestionSection,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionSection {
    pub title: &'static str,
    pub description: &'static str,
    pub questions: Vec<Question>,
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub text: &'static str,
    pub valence: Valence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Valence {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AnswerOption {
    pub value: u8,
    pub label: &'static str,
}

fn question(id: &'static str, text: &'static str, valence: Valence) -> Question {
    Question {
        id,
        text,
        valence,
        note: None,
    }
}

/// The full three-section questionnaire, ten questions per section.
pub fn questionnaire() -> Questionnaire {
    Questionnaire {
        section1: QuestionSection {
            title: "Mental Health Quality",
            description: "Rate your current state (Excellent to Poor)",
            questions: vec![
                question("q1", "Rate your mental wellbeing", Valence::Positive),
                question("q2", "Your mood for the past 2 weeks", Valence::Positive),
                question("q3", "Your outlook in life", Valence::Positive),
                question("q4", "Intrapersonal relationship", Valence::Positive),
                question("q5", "Feelings towards your surroundings", Valence::Positive),
                question("q6", "Sleep cycle", Valence::Positive),
                question("q7", "Sleep quality", Valence::Positive),
                question("q8", "Relationship with family", Valence::Positive),
                question("q9", "Relationship with friends", Valence::Positive),
                question("q10", "Physical Health", Valence::Positive),
            ],
            options: vec![
                AnswerOption {
                    value: 1,
                    label: "Excellent",
                },
                AnswerOption {
                    value: 2,
                    label: "Good",
                },
                AnswerOption {
                    value: 3,
                    label: "Fair",
                },
                AnswerOption {
                    value: 4,
                    label: "Bad",
                },
                AnswerOption {
                    value: 5,
                    label: "Poor",
                },
            ],
        },
        section2: QuestionSection {
            title: "University Life",
            description: "Answer YES or NO",
            questions: vec![
                question(
                    "q1",
                    "Are you finding it easy to adjust to your new environment?",
                    Valence::Positive,
                ),
                question(
                    "q2",
                    "Are you happy with your current course?",
                    Valence::Positive,
                ),
                question(
                    "q3",
                    "Do you feel productive with your course?",
                    Valence::Positive,
                ),
                question(
                    "q4",
                    "Are you satisfied with your current academic performance?",
                    Valence::Positive,
                ),
                question(
                    "q5",
                    "Are your professors/instructors approachable and understanding?",
                    Valence::Positive,
                ),
                question(
                    "q6",
                    "Is your allowance sufficient for your needs?",
                    Valence::Positive,
                ),
                question(
                    "q7",
                    "Do you feel safe and at ease on campus?",
                    Valence::Positive,
                ),
                question(
                    "q8",
                    "Are you comfortable making new friends at university?",
                    Valence::Positive,
                ),
                question(
                    "q9",
                    "Have you felt sense of personal growth or development since starting university?",
                    Valence::Positive,
                ),
                question(
                    "q10",
                    "Do you feel like you have a good work-life balance?",
                    Valence::Positive,
                ),
            ],
            options: vec![
                AnswerOption {
                    value: 1,
                    label: "YES",
                },
                AnswerOption {
                    value: 5,
                    label: "NO",
                },
            ],
        },
        section3: QuestionSection {
            title: "Self Assessment",
            description: "How often do you experience these? (Not at all/Never to Very Much/Always)",
            questions: vec![
                question(
                    "q1",
                    "Are you having a difficulty coping with your stressors?",
                    Valence::Negative,
                ),
                question(
                    "q2",
                    "Do people's perception about you affects you?",
                    Valence::Negative,
                ),
                question(
                    "q3",
                    "Does your medical health or mental wellbeing limits your daily productivity?",
                    Valence::Negative,
                ),
                question("q4", "Do you have trouble sleeping?", Valence::Negative),
                question("q5", "Do you smoke cigarettes/e-cigars?", Valence::Negative),
                question("q6", "Do you drink liquors?", Valence::Negative),
                question(
                    "q7",
                    "Do you get in conflict with your partner or family members?",
                    Valence::Negative,
                ),
                Question {
                    id: "q8",
                    text: "Do you feel calmness and happiness?",
                    valence: Valence::Positive,
                    note: Some("REVERSED SCORING"),
                },
                question("q9", "Do you feel sad and depress?", Valence::Negative),
                question("q10", "Do you feel angry and aggressive?", Valence::Negative),
            ],
            options: vec![
                AnswerOption {
                    value: 1,
                    label: "Not at all/Never",
                },
                AnswerOption {
                    value: 2,
                    label: "Rarely",
                },
                AnswerOption {
                    value: 3,
                    label: "Sometimes",
                },
                AnswerOption {
                    value: 4,
                    label: "Often",
                },
                AnswerOption {
                    value: 5,
                    label: "Very Much/Always",
                },
            ],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::scoring::QUESTIONS_PER_SECTION;

    #[test]
    fn every_section_has_ten_questions() {
        let questionnaire = questionnaire();
        for section in [
            &questionnaire.section1,
            &questionnaire.section2,
            &questionnaire.section3,
        ] {
            assert_eq!(section.questions.len(), QUESTIONS_PER_SECTION);
        }
    }

    #[test]
    fn binary_section_offers_only_yes_and_no() {
        let questionnaire = questionnaire();
        let values: Vec<u8> = questionnaire
            .section2
            .options
            .iter()
            .map(|option| option.value)
            .collect();
        assert_eq!(values, vec![1, 5]);
    }

    #[test]
    fn only_section3_q8_is_reversed() {
        let questionnaire = questionnaire();
        let reversed: Vec<&str> = questionnaire
            .section3
            .questions
            .iter()
            .filter(|q| q.valence == Valence::Positive)
            .map(|q| q.id)
            .collect();
        assert_eq!(reversed, vec!["q8"]);
    }
}
