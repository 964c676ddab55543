// src/models/exam.rs

use serde::{Deserialize, Serialize};

use crate::models::question::{PublicQuestion, Question};

/// A certification exam, as persisted in `exams.json` / the `exams` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub title: String,
    pub description: String,

    /// Time limit in minutes.
    pub duration: u32,

    /// How many questions of `questions` are served and scored.
    /// Zero means "all of them".
    pub total_questions: u32,

    /// Minimum score (percentage) required to pass.
    pub passing_score: u32,

    #[serde(default)]
    pub questions: Vec<Question>,
}

impl Exam {
    /// The questions that are actually served and scored: the first
    /// `total_questions` entries, or all of them when the count is zero or
    /// exceeds the list.
    pub fn active_questions(&self) -> &[Question] {
        let limit = self.total_questions as usize;
        if limit == 0 || limit >= self.questions.len() {
            &self.questions
        } else {
            &self.questions[..limit]
        }
    }
}

/// Exam listing entry (no questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub total_questions: u32,
    pub passing_score: u32,
}

impl From<&Exam> for ExamSummary {
    fn from(exam: &Exam) -> Self {
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            description: exam.description.clone(),
            duration: exam.duration,
            total_questions: exam.total_questions,
            passing_score: exam.passing_score,
        }
    }
}

/// Exam handed to a candidate: active questions only, answers stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExam {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub total_questions: u32,
    pub passing_score: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Exam> for PublicExam {
    fn from(exam: &Exam) -> Self {
        let questions: Vec<PublicQuestion> =
            exam.active_questions().iter().map(PublicQuestion::from).collect();
        Self {
            id: exam.id.clone(),
            title: exam.title.clone(),
            description: exam.description.clone(),
            duration: exam.duration,
            total_questions: questions.len() as u32,
            passing_score: exam.passing_score,
            questions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exam_with(n: usize, total: u32) -> Exam {
        Exam {
            id: "exam-x".to_string(),
            title: "X".to_string(),
            description: String::new(),
            duration: 10,
            total_questions: total,
            passing_score: 70,
            questions: (1..=n as i64)
                .map(|id| Question {
                    id,
                    text: format!("Q{}", id),
                    options: vec!["a".into(), "b".into()],
                    correct_answer: 0,
                    category: "c".into(),
                })
                .collect(),
        }
    }

    #[test]
    fn active_questions_truncates_to_total() {
        let exam = exam_with(5, 3);
        let ids: Vec<i64> = exam.active_questions().iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn active_questions_zero_or_oversized_means_all() {
        assert_eq!(exam_with(4, 0).active_questions().len(), 4);
        assert_eq!(exam_with(4, 60).active_questions().len(), 4);
    }

    #[test]
    fn public_exam_hides_answers() {
        let public = PublicExam::from(&exam_with(2, 2));
        let json = serde_json::to_value(&public).unwrap();
        assert!(json["questions"][0].get("correctAnswer").is_none());
        assert_eq!(json["totalQuestions"], 2);
    }
}
