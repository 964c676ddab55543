// src/services/exams.rs

use std::collections::HashMap;

use chrono::Utc;

use crate::{
    error::AppError,
    models::{
        exam::{Exam, PublicExam},
        exam_response::{SubmitExamRequest, UserExamResponse},
        question::Question,
        user::User,
    },
    services::certificates::generate_certificate,
    store::RecordStore,
};

/// Preferred field (normalized) → exam offered for it.
const FIELD_EXAMS: &[(&str, &str)] = &[
    ("oracleapex", "exam-001"),
    ("apex", "exam-001"),
    ("oracle", "exam-001"),
    ("nodejs", "exam-002"),
    ("node", "exam-002"),
    ("nodejsdevelopment", "exam-002"),
    ("react", "exam-003"),
    ("reactjs", "exam-003"),
    ("reactframework", "exam-003"),
];

/// Lowercases and drops everything but ASCII letters and digits, so
/// "Node.js", "node js" and "NODEJS" all compare equal.
fn normalize_field(field: &str) -> String {
    field
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Exam id mapped to a preferred field, if the field is known.
pub fn exam_id_for_field(field: &str) -> Option<&'static str> {
    let key = normalize_field(field);
    FIELD_EXAMS
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, exam_id)| *exam_id)
}

/// Narrows the exam catalogue down to what `user` may take.
///
/// An assignment wins over the preferred field. Anything that does not
/// resolve to an existing exam leaves the full catalogue available.
pub fn select_available_exams(user: &User, exams: Vec<Exam>) -> Vec<Exam> {
    if let Some(assigned) = user.assigned_exam_id.as_deref() {
        if exams.iter().any(|e| e.id == assigned) {
            return exams.into_iter().filter(|e| e.id == assigned).collect();
        }
        tracing::warn!(
            "User {} is assigned to unknown exam '{}', ignoring assignment",
            user.id,
            assigned
        );
    }

    if let Some(exam_id) = user.preferred_field.as_deref().and_then(exam_id_for_field) {
        if exams.iter().any(|e| e.id == exam_id) {
            return exams.into_iter().filter(|e| e.id == exam_id).collect();
        }
    }

    exams
}

pub async fn available_exams_for_user(
    store: &dyn RecordStore,
    user: &User,
) -> Result<Vec<Exam>, AppError> {
    let exams = store.list_exams().await?;
    Ok(select_available_exams(user, exams))
}

/// First available exam, questions stripped of their answers.
pub async fn current_exam_for_user(
    store: &dyn RecordStore,
    user: &User,
) -> Result<PublicExam, AppError> {
    available_exams_for_user(store, user)
        .await?
        .first()
        .map(PublicExam::from)
        .ok_or_else(|| AppError::NotFound("No exams available".to_string()))
}

/// Looks up an exam the user is allowed to take.
pub async fn exam_for_user(
    store: &dyn RecordStore,
    user: &User,
    exam_id: &str,
) -> Result<Exam, AppError> {
    available_exams_for_user(store, user)
        .await?
        .into_iter()
        .find(|e| e.id == exam_id)
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
}

/// Integer percentage, rounded half up. Zero questions score zero.
pub fn score_percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct * 200 + total) / (total * 2)) as u32
}

/// Counts answers equal to the question's correct option.
/// Returns (correct_count, score_percentage).
pub fn grade(questions: &[Question], answers: &HashMap<i64, usize>) -> (usize, u32) {
    let correct_count = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_answer))
        .count();
    (correct_count, score_percentage(correct_count, questions.len()))
}

/// Grades an attempt and, on a pass, issues the certificate for
/// (user, exam). The attempt itself is not persisted.
pub async fn submit_exam(
    store: &dyn RecordStore,
    user: &User,
    req: SubmitExamRequest,
) -> Result<UserExamResponse, AppError> {
    let exam = exam_for_user(store, user, &req.exam_id).await?;

    let questions = exam.active_questions();
    if questions.is_empty() {
        return Err(AppError::BadRequest("Exam has no questions".to_string()));
    }

    let (correct_count, score) = grade(questions, &req.answers);
    let passed_exam = score >= exam.passing_score;

    tracing::info!(
        "User {} scored {}% on {} ({}/{}), passed: {}",
        user.id,
        score,
        exam.id,
        correct_count,
        questions.len(),
        passed_exam
    );

    let certificate = if passed_exam {
        Some(generate_certificate(store, user, &exam, score).await?)
    } else {
        None
    };

    Ok(UserExamResponse {
        exam_id: exam.id.clone(),
        user_id: user.id.clone(),
        answers: req.answers,
        correct_count,
        total_questions: questions.len(),
        score,
        passed_exam,
        completed_at: Utc::now(),
        certificate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::JsonFileStore;

    fn question(id: i64, correct: usize) -> Question {
        Question {
            id,
            text: format!("Question {}", id),
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answer: correct,
            category: "general".into(),
        }
    }

    fn exam(id: &str, title: &str, questions: Vec<Question>) -> Exam {
        Exam {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            duration: 60,
            total_questions: questions.len() as u32,
            passing_score: 70,
            questions,
        }
    }

    fn catalogue() -> Vec<Exam> {
        vec![
            exam("exam-001", "ORACLE APEX", vec![question(1, 0), question(2, 1)]),
            exam("exam-002", "Node.js Development", vec![question(1, 2)]),
            exam("exam-003", "React Framework", vec![question(1, 3)]),
        ]
    }

    fn user(field: Option<&str>, assigned: Option<&str>) -> User {
        User {
            id: "u1".into(),
            email: "u1@example.com".into(),
            name: "User One".into(),
            preferred_field: field.map(String::from),
            password: None,
            assigned_exam_id: assigned.map(String::from),
        }
    }

    fn ids(exams: &[Exam]) -> Vec<&str> {
        exams.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(score_percentage(2, 2), 100);
        assert_eq!(score_percentage(1, 2), 50);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(1, 8), 13); // 12.5
        assert_eq!(score_percentage(0, 5), 0);
        assert_eq!(score_percentage(0, 0), 0);
    }

    #[test]
    fn score_is_monotonic_and_bounded() {
        for total in 1..=60 {
            let mut last = 0;
            for correct in 0..=total {
                let score = score_percentage(correct, total);
                assert!(score >= last, "{}/{}", correct, total);
                assert!(score <= 100);
                last = score;
            }
            assert_eq!(last, 100);
        }
    }

    #[test]
    fn grade_two_question_example() {
        let questions = vec![question(1, 0), question(2, 1)];
        let answers = HashMap::from([(1, 0), (2, 1)]);
        assert_eq!(grade(&questions, &answers), (2, 100));
    }

    #[test]
    fn grade_ignores_unknown_and_missing_answers() {
        let questions = vec![question(1, 0), question(2, 1), question(3, 2), question(4, 3)];
        // q2 wrong, q4 unanswered, 99 unknown.
        let answers = HashMap::from([(1, 0), (2, 0), (3, 2), (99, 1)]);
        assert_eq!(grade(&questions, &answers), (2, 50));
    }

    #[test]
    fn field_names_normalize() {
        assert_eq!(exam_id_for_field("Oracle APEX"), Some("exam-001"));
        assert_eq!(exam_id_for_field("Node.js"), Some("exam-002"));
        assert_eq!(exam_id_for_field("react-js"), Some("exam-003"));
        assert_eq!(exam_id_for_field("cobol"), None);
    }

    #[test]
    fn preferred_field_filters_catalogue() {
        let picked = select_available_exams(&user(Some("React"), None), catalogue());
        assert_eq!(ids(&picked), vec!["exam-003"]);
    }

    #[test]
    fn assignment_overrides_field() {
        let picked = select_available_exams(&user(Some("react"), Some("exam-002")), catalogue());
        assert_eq!(ids(&picked), vec!["exam-002"]);
    }

    #[test]
    fn unknown_assignment_falls_back_to_field() {
        let picked = select_available_exams(&user(Some("apex"), Some("exam-404")), catalogue());
        assert_eq!(ids(&picked), vec!["exam-001"]);
    }

    #[test]
    fn no_or_unknown_field_offers_everything() {
        assert_eq!(select_available_exams(&user(None, None), catalogue()).len(), 3);
        assert_eq!(select_available_exams(&user(Some("cobol"), None), catalogue()).len(), 3);
    }

    #[test]
    fn mapped_but_missing_exam_offers_everything() {
        let only_apex = vec![catalogue().remove(0)];
        let picked = select_available_exams(&user(Some("react"), None), only_apex);
        assert_eq!(ids(&picked), vec!["exam-001"]);
    }

    async fn seeded_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path()).await.unwrap();
        for e in catalogue() {
            store.insert_exam(&e).await.unwrap();
        }
        (dir, store)
    }

    #[tokio::test]
    async fn passing_submission_issues_certificate_once() {
        let (_dir, store) = seeded_store().await;
        let u = user(Some("apex"), None);
        store.insert_user(&u).await.unwrap();

        let first = submit_exam(
            &store,
            &u,
            SubmitExamRequest {
                exam_id: "exam-001".into(),
                answers: HashMap::from([(1, 0), (2, 1)]),
            },
        )
        .await
        .unwrap();
        assert_eq!(first.score, 100);
        assert!(first.passed_exam);
        let cert = first.certificate.expect("certificate issued");
        assert_eq!(cert.score, 100);

        let second = submit_exam(
            &store,
            &u,
            SubmitExamRequest {
                exam_id: "exam-001".into(),
                answers: HashMap::from([(1, 0), (2, 1)]),
            },
        )
        .await
        .unwrap();
        assert_eq!(second.certificate.map(|c| c.id), Some(cert.id));
        assert_eq!(store.list_certificates().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_submission_issues_nothing() {
        let (_dir, store) = seeded_store().await;
        let u = user(Some("apex"), None);
        store.insert_user(&u).await.unwrap();

        let result = submit_exam(
            &store,
            &u,
            SubmitExamRequest {
                exam_id: "exam-001".into(),
                answers: HashMap::from([(1, 0), (2, 0)]),
            },
        )
        .await
        .unwrap();
        assert_eq!(result.score, 50);
        assert!(!result.passed_exam);
        assert!(result.certificate.is_none());
        assert!(store.list_certificates().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn submitting_an_unavailable_exam_is_not_found() {
        let (_dir, store) = seeded_store().await;
        let u = user(Some("apex"), None);

        let err = submit_exam(
            &store,
            &u,
            SubmitExamRequest {
                exam_id: "exam-003".into(),
                answers: HashMap::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn current_exam_strips_answers() {
        let (_dir, store) = seeded_store().await;
        let exam = current_exam_for_user(&store, &user(Some("node"), None))
            .await
            .unwrap();
        assert_eq!(exam.id, "exam-002");
        assert_eq!(exam.questions.len(), 1);
    }
}
