// src/handlers/quiz.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};

use crate::{
    error::AppError,
    models::{
        content::{ContentPayload, CourseContent, QuizQuestion},
        quiz_submission::{
            GradedAnswer, QuestionStats, QuizAnalytics, QuizSubmission, SubmitQuizRequest,
            SubmittedAnswer,
        },
    },
    utils::jwt::Claims,
};

/// Grades a quiz attempt against its answer key.
///
/// Walks the quiz's questions in order, matching submitted answers by
/// question text. A question with no submitted answer is graded as an empty
/// selection and counted incorrect. Comparison is exact string equality.
fn grade_answers(questions: &[QuizQuestion], answers: &[SubmittedAnswer]) -> (i32, Vec<GradedAnswer>) {
    let mut score = 0;
    let graded = questions
        .iter()
        .map(|q| {
            let selected = answers
                .iter()
                .find(|a| a.question == q.question)
                .map(|a| a.selected.clone())
                .unwrap_or_default();
            let is_correct = selected == q.answer;
            if is_correct {
                score += 1;
            }
            GradedAnswer {
                question: q.question.clone(),
                selected,
                correct: q.answer.clone(),
                is_correct,
            }
        })
        .collect();
    (score, graded)
}

/// Loads a content item and ensures it is a quiz. Returns the row together
/// with its question list.
async fn fetch_quiz(
    pool: &PgPool,
    quiz_content_id: i64,
) -> Result<(CourseContent, Vec<QuizQuestion>), AppError> {
    let content = sqlx::query_as::<_, CourseContent>(
        r#"
        SELECT id, course_id, content_type, title, description, payload, created_by, created_at
        FROM course_contents
        WHERE id = $1
        "#,
    )
    .bind(quiz_content_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

    match &content.payload.0 {
        ContentPayload::Quiz { questions, .. } => {
            let questions = questions.clone();
            Ok((content, questions))
        }
        _ => Err(AppError::NotFound("Quiz not found".to_string())),
    }
}

/// Submits a quiz attempt and returns the graded result.
///
/// Upsert by (student, quiz): a retake fully replaces the previous graded
/// answers and score, so exactly one submission record exists per pair.
pub async fn submit_quiz(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (quiz, questions) = fetch_quiz(&pool, payload.quiz_content_id).await?;

    let (score, graded) = grade_answers(&questions, &payload.answers);

    let submission = sqlx::query_as::<_, QuizSubmission>(
        r#"
        INSERT INTO quiz_submissions (student_id, course_id, quiz_content_id, answers, score, submitted_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        ON CONFLICT (student_id, quiz_content_id) DO UPDATE SET
            answers = EXCLUDED.answers,
            score = EXCLUDED.score,
            submitted_at = EXCLUDED.submitted_at
        RETURNING id, student_id, course_id, quiz_content_id, answers, score, submitted_at
        "#,
    )
    .bind(claims.user_id())
    .bind(quiz.course_id)
    .bind(quiz.id)
    .bind(SqlJson(&graded))
    .bind(score)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert quiz submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Quiz submitted",
            "score": submission.score,
            "answers": submission.answers.0,
        })),
    ))
}

/// Returns the calling student's submission for a quiz, 404 when none.
pub async fn get_my_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(quiz_content_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, QuizSubmission>(
        r#"
        SELECT id, student_id, course_id, quiz_content_id, answers, score, submitted_at
        FROM quiz_submissions
        WHERE student_id = $1 AND quiz_content_id = $2
        "#,
    )
    .bind(claims.user_id())
    .bind(quiz_content_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("No submission found".to_string()))?;

    Ok(Json(submission))
}

/// Aggregate statistics over all submissions for a quiz. Derived on demand,
/// nothing is stored: total submissions, average score, and per-question
/// correct/incorrect counts with the most frequent wrong choice.
pub async fn quiz_analytics(
    State(pool): State<PgPool>,
    Path(quiz_content_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let (quiz, questions) = fetch_quiz(&pool, quiz_content_id).await?;

    let submissions = sqlx::query_as::<_, QuizSubmission>(
        r#"
        SELECT id, student_id, course_id, quiz_content_id, answers, score, submitted_at
        FROM quiz_submissions
        WHERE quiz_content_id = $1
        "#,
    )
    .bind(quiz.id)
    .fetch_all(&pool)
    .await?;

    let total_submissions = submissions.len() as i64;
    let average_score = if submissions.is_empty() {
        0.0
    } else {
        submissions.iter().map(|s| s.score as f64).sum::<f64>() / submissions.len() as f64
    };

    let question_stats = questions
        .iter()
        .map(|q| {
            let mut correct = 0;
            let mut incorrect = 0;
            let mut wrong_answers: HashMap<&str, i64> = HashMap::new();

            for submission in &submissions {
                if let Some(ans) = submission.answers.0.iter().find(|a| a.question == q.question)
                {
                    if ans.is_correct {
                        correct += 1;
                    } else {
                        incorrect += 1;
                        if !ans.selected.is_empty() {
                            *wrong_answers.entry(ans.selected.as_str()).or_insert(0) += 1;
                        }
                    }
                }
            }

            let most_common_wrong = wrong_answers
                .into_iter()
                .max_by_key(|(_, count)| *count)
                .map(|(ans, _)| ans.to_string());

            QuestionStats {
                question: q.question.clone(),
                correct,
                incorrect,
                most_common_wrong,
            }
        })
        .collect();

    Ok(Json(QuizAnalytics {
        total_submissions,
        average_score,
        question_stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(text: &str, answer: &str) -> QuizQuestion {
        QuizQuestion {
            question: text.to_string(),
            options: vec!["A".to_string(), "B".to_string(), "X".to_string()],
            answer: answer.to_string(),
        }
    }

    fn answer(text: &str, selected: &str) -> SubmittedAnswer {
        SubmittedAnswer {
            question: text.to_string(),
            selected: selected.to_string(),
        }
    }

    #[test]
    fn grading_is_deterministic() {
        let questions = vec![question("q1", "A"), question("q2", "B")];
        let answers = vec![answer("q1", "A"), answer("q2", "X")];

        let (score, graded) = grade_answers(&questions, &answers);

        assert_eq!(score, 1);
        assert_eq!(graded.len(), 2);
        assert!(graded[0].is_correct);
        assert_eq!(graded[1].selected, "X");
        assert_eq!(graded[1].correct, "B");
        assert!(!graded[1].is_correct);
    }

    #[test]
    fn missing_answer_is_graded_as_empty_and_incorrect() {
        let questions = vec![question("q1", "A"), question("q2", "B")];
        let answers = vec![answer("q1", "A")];

        let (score, graded) = grade_answers(&questions, &answers);

        assert_eq!(score, 1);
        assert_eq!(graded[1].selected, "");
        assert!(!graded[1].is_correct);
    }

    #[test]
    fn grading_follows_quiz_order_not_submission_order() {
        let questions = vec![question("q1", "A"), question("q2", "B")];
        let answers = vec![answer("q2", "B"), answer("q1", "A")];

        let (score, graded) = grade_answers(&questions, &answers);

        assert_eq!(score, 2);
        assert_eq!(graded[0].question, "q1");
        assert_eq!(graded[1].question, "q2");
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let questions = vec![question("q1", "A")];
        let answers = vec![answer("q1", "a")];

        let (score, graded) = grade_answers(&questions, &answers);

        assert_eq!(score, 0);
        assert!(!graded[0].is_correct);
    }

    #[test]
    fn extra_unknown_answers_are_ignored() {
        let questions = vec![question("q1", "A")];
        let answers = vec![answer("q1", "A"), answer("phantom", "B")];

        let (score, graded) = grade_answers(&questions, &answers);

        assert_eq!(score, 1);
        assert_eq!(graded.len(), 1);
    }
}
