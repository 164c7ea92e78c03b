// src/models/quiz_submission.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// One graded answer, stored in quiz-question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question: String,
    /// What the student picked; empty string when the question was skipped.
    pub selected: String,
    pub correct: String,
    pub is_correct: bool,
}

/// Represents the 'quiz_submissions' table in the database.
/// At most one record per (student, quiz); a retake overwrites it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSubmission {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub quiz_content_id: i64,
    pub answers: Json<Vec<GradedAnswer>>,
    pub score: i32,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// One submitted answer, matched to a quiz question by its text.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedAnswer {
    pub question: String,
    pub selected: String,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitQuizRequest {
    pub quiz_content_id: i64,
    pub answers: Vec<SubmittedAnswer>,
}

/// Per-question aggregate for the instructor analytics view.
#[derive(Debug, Serialize)]
pub struct QuestionStats {
    pub question: String,
    pub correct: i64,
    pub incorrect: i64,
    /// The wrong choice picked most often, if any wrong answer was given.
    pub most_common_wrong: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuizAnalytics {
    pub total_submissions: i64,
    pub average_score: f64,
    pub question_stats: Vec<QuestionStats>,
}
