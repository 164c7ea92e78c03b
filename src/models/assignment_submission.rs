// src/models/assignment_submission.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Represents the 'assignment_submissions' table in the database.
/// At most one current submission per (assignment, student); a resubmission
/// overwrites the file and comments. Grading is a separate write path.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub id: i64,
    pub assignment_content_id: i64,
    pub student_id: i64,
    pub file_url: String,
    pub comments: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_by: Option<i64>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Submission row joined with the submitter's identity, for the
/// instructor-only listing.
#[derive(Debug, Serialize, FromRow)]
pub struct SubmissionWithStudent {
    pub id: i64,
    pub assignment_content_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub file_url: String,
    pub comments: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    pub grade: Option<f64>,
    pub feedback: Option<String>,
    pub graded_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for grading a submission.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeRequest {
    pub grade: f64,
    #[validate(length(max = 5000))]
    pub feedback: Option<String>,
}
