// src/handlers/assignment.rs

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::assignment_submission::{AssignmentSubmission, GradeRequest, SubmissionWithStudent},
    state::AppState,
    utils::jwt::Claims,
};

/// Parsed multipart form for an assignment submission.
struct SubmissionForm {
    assignment_content_id: i64,
    comments: Option<String>,
    file: (String, Vec<u8>),
}

async fn read_submission_form(mut multipart: Multipart) -> Result<SubmissionForm, AppError> {
    let mut assignment_content_id: Option<i64> = None;
    let mut comments: Option<String> = None;
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().map(|n| n.to_string());
        match name.as_deref() {
            Some("assignment_content_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                assignment_content_id = Some(text.parse().map_err(|_| {
                    AppError::BadRequest("Invalid assignment content ID".to_string())
                })?);
            }
            Some("comments") => {
                comments = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?,
                );
            }
            Some("file") => {
                let filename = field.file_name().unwrap_or("submission").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                file = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let assignment_content_id = assignment_content_id
        .ok_or(AppError::BadRequest("assignment_content_id is required".to_string()))?;
    let file = file.ok_or(AppError::BadRequest("File is required".to_string()))?;

    Ok(SubmissionForm {
        assignment_content_id,
        comments,
        file,
    })
}

/// Submits (or resubmits) an assignment deliverable.
///
/// The file goes to the storage collaborator first; only its returned URL
/// is persisted, and only after the upload succeeded. Upsert by
/// (assignment, student): a resubmission overwrites the file, comments and
/// timestamp. Whether it also clears a previously given grade is
/// controlled by configuration.
pub async fn submit_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let form = read_submission_form(multipart).await?;

    let is_assignment = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM course_contents WHERE id = $1 AND content_type = 'assignment'",
    )
    .bind(form.assignment_content_id)
    .fetch_optional(&state.pool)
    .await?;

    if is_assignment.is_none() {
        return Err(AppError::NotFound("Assignment not found".to_string()));
    }

    let (filename, bytes) = form.file;
    let file_url = state.files.put(&filename, bytes).await?;

    let submission = if state.config.clear_grade_on_resubmit {
        sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            INSERT INTO assignment_submissions
                (assignment_content_id, student_id, file_url, comments, submitted_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (assignment_content_id, student_id) DO UPDATE SET
                file_url = EXCLUDED.file_url,
                comments = EXCLUDED.comments,
                submitted_at = EXCLUDED.submitted_at,
                grade = NULL,
                feedback = NULL,
                graded_by = NULL,
                graded_at = NULL
            RETURNING id, assignment_content_id, student_id, file_url, comments,
                      submitted_at, grade, feedback, graded_by, graded_at
            "#,
        )
    } else {
        sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            INSERT INTO assignment_submissions
                (assignment_content_id, student_id, file_url, comments, submitted_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (assignment_content_id, student_id) DO UPDATE SET
                file_url = EXCLUDED.file_url,
                comments = EXCLUDED.comments,
                submitted_at = EXCLUDED.submitted_at
            RETURNING id, assignment_content_id, student_id, file_url, comments,
                      submitted_at, grade, feedback, graded_by, graded_at
            "#,
        )
    }
    .bind(form.assignment_content_id)
    .bind(claims.user_id())
    .bind(&file_url)
    .bind(&form.comments)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert assignment submission: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(submission))
}

/// Returns the calling student's submission for an assignment, 404 when none.
pub async fn get_my_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(assignment_content_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submission = sqlx::query_as::<_, AssignmentSubmission>(
        r#"
        SELECT id, assignment_content_id, student_id, file_url, comments,
               submitted_at, grade, feedback, graded_by, graded_at
        FROM assignment_submissions
        WHERE assignment_content_id = $1 AND student_id = $2
        "#,
    )
    .bind(assignment_content_id)
    .bind(claims.user_id())
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("No submission found".to_string()))?;

    Ok(Json(submission))
}

/// Lists all submissions for an assignment with submitter identity.
/// Instructor/admin only.
pub async fn list_submissions(
    State(pool): State<PgPool>,
    Path(assignment_content_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let submissions = sqlx::query_as::<_, SubmissionWithStudent>(
        r#"
        SELECT
            s.id, s.assignment_content_id, s.student_id,
            u.first_name || ' ' || u.last_name AS student_name,
            u.email AS student_email,
            s.file_url, s.comments, s.submitted_at, s.grade, s.feedback, s.graded_at
        FROM assignment_submissions s
        JOIN users u ON s.student_id = u.id
        WHERE s.assignment_content_id = $1
        ORDER BY s.submitted_at DESC
        "#,
    )
    .bind(assignment_content_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(submissions))
}

/// Grades a submission. Sets grade, feedback and the grader's identity;
/// independent of the student's resubmission path.
pub async fn grade_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
    Json(payload): Json<GradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let submission = sqlx::query_as::<_, AssignmentSubmission>(
        r#"
        UPDATE assignment_submissions
        SET grade = $1, feedback = $2, graded_by = $3, graded_at = NOW()
        WHERE id = $4
        RETURNING id, assignment_content_id, student_id, file_url, comments,
                  submitted_at, grade, feedback, graded_by, graded_at
        "#,
    )
    .bind(payload.grade)
    .bind(&payload.feedback)
    .bind(claims.user_id())
    .bind(submission_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(submission))
}
