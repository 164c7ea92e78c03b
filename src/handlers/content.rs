// src/handlers/content.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, types::Json as SqlJson};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::course::{ensure_owner_or_admin, fetch_course},
    models::content::{CourseContent, CreateContentRequest, UpdateContentRequest},
    utils::jwt::Claims,
};

/// Creates a content item in a course the calling instructor owns.
pub async fn create_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    payload.payload.validate().map_err(AppError::BadRequest)?;

    let course = fetch_course(&pool, payload.course_id).await?;
    ensure_owner_or_admin(&claims, course.instructor_id)?;

    let content = sqlx::query_as::<_, CourseContent>(
        r#"
        INSERT INTO course_contents (course_id, content_type, title, description, payload, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, course_id, content_type, title, description, payload, created_by, created_at
        "#,
    )
    .bind(course.id)
    .bind(payload.payload.type_tag())
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(SqlJson(&payload.payload))
    .bind(claims.user_id())
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create content: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(content)))
}

/// Lists all content of a course in creation order.
/// Students must be enrolled; instructors and admins always pass.
pub async fn list_course_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    ensure_can_view(&pool, &claims, course_id).await?;

    let contents = sqlx::query_as::<_, CourseContent>(
        r#"
        SELECT id, course_id, content_type, title, description, payload, created_by, created_at
        FROM course_contents
        WHERE course_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(contents))
}

/// Retrieves a single content item.
pub async fn get_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let content = fetch_content(&pool, id).await?;

    ensure_can_view(&pool, &claims, content.course_id).await?;

    Ok(Json(content))
}

/// Updates a content item. Only the owning instructor (or an admin).
///
/// A quiz that already has submissions cannot have its payload changed:
/// stored graded answers reference the question set, so a new question set
/// would silently invalidate them.
pub async fn update_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateContentRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let content = fetch_content(&pool, id).await?;
    let course = fetch_course(&pool, content.course_id).await?;
    ensure_owner_or_admin(&claims, course.instructor_id)?;

    let (content_type, new_payload) = match &payload.payload {
        Some(p) => {
            p.validate().map_err(AppError::BadRequest)?;

            if content.content_type == "quiz" {
                let submissions = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM quiz_submissions WHERE quiz_content_id = $1",
                )
                .bind(id)
                .fetch_one(&pool)
                .await?;

                if submissions > 0 {
                    return Err(AppError::Conflict(
                        "Quiz already has submissions and cannot be changed".to_string(),
                    ));
                }
            }

            (p.type_tag(), Some(p))
        }
        None => (content.content_type.as_str(), None),
    };

    let updated = sqlx::query_as::<_, CourseContent>(
        r#"
        UPDATE course_contents
        SET title = COALESCE($1, title),
            description = COALESCE($2, description),
            content_type = $3,
            payload = COALESCE($4, payload)
        WHERE id = $5
        RETURNING id, course_id, content_type, title, description, payload, created_by, created_at
        "#,
    )
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(content_type)
    .bind(new_payload.map(SqlJson))
    .bind(id)
    .fetch_one(&pool)
    .await?;

    Ok(Json(updated))
}

/// Deletes a content item. Only the owning instructor (or an admin).
pub async fn delete_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let content = fetch_content(&pool, id).await?;
    let course = fetch_course(&pool, content.course_id).await?;
    ensure_owner_or_admin(&claims, course.instructor_id)?;

    sqlx::query("DELETE FROM course_contents WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Content deleted" })))
}

async fn fetch_content(pool: &PgPool, id: i64) -> Result<CourseContent, AppError> {
    sqlx::query_as::<_, CourseContent>(
        r#"
        SELECT id, course_id, content_type, title, description, payload, created_by, created_at
        FROM course_contents
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Content not found".to_string()))
}

/// Students can only see content of courses they are enrolled in.
async fn ensure_can_view(pool: &PgPool, claims: &Claims, course_id: i64) -> Result<(), AppError> {
    if !claims.is_student() {
        return Ok(());
    }

    let enrolled = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM enrollments WHERE student_id = $1 AND course_id = $2",
    )
    .bind(claims.user_id())
    .bind(course_id)
    .fetch_optional(pool)
    .await?;

    if enrolled.is_none() {
        return Err(AppError::Forbidden("Not enrolled".to_string()));
    }

    Ok(())
}
