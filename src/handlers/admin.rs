// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::user::{Role, User},
};

/// Query parameters for the paginated user listing.
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<String>,
    pub search: Option<String>,
}

/// Lists users with optional role filter, name/email search and pagination.
/// Admin only.
pub async fn list_users(
    State(pool): State<PgPool>,
    Query(params): Query<ListUsersParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let search_pattern = params.search.map(|s| format!("%{}%", s));

    let total: i64 = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM users
        WHERE ($1::TEXT IS NULL OR role = $1)
          AND ($2::TEXT IS NULL OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
        "#,
    )
    .bind(&params.role)
    .bind(&search_pattern)
    .fetch_one(&pool)
    .await?;

    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, password, role, bio, created_at
        FROM users
        WHERE ($1::TEXT IS NULL OR role = $1)
          AND ($2::TEXT IS NULL OR first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&params.role)
    .bind(&search_pattern)
    .bind(limit)
    .bind((page - 1) * limit)
    .fetch_all(&pool)
    .await?;

    Ok(Json(json!({
        "users": users,
        "pagination": {
            "total": total,
            "per_page": limit,
            "current_page": page,
            "total_pages": (total + limit - 1) / limit,
        },
    })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

/// Changes a user's role. Admin only.
pub async fn update_user_role(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role =
        Role::parse(&payload.role).ok_or(AppError::BadRequest("Invalid role".to_string()))?;

    let result = sqlx::query("UPDATE users SET role = $1 WHERE id = $2")
        .bind(role)
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({ "message": "User role updated successfully" })))
}

/// Deletes a user by ID. Admin only. Refuses to delete admins (including
/// self).
pub async fn delete_user(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    if role == Role::Admin {
        return Err(AppError::Forbidden(
            "Cannot delete another Admin".to_string(),
        ));
    }

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "User deleted successfully" })))
}

/// Lists all courses with owner identity. Admin only.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, crate::models::course::Course>(
        r#"
        SELECT id, instructor_id, instructor_name, title, category, price_cents,
               level, description, cover_image, sample_video, created_at
        FROM courses
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

/// Deletes any course. Admin only.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(Json(json!({ "message": "Course deleted successfully" })))
}

/// Platform overview: user/course counts, role distribution and total
/// revenue from paid enrollments. Admin only.
pub async fn analytics_overview(
    State(pool): State<PgPool>,
) -> Result<impl IntoResponse, AppError> {
    let user_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await?;

    let course_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM courses")
        .fetch_one(&pool)
        .await?;

    let roles = sqlx::query_as::<_, (String, i64)>(
        "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role",
    )
    .fetch_all(&pool)
    .await?;

    let total_revenue_cents = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        SELECT SUM(c.price_cents)
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE e.payment_status = 'paid'
        "#,
    )
    .fetch_one(&pool)
    .await?
    .unwrap_or(0);

    let roles: Vec<_> = roles
        .into_iter()
        .map(|(role, count)| json!({ "role": role, "count": count }))
        .collect();

    Ok(Json(json!({
        "user_count": user_count,
        "course_count": course_count,
        "roles": roles,
        "total_revenue_cents": total_revenue_cents,
    })))
}
