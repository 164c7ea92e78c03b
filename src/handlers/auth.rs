// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    models::user::{LoginRequest, Role, SignupRequest, UpdateAccountRequest, User},
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. Unknown roles fall
/// back to Student. Returns 201 Created and the user object (excluding
/// password).
pub async fn signup(
    State(pool): State<PgPool>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let role = payload
        .role
        .as_deref()
        .and_then(Role::parse)
        .unwrap_or(Role::Student);

    // Bios only make sense for instructors.
    let bio = if role == Role::Instructor {
        payload.bio
    } else {
        None
    };

    let hashed_password = hash_password(&payload.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (first_name, last_name, email, password, role, bio)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, first_name, last_name, email, password, role, bio, created_at
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&hashed_password)
    .bind(role)
    .bind(&bio)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        // Postgres error code for unique violation is 23505
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict(format!("User '{}' already exists", payload.email))
        } else {
            tracing::error!("Failed to register user: {:?}", e);
            AppError::from(e)
        }
    })?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// Verifies the email and password against the database.
/// If valid, signs a JWT token with the user's ID and role.
pub async fn login(
    State(pool): State<PgPool>,
    State(config): State<Config>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, password, role, bio, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&payload.email)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Login DB error: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let user = user.ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password)?;

    if !is_valid {
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(
        user.id,
        user.role.as_str(),
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "user": user,
    })))
}

/// Returns the current user's profile.
///
/// Students get the list of enrolled course ids; instructors get their
/// accumulated earnings from paid enrollments.
pub async fn profile(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, password, role, bio, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    let mut body = serde_json::to_value(&user)?;

    match user.role {
        Role::Student => {
            let enrolled: Vec<i64> = sqlx::query_scalar::<_, i64>(
                "SELECT course_id FROM enrollments WHERE student_id = $1 ORDER BY enrolled_at",
            )
            .bind(user_id)
            .fetch_all(&pool)
            .await?;
            body["enrolled_courses"] = json!(enrolled);
        }
        Role::Instructor => {
            let earnings: i64 = sqlx::query_scalar::<_, Option<i64>>(
                r#"
                SELECT SUM(c.price_cents)
                FROM enrollments e
                JOIN courses c ON e.course_id = c.id
                WHERE c.instructor_id = $1 AND e.payment_status = 'paid'
                "#,
            )
            .bind(user_id)
            .fetch_one(&pool)
            .await?
            .unwrap_or(0);
            body["earnings_cents"] = json!(earnings);
        }
        Role::Admin => {}
    }

    Ok(Json(body))
}

/// Updates the current account. Fields are optional; bio changes are only
/// applied to instructors.
pub async fn update_account(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let user_id = claims.user_id();

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            first_name = COALESCE($1, first_name),
            last_name = COALESCE($2, last_name),
            email = COALESCE($3, email),
            bio = CASE WHEN role = 'Instructor' THEN COALESCE($4, bio) ELSE bio END
        WHERE id = $5
        RETURNING id, first_name, last_name, email, password, role, bio, created_at
        "#,
    )
    .bind(&payload.first_name)
    .bind(&payload.last_name)
    .bind(&payload.email)
    .bind(&payload.bio)
    .bind(user_id)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Email already in use".to_string())
        } else {
            AppError::from(e)
        }
    })?
    .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Deletes the current account and everything hanging off it (cascades).
pub async fn delete_account(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(claims.user_id())
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    Ok(Json(json!({ "message": "Account deleted successfully" })))
}
