// src/handlers/course.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    handlers::enrollment::upsert_enrollment,
    models::{
        course::{Course, CreateCourseRequest, UpdateCourseRequest},
        enrollment::{PaymentStatus, PurchaseSuccessRequest},
        user::User,
    },
    services::CheckoutRequest,
    state::AppState,
    utils::jwt::Claims,
};

/// Lists all courses. Public.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
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

/// Retrieves a single course by ID. Public.
pub async fn get_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, id).await?;

    Ok(Json(course))
}

/// Lists courses created by the calling instructor.
pub async fn created_courses(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, instructor_id, instructor_name, title, category, price_cents,
               level, description, cover_image, sample_video, created_at
        FROM courses
        WHERE instructor_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    Ok(Json(courses))
}

/// Creates a new course owned by the calling instructor.
pub async fn create_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let instructor = fetch_user(&pool, claims.user_id()).await?;

    let course = sqlx::query_as::<_, Course>(
        r#"
        INSERT INTO courses
        (instructor_id, instructor_name, title, category, price_cents, level,
         description, cover_image, sample_video)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id, instructor_id, instructor_name, title, category, price_cents,
                  level, description, cover_image, sample_video, created_at
        "#,
    )
    .bind(instructor.id)
    .bind(format!("{} {}", instructor.first_name, instructor.last_name))
    .bind(&payload.title)
    .bind(payload.category)
    .bind(payload.price_cents)
    .bind(payload.level)
    .bind(&payload.description)
    .bind(&payload.cover_image)
    .bind(&payload.sample_video)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(course)))
}

/// Updates a course by ID. Only the owning instructor or an admin.
pub async fn update_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let course = fetch_course(&pool, id).await?;
    ensure_owner_or_admin(&claims, course.instructor_id)?;

    if payload.title.is_none()
        && payload.category.is_none()
        && payload.price_cents.is_none()
        && payload.level.is_none()
        && payload.description.is_none()
        && payload.cover_image.is_none()
        && payload.sample_video.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE courses SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(category) = payload.category {
        separated.push("category = ");
        separated.push_bind_unseparated(category);
    }

    if let Some(price_cents) = payload.price_cents {
        separated.push("price_cents = ");
        separated.push_bind_unseparated(price_cents);
    }

    if let Some(level) = payload.level {
        separated.push("level = ");
        separated.push_bind_unseparated(level);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(cover_image) = payload.cover_image {
        separated.push("cover_image = ");
        separated.push_bind_unseparated(cover_image);
    }

    if let Some(sample_video) = payload.sample_video {
        separated.push("sample_video = ");
        separated.push_bind_unseparated(sample_video);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(StatusCode::OK)
}

/// Deletes a course by ID. Only the owning instructor or an admin.
/// Contents, enrollments and submissions cascade.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, id).await?;
    ensure_owner_or_admin(&claims, course.instructor_id)?;

    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    Ok(Json(json!({ "message": "Course deleted successfully" })))
}

/// Purchases or enrolls in a course.
///
/// * Free course: enrolls directly and sends confirmation emails.
/// * Paid course: creates a hosted checkout session and returns its URL;
///   the enrollment is only recorded once the payment is confirmed.
pub async fn purchase_course(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&state.pool, id).await?;
    let student = fetch_user(&state.pool, claims.user_id()).await?;

    if course.price_cents == 0 {
        upsert_enrollment(&state.pool, student.id, course.id, PaymentStatus::Free, None).await?;

        send_enrollment_emails(&state, &course, &student, false).await;

        return Ok(Json(json!({ "message": "Enrolled successfully" })));
    }

    let session = state
        .payment
        .create_checkout(CheckoutRequest {
            course_id: course.id,
            student_id: student.id,
            title: course.title.clone(),
            description: course.description.clone(),
            amount_cents: course.price_cents,
            success_url: format!(
                "{}/purchase-success?session_id={{CHECKOUT_SESSION_ID}}",
                state.config.client_url
            ),
            cancel_url: format!("{}/courses/{}", state.config.client_url, course.id),
        })
        .await?;

    Ok(Json(json!({ "url": session.url })))
}

/// Confirms a finished checkout session and records the paid enrollment.
///
/// The gateway must report the session as paid, and the caller must be the
/// student the session was created for. Both are checked before any write.
pub async fn confirm_purchase(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<PurchaseSuccessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let confirmation = state.payment.retrieve(&payload.session_id).await?;

    if !confirmation.paid {
        return Err(AppError::BadRequest("Payment not completed".to_string()));
    }

    if claims.user_id() != confirmation.student_id {
        return Err(AppError::Forbidden(
            "Session belongs to a different student".to_string(),
        ));
    }

    let course = fetch_course(&state.pool, confirmation.course_id).await?;
    let student = fetch_user(&state.pool, confirmation.student_id).await?;

    let enrollment = upsert_enrollment(
        &state.pool,
        student.id,
        course.id,
        PaymentStatus::Paid,
        confirmation.payment_intent.as_deref(),
    )
    .await?;

    send_enrollment_emails(&state, &course, &student, true).await;

    Ok(Json(json!({
        "message": "Enrollment confirmed",
        "enrollment": enrollment,
    })))
}

/// Notifies student and instructor about a new enrollment. Best-effort:
/// failures are logged and never bubble up to the caller, the enrollment
/// is already committed at this point.
async fn send_enrollment_emails(state: &AppState, course: &Course, student: &User, paid: bool) {
    let price = format!("${:.2}", course.price_cents as f64 / 100.0);
    let student_body = if paid {
        format!(
            "Dear {} {},\n\nYou have successfully purchased and enrolled in {} for {}.\nStart learning now!\n\nBest regards,\nCourseHub Team",
            student.first_name, student.last_name, course.title, price
        )
    } else {
        format!(
            "Dear {} {},\n\nYou have successfully enrolled in {} (Free).\nStart learning now!\n\nBest regards,\nCourseHub Team",
            student.first_name, student.last_name, course.title
        )
    };

    if let Err(e) = state
        .notifier
        .send(
            &student.email,
            &format!("Enrollment Confirmation: {}", course.title),
            &student_body,
        )
        .await
    {
        tracing::warn!("Failed to notify student {}: {}", student.id, e);
    }

    let instructor_email: Option<String> =
        match sqlx::query_scalar::<_, String>("SELECT email FROM users WHERE id = $1")
            .bind(course.instructor_id)
            .fetch_optional(&state.pool)
            .await
        {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!("Failed to look up instructor for course {}: {}", course.id, e);
                None
            }
        };

    if let Some(email) = instructor_email {
        let instructor_body = format!(
            "A student ({} {}) has enrolled in your course {}.\n\nBest regards,\nCourseHub Team",
            student.first_name, student.last_name, course.title
        );
        if let Err(e) = state
            .notifier
            .send(
                &email,
                &format!("New Enrollment in {}", course.title),
                &instructor_body,
            )
            .await
        {
            tracing::warn!(
                "Failed to notify instructor of course {}: {}",
                course.id,
                e
            );
        }
    }
}

pub(crate) async fn fetch_course(pool: &PgPool, id: i64) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT id, instructor_id, instructor_name, title, category, price_cents,
               level, description, cover_image, sample_video, created_at
        FROM courses
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Course not found".to_string()))
}

pub(crate) async fn fetch_user(pool: &PgPool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, first_name, last_name, email, password, role, bio, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("User not found".to_string()))
}

/// Instructors may only touch their own courses; admins may touch any.
pub(crate) fn ensure_owner_or_admin(claims: &Claims, owner_id: i64) -> Result<(), AppError> {
    if claims.is_admin() || claims.user_id() == owner_id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not the owner of this course".to_string(),
        ))
    }
}
