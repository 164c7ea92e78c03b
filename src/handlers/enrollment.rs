// src/handlers/enrollment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppError,
    handlers::course::{ensure_owner_or_admin, fetch_course},
    models::enrollment::{
        CourseEnrollmentRow, CourseEnrollmentStats, DailyEnrollments, EnrollRequest, Enrollment,
        PaymentStatus, ProgressResponse, StudentEnrollmentRow,
    },
    utils::jwt::Claims,
};

/// Payment status recorded by a direct enroll.
///
/// A free course always enrolls as `free`, whatever the caller asked for.
/// For paid courses the requested status wins, defaulting to `paid`.
fn resolve_payment_status(price_cents: i64, requested: Option<PaymentStatus>) -> PaymentStatus {
    if price_cents == 0 {
        PaymentStatus::Free
    } else {
        requested.unwrap_or(PaymentStatus::Paid)
    }
}

/// Progress percentage from the completion count and the course's current
/// content count. An empty course reports 0.
fn compute_progress(completed: i64, total: i64) -> i32 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as i32
}

/// Deterministic certificate reference, derived from the enrollment id.
fn certificate_path(enrollment_id: i64) -> String {
    format!("/certificates/{}.pdf", enrollment_id)
}

/// Inserts or updates the enrollment for (student, course) in one atomic
/// statement. The unique index on the pair guarantees at most one record
/// even under concurrent calls; `enrolled_at` and progress state are only
/// written on first insert.
pub(crate) async fn upsert_enrollment(
    pool: &PgPool,
    student_id: i64,
    course_id: i64,
    payment_status: PaymentStatus,
    payment_intent_id: Option<&str>,
) -> Result<Enrollment, AppError> {
    let enrollment = sqlx::query_as::<_, Enrollment>(
        r#"
        INSERT INTO enrollments (student_id, course_id, payment_status, payment_intent_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (student_id, course_id) DO UPDATE SET
            payment_status = EXCLUDED.payment_status,
            payment_intent_id = EXCLUDED.payment_intent_id
        RETURNING id, student_id, course_id, enrolled_at, payment_status,
                  payment_intent_id, progress, certificate_issued, certificate_url
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .bind(payment_status)
    .bind(payment_intent_id)
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert enrollment: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(enrollment)
}

/// Enrolls the calling student in a course.
///
/// Idempotent per (student, course): a repeat call updates the payment
/// fields of the existing record instead of creating a duplicate.
pub async fn enroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<EnrollRequest>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, payload.course_id).await?;

    let status = resolve_payment_status(course.price_cents, payload.payment_status);

    let enrollment = upsert_enrollment(
        &pool,
        claims.user_id(),
        course.id,
        status,
        payload.payment_intent_id.as_deref(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Enrolled successfully", "enrollment": enrollment })),
    ))
}

/// Lists a student's enrollments with course info and the completion set.
pub async fn list_student_enrollments(
    State(pool): State<PgPool>,
    Path(student_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let enrollments = sqlx::query_as::<_, StudentEnrollmentRow>(
        r#"
        SELECT
            e.id, e.course_id, c.title AS course_title, c.instructor_name,
            c.price_cents, e.enrolled_at, e.payment_status, e.progress,
            e.certificate_issued, e.certificate_url,
            COALESCE(
                ARRAY_AGG(ec.content_id) FILTER (WHERE ec.content_id IS NOT NULL),
                ARRAY[]::BIGINT[]
            ) AS completed_content
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        LEFT JOIN enrollment_completions ec ON ec.enrollment_id = e.id
        WHERE e.student_id = $1
        GROUP BY e.id, c.title, c.instructor_name, c.price_cents
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(student_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(enrollments))
}

/// Lists all students enrolled in a course. Instructor/admin only.
pub async fn list_course_enrollments(
    State(pool): State<PgPool>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let enrollments = sqlx::query_as::<_, CourseEnrollmentRow>(
        r#"
        SELECT
            e.id, e.student_id,
            u.first_name || ' ' || u.last_name AS student_name,
            u.email AS student_email,
            e.enrolled_at, e.payment_status, e.progress, e.certificate_issued
        FROM enrollments e
        JOIN users u ON e.student_id = u.id
        WHERE e.course_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(enrollments))
}

/// Marks a content item complete and recomputes the enrollment's progress.
///
/// The whole read-modify-write runs in one transaction with the enrollment
/// row locked, so two concurrent completions by the same student cannot
/// lose an update. Re-completing an item is a no-op. Reaching 100% issues
/// the certificate exactly once; it is never revoked afterwards, even if
/// the instructor later adds content and the percentage drops.
pub async fn complete_content(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path((course_id, content_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let student_id = claims.user_id();

    let mut tx = pool.begin().await?;

    let content_exists = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM course_contents WHERE id = $1 AND course_id = $2",
    )
    .bind(content_id)
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await?;

    if content_exists.is_none() {
        return Err(AppError::NotFound(
            "Content not found in this course".to_string(),
        ));
    }

    let enrollment = sqlx::query_as::<_, (i64, bool, Option<String>)>(
        r#"
        SELECT id, certificate_issued, certificate_url
        FROM enrollments
        WHERE student_id = $1 AND course_id = $2
        FOR UPDATE
        "#,
    )
    .bind(student_id)
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (enrollment_id, already_issued, existing_url) =
        enrollment.ok_or(AppError::NotFound("Enrollment not found".to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO enrollment_completions (enrollment_id, content_id)
        VALUES ($1, $2)
        ON CONFLICT (enrollment_id, content_id) DO NOTHING
        "#,
    )
    .bind(enrollment_id)
    .bind(content_id)
    .execute(&mut *tx)
    .await?;

    // Only count completions whose content still exists in the course, so
    // the percentage stays within [0, 100] after content deletions.
    let completed = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM enrollment_completions ec
        JOIN course_contents cc ON cc.id = ec.content_id
        WHERE ec.enrollment_id = $1 AND cc.course_id = $2
        "#,
    )
    .bind(enrollment_id)
    .bind(course_id)
    .fetch_one(&mut *tx)
    .await?;

    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM course_contents WHERE course_id = $1")
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;

    let progress = compute_progress(completed, total);

    let certificate_issued = already_issued || progress == 100;
    let certificate_url = if certificate_issued {
        existing_url.or_else(|| Some(certificate_path(enrollment_id)))
    } else {
        None
    };

    sqlx::query(
        r#"
        UPDATE enrollments
        SET progress = $1, certificate_issued = $2, certificate_url = $3
        WHERE id = $4
        "#,
    )
    .bind(progress)
    .bind(certificate_issued)
    .bind(&certificate_url)
    .bind(enrollment_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(ProgressResponse {
        progress,
        certificate_issued,
        certificate_url,
    }))
}

/// Per-course enrollment totals and earnings for the calling instructor.
pub async fn instructor_analytics(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let analytics = sqlx::query_as::<_, CourseEnrollmentStats>(
        r#"
        SELECT
            c.id AS course_id, c.title, c.price_cents,
            COUNT(e.id) AS total,
            COUNT(e.id) FILTER (WHERE e.payment_status = 'paid') AS paid,
            COUNT(e.id) FILTER (WHERE e.payment_status = 'free') AS free,
            COUNT(e.id) FILTER (WHERE e.payment_status = 'paid') * c.price_cents AS earnings_cents
        FROM courses c
        LEFT JOIN enrollments e ON e.course_id = c.id
        WHERE c.instructor_id = $1
        GROUP BY c.id
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(claims.user_id())
    .fetch_all(&pool)
    .await?;

    let total_earnings_cents: i64 = analytics.iter().map(|a| a.earnings_cents).sum();

    Ok(Json(json!({
        "analytics": analytics,
        "total_earnings_cents": total_earnings_cents,
    })))
}

/// Detailed analytics for one course: totals, earnings, daily enrollments,
/// per-student progress and the completion rate.
pub async fn course_analytics(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let course = fetch_course(&pool, course_id).await?;
    ensure_owner_or_admin(&claims, course.instructor_id)?;

    let stats = sqlx::query_as::<_, CourseEnrollmentStats>(
        r#"
        SELECT
            c.id AS course_id, c.title, c.price_cents,
            COUNT(e.id) AS total,
            COUNT(e.id) FILTER (WHERE e.payment_status = 'paid') AS paid,
            COUNT(e.id) FILTER (WHERE e.payment_status = 'free') AS free,
            COUNT(e.id) FILTER (WHERE e.payment_status = 'paid') * c.price_cents AS earnings_cents
        FROM courses c
        LEFT JOIN enrollments e ON e.course_id = c.id
        WHERE c.id = $1
        GROUP BY c.id
        "#,
    )
    .bind(course_id)
    .fetch_one(&pool)
    .await?;

    let daily = sqlx::query_as::<_, DailyEnrollments>(
        r#"
        SELECT enrolled_at::DATE AS day, COUNT(*) AS count
        FROM enrollments
        WHERE course_id = $1
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    let students = sqlx::query_as::<_, CourseEnrollmentRow>(
        r#"
        SELECT
            e.id, e.student_id,
            u.first_name || ' ' || u.last_name AS student_name,
            u.email AS student_email,
            e.enrolled_at, e.payment_status, e.progress, e.certificate_issued
        FROM enrollments e
        JOIN users u ON e.student_id = u.id
        WHERE e.course_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    let completed = students
        .iter()
        .filter(|s| s.progress >= 100 || s.certificate_issued)
        .count();
    let completion_rate = if students.is_empty() {
        0.0
    } else {
        (completed as f64 / students.len() as f64) * 100.0
    };

    Ok(Json(json!({
        "course_id": course_id,
        "title": course.title,
        "stats": stats,
        "daily_enrollments": daily,
        "students": students,
        "completion_rate": completion_rate,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_course_overrides_requested_status() {
        assert_eq!(
            resolve_payment_status(0, Some(PaymentStatus::Paid)),
            PaymentStatus::Free
        );
        assert_eq!(resolve_payment_status(0, None), PaymentStatus::Free);
    }

    #[test]
    fn paid_course_honors_request() {
        assert_eq!(
            resolve_payment_status(4999, Some(PaymentStatus::Pending)),
            PaymentStatus::Pending
        );
        assert_eq!(resolve_payment_status(4999, None), PaymentStatus::Paid);
    }

    #[test]
    fn progress_rounds_to_nearest_percent() {
        assert_eq!(compute_progress(0, 4), 0);
        assert_eq!(compute_progress(2, 4), 50);
        assert_eq!(compute_progress(4, 4), 100);
        assert_eq!(compute_progress(1, 3), 33);
        assert_eq!(compute_progress(2, 3), 67);
    }

    #[test]
    fn progress_of_empty_course_is_zero() {
        assert_eq!(compute_progress(0, 0), 0);
    }

    #[test]
    fn certificate_path_is_deterministic() {
        assert_eq!(certificate_path(42), "/certificates/42.pdf");
        assert_eq!(certificate_path(42), certificate_path(42));
    }
}
