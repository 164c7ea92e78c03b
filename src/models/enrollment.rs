// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Payment state of an enrollment. Stored as lowercase text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Free,
    Pending,
    Paid,
}

/// Represents the 'enrollments' table in the database.
/// One record per (student, course) pair, enforced by a unique index.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
    pub payment_status: PaymentStatus,
    /// External transaction reference from the payment gateway.
    pub payment_intent_id: Option<String>,
    /// Completion percentage, always recomputed from the completion set.
    pub progress: i32,
    pub certificate_issued: bool,
    pub certificate_url: Option<String>,
}

/// DTO for the direct enroll endpoint.
#[derive(Debug, Deserialize)]
pub struct EnrollRequest {
    pub course_id: i64,
    pub payment_status: Option<PaymentStatus>,
    pub payment_intent_id: Option<String>,
}

/// DTO for confirming a checkout session.
#[derive(Debug, Deserialize)]
pub struct PurchaseSuccessRequest {
    pub session_id: String,
}

/// Response of the content-complete endpoint.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: i32,
    pub certificate_issued: bool,
    pub certificate_url: Option<String>,
}

/// Aggregated row for a student's enrollment list, joined with course info.
#[derive(Debug, Serialize, FromRow)]
pub struct StudentEnrollmentRow {
    pub id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub instructor_name: String,
    pub price_cents: i64,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
    pub payment_status: PaymentStatus,
    pub progress: i32,
    pub certificate_issued: bool,
    pub certificate_url: Option<String>,
    /// Content ids this student has completed, aggregated from the
    /// completion set.
    pub completed_content: Vec<i64>,
}

/// Aggregated row for a course's enrollment list, joined with student info.
#[derive(Debug, Serialize, FromRow)]
pub struct CourseEnrollmentRow {
    pub id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub student_email: String,
    pub enrolled_at: chrono::DateTime<chrono::Utc>,
    pub payment_status: PaymentStatus,
    pub progress: i32,
    pub certificate_issued: bool,
}

/// Per-course aggregate for the instructor dashboard.
#[derive(Debug, Serialize, FromRow)]
pub struct CourseEnrollmentStats {
    pub course_id: i64,
    pub title: String,
    pub price_cents: i64,
    pub total: i64,
    pub paid: i64,
    pub free: i64,
    pub earnings_cents: i64,
}

/// Daily enrollment count for the per-course analytics chart.
#[derive(Debug, Serialize, FromRow)]
pub struct DailyEnrollments {
    pub day: chrono::NaiveDate,
    pub count: i64,
}
