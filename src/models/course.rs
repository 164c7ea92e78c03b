// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// Course category. Closed set, stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum CourseCategory {
    Programming,
    Design,
    Business,
    Language,
    Other,
}

/// Course difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,

    pub instructor_id: i64,

    /// Denormalized display name, kept in sync on course updates.
    pub instructor_name: String,

    pub title: String,

    pub category: CourseCategory,

    /// Price in cents. 0 means the course is free.
    pub price_cents: i64,

    pub level: CourseLevel,

    pub description: String,

    pub cover_image: Option<String>,

    pub sample_video: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a new course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub category: CourseCategory,
    #[validate(range(min = 0))]
    pub price_cents: i64,
    pub level: CourseLevel,
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub cover_image: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub sample_video: Option<String>,
}

/// DTO for updating a course. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub category: Option<CourseCategory>,
    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,
    pub level: Option<CourseLevel>,
    #[validate(length(min = 1, max = 20000))]
    pub description: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub cover_image: Option<String>,
    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub sample_video: Option<String>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if url::Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
