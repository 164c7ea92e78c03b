// src/models/content.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// One quiz question with its answer key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// The correct option, compared by exact string equality when grading.
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub option: String,
    #[serde(default)]
    pub votes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub answer_required: bool,
}

/// Type-specific payload of a content item. The `type` tag is the
/// discriminant; each variant carries only the fields relevant to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentPayload {
    Slide {
        content_url: String,
    },
    Video {
        content_url: String,
    },
    Document {
        content_url: Option<String>,
        external_link: Option<String>,
    },
    Live {
        live_date: chrono::DateTime<chrono::Utc>,
        content_url: Option<String>,
    },
    Assignment {
        due_date: Option<chrono::DateTime<chrono::Utc>>,
        /// Reference file handed out with the assignment.
        assignment_file: Option<String>,
    },
    Quiz {
        due_date: Option<chrono::DateTime<chrono::Utc>>,
        questions: Vec<QuizQuestion>,
    },
    Notice {
        notice_text: String,
    },
    Poll {
        options: Vec<PollOption>,
    },
    Survey {
        questions: Vec<SurveyQuestion>,
    },
}

impl ContentPayload {
    /// The tag stored in the `content_type` column.
    pub fn type_tag(&self) -> &'static str {
        match self {
            ContentPayload::Slide { .. } => "slide",
            ContentPayload::Video { .. } => "video",
            ContentPayload::Document { .. } => "document",
            ContentPayload::Live { .. } => "live",
            ContentPayload::Assignment { .. } => "assignment",
            ContentPayload::Quiz { .. } => "quiz",
            ContentPayload::Notice { .. } => "notice",
            ContentPayload::Poll { .. } => "poll",
            ContentPayload::Survey { .. } => "survey",
        }
    }

    /// Structural validation beyond what serde enforces.
    ///
    /// Question text must be unique within a quiz: grading matches submitted
    /// answers to questions by text, so a duplicate would be ambiguous.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ContentPayload::Quiz { questions, .. } => {
                if questions.is_empty() {
                    return Err("A quiz needs at least one question".to_string());
                }
                let mut seen = std::collections::HashSet::new();
                for q in questions {
                    if q.question.trim().is_empty() {
                        return Err("Question text cannot be empty".to_string());
                    }
                    if q.options.is_empty() {
                        return Err(format!("Question '{}' has no options", q.question));
                    }
                    if !q.options.contains(&q.answer) {
                        return Err(format!(
                            "Answer for '{}' is not one of its options",
                            q.question
                        ));
                    }
                    if !seen.insert(q.question.as_str()) {
                        return Err(format!("Duplicate question text: '{}'", q.question));
                    }
                }
                Ok(())
            }
            ContentPayload::Poll { options } => {
                if options.is_empty() {
                    return Err("A poll needs at least one option".to_string());
                }
                Ok(())
            }
            ContentPayload::Survey { questions } => {
                if questions.is_empty() {
                    return Err("A survey needs at least one question".to_string());
                }
                Ok(())
            }
            ContentPayload::Document { external_link, .. } => {
                if let Some(link) = external_link {
                    if url::Url::parse(link).is_err() {
                        return Err("Invalid external link".to_string());
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

/// Represents the 'course_contents' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CourseContent {
    pub id: i64,
    pub course_id: i64,
    pub content_type: String,
    pub title: String,
    pub description: Option<String>,
    pub payload: Json<ContentPayload>,
    pub created_by: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for creating a content item.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContentRequest {
    pub course_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub payload: ContentPayload,
}

/// DTO for updating a content item. The payload, when present, replaces the
/// stored one wholesale.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateContentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub payload: Option<ContentPayload>,
}
