// tests/progress_tests.rs
//
// End-to-end flows for progress tracking, quiz retakes and assignment
// resubmission.

use std::sync::Arc;

use async_trait::async_trait;
use coursehub::{
    config::Config,
    error::AppError,
    routes,
    services::{
        CheckoutRequest, CheckoutSession, FileStore, LogNotifier, PaymentConfirmation,
        PaymentGateway,
    },
    state::AppState,
};
use sqlx::postgres::PgPoolOptions;

struct UnusedGateway;

#[async_trait]
impl PaymentGateway for UnusedGateway {
    async fn create_checkout(&self, _req: CheckoutRequest) -> Result<CheckoutSession, AppError> {
        panic!("no checkout expected in these tests");
    }

    async fn retrieve(&self, _session_id: &str) -> Result<PaymentConfirmation, AppError> {
        panic!("no confirmation expected in these tests");
    }
}

struct MemoryFileStore;

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, filename: &str, _bytes: Vec<u8>) -> Result<String, AppError> {
        Ok(format!("uploads/{}", filename))
    }
}

async fn spawn_app() -> Option<String> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping integration test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&database_url)
        .await
        .expect("Failed to connect to Postgres for testing.");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: database_url.clone(),
        jwt_secret: "progress_test_secret".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        client_url: "http://localhost:3000".to_string(),
        payment_secret_key: None,
        storage_upload_url: None,
        storage_api_key: None,
        mail_api_url: None,
        mail_api_key: None,
        mail_from: None,
        clear_grade_on_resubmit: false,
    };

    let state = AppState {
        pool,
        config,
        payment: Arc::new(UnusedGateway),
        files: Arc::new(MemoryFileStore),
        notifier: Arc::new(LogNotifier),
    };

    let app = routes::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Some(address)
}

async fn signup_and_login(client: &reqwest::Client, address: &str, role: &str) -> (String, i64) {
    let email = format!(
        "{}_{}@test.io",
        role.to_lowercase(),
        &uuid::Uuid::new_v4().to_string()[..8]
    );
    let password = "password123";

    client
        .post(format!("{}/api/auth/signup", address))
        .json(&serde_json::json!({
            "first_name": "Test",
            "last_name": role,
            "email": email,
            "password": password,
            "role": role,
        }))
        .send()
        .await
        .expect("Signup failed");

    let login = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Login failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();

    (
        login["token"].as_str().unwrap().to_string(),
        login["user"]["id"].as_i64().unwrap(),
    )
}

async fn create_free_course(client: &reqwest::Client, address: &str, token: &str) -> i64 {
    let course: serde_json::Value = client
        .post(format!("{}/api/instructor/courses", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": "Intro to Databases",
            "category": "Programming",
            "price_cents": 0,
            "level": "Beginner",
            "description": "Tables, rows and transactions.",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    course["id"].as_i64().unwrap()
}

async fn create_content(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    course_id: i64,
    title: &str,
    payload: serde_json::Value,
) -> i64 {
    let resp = client
        .post(format!("{}/api/course-content", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "course_id": course_id,
            "title": title,
            "payload": payload,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let content: serde_json::Value = resp.json().await.unwrap();
    content["id"].as_i64().unwrap()
}

async fn enroll(client: &reqwest::Client, address: &str, token: &str, course_id: i64) {
    let resp = client
        .post(format!("{}/api/enrollments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "course_id": course_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
}

async fn complete(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    course_id: i64,
    content_id: i64,
) -> serde_json::Value {
    client
        .post(format!(
            "{}/api/enrollments/{}/complete/{}",
            address, course_id, content_id
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn progress_tracks_completions_and_issues_certificate_once() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;

    // 4 content items
    let mut content_ids = Vec::new();
    for (title, payload) in [
        ("Welcome slides", serde_json::json!({ "type": "slide", "content_url": "https://cdn.test/slides.pdf" })),
        ("Lecture 1", serde_json::json!({ "type": "video", "content_url": "https://cdn.test/l1.mp4" })),
        ("Syllabus", serde_json::json!({ "type": "notice", "notice_text": "Weekly quizzes start Monday." })),
        ("Reading list", serde_json::json!({ "type": "document", "content_url": "https://cdn.test/reading.pdf", "external_link": null })),
    ] {
        content_ids
            .push(create_content(&client, &address, &instructor_token, course_id, title, payload).await);
    }

    let (student_token, student_id) = signup_and_login(&client, &address, "Student").await;
    enroll(&client, &address, &student_token, course_id).await;

    // Complete 2 of 4
    complete(&client, &address, &student_token, course_id, content_ids[0]).await;
    let halfway = complete(&client, &address, &student_token, course_id, content_ids[1]).await;
    assert_eq!(halfway["progress"], 50);
    assert_eq!(halfway["certificate_issued"], false);

    // Complete the remaining 2
    complete(&client, &address, &student_token, course_id, content_ids[2]).await;
    let done = complete(&client, &address, &student_token, course_id, content_ids[3]).await;
    assert_eq!(done["progress"], 100);
    assert_eq!(done["certificate_issued"], true);
    let certificate_url = done["certificate_url"].as_str().unwrap().to_string();
    assert!(certificate_url.starts_with("/certificates/"));

    // Re-completing an already-completed item changes nothing
    let again = complete(&client, &address, &student_token, course_id, content_ids[0]).await;
    assert_eq!(again["progress"], 100);
    assert_eq!(again["certificate_issued"], true);
    assert_eq!(again["certificate_url"].as_str().unwrap(), certificate_url);

    let enrollments: Vec<serde_json::Value> = client
        .get(format!("{}/api/enrollments/student/{}", address, student_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(
        enrollments[0]["completed_content"].as_array().unwrap().len(),
        4
    );

    // Certificate survives the instructor adding more content afterwards
    let extra = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Bonus material",
        serde_json::json!({ "type": "slide", "content_url": "https://cdn.test/bonus.pdf" }),
    )
    .await;
    let after_extra = complete(&client, &address, &student_token, course_id, extra).await;
    assert_eq!(after_extra["progress"], 100);
    assert_eq!(after_extra["certificate_issued"], true);
}

#[tokio::test]
async fn completing_content_without_enrollment_is_not_found() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;
    let content_id = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Lonely slide",
        serde_json::json!({ "type": "slide", "content_url": "https://cdn.test/s.pdf" }),
    )
    .await;

    let (student_token, _) = signup_and_login(&client, &address, "Student").await;

    let resp = client
        .post(format!(
            "{}/api/enrollments/{}/complete/{}",
            address, course_id, content_id
        ))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_retake_overwrites_previous_submission() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;

    let quiz_id = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Week 1 quiz",
        serde_json::json!({
            "type": "quiz",
            "due_date": null,
            "questions": [
                { "question": "q1", "options": ["A", "B"], "answer": "A" },
                { "question": "q2", "options": ["A", "B"], "answer": "B" },
            ],
        }),
    )
    .await;

    let (student_token, _) = signup_and_login(&client, &address, "Student").await;
    enroll(&client, &address, &student_token, course_id).await;

    // First attempt: one right, one wrong
    let first: serde_json::Value = client
        .post(format!("{}/api/quiz-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "quiz_content_id": quiz_id,
            "answers": [
                { "question": "q1", "selected": "A" },
                { "question": "q2", "selected": "A" },
            ],
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["score"], 1);
    let answers = first["answers"].as_array().unwrap();
    assert_eq!(answers.len(), 2);
    assert_eq!(answers[0]["is_correct"], true);
    assert_eq!(answers[1]["is_correct"], false);
    assert_eq!(answers[1]["correct"], "B");

    // Retake: both right. Overwrites, does not accumulate.
    let second: serde_json::Value = client
        .post(format!("{}/api/quiz-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "quiz_content_id": quiz_id,
            "answers": [
                { "question": "q1", "selected": "A" },
                { "question": "q2", "selected": "B" },
            ],
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["score"], 2);

    let stored: serde_json::Value = client
        .get(format!("{}/api/quiz-submissions/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", student_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["score"], 2);

    // Analytics reflect only the latest attempt
    let analytics: serde_json::Value = client
        .get(format!(
            "{}/api/quiz-submissions/analytics/{}",
            address, quiz_id
        ))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(analytics["total_submissions"], 1);
    assert_eq!(analytics["average_score"], 2.0);
    assert_eq!(analytics["question_stats"][0]["correct"], 1);
    assert_eq!(analytics["question_stats"][0]["incorrect"], 0);
}

#[tokio::test]
async fn submitting_to_non_quiz_content_is_not_found() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;
    let slide_id = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Just a slide",
        serde_json::json!({ "type": "slide", "content_url": "https://cdn.test/s.pdf" }),
    )
    .await;

    let (student_token, _) = signup_and_login(&client, &address, "Student").await;

    let resp = client
        .post(format!("{}/api/quiz-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({ "quiz_content_id": slide_id, "answers": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn assignment_resubmission_overwrites_file_but_keeps_grade() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;

    let assignment_id = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Homework 1",
        serde_json::json!({ "type": "assignment", "due_date": null, "assignment_file": null }),
    )
    .await;

    let (student_token, _) = signup_and_login(&client, &address, "Student").await;
    enroll(&client, &address, &student_token, course_id).await;

    // First submission
    let form = reqwest::multipart::Form::new()
        .text("assignment_content_id", assignment_id.to_string())
        .text("comments", "first try")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"print('hello')".to_vec()).file_name("hw1.py"),
        );
    let first: serde_json::Value = client
        .post(format!("{}/api/assignment-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(first["file_url"], "uploads/hw1.py");
    let submission_id = first["id"].as_i64().unwrap();

    // Instructor grades it
    let graded: serde_json::Value = client
        .put(format!(
            "{}/api/assignment-submissions/{}/grade",
            address, submission_id
        ))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({ "grade": 90.0, "feedback": "Nice work" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(graded["grade"], 90.0);

    // Resubmission overwrites the file and comments, grade stays
    // (CLEAR_GRADE_ON_RESUBMIT defaults to off).
    let form = reqwest::multipart::Form::new()
        .text("assignment_content_id", assignment_id.to_string())
        .text("comments", "second try")
        .part(
            "file",
            reqwest::multipart::Part::bytes(b"print('hello again')".to_vec())
                .file_name("hw1_v2.py"),
        );
    let second: serde_json::Value = client
        .post(format!("{}/api/assignment-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(second["id"].as_i64().unwrap(), submission_id);
    assert_eq!(second["file_url"], "uploads/hw1_v2.py");
    assert_eq!(second["comments"], "second try");
    assert_eq!(second["grade"], 90.0);

    // Exactly one record for the pair
    let all: Vec<serde_json::Value> = client
        .get(format!(
            "{}/api/assignment-submissions/all/{}",
            address, assignment_id
        ))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["file_url"], "uploads/hw1_v2.py");
}

#[tokio::test]
async fn assignment_submission_requires_a_file() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;
    let assignment_id = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Homework 2",
        serde_json::json!({ "type": "assignment", "due_date": null, "assignment_file": null }),
    )
    .await;

    let (student_token, _) = signup_and_login(&client, &address, "Student").await;

    let form = reqwest::multipart::Form::new()
        .text("assignment_content_id", assignment_id.to_string())
        .text("comments", "forgot the file");
    let resp = client
        .post(format!("{}/api/assignment-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn quiz_with_duplicate_question_text_is_rejected() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;

    let resp = client
        .post(format!("{}/api/course-content", address))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({
            "course_id": course_id,
            "title": "Broken quiz",
            "payload": {
                "type": "quiz",
                "due_date": null,
                "questions": [
                    { "question": "same", "options": ["A", "B"], "answer": "A" },
                    { "question": "same", "options": ["A", "B"], "answer": "B" },
                ],
            },
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn quiz_with_submissions_cannot_be_edited() {
    let Some(address) = spawn_app().await else { return };
    let client = reqwest::Client::new();

    let (instructor_token, _) = signup_and_login(&client, &address, "Instructor").await;
    let course_id = create_free_course(&client, &address, &instructor_token).await;

    let quiz_id = create_content(
        &client,
        &address,
        &instructor_token,
        course_id,
        "Locked quiz",
        serde_json::json!({
            "type": "quiz",
            "due_date": null,
            "questions": [{ "question": "q1", "options": ["A", "B"], "answer": "A" }],
        }),
    )
    .await;

    let (student_token, _) = signup_and_login(&client, &address, "Student").await;
    enroll(&client, &address, &student_token, course_id).await;

    client
        .post(format!("{}/api/quiz-submissions", address))
        .header("Authorization", format!("Bearer {}", student_token))
        .json(&serde_json::json!({
            "quiz_content_id": quiz_id,
            "answers": [{ "question": "q1", "selected": "A" }],
        }))
        .send()
        .await
        .unwrap();

    let resp = client
        .put(format!("{}/api/course-content/{}", address, quiz_id))
        .header("Authorization", format!("Bearer {}", instructor_token))
        .json(&serde_json::json!({
            "payload": {
                "type": "quiz",
                "due_date": null,
                "questions": [{ "question": "q1 changed", "options": ["A", "B"], "answer": "B" }],
            },
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 409);
}
