// src/routes.rs

use axum::{
    Json, Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, assignment, auth, content, course, enrollment, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, instructor_middleware, student_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, courses, content, enrollments, submissions, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, collaborators).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        state
            .config
            .client_url
            .parse()
            .expect("CLIENT_URL must be a valid origin"),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        // Protected account routes
        .merge(
            Router::new()
                .route("/profile", get(auth::profile))
                .route("/update", put(auth::update_account))
                .route("/delete", delete(auth::delete_account))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let course_routes = Router::new()
        .route("/", get(course::list_courses))
        .route("/{id}", get(course::get_course))
        // Purchasing is student-only
        .merge(
            Router::new()
                .route("/purchase/{id}", post(course::purchase_course))
                .route("/purchase-success", post(course::confirm_purchase))
                .layer(middleware::from_fn(student_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    // Course management lives in its own instructor-scoped group so the
    // public catalog reads above stay unauthenticated.
    let instructor_course_routes = Router::new()
        .route(
            "/",
            get(course::created_courses).post(course::create_course),
        )
        .route(
            "/{id}",
            put(course::update_course).delete(course::delete_course),
        )
        .layer(middleware::from_fn(instructor_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    // Ownership and enrollment checks happen inside the handlers; the layer
    // only guarantees an authenticated caller.
    let content_routes = Router::new()
        .route("/", post(content::create_content))
        .route("/course/{id}", get(content::list_course_content))
        .route(
            "/{id}",
            get(content::get_content)
                .put(content::update_content)
                .delete(content::delete_content),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let enrollment_routes = Router::new()
        // Student-only writes
        .merge(
            Router::new()
                .route("/", post(enrollment::enroll))
                .route(
                    "/{id}/complete/{content_id}",
                    post(enrollment::complete_content),
                )
                .layer(middleware::from_fn(student_middleware)),
        )
        // Any authenticated caller
        .route("/student/{id}", get(enrollment::list_student_enrollments))
        // Instructor/admin reads
        .merge(
            Router::new()
                .route("/course/{id}", get(enrollment::list_course_enrollments))
                .route(
                    "/analytics/instructor",
                    get(enrollment::instructor_analytics),
                )
                .route(
                    "/analytics/course/{id}",
                    get(enrollment::course_analytics),
                )
                .layer(middleware::from_fn(instructor_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_routes = Router::new()
        .merge(
            Router::new()
                .route("/", post(quiz::submit_quiz))
                .route("/{id}", get(quiz::get_my_submission))
                .layer(middleware::from_fn(student_middleware)),
        )
        .merge(
            Router::new()
                .route("/analytics/{id}", get(quiz::quiz_analytics))
                .layer(middleware::from_fn(instructor_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let assignment_routes = Router::new()
        .merge(
            Router::new()
                .route("/", post(assignment::submit_assignment))
                .route("/{id}", get(assignment::get_my_submission))
                .layer(middleware::from_fn(student_middleware)),
        )
        .merge(
            Router::new()
                .route("/all/{id}", get(assignment::list_submissions))
                .route("/{id}/grade", put(assignment::grade_submission))
                .layer(middleware::from_fn(instructor_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/{id}/role", put(admin::update_user_role))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/courses", get(admin::list_courses))
        .route("/courses/{id}", delete(admin::delete_course))
        .route("/analytics/overview", get(admin::analytics_overview))
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "message": "Server is running" })) }),
        )
        .nest("/api/auth", auth_routes)
        .nest("/api/courses", course_routes)
        .nest("/api/instructor/courses", instructor_course_routes)
        .nest("/api/course-content", content_routes)
        .nest("/api/enrollments", enrollment_routes)
        .nest("/api/quiz-submissions", quiz_routes)
        .nest("/api/assignment-submissions", assignment_routes)
        .nest("/api/admin", admin_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
