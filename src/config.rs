// src/config.rs

use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,

    /// Frontend origin, used for CORS and checkout redirect URLs.
    pub client_url: String,

    // Collaborator credentials. Absent values switch the corresponding
    // collaborator to its disabled implementation.
    pub payment_secret_key: Option<String>,
    pub storage_upload_url: Option<String>,
    pub storage_api_key: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: Option<String>,

    /// When true, an assignment resubmission also clears any grade and
    /// feedback left from the previous attempt.
    pub clear_grade_on_resubmit: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3600);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let clear_grade_on_resubmit = env::var("CLEAR_GRADE_ON_RESUBMIT")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            client_url,
            payment_secret_key: env::var("PAYMENT_SECRET_KEY").ok(),
            storage_upload_url: env::var("STORAGE_UPLOAD_URL").ok(),
            storage_api_key: env::var("STORAGE_API_KEY").ok(),
            mail_api_url: env::var("MAIL_API_URL").ok(),
            mail_api_key: env::var("MAIL_API_KEY").ok(),
            mail_from: env::var("MAIL_FROM").ok(),
            clear_grade_on_resubmit,
        }
    }
}
