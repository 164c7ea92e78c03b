// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coursehub::config::Config;
use coursehub::routes;
use coursehub::services::{
    DisabledFileStore, DisabledPayments, FileStore, HttpFileStore, HttpNotifier, LogNotifier,
    Notifier, PaymentGateway, StripeGateway,
};
use coursehub::state::AppState;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Wire up external collaborators. Missing credentials fall back to the
    // disabled implementations so the rest of the API stays usable.
    let payment: Arc<dyn PaymentGateway> = match config.payment_secret_key.clone() {
        Some(key) => Arc::new(StripeGateway::new(key)),
        None => {
            tracing::warn!("PAYMENT_SECRET_KEY not set; paid checkout is disabled");
            Arc::new(DisabledPayments)
        }
    };

    let files: Arc<dyn FileStore> = match (
        config.storage_upload_url.clone(),
        config.storage_api_key.clone(),
    ) {
        (Some(url), Some(key)) => Arc::new(HttpFileStore::new(url, key)),
        _ => {
            tracing::warn!("File storage not configured; assignment uploads are disabled");
            Arc::new(DisabledFileStore)
        }
    };

    let notifier: Arc<dyn Notifier> = match (
        config.mail_api_url.clone(),
        config.mail_api_key.clone(),
        config.mail_from.clone(),
    ) {
        (Some(url), Some(key), Some(from)) => Arc::new(HttpNotifier::new(url, key, from)),
        _ => {
            tracing::warn!("Mail not configured; notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        payment,
        files,
        notifier,
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("CourseHub listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}
