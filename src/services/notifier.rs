// src/services/notifier.rs

use async_trait::async_trait;
use serde_json::json;

use crate::error::AppError;

/// Transactional mail. Delivery is best-effort: callers log failures and
/// never surface them to the client.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError>;
}

/// Sends mail through an HTTP mail API.
pub struct HttpNotifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpNotifier {
    pub fn new(api_url: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": to,
                "subject": subject,
                "text": body,
            }))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mail API unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Mail API rejected message: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

/// Fallback used when mail is not configured: logs the message instead of
/// sending it. Notifications are best-effort, so this keeps the rest of the
/// system fully functional.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, to: &str, subject: &str, _body: &str) -> Result<(), AppError> {
        tracing::info!("Mail not configured; would send '{}' to {}", subject, to);
        Ok(())
    }
}
