// src/services/payment.rs

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;

/// Input for creating a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub course_id: i64,
    pub student_id: i64,
    pub title: String,
    pub description: String,
    pub amount_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
}

/// A created checkout session; the client is redirected to `url`.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Outcome of retrieving a checkout session after the client returns.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub paid: bool,
    /// The gateway's transaction reference, recorded on the enrollment.
    pub payment_intent: Option<String>,
    pub course_id: i64,
    pub student_id: i64,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, req: CheckoutRequest) -> Result<CheckoutSession, AppError>;

    /// Retrieves the confirmation for a finished checkout session.
    async fn retrieve(&self, session_id: &str) -> Result<PaymentConfirmation, AppError>;
}

/// Stripe Checkout over its HTTP API.
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
        }
    }
}

#[derive(Deserialize)]
struct StripeSession {
    id: String,
    url: Option<String>,
    payment_status: Option<String>,
    payment_intent: Option<String>,
    #[serde(default)]
    metadata: std::collections::HashMap<String, String>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout(&self, req: CheckoutRequest) -> Result<CheckoutSession, AppError> {
        let params = [
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", "usd".to_string()),
            (
                "line_items[0][price_data][unit_amount]",
                req.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                req.title.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                req.description.clone(),
            ),
            ("success_url", req.success_url.clone()),
            ("cancel_url", req.cancel_url.clone()),
            ("metadata[course_id]", req.course_id.to_string()),
            ("metadata[student_id]", req.student_id.to_string()),
        ];

        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Payment gateway unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Payment gateway rejected checkout creation: {}",
                response.status()
            )));
        }

        let session: StripeSession = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed gateway response: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| AppError::Upstream("Checkout session has no URL".to_string()))?;

        Ok(CheckoutSession {
            id: session.id,
            url,
        })
    }

    async fn retrieve(&self, session_id: &str) -> Result<PaymentConfirmation, AppError> {
        let response = self
            .client
            .get(format!(
                "https://api.stripe.com/v1/checkout/sessions/{}",
                session_id
            ))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Payment gateway unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Payment gateway could not retrieve session: {}",
                response.status()
            )));
        }

        let session: StripeSession = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed gateway response: {}", e)))?;

        let parse_meta = |key: &str| -> Result<i64, AppError> {
            session
                .metadata
                .get(key)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| {
                    AppError::Upstream(format!("Checkout session metadata missing '{}'", key))
                })
        };

        Ok(PaymentConfirmation {
            paid: session.payment_status.as_deref() == Some("paid"),
            payment_intent: session.payment_intent,
            course_id: parse_meta("course_id")?,
            student_id: parse_meta("student_id")?,
        })
    }
}

/// Fallback used when no payment key is configured. Every call fails with
/// an upstream error instead of silently approving purchases.
pub struct DisabledPayments;

#[async_trait]
impl PaymentGateway for DisabledPayments {
    async fn create_checkout(&self, _req: CheckoutRequest) -> Result<CheckoutSession, AppError> {
        Err(AppError::Upstream(
            "Payment gateway is not configured".to_string(),
        ))
    }

    async fn retrieve(&self, _session_id: &str) -> Result<PaymentConfirmation, AppError> {
        Err(AppError::Upstream(
            "Payment gateway is not configured".to_string(),
        ))
    }
}
