//! Outbound client for the third-party payments provider.
//!
//! The provider exposes two endpoints: `POST /v1/payments` to open a payment
//! session (the response carries the redirect URL the customer is sent to)
//! and `GET /v1/payments/{id}` for the authoritative status. Nothing in this
//! module retries; callers decide what a failure means for their response.

use async_trait::async_trait;
use serde::Serialize;

use crate::entity::payment;

pub mod http;

pub use http::HttpGateway;

pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer. `message` is the provider's own text when it sent one.
    #[error("gateway returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed gateway response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePaymentRequest {
    pub amount: i64,
    pub order_id: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Successful create response. `body` is kept verbatim so handlers can pass it through.
#[derive(Debug, Clone)]
pub struct CreatedPayment {
    pub body: serde_json::Value,
}

impl CreatedPayment {
    /// Gateway payment id; some providers send it as a number.
    pub fn id(&self) -> Option<String> {
        payment_id_from_json(self.body.get("id")?)
    }

    pub fn redirect_url(&self) -> Option<String> {
        let candidates = [
            self.body.get("redirect_url"),
            self.body.get("url"),
            self.body.pointer("/source/transaction_url"),
        ];
        candidates
            .into_iter()
            .flatten()
            .find_map(|v| v.as_str().map(String::from))
    }
}

/// Status lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub id: String,
    /// Provider status, e.g. `PAID`, `PENDING`, `FAILED`.
    pub status: String,
}

impl GatewayPayment {
    pub fn is_paid(&self) -> bool {
        self.status.eq_ignore_ascii_case("PAID")
    }

    /// Map the provider status onto the local `payment.status` vocabulary.
    pub fn local_status(&self) -> &'static str {
        if self.is_paid() {
            return payment::STATUS_PAID;
        }
        match self.status.to_ascii_uppercase().as_str() {
            "FAILED" | "CANCELED" | "CANCELLED" | "EXPIRED" | "VOIDED" | "REJECTED" => {
                payment::STATUS_FAILED
            }
            _ => payment::STATUS_PENDING,
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<CreatedPayment>;

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment>;
}

/// A payment id as providers send it: a non-empty string or an integer.
pub fn payment_id_from_json(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

/// Payment ids end up in a URL path, so only a conservative charset is accepted.
pub fn is_valid_payment_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
