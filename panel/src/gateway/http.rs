use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::GatewayConfig;

use super::{CreatePaymentRequest, CreatedPayment, GatewayError, GatewayPayment, PaymentGateway, Result};

const GENERIC_UPSTREAM_MESSAGE: &str = "Payment gateway error";

/// `reqwest`-backed gateway client.
///
/// Every call carries `Authorization: Bearer <secret key>` and the public key
/// in `X-Api-Key`.
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    secret_key: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            secret_key: config.secret_key.clone(),
        })
    }

    async fn read_json(resp: reqwest::Response) -> Result<(StatusCode, Value)> {
        let status = resp.status();
        let bytes = resp.bytes().await?;

        if !status.is_success() {
            // Error bodies are best-effort; a non-JSON error still maps to Upstream.
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|v| upstream_message(&v))
                .unwrap_or_else(|| GENERIC_UPSTREAM_MESSAGE.to_string());
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let body = serde_json::from_slice(&bytes).map_err(|e| GatewayError::Decode(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn create_payment(&self, request: &CreatePaymentRequest) -> Result<CreatedPayment> {
        let resp = self
            .http
            .post(format!("{}/v1/payments", self.base_url))
            .bearer_auth(&self.secret_key)
            .header("X-Api-Key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let (status, body) = Self::read_json(resp).await?;
        tracing::debug!(status = status.as_u16(), order_id = %request.order_id, "gateway payment created");

        Ok(CreatedPayment { body })
    }

    async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
        let resp = self
            .http
            .get(format!("{}/v1/payments/{}", self.base_url, payment_id))
            .bearer_auth(&self.secret_key)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let (_, body) = Self::read_json(resp).await?;

        let status = body
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::Decode("missing `status` field".to_string()))?
            .to_string();

        let id = match body.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => payment_id.to_string(),
        };

        Ok(GatewayPayment { id, status })
    }
}

/// Pull a human-readable message out of a provider error body.
fn upstream_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
        .map(String::from)
}
