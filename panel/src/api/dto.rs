use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{payment, telemetry, user, whatsapp_number};

// ---------- auth ----------

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

// ---------- users ----------

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    pub ai_token_limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenLimitRequest {
    pub limit: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub ai_tokens_used: i64,
    pub ai_token_limit: i64,
    pub subscription_expires_at: Option<NaiveDateTime>,
    pub last_login_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
            role: m.role,
            is_active: m.is_active,
            ai_tokens_used: m.ai_tokens_used,
            ai_token_limit: m.ai_token_limit,
            subscription_expires_at: m.subscription_expires_at,
            last_login_at: m.last_login_at,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

// ---------- agents / numbers ----------

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    /// Owner. Required on the admin route; ignored on the user route.
    pub user_id: Option<Uuid>,
    pub phone_number: String,
    pub display_name: Option<String>,
    #[serde(default)]
    pub ai_enabled: bool,
    pub prompt: Option<String>,
    pub model: Option<String>,
    #[serde(default)]
    pub respond_groups: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentRequest {
    pub display_name: Option<String>,
    pub ai_enabled: Option<bool>,
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub respond_groups: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListAgentsQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleAiRequest {
    pub number_id: Uuid,
    /// Absent flips the current value.
    pub ai_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleGroupsRequest {
    pub number_id: Uuid,
    pub respond_groups: Option<bool>,
}

#[derive(Debug, Serialize, Clone)]
pub struct NumberResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub phone_number: String,
    pub display_name: Option<String>,
    pub ai_enabled: bool,
    pub prompt: Option<String>,
    pub model: String,
    pub respond_groups: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<whatsapp_number::Model> for NumberResponse {
    fn from(m: whatsapp_number::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            phone_number: m.phone_number,
            display_name: m.display_name,
            ai_enabled: m.ai_enabled,
            prompt: m.prompt,
            model: m.model,
            respond_groups: m.respond_groups,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

// ---------- payments ----------

#[derive(Debug, Deserialize)]
pub struct CreatePaymentBody {
    pub amount: Option<i64>,
    pub order_id: Option<String>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub callback_url: Option<String>,
    /// Honored for admins only.
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIdQuery {
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListPaymentsQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub external_reference: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<payment::Model> for PaymentResponse {
    fn from(m: payment::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            order_id: m.order_id,
            amount: m.amount,
            currency: m.currency,
            status: m.status,
            external_reference: m.external_reference,
            redirect_url: m.redirect_url,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub active: bool,
    pub expires_at: Option<NaiveDateTime>,
}

// ---------- stats ----------

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub tokens_used: i64,
    pub token_limit: i64,
    pub tokens_remaining: i64,
    pub usage_percent: f64,
    pub price_per_1k_tokens: f64,
    pub estimated_cost: f64,
    pub numbers: u64,
    pub ai_enabled_numbers: u64,
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub users: u64,
    pub active_users: u64,
    pub numbers: u64,
    pub ai_enabled_numbers: u64,
    pub tokens_used: i64,
    pub estimated_cost: f64,
    pub paid_payments: u64,
    pub paid_amount: i64,
    pub telemetry: TelemetrySummary,
}

#[derive(Debug, Serialize)]
pub struct TelemetrySummary {
    pub samples: u64,
    pub avg_cpu_usage: Option<f64>,
    pub avg_ram_usage: Option<f64>,
    pub latest: Option<TelemetryResponse>,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryRequest {
    pub cpu_usage: f64,
    pub ram_usage: f64,
    #[serde(default)]
    pub network_rx_bytes: i64,
    #[serde(default)]
    pub network_tx_bytes: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize, Clone)]
pub struct TelemetryResponse {
    pub id: Uuid,
    pub cpu_usage: f64,
    pub ram_usage: f64,
    pub network_rx_bytes: i64,
    pub network_tx_bytes: i64,
    pub country: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub recorded_at: NaiveDateTime,
}

impl From<telemetry::Model> for TelemetryResponse {
    fn from(m: telemetry::Model) -> Self {
        Self {
            id: m.id,
            cpu_usage: m.cpu_usage,
            ram_usage: m.ram_usage,
            network_rx_bytes: m.network_rx_bytes,
            network_tx_bytes: m.network_tx_bytes,
            country: m.country,
            city: m.city,
            latitude: m.latitude,
            longitude: m.longitude,
            recorded_at: m.recorded_at,
        }
    }
}
