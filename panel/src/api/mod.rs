use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
};
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::set_header::response::SetResponseHeaderLayer;

use crate::auth::Auth;
use crate::gateway::PaymentGateway;

pub mod admin_handlers;
pub mod auth_handlers;
pub mod dto;
pub mod jwt;
pub mod payment_handlers;
pub mod stats_handlers;
pub mod subscription_handlers;
pub mod user_handlers;

#[cfg(test)]
pub(crate) mod test_support;

// ---------- shared state ----------

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<Auth>,
    pub db: DatabaseConnection,
    pub gateway: Arc<dyn PaymentGateway>,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// None accepts unsigned gateway notifications.
    pub webhook_secret: Option<String>,
    pub price_per_1k_tokens: f64,
    pub default_token_limit: i64,
    pub subscription_days: i64,
}

// ---------- error type ----------

/// A JSON error response: `{"error": "..."}` with an HTTP status.
pub struct ApiErr(StatusCode, String);

impl ApiErr {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(status, msg.into())
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        tracing::error!(error = %e, "request failed");
        Self(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(StatusCode::BAD_REQUEST, msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self(StatusCode::FORBIDDEN, msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusCode::CONFLICT, msg.into())
    }

    /// Map a write error, turning unique-constraint violations into 409.
    pub fn from_write(e: DbErr, conflict_msg: &str) -> Self {
        if is_unique_violation(&e) {
            Self::conflict(conflict_msg)
        } else {
            Self::internal(e)
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

pub fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Clamp `page`/`page_size` query params the same way for every list route.
pub(crate) fn page_params(page: Option<u64>, page_size: Option<u64>) -> (u64, u64) {
    (
        page.unwrap_or(1).max(1),
        page_size.unwrap_or(20).clamp(1, 100),
    )
}

// ---------- router ----------

pub fn app_router(state: AppState, cors_allowed_origins: &[String]) -> Router {
    let allowed_origins: Vec<HeaderValue> = cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new() // no origins allowed = same-origin only
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
    };

    api_routes()
        .route("/health", get(|| async { StatusCode::OK }))
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .with_state(state)
}

pub(crate) fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/admin", admin_routes())
        .nest("/user", user_routes())
        .nest("/stats", stats_routes())
        .nest("/subscriptions", subscription_routes())
        .nest("/payments", payment_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth_handlers::login))
        .route("/me", get(auth_handlers::me))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(admin_handlers::list_users).post(admin_handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(admin_handlers::get_user).delete(admin_handlers::delete_user),
        )
        .route("/activate/{id}", post(admin_handlers::activate_user))
        .route("/deactivate/{id}", post(admin_handlers::deactivate_user))
        .route("/token-limit/{id}", post(admin_handlers::set_token_limit))
        .route("/reset-tokens/{id}", post(admin_handlers::reset_tokens))
        .route(
            "/agents",
            get(admin_handlers::list_agents).post(admin_handlers::add_agent),
        )
        .route(
            "/agents/{id}",
            patch(admin_handlers::edit_agent).delete(admin_handlers::delete_agent),
        )
        .route("/payments", get(admin_handlers::list_payments))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(user_handlers::me))
        .route("/get-numbers", get(user_handlers::get_numbers))
        .route("/add-number", post(user_handlers::add_number))
        .route("/toggle-ai", post(user_handlers::toggle_ai))
        .route("/toggle-groups", post(user_handlers::toggle_groups))
        .route(
            "/numbers/{id}",
            patch(user_handlers::edit_number).delete(user_handlers::delete_number),
        )
        .route("/payments", get(user_handlers::payment_history))
}

fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/usage", get(stats_handlers::usage))
        .route("/overview", get(stats_handlers::overview))
        .route(
            "/telemetry",
            get(stats_handlers::list_telemetry).post(stats_handlers::record_telemetry),
        )
}

fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notification",
            post(subscription_handlers::handle_notification),
        )
        .route("/status", get(subscription_handlers::status))
}

fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(payment_handlers::create_payment))
        .route("/confirm", get(payment_handlers::confirm_payment))
}
