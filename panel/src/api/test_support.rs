//! Shared fixtures for handler tests: in-memory DB, state, tokens, request helpers.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, Response},
};
use chrono::Utc;
use migration::MigratorTrait as _;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, EntityTrait, Set};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use uuid::Uuid;

use super::{AppState, api_routes, jwt};
use crate::auth::Auth;
use crate::config::GatewayConfig;
use crate::entity::{
    payment,
    user::{self, ROLE_ADMIN, ROLE_USER},
    whatsapp_number,
};
use crate::gateway::HttpGateway;

pub const JWT_SECRET: &str = "test-jwt-secret-key-32-chars-pad";

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    db
}

/// State whose gateway points at `gateway_url` (a wiremock server, or an
/// unroutable address when the test never reaches the gateway).
pub fn make_state(db: DatabaseConnection, gateway_url: &str) -> AppState {
    let gateway = HttpGateway::new(&GatewayConfig {
        base_url: gateway_url.to_string(),
        api_key: "pk_test".to_string(),
        secret_key: "sk_test".to_string(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();

    AppState {
        auth: Arc::new(Auth::new(db.clone())),
        db,
        gateway: Arc::new(gateway),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiry_hours: 1,
        webhook_secret: None,
        price_per_1k_tokens: 0.002,
        default_token_limit: 100_000,
        subscription_days: 30,
    }
}

pub fn offline_state(db: DatabaseConnection) -> AppState {
    make_state(db, "http://127.0.0.1:1")
}

pub fn router(state: AppState) -> Router {
    api_routes().with_state(state)
}

pub fn token_for(id: Uuid, role: &str) -> String {
    let claims = jwt::Claims {
        sub: id,
        username: format!("user-{id}"),
        role: role.to_string(),
        exp: (Utc::now().timestamp() as u64) + 3600,
    };
    jwt::encode_jwt(&claims, JWT_SECRET).unwrap()
}

pub fn admin_token(id: Uuid) -> String {
    token_for(id, ROLE_ADMIN)
}

pub fn user_token(id: Uuid) -> String {
    token_for(id, ROLE_USER)
}

pub async fn insert_user(db: &DatabaseConnection, username: &str, is_admin: bool) -> Uuid {
    let now = Utc::now().naive_utc();
    let id = Uuid::now_v7();
    user::ActiveModel {
        id: Set(id),
        username: Set(username.to_string()),
        email: Set(format!("{username}@example.com")),
        password_hash: Set("hash".to_string()),
        role: Set(if is_admin { ROLE_ADMIN } else { ROLE_USER }.to_string()),
        is_active: Set(true),
        ai_tokens_used: Set(0),
        ai_token_limit: Set(1000),
        subscription_expires_at: Set(None),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn insert_number(db: &DatabaseConnection, user_id: Uuid, phone: &str) -> Uuid {
    let now = Utc::now().naive_utc();
    let id = Uuid::now_v7();
    whatsapp_number::ActiveModel {
        id: Set(id),
        user_id: Set(user_id),
        phone_number: Set(phone.to_string()),
        display_name: Set(None),
        ai_enabled: Set(false),
        prompt: Set(None),
        model: Set(whatsapp_number::DEFAULT_MODEL.to_string()),
        respond_groups: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn insert_payment(
    db: &DatabaseConnection,
    user_id: Option<Uuid>,
    reference: &str,
    status: &str,
) -> Uuid {
    let now = Utc::now().naive_utc();
    let id = Uuid::now_v7();
    payment::ActiveModel {
        id: Set(id),
        user_id: Set(user_id),
        order_id: Set(format!("order-{reference}")),
        amount: Set(4900),
        currency: Set(payment::DEFAULT_CURRENCY.to_string()),
        status: Set(status.to_string()),
        external_reference: Set(Some(reference.to_string())),
        redirect_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .unwrap();
    id
}

pub async fn set_active(db: &DatabaseConnection, id: Uuid, is_active: bool) {
    let row = user::Entity::find_by_id(id).one(db).await.unwrap().unwrap();
    let mut active: user::ActiveModel = row.into();
    active.is_active = Set(is_active);
    active.update(db).await.unwrap();
}

pub async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_string(&value).unwrap())
        }
        None => Body::empty(),
    };
    router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(res: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
