use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::gateway::{is_valid_payment_id, payment_id_from_json};
use crate::signature::{self, SIGNATURE_HEADER};
use crate::subscription::{self, is_subscribed};

use super::{
    ApiErr, AppState,
    dto::{PaymentIdQuery, SubscriptionStatusResponse},
    jwt::AuthClaims,
    user_handlers::current_user,
};

/// Ids may arrive as strings or integers depending on the provider.
#[derive(Debug, Default, Deserialize)]
struct NotificationBody {
    payment_id: Option<Value>,
    /// Some providers post the payment object itself.
    id: Option<Value>,
}

impl NotificationBody {
    fn payment_id(&self) -> Option<String> {
        [&self.payment_id, &self.id]
            .into_iter()
            .flatten()
            .find_map(payment_id_from_json)
    }
}

fn success(status: StatusCode, ok: bool) -> Response {
    (status, Json(json!({ "success": ok }))).into_response()
}

fn bad_request(msg: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": msg }))).into_response()
}

/// Gateway callback. The payload is only a hint: the payment status is always
/// re-read from the gateway before anything is applied.
pub async fn handle_notification(
    State(state): State<AppState>,
    Query(query): Query<PaymentIdQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !signature::verify(secret.as_bytes(), &body, header) {
            tracing::warn!("notification rejected: bad signature");
            return success(StatusCode::UNAUTHORIZED, false);
        }
    }

    let from_body = if body.is_empty() {
        NotificationBody::default()
    } else {
        match serde_json::from_slice::<NotificationBody>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "notification body is not valid JSON");
                return bad_request("invalid JSON body");
            }
        }
    };

    let Some(payment_id) = from_body
        .payment_id()
        .or(query.payment_id)
        .filter(|id| !id.is_empty())
    else {
        return bad_request("payment_id is required");
    };
    if !is_valid_payment_id(&payment_id) {
        return bad_request("invalid payment_id");
    }

    let remote = match state.gateway.fetch_payment(&payment_id).await {
        Ok(remote) => remote,
        Err(e) => {
            tracing::error!(error = %e, %payment_id, "notification status lookup failed");
            return success(StatusCode::INTERNAL_SERVER_ERROR, false);
        }
    };

    match subscription::apply_gateway_status(&state.db, &remote, state.subscription_days).await {
        Ok(outcome) => {
            tracing::info!(%payment_id, status = %remote.status, ?outcome, "notification processed");
            success(StatusCode::OK, true)
        }
        Err(e) => {
            tracing::error!(error = %e, %payment_id, "failed to apply notification");
            success(StatusCode::INTERNAL_SERVER_ERROR, false)
        }
    }
}

pub async fn status(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<SubscriptionStatusResponse>, ApiErr> {
    let user = current_user(&state.db, claims.sub).await?;

    Ok(Json(SubscriptionStatusResponse {
        active: is_subscribed(&user, Utc::now().naive_utc()),
        expires_at: user.subscription_expires_at,
    }))
}
