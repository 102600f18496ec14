use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, Set};
use serde_json::json;
use uuid::Uuid;

use crate::entity::payment;
use crate::gateway::{CreatePaymentRequest, CreatedPayment, GatewayError, is_valid_payment_id};
use crate::subscription;

use super::{
    AppState,
    dto::{CreatePaymentBody, PaymentIdQuery},
    jwt::{AuthClaims, require_active_admin},
};

fn message(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "message": msg.into() }))).into_response()
}

fn confirm_status(status: StatusCode, paid: bool) -> Response {
    let label = if paid { "paid" } else { "error" };
    (status, Json(json!({ "status": label }))).into_response()
}

/// Open a payment session with the gateway and pass its answer through.
pub async fn create_payment(
    claims: Option<AuthClaims>,
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return message(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let Some(amount) = body.amount.filter(|a| *a > 0) else {
        return message(StatusCode::BAD_REQUEST, "amount is required and must be positive");
    };
    let Some(order_id) = body
        .order_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return message(StatusCode::BAD_REQUEST, "order_id is required");
    };

    let owner = match (&claims, body.user_id) {
        (Some(AuthClaims(c)), Some(uid)) if c.is_admin() => {
            match require_active_admin(&state.db, c.sub).await {
                Ok(_) => Some(uid),
                Err((status, msg)) => return message(status, msg),
            }
        }
        (Some(AuthClaims(c)), _) => Some(c.sub),
        (None, _) => None,
    };

    let request = CreatePaymentRequest {
        amount,
        order_id,
        currency: body
            .currency
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| payment::DEFAULT_CURRENCY.to_string()),
        description: body.description,
        callback_url: body.callback_url,
    };

    match state.gateway.create_payment(&request).await {
        Ok(created) => {
            match record_payment(&state.db, owner, &request, &created).await {
                Ok(row) => tracing::info!(
                    payment_id = %row.id,
                    order_id = %row.order_id,
                    external_reference = ?row.external_reference,
                    "payment created"
                ),
                Err(e) => tracing::error!(
                    error = %e,
                    order_id = %request.order_id,
                    "failed to record payment"
                ),
            }
            (StatusCode::OK, Json(created.body)).into_response()
        }
        Err(GatewayError::Upstream { status, message: msg }) => {
            tracing::warn!(status, order_id = %request.order_id, reason = %msg, "gateway rejected payment");
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            message(status, msg)
        }
        Err(e) => {
            tracing::error!(error = %e, order_id = %request.order_id, "gateway call failed");
            message(StatusCode::INTERNAL_SERVER_ERROR, "Payment gateway unavailable")
        }
    }
}

async fn record_payment(
    db: &DatabaseConnection,
    owner: Option<Uuid>,
    request: &CreatePaymentRequest,
    created: &CreatedPayment,
) -> Result<payment::Model, DbErr> {
    let now = Utc::now().naive_utc();
    payment::ActiveModel {
        id: Set(Uuid::now_v7()),
        user_id: Set(owner),
        order_id: Set(request.order_id.clone()),
        amount: Set(request.amount),
        currency: Set(request.currency.clone()),
        status: Set(payment::STATUS_PENDING.to_string()),
        external_reference: Set(created.id()),
        redirect_url: Set(created.redirect_url()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
}

/// Browser return leg: ask the gateway whether the payment went through.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Query(query): Query<PaymentIdQuery>,
) -> Response {
    let Some(payment_id) = query.payment_id.filter(|id| !id.is_empty()) else {
        return message(StatusCode::BAD_REQUEST, "payment_id is required");
    };
    if !is_valid_payment_id(&payment_id) {
        return message(StatusCode::BAD_REQUEST, "invalid payment_id");
    }

    let remote = match state.gateway.fetch_payment(&payment_id).await {
        Ok(remote) => remote,
        Err(e) => {
            tracing::error!(error = %e, %payment_id, "payment confirmation failed");
            return confirm_status(StatusCode::INTERNAL_SERVER_ERROR, false);
        }
    };

    match subscription::apply_gateway_status(&state.db, &remote, state.subscription_days).await {
        Ok(outcome) => tracing::info!(%payment_id, status = %remote.status, ?outcome, "payment confirmed"),
        Err(e) => tracing::error!(error = %e, %payment_id, "failed to sync payment status"),
    }

    confirm_status(StatusCode::OK, remote.is_paid())
}
