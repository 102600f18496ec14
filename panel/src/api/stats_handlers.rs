use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Alias, Expr, Func, SimpleExpr},
};
use uuid::Uuid;

use crate::entity::{payment, telemetry, user, whatsapp_number};

use super::{
    ApiErr, AppState,
    dto::{
        OverviewResponse, TelemetryQuery, TelemetryRequest, TelemetryResponse, TelemetrySummary,
        UsageResponse,
    },
    jwt::{AdminClaims, AuthClaims},
    user_handlers::current_user,
};

const DEFAULT_TELEMETRY_LIMIT: u64 = 50;
const MAX_TELEMETRY_LIMIT: u64 = 500;

/// Cost of `tokens` at `price_per_1k`, rounded to 6 decimal places.
pub fn estimated_cost(tokens: i64, price_per_1k: f64) -> f64 {
    let raw = tokens.max(0) as f64 / 1000.0 * price_per_1k;
    (raw * 1_000_000.0).round() / 1_000_000.0
}

/// Percent of the limit consumed; a zero limit reads as fully used once any token is spent.
pub fn usage_percent(used: i64, limit: i64) -> f64 {
    if limit <= 0 {
        return if used > 0 { 100.0 } else { 0.0 };
    }
    let pct = used.max(0) as f64 / limit as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

pub async fn usage(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<UsageResponse>, ApiErr> {
    let user = current_user(&state.db, claims.sub).await?;

    let numbers = whatsapp_number::Entity::find()
        .filter(whatsapp_number::Column::UserId.eq(user.id))
        .count(&state.db)
        .await
        .map_err(ApiErr::internal)?;
    let ai_enabled_numbers = whatsapp_number::Entity::find()
        .filter(whatsapp_number::Column::UserId.eq(user.id))
        .filter(whatsapp_number::Column::AiEnabled.eq(true))
        .count(&state.db)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(UsageResponse {
        tokens_used: user.ai_tokens_used,
        token_limit: user.ai_token_limit,
        tokens_remaining: user.ai_token_limit.saturating_sub(user.ai_tokens_used).max(0),
        usage_percent: usage_percent(user.ai_tokens_used, user.ai_token_limit),
        price_per_1k_tokens: state.price_per_1k_tokens,
        estimated_cost: estimated_cost(user.ai_tokens_used, state.price_per_1k_tokens),
        numbers,
        ai_enabled_numbers,
    }))
}

pub async fn overview(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
) -> Result<Json<OverviewResponse>, ApiErr> {
    let db = &state.db;

    let users = user::Entity::find().count(db).await.map_err(ApiErr::internal)?;
    let active_users = user::Entity::find()
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await
        .map_err(ApiErr::internal)?;
    let numbers = whatsapp_number::Entity::find()
        .count(db)
        .await
        .map_err(ApiErr::internal)?;
    let ai_enabled_numbers = whatsapp_number::Entity::find()
        .filter(whatsapp_number::Column::AiEnabled.eq(true))
        .count(db)
        .await
        .map_err(ApiErr::internal)?;

    let tokens_used = user::Entity::find()
        .select_only()
        .column_as(sum_bigint(user::Column::AiTokensUsed), "total")
        .into_tuple::<Option<i64>>()
        .one(db)
        .await
        .map_err(ApiErr::internal)?
        .flatten()
        .unwrap_or(0);

    let paid = payment::Entity::find().filter(payment::Column::Status.eq(payment::STATUS_PAID));
    let paid_payments = paid.clone().count(db).await.map_err(ApiErr::internal)?;
    let paid_amount = paid
        .select_only()
        .column_as(sum_bigint(payment::Column::Amount), "total")
        .into_tuple::<Option<i64>>()
        .one(db)
        .await
        .map_err(ApiErr::internal)?
        .flatten()
        .unwrap_or(0);

    let telemetry = telemetry_summary(db).await.map_err(ApiErr::internal)?;

    Ok(Json(OverviewResponse {
        users,
        active_users,
        numbers,
        ai_enabled_numbers,
        tokens_used,
        estimated_cost: estimated_cost(tokens_used, state.price_per_1k_tokens),
        paid_payments,
        paid_amount,
        telemetry,
    }))
}

pub async fn record_telemetry(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Json(body): Json<TelemetryRequest>,
) -> Result<(StatusCode, Json<TelemetryResponse>), ApiErr> {
    let percent = 0.0..=100.0;
    if !percent.contains(&body.cpu_usage) || !percent.contains(&body.ram_usage) {
        return Err(ApiErr::bad_request(
            "cpu_usage and ram_usage must be between 0 and 100",
        ));
    }
    if body.network_rx_bytes < 0 || body.network_tx_bytes < 0 {
        return Err(ApiErr::bad_request("network counters must be >= 0"));
    }

    let model = telemetry::ActiveModel {
        id: Set(Uuid::now_v7()),
        cpu_usage: Set(body.cpu_usage),
        ram_usage: Set(body.ram_usage),
        network_rx_bytes: Set(body.network_rx_bytes),
        network_tx_bytes: Set(body.network_tx_bytes),
        country: Set(body.country),
        city: Set(body.city),
        latitude: Set(body.latitude),
        longitude: Set(body.longitude),
        recorded_at: Set(Utc::now().naive_utc()),
    }
    .insert(&state.db)
    .await
    .map_err(ApiErr::internal)?;

    Ok((StatusCode::CREATED, Json(TelemetryResponse::from(model))))
}

pub async fn list_telemetry(
    AdminClaims(_): AdminClaims,
    State(state): State<AppState>,
    Query(params): Query<TelemetryQuery>,
) -> Result<Json<Vec<TelemetryResponse>>, ApiErr> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TELEMETRY_LIMIT)
        .clamp(1, MAX_TELEMETRY_LIMIT);

    let rows = telemetry::Entity::find()
        .order_by_desc(telemetry::Column::RecordedAt)
        .limit(limit)
        .all(&state.db)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(rows.into_iter().map(TelemetryResponse::from).collect()))
}

async fn telemetry_summary(db: &DatabaseConnection) -> Result<TelemetrySummary, DbErr> {
    let samples = telemetry::Entity::find().count(db).await?;

    let (avg_cpu_usage, avg_ram_usage) = telemetry::Entity::find()
        .select_only()
        .column_as(
            SimpleExpr::from(Func::avg(Expr::col(telemetry::Column::CpuUsage))),
            "avg_cpu",
        )
        .column_as(
            SimpleExpr::from(Func::avg(Expr::col(telemetry::Column::RamUsage))),
            "avg_ram",
        )
        .into_tuple::<(Option<f64>, Option<f64>)>()
        .one(db)
        .await?
        .unwrap_or((None, None));

    let latest = telemetry::Entity::find()
        .order_by_desc(telemetry::Column::RecordedAt)
        .one(db)
        .await?
        .map(TelemetryResponse::from);

    Ok(TelemetrySummary {
        samples,
        avg_cpu_usage,
        avg_ram_usage,
        latest,
    })
}

/// `CAST(SUM(col) AS BIGINT)`; Postgres would otherwise hand back NUMERIC.
fn sum_bigint<C: ColumnTrait>(col: C) -> SimpleExpr {
    Func::cast_as(Func::sum(Expr::col(col)), Alias::new("BIGINT")).into()
}
