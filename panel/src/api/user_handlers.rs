use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::{payment, user, whatsapp_number};

use super::{
    ApiErr, AppState,
    admin_handlers::{insert_agent, update_agent},
    dto::{
        CreateAgentRequest, NumberResponse, PaymentResponse, ToggleAiRequest, ToggleGroupsRequest,
        UpdateAgentRequest, UserResponse,
    },
    jwt::AuthClaims,
};

/// Load the caller's row; deactivated accounts keep valid tokens until expiry
/// but cannot use them.
pub(super) async fn current_user(db: &DatabaseConnection, id: Uuid) -> Result<user::Model, ApiErr> {
    let user = user::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::not_found("User not found"))?;

    if !user.is_active {
        return Err(ApiErr::forbidden("Account is deactivated"));
    }
    Ok(user)
}

/// A number owned by `owner`. Someone else's number reads as not found.
async fn owned_number(
    db: &DatabaseConnection,
    owner: Uuid,
    number_id: Uuid,
) -> Result<whatsapp_number::Model, ApiErr> {
    whatsapp_number::Entity::find_by_id(number_id)
        .filter(whatsapp_number::Column::UserId.eq(owner))
        .one(db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::not_found("Number not found"))
}

pub async fn me(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiErr> {
    let user = current_user(&state.db, claims.sub).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn get_numbers(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<Vec<NumberResponse>>, ApiErr> {
    current_user(&state.db, claims.sub).await?;

    let numbers = whatsapp_number::Entity::find()
        .filter(whatsapp_number::Column::UserId.eq(claims.sub))
        .order_by_asc(whatsapp_number::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(numbers.into_iter().map(NumberResponse::from).collect()))
}

pub async fn add_number(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Json(body): Json<CreateAgentRequest>,
) -> Result<(StatusCode, Json<NumberResponse>), ApiErr> {
    current_user(&state.db, claims.sub).await?;

    let created = insert_agent(&state.db, claims.sub, body).await?;
    tracing::info!(user_id = %claims.sub, number_id = %created.id, "number added");

    Ok((StatusCode::CREATED, Json(NumberResponse::from(created))))
}

pub async fn toggle_ai(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Json(body): Json<ToggleAiRequest>,
) -> Result<Json<NumberResponse>, ApiErr> {
    current_user(&state.db, claims.sub).await?;
    let number = owned_number(&state.db, claims.sub, body.number_id).await?;

    let ai_enabled = body.ai_enabled.unwrap_or(!number.ai_enabled);
    let mut active: whatsapp_number::ActiveModel = number.into();
    active.ai_enabled = Set(ai_enabled);
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await.map_err(ApiErr::internal)?;

    tracing::info!(user_id = %claims.sub, number_id = %updated.id, ai_enabled, "AI toggled");

    Ok(Json(NumberResponse::from(updated)))
}

pub async fn toggle_groups(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Json(body): Json<ToggleGroupsRequest>,
) -> Result<Json<NumberResponse>, ApiErr> {
    current_user(&state.db, claims.sub).await?;
    let number = owned_number(&state.db, claims.sub, body.number_id).await?;

    let respond_groups = body.respond_groups.unwrap_or(!number.respond_groups);
    let mut active: whatsapp_number::ActiveModel = number.into();
    active.respond_groups = Set(respond_groups);
    active.updated_at = Set(Utc::now().naive_utc());
    let updated = active.update(&state.db).await.map_err(ApiErr::internal)?;

    Ok(Json(NumberResponse::from(updated)))
}

pub async fn edit_number(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAgentRequest>,
) -> Result<Json<NumberResponse>, ApiErr> {
    current_user(&state.db, claims.sub).await?;
    let number = owned_number(&state.db, claims.sub, id).await?;

    let updated = update_agent(&state.db, number, body).await?;
    Ok(Json(NumberResponse::from(updated)))
}

pub async fn delete_number(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    current_user(&state.db, claims.sub).await?;
    let number = owned_number(&state.db, claims.sub, id).await?;

    let active: whatsapp_number::ActiveModel = number.into();
    active.delete(&state.db).await.map_err(ApiErr::internal)?;

    tracing::info!(user_id = %claims.sub, number_id = %id, "number deleted");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn payment_history(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentResponse>>, ApiErr> {
    current_user(&state.db, claims.sub).await?;

    let payments = payment::Entity::find()
        .filter(payment::Column::UserId.eq(claims.sub))
        .order_by_desc(payment::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(ApiErr::internal)?;

    Ok(Json(payments.into_iter().map(PaymentResponse::from).collect()))
}
