use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use sea_orm::EntityTrait;

use crate::auth::AuthError;
use crate::entity::user;

use super::{
    ApiErr, AppState,
    dto::{LoginRequest, LoginResponse, UserResponse},
    jwt::{AuthClaims, Claims, encode_jwt},
};

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiErr> {
    let user = state
        .auth
        .authenticate(&body.username, &body.password)
        .await
        .map_err(|e| match e {
            AuthError::Db(_) | AuthError::Hash(_) => ApiErr::internal(e),
            _ => {
                tracing::info!(login = %body.username, reason = %e, "login rejected");
                ApiErr::new(StatusCode::UNAUTHORIZED, "Invalid credentials")
            }
        })?;

    let exp = (Utc::now().timestamp().max(0) as u64)
        .saturating_add(state.jwt_expiry_hours.saturating_mul(3600));
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role.clone(),
        exp,
    };

    let token = encode_jwt(&claims, &state.jwt_secret).map_err(ApiErr::internal)?;

    Ok(Json(LoginResponse {
        token,
        user: UserResponse::from(user),
    }))
}

pub async fn me(
    AuthClaims(claims): AuthClaims,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiErr> {
    let user = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await
        .map_err(ApiErr::internal)?
        .ok_or_else(|| ApiErr::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}
