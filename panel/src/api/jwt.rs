use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{StatusCode, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::user::{self, ROLE_ADMIN};

use super::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id (UUID, stored as string in JWT)
    pub sub: Uuid,
    pub username: String,
    /// `admin` or `user`
    pub role: String,
    /// Unix timestamp expiry
    pub exp: u64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn encode_jwt(claims: &Claims, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

fn extract_bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

pub(crate) type Rejection = (StatusCode, &'static str);

fn claims_from_parts(parts: &Parts, secret: &str) -> Result<Claims, Rejection> {
    let token = extract_bearer(parts).ok_or((
        StatusCode::UNAUTHORIZED,
        "Missing or invalid Authorization header",
    ))?;

    decode_jwt(token, secret).map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))
}

/// The role claim is only a hint; the row decides. Deleted, deactivated or
/// demoted admins are refused even while their token is still valid.
pub(crate) async fn require_active_admin(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<user::Model, Rejection> {
    let row = user::Entity::find_by_id(id)
        .one(db)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "admin lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "Account no longer exists"))?;

    if !row.is_active {
        return Err((StatusCode::FORBIDDEN, "Account is deactivated"));
    }
    if !row.is_admin() {
        return Err((StatusCode::FORBIDDEN, "Admin access required"));
    }
    Ok(row)
}

/// Extractor: validates Bearer token, requires an active admin account.
pub struct AdminClaims(pub Claims);

impl<S> FromRequestParts<S> for AdminClaims
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let claims = claims_from_parts(parts, &state.jwt_secret)?;

        if !claims.is_admin() {
            return Err((StatusCode::FORBIDDEN, "Admin access required"));
        }
        require_active_admin(&state.db, claims.sub).await?;

        Ok(AdminClaims(claims))
    }
}

/// Extractor: validates Bearer token (any authenticated user).
pub struct AuthClaims(pub Claims);

impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        claims_from_parts(parts, &state.jwt_secret).map(AuthClaims)
    }
}

/// `Option<AuthClaims>`: anonymous callers get `None`, but a token that is
/// present and invalid is still rejected.
impl<S> OptionalFromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        if !parts.headers.contains_key("Authorization") {
            return Ok(None);
        }
        let state = AppState::from_ref(state);
        claims_from_parts(parts, &state.jwt_secret).map(|c| Some(AuthClaims(c)))
    }
}
