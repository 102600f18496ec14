use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::Utc;
use password_hash::SaltString;
use rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entity::user;

#[derive(Debug)]
pub enum AuthError {
    NotFound,
    InvalidPassword,
    Inactive,
    Db(sea_orm::DbErr),
    Hash(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::NotFound => write!(f, "User not found"),
            AuthError::InvalidPassword => write!(f, "Invalid password"),
            AuthError::Inactive => write!(f, "User is inactive"),
            AuthError::Db(e) => write!(f, "Database error: {e}"),
            AuthError::Hash(e) => write!(f, "Hash error: {e}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<sea_orm::DbErr> for AuthError {
    fn from(e: sea_orm::DbErr) -> Self {
        AuthError::Db(e)
    }
}

/// Fields for a new panel account.
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub role: &'a str,
    pub ai_token_limit: i64,
}

pub struct Auth {
    db: DatabaseConnection,
}

impl Auth {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Verify username (or email) and password. Stamps `last_login_at` and
    /// returns the refreshed row.
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<user::Model, AuthError> {
        let user = user::Entity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(login))
                    .add(user::Column::Email.eq(login)),
            )
            .one(&self.db)
            .await?
            .ok_or(AuthError::NotFound)?;

        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        let hash =
            PasswordHash::new(&user.password_hash).map_err(|e| AuthError::Hash(e.to_string()))?;

        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .map_err(|_| AuthError::InvalidPassword)?;

        let mut active: user::ActiveModel = user.into();
        active.last_login_at = Set(Some(Utc::now().naive_utc()));
        let updated = active.update(&self.db).await?;

        Ok(updated)
    }

    /// Create a new account with an Argon2-hashed password.
    pub async fn create_user(&self, new: NewUser<'_>) -> Result<user::Model, AuthError> {
        let password_hash = Self::hash_password(new.password)?;
        let now = Utc::now().naive_utc();
        let model = user::ActiveModel {
            id: Set(Uuid::now_v7()),
            username: Set(new.username.to_owned()),
            email: Set(new.email.to_owned()),
            password_hash: Set(password_hash),
            role: Set(new.role.to_owned()),
            is_active: Set(true),
            ai_tokens_used: Set(0),
            ai_token_limit: Set(new.ai_token_limit),
            subscription_expires_at: Set(None),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(model)
    }

    pub async fn count_users(&self) -> Result<u64, AuthError> {
        Ok(user::Entity::find().count(&self.db).await?)
    }

    /// Hash a plaintext password with Argon2id + a random salt.
    pub fn hash_password(password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AuthError::Hash(e.to_string()))?
            .to_string();
        Ok(hash)
    }
}
