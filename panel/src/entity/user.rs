use sea_orm::entity::prelude::*;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub username: String,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    /// `admin` or `user`
    pub role: String,
    pub is_active: bool,
    pub ai_tokens_used: i64,
    pub ai_token_limit: i64,
    pub subscription_expires_at: Option<DateTime>,
    pub last_login_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::whatsapp_number::Entity")]
    WhatsappNumber,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<super::whatsapp_number::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WhatsappNumber.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
