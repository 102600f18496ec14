use sea_orm::entity::prelude::*;
use uuid::Uuid;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_PAID: &str = "paid";
pub const STATUS_FAILED: &str = "failed";

pub const DEFAULT_CURRENCY: &str = "SAR";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// None for guest checkouts.
    pub user_id: Option<Uuid>,
    pub order_id: String,
    /// Minor currency units (e.g. halalas, cents).
    pub amount: i64,
    pub currency: String,
    /// `pending`, `paid` or `failed`
    pub status: String,
    /// Payment id assigned by the gateway.
    #[sea_orm(unique)]
    pub external_reference: Option<String>,
    pub redirect_url: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Model {
    pub fn is_paid(&self) -> bool {
        self.status == STATUS_PAID
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
