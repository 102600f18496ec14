use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Payment::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Payment::Id).uuid().not_null().primary_key())
                    // Nullable: guest checkouts have no owner.
                    .col(ColumnDef::new(Payment::UserId).uuid().null())
                    .col(ColumnDef::new(Payment::OrderId).string().not_null())
                    .col(ColumnDef::new(Payment::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Payment::Currency).string().not_null())
                    .col(
                        ColumnDef::new(Payment::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Payment::ExternalReference)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Payment::RedirectUrl).string().null())
                    .col(
                        ColumnDef::new(Payment::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Payment::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_payment_user")
                            .from(Payment::Table, Payment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Payment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Payment {
    Table,
    Id,
    UserId,
    OrderId,
    Amount,
    Currency,
    Status,
    ExternalReference,
    RedirectUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
