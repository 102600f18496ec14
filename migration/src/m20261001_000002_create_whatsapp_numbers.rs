use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WhatsappNumber::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WhatsappNumber::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WhatsappNumber::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(WhatsappNumber::PhoneNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(WhatsappNumber::DisplayName).string().null())
                    .col(
                        ColumnDef::new(WhatsappNumber::AiEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(WhatsappNumber::Prompt).text().null())
                    .col(
                        ColumnDef::new(WhatsappNumber::Model)
                            .string()
                            .not_null()
                            .default("gpt-4o-mini"),
                    )
                    .col(
                        ColumnDef::new(WhatsappNumber::RespondGroups)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(WhatsappNumber::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WhatsappNumber::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_whatsapp_number_user")
                            .from(WhatsappNumber::Table, WhatsappNumber::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_whatsapp_number_user")
                    .table(WhatsappNumber::Table)
                    .col(WhatsappNumber::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WhatsappNumber::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WhatsappNumber {
    Table,
    Id,
    UserId,
    PhoneNumber,
    DisplayName,
    AiEnabled,
    Prompt,
    Model,
    RespondGroups,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
