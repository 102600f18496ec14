use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Telemetry::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Telemetry::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Telemetry::CpuUsage).double().not_null())
                    .col(ColumnDef::new(Telemetry::RamUsage).double().not_null())
                    .col(
                        ColumnDef::new(Telemetry::NetworkRxBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Telemetry::NetworkTxBytes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Telemetry::Country).string().null())
                    .col(ColumnDef::new(Telemetry::City).string().null())
                    .col(ColumnDef::new(Telemetry::Latitude).double().null())
                    .col(ColumnDef::new(Telemetry::Longitude).double().null())
                    .col(
                        ColumnDef::new(Telemetry::RecordedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_telemetry_recorded_at")
                    .table(Telemetry::Table)
                    .col(Telemetry::RecordedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Telemetry::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Telemetry {
    Table,
    Id,
    CpuUsage,
    RamUsage,
    NetworkRxBytes,
    NetworkTxBytes,
    Country,
    City,
    Latitude,
    Longitude,
    RecordedAt,
}
