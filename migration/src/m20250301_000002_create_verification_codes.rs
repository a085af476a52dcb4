use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum VerificationCodes {
    Table,
    Id,
    Code,
    Phone,
    Status,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// One row per issued OTP. Rows are never deleted; `status` moves from
/// ACTIVE to INACTIVE exactly once.
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VerificationCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VerificationCodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VerificationCodes::Code)
                            .string_len(6)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationCodes::Phone)
                            .string_len(15)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VerificationCodes::Status)
                            .string_len(15)
                            .not_null()
                            .default("ACTIVE")
                            .check(
                                Expr::col(VerificationCodes::Status)
                                    .is_in(["ACTIVE", "INACTIVE"]),
                            ),
                    )
                    .col(
                        ColumnDef::new(VerificationCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // verify() looks rows up by (code, phone)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_verification_codes_phone_code")
                    .table(VerificationCodes::Table)
                    .col(VerificationCodes::Phone)
                    .col(VerificationCodes::Code)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(VerificationCodes::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}
