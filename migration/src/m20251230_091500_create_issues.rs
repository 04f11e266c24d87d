use sea_orm_migration::prelude::*;

use crate::m20251229_063323_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Issues::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Issues::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Issues::Description).string_len(1000).not_null())
                    // category / status 以字符串保存，取值由应用层枚举约束
                    .col(ColumnDef::new(Issues::Category).string().not_null())
                    .col(ColumnDef::new(Issues::Location).string_len(200).not_null())
                    .col(ColumnDef::new(Issues::ImageUrl).string())
                    .col(ColumnDef::new(Issues::Status).string().not_null().default("Pending"))
                    .col(ColumnDef::new(Issues::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Issues::Latitude).double())
                    .col(ColumnDef::new(Issues::Longitude).double())
                    .col(
                        ColumnDef::new(Issues::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Issues::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_issues_created_by")
                            .from(Issues::Table, Issues::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // 列表页按创建时间排序
        manager
            .create_index(
                Index::create()
                    .name("idx_issues_created_at")
                    .table(Issues::Table)
                    .col(Issues::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(
                "CREATE TRIGGER issues_set_updated_at
                 BEFORE UPDATE ON issues
                 FOR EACH ROW
                 EXECUTE PROCEDURE set_updated_at();",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared("DROP TRIGGER IF EXISTS issues_set_updated_at ON issues;").await?;

        manager
            .drop_table(Table::drop().table(Issues::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Issues {
    Table,
    Id,
    Title,
    Description,
    Category,
    Location,
    ImageUrl,
    Status,
    CreatedBy,
    Latitude,
    Longitude,
    CreatedAt,
    UpdatedAt,
}
