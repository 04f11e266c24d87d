use sea_orm_migration::prelude::*;

use crate::m20251229_063323_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // votes.issue_id 不加外键：议题删除后的投票清理由应用层尽力完成，
        // 残留的孤儿投票只会被计数查询忽略。
        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Votes::Id)
                            .uuid()
                            .not_null()
                            .primary_key()
                            .default(Expr::cust("gen_random_uuid()")),
                    )
                    .col(ColumnDef::new(Votes::IssueId).uuid().not_null())
                    .col(ColumnDef::new(Votes::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(Votes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_user_id")
                            .from(Votes::Table, Votes::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // (issue_id, user_id) 唯一索引：同一用户对同一议题最多一票。
        // 并发投票时第二次插入会在这里失败，应用层把它解释为“已投票”。
        manager
            .create_index(
                Index::create()
                    .name("uq_votes_issue_user")
                    .table(Votes::Table)
                    .col(Votes::IssueId)
                    .col(Votes::UserId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Votes {
    Table,
    Id,
    IssueId,
    UserId,
    CreatedAt,
}
