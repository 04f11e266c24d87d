use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 一条投票：某个用户对某个议题的支持。
///
/// (issue_id, user_id) 上有唯一索引，见 migration `uq_votes_issue_user`。
/// 票数永远由 COUNT 查询得出，议题表上没有冗余计数字段。
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub issue_id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
