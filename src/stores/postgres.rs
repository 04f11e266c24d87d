use async_trait::async_trait;
use sea_orm::*;
use uuid::Uuid;

use super::{StoreError, VoteStore};
use crate::entity::{issues, votes};

/// 基于 SeaORM / Postgres 的投票存储。唯一性由 `uq_votes_issue_user` 索引保证。
#[derive(Clone)]
pub struct SeaOrmVoteStore {
    db: DatabaseConnection,
}

impl SeaOrmVoteStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn pair(issue_id: Uuid, user_id: Uuid) -> Condition {
        Condition::all()
            .add(votes::Column::IssueId.eq(issue_id))
            .add(votes::Column::UserId.eq(user_id))
    }
}

#[async_trait]
impl VoteStore for SeaOrmVoteStore {
    async fn issue_exists(&self, issue_id: Uuid) -> Result<bool, StoreError> {
        let found = issues::Entity::find_by_id(issue_id)
            .count(&self.db)
            .await?;
        Ok(found > 0)
    }

    async fn find_vote(&self, issue_id: Uuid, user_id: Uuid) -> Result<Option<votes::Model>, StoreError> {
        let vote = votes::Entity::find()
            .filter(Self::pair(issue_id, user_id))
            .one(&self.db)
            .await?;
        Ok(vote)
    }

    async fn insert_vote(&self, vote: votes::Model) -> Result<(), StoreError> {
        let active = votes::ActiveModel {
            id: Set(vote.id),
            issue_id: Set(vote.issue_id),
            user_id: Set(vote.user_id),
            created_at: Set(vote.created_at),
        };

        // 唯一索引冲突会经由 From<DbErr> 变成 StoreError::Conflict
        votes::Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn delete_vote(&self, issue_id: Uuid, user_id: Uuid) -> Result<u64, StoreError> {
        let result = votes::Entity::delete_many()
            .filter(Self::pair(issue_id, user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn count_votes(&self, issue_id: Uuid) -> Result<u64, StoreError> {
        let count = votes::Entity::find()
            .filter(votes::Column::IssueId.eq(issue_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn delete_votes_for_issue(&self, issue_id: Uuid) -> Result<u64, StoreError> {
        let result = votes::Entity::delete_many()
            .filter(votes::Column::IssueId.eq(issue_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
