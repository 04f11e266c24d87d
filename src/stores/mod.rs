//! 核心机制（限流器、投票切换）依赖的外部存储抽象。
//!
//! 核心代码只通过这里的 trait 访问共享存储，具体实现（Redis / Postgres）在启动时注入。
//! 进程内不做任何加锁或缓存：互斥完全交给存储自身的原子原语
//! （Redis INCR、Postgres 唯一索引），因此多实例部署下依然正确。

use std::{future::Future, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::votes;

pub mod postgres;
pub mod redis;

#[cfg(test)]
pub mod memory;

/// 存储层错误。每一次往返都可能失败。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// 往返超过截止时间，按存储故障处理
    #[error("store round-trip timed out after {0:?}")]
    Timeout(Duration),

    /// 连接失败、协议错误等
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// 写入违反唯一约束。对投票插入来说这是预期中的竞态结果，不是故障。
    #[error("unique constraint violated: {0}")]
    Conflict(String),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err.sql_err() {
            Some(sea_orm::SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
            _ => StoreError::Unavailable(err.to_string()),
        }
    }
}

impl From<::redis::RedisError> for StoreError {
    fn from(err: ::redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// 给一次存储往返加上截止时间，超时即视为 [`StoreError::Timeout`]。
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

/// 计数器键的剩余存活时间。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// 键存在且会在给定时间后过期
    Expiring(Duration),
    /// 键存在但没有过期时间（首次 EXPIRE 丢失）
    Persistent,
    /// 键不存在（已经过期）
    Missing,
}

impl KeyTtl {
    /// 解析 Redis `PTTL` 的返回值：-2 表示键不存在，-1 表示没有过期时间。
    pub fn from_pttl(millis: i64) -> Self {
        match millis {
            -2 => KeyTtl::Missing,
            ms if ms < 0 => KeyTtl::Persistent,
            ms => KeyTtl::Expiring(Duration::from_millis(ms as u64)),
        }
    }
}

/// 共享计数器存储（生产环境为 Redis）。
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 原子自增并返回自增后的值。键不存在时从 0 开始。
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// 设置键的过期时间。
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// 仅当键存在且没有过期时间时设置 TTL（Redis `PEXPIRE ... NX`），已有 TTL 时不做任何修改。
    async fn expire_if_absent(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// 查询键的剩余存活时间。
    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError>;
}

/// 投票文档存储（生产环境为 Postgres）。
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn issue_exists(&self, issue_id: Uuid) -> Result<bool, StoreError>;

    async fn find_vote(&self, issue_id: Uuid, user_id: Uuid) -> Result<Option<votes::Model>, StoreError>;

    /// 插入一条投票。(issue_id, user_id) 已存在时必须返回 [`StoreError::Conflict`]。
    async fn insert_vote(&self, vote: votes::Model) -> Result<(), StoreError>;

    /// 删除一条投票，返回受影响的行数。删除 0 行是合法的空操作。
    async fn delete_vote(&self, issue_id: Uuid, user_id: Uuid) -> Result<u64, StoreError>;

    async fn count_votes(&self, issue_id: Uuid) -> Result<u64, StoreError>;

    /// 删除某议题下的全部投票（议题删除时的级联清理）。
    async fn delete_votes_for_issue(&self, issue_id: Uuid) -> Result<u64, StoreError>;
}
