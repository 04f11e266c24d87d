//! 测试用的内存存储。
//!
//! 与真实存储语义保持一致：INCR 原子且带 TTL，插入投票是原子的 insert-if-absent。
//! 另外提供故障注入开关，用来覆盖超时、存储不可用和并发竞态。

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::Barrier, time::Instant};
use uuid::Uuid;

use super::{CounterStore, KeyTtl, StoreError, VoteStore};
use crate::entity::votes;

#[derive(Debug, Clone, Copy)]
struct Counter {
    value: i64,
    expires_at: Option<Instant>,
}

/// 内存计数器。过期判断基于 tokio 时钟，配合 `start_paused` 可以快进时间。
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, Counter>>,
    /// 所有操作都返回 Unavailable
    pub down: AtomicBool,
    /// 所有操作都挂起，直到调用方超时
    pub stall: AtomicBool,
    /// 只有 TTL 查询失败
    pub ttl_down: AtomicBool,
    /// EXPIRE 静默丢失（模拟首次设置 TTL 与并发请求之间的空窗）
    pub drop_expire: AtomicBool,
    /// EXPIRE 返回 Unavailable，INCR 照常成功
    pub expire_down: AtomicBool,
}

impl MemoryCounterStore {
    async fn gate(&self) -> Result<(), StoreError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    fn live(counters: &mut HashMap<String, Counter>, key: &str) -> Option<Counter> {
        let now = Instant::now();
        match counters.get(key) {
            Some(c) if c.expires_at.is_some_and(|at| at <= now) => {
                counters.remove(key);
                None
            }
            other => other.copied(),
        }
    }

    pub fn value(&self, key: &str) -> Option<i64> {
        let mut counters = self.counters.lock().unwrap();
        Self::live(&mut counters, key).map(|c| c.value)
    }

    /// 直接写入计数值（不带 TTL），用来构造异常数据。
    pub fn set_value(&self, key: &str, value: i64) {
        self.counters.lock().unwrap().insert(
            key.to_string(),
            Counter {
                value,
                expires_at: None,
            },
        );
    }

    /// EXPIRE 类操作共用的故障开关。返回 false 表示这次写入被静默丢弃。
    fn expire_gate(&self) -> Result<bool, StoreError> {
        if self.expire_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("expire failed".into()));
        }
        Ok(!self.drop_expire.load(Ordering::SeqCst))
    }

    pub fn has_expiry(&self, key: &str) -> bool {
        let mut counters = self.counters.lock().unwrap();
        Self::live(&mut counters, key).is_some_and(|c| c.expires_at.is_some())
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        self.gate().await?;
        let mut counters = self.counters.lock().unwrap();
        let current = Self::live(&mut counters, key);
        let next = Counter {
            value: current.map_or(0, |c| c.value) + 1,
            expires_at: current.and_then(|c| c.expires_at),
        };
        counters.insert(key.to_string(), next);
        Ok(next.value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.gate().await?;
        if !self.expire_gate()? {
            return Ok(());
        }
        let mut counters = self.counters.lock().unwrap();
        if Self::live(&mut counters, key).is_some() {
            if let Some(c) = counters.get_mut(key) {
                c.expires_at = Some(Instant::now() + ttl);
            }
        }
        Ok(())
    }

    async fn expire_if_absent(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        self.gate().await?;
        if !self.expire_gate()? {
            return Ok(());
        }
        let mut counters = self.counters.lock().unwrap();
        if Self::live(&mut counters, key).is_some() {
            if let Some(c) = counters.get_mut(key).filter(|c| c.expires_at.is_none()) {
                c.expires_at = Some(Instant::now() + ttl);
            }
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        self.gate().await?;
        if self.ttl_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("ttl lookup failed".into()));
        }
        let mut counters = self.counters.lock().unwrap();
        Ok(match Self::live(&mut counters, key) {
            None => KeyTtl::Missing,
            Some(Counter { expires_at: None, .. }) => KeyTtl::Persistent,
            Some(Counter { expires_at: Some(at), .. }) => {
                KeyTtl::Expiring(at.saturating_duration_since(Instant::now()))
            }
        })
    }
}

/// 内存投票存储。`votes` 的互斥锁即“唯一索引”：检查与插入在同一临界区内完成。
#[derive(Default)]
pub struct MemoryVoteStore {
    issues: Mutex<HashSet<Uuid>>,
    votes: Mutex<Vec<votes::Model>>,
    /// 所有操作都返回 Unavailable
    pub down: AtomicBool,
    /// 所有操作都挂起，直到调用方超时
    pub stall: AtomicBool,
    /// 只有 count_votes 返回 Unavailable
    pub count_down: AtomicBool,
    /// 设置后，find_vote 读完结果会在屏障处等待，用来让并发请求都读到“未投票”
    find_barrier: Option<Barrier>,
}

impl MemoryVoteStore {
    /// 构造一个会让 `parties` 个并发 find_vote 互相等待的存储。
    pub fn with_find_barrier(parties: usize) -> Self {
        Self {
            find_barrier: Some(Barrier::new(parties)),
            ..Default::default()
        }
    }

    pub fn add_issue(&self, issue_id: Uuid) {
        self.issues.lock().unwrap().insert(issue_id);
    }

    /// 只删除议题本身，不动投票（模拟级联之前的状态）。
    pub fn remove_issue(&self, issue_id: Uuid) {
        self.issues.lock().unwrap().remove(&issue_id);
    }

    pub fn rows_for(&self, issue_id: Uuid, user_id: Uuid) -> usize {
        self.votes
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.issue_id == issue_id && v.user_id == user_id)
            .count()
    }

    async fn gate(&self) -> Result<(), StoreError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl VoteStore for MemoryVoteStore {
    async fn issue_exists(&self, issue_id: Uuid) -> Result<bool, StoreError> {
        self.gate().await?;
        Ok(self.issues.lock().unwrap().contains(&issue_id))
    }

    async fn find_vote(&self, issue_id: Uuid, user_id: Uuid) -> Result<Option<votes::Model>, StoreError> {
        self.gate().await?;
        let found = self
            .votes
            .lock()
            .unwrap()
            .iter()
            .find(|v| v.issue_id == issue_id && v.user_id == user_id)
            .cloned();
        if let Some(barrier) = &self.find_barrier {
            barrier.wait().await;
        }
        Ok(found)
    }

    async fn insert_vote(&self, vote: votes::Model) -> Result<(), StoreError> {
        self.gate().await?;
        let mut votes = self.votes.lock().unwrap();
        if votes
            .iter()
            .any(|v| v.issue_id == vote.issue_id && v.user_id == vote.user_id)
        {
            return Err(StoreError::Conflict("uq_votes_issue_user".into()));
        }
        votes.push(vote);
        Ok(())
    }

    async fn delete_vote(&self, issue_id: Uuid, user_id: Uuid) -> Result<u64, StoreError> {
        self.gate().await?;
        let mut votes = self.votes.lock().unwrap();
        let before = votes.len();
        votes.retain(|v| !(v.issue_id == issue_id && v.user_id == user_id));
        Ok((before - votes.len()) as u64)
    }

    async fn count_votes(&self, issue_id: Uuid) -> Result<u64, StoreError> {
        self.gate().await?;
        if self.count_down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("count failed".into()));
        }
        let votes = self.votes.lock().unwrap();
        Ok(votes.iter().filter(|v| v.issue_id == issue_id).count() as u64)
    }

    async fn delete_votes_for_issue(&self, issue_id: Uuid) -> Result<u64, StoreError> {
        self.gate().await?;
        let mut votes = self.votes.lock().unwrap();
        let before = votes.len();
        votes.retain(|v| v.issue_id != issue_id);
        Ok((before - votes.len()) as u64)
    }
}
