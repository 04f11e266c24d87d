use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands};

use super::{CounterStore, KeyTtl, StoreError};

/// 基于 Redis 的计数器存储。
///
/// `ConnectionManager` 自带断线重连，clone 很廉价，每次调用各自 clone 一份连接句柄。
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.incr(key, 1i64).await?;
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(window_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn expire_if_absent(&self, key: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        // NX 需要 Redis 7.0+
        let _: i64 = redis::cmd("PEXPIRE")
            .arg(key)
            .arg(window_millis(ttl))
            .arg("NX")
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl, StoreError> {
        let mut conn = self.manager.clone();
        let millis: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(KeyTtl::from_pttl(millis))
    }
}

/// 毫秒精度，窗口小于 1 秒时也不会被截断成 0。
fn window_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
