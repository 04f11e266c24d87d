use std::{sync::Arc, time::Duration};

use crate::{
    core::{constants::REDIS_PREFIX_RATE_LIMIT, error::AppError},
    stores::{with_deadline, CounterStore, KeyTtl, StoreError},
};

/// TTL 已经过期、但请求仍被判定超限时给出的最小重试等待时间。
const MIN_RETRY_AFTER: Duration = Duration::from_secs(1);

/// 一条受保护路由的限流策略：命名空间 + 窗口内最大次数 + 窗口长度。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub namespace: String,
    pub limit: u64,
    pub window: Duration,
}

impl RateLimitPolicy {
    pub fn new(namespace: impl Into<String>, limit: u64, window: Duration) -> Self {
        Self {
            namespace: namespace.into(),
            limit,
            window,
        }
    }

    /// Redis 键：`rate_limit:{namespace}:{principal}`
    pub fn key_for(&self, principal: &str) -> String {
        format!("{}{}:{}", REDIS_PREFIX_RATE_LIMIT, self.namespace, principal)
    }
}

/// 一次准入判定的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// 拒绝时的重试等待时间；放行时为 0
    pub retry_after: Duration,
    /// 本次自增后的计数值
    pub count: u64,
}

impl Admission {
    fn allowed(count: u64) -> Self {
        Self {
            allowed: true,
            retry_after: Duration::ZERO,
            count,
        }
    }

    fn denied(count: u64, retry_after: Duration) -> Self {
        Self {
            allowed: false,
            retry_after,
            count,
        }
    }

    /// 向上取整到秒，且至少为 1 秒：客户端永远不会拿到“立即重试”。
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs() + u64::from(self.retry_after.subsec_nanos() > 0);
        secs.max(1)
    }

    /// 把判定结果转换成 handler 可以直接 `?` 的形式。
    pub fn into_result(self) -> Result<(), AppError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::RateLimitExceeded {
                retry_after_secs: self.retry_after_secs(),
            })
        }
    }
}

/// 分布式固定窗口限流器。
///
/// 计数器放在共享存储里（生产环境为 Redis），所有实例看到同一份计数。
/// 正确性只依赖存储的原子自增：自增与读取新值是同一步，绝不先读后写。
///
/// 固定窗口在边界处允许突发：窗口重置的瞬间前后各有 `limit` 次额度。
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    /// 单次存储往返的截止时间
    deadline: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// 对 `principal` 在 `policy` 下做一次准入判定。
    ///
    /// - 无论放行还是拒绝，计数都会 +1：被拒后反复试探不会换来额外的次数。
    /// - 窗口内第一次请求（自增结果为 1）负责设置过期时间，之后的请求只在键缺少 TTL 时补设。
    /// - 超限时用键的剩余 TTL 作为 retry_after。
    ///
    /// # 错误
    /// - `AuthError`：principal 为空，不访问存储。
    /// - `RateLimiterUnavailable`：计数器存储不可达、超时或计数值异常。fail-closed，请求被拒绝。
    pub async fn admit(&self, principal: &str, policy: &RateLimitPolicy) -> Result<Admission, AppError> {
        if principal.is_empty() {
            return Err(AppError::AuthError("User not authenticated".to_string()));
        }
        if policy.window.is_zero() {
            return Err(AppError::InternalServerError(format!(
                "Rate limit window for '{}' must be positive",
                policy.namespace
            )));
        }

        let key = policy.key_for(principal);

        let count = with_deadline(self.deadline, self.store.incr(&key))
            .await
            .map_err(|e| unavailable(&key, "incr", e))?;

        if count == 1 {
            // 只有把计数从 0 变成 1 的那个请求会走到这里
            with_deadline(self.deadline, self.store.expire(&key, policy.window))
                .await
                .map_err(|e| unavailable(&key, "expire", e))?;
        } else {
            // 首次 EXPIRE 丢失或失败时，后续请求负责补上 TTL；已有 TTL 时是空操作
            if let Err(e) = with_deadline(self.deadline, self.store.expire_if_absent(&key, policy.window)).await {
                tracing::warn!("⚠️ Failed to refresh TTL for {}: {}", key, e);
            }
        }

        let count = u64::try_from(count).map_err(|_| {
            AppError::RateLimiterUnavailable(format!("counter {key} holds negative value {count}"))
        })?;
        if count <= policy.limit {
            return Ok(Admission::allowed(count));
        }

        let retry_after = self.retry_after(&key, policy.window).await;
        tracing::warn!(
            "⛔ Rate limit exceeded: {} on {} ({}/{}), retry after {:?}",
            principal,
            policy.namespace,
            count,
            policy.limit,
            retry_after
        );

        Ok(Admission::denied(count, retry_after))
    }

    /// 查询剩余 TTL。查询失败不影响拒绝结论，只退回一个保守的非零值（整个窗口）。
    async fn retry_after(&self, key: &str, window: Duration) -> Duration {
        match with_deadline(self.deadline, self.store.ttl(key)).await {
            Ok(KeyTtl::Expiring(ttl)) if !ttl.is_zero() => ttl,
            Ok(KeyTtl::Expiring(_)) | Ok(KeyTtl::Missing) => MIN_RETRY_AFTER,
            Ok(KeyTtl::Persistent) => {
                // 首次 EXPIRE 丢失会留下一个永不过期的计数器，在拒绝路径上补设
                tracing::warn!("⚠️ Rate limit key {} has no TTL, re-applying window", key);
                if let Err(e) = with_deadline(self.deadline, self.store.expire(key, window)).await {
                    tracing::warn!("⚠️ Failed to repair TTL for {}: {}", key, e);
                }
                window
            }
            Err(e) => {
                tracing::warn!("⚠️ TTL lookup failed for {}: {}", key, e);
                window
            }
        }
    }
}

fn unavailable(key: &str, op: &str, err: StoreError) -> AppError {
    AppError::RateLimiterUnavailable(format!("{op} {key}: {err}"))
}
