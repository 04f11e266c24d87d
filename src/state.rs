use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    core::config::Config,
    services::vote::VoteToggle,
    utils::limiter::{RateLimitPolicy, RateLimiter},
};

/// 所有 Handler 共享的应用状态。
///
/// 计数器与投票存储以 trait 对象注入到 `limiter` / `votes` 中，
/// Handler 不直接接触 Redis 连接。
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub limiter: RateLimiter,
    pub votes: VoteToggle,
    /// 创建议题接口的限流策略（启动时由配置生成）
    pub issue_rate_policy: RateLimitPolicy,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        limiter: RateLimiter,
        votes: VoteToggle,
        config: Config,
    ) -> Self {
        Self {
            db,
            limiter,
            votes,
            issue_rate_policy: config.issue_rate_policy(),
            config: Arc::new(config),
        }
    }
}
