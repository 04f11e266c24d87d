// ==========================================
// Redis Key 前缀定义
// ==========================================

/// 限流计数器前缀：完整键名为 `rate_limit:{namespace}:{principal}`。
pub const REDIS_PREFIX_RATE_LIMIT: &str = "rate_limit:";

// ==========================================
// 业务逻辑常量
// ==========================================

/// 登录限流：每个邮箱每分钟最多尝试 5 次。
pub const LOGIN_RATE_LIMIT: u64 = 5;
pub const LOGIN_RATE_WINDOW_SECS: u64 = 60;

/// 注册限流：每个邮箱每分钟最多 5 次。
pub const REGISTER_RATE_LIMIT: u64 = 5;
pub const REGISTER_RATE_WINDOW_SECS: u64 = 60;

/// 列表分页默认值与上限
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;
/// 页码上限：保证 OFFSET = (page - 1) * limit 不超出 Postgres BIGINT
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PAGE_SIZE;

/// 地图上展示的最近议题数量
pub const RECENT_ISSUES_LIMIT: u64 = 19;
