use std::time::Duration;

use config::{Config as ConfigLoader, Environment};
use dotenvy::dotenv;
use secrecy::SecretString;
use serde::Deserialize;

use crate::utils::limiter::RateLimitPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Postgres 连接串（敏感信息）
    #[serde(alias = "DATABASE_URL")]
    pub database_url: SecretString,

    /// Redis 连接串（敏感信息）
    #[serde(alias = "REDIS_URL")]
    pub redis_url: SecretString,

    /// JWT 签名密钥（敏感信息）
    #[serde(alias = "JWT_SECRET")]
    pub jwt_secret: SecretString,

    #[serde(default = "default_port", alias = "SERVER_PORT")]
    pub server_port: u16,

    #[serde(default = "default_host", alias = "SERVER_HOST")]
    pub server_host: String,

    #[serde(default = "default_log", alias = "RUST_LOG")]
    pub rust_log: String,

    /// 访问令牌有效期（秒）
    #[serde(default = "default_jwt_exp", alias = "JWT_EXPIRATION")]
    pub jwt_expiration: i64,

    /// 前端地址。未配置时 CORS 全放行。
    #[serde(default, alias = "CLIENT_URL")]
    pub client_url: Option<String>,

    /// 创建议题限流的 Redis 命名空间
    #[serde(default = "default_issue_rate_namespace", alias = "ISSUE_RATE_NAMESPACE")]
    pub issue_rate_namespace: String,

    /// 每个窗口内允许创建的议题数
    #[serde(default = "default_issue_rate_limit", alias = "ISSUE_RATE_LIMIT")]
    pub issue_rate_limit: u64,

    /// 创建议题限流窗口（秒）
    #[serde(default = "default_issue_rate_window", alias = "ISSUE_RATE_WINDOW_SECS")]
    pub issue_rate_window_secs: u64,

    /// 单次存储往返（Redis / Postgres）的超时时间（毫秒）
    #[serde(default = "default_store_timeout", alias = "STORE_TIMEOUT_MS")]
    pub store_timeout_ms: u64,
}

impl Config {
    /// 加载配置：
    /// - 支持 `.env`
    /// - 优先从环境变量加载
    pub fn new() -> Self {
        dotenv().ok();

        // 注意：Environment::default() 会把 `FOO__BAR=baz` 映射到 `foo.bar=baz`
        // 并且 try_parsing(true) 会把 "3000" 解析成数字等类型。
        let builder = ConfigLoader::builder().add_source(Environment::default().try_parsing(true));

        match builder.build() {
            Ok(config) => config
                .try_deserialize()
                .expect("❌ Failed to deserialize configuration"),
            Err(e) => panic!("❌ Failed to build configuration: {e}"),
        }
    }

    /// 创建议题接口的限流策略。
    pub fn issue_rate_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::new(
            self.issue_rate_namespace.clone(),
            self.issue_rate_limit,
            Duration::from_secs(self.issue_rate_window_secs),
        )
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

// --- 默认值函数 ---
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_log() -> String {
    "info".to_string()
}
fn default_jwt_exp() -> i64 {
    3600 * 72
} // 72 hours
fn default_issue_rate_namespace() -> String {
    "issue_limit".to_string()
}
fn default_issue_rate_limit() -> u64 {
    2
}
fn default_issue_rate_window() -> u64 {
    86400
} // 24 hours
fn default_store_timeout() -> u64 {
    10_000
}
