pub mod ids;
pub mod limiter;

/// 限流宏：在 handler 里一行完成准入判定，超限直接返回 429。
/// 用法: rate_limit!(&state.limiter, "action_name", &principal, max_count, window_seconds);
/// 参数依次为：限流器、操作命名空间、调用方标识、窗口内最大次数、窗口长度（秒）。
#[macro_export]
macro_rules! rate_limit {
    ($limiter:expr, $action:expr, $key:expr, $limit:expr, $window:expr) => {
        let policy = $crate::utils::limiter::RateLimitPolicy::new(
            $action,
            $limit,
            std::time::Duration::from_secs($window),
        );
        $limiter.admit($key, &policy).await?.into_result()?;
    };
}
