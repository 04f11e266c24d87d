use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{core::error::AppError, dtos::auth::Claims, state::AppState};

/// 创建议题限流中间件。挂在 `/api/issue/create` 上，在业务 Handler 之前执行。
///
/// # 工作原理
/// 1. `Claims` 提取器先完成鉴权，拿到已验证的用户 ID（缺失则 401）。
/// 2. 以用户 ID 为身份，按配置的策略（默认 24 小时 2 次）做一次准入判定。
/// 3. 超限返回 429 + Retry-After；计数器存储不可用时 fail-closed，返回 500。
///
/// 准入只是背压，不和后续写入构成事务：放行后即使创建失败，额度也不退还。
pub async fn issue_rate_limiter(
    State(state): State<AppState>,
    claims: Claims,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    state
        .limiter
        .admit(&claims.sub, &state.issue_rate_policy)
        .await?
        .into_result()?;

    Ok(next.run(req).await)
}
