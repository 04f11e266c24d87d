// src/core/error.rs
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::dtos::response::ApiResponse;

/// 应用程序统一错误类型。覆盖数据库、限流、投票存储、验证、认证、授权等各个层面的错误。
///
/// 通过实现 `IntoResponse` trait，任何 `AppError` 都可以直接转换为HTTP响应，
/// 确保错误信息以统一的格式返回给客户端。
#[derive(Error, Debug)]
pub enum AppError {
    /// 数据库相关错误（CRUD 部分）。包装 SeaORM 的 `DbErr`，自动转换。
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 输入验证错误。包装 validator crate 的 `ValidationErrors`，自动转换。
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// 请求参数不合法，如 ID 格式错误、未知的分类。返回400 Bad Request。
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 认证错误。如令牌无效、缺少身份标识等。返回401 Unauthorized。
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// 授权错误。如修改他人的议题。返回403 Forbidden。
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// 资源未找到错误。返回404 Not Found。
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 资源冲突错误。如邮箱已注册。返回409 Conflict。
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 请求频率限制。返回429 Too Many Requests，并带上 Retry-After（秒）。
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// 限流计数器存储不可用。限流器采用 fail-closed 策略，请求一律拒绝，返回500。
    #[error("Rate limiter unavailable: {0}")]
    RateLimiterUnavailable(String),

    /// 投票存储暂时不可用（连接失败或超时）。状态未改变，调用方可重试，返回503。
    #[error("Service temporarily unavailable: {0}")]
    ServiceUnavailable(String),

    /// 服务器内部错误。用于未预期的错误情况。返回500 Internal Server Error。
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_)
            | AppError::RateLimiterUnavailable(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// 实现 `IntoResponse` trait，将 `AppError` 转换为HTTP响应。
///
/// 所有错误都以统一的 `ApiResponse` 格式返回给客户端。
/// 对于内部错误（数据库、存储），只返回通用的错误消息，详细信息写入日志。
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let msg = match &self {
            AppError::DatabaseError(e) => {
                tracing::error!("❌ Database Error: {}", e);
                "Database service error".to_string()
            }
            AppError::RateLimiterUnavailable(msg) => {
                tracing::error!("❌ Rate limiter unavailable: {}", msg);
                "Rate limiter unavailable".to_string()
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::error!("❌ Store unavailable: {}", msg);
                "Service temporarily unavailable, please try again".to_string()
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("❌ Internal Error: {}", msg);
                "Internal server error".to_string()
            }
            AppError::ValidationError(e) => e.to_string(),
            AppError::RateLimitExceeded { .. } => "rate limit exceeded".to_string(),
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
        };

        // 限流拒绝：响应体和 Retry-After 头部都带上重试等待秒数
        if let AppError::RateLimitExceeded { retry_after_secs } = self {
            let body = json!({ "retry_after": retry_after_secs });
            let mut response = ApiResponse::new(status, msg, Some(body)).into_response();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
            return response;
        }

        ApiResponse::error(status, msg).into_response()
    }
}
