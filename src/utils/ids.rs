use uuid::Uuid;

use crate::core::error::AppError;

/// 解析路径参数或令牌里的 UUID，格式错误返回 400（不访问任何存储）。
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {what} ID")))
}
