use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use secrecy::ExposeSecret;

use crate::{
    core::error::AppError,
    dtos::auth::Claims,
    state::AppState,
};

/// 校验 HS256 令牌并取出载荷。`sub` 为空的令牌同样视为无效。
pub fn decode_claims(token: &str, secret: &[u8]) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &Validation::new(Algorithm::HS256))
        .map_err(|e| {
            tracing::warn!("⚠️ Token validation failed: {}", e);
            AppError::AuthError("Invalid authorization token".to_string())
        })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::AuthError("Invalid token claims".to_string()));
    }
    Ok(token_data.claims)
}

/// 自定义提取器：从 Authorization 头解析 Bearer 令牌并验证。
/// 验证失败的请求直接以 401 拒绝，不会进入中间件或 Handler 的业务逻辑。
impl FromRequestParts<AppState> for Claims {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::AuthError("No authorization token provided".to_string()))?;

        decode_claims(bearer.token(), state.config.jwt_secret.expose_secret().as_bytes())
    }
}
