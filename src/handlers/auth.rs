// src/handlers/auth.rs
use axum::{
    extract::{Json, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    core::{
        constants::{LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECS, REGISTER_RATE_LIMIT, REGISTER_RATE_WINDOW_SECS},
        error::AppError,
    },
    dtos::{
        auth::{Claims, LoginRequest, RegisterRequest},
        response::ApiResponse,
    },
    rate_limit,
    services::{auth as AuthService, user as UserService},
    state::AppState,
};

/// 用户注册处理器。
///
/// - 校验请求体
/// - 按邮箱限流（防止批量注册）
/// - 创建用户，返回 201
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    rate_limit!(&state.limiter, "register", &payload.email, REGISTER_RATE_LIMIT, REGISTER_RATE_WINDOW_SECS);

    let profile = AuthService::register(&state, payload).await?;

    Ok(ApiResponse::created("User registered successfully", profile))
}

/// 用户登录处理器。按邮箱限流，防止暴力破解。
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    rate_limit!(&state.limiter, "login", &payload.email, LOGIN_RATE_LIMIT, LOGIN_RATE_WINDOW_SECS);

    let response = AuthService::login(&state, payload).await?;
    Ok(ApiResponse::ok(response))
}

/// 当前登录用户的资料。
pub async fn me(
    claims: Claims,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let profile = UserService::get_user_profile(&state, &claims.sub).await?;
    Ok(ApiResponse::ok(profile))
}
