// src/services/user.rs
use sea_orm::*;

use crate::{
    core::error::AppError,
    dtos::user::UserProfile,
    entity::users,
    state::AppState,
    utils::ids::parse_id,
};

/// 获取用户资料。`user_id` 来自 JWT 的 sub 字段。
pub async fn get_user_profile(state: &AppState, user_id: &str) -> Result<UserProfile, AppError> {
    let uid = parse_id(user_id, "user")?;

    let user = users::Entity::find_by_id(uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(user.into())
}
