use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use rand::rngs::OsRng;
use sea_orm::*;
use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::{
    core::{config::Config, error::AppError},
    dtos::{
        auth::{Claims, LoginRequest, LoginResponse, RegisterRequest},
        user::UserProfile,
    },
    entity::users,
    state::AppState,
};

/// 生成访问令牌（HS256）。纯函数，只负责签名。
///
/// 令牌里的 `sub` 会被限流器和投票直接当作身份标识使用，不再二次校验。
fn generate_access_token(config: &Config, user_id: &str, name: &str) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::seconds(config.jwt_expiration)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        exp,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Token generation failed: {}", e)))
}

fn email_taken() -> AppError {
    AppError::Conflict("User with this email already exists".to_string())
}

/// 用户注册。
///
/// 先查一次邮箱给出友好提示；并发注册同一邮箱时，真正兜底的是 email 唯一索引，
/// 插入冲突同样映射为 409。
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<UserProfile, AppError> {
    let existing = users::Entity::find()
        .filter(users::Column::Email.eq(req.email.as_str()))
        .count(&state.db)
        .await?;
    if existing > 0 {
        return Err(email_taken());
    }

    // Argon2 + 随机盐
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalServerError(format!("Hash failed: {}", e)))?
        .to_string();

    let now = Utc::now().fixed_offset();
    let new_user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(req.name),
        email: Set(req.email),
        password_hash: Set(password_hash),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let user = new_user.insert(&state.db).await.map_err(|e| {
        if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
            email_taken()
        } else {
            AppError::DatabaseError(e)
        }
    })?;

    tracing::info!("👤 User registered: {}", user.id);
    Ok(user.into())
}

/// 用户登录：校验邮箱和密码，签发访问令牌。
/// 邮箱不存在和密码错误返回同一个错误，不泄露账号是否存在。
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let user = users::Entity::find()
        .filter(users::Column::Email.eq(req.email.as_str()))
        .one(&state.db)
        .await?
        .ok_or(AppError::AuthError("Invalid credentials".to_string()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalServerError("Auth failed".to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::AuthError("Invalid credentials".to_string()))?;

    let token = generate_access_token(&state.config, &user.id.to_string(), &user.name)?;

    Ok(LoginResponse {
        token,
        user: user.into(),
    })
}
