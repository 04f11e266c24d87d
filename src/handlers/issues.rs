// src/handlers/issues.rs
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    core::error::AppError,
    dtos::{
        auth::Claims,
        issue::{CreateIssueRequest, IssueQuery, UpdateIssueRequest, VoteResponse},
        response::ApiResponse,
    },
    services::issue as IssueService,
    state::AppState,
};

/// 创建议题。限流由路由上的 `issue_rate_limiter` 中间件负责，能走到这里说明已放行。
pub async fn create_issue(
    claims: Claims,
    State(state): State<AppState>,
    Json(payload): Json<CreateIssueRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let issue = IssueService::create_issue(&state, &claims.sub, payload).await?;
    Ok(ApiResponse::created("Issue created successfully", issue))
}

pub async fn get_issue(
    claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let issue = IssueService::get_issue(&state, &claims.sub, &id).await?;
    Ok(ApiResponse::ok(issue))
}

/// 议题列表：`?category=&status=&search=&sort=newest|oldest&page=&limit=`
pub async fn list_issues(
    claims: Claims,
    State(state): State<AppState>,
    Query(query): Query<IssueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = IssueService::list_issues(&state, &claims.sub, query).await?;
    Ok(ApiResponse::ok(page))
}

pub async fn issues_by_user(
    claims: Claims,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let issues = IssueService::issues_by_user(&state, &claims.sub, &user_id).await?;
    Ok(ApiResponse::ok(issues))
}

pub async fn recent_issues(
    _claims: Claims,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let issues = IssueService::recent_issues(&state).await?;
    Ok(ApiResponse::ok(issues))
}

pub async fn update_issue(
    claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateIssueRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let issue = IssueService::update_issue(&state, &claims.sub, &id, payload).await?;
    Ok(ApiResponse::new(StatusCode::OK, "Issue updated successfully", Some(issue)))
}

pub async fn delete_issue(
    claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    IssueService::delete_issue(&state, &claims.sub, &id).await?;
    Ok(ApiResponse::message("Issue deleted successfully"))
}

/// 投票 / 取消投票（切换）。
///
/// 同一用户的并发重复请求不会产生两条投票，也不会收到 500：
/// 唯一索引冲突在 `VoteToggle` 内被解释为“已投票”。
pub async fn vote_issue(
    claims: Claims,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.votes.toggle(&id, &claims.sub).await?;
    Ok(ApiResponse::ok(VoteResponse::from(outcome)))
}
