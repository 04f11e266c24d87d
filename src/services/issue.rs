// src/services/issue.rs
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::*;
use uuid::Uuid;

use crate::{
    core::{
        constants::{DEFAULT_PAGE_SIZE, MAX_PAGE, MAX_PAGE_SIZE, RECENT_ISSUES_LIMIT},
        error::AppError,
    },
    dtos::issue::{
        parse_category, parse_status, CreateIssueRequest, CreatorView, IssueListResponse, IssueQuery,
        IssueView, RecentIssue, UpdateIssueRequest,
    },
    entity::{issues, users},
    state::AppState,
    utils::ids::parse_id,
};

/// 创建议题。限流已经在路由中间件里完成，这里只负责落库。
pub async fn create_issue(
    state: &AppState,
    user_id: &str,
    req: CreateIssueRequest,
) -> Result<issues::Model, AppError> {
    let created_by = parse_id(user_id, "user")?;
    let category = parse_category(&req.category)?;
    let status = req
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?
        .unwrap_or_default();

    let now = Utc::now().fixed_offset();
    let issue = issues::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(req.title),
        description: Set(req.description),
        category: Set(category),
        location: Set(req.location),
        image_url: Set(req.image_url),
        status: Set(status),
        created_by: Set(created_by),
        latitude: Set(req.latitude),
        longitude: Set(req.longitude),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&state.db)
    .await?;

    tracing::info!("📝 Issue {} created by {}", issue.id, created_by);
    Ok(issue)
}

/// 查询单个议题，附带票数、当前用户是否已投票、创建者信息。
pub async fn get_issue(state: &AppState, viewer: &str, issue_id: &str) -> Result<IssueView, AppError> {
    let issue_id = parse_id(issue_id, "issue")?;
    let viewer = parse_id(viewer, "user")?;

    let issue = issues::Entity::find_by_id(issue_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("Issue not found".to_string()))?;

    with_votes(state, issue, viewer).await
}

/// 分页列表，支持分类 / 状态过滤、标题与描述的模糊搜索（不区分大小写）、按时间排序。
pub async fn list_issues(state: &AppState, viewer: &str, query: IssueQuery) -> Result<IssueListResponse, AppError> {
    let viewer = parse_id(viewer, "user")?;

    let (page, limit) = page_bounds(query.page, query.limit);

    let mut select = issues::Entity::find();

    if let Some(category) = active_filter(query.category.as_deref()) {
        select = select.filter(issues::Column::Category.eq(parse_category(category)?));
    }
    if let Some(status) = active_filter(query.status.as_deref()) {
        select = select.filter(issues::Column::Status.eq(parse_status(status)?));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        select = select.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(issues::Column::Title))).like(pattern.clone()))
                .add(Expr::expr(Func::lower(Expr::col(issues::Column::Description))).like(pattern)),
        );
    }

    select = match query.sort.as_deref() {
        Some("oldest") => select.order_by_asc(issues::Column::CreatedAt),
        _ => select.order_by_desc(issues::Column::CreatedAt),
    };

    let paginator = select.paginate(&state.db, limit);
    let total_issues = paginator.num_items().await?;
    let rows = paginator.fetch_page(page - 1).await?;

    let mut issues = Vec::with_capacity(rows.len());
    for issue in rows {
        issues.push(with_votes(state, issue, viewer).await?);
    }

    Ok(IssueListResponse {
        issues,
        total_issues,
        total_pages: total_issues.div_ceil(limit),
        current_page: page,
    })
}

/// 某个用户创建的全部议题（最新在前）。
pub async fn issues_by_user(state: &AppState, viewer: &str, author_id: &str) -> Result<Vec<IssueView>, AppError> {
    let viewer = parse_id(viewer, "user")?;
    let author = parse_id(author_id, "user")?;

    let rows = issues::Entity::find()
        .filter(issues::Column::CreatedBy.eq(author))
        .order_by_desc(issues::Column::CreatedAt)
        .all(&state.db)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for issue in rows {
        views.push(with_votes(state, issue, viewer).await?);
    }
    Ok(views)
}

/// 最近的带坐标议题，供地图展示。
pub async fn recent_issues(state: &AppState) -> Result<Vec<RecentIssue>, AppError> {
    let rows = issues::Entity::find()
        .filter(issues::Column::Latitude.is_not_null())
        .filter(issues::Column::Longitude.is_not_null())
        .order_by_desc(issues::Column::CreatedAt)
        .limit(RECENT_ISSUES_LIMIT)
        .all(&state.db)
        .await?;

    Ok(rows.into_iter().filter_map(RecentIssue::from_model).collect())
}

/// 局部更新，仅创建者可操作。
pub async fn update_issue(
    state: &AppState,
    user_id: &str,
    issue_id: &str,
    req: UpdateIssueRequest,
) -> Result<issues::Model, AppError> {
    let issue = find_owned(state, user_id, issue_id, "update").await?;
    let mut active: issues::ActiveModel = issue.into();

    if let Some(title) = req.title {
        active.title = Set(title);
    }
    if let Some(description) = req.description {
        active.description = Set(description);
    }
    if let Some(category) = req.category {
        active.category = Set(parse_category(&category)?);
    }
    if let Some(location) = req.location {
        active.location = Set(location);
    }
    if let Some(image_url) = req.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(status) = req.status {
        active.status = Set(parse_status(&status)?);
    }
    if let Some(latitude) = req.latitude {
        active.latitude = Set(Some(latitude));
    }
    if let Some(longitude) = req.longitude {
        active.longitude = Set(Some(longitude));
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    Ok(active.update(&state.db).await?)
}

/// 删除议题，仅创建者可操作。
///
/// 议题删除成功后再清理它的投票。清理是尽力而为的：失败只记日志，
/// 留下的孤儿投票不会再被任何查询统计到。
pub async fn delete_issue(state: &AppState, user_id: &str, issue_id: &str) -> Result<(), AppError> {
    let issue = find_owned(state, user_id, issue_id, "delete").await?;

    issues::Entity::delete_by_id(issue.id).exec(&state.db).await?;
    tracing::info!("🗑️ Issue {} deleted by {}", issue.id, issue.created_by);

    state.votes.purge_issue(issue.id).await;
    Ok(())
}

// --- 辅助函数 ---

async fn with_votes(state: &AppState, issue: issues::Model, viewer: Uuid) -> Result<IssueView, AppError> {
    let votes = state.votes.count(issue.id).await?;
    let user_has_voted = state.votes.has_voted(issue.id, viewer).await?;
    let creator = users::Entity::find_by_id(issue.created_by).one(&state.db).await?;
    let creator = CreatorView::new(issue.created_by, creator);

    Ok(IssueView::new(issue, creator, votes, user_has_voted))
}

async fn find_owned(state: &AppState, user_id: &str, issue_id: &str, action: &str) -> Result<issues::Model, AppError> {
    let issue_id = parse_id(issue_id, "issue")?;
    let user_id = parse_id(user_id, "user")?;

    let issue = issues::Entity::find_by_id(issue_id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("Issue not found".to_string()))?;

    if issue.created_by != user_id {
        tracing::warn!("🚫 {} tried to {} issue {} owned by {}", user_id, action, issue_id, issue.created_by);
        return Err(AppError::Forbidden(format!("You are not authorized to {action} this issue")));
    }
    Ok(issue)
}

/// 页码从 1 开始并截断到 [`MAX_PAGE`]；每页条数超出 1..=100 时用默认值。
fn page_bounds(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let limit = match limit {
        Some(l) if (1..=MAX_PAGE_SIZE).contains(&l) => l,
        _ => DEFAULT_PAGE_SIZE,
    };
    (page, limit)
}

/// "all" 或空串表示不过滤。
fn active_filter(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty() && *v != "all")
}

/// 转义 LIKE 通配符，搜索词按字面量匹配。
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
