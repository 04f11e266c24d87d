// src/dtos/issue.rs
use std::str::FromStr;

use sea_orm::prelude::DateTimeWithTimeZone;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    core::{
        enums::{IssueCategory, IssueStatus},
        error::AppError,
    },
    entity::{issues, users},
    services::vote::ToggleOutcome,
};

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub description: String,

    /// 按字符串接收，再由 [`parse_category`] 转换，便于返回统一的 400 消息
    pub category: String,

    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: String,

    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,

    pub status: Option<String>,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,
}

/// 局部更新：只修改出现的字段。
#[derive(Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "Description must be 1-1000 characters"))]
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Location must be 1-200 characters"))]
    pub location: Option<String>,
    #[validate(url(message = "Invalid image URL"))]
    pub image_url: Option<String>,
    pub status: Option<String>,
    #[validate(range(min = -90.0, max = 90.0, message = "Latitude out of range"))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0, message = "Longitude out of range"))]
    pub longitude: Option<f64>,
}

/// 列表查询参数。`category` / `status` 为 "all" 时等同于不过滤。
#[derive(Deserialize, Default, Debug)]
pub struct IssueQuery {
    pub category: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub fn parse_category(raw: &str) -> Result<IssueCategory, AppError> {
    IssueCategory::from_str(raw).map_err(|_| AppError::BadRequest("Invalid category".to_string()))
}

pub fn parse_status(raw: &str) -> Result<IssueStatus, AppError> {
    IssueStatus::from_str(raw).map_err(|_| AppError::BadRequest("Invalid status".to_string()))
}

#[derive(Serialize, Debug)]
pub struct CreatorView {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CreatorView {
    /// 创建者可能已被删除，此时只返回 ID。
    pub fn new(id: Uuid, user: Option<users::Model>) -> Self {
        match user {
            Some(u) => Self {
                id,
                name: Some(u.name),
                email: Some(u.email),
            },
            None => Self { id, name: None, email: None },
        }
    }
}

/// 带投票信息的议题详情。
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IssueView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: IssueCategory,
    pub location: String,
    pub image_url: Option<String>,
    pub status: IssueStatus,
    pub created_by: CreatorView,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub votes: u64,
    pub user_has_voted: bool,
}

impl IssueView {
    pub fn new(issue: issues::Model, creator: CreatorView, votes: u64, user_has_voted: bool) -> Self {
        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            category: issue.category,
            location: issue.location,
            image_url: issue.image_url,
            status: issue.status,
            created_by: creator,
            latitude: issue.latitude,
            longitude: issue.longitude,
            created_at: issue.created_at,
            updated_at: issue.updated_at,
            votes,
            user_has_voted,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IssueListResponse {
    pub issues: Vec<IssueView>,
    pub total_issues: u64,
    pub total_pages: u64,
    pub current_page: u64,
}

/// 地图展示用的精简议题（必有坐标）。
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RecentIssue {
    pub id: Uuid,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub category: IssueCategory,
    pub created_at: DateTimeWithTimeZone,
}

impl RecentIssue {
    pub fn from_model(issue: issues::Model) -> Option<Self> {
        Some(Self {
            latitude: issue.latitude?,
            longitude: issue.longitude?,
            id: issue.id,
            title: issue.title,
            location: issue.location,
            category: issue.category,
            created_at: issue.created_at,
        })
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub message: String,
    pub voted: bool,
    pub votes: u64,
    pub user_has_voted: bool,
}

impl From<ToggleOutcome> for VoteResponse {
    fn from(outcome: ToggleOutcome) -> Self {
        let voted = outcome.state.is_voted();
        let message = if voted {
            "Vote cast successfully"
        } else {
            "Vote removed successfully"
        };
        Self {
            message: message.to_string(),
            voted,
            votes: outcome.votes,
            user_has_voted: voted,
        }
    }
}
