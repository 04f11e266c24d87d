// src/core/enums.rs

use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 议题分类
/// 同时支持：
/// 1. 数据库映射 (SeaORM) - 存为字符串 "Road" / "Water" ...
/// 2. JSON 序列化 (Serde) - 前端交互
/// 3. 字符串转换 (Strum) - 解析查询参数与请求体
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum IssueCategory {
    #[sea_orm(string_value = "Road")]
    Road,

    #[sea_orm(string_value = "Water")]
    Water,

    #[sea_orm(string_value = "Sanitation")]
    Sanitation,

    #[sea_orm(string_value = "Electricity")]
    Electricity,

    #[sea_orm(string_value = "Other")]
    Other,
}

/// 议题处理状态。"In Progress" 带空格，三处映射都要显式指定。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum IssueStatus {
    #[default]
    #[sea_orm(string_value = "Pending")]
    Pending,

    #[sea_orm(string_value = "In Progress")]
    #[serde(rename = "In Progress")]
    #[strum(serialize = "In Progress")]
    InProgress,

    #[sea_orm(string_value = "Resolved")]
    Resolved,
}

/// 投票切换后的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoteState {
    Voted,
    Unvoted,
}

impl VoteState {
    pub fn is_voted(self) -> bool {
        self == VoteState::Voted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_parses_spaced_variant() {
        assert_eq!(IssueStatus::from_str("In Progress").unwrap(), IssueStatus::InProgress);
        assert_eq!(IssueStatus::InProgress.to_string(), "In Progress");
        assert!(IssueStatus::from_str("InProgress").is_err());
    }

    #[test]
    fn category_rejects_unknown() {
        assert_eq!(IssueCategory::from_str("Water").unwrap(), IssueCategory::Water);
        assert!(IssueCategory::from_str("Parks").is_err());
        assert!(IssueCategory::from_str("road").is_err());
    }
}
