//! SeaORM 实体定义，对应 migration crate 中创建的表。

pub mod issues;
pub mod users;
pub mod votes;
