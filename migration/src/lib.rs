pub use sea_orm_migration::prelude::*;

mod m20251229_063323_create_users;
mod m20251230_091500_create_issues;
mod m20251230_094000_create_votes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251229_063323_create_users::Migration),
            Box::new(m20251230_091500_create_issues::Migration),
            Box::new(m20251230_094000_create_votes::Migration),
        ]
    }
}
