pub mod auth;
pub mod issue;
pub mod user;
pub mod vote;
