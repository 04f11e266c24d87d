pub mod auth;
pub mod issue;
pub mod response;
pub mod user;
