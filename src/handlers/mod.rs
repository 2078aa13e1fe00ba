//! HTTP 处理器

pub mod api_key;
pub mod auth;
pub mod health;
pub mod role;
