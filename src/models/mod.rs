//! 数据模型模块

pub mod account;
pub mod activity;
pub mod api_key;
pub mod auth;
pub mod role;
