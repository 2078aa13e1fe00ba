//! 客户门户认证与授权服务
//! 登录锁定、JWT、客户级角色权限、API Key 与操作日志

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod services;
pub mod telemetry;
