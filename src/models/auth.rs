//! Authentication-related models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Login request. `username` also accepts an email address.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(alias = "identifier", alias = "email", alias = "account")]
    #[validate(length(min = 1, message = "请输入用户名或邮箱"))]
    pub username: String,
    #[validate(length(min = 1, message = "请输入密码"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: super::account::AccountResponse,
}

/// Change password request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "请输入原密码"))]
    pub old_password: String,
    #[validate(length(min = 6, message = "新密码长度不能少于 6 位"))]
    pub new_password: String,
}

/// Session probe response for optionally-authenticated callers
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub user: Option<crate::auth::AuthContext>,
}

/// Client metadata recorded with logins and activity entries
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: String,
    pub user_agent: Option<String>,
}
