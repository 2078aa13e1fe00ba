//! 统一错误模型
//! 定义所有错误类型和 `{errCode, msg, data}` 错误响应格式

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential")]
    Unauthenticated,

    #[error("Token invalid or expired")]
    TokenInvalid,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Account locked for {minutes} more minute(s)")]
    AccountLocked { minutes: i64 },

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Access denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream dependency error: {0}")]
    Dependency(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated
            | AppError::TokenInvalid
            | AppError::InvalidCredentials
            | AppError::AccountLocked { .. }
            | AppError::AccountDisabled => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Dependency(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// 获取用户友好的错误消息（不包含敏感信息）
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "请先登录".to_string(),
            AppError::TokenInvalid => "Token 无效或已过期，请重新登录".to_string(),
            AppError::InvalidCredentials => "用户名或密码错误".to_string(),
            AppError::AccountLocked { minutes } => {
                format!("账户已被临时锁定，请 {} 分钟后再试", minutes)
            }
            AppError::AccountDisabled => "账户已被禁用".to_string(),
            AppError::Forbidden => "无权访问".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Dependency(_) => "上游服务暂不可用".to_string(),
            AppError::Database(_) => "数据库错误".to_string(),
            AppError::Config(_) => "配置错误".to_string(),
            AppError::Internal(_) => "服务器内部错误".to_string(),
        }
    }

    /// 获取错误码（与 HTTP 状态码一致）
    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn validation(msg: &str) -> Self {
        AppError::Validation(msg.to_string())
    }

    pub fn conflict(msg: &str) -> Self {
        AppError::Conflict(msg.to_string())
    }

    pub fn database(msg: &str) -> Self {
        AppError::Internal(format!("Database error: {}", msg))
    }

    /// 唯一约束冲突（并发写入时的兜底）转换为 409
    pub fn from_unique_violation(e: sqlx::Error, msg: &str) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(msg.to_string())
            }
            _ => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 记录错误日志
        if status.is_server_error() {
            tracing::error!(code = self.code(), message = %self, "Application error");
        } else {
            tracing::debug!(code = self.code(), message = %self, "Request rejected");
        }

        let body = ApiResponse::<()>::error(self.code(), self.user_message());

        (status, Json(body)).into_response()
    }
}

/// 从 config::ConfigError 转换
impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 从请求体校验错误转换
impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// 请求体缺字段、类型不符或不是合法 JSON
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("请求体格式错误: {}", rejection.body_text()))
    }
}

/// 路径参数无法解析（如非 UUID 的 id）
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("路径参数错误: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Unauthenticated.code(), 401);
        assert_eq!(AppError::TokenInvalid.code(), 401);
        assert_eq!(AppError::InvalidCredentials.code(), 401);
        assert_eq!(AppError::AccountLocked { minutes: 30 }.code(), 401);
        assert_eq!(AppError::AccountDisabled.code(), 401);
        assert_eq!(AppError::Forbidden.code(), 403);
        assert_eq!(AppError::NotFound("test".to_string()).code(), 404);
        assert_eq!(AppError::BadRequest("test".to_string()).code(), 400);
        assert_eq!(AppError::Conflict("test".to_string()).code(), 409);
        assert_eq!(AppError::Dependency("test".to_string()).code(), 502);
    }

    #[test]
    fn test_user_message_no_sensitive_info() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        let message = error.user_message();
        assert_eq!(message, "数据库错误");
        assert!(!message.contains("sqlx"));

        let error = AppError::Internal("secret stack detail".to_string());
        assert!(!error.user_message().contains("secret"));
    }

    #[test]
    fn test_non_unique_error_stays_database_error() {
        let error = AppError::from_unique_violation(sqlx::Error::RowNotFound, "duplicate");
        assert_eq!(error.code(), 500);
    }

    #[tokio::test]
    async fn test_error_response_envelope() {
        let response = AppError::NotFound("角色不存在".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["errCode"], 404);
        assert_eq!(json["msg"], "角色不存在");
        assert!(json["data"].is_null());
    }
}
