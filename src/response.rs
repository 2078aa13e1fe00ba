//! 统一响应格式
//! 所有接口返回 `{errCode, msg, data}`，成功时 errCode 为 200

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// 响应信封
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub err_code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn ok(data: T) -> Self {
        Self::ok_with_msg(data, "success")
    }

    /// 成功响应（自定义提示）
    pub fn ok_with_msg(data: T, msg: &str) -> Self {
        Self {
            err_code: StatusCode::OK.as_u16(),
            msg: msg.to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    /// 无数据的成功响应
    pub fn message(msg: &str) -> Self {
        Self {
            err_code: StatusCode::OK.as_u16(),
            msg: msg.to_string(),
            data: None,
        }
    }

    /// 错误响应
    pub fn error(code: u16, msg: String) -> Self {
        Self {
            err_code: code,
            msg,
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.err_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}
