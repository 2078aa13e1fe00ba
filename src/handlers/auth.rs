//! 认证相关的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    extract::ValidJson,
    middleware::AppState,
    models::auth::{ChangePasswordRequest, LoginRequest, RequestMeta, SessionResponse},
    response::ApiResponse,
};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use validator::Validate;

/// 用户登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let response = state.auth_service.login(req, &meta).await?;
    Ok(ApiResponse::ok_with_msg(response, "登录成功"))
}

/// 当前用户信息
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.auth_service.profile(&auth_context).await?;
    Ok(ApiResponse::ok(profile))
}

/// 会话探测：令牌有效时返回身份，否则 authenticated = false
pub async fn session(auth_context: Option<AuthContext>) -> impl IntoResponse {
    ApiResponse::ok(SessionResponse {
        authenticated: auth_context.is_some(),
        user: auth_context,
    })
}

/// 修改密码
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidJson(req): ValidJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    state
        .auth_service
        .change_password(&auth_context, req, &meta)
        .await?;

    Ok(ApiResponse::message("密码修改成功"))
}

/// 登出（令牌无状态，客户端自行丢弃）
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
) -> Result<impl IntoResponse, AppError> {
    state.auth_service.logout(&auth_context, &meta).await;
    Ok(ApiResponse::message("已退出登录"))
}
