//! API Key 管理与开放接口处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    extract::{ValidJson, ValidPath},
    middleware::AppState,
    models::{api_key::*, auth::RequestMeta},
    response::ApiResponse,
};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use uuid::Uuid;

/// 列出 API Key
pub async fn list_api_keys(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let keys = state.api_key_service.list(auth_context.customer_id).await?;
    Ok(ApiResponse::ok(keys))
}

/// API Key 详情（只含元数据）
pub async fn get_api_key(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let key = state
        .api_key_service
        .get(auth_context.customer_id, id)
        .await?;
    Ok(ApiResponse::ok(key))
}

/// 创建 API Key
pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidJson(req): ValidJson<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = state
        .api_key_service
        .create(&auth_context, req, &meta)
        .await?;
    Ok(ApiResponse::ok_with_msg(created, "创建成功，请妥善保存 API Key，它只会显示一次"))
}

/// 更新 API Key
pub async fn update_api_key(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let key = state
        .api_key_service
        .update(&auth_context, id, req, &meta)
        .await?;
    Ok(ApiResponse::ok_with_msg(key, "更新成功"))
}

/// 吊销 API Key
pub async fn revoke_api_key(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let key = state
        .api_key_service
        .revoke(&auth_context, id, &meta)
        .await?;
    Ok(ApiResponse::ok_with_msg(key, "API Key 已吊销"))
}

/// 使用统计
pub async fn api_key_stats(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let stats = state
        .api_key_service
        .stats(auth_context.customer_id, id)
        .await?;
    Ok(ApiResponse::ok(stats))
}

/// 开放接口所需的最低权限
const OPEN_API_PERMISSION: &str = "read";

/// 开放接口：当前 Key 的范围与剩余额度
pub async fn key_info(key: ApiKeyContext) -> Result<impl IntoResponse, AppError> {
    if !key.has_permission(OPEN_API_PERMISSION) {
        return Err(AppError::Forbidden);
    }
    Ok(ApiResponse::ok(key))
}
