//! 角色管理的 HTTP 处理器

use crate::{
    auth::AuthContext,
    error::AppError,
    extract::{ValidJson, ValidPath},
    middleware::AppState,
    models::{auth::RequestMeta, role::*},
    response::ApiResponse,
};
use axum::{extract::State, response::IntoResponse};
use std::sync::Arc;
use uuid::Uuid;

/// 权限目录（按模块分组）
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    _auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let groups = state.role_service.permission_catalog().await?;
    Ok(ApiResponse::ok(groups))
}

/// 列出角色
pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
) -> Result<impl IntoResponse, AppError> {
    let roles = state.role_service.list(auth_context.customer_id).await?;
    Ok(ApiResponse::ok(roles))
}

/// 获取角色详情
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let role = state.role_service.get(auth_context.customer_id, id).await?;
    Ok(ApiResponse::ok(role))
}

/// 创建角色
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidJson(req): ValidJson<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state
        .role_service
        .create(&auth_context, req, &meta)
        .await?;
    Ok(ApiResponse::ok_with_msg(role, "角色创建成功"))
}

/// 更新角色
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidPath(id): ValidPath<Uuid>,
    ValidJson(req): ValidJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let role = state
        .role_service
        .update(&auth_context, id, req, &meta)
        .await?;
    Ok(ApiResponse::ok_with_msg(role, "角色更新成功"))
}

/// 删除角色
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
    ValidPath(id): ValidPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.role_service.delete(&auth_context, id, &meta).await?;
    Ok(ApiResponse::message("角色删除成功"))
}

/// 初始化默认角色
pub async fn init_default_roles(
    State(state): State<Arc<AppState>>,
    auth_context: AuthContext,
    meta: RequestMeta,
) -> Result<impl IntoResponse, AppError> {
    let created = state.role_service.init_defaults(&auth_context, &meta).await?;

    let msg = if created {
        "默认角色初始化成功"
    } else {
        "已存在角色，无需初始化"
    };
    Ok(ApiResponse::ok_with_msg(serde_json::json!({ "created": created }), msg))
}
