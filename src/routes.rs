//! 路由注册
//! 创建所有 API 路由并应用中间件

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::{
    auth::{jwt_auth_middleware, optional_auth_middleware},
    error::AppError,
    handlers,
    middleware::{api_key_auth_middleware, request_tracking_middleware, AppState},
};

/// 请求体上限 1 MiB
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 创建应用路由
pub fn create_router(state: Arc<AppState>) -> Router {
    // 公开路由
    let public_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login));

    // 可选认证
    let optional_routes = Router::new()
        .route("/auth/session", get(handlers::auth::session))
        .layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            optional_auth_middleware,
        ));

    // 需要认证的路由
    let protected_routes = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/change-password", post(handlers::auth::change_password))
        .route("/auth/logout", post(handlers::auth::logout))
        // 权限与角色
        .route("/permissions", get(handlers::role::list_permissions))
        .route(
            "/roles",
            get(handlers::role::list_roles).post(handlers::role::create_role),
        )
        .route("/roles/init-default", post(handlers::role::init_default_roles))
        .route(
            "/roles/{id}",
            get(handlers::role::get_role)
                .put(handlers::role::update_role)
                .delete(handlers::role::delete_role),
        )
        // API Key
        .route(
            "/api-keys",
            get(handlers::api_key::list_api_keys).post(handlers::api_key::create_api_key),
        )
        .route(
            "/api-keys/{id}",
            get(handlers::api_key::get_api_key)
                .put(handlers::api_key::update_api_key)
                .delete(handlers::api_key::revoke_api_key),
        )
        .route("/api-keys/{id}/stats", get(handlers::api_key::api_key_stats))
        .layer(middleware::from_fn_with_state(
            state.jwt_service.clone(),
            jwt_auth_middleware,
        ));

    // 开放接口（API Key）
    let open_routes = Router::new()
        .route("/v1/key-info", get(handlers::api_key::key_info))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_auth_middleware,
        ));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(optional_routes)
        .merge(protected_routes);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
            header::HeaderName::from_static("x-trace-id"),
        ]);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api", api_routes)
        .nest("/open", open_routes)
        .fallback(not_found)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_tracking_middleware))
        .with_state(state)
}

/// 未匹配的路由同样返回统一响应格式
async fn not_found() -> AppError {
    AppError::not_found("接口不存在")
}
