//! HTTP 中间件
//! 应用状态、请求追踪、客户端信息、API Key 鉴权

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{extract_token, JwtService},
    config::AppConfig,
    error::AppError,
    models::{api_key::ApiKeyContext, auth::RequestMeta},
    services::{ActivityService, ApiKeyService, AuthService, RoleService},
};

/// 应用状态
///
/// 服务使用 Arc 包装，请求之间共享同一实例
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: sqlx::PgPool,
    pub jwt_service: Arc<JwtService>,
    pub auth_service: Arc<AuthService>,
    pub role_service: Arc<RoleService>,
    pub api_key_service: Arc<ApiKeyService>,
    pub activity_service: Arc<ActivityService>,
}

impl AppState {
    /// 构建全部服务
    pub fn new(config: AppConfig, db: sqlx::PgPool) -> Result<Self, AppError> {
        let config = Arc::new(config);
        let jwt_service = Arc::new(JwtService::from_config(&config)?);
        let activity_service = Arc::new(ActivityService::new(db.clone()));

        Ok(Self {
            auth_service: Arc::new(AuthService::new(
                db.clone(),
                jwt_service.clone(),
                activity_service.clone(),
                config.clone(),
            )),
            role_service: Arc::new(RoleService::new(db.clone(), activity_service.clone())),
            api_key_service: Arc::new(ApiKeyService::new(
                db.clone(),
                activity_service.clone(),
                config.clone(),
            )),
            activity_service,
            jwt_service,
            config,
            db,
        })
    }
}

/// 请求追踪中间件
/// 为每个请求生成 trace_id 和 request_id，并记录指标
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    async move {
        let start = Instant::now();
        let mut response = next.run(req).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_class = match status {
            200..=299 => "2xx",
            400..=499 => "4xx",
            500..=599 => "5xx",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_class)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

/// 从请求头中提取或生成 trace_id
fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// 代理头中的客户端 IP：X-Forwarded-For 第一个，其次 X-Real-IP
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first_ip) = forwarded.split(',').next().map(str::trim) {
            if !first_ip.is_empty() {
                return Some(first_ip.to_string());
            }
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// 解析客户端 IP。只有信任代理时才读取转发头
pub fn client_ip(parts: &Parts, trust_proxy: bool) -> String {
    if trust_proxy {
        if let Some(ip) = forwarded_ip(&parts.headers) {
            return ip;
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

impl FromRequestParts<Arc<AppState>> for RequestMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.chars().take(512).collect());

        Ok(RequestMeta {
            ip: client_ip(parts, state.config.security.trust_proxy),
            user_agent,
        })
    }
}

/// 开放接口凭证：优先 X-API-Key，其次 Authorization
fn extract_api_key(headers: &HeaderMap) -> Result<String, AppError> {
    if let Some(key) = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        return Ok(key.to_string());
    }

    extract_token(headers)
}

/// API Key 鉴权中间件（开放接口）
pub async fn api_key_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let secret = extract_api_key(req.headers())?;
    let context = state.api_key_service.authenticate(&secret).await?;

    tracing::debug!(key_id = %context.key_id, customer_id = %context.customer_id, "API key accepted");
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}

impl<S> FromRequestParts<S> for ApiKeyContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ApiKeyContext>()
            .cloned()
            .ok_or(AppError::Unauthenticated)
    }
}
