//! API Key 服务：创建、列表、更新、吊销、统计与鉴权

use crate::{
    auth::{AuthContext, ApiKeyGenerator},
    config::AppConfig,
    error::AppError,
    models::{
        activity::{ActivityAction, NewActivity},
        api_key::*,
        auth::RequestMeta,
    },
    repository::{ApiKeyRepository, CustomerRepository},
    services::ActivityService,
};
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub struct ApiKeyService {
    db: PgPool,
    activity: Arc<ActivityService>,
    config: Arc<AppConfig>,
}

impl ApiKeyService {
    pub fn new(db: PgPool, activity: Arc<ActivityService>, config: Arc<AppConfig>) -> Self {
        Self {
            db,
            activity,
            config,
        }
    }

    /// 创建 API Key；明文只在此返回一次
    #[instrument(skip(self, ctx, req, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn create(
        &self,
        ctx: &AuthContext,
        req: CreateApiKeyRequest,
        meta: &RequestMeta,
    ) -> Result<CreateApiKeyResponse, AppError> {
        let new_key = req.normalize(self.config.api_keys.default_rate_limit)?;
        let max_active = self.config.api_keys.max_active_per_customer;

        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        CustomerRepository::lock(&mut *tx, ctx.customer_id).await?;

        let active = ApiKeyRepository::count_active(&mut *tx, ctx.customer_id).await?;
        if active >= max_active {
            return Err(AppError::BadRequest(format!(
                "最多只能创建 {} 个有效的 API Key",
                max_active
            )));
        }

        let secret = ApiKeyGenerator::generate();
        let key_prefix = ApiKeyGenerator::prefix(&secret);
        let key_hash = ApiKeyGenerator::hash(&secret);

        let key = ApiKeyRepository::insert(
            &mut *tx,
            ctx.customer_id,
            &new_key,
            &key_prefix,
            &key_hash,
        )
        .await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::ApiKeyCreate)
                    .resource(key.id)
                    .details(json!({ "keyName": key.key_name, "keyPrefix": key.key_prefix }))
                    .client(meta),
            )
            .await;

        info!(key_id = %key.id, key_prefix = %key.key_prefix, "API key created");

        Ok(CreateApiKeyResponse {
            id: key.id,
            key_name: key.key_name,
            api_key: secret,
            key_prefix: key.key_prefix,
            permissions: key.permissions,
            rate_limit: key.rate_limit,
            expires_at: key.expires_at,
            created_at: key.created_at,
        })
    }

    /// 列出客户的 API Key（只含元数据）
    #[instrument(skip(self))]
    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        let repo = ApiKeyRepository::new(self.db.clone());
        repo.list(customer_id).await
    }

    /// 更新名称、权限或限额
    #[instrument(skip(self, ctx, req, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        req: UpdateApiKeyRequest,
        meta: &RequestMeta,
    ) -> Result<ApiKey, AppError> {
        if req.is_empty() {
            return Err(AppError::BadRequest("没有需要更新的字段".to_string()));
        }

        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let current = ApiKeyRepository::lock(&mut *tx, ctx.customer_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("API Key 不存在"))?;

        let patch = req.merge_into(&current)?;
        let key = ApiKeyRepository::update(&mut *tx, id, &patch).await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::ApiKeyUpdate)
                    .resource(key.id)
                    .details(json!({
                        "keyName": key.key_name,
                        "permissions": key.permissions,
                        "rateLimit": key.rate_limit,
                    }))
                    .client(meta),
            )
            .await;

        info!(key_id = %key.id, "API key updated");
        Ok(key)
    }

    /// 吊销 API Key（不可恢复）
    #[instrument(skip(self, ctx, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn revoke(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        meta: &RequestMeta,
    ) -> Result<ApiKey, AppError> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let current = ApiKeyRepository::lock(&mut *tx, ctx.customer_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("API Key 不存在"))?;

        if !current.is_active() {
            // 已吊销，直接返回
            return Ok(current);
        }

        let key = ApiKeyRepository::revoke(&mut *tx, id).await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::ApiKeyRevoke)
                    .resource(key.id)
                    .details(json!({ "keyName": key.key_name, "keyPrefix": key.key_prefix }))
                    .client(meta),
            )
            .await;

        info!(key_id = %key.id, "API key revoked");
        Ok(key)
    }

    /// 单个 API Key 的元数据
    #[instrument(skip(self))]
    pub async fn get(&self, customer_id: Uuid, id: Uuid) -> Result<ApiKey, AppError> {
        let repo = ApiKeyRepository::new(self.db.clone());
        repo.find(customer_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("API Key 不存在"))
    }

    /// 使用统计
    #[instrument(skip(self))]
    pub async fn stats(&self, customer_id: Uuid, id: Uuid) -> Result<ApiKeyStats, AppError> {
        let key = self.get(customer_id, id).await?;
        Ok(ApiKeyStats::from(key))
    }

    /// 用明文 Key 鉴权：必须有效且未过期。使用计数为尽力而为。
    #[instrument(skip(self, secret))]
    pub async fn authenticate(&self, secret: &str) -> Result<ApiKeyContext, AppError> {
        let repo = ApiKeyRepository::new(self.db.clone());
        let key_hash = ApiKeyGenerator::hash(secret.trim());

        let key = repo
            .find_active_by_hash(&key_hash)
            .await?
            .ok_or(AppError::Unauthenticated)?;

        if key.is_expired(Utc::now()) {
            return Err(AppError::Unauthenticated);
        }

        let key = match repo.record_usage(key.id).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(error = %e, key_id = %key.id, "Failed to record API key usage");
                key
            }
        };

        Ok(ApiKeyContext::from(&key))
    }
}
