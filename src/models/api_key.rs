//! API key domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const DEFAULT_KEY_PERMISSIONS: &[&str] = &["read"];

/// API key metadata. The secret itself is never stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub key_name: String,
    pub key_prefix: String,
    #[serde(skip)]
    pub key_hash: String,
    pub permissions: Vec<String>,
    pub rate_limit: i32,
    pub status: String, // active, revoked
    pub usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApiKey {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    pub fn remaining(&self) -> i64 {
        remaining_quota(self.usage_count, self.rate_limit)
    }
}

/// 剩余额度（近似值）：rateLimit - usageCount % rateLimit
pub fn remaining_quota(usage_count: i64, rate_limit: i32) -> i64 {
    let limit = i64::from(rate_limit);
    if limit <= 0 {
        return 0;
    }
    limit - usage_count.max(0) % limit
}

/// Create API key request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyRequest {
    pub key_name: String,
    pub permissions: Option<Vec<String>>,
    pub rate_limit: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Validated values for a new key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewApiKey {
    pub key_name: String,
    pub permissions: Vec<String>,
    pub rate_limit: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateApiKeyRequest {
    pub fn normalize(&self, default_rate_limit: i32) -> Result<NewApiKey, AppError> {
        let key_name = normalize_key_name(&self.key_name)?;

        let permissions = match &self.permissions {
            Some(p) if !p.is_empty() => p.clone(),
            _ => DEFAULT_KEY_PERMISSIONS.iter().map(|p| p.to_string()).collect(),
        };

        let rate_limit = self.rate_limit.unwrap_or(default_rate_limit);
        check_rate_limit(rate_limit)?;

        if let Some(expires_at) = self.expires_at {
            if expires_at <= Utc::now() {
                return Err(AppError::validation("过期时间必须晚于当前时间"));
            }
        }

        Ok(NewApiKey {
            key_name,
            permissions,
            rate_limit,
            expires_at: self.expires_at,
        })
    }
}

/// Update API key request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApiKeyRequest {
    pub key_name: Option<String>,
    pub permissions: Option<Vec<String>>,
    pub rate_limit: Option<i32>,
}

/// Column values to write after merging an update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKeyPatch {
    pub key_name: String,
    pub permissions: Vec<String>,
    pub rate_limit: i32,
}

impl UpdateApiKeyRequest {
    pub fn is_empty(&self) -> bool {
        self.key_name.is_none() && self.permissions.is_none() && self.rate_limit.is_none()
    }

    /// Merge the request into the current row
    pub fn merge_into(&self, key: &ApiKey) -> Result<ApiKeyPatch, AppError> {
        if self.is_empty() {
            return Err(AppError::BadRequest("没有需要更新的字段".to_string()));
        }

        let key_name = match &self.key_name {
            Some(name) => normalize_key_name(name)?,
            None => key.key_name.clone(),
        };

        let rate_limit = self.rate_limit.unwrap_or(key.rate_limit);
        check_rate_limit(rate_limit)?;

        Ok(ApiKeyPatch {
            key_name,
            permissions: self
                .permissions
                .clone()
                .unwrap_or_else(|| key.permissions.clone()),
            rate_limit,
        })
    }
}

fn normalize_key_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Key 名称不能为空"));
    }
    if name.chars().count() > 100 {
        return Err(AppError::validation("Key 名称不能超过 100 个字符"));
    }
    Ok(name.to_string())
}

fn check_rate_limit(rate_limit: i32) -> Result<(), AppError> {
    if rate_limit <= 0 {
        return Err(AppError::validation("rateLimit 必须大于 0"));
    }
    Ok(())
}

/// Response returned once at creation, carrying the plaintext secret
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateApiKeyResponse {
    pub id: Uuid,
    pub key_name: String,
    pub api_key: String,
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub rate_limit: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Usage snapshot
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStats {
    pub id: Uuid,
    pub key_name: String,
    pub status: String,
    pub usage_count: i64,
    pub rate_limit: i32,
    pub remaining: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ApiKey> for ApiKeyStats {
    fn from(key: ApiKey) -> Self {
        Self {
            remaining: key.remaining(),
            id: key.id,
            key_name: key.key_name,
            status: key.status,
            usage_count: key.usage_count,
            rate_limit: key.rate_limit,
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
            created_at: key.created_at,
        }
    }
}

/// Caller resolved from an API key (attached to request extensions)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyContext {
    pub key_id: Uuid,
    pub customer_id: Uuid,
    pub key_name: String,
    pub key_prefix: String,
    pub permissions: Vec<String>,
    pub rate_limit: i32,
    pub usage_count: i64,
    pub remaining: i64,
}

impl ApiKeyContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission || p == "*")
    }
}

impl From<&ApiKey> for ApiKeyContext {
    fn from(key: &ApiKey) -> Self {
        Self {
            key_id: key.id,
            customer_id: key.customer_id,
            key_name: key.key_name.clone(),
            key_prefix: key.key_prefix.clone(),
            permissions: key.permissions.clone(),
            rate_limit: key.rate_limit,
            usage_count: key.usage_count,
            remaining: key.remaining(),
        }
    }
}
