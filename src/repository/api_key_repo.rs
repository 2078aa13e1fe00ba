//! API key repository

use crate::{
    error::AppError,
    models::api_key::{ApiKey, ApiKeyPatch, NewApiKey},
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct ApiKeyRepository {
    db: PgPool,
}

impl ApiKeyRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 列出客户的全部 Key（含已吊销），新建的在前
    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<ApiKey>, AppError> {
        let keys = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(keys)
    }

    pub async fn find(&self, customer_id: Uuid, id: Uuid) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE id = $1 AND customer_id = $2",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(key)
    }

    /// 按哈希查找活跃 Key
    pub async fn find_active_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE key_hash = $1 AND status = 'active'",
        )
        .bind(key_hash)
        .fetch_optional(&self.db)
        .await?;

        Ok(key)
    }

    /// 使用次数加一并记录使用时间
    pub async fn record_usage(&self, id: Uuid) -> Result<ApiKey, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET usage_count = usage_count + 1, last_used_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&self.db)
        .await?;

        Ok(key)
    }

    // ==================== Transaction scoped ====================

    pub async fn count_active(conn: &mut PgConnection, customer_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM api_keys WHERE customer_id = $1 AND status = 'active'",
        )
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        customer_id: Uuid,
        new_key: &NewApiKey,
        key_prefix: &str,
        key_hash: &str,
    ) -> Result<ApiKey, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            INSERT INTO api_keys (customer_id, key_name, key_prefix, key_hash, permissions, rate_limit, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(&new_key.key_name)
        .bind(key_prefix)
        .bind(key_hash)
        .bind(&new_key.permissions)
        .bind(new_key.rate_limit)
        .bind(new_key.expires_at)
        .fetch_one(&mut *conn)
        .await?;

        Ok(key)
    }

    pub async fn lock(
        conn: &mut PgConnection,
        customer_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ApiKey>, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            "SELECT * FROM api_keys WHERE id = $1 AND customer_id = $2 FOR UPDATE",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(key)
    }

    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        patch: &ApiKeyPatch,
    ) -> Result<ApiKey, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET key_name = $2, permissions = $3, rate_limit = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.key_name)
        .bind(&patch.permissions)
        .bind(patch.rate_limit)
        .fetch_one(&mut *conn)
        .await?;

        Ok(key)
    }

    /// 吊销；已吊销的保留原吊销时间
    pub async fn revoke(conn: &mut PgConnection, id: Uuid) -> Result<ApiKey, AppError> {
        let key = sqlx::query_as::<_, ApiKey>(
            r#"
            UPDATE api_keys
            SET status = 'revoked', revoked_at = COALESCE(revoked_at, NOW()), updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(key)
    }
}
