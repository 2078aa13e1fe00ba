//! Activity log repository

use crate::{
    error::AppError,
    models::activity::{ActivityLog, NewActivity},
};
use sqlx::PgPool;
use uuid::Uuid;

pub struct ActivityRepository {
    db: PgPool,
}

impl ActivityRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 插入操作日志
    pub async fn insert(&self, entry: &NewActivity) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO activity_logs (
                customer_id, account_id, action, resource_type, resource_id, ip, user_agent, details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.customer_id)
        .bind(entry.account_id)
        .bind(entry.action.as_str())
        .bind(entry.action.resource_type())
        .bind(&entry.resource_id)
        .bind(&entry.ip)
        .bind(&entry.user_agent)
        .bind(&entry.details)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 客户最近的操作日志
    pub async fn recent(&self, customer_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
        let logs = sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT * FROM activity_logs
            WHERE customer_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(logs)
    }
}
