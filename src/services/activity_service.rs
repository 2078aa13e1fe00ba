//! 操作日志服务（尽力而为，写入失败不影响主流程）

use crate::{
    error::AppError,
    models::activity::{ActivityLog, NewActivity},
    repository::ActivityRepository,
};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

pub struct ActivityService {
    db: PgPool,
}

impl ActivityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 记录操作日志；失败只记 warn 日志
    pub async fn record(&self, entry: NewActivity) {
        let repo = ActivityRepository::new(self.db.clone());

        if let Err(e) = repo.insert(&entry).await {
            warn!(
                error = %e,
                action = entry.action.as_str(),
                account_id = ?entry.account_id,
                "Failed to write activity log"
            );
        }
    }

    /// 客户最近的操作日志
    pub async fn recent(&self, customer_id: Uuid, limit: i64) -> Result<Vec<ActivityLog>, AppError> {
        let repo = ActivityRepository::new(self.db.clone());
        repo.recent(customer_id, limit.clamp(1, 200)).await
    }
}
