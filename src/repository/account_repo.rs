//! Account repository (账户数据访问)

use crate::{
    auth::LockoutState,
    error::AppError,
    models::account::{Account, AccountWithCompany},
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

const SELECT_WITH_COMPANY: &str = r#"
    SELECT a.*, c.company_name
    FROM accounts a
    LEFT JOIN customers c ON c.id = a.customer_id
"#;

pub struct AccountRepository {
    db: PgPool,
}

impl AccountRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// 按用户名（精确）或邮箱（不区分大小写）查找账户，用户名优先
    pub async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AccountWithCompany>, AppError> {
        let sql = format!(
            "{} WHERE a.username = $1 OR LOWER(a.email) = LOWER($1) \
             ORDER BY (a.username = $1) DESC LIMIT 1",
            SELECT_WITH_COMPANY
        );

        let account = sqlx::query_as::<_, AccountWithCompany>(&sql)
            .bind(identifier)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    /// 根据 ID 查找账户
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountWithCompany>, AppError> {
        let sql = format!("{} WHERE a.id = $1", SELECT_WITH_COMPANY);

        let account = sqlx::query_as::<_, AccountWithCompany>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        Ok(account)
    }

    /// 登录成功：清除锁定状态并记录登录时间与 IP
    pub async fn record_login_success(&self, id: Uuid, ip: &str) -> Result<(), AppError> {
        let cleared = LockoutState::cleared();

        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = $2,
                locked_until = $3,
                last_login_at = NOW(),
                last_login_ip = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(cleared.failed_attempts)
        .bind(cleared.locked_until)
        .bind(ip)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// 修改密码，同时清除锁定状态
    pub async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET password_hash = $2,
                password_changed_at = NOW(),
                failed_login_attempts = 0,
                locked_until = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    // ==================== Transaction scoped ====================

    /// 锁定账户行（SELECT ... FOR UPDATE）
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        Ok(account)
    }

    /// 写入失败计数与锁定截止时间
    pub async fn save_lockout_state(
        conn: &mut PgConnection,
        id: Uuid,
        state: &LockoutState,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET failed_login_attempts = $2,
                locked_until = $3,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(state.failed_attempts)
        .bind(state.locked_until)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}
