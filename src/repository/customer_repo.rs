//! Customer repository. Customers are owned by onboarding; only read and locked here.

use crate::error::AppError;
use sqlx::PgConnection;
use uuid::Uuid;

pub struct CustomerRepository;

impl CustomerRepository {
    /// 锁定客户行，串行化同一客户下的角色与 API Key 变更
    pub async fn lock(conn: &mut PgConnection, customer_id: Uuid) -> Result<(), AppError> {
        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
                .bind(customer_id)
                .fetch_optional(&mut *conn)
                .await?;

        match locked {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("客户不存在")),
        }
    }
}
