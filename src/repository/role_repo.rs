//! Role repository (角色数据访问)

use crate::{error::AppError, models::role::*};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct RoleRepository {
    db: PgPool,
}

impl RoleRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ==================== Roles ====================

    /// 列出客户的角色：系统角色在前，其余按创建时间
    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<RoleSummary>, AppError> {
        let roles = sqlx::query_as::<_, RoleSummary>(
            r#"
            SELECT r.id, r.name, r.description, r.is_system, r.is_default, r.created_at,
                   COUNT(a.id) AS user_count
            FROM roles r
            LEFT JOIN accounts a ON a.role_id = r.id AND a.status = 'active'
            WHERE r.customer_id = $1 AND r.status <> 'deleted'
            GROUP BY r.id
            ORDER BY r.is_system DESC, r.created_at ASC
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    /// 根据 ID 查找角色（限定客户，排除已删除）
    pub async fn find(&self, customer_id: Uuid, id: Uuid) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE id = $1 AND customer_id = $2 AND status <> 'deleted'",
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(role)
    }

    // ==================== Permissions ====================

    /// 角色的权限代码，按目录排序
    pub async fn permission_codes(&self, role_id: Uuid) -> Result<Vec<String>, AppError> {
        let codes = sqlx::query_scalar::<_, String>(
            r#"
            SELECT p.code
            FROM permissions p
            JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.sort_order, p.code
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(codes)
    }

    /// 完整权限目录
    pub async fn catalog(&self) -> Result<Vec<Permission>, AppError> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions ORDER BY sort_order, code",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    // ==================== Transaction scoped ====================

    /// 锁定角色行
    pub async fn lock(
        conn: &mut PgConnection,
        customer_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Role>, AppError> {
        let role = sqlx::query_as::<_, Role>(
            r#"
            SELECT * FROM roles
            WHERE id = $1 AND customer_id = $2 AND status <> 'deleted'
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(role)
    }

    /// 客户下是否存在同名角色（排除已删除和 `except`）
    pub async fn name_taken(
        conn: &mut PgConnection,
        customer_id: Uuid,
        name: &str,
        except: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM roles
                WHERE customer_id = $1 AND name = $2 AND status <> 'deleted'
                  AND ($3::uuid IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(customer_id)
        .bind(name)
        .bind(except)
        .fetch_one(&mut *conn)
        .await?;

        Ok(exists)
    }

    /// 未删除角色数量
    pub async fn count_live(conn: &mut PgConnection, customer_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM roles WHERE customer_id = $1 AND status <> 'deleted'",
        )
        .bind(customer_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// 取消客户的默认角色（`except` 除外）
    pub async fn clear_default(
        conn: &mut PgConnection,
        customer_id: Uuid,
        except: Option<Uuid>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE roles
            SET is_default = FALSE, updated_at = NOW()
            WHERE customer_id = $1 AND is_default AND status <> 'deleted'
              AND ($2::uuid IS NULL OR id <> $2)
            "#,
        )
        .bind(customer_id)
        .bind(except)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 创建角色
    pub async fn insert(
        conn: &mut PgConnection,
        customer_id: Uuid,
        name: &str,
        description: Option<&str>,
        is_system: bool,
        is_default: bool,
    ) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (customer_id, name, description, is_system, is_default)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(name)
        .bind(description)
        .bind(is_system)
        .bind(is_default)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "角色名称已存在"))
    }

    /// 写入合并后的角色字段
    pub async fn update(
        conn: &mut PgConnection,
        id: Uuid,
        patch: &RolePatch,
    ) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            UPDATE roles
            SET name = $2, description = $3, is_default = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .bind(patch.is_default)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "角色名称已存在"))
    }

    /// 软删除
    pub async fn soft_delete(conn: &mut PgConnection, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE roles
            SET status = 'deleted', is_default = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 引用该角色的活跃账户数
    pub async fn count_active_accounts(
        conn: &mut PgConnection,
        role_id: Uuid,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts WHERE role_id = $1 AND status = 'active'",
        )
        .bind(role_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// 关联权限，未知代码忽略，重复关联忽略
    pub async fn grant_permissions(
        conn: &mut PgConnection,
        role_id: Uuid,
        codes: &[String],
    ) -> Result<(), AppError> {
        if codes.is_empty() {
            return Ok(());
        }

        sqlx::query(
            r#"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, id FROM permissions WHERE code = ANY($2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id)
        .bind(codes)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 清除角色全部权限关联
    pub async fn revoke_all_permissions(
        conn: &mut PgConnection,
        role_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *conn)
            .await?;

        Ok(())
    }

    /// 目录中全部权限代码
    pub async fn catalog_codes(conn: &mut PgConnection) -> Result<Vec<String>, AppError> {
        let codes = sqlx::query_scalar::<_, String>(
            "SELECT code FROM permissions ORDER BY sort_order, code",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(codes)
    }
}
