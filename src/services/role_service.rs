//! 角色与权限服务（按客户隔离）

use crate::{
    auth::AuthContext,
    error::AppError,
    models::{
        activity::{ActivityAction, NewActivity},
        auth::RequestMeta,
        role::*,
    },
    repository::{CustomerRepository, RoleRepository},
    services::ActivityService,
};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

pub struct RoleService {
    db: PgPool,
    activity: Arc<ActivityService>,
}

impl RoleService {
    pub fn new(db: PgPool, activity: Arc<ActivityService>) -> Self {
        Self { db, activity }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, AppError> {
        self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })
    }

    async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), AppError> {
        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })
    }

    /// 列出角色及使用人数
    #[instrument(skip(self))]
    pub async fn list(&self, customer_id: Uuid) -> Result<Vec<RoleSummary>, AppError> {
        let repo = RoleRepository::new(self.db.clone());
        repo.list(customer_id).await
    }

    /// 角色详情（含权限代码）
    #[instrument(skip(self))]
    pub async fn get(&self, customer_id: Uuid, id: Uuid) -> Result<RoleDetail, AppError> {
        let repo = RoleRepository::new(self.db.clone());

        let role = repo
            .find(customer_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("角色不存在"))?;
        let permissions = repo.permission_codes(role.id).await?;

        Ok(RoleDetail { role, permissions })
    }

    /// 权限目录，按模块分组
    #[instrument(skip(self))]
    pub async fn permission_catalog(&self) -> Result<Vec<PermissionGroup>, AppError> {
        let repo = RoleRepository::new(self.db.clone());
        Ok(group_by_module(repo.catalog().await?))
    }

    /// 创建角色
    #[instrument(skip(self, ctx, req, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn create(
        &self,
        ctx: &AuthContext,
        req: CreateRoleRequest,
        meta: &RequestMeta,
    ) -> Result<RoleDetail, AppError> {
        let name = req.normalized_name()?;
        let description = normalize_description(req.description.as_deref());

        let mut tx = self.begin().await?;
        CustomerRepository::lock(&mut *tx, ctx.customer_id).await?;

        if RoleRepository::name_taken(&mut *tx, ctx.customer_id, &name, None).await? {
            return Err(AppError::conflict("角色名称已存在"));
        }

        if req.is_default {
            RoleRepository::clear_default(&mut *tx, ctx.customer_id, None).await?;
        }

        let role = RoleRepository::insert(
            &mut *tx,
            ctx.customer_id,
            &name,
            description.as_deref(),
            false,
            req.is_default,
        )
        .await?;
        RoleRepository::grant_permissions(&mut *tx, role.id, &req.permissions).await?;

        Self::commit(tx).await?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::RoleCreate)
                    .resource(role.id)
                    .details(json!({ "name": role.name, "isDefault": role.is_default }))
                    .client(meta),
            )
            .await;

        info!(role_id = %role.id, name = %role.name, "Role created");
        self.get(ctx.customer_id, role.id).await
    }

    /// 更新角色（部分字段）
    #[instrument(skip(self, ctx, req, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        req: UpdateRoleRequest,
        meta: &RequestMeta,
    ) -> Result<RoleDetail, AppError> {
        let mut tx = self.begin().await?;
        CustomerRepository::lock(&mut *tx, ctx.customer_id).await?;

        let current = RoleRepository::lock(&mut *tx, ctx.customer_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("角色不存在"))?;

        let patch = req.merge_into(&current)?;

        if patch.renames(&current)
            && RoleRepository::name_taken(&mut *tx, ctx.customer_id, &patch.name, Some(id)).await?
        {
            return Err(AppError::conflict("角色名称已存在"));
        }

        if patch.is_default && !current.is_default {
            RoleRepository::clear_default(&mut *tx, ctx.customer_id, Some(id)).await?;
        }

        let role = RoleRepository::update(&mut *tx, id, &patch).await?;

        if let Some(codes) = &req.permissions {
            RoleRepository::revoke_all_permissions(&mut *tx, id).await?;
            RoleRepository::grant_permissions(&mut *tx, id, codes).await?;
        }

        Self::commit(tx).await?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::RoleUpdate)
                    .resource(role.id)
                    .details(json!({
                        "name": role.name,
                        "isDefault": role.is_default,
                        "permissionsReplaced": req.permissions.is_some(),
                    }))
                    .client(meta),
            )
            .await;

        info!(role_id = %role.id, "Role updated");
        self.get(ctx.customer_id, role.id).await
    }

    /// 删除角色（软删除）
    #[instrument(skip(self, ctx, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn delete(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;
        CustomerRepository::lock(&mut *tx, ctx.customer_id).await?;

        let role = RoleRepository::lock(&mut *tx, ctx.customer_id, id)
            .await?
            .ok_or_else(|| AppError::not_found("角色不存在"))?;

        if role.is_system {
            return Err(AppError::BadRequest("系统角色不能删除".to_string()));
        }

        let in_use = RoleRepository::count_active_accounts(&mut *tx, id).await?;
        if in_use > 0 {
            return Err(AppError::BadRequest(format!(
                "该角色正在被 {} 个用户使用，无法删除",
                in_use
            )));
        }

        RoleRepository::soft_delete(&mut *tx, id).await?;
        RoleRepository::revoke_all_permissions(&mut *tx, id).await?;

        Self::commit(tx).await?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::RoleDelete)
                    .resource(id)
                    .details(json!({ "name": role.name }))
                    .client(meta),
            )
            .await;

        info!(role_id = %id, "Role deleted");
        Ok(())
    }

    /// 初始化默认角色：Admin（全部权限）与 Staff（只读，默认角色）。
    /// 客户已有角色时不做任何处理，返回 false。
    #[instrument(skip(self, ctx, meta), fields(customer_id = %ctx.customer_id))]
    pub async fn init_defaults(
        &self,
        ctx: &AuthContext,
        meta: &RequestMeta,
    ) -> Result<bool, AppError> {
        let mut tx = self.begin().await?;
        CustomerRepository::lock(&mut *tx, ctx.customer_id).await?;

        if RoleRepository::count_live(&mut *tx, ctx.customer_id).await? > 0 {
            return Ok(false);
        }

        let all_codes = RoleRepository::catalog_codes(&mut *tx).await?;
        let staff_codes: Vec<String> = all_codes
            .iter()
            .filter(|code| is_staff_permission(code))
            .cloned()
            .collect();

        let admin = RoleRepository::insert(
            &mut *tx,
            ctx.customer_id,
            ADMIN_ROLE_NAME,
            Some("管理员，拥有全部权限"),
            true,
            false,
        )
        .await?;
        RoleRepository::grant_permissions(&mut *tx, admin.id, &all_codes).await?;

        let staff = RoleRepository::insert(
            &mut *tx,
            ctx.customer_id,
            STAFF_ROLE_NAME,
            Some("普通员工，只读权限"),
            true,
            true,
        )
        .await?;
        RoleRepository::grant_permissions(&mut *tx, staff.id, &staff_codes).await?;

        Self::commit(tx).await?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::RoleInitDefault)
                    .details(json!({
                        "adminPermissions": all_codes.len(),
                        "staffPermissions": staff_codes.len(),
                    }))
                    .client(meta),
            )
            .await;

        info!(admin_id = %admin.id, staff_id = %staff.id, "Default roles initialized");
        Ok(true)
    }
}

fn normalize_description(description: Option<&str>) -> Option<String> {
    description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}
