//! 认证服务：登录、个人信息、修改密码、登出

use crate::{
    auth::{
        lockout::remaining_minutes, AuthContext, JwtService, LockoutPolicy, LoginGate,
        PasswordHasher,
    },
    config::AppConfig,
    error::AppError,
    models::{
        account::{AccountResponse, AccountStatus, ProfileResponse},
        activity::{ActivityAction, NewActivity},
        auth::{ChangePasswordRequest, LoginRequest, LoginResponse, RequestMeta},
    },
    repository::{AccountRepository, RoleRepository},
    services::ActivityService,
    telemetry::record_login_outcome,
};
use chrono::Utc;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

pub struct AuthService {
    db: PgPool,
    jwt_service: Arc<JwtService>,
    activity: Arc<ActivityService>,
    config: Arc<AppConfig>,
    lockout: LockoutPolicy,
}

impl AuthService {
    pub fn new(
        db: PgPool,
        jwt_service: Arc<JwtService>,
        activity: Arc<ActivityService>,
        config: Arc<AppConfig>,
    ) -> Self {
        let lockout = LockoutPolicy::from_config(&config.security);
        Self {
            db,
            jwt_service,
            activity,
            config,
            lockout,
        }
    }

    /// 用户登录
    #[instrument(skip(self, req, meta), fields(identifier = %req.username, ip = %meta.ip))]
    pub async fn login(
        &self,
        req: LoginRequest,
        meta: &RequestMeta,
    ) -> Result<LoginResponse, AppError> {
        let account_repo = AccountRepository::new(self.db.clone());
        let now = Utc::now();

        let hasher = PasswordHasher::new();

        // 用户不存在与密码错误返回同一错误，耗时也一致
        let row = match account_repo.find_by_identifier(req.username.trim()).await? {
            Some(row) => row,
            None => {
                hasher.verify_dummy(&req.password);
                record_login_outcome("unknown_account");
                return Err(AppError::InvalidCredentials);
            }
        };

        // 锁定期内不校验密码
        if let LoginGate::Locked { until } = self.lockout.gate(&row.account.lockout_state(), now) {
            record_login_outcome("locked");
            warn!(account_id = %row.account.id, locked_until = %until, "Login rejected: account locked");
            return Err(AppError::AccountLocked {
                minutes: remaining_minutes(until, now),
            });
        }

        if row.account.status() != AccountStatus::Active {
            record_login_outcome("disabled");
            return Err(AppError::AccountDisabled);
        }

        if !hasher.verify(&req.password, &row.account.password_hash)? {
            self.register_failure(row.account.id).await?;
            record_login_outcome("bad_password");
            return Err(AppError::InvalidCredentials);
        }

        account_repo
            .record_login_success(row.account.id, &meta.ip)
            .await?;

        let identity = row.identity();
        let issued = self.jwt_service.issue(&identity)?;

        self.activity
            .record(
                NewActivity::new(identity.customer_id, identity.account_id, ActivityAction::Login)
                    .resource(identity.account_id)
                    .client(meta),
            )
            .await;

        record_login_outcome("success");
        info!(account_id = %identity.account_id, customer_id = %identity.customer_id, "Login succeeded");

        let mut user = AccountResponse::from(row);
        user.last_login_at = Some(now);
        user.last_login_ip = Some(meta.ip.clone());

        Ok(LoginResponse {
            token: issued.token,
            expires_in: issued.expires_in,
            user,
        })
    }

    /// 密码错误：锁定账户行后重新读取状态再累加，避免并发失败丢失计数
    async fn register_failure(&self, account_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            AppError::database("Failed to begin transaction")
        })?;

        let account = AccountRepository::lock_by_id(&mut *tx, account_id)
            .await?
            .ok_or_else(|| AppError::not_found("账户不存在"))?;

        let next = self.lockout.on_failure(&account.lockout_state(), Utc::now());
        AccountRepository::save_lockout_state(&mut *tx, account_id, &next).await?;

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit transaction");
            AppError::database("Failed to commit transaction")
        })?;

        if let Some(until) = next.locked_until {
            warn!(
                account_id = %account_id,
                failed_attempts = next.failed_attempts,
                locked_until = %until,
                "Account locked after repeated login failures"
            );
        }

        Ok(())
    }

    /// 当前用户的完整信息：账户、公司、角色与权限
    #[instrument(skip(self, ctx), fields(account_id = %ctx.account_id))]
    pub async fn profile(&self, ctx: &AuthContext) -> Result<ProfileResponse, AppError> {
        let account_repo = AccountRepository::new(self.db.clone());
        let role_repo = RoleRepository::new(self.db.clone());

        let row = account_repo
            .find_by_id(ctx.account_id)
            .await?
            .filter(|row| row.account.customer_id == ctx.customer_id)
            .ok_or_else(|| AppError::not_found("账户不存在"))?;

        let role = match row.account.role_id {
            Some(role_id) => role_repo.find(ctx.customer_id, role_id).await?,
            None => None,
        };

        let permissions = match &role {
            Some(role) => role_repo.permission_codes(role.id).await?,
            None => Vec::new(),
        };

        Ok(ProfileResponse {
            role_id: role.as_ref().map(|r| r.id),
            role_name: role.map(|r| r.name),
            permissions,
            account: AccountResponse::from(row),
        })
    }

    /// 修改密码（同时清除锁定状态）
    #[instrument(skip(self, ctx, req, meta), fields(account_id = %ctx.account_id))]
    pub async fn change_password(
        &self,
        ctx: &AuthContext,
        req: ChangePasswordRequest,
        meta: &RequestMeta,
    ) -> Result<(), AppError> {
        PasswordHasher::validate_password_policy(&req.new_password, &self.config.security)?;

        let account_repo = AccountRepository::new(self.db.clone());
        let row = account_repo
            .find_by_id(ctx.account_id)
            .await?
            .ok_or_else(|| AppError::not_found("账户不存在"))?;

        let hasher = PasswordHasher::new();
        if !hasher.verify(&req.old_password, &row.account.password_hash)? {
            return Err(AppError::BadRequest("原密码错误".to_string()));
        }

        if req.old_password == req.new_password {
            return Err(AppError::validation("新密码不能与原密码相同"));
        }

        let new_hash = hasher.hash(&req.new_password)?;
        account_repo.update_password(ctx.account_id, &new_hash).await?;

        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::PasswordChange)
                    .resource(ctx.account_id)
                    .client(meta),
            )
            .await;

        info!("Password changed");
        Ok(())
    }

    /// 登出：令牌无状态，仅记录日志
    #[instrument(skip(self, ctx, meta), fields(account_id = %ctx.account_id))]
    pub async fn logout(&self, ctx: &AuthContext, meta: &RequestMeta) {
        self.activity
            .record(
                NewActivity::new(ctx.customer_id, ctx.account_id, ActivityAction::Logout)
                    .resource(ctx.account_id)
                    .client(meta),
            )
            .await;
    }
}
