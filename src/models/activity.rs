//! Activity log models

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Activity log entry (append-only)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub action: String,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// 操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    Login,
    Logout,
    PasswordChange,

    RoleCreate,
    RoleUpdate,
    RoleDelete,
    RoleInitDefault,

    ApiKeyCreate,
    ApiKeyUpdate,
    ApiKeyRevoke,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Login => "login",
            ActivityAction::Logout => "logout",
            ActivityAction::PasswordChange => "password_change",

            ActivityAction::RoleCreate => "role.create",
            ActivityAction::RoleUpdate => "role.update",
            ActivityAction::RoleDelete => "role.delete",
            ActivityAction::RoleInitDefault => "role.init_default",

            ActivityAction::ApiKeyCreate => "api_key.create",
            ActivityAction::ApiKeyUpdate => "api_key.update",
            ActivityAction::ApiKeyRevoke => "api_key.revoke",
        }
    }

    pub fn resource_type(&self) -> Option<&'static str> {
        match self {
            ActivityAction::Login | ActivityAction::Logout | ActivityAction::PasswordChange => {
                Some("account")
            }
            ActivityAction::RoleCreate
            | ActivityAction::RoleUpdate
            | ActivityAction::RoleDelete
            | ActivityAction::RoleInitDefault => Some("role"),
            ActivityAction::ApiKeyCreate
            | ActivityAction::ApiKeyUpdate
            | ActivityAction::ApiKeyRevoke => Some("api_key"),
        }
    }
}

/// Values for one activity entry
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub customer_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub action: ActivityAction,
    pub resource_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<serde_json::Value>,
}

impl NewActivity {
    pub fn new(customer_id: Uuid, account_id: Uuid, action: ActivityAction) -> Self {
        Self {
            customer_id: Some(customer_id),
            account_id: Some(account_id),
            action,
            resource_id: None,
            ip: None,
            user_agent: None,
            details: None,
        }
    }

    pub fn resource(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn client(mut self, meta: &super::auth::RequestMeta) -> Self {
        self.ip = Some(meta.ip.clone());
        self.user_agent = meta.user_agent.clone();
        self
    }
}
