//! Account domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{AuthContext, LockoutState};

/// Login account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub role_id: Option<Uuid>,

    // Account state
    pub status: String, // active, inactive, suspended

    // Security policy
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub password_changed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Account joined with its customer's company name
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountWithCompany {
    #[sqlx(flatten)]
    pub account: Account,
    pub company_name: Option<String>,
}

/// Account status enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

impl From<&str> for AccountStatus {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => AccountStatus::Active,
            "suspended" => AccountStatus::Suspended,
            _ => AccountStatus::Inactive,
        }
    }
}

impl Account {
    pub fn status(&self) -> AccountStatus {
        AccountStatus::from(self.status.as_str())
    }

    pub fn lockout_state(&self) -> LockoutState {
        LockoutState {
            failed_attempts: self.failed_login_attempts,
            locked_until: self.locked_until,
        }
    }
}

impl AccountWithCompany {
    /// Identity claims embedded in the issued token
    pub fn identity(&self) -> AuthContext {
        AuthContext {
            account_id: self.account.id,
            customer_id: self.account.customer_id,
            username: self.account.username.clone(),
            email: self.account.email.clone(),
            company_name: self.company_name.clone(),
            phone: self.account.phone.clone(),
        }
    }
}

/// Account view returned to clients (without sensitive data)
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company_name: Option<String>,
    pub status: String,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
}

impl From<AccountWithCompany> for AccountResponse {
    fn from(row: AccountWithCompany) -> Self {
        Self {
            id: row.account.id,
            customer_id: row.account.customer_id,
            username: row.account.username,
            email: row.account.email,
            phone: row.account.phone,
            company_name: row.company_name,
            status: row.account.status,
            last_login_at: row.account.last_login_at,
            last_login_ip: row.account.last_login_ip,
        }
    }
}

/// Full profile for the current identity
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub role_id: Option<Uuid>,
    pub role_name: Option<String>,
    pub permissions: Vec<String>,
}
