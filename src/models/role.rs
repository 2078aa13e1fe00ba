//! Role and permission domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Role (scoped to one customer, soft-deleted)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_default: bool,
    pub status: String, // active, deleted
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role list item with the number of active accounts using it
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_system: bool,
    pub is_default: bool,
    pub user_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Role detail with permission codes
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDetail {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<String>,
}

/// Permission catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub module: String,
    pub sort_order: i32,
}

/// Permissions of one module
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionGroup {
    pub module: String,
    pub module_name: String,
    pub permissions: Vec<Permission>,
}

/// 模块显示名称
pub const MODULE_NAMES: &[(&str, &str)] = &[
    ("orders", "订单管理"),
    ("invoices", "账单管理"),
    ("tariffs", "运价查询"),
    ("exchange_rates", "汇率查询"),
    ("addresses", "地址簿"),
    ("shippers", "发货人"),
    ("api_keys", "API Key"),
    ("users", "用户管理"),
    ("roles", "角色管理"),
];

/// Display name for a module; unknown modules fall back to the raw key
pub fn module_display_name(module: &str) -> &str {
    MODULE_NAMES
        .iter()
        .find(|(key, _)| *key == module)
        .map(|(_, name)| *name)
        .unwrap_or(module)
}

/// Group catalog entries by module, keeping the order of first appearance.
/// Input is expected to be sorted by `sort_order`.
pub fn group_by_module(permissions: Vec<Permission>) -> Vec<PermissionGroup> {
    let mut groups: Vec<PermissionGroup> = Vec::new();

    for permission in permissions {
        match groups.iter_mut().find(|g| g.module == permission.module) {
            Some(group) => group.permissions.push(permission),
            None => groups.push(PermissionGroup {
                module: permission.module.clone(),
                module_name: module_display_name(&permission.module).to_string(),
                permissions: vec![permission],
            }),
        }
    }

    groups
}

/// Staff 角色默认权限：只读权限，不含用户和角色管理
pub fn is_staff_permission(code: &str) -> bool {
    code.ends_with(":view") && !code.starts_with("users:") && !code.starts_with("roles:")
}

pub const ADMIN_ROLE_NAME: &str = "Admin";
pub const STAFF_ROLE_NAME: &str = "Staff";

/// Create role request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl CreateRoleRequest {
    /// Trimmed role name, rejecting blanks
    pub fn normalized_name(&self) -> Result<String, AppError> {
        normalize_name(&self.name)
    }
}

/// Update role request. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRoleRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_default: Option<bool>,
    /// Replaces every association when present, even if empty
    pub permissions: Option<Vec<String>>,
}

/// Column values to write after merging an update into a stored role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePatch {
    pub name: String,
    pub description: Option<String>,
    pub is_default: bool,
}

impl RolePatch {
    pub fn renames(&self, role: &Role) -> bool {
        self.name != role.name
    }
}

impl UpdateRoleRequest {
    /// Merge the request into the current row
    pub fn merge_into(&self, role: &Role) -> Result<RolePatch, AppError> {
        let name = match &self.name {
            Some(name) => normalize_name(name)?,
            None => role.name.clone(),
        };

        if role.is_system && name != role.name {
            return Err(AppError::BadRequest("系统角色不能修改名称".to_string()));
        }

        // 空字符串表示清除描述
        let description = match &self.description {
            Some(d) if d.trim().is_empty() => None,
            Some(d) => Some(d.trim().to_string()),
            None => role.description.clone(),
        };

        Ok(RolePatch {
            name,
            description,
            is_default: self.is_default.unwrap_or(role.is_default),
        })
    }
}

fn normalize_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("角色名称不能为空"));
    }
    if name.chars().count() > 100 {
        return Err(AppError::validation("角色名称不能超过 100 个字符"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, is_system: bool) -> Role {
        let now = Utc::now();
        Role {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            name: name.to_string(),
            description: Some("desc".to_string()),
            is_system,
            is_default: false,
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn permission(code: &str, module: &str, sort_order: i32) -> Permission {
        Permission {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            module: module.to_string(),
            sort_order,
        }
    }

    #[test]
    fn test_staff_permission_filter() {
        assert!(is_staff_permission("orders:view"));
        assert!(is_staff_permission("api_keys:view"));
        assert!(!is_staff_permission("orders:create"));
        assert!(!is_staff_permission("users:view"));
        assert!(!is_staff_permission("roles:view"));
        assert!(!is_staff_permission("roles:manage"));
    }

    #[test]
    fn test_module_display_name() {
        assert_eq!(module_display_name("orders"), "订单管理");
        assert_eq!(module_display_name("warehouse"), "warehouse");
    }

    #[test]
    fn test_group_by_module_keeps_order() {
        let groups = group_by_module(vec![
            permission("orders:view", "orders", 10),
            permission("orders:create", "orders", 11),
            permission("invoices:view", "invoices", 20),
            permission("roles:view", "roles", 90),
        ]);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].module, "orders");
        assert_eq!(groups[0].module_name, "订单管理");
        assert_eq!(groups[0].permissions.len(), 2);
        assert_eq!(groups[1].module, "invoices");
        assert_eq!(groups[2].permissions[0].code, "roles:view");
    }

    #[test]
    fn test_merge_keeps_absent_fields() {
        let current = role("Ops", false);
        let patch = UpdateRoleRequest::default().merge_into(&current).unwrap();

        assert_eq!(patch.name, "Ops");
        assert_eq!(patch.description.as_deref(), Some("desc"));
        assert!(!patch.is_default);
        assert!(!patch.renames(&current));
    }

    #[test]
    fn test_merge_applies_fields() {
        let current = role("Ops", false);
        let req = UpdateRoleRequest {
            name: Some("  Finance ".to_string()),
            description: Some(String::new()),
            is_default: Some(true),
            permissions: None,
        };
        let patch = req.merge_into(&current).unwrap();

        assert_eq!(patch.name, "Finance");
        assert_eq!(patch.description, None);
        assert!(patch.is_default);
        assert!(patch.renames(&current));
    }

    #[test]
    fn test_merge_rejects_system_rename() {
        let current = role(ADMIN_ROLE_NAME, true);
        let req = UpdateRoleRequest {
            name: Some("Boss".to_string()),
            ..Default::default()
        };
        assert!(matches!(req.merge_into(&current), Err(AppError::BadRequest(_))));

        // 名称不变时允许修改其它字段
        let req = UpdateRoleRequest {
            name: Some(ADMIN_ROLE_NAME.to_string()),
            description: Some("all access".to_string()),
            ..Default::default()
        };
        assert!(req.merge_into(&current).is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let req: CreateRoleRequest = serde_json::from_str(r#"{"name":"   "}"#).unwrap();
        assert!(matches!(req.normalized_name(), Err(AppError::Validation(_))));
        assert!(!req.is_default);
        assert!(req.permissions.is_empty());
    }
}
