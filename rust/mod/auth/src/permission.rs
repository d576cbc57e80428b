//! Static role → permission table and role hierarchy queries.
//!
//! The catalog is fixed at compile time. String-keyed checks exist for
//! callers that receive permission names over the wire; unknown names are
//! never granted.

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::model::{Role, UnknownRole};

/// Every permission known to the deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    CrewsCreate,
    CrewsManage,
    CrewsDelete,
    AgentsCreate,
    AgentsManage,
    TasksCreate,
    TasksManage,
    UsersManage,
    SettingsManage,
}

impl Permission {
    pub const ALL: [Permission; 9] = [
        Permission::CrewsCreate,
        Permission::CrewsManage,
        Permission::CrewsDelete,
        Permission::AgentsCreate,
        Permission::AgentsManage,
        Permission::TasksCreate,
        Permission::TasksManage,
        Permission::UsersManage,
        Permission::SettingsManage,
    ];

    /// Wire name, e.g. `"crews:create"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::CrewsCreate => "crews:create",
            Permission::CrewsManage => "crews:manage",
            Permission::CrewsDelete => "crews:delete",
            Permission::AgentsCreate => "agents:create",
            Permission::AgentsManage => "agents:manage",
            Permission::TasksCreate => "tasks:create",
            Permission::TasksManage => "tasks:manage",
            Permission::UsersManage => "users:manage",
            Permission::SettingsManage => "settings:manage",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Permission::CrewsCreate => "Create new AI crews",
            Permission::CrewsManage => "Manage all AI crews",
            Permission::CrewsDelete => "Delete AI crews",
            Permission::AgentsCreate => "Create new AI agents",
            Permission::AgentsManage => "Manage all AI agents",
            Permission::TasksCreate => "Create new tasks",
            Permission::TasksManage => "Manage all tasks",
            Permission::UsersManage => "Manage user accounts",
            Permission::SettingsManage => "Manage system settings",
        }
    }

    /// Roles granted this permission.
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Permission::CrewsCreate | Permission::AgentsCreate | Permission::TasksCreate => {
                &[Role::Admin, Role::User]
            }
            Permission::TasksManage => &[Role::Admin, Role::Moderator],
            Permission::CrewsManage
            | Permission::CrewsDelete
            | Permission::AgentsManage
            | Permission::UsersManage
            | Permission::SettingsManage => &[Role::Admin],
        }
    }

    pub fn allows(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}

/// Returned when a string is not in the permission catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission: {0}")]
pub struct UnknownPermission(pub String);

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Catalog entry as exposed over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionEntry {
    pub name: Permission,
    pub description: &'static str,
    pub roles: &'static [Role],
}

/// The full permission catalog.
pub fn catalog() -> Vec<PermissionEntry> {
    Permission::ALL
        .into_iter()
        .map(|p| PermissionEntry {
            name: p,
            description: p.description(),
            roles: p.allowed_roles(),
        })
        .collect()
}

/// Check a permission by wire name. Unknown names are denied.
pub fn has_permission(role: Role, permission: &str) -> bool {
    permission
        .parse::<Permission>()
        .map(|p| p.allows(role))
        .unwrap_or(false)
}

/// True if `role` sits at or above `target` in the hierarchy.
pub fn has_higher_or_equal_role(role: Role, target: Role) -> bool {
    role.rank() >= target.rank()
}

/// All permissions granted to `role`, in catalog order.
pub fn role_permissions(role: Role) -> Vec<Permission> {
    Permission::ALL
        .into_iter()
        .filter(|p| p.allows(role))
        .collect()
}

/// True if `role` names one of the known roles.
pub fn is_valid_role(role: &str) -> bool {
    parse_role(role).is_ok()
}

pub fn parse_role(role: &str) -> Result<Role, UnknownRole> {
    role.parse()
}
