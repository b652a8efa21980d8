//! # Roles
//!
//! Classification of role names into the capabilities the server enforces.
//!
//! Roles are stored as free-form names; [`RoleKind::from_name`] maps them,
//! including the names used by the legacy directory, to a fixed set.
//! [`Capabilities`] are display hints for clients. Authorization is always
//! re-checked server-side with [`require_hr`] and [`require_admin`].

use serde::{Deserialize, Serialize};

use crate::types::ReviewError;

/// The fixed set of role kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Employee,
    TeamLead,
    Director,
    Hr,
    Admin,
}

/// Accepted role names (compared case-insensitively) and their kind.
const ROLE_NAMES: &[(&str, RoleKind)] = &[
    ("employee", RoleKind::Employee),
    ("员工", RoleKind::Employee),
    ("team lead", RoleKind::TeamLead),
    ("组长", RoleKind::TeamLead),
    ("director", RoleKind::Director),
    ("center head", RoleKind::Director),
    ("总监", RoleKind::Director),
    ("中心负责人", RoleKind::Director),
    ("hr", RoleKind::Hr),
    ("人事", RoleKind::Hr),
    ("admin", RoleKind::Admin),
    ("管理员", RoleKind::Admin),
];

impl RoleKind {
    /// Classify a stored role name. Unknown names are plain employees.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let needle = name.trim().to_lowercase();
        ROLE_NAMES
            .iter()
            .find(|(known, _)| *known == needle)
            .map(|(_, kind)| *kind)
            .unwrap_or(Self::Employee)
    }

    /// Canonical display name, as seeded.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Employee => "Employee",
            Self::TeamLead => "Team Lead",
            Self::Director => "Center Head",
            Self::Hr => "HR",
            Self::Admin => "Admin",
        }
    }

    #[must_use]
    pub const fn is_manager(self) -> bool {
        matches!(self, Self::TeamLead | Self::Director)
    }

    /// HR views are open to HR and admins.
    #[must_use]
    pub const fn is_hr(self) -> bool {
        matches!(self, Self::Hr | Self::Admin)
    }

    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Menu hints for a client. Never used for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_view_team: bool,
    pub can_view_hr: bool,
    pub can_admin: bool,
}

impl Capabilities {
    #[must_use]
    pub const fn for_role(kind: RoleKind) -> Self {
        Self {
            can_view_team: kind.is_manager(),
            can_view_hr: kind.is_hr(),
            can_admin: kind.is_admin(),
        }
    }
}

/// Fail with `Forbidden` unless `kind` may see HR views.
pub fn require_hr(kind: RoleKind) -> Result<(), ReviewError> {
    if kind.is_hr() {
        Ok(())
    } else {
        Err(ReviewError::Forbidden("HR access required".to_string()))
    }
}

/// Fail with `Forbidden` unless `kind` is an admin.
pub fn require_admin(kind: RoleKind) -> Result<(), ReviewError> {
    if kind.is_admin() {
        Ok(())
    } else {
        Err(ReviewError::Forbidden("admin access required".to_string()))
    }
}
