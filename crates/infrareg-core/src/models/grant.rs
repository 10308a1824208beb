//! Granular per-user permission grants.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A per-user CRUD grant on a named section, optionally narrowed to a
/// single field.
///
/// A `field = None` row is the section-level default. A field row
/// overrides it only for the view/edit bits of that field; create and
/// delete are section-scoped and never field-scoped. At most one row
/// exists per (user, section, field) triple. Rows for admin/superadmin
/// users are tolerated but never consulted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionGrant {
    pub user_id: Uuid,
    pub section: String,
    pub field: Option<String>,
    pub can_view: bool,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl PermissionGrant {
    /// Section-level grant with all bits cleared.
    pub fn deny_all(user_id: Uuid, section: impl Into<String>) -> Self {
        Self {
            user_id,
            section: section.into(),
            field: None,
            can_view: false,
            can_create: false,
            can_edit: false,
            can_delete: false,
        }
    }
}
