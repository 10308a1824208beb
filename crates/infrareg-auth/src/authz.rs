//! Authorization engine — the layered decision procedure.
//!
//! Resolution order, short-circuiting:
//! 1. Role: superadmin passes unconditionally; admin skips granular
//!    grants but NOT plan gating.
//! 2. Plan gating: the tenant's plan must include the section's module
//!    (or be the wildcard set). Module access is a subscription
//!    property, not a role property, so this applies to admins too.
//! 3. Granular grants (non-admin roles only): section-level row is the
//!    default; a field row overrides only the view/edit bits of that
//!    field. Absence of a grant row is an implicit deny.
//!
//! Every ambiguity — unknown tenant, inactive tenant, unresolvable
//! plan, missing grant — denies. Fail-closed, never fail-open.

use std::sync::Arc;

use infrareg_core::handles::StoreManager;
use infrareg_core::models::audit::{AuditOutcome, NewAuditEntry};
use infrareg_core::models::grant::PermissionGrant;
use infrareg_core::models::user::Role;
use infrareg_core::store::{AuditStore, GrantStore, StoreOpener, TenantStore};
use infrareg_core::{PlanCatalog, TenantDirectory};
use tracing::warn;
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::session::Principal;

/// A protected operation on a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

pub struct AuthorizationEngine {
    directory: Arc<TenantDirectory>,
    catalog: Arc<PlanCatalog>,
}

impl AuthorizationEngine {
    pub fn new(directory: Arc<TenantDirectory>, catalog: Arc<PlanCatalog>) -> Self {
        Self { directory, catalog }
    }

    /// May `principal` perform `action` on `section` (optionally on one
    /// `field` within it)? `Ok(())` means allowed; every denial carries
    /// its reason.
    pub async fn authorize<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        principal: &Principal,
        section: &str,
        action: Action,
        field: Option<&str>,
    ) -> AuthResult<()> {
        // 1. Role check.
        if principal.role == Role::Superadmin {
            return Ok(());
        }

        // 2. Plan/module gating, fail-closed on anything unresolvable.
        let module_denied = || AuthError::ModuleNotAvailable {
            section: section.to_string(),
        };
        let tenant = self
            .directory
            .get(&principal.tenant_id)
            .filter(|t| t.active)
            .ok_or_else(module_denied)?;
        let plan = self.catalog.get(&tenant.plan_id).ok_or_else(module_denied)?;
        if !plan.allows_module(section) {
            return Err(module_denied());
        }

        // 3. Granular grants; admins pass once the plan clears.
        if principal.role >= Role::Admin {
            return Ok(());
        }

        let store = stores.get(&tenant).await?;
        let section_grant = store
            .grants()
            .find(principal.user_id, section, None)
            .await?;

        let section_bit = |pick: fn(&PermissionGrant) -> bool| {
            section_grant.as_ref().map(pick).unwrap_or(false)
        };

        let allowed = match action {
            // View/edit honor a field-level override when one exists.
            Action::View | Action::Edit => {
                let field_grant = match field {
                    Some(f) => store.grants().find(principal.user_id, section, Some(f)).await?,
                    None => None,
                };
                let pick: fn(&PermissionGrant) -> bool = match action {
                    Action::View => |g| g.can_view,
                    _ => |g| g.can_edit,
                };
                match field_grant {
                    Some(ref g) => pick(g),
                    None => section_bit(pick),
                }
            }
            // Create/delete are section-scoped, never field-scoped.
            Action::Create => section_bit(|g| g.can_create),
            Action::Delete => section_bit(|g| g.can_delete),
        };

        if allowed {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                section: section.to_string(),
                action: action.as_str().to_string(),
            })
        }
    }

    /// Replace a user's entire grant set atomically (clear-then-insert
    /// in one store transaction): a partial update can never leave a
    /// mix of old and new grants. Grants for admin/superadmin users are
    /// accepted but have no effect by construction of the resolution
    /// order.
    pub async fn set_permissions<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant_id: &str,
        user_id: Uuid,
        grants: Vec<PermissionGrant>,
    ) -> AuthResult<()> {
        if !actor.role.has_role_or_higher(Role::Admin) {
            return Err(AuthError::PermissionDenied {
                section: "permissions".into(),
                action: "edit".into(),
            });
        }

        // At most one row per (user, section, field) triple.
        let mut seen = std::collections::BTreeSet::new();
        for grant in &grants {
            if !seen.insert((grant.section.clone(), grant.field.clone())) {
                return Err(AuthError::Validation(format!(
                    "duplicate grant for section '{}'",
                    grant.section
                )));
            }
        }
        let grants: Vec<PermissionGrant> = grants
            .into_iter()
            .map(|mut g| {
                g.user_id = user_id;
                g
            })
            .collect();

        let tenant = self.directory.require(tenant_id)?;
        let store = stores.get(&tenant).await?;
        let count = grants.len();
        store.grants().replace_for_user(user_id, grants).await?;

        if let Err(e) = store
            .audit()
            .append(NewAuditEntry {
                actor_id: Some(actor.user_id),
                action: "permissions.replace".into(),
                entity: "permission_grant".into(),
                entity_id: Some(user_id.to_string()),
                before: serde_json::json!({}),
                after: serde_json::json!({ "grants": count }),
                outcome: AuditOutcome::Success,
                ip_address: None,
            })
            .await
        {
            warn!(error = %e, "audit append failed");
        }
        Ok(())
    }

    /// Threshold check plus master-tenant gate for operations that are
    /// only meaningful there (tenant provisioning and the like).
    pub fn require_master_role(
        &self,
        principal: &Principal,
        required: Role,
        master_tenant: &str,
    ) -> AuthResult<()> {
        if principal.role.has_role_or_higher(required) && principal.tenant_id == master_tenant {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                section: "tenants".into(),
                action: "edit".into(),
            })
        }
    }
}
