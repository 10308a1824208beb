//! Tenant provisioning — superadmin-only directory mutations.
//!
//! All mutations rewrite the whole directory document through the
//! [`DirectoryStore`] seam and swap the in-process snapshot, so the
//! change is immediately visible to subsequent reads. Only superadmins
//! acting from the designated master tenant may call these.

use std::sync::Arc;

use chrono::Utc;
use infrareg_core::error::CoreError;
use infrareg_core::handles::StoreManager;
use infrareg_core::models::audit::{AuditOutcome, NewAuditEntry};
use infrareg_core::models::tenant::{CreateTenant, Tenant};
use infrareg_core::models::user::Role;
use infrareg_core::store::{DirectoryStore, StoreOpener};
use infrareg_core::{PlanCatalog, TenantDirectory};
use tracing::{info, warn};

use crate::error::{AuthError, AuthResult};
use crate::session::{Principal, record_audit};

pub struct TenantProvisioner<D: DirectoryStore> {
    directory: Arc<TenantDirectory>,
    catalog: Arc<PlanCatalog>,
    store: D,
    master_tenant: String,
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

impl<D: DirectoryStore> TenantProvisioner<D> {
    pub fn new(
        directory: Arc<TenantDirectory>,
        catalog: Arc<PlanCatalog>,
        store: D,
        master_tenant: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            catalog,
            store,
            master_tenant: master_tenant.into(),
        }
    }

    fn ensure_master_superadmin(&self, actor: &Principal) -> AuthResult<()> {
        if actor.role.has_role_or_higher(Role::Superadmin)
            && actor.tenant_id == self.master_tenant
        {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                section: "tenants".into(),
                action: "edit".into(),
            })
        }
    }

    /// Append a provisioning audit entry to the master tenant's store.
    /// Directory mutations are global, so they are recorded where the
    /// acting superadmin lives rather than in the affected tenant.
    async fn audit_master<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        action: &str,
        tenant_id: &str,
        before: serde_json::Value,
        after: serde_json::Value,
    ) {
        let Some(master) = self.directory.get(&self.master_tenant) else {
            warn!(tenant = %self.master_tenant, "master tenant not in directory, audit skipped");
            return;
        };
        match stores.get(&master).await {
            Ok(store) => {
                record_audit(
                    &store,
                    NewAuditEntry {
                        actor_id: Some(actor.user_id),
                        action: action.into(),
                        entity: "tenant".into(),
                        entity_id: Some(tenant_id.to_string()),
                        before,
                        after,
                        outcome: AuditOutcome::Success,
                        ip_address: None,
                    },
                )
                .await;
            }
            Err(e) => warn!(tenant = %master.id, error = %e, "master store unavailable, audit skipped"),
        }
    }

    /// Provision a new tenant directory entry. The tenant's store is
    /// created and migrated out of band (first open by the opener);
    /// this operation only makes the tenant visible to resolution.
    pub async fn create_tenant<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        input: CreateTenant,
    ) -> AuthResult<Tenant> {
        self.ensure_master_superadmin(actor)?;

        if !valid_slug(&input.id) {
            return Err(AuthError::Validation(format!(
                "invalid tenant slug: {}",
                input.id
            )));
        }
        if self.catalog.get(&input.plan_id).is_none() {
            return Err(AuthError::NotFound {
                entity: "plan".into(),
                id: input.plan_id,
            });
        }

        let tenant = Tenant {
            id: input.id.clone(),
            name: input.name,
            active: true,
            plan_id: input.plan_id,
            created_at: Utc::now(),
            settings: input.settings.unwrap_or_else(|| serde_json::json!({})),
        };

        let created = tenant.clone();
        self.directory
            .update_with(&self.store, move |tenants| {
                if tenants.iter().any(|t| t.id == tenant.id) {
                    return Err(CoreError::AlreadyExists {
                        entity: format!("tenant {}", tenant.id),
                    });
                }
                tenants.push(tenant);
                Ok(())
            })
            .await?;

        info!(tenant = %created.id, actor = %actor.user_id, "tenant provisioned");
        self.audit_master(
            stores,
            actor,
            "tenant.create",
            &created.id,
            serde_json::json!({}),
            serde_json::json!({ "name": &created.name, "plan_id": &created.plan_id }),
        )
        .await;
        Ok(created)
    }

    /// Flip a tenant's active flag. Deactivation removes the tenant
    /// from every federated scan without deleting any data.
    pub async fn set_active<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant_id: &str,
        active: bool,
    ) -> AuthResult<()> {
        self.ensure_master_superadmin(actor)?;

        let previous = self.directory.get(tenant_id).map(|t| t.active);
        let id = tenant_id.to_string();
        self.directory
            .update_with(&self.store, move |tenants| {
                let tenant = tenants
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or(CoreError::NotFound {
                        entity: "tenant".into(),
                        id,
                    })?;
                tenant.active = active;
                Ok(())
            })
            .await?;

        info!(tenant = tenant_id, active, actor = %actor.user_id, "tenant active flag changed");
        self.audit_master(
            stores,
            actor,
            "tenant.set_active",
            tenant_id,
            serde_json::json!({ "active": previous }),
            serde_json::json!({ "active": active }),
        )
        .await;
        Ok(())
    }

    /// Move a tenant to a different plan.
    pub async fn assign_plan<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant_id: &str,
        plan_id: &str,
    ) -> AuthResult<()> {
        self.ensure_master_superadmin(actor)?;

        if self.catalog.get(plan_id).is_none() {
            return Err(AuthError::NotFound {
                entity: "plan".into(),
                id: plan_id.to_string(),
            });
        }

        let previous = self.directory.get(tenant_id).map(|t| t.plan_id);
        let id = tenant_id.to_string();
        let plan = plan_id.to_string();
        self.directory
            .update_with(&self.store, move |tenants| {
                let tenant = tenants
                    .iter_mut()
                    .find(|t| t.id == id)
                    .ok_or(CoreError::NotFound {
                        entity: "tenant".into(),
                        id,
                    })?;
                tenant.plan_id = plan;
                Ok(())
            })
            .await?;

        info!(tenant = tenant_id, plan = plan_id, actor = %actor.user_id, "tenant plan reassigned");
        self.audit_master(
            stores,
            actor,
            "tenant.assign_plan",
            tenant_id,
            serde_json::json!({ "plan_id": previous }),
            serde_json::json!({ "plan_id": plan_id }),
        )
        .await;
        Ok(())
    }
}
