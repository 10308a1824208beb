//! Tenant resolution by email — the federated scan.
//!
//! Tenant isolation means there is no global user index and email is
//! not globally unique, so resolution probes each active tenant's store
//! in directory order until the first legitimate hit. The scan is
//! O(#tenants) per call by design; the request-scoped
//! [`StoreManager`] keeps it to at most one open per tenant. An index
//! keyed by email hash would remove the scan at the cost of a second
//! denormalized store — a future optimization, deliberately not built.

use std::sync::Arc;

use infrareg_core::handles::StoreManager;
use infrareg_core::models::tenant::Tenant;
use infrareg_core::store::{StoreOpener, TenantStore, UserStore};
use infrareg_core::TenantDirectory;
use tracing::warn;

/// Lowercase and trim an email before any lookup or storage.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub struct TenantResolver {
    directory: Arc<TenantDirectory>,
}

impl TenantResolver {
    pub fn new(directory: Arc<TenantDirectory>) -> Self {
        Self { directory }
    }

    /// The first active tenant in directory order whose store contains
    /// an active user with this email, or `None`.
    ///
    /// A tenant store that fails to open or query is treated as "no
    /// match in this tenant": one broken tenant must never abort
    /// resolution for a login destined for a healthy one.
    pub async fn resolve_by_email<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        email: &str,
    ) -> Option<Tenant> {
        let email = normalize_email(email);

        for tenant in self.directory.active() {
            let store = match stores.get(&tenant).await {
                Ok(store) => store,
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "tenant store unavailable, scan continues");
                    continue;
                }
            };
            match store.users().find_by_email(&email).await {
                Ok(Some(user)) if user.active => return Some(tenant),
                Ok(_) => continue,
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "tenant store probe failed, scan continues");
                    continue;
                }
            }
        }
        None
    }
}
