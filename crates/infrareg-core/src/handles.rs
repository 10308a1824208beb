//! Request-scoped tenant store handle cache.
//!
//! One `StoreManager` lives for the duration of a single logical
//! request and is owned by it — it is never shared across requests, so
//! it needs `&mut` access rather than locks. The first request for a
//! tenant opens a connection through the [`StoreOpener`]; subsequent
//! requests within the same lifetime reuse the cached handle. This is
//! what makes federated scans affordable: probing N tenants opens at
//! most N connections per request, never re-opened.

use std::collections::HashMap;

use tracing::debug;

use crate::error::CoreResult;
use crate::store::StoreOpener;
#[cfg(test)]
use crate::store::TenantStore;
use crate::models::tenant::Tenant;

pub struct StoreManager<O: StoreOpener> {
    opener: O,
    handles: HashMap<String, O::Store>,
}

impl<O: StoreOpener> StoreManager<O> {
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            handles: HashMap::new(),
        }
    }

    /// Handle for a tenant's store, opened lazily and cached for the
    /// rest of this request.
    pub async fn get(&mut self, tenant: &Tenant) -> CoreResult<O::Store> {
        if let Some(handle) = self.handles.get(&tenant.id) {
            return Ok(handle.clone());
        }
        let handle = self.opener.open(tenant).await?;
        debug!(tenant = %tenant.id, "opened tenant store handle");
        self.handles.insert(tenant.id.clone(), handle.clone());
        Ok(handle)
    }

    /// Number of handles opened so far in this request.
    pub fn open_count(&self) -> usize {
        self.handles.len()
    }

    /// End-of-request teardown. Handles close when dropped; teardown
    /// must never mask the response being returned, so this logs and
    /// cannot fail.
    pub fn finish(mut self) {
        let count = self.handles.len();
        self.handles.clear();
        debug!(handles = count, "closed tenant store handles");
    }
}
