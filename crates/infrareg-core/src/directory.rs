//! In-process tenant directory snapshot.
//!
//! The directory is read on every tenant resolution and token
//! validation, and written only by administrative provisioning. Reads
//! take an `Arc` snapshot under a read lock; writes persist the whole
//! document through the [`DirectoryStore`] seam and then swap in a new
//! immutable snapshot. A separate async writer gate serializes writers
//! without holding the snapshot lock across I/O.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::{CoreError, CoreResult};
use crate::store::DirectoryStore;
use crate::models::tenant::Tenant;

pub struct TenantDirectory {
    snapshot: RwLock<Arc<Vec<Tenant>>>,
    writer: Mutex<()>,
}

impl TenantDirectory {
    pub fn new(tenants: Vec<Tenant>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(tenants)),
            writer: Mutex::new(()),
        }
    }

    /// Load the directory document and build a snapshot around it.
    pub async fn load_from<D: DirectoryStore>(store: &D) -> CoreResult<Self> {
        let tenants = store.load().await?;
        Ok(Self::new(tenants))
    }

    /// The current immutable snapshot, in stored order.
    pub fn snapshot(&self) -> Arc<Vec<Tenant>> {
        self.snapshot.read().clone()
    }

    pub fn get(&self, tenant_id: &str) -> Option<Tenant> {
        self.snapshot
            .read()
            .iter()
            .find(|t| t.id == tenant_id)
            .cloned()
    }

    /// Active tenants in stored order — the federated-scan iteration set.
    pub fn active(&self) -> Vec<Tenant> {
        self.snapshot
            .read()
            .iter()
            .filter(|t| t.active)
            .cloned()
            .collect()
    }

    /// Apply `mutate` to a copy of the current list, persist the result
    /// whole, then swap it in as the new snapshot. Writers are
    /// serialized; the new state is immediately visible to subsequent
    /// reads.
    pub async fn update_with<D, F>(&self, store: &D, mutate: F) -> CoreResult<Vec<Tenant>>
    where
        D: DirectoryStore,
        F: FnOnce(&mut Vec<Tenant>) -> CoreResult<()>,
    {
        let _gate = self.writer.lock().await;
        let mut tenants = self.snapshot().as_ref().clone();
        mutate(&mut tenants)?;
        store.replace(tenants.clone()).await?;
        *self.snapshot.write() = Arc::new(tenants.clone());
        Ok(tenants)
    }

    /// Re-read the persisted document and swap it in.
    pub async fn reload<D: DirectoryStore>(&self, store: &D) -> CoreResult<()> {
        let _gate = self.writer.lock().await;
        let tenants = store.load().await?;
        *self.snapshot.write() = Arc::new(tenants);
        Ok(())
    }

    /// Lookup that treats a missing tenant as an error (fail-closed
    /// call sites).
    pub fn require(&self, tenant_id: &str) -> CoreResult<Tenant> {
        self.get(tenant_id).ok_or_else(|| CoreError::NotFound {
            entity: "tenant".into(),
            id: tenant_id.into(),
        })
    }
}
