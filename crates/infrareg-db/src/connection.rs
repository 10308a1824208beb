//! SurrealDB connection management and store openers.
//!
//! One namespace holds everything; each tenant gets its own database
//! within it (named by the tenant slug), and the shared catalog lives
//! in a reserved `catalog` database. Tenant handles are opened through
//! the [`StoreOpener`] seam so the request-scoped
//! [`infrareg_core::StoreManager`] can cache them.

use std::collections::HashMap;

use infrareg_core::error::{CoreError, CoreResult};
use infrareg_core::models::tenant::Tenant;
use infrareg_core::store::StoreOpener;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::store::SurrealTenantStore;

/// Reserved database name for the shared catalog store.
pub const CATALOG_DB: &str = "catalog";

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace holding all tenant databases.
    pub namespace: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "infrareg".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    async fn dial(&self, database: &str) -> Result<Surreal<Client>, surrealdb::Error> {
        let db = Surreal::new::<Ws>(&self.url).await?;
        db.signin(Root {
            username: self.username.clone(),
            password: self.password.clone(),
        })
        .await?;
        db.use_ns(&self.namespace).use_db(database).await?;
        Ok(db)
    }

    /// Open the shared catalog database.
    pub async fn connect_catalog(&self) -> Result<Surreal<Client>, surrealdb::Error> {
        info!(url = %self.url, namespace = %self.namespace, "connecting to catalog store");
        self.dial(CATALOG_DB).await
    }
}

/// Production opener: dials the server and selects the tenant's
/// database. Schema migrations run at provisioning time, not per open.
pub struct RemoteStoreOpener {
    config: DbConfig,
}

impl RemoteStoreOpener {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

impl StoreOpener for RemoteStoreOpener {
    type Store = SurrealTenantStore<Client>;

    async fn open(&self, tenant: &Tenant) -> CoreResult<Self::Store> {
        let db = self
            .config
            .dial(&tenant.id)
            .await
            .map_err(|e| CoreError::Store(e.to_string()))?;
        Ok(SurrealTenantStore::new(db))
    }
}

/// Opener over a fixed set of pre-connected handles, keyed by tenant
/// id. Used with embedded engines and in tests, where each "open" is a
/// cheap clone of the shared connection.
pub struct FixedStoreOpener<C: surrealdb::Connection> {
    stores: HashMap<String, Surreal<C>>,
}

impl<C: surrealdb::Connection> FixedStoreOpener<C> {
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
        }
    }

    pub fn insert(&mut self, tenant_id: impl Into<String>, db: Surreal<C>) {
        self.stores.insert(tenant_id.into(), db);
    }
}

impl<C: surrealdb::Connection> Default for FixedStoreOpener<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: surrealdb::Connection> StoreOpener for FixedStoreOpener<C> {
    type Store = SurrealTenantStore<C>;

    async fn open(&self, tenant: &Tenant) -> CoreResult<Self::Store> {
        let db = self
            .stores
            .get(&tenant.id)
            .ok_or_else(|| CoreError::Store(format!("no store backing tenant {}", tenant.id)))?;
        Ok(SurrealTenantStore::new(db.clone()))
    }
}
