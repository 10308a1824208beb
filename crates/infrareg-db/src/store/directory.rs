//! SurrealDB implementation of [`DirectoryStore`].
//!
//! The tenant directory is one document record in the shared catalog
//! store. Writes rewrite the whole document; there are no partial
//! updates.

use infrareg_core::error::CoreResult;
use infrareg_core::models::tenant::Tenant;
use infrareg_core::store::DirectoryStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct DirectoryDoc {
    tenants: serde_json::Value,
}

/// SurrealDB implementation of the tenant directory document.
pub struct SurrealDirectoryStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealDirectoryStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealDirectoryStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> DirectoryStore for SurrealDirectoryStore<C> {
    async fn load(&self) -> CoreResult<Vec<Tenant>> {
        let mut result = self
            .db
            .query("SELECT tenants FROM type::record('tenant_directory', 'main')")
            .await
            .map_err(StoreError::from)?;

        let docs: Vec<DirectoryDoc> = result.take(0).map_err(StoreError::from)?;
        match docs.into_iter().next() {
            Some(doc) => Ok(serde_json::from_value(doc.tenants)
                .map_err(|e| StoreError::Decode(format!("directory document: {e}")))?),
            None => Ok(Vec::new()),
        }
    }

    async fn replace(&self, tenants: Vec<Tenant>) -> CoreResult<()> {
        let doc = serde_json::to_value(&tenants)
            .map_err(|e| StoreError::Decode(format!("directory document: {e}")))?;

        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE tenant_directory; \
                 CREATE type::record('tenant_directory', 'main') SET tenants = $tenants; \
                 COMMIT TRANSACTION;",
            )
            .bind(("tenants", doc))
            .await
            .map_err(StoreError::from)?;

        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }
}
