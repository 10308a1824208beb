//! SurrealDB implementation of [`PlanStore`].
//!
//! Same whole-document discipline as the tenant directory: one record,
//! loaded and replaced as a unit, reload-on-demand.

use infrareg_core::error::CoreResult;
use infrareg_core::models::plan::Plan;
use infrareg_core::store::PlanStore;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::StoreError;

#[derive(Debug, SurrealValue)]
struct CatalogDoc {
    plans: serde_json::Value,
}

/// SurrealDB implementation of the plan catalog document.
pub struct SurrealPlanStore<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> Clone for SurrealPlanStore<C> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<C: Connection> SurrealPlanStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PlanStore for SurrealPlanStore<C> {
    async fn load(&self) -> CoreResult<Vec<Plan>> {
        let mut result = self
            .db
            .query("SELECT plans FROM type::record('plan_catalog', 'main')")
            .await
            .map_err(StoreError::from)?;

        let docs: Vec<CatalogDoc> = result.take(0).map_err(StoreError::from)?;
        match docs.into_iter().next() {
            Some(doc) => Ok(serde_json::from_value(doc.plans)
                .map_err(|e| StoreError::Decode(format!("plan catalog document: {e}")))?),
            None => Ok(Vec::new()),
        }
    }

    async fn replace(&self, plans: Vec<Plan>) -> CoreResult<()> {
        let doc = serde_json::to_value(&plans)
            .map_err(|e| StoreError::Decode(format!("plan catalog document: {e}")))?;

        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE plan_catalog; \
                 CREATE type::record('plan_catalog', 'main') SET plans = $plans; \
                 COMMIT TRANSACTION;",
            )
            .bind(("plans", doc))
            .await
            .map_err(StoreError::from)?;

        result
            .check()
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(())
    }
}
