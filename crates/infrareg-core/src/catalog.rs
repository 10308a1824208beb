//! In-process plan catalog snapshot.
//!
//! Same snapshot-swap discipline as [`crate::directory`]: cheap
//! concurrent reads of an immutable `Arc`, single-writer reloads.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::error::CoreResult;
use crate::store::PlanStore;
use crate::models::plan::Plan;

pub struct PlanCatalog {
    snapshot: RwLock<Arc<BTreeMap<String, Plan>>>,
    writer: Mutex<()>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        let map = plans.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            snapshot: RwLock::new(Arc::new(map)),
            writer: Mutex::new(()),
        }
    }

    pub async fn load_from<P: PlanStore>(store: &P) -> CoreResult<Self> {
        let plans = store.load().await?;
        Ok(Self::new(plans))
    }

    pub fn get(&self, plan_id: &str) -> Option<Plan> {
        self.snapshot.read().get(plan_id).cloned()
    }

    pub fn snapshot(&self) -> Arc<BTreeMap<String, Plan>> {
        self.snapshot.read().clone()
    }

    /// Re-read the catalog document on demand and swap it in.
    pub async fn reload<P: PlanStore>(&self, store: &P) -> CoreResult<()> {
        let _gate = self.writer.lock().await;
        let plans = store.load().await?;
        let map = plans.into_iter().map(|p| (p.id.clone(), p)).collect();
        *self.snapshot.write() = Arc::new(map);
        Ok(())
    }
}
