//! Subscription plan model.
//!
//! A plan controls which functional modules a tenant is entitled to,
//! independent of any individual user's role. Plans are read-mostly:
//! loaded once from the shared catalog document and refreshed on demand.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The set of modules a plan unlocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ModuleSet {
    /// Wildcard: every module, including ones added later.
    All,
    Named(BTreeSet<String>),
}

impl ModuleSet {
    pub fn contains(&self, module: &str) -> bool {
        match self {
            ModuleSet::All => true,
            ModuleSet::Named(set) => set.contains(module),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub modules: ModuleSet,
    /// Named numeric limits (e.g. `max_users`); -1 means unlimited.
    pub limits: BTreeMap<String, i64>,
    /// Named boolean feature toggles.
    pub features: BTreeMap<String, bool>,
}

impl Plan {
    pub fn allows_module(&self, module: &str) -> bool {
        self.modules.contains(module)
    }

    /// A limit value, `None` if the plan does not define it. -1 encodes
    /// "unlimited".
    pub fn limit(&self, name: &str) -> Option<i64> {
        self.limits.get(name).copied()
    }

    /// Whether a named numeric limit permits `current` more entries.
    pub fn within_limit(&self, name: &str, current: i64) -> bool {
        match self.limit(name) {
            None => true,
            Some(-1) => true,
            Some(max) => current < max,
        }
    }

    /// A boolean feature toggle; absent features are off.
    pub fn feature(&self, name: &str) -> bool {
        self.features.get(name).copied().unwrap_or(false)
    }
}
