//! Tenant directory entry.
//!
//! Each tenant is an isolated customer organization with its own data
//! store. Tenant metadata lives in a single shared directory document,
//! not in any tenant store; the directory is always rewritten whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tenant as recorded in the shared directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    /// Stable, globally unique slug (e.g. `acme-utilities`). Doubles as
    /// the name of the tenant's database.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Inactive tenants are skipped by tenant resolution and token
    /// validation; deactivation never deletes the entry.
    pub active: bool,
    /// The subscription plan this tenant is on.
    pub plan_id: String,
    pub created_at: DateTime<Utc>,
    /// Branding and tenant-level settings blob.
    pub settings: serde_json::Value,
}

/// Fields required to provision a new tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTenant {
    pub id: String,
    pub name: String,
    pub plan_id: String,
    pub settings: Option<serde_json::Value>,
}
