//! Audit log domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Failure,
    Denied,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Success => "Success",
            AuditOutcome::Failure => "Failure",
            AuditOutcome::Denied => "Denied",
        }
    }

    pub fn parse(s: &str) -> Option<AuditOutcome> {
        match s {
            "Success" => Some(AuditOutcome::Success),
            "Failure" => Some(AuditOutcome::Failure),
            "Denied" => Some(AuditOutcome::Denied),
            _ => None,
        }
    }
}

/// An append-only record of a security-relevant mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    /// The acting principal; `None` for pre-authentication events
    /// (e.g. a lockout triggered by an anonymous caller).
    pub actor_id: Option<Uuid>,
    /// Verb, e.g. `session.force_reset` or `permissions.replace`.
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    /// State images around the mutation.
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Fields for appending a new entry (id/timestamp are store-assigned).
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub outcome: AuditOutcome,
    pub ip_address: Option<String>,
}
