//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse privilege level. The ordering is meaningful: higher roles
/// subsume lower ones for threshold checks, and admin/superadmin bypass
/// granular grants entirely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Guest = 0,
    User = 1,
    Operator = 2,
    Admin = 3,
    Superadmin = 4,
}

impl Role {
    /// Threshold check for call sites that need "this role or higher"
    /// rather than the full section/action decision procedure.
    pub fn has_role_or_higher(self, required: Role) -> bool {
        self >= required
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Operator => "operator",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "guest" => Some(Role::Guest),
            "user" => Some(Role::User),
            "operator" => Some(Role::Operator),
            "admin" => Some(Role::Admin),
            "superadmin" => Some(Role::Superadmin),
            _ => None,
        }
    }
}

/// Delivery channel for second-factor codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TwoFactorMethod {
    Email,
    Sms,
}

impl TwoFactorMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            TwoFactorMethod::Email => "email",
            TwoFactorMethod::Sms => "sms",
        }
    }

    pub fn parse(s: &str) -> Option<TwoFactorMethod> {
        match s {
            "email" => Some(TwoFactorMethod::Email),
            "sms" => Some(TwoFactorMethod::Sms),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique within the tenant store, stored lowercased. The same
    /// address may legitimately exist in a different tenant's store.
    pub email: String,
    /// Tagged hash string — legacy SHA-256 hex digest or Argon2id PHC.
    pub password_hash: String,
    pub role: Role,
    /// Soft-delete flag; users are never hard-deleted.
    pub active: bool,
    pub two_factor_enabled: bool,
    pub two_factor_method: TwoFactorMethod,
    /// Where second-factor codes are delivered (email address or phone
    /// number). Defaults to the account email.
    pub two_factor_destination: Option<String>,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the failed-login lockout window is still open.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Destination for second-factor dispatch.
    pub fn two_factor_destination(&self) -> &str {
        self.two_factor_destination.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    /// Pre-hashed password (the auth crate owns hashing).
    pub password_hash: String,
    pub role: Role,
    pub two_factor_enabled: bool,
    pub two_factor_method: TwoFactorMethod,
    pub two_factor_destination: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub two_factor_enabled: Option<bool>,
    pub two_factor_method: Option<TwoFactorMethod>,
    /// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
    pub two_factor_destination: Option<Option<String>>,
}
