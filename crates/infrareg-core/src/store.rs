//! Store trait definitions for data access abstraction.
//!
//! Unlike a shared-database design, every tenant owns an isolated store,
//! so these traits are already tenant-scoped: a handle obtained for
//! tenant A can never read tenant B's rows. All operations are async.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{
    audit::{AuditEntry, NewAuditEntry},
    grant::PermissionGrant,
    plan::Plan,
    session::{CreateSession, Session},
    tenant::Tenant,
    two_factor::{CreateTwoFactorCode, TwoFactorCode},
    user::{CreateUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Tenant-store table seams
// ---------------------------------------------------------------------------

pub trait UserStore: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CoreResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<User>> + Send;
    /// Lookup by lowercased email. `Ok(None)` is the normal "no such
    /// user here" outcome that keeps a federated scan moving.
    fn find_by_email(&self, email: &str)
    -> impl Future<Output = CoreResult<Option<User>>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = CoreResult<User>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<User>>> + Send;

    fn set_password_hash(
        &self,
        id: Uuid,
        password_hash: String,
    ) -> impl Future<Output = CoreResult<()>> + Send;

    /// Single-row read-modify-write increment; returns the new counter.
    fn increment_failed_logins(&self, id: Uuid) -> impl Future<Output = CoreResult<u32>> + Send;
    /// Zeroes the failure counter and clears the lockout without
    /// stamping a login (password verified, second factor still open).
    fn reset_failed_logins(&self, id: Uuid) -> impl Future<Output = CoreResult<()>> + Send;
    fn set_locked_until(
        &self,
        id: Uuid,
        locked_until: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<()>> + Send;
    /// Resets the failure counter, clears the lockout, stamps last login.
    fn record_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<()>> + Send;
}

pub trait SessionStore: Send + Sync {
    fn create(&self, input: CreateSession) -> impl Future<Output = CoreResult<Session>> + Send;
    fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = CoreResult<Option<Session>>> + Send;
    /// Idempotent: deleting a token with no row is not an error.
    fn delete_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = CoreResult<()>> + Send;
    /// Drop every session for a user (password reset, deactivation).
    fn delete_for_user(&self, user_id: Uuid) -> impl Future<Output = CoreResult<u64>> + Send;
    /// Maintenance only; never part of token validation.
    fn delete_expired(&self) -> impl Future<Output = CoreResult<u64>> + Send;
}

pub trait TwoFactorStore: Send + Sync {
    fn create(
        &self,
        input: CreateTwoFactorCode,
    ) -> impl Future<Output = CoreResult<TwoFactorCode>> + Send;
    /// Newest unused code for the user, expired or not.
    fn newest_pending(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = CoreResult<Option<TwoFactorCode>>> + Send;
    fn mark_used(&self, id: Uuid) -> impl Future<Output = CoreResult<()>> + Send;
    /// Single-row increment; returns the new attempt count.
    fn increment_attempts(&self, id: Uuid) -> impl Future<Output = CoreResult<u32>> + Send;
    /// Mark every unused code for the user as used (resend path).
    fn invalidate_all(&self, user_id: Uuid) -> impl Future<Output = CoreResult<u64>> + Send;
}

pub trait GrantStore: Send + Sync {
    fn for_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = CoreResult<Vec<PermissionGrant>>> + Send;
    fn find(
        &self,
        user_id: Uuid,
        section: &str,
        field: Option<&str>,
    ) -> impl Future<Output = CoreResult<Option<PermissionGrant>>> + Send;
    /// Atomically replace the user's entire grant set (clear-then-insert
    /// in one transaction). A reader sees fully-old or fully-new, never
    /// a mix.
    fn replace_for_user(
        &self,
        user_id: Uuid,
        grants: Vec<PermissionGrant>,
    ) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Query filters for audit log entries.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub trait AuditStore: Send + Sync {
    /// Append a new entry. No update or delete operations exist.
    fn append(&self, input: NewAuditEntry) -> impl Future<Output = CoreResult<AuditEntry>> + Send;
    fn list(
        &self,
        filter: AuditFilter,
        pagination: Pagination,
    ) -> impl Future<Output = CoreResult<PaginatedResult<AuditEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// Per-tenant store bundle and opener
// ---------------------------------------------------------------------------

/// A handle to one tenant's isolated store, bundling its tables.
///
/// Handles are cheap to clone (they share one underlying connection).
pub trait TenantStore: Send + Sync + Clone {
    type Users: UserStore;
    type Sessions: SessionStore;
    type TwoFactor: TwoFactorStore;
    type Grants: GrantStore;
    type Audit: AuditStore;

    fn users(&self) -> &Self::Users;
    fn sessions(&self) -> &Self::Sessions;
    fn two_factor(&self) -> &Self::TwoFactor;
    fn grants(&self) -> &Self::Grants;
    fn audit(&self) -> &Self::Audit;
}

/// Opens a connection to a tenant's store.
///
/// The production implementation dials the database server and selects
/// the tenant's database; tests substitute a pre-seeded in-memory
/// opener. Callers go through [`crate::handles::StoreManager`], which
/// caches one handle per tenant per logical request.
pub trait StoreOpener: Send + Sync {
    type Store: TenantStore;

    fn open(&self, tenant: &Tenant) -> impl Future<Output = CoreResult<Self::Store>> + Send;
}

// ---------------------------------------------------------------------------
// Shared catalog documents
// ---------------------------------------------------------------------------

/// Persistence seam for the tenant directory document. The document is
/// always loaded and replaced whole; there are no partial updates.
pub trait DirectoryStore: Send + Sync {
    fn load(&self) -> impl Future<Output = CoreResult<Vec<Tenant>>> + Send;
    fn replace(&self, tenants: Vec<Tenant>) -> impl Future<Output = CoreResult<()>> + Send;
}

/// Persistence seam for the plan catalog document. Same whole-document
/// discipline as [`DirectoryStore`].
pub trait PlanStore: Send + Sync {
    fn load(&self) -> impl Future<Output = CoreResult<Vec<Plan>>> + Send;
    fn replace(&self, plans: Vec<Plan>) -> impl Future<Output = CoreResult<()>> + Send;
}
