//! SurrealDB store implementations.

mod audit;
mod directory;
mod grant;
mod plan;
mod session;
mod two_factor;
mod user;

use infrareg_core::store::TenantStore;
use surrealdb::{Connection, Surreal};

pub use audit::SurrealAuditStore;
pub use directory::SurrealDirectoryStore;
pub use grant::SurrealGrantStore;
pub use plan::SurrealPlanStore;
pub use session::SurrealSessionStore;
pub use two_factor::SurrealTwoFactorStore;
pub use user::SurrealUserStore;

/// One tenant's store handle: table seams bundled over a shared
/// connection. Cloning shares the connection.
pub struct SurrealTenantStore<C: Connection> {
    users: SurrealUserStore<C>,
    sessions: SurrealSessionStore<C>,
    two_factor: SurrealTwoFactorStore<C>,
    grants: SurrealGrantStore<C>,
    audit: SurrealAuditStore<C>,
}

impl<C: Connection> Clone for SurrealTenantStore<C> {
    fn clone(&self) -> Self {
        Self {
            users: self.users.clone(),
            sessions: self.sessions.clone(),
            two_factor: self.two_factor.clone(),
            grants: self.grants.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<C: Connection> SurrealTenantStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            users: SurrealUserStore::new(db.clone()),
            sessions: SurrealSessionStore::new(db.clone()),
            two_factor: SurrealTwoFactorStore::new(db.clone()),
            grants: SurrealGrantStore::new(db.clone()),
            audit: SurrealAuditStore::new(db),
        }
    }
}

impl<C: Connection> TenantStore for SurrealTenantStore<C> {
    type Users = SurrealUserStore<C>;
    type Sessions = SurrealSessionStore<C>;
    type TwoFactor = SurrealTwoFactorStore<C>;
    type Grants = SurrealGrantStore<C>;
    type Audit = SurrealAuditStore<C>;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn sessions(&self) -> &Self::Sessions {
        &self.sessions
    }

    fn two_factor(&self) -> &Self::TwoFactor {
        &self.two_factor
    }

    fn grants(&self) -> &Self::Grants {
        &self.grants
    }

    fn audit(&self) -> &Self::Audit {
        &self.audit
    }
}
