//! InfraReg Auth — tenant resolution, password authentication with
//! lockout and second factor, opaque session tokens, and the layered
//! authorization engine.

pub mod admin;
pub mod authz;
pub mod config;
pub mod error;
pub mod notify;
pub mod password;
pub mod provision;
pub mod resolver;
pub mod session;
pub mod token;

pub use admin::{NewUser, UserAdmin};
pub use authz::{Action, AuthorizationEngine};
pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use notify::{LogNotifier, Notifier};
pub use provision::TenantProvisioner;
pub use resolver::TenantResolver;
pub use session::{AuthOutcome, ClientMeta, Principal, SessionManager};
