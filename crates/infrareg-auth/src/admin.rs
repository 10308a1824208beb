//! User administration inside a tenant — account creation and role
//! changes, gated on the acting principal's own role.

use infrareg_core::handles::StoreManager;
use infrareg_core::models::audit::{AuditOutcome, NewAuditEntry};
use infrareg_core::models::tenant::Tenant;
use infrareg_core::models::user::{CreateUser, Role, TwoFactorMethod, UpdateUser, User};
use infrareg_core::store::{SessionStore, StoreOpener, TenantStore, UserStore};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::password;
use crate::resolver::normalize_email;
use crate::session::{Principal, record_audit};

pub struct UserAdmin {
    config: AuthConfig,
}

/// Input for [`UserAdmin::create_user`]; the plaintext initial password
/// is hashed here, never stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub two_factor_enabled: bool,
    pub two_factor_method: TwoFactorMethod,
    pub two_factor_destination: Option<String>,
}

impl UserAdmin {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    fn ensure_admin(&self, actor: &Principal, tenant: &Tenant) -> AuthResult<()> {
        if actor.tenant_id == tenant.id && actor.role.has_role_or_higher(Role::Admin) {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied {
                section: "users".into(),
                action: "edit".into(),
            })
        }
    }

    /// Create an account in the tenant's store. The email is
    /// normalized; uniqueness is per tenant, enforced both here and by
    /// the store's unique index.
    pub async fn create_user<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant: &Tenant,
        input: NewUser,
    ) -> AuthResult<User> {
        self.ensure_admin(actor, tenant)?;

        let email = normalize_email(&input.email);
        if !email.contains('@') {
            return Err(AuthError::Validation(format!("invalid email: {email}")));
        }
        if input.password.len() < self.config.min_password_length {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_length
            )));
        }
        // An admin may not mint accounts above their own role.
        if input.role > actor.role {
            return Err(AuthError::PermissionDenied {
                section: "users".into(),
                action: "create".into(),
            });
        }

        let store = stores.get(tenant).await?;
        if store.users().find_by_email(&email).await?.is_some() {
            return Err(AuthError::Validation(format!(
                "email already registered: {email}"
            )));
        }

        let password_hash =
            password::hash_password(&input.password, self.config.pepper.as_deref())?;
        let user = store
            .users()
            .create(CreateUser {
                email,
                password_hash,
                role: input.role,
                two_factor_enabled: input.two_factor_enabled,
                two_factor_method: input.two_factor_method,
                two_factor_destination: input.two_factor_destination,
            })
            .await?;

        record_audit(
            &store,
            NewAuditEntry {
                actor_id: Some(actor.user_id),
                action: "user.create".into(),
                entity: "user".into(),
                entity_id: Some(user.id.to_string()),
                before: serde_json::json!({}),
                after: serde_json::json!({
                    "email": user.email,
                    "role": user.role.as_str(),
                }),
                outcome: AuditOutcome::Success,
                ip_address: None,
            },
        )
        .await;

        Ok(user)
    }

    /// Change a user's role. Demotion below `User` and promotion above
    /// the actor's own role are both refused. Active sessions survive a
    /// role change; the new role takes effect at the next token
    /// validation.
    pub async fn change_role<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant: &Tenant,
        user_id: Uuid,
        role: Role,
    ) -> AuthResult<User> {
        self.ensure_admin(actor, tenant)?;
        if role > actor.role {
            return Err(AuthError::PermissionDenied {
                section: "users".into(),
                action: "edit".into(),
            });
        }

        let store = stores.get(tenant).await?;
        let before = store.users().get_by_id(user_id).await?;
        let after = store
            .users()
            .update(
                user_id,
                UpdateUser {
                    role: Some(role),
                    ..UpdateUser::default()
                },
            )
            .await?;

        record_audit(
            &store,
            NewAuditEntry {
                actor_id: Some(actor.user_id),
                action: "user.change_role".into(),
                entity: "user".into(),
                entity_id: Some(user_id.to_string()),
                before: serde_json::json!({ "role": before.role.as_str() }),
                after: serde_json::json!({ "role": after.role.as_str() }),
                outcome: AuditOutcome::Success,
                ip_address: None,
            },
        )
        .await;

        Ok(after)
    }

    /// Self-service password change. The caller proves knowledge of the
    /// current password; every other session for the account is dropped
    /// so a stolen token cannot outlive the change.
    pub async fn change_password<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant: &Tenant,
        current: &str,
        new: &str,
    ) -> AuthResult<()> {
        if actor.tenant_id != tenant.id {
            return Err(AuthError::PermissionDenied {
                section: "users".into(),
                action: "edit".into(),
            });
        }
        if new.len() < self.config.min_password_length {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_length
            )));
        }

        let pepper = self.config.pepper.as_deref();
        let store = stores.get(tenant).await?;
        let user = store.users().get_by_id(actor.user_id).await?;
        let outcome = password::verify_password(current, &user.password_hash, pepper)?;
        if !outcome.valid {
            return Err(AuthError::InvalidCredentials);
        }

        let hash = password::hash_password(new, pepper)?;
        store.users().set_password_hash(actor.user_id, hash).await?;
        store.sessions().delete_for_user(actor.user_id).await?;

        record_audit(
            &store,
            NewAuditEntry {
                actor_id: Some(actor.user_id),
                action: "user.change_password".into(),
                entity: "user".into(),
                entity_id: Some(actor.user_id.to_string()),
                before: serde_json::json!({}),
                after: serde_json::json!({}),
                outcome: AuditOutcome::Success,
                ip_address: None,
            },
        )
        .await;

        Ok(())
    }
}
