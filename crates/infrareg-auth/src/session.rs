//! Session manager — login, second factor, token validation, and the
//! session-invalidating administrative actions.
//!
//! Per-principal state machine: `Anonymous -> (valid credentials) ->
//! [TwoFactorPending | Authenticated]`; `TwoFactorPending -> (valid
//! code) -> Authenticated`; `Authenticated -> (logout | expiry |
//! forced reset) -> Anonymous`.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use infrareg_core::TenantDirectory;
use infrareg_core::handles::StoreManager;
use infrareg_core::models::audit::{AuditOutcome, NewAuditEntry};
use infrareg_core::models::session::CreateSession;
use infrareg_core::models::two_factor::CreateTwoFactorCode;
use infrareg_core::models::user::{Role, TwoFactorMethod, User};
use infrareg_core::store::{
    AuditStore, SessionStore, StoreOpener, TenantStore, TwoFactorStore, UserStore,
};
use tracing::warn;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::notify::Notifier;
use crate::resolver::{TenantResolver, normalize_email};
use crate::{password, token};

/// The resolved identity handed to callers after authentication.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub tenant_id: String,
    pub email: String,
    pub role: Role,
}

/// Origin metadata attached to a minted session.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of `authenticate` / `verify_two_factor`.
#[derive(Debug)]
pub enum AuthOutcome {
    Authenticated { token: String, principal: Principal },
    /// Credentials were valid but a second factor is outstanding; the
    /// caller gets no session token yet.
    TwoFactorPending {
        tenant_id: String,
        user_id: Uuid,
        method: TwoFactorMethod,
    },
}

pub struct SessionManager<N: Notifier> {
    directory: Arc<TenantDirectory>,
    resolver: TenantResolver,
    notifier: N,
    config: AuthConfig,
}

/// Best-effort audit append: failures are logged, never propagated, so
/// teardown and bookkeeping cannot mask the caller's result.
pub(crate) async fn record_audit<S: TenantStore>(store: &S, entry: NewAuditEntry) {
    if let Err(e) = store.audit().append(entry).await {
        warn!(error = %e, "audit append failed");
    }
}

impl<N: Notifier> SessionManager<N> {
    pub fn new(directory: Arc<TenantDirectory>, notifier: N, config: AuthConfig) -> Self {
        Self {
            resolver: TenantResolver::new(directory.clone()),
            directory,
            notifier,
            config,
        }
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }

    /// Password login. Resolves the owning tenant by email, then runs
    /// the lockout and verification sequence against that tenant's
    /// store. Never reveals whether the email exists, where, or
    /// whether the password or lockout state caused a failure.
    pub async fn authenticate<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        email: &str,
        password_input: &str,
        meta: ClientMeta,
    ) -> AuthResult<AuthOutcome> {
        let pepper = self.config.pepper.as_deref();
        let email = normalize_email(email);

        let Some(tenant) = self.resolver.resolve_by_email(stores, &email).await else {
            // Same cost as a real verification so that "no such email
            // anywhere" is not observable through timing.
            password::dummy_verify(password_input, pepper);
            return Err(AuthError::InvalidCredentials);
        };

        let store = stores.get(&tenant).await?;
        let user = store
            .users()
            .find_by_email(&email)
            .await?
            .filter(|u| u.active)
            .ok_or_else(|| {
                password::dummy_verify(password_input, pepper);
                AuthError::InvalidCredentials
            })?;

        let now = Utc::now();
        if user.is_locked(now) {
            // Still burn a hash comparison: "locked" must not be
            // distinguishable from "wrong password" by timing.
            password::dummy_verify(password_input, pepper);
            return Err(AuthError::AccountLocked);
        }

        let outcome = password::verify_password(password_input, &user.password_hash, pepper)?;
        if !outcome.valid {
            let attempts = store.users().increment_failed_logins(user.id).await?;
            if attempts >= self.config.max_failed_logins {
                let until = now + Duration::seconds(self.config.lockout_secs as i64);
                store.users().set_locked_until(user.id, until).await?;
                record_audit(
                    &store,
                    NewAuditEntry {
                        actor_id: None,
                        action: "auth.lockout".into(),
                        entity: "user".into(),
                        entity_id: Some(user.id.to_string()),
                        before: serde_json::json!({}),
                        after: serde_json::json!({
                            "failed_attempts": attempts,
                            "locked_until": until.to_rfc3339(),
                        }),
                        outcome: AuditOutcome::Failure,
                        ip_address: meta.ip_address.clone(),
                    },
                )
                .await;
            }
            return Err(AuthError::InvalidCredentials);
        }

        // Password is verified, but a pending second factor must not
        // count as a login: only the failure counter resets here. The
        // last-login stamp lands when a session is actually minted.
        store.users().reset_failed_logins(user.id).await?;

        if outcome.needs_upgrade {
            // Upgrade the legacy digest in place; a failure here must
            // not fail an otherwise successful login.
            match password::hash_password(password_input, pepper) {
                Ok(new_hash) => {
                    if let Err(e) = store.users().set_password_hash(user.id, new_hash).await {
                        warn!(user = %user.id, error = %e, "legacy hash upgrade failed");
                    }
                }
                Err(e) => warn!(user = %user.id, error = %e, "legacy hash upgrade failed"),
            }
        }

        if user.two_factor_enabled {
            self.issue_two_factor(&store, &user).await?;
            return Ok(AuthOutcome::TwoFactorPending {
                tenant_id: tenant.id,
                user_id: user.id,
                method: user.two_factor_method,
            });
        }

        self.mint_session(&store, &tenant.id, &user, &meta).await
    }

    /// Second-factor verification. Matches against the newest unused,
    /// unexpired code; each mismatch burns an attempt, and the third
    /// invalidates the code outright, forcing a resend.
    pub async fn verify_two_factor<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        tenant_id: &str,
        user_id: Uuid,
        code: &str,
        meta: ClientMeta,
    ) -> AuthResult<AuthOutcome> {
        let tenant = self.directory.require(tenant_id)?;
        let store = stores.get(&tenant).await?;
        let now = Utc::now();

        match store.two_factor().newest_pending(user_id).await? {
            Some(pending) if !pending.is_expired(now) && pending.code == code => {
                store.two_factor().mark_used(pending.id).await?;
                let user = store.users().get_by_id(user_id).await?;
                if !user.active {
                    return Err(AuthError::InvalidCredentials);
                }
                self.mint_session(&store, &tenant.id, &user, &meta).await
            }
            Some(pending) => {
                let attempts = store.two_factor().increment_attempts(pending.id).await?;
                if attempts >= self.config.two_factor_max_attempts {
                    store.two_factor().mark_used(pending.id).await?;
                    return Err(AuthError::TwoFactorExpired);
                }
                Err(AuthError::InvalidTwoFactorCode)
            }
            None => Err(AuthError::InvalidTwoFactorCode),
        }
    }

    /// Invalidate all outstanding codes and issue a fresh one —
    /// recovery from a lost or expired code without restarting login.
    pub async fn resend_two_factor<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AuthResult<()> {
        let tenant = self.directory.require(tenant_id)?;
        let store = stores.get(&tenant).await?;

        let user = store.users().get_by_id(user_id).await?;
        if !user.active {
            return Err(AuthError::AccountInactive);
        }

        let invalidated = store.two_factor().invalidate_all(user_id).await?;
        self.issue_two_factor(&store, &user).await?;

        record_audit(
            &store,
            NewAuditEntry {
                actor_id: Some(user_id),
                action: "auth.two_factor_resend".into(),
                entity: "user".into(),
                entity_id: Some(user_id.to_string()),
                before: serde_json::json!({}),
                after: serde_json::json!({ "codes_invalidated": invalidated }),
                outcome: AuditOutcome::Success,
                ip_address: None,
            },
        )
        .await;
        Ok(())
    }

    /// Resolve a bearer token to its principal. Tokens carry no tenant
    /// hint, so this is the same federated scan as email resolution:
    /// probe each active tenant's session table, stop at the first
    /// hit. Expiry is a timestamp comparison at use time.
    pub async fn validate_token<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        raw_token: &str,
    ) -> AuthResult<Principal> {
        let token_hash = token::hash_session_token(raw_token);
        let now = Utc::now();

        for tenant in self.directory.active() {
            let store = match stores.get(&tenant).await {
                Ok(store) => store,
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "tenant store unavailable, scan continues");
                    continue;
                }
            };
            let session = match store.sessions().find_by_token_hash(&token_hash).await {
                Ok(Some(session)) => session,
                Ok(None) => continue,
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "session probe failed, scan continues");
                    continue;
                }
            };

            if session.is_expired(now) {
                // A stale row is not a hit; another tenant may still
                // hold a live session for this token.
                continue;
            }
            let user = store.users().get_by_id(session.user_id).await?;
            if !user.active {
                return Err(AuthError::SessionExpired);
            }
            return Ok(Principal {
                user_id: user.id,
                tenant_id: tenant.id,
                email: user.email,
                role: user.role,
            });
        }

        Err(AuthError::SessionExpired)
    }

    /// Delete the session matching a token. Idempotent: unknown or
    /// already-expired tokens succeed.
    pub async fn logout<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        raw_token: &str,
    ) -> AuthResult<()> {
        let token_hash = token::hash_session_token(raw_token);

        for tenant in self.directory.active() {
            let store = match stores.get(&tenant).await {
                Ok(store) => store,
                Err(e) => {
                    warn!(tenant = %tenant.id, error = %e, "tenant store unavailable, scan continues");
                    continue;
                }
            };
            if let Err(e) = store.sessions().delete_by_token_hash(&token_hash).await {
                warn!(tenant = %tenant.id, error = %e, "session delete failed, scan continues");
            }
        }
        Ok(())
    }

    /// Administrative password reset. Every previously issued session
    /// for the user is dropped so no stale token remains valid.
    pub async fn force_password_reset<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant_id: &str,
        user_id: Uuid,
        new_password: &str,
    ) -> AuthResult<()> {
        if new_password.len() < self.config.min_password_length {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_length
            )));
        }

        let tenant = self.directory.require(tenant_id)?;
        let store = stores.get(&tenant).await?;

        let hash = password::hash_password(new_password, self.config.pepper.as_deref())?;
        store.users().set_password_hash(user_id, hash).await?;
        let dropped = store.sessions().delete_for_user(user_id).await?;

        record_audit(
            &store,
            NewAuditEntry {
                actor_id: Some(actor.user_id),
                action: "user.force_password_reset".into(),
                entity: "user".into(),
                entity_id: Some(user_id.to_string()),
                before: serde_json::json!({}),
                after: serde_json::json!({ "sessions_dropped": dropped }),
                outcome: AuditOutcome::Success,
                ip_address: None,
            },
        )
        .await;
        Ok(())
    }

    /// Soft-delete a user and drop every session they hold.
    pub async fn deactivate<O: StoreOpener>(
        &self,
        stores: &mut StoreManager<O>,
        actor: &Principal,
        tenant_id: &str,
        user_id: Uuid,
    ) -> AuthResult<()> {
        let tenant = self.directory.require(tenant_id)?;
        let store = stores.get(&tenant).await?;

        store
            .users()
            .update(
                user_id,
                infrareg_core::models::user::UpdateUser {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        let dropped = store.sessions().delete_for_user(user_id).await?;

        record_audit(
            &store,
            NewAuditEntry {
                actor_id: Some(actor.user_id),
                action: "user.deactivate".into(),
                entity: "user".into(),
                entity_id: Some(user_id.to_string()),
                before: serde_json::json!({ "active": true }),
                after: serde_json::json!({ "active": false, "sessions_dropped": dropped }),
                outcome: AuditOutcome::Success,
                ip_address: None,
            },
        )
        .await;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    async fn issue_two_factor<S: TenantStore>(&self, store: &S, user: &User) -> AuthResult<()> {
        let code = token::generate_code(self.config.two_factor_code_length);
        let expires_at = Utc::now() + Duration::seconds(self.config.two_factor_lifetime_secs as i64);

        store
            .two_factor()
            .create(CreateTwoFactorCode {
                user_id: user.id,
                code: code.clone(),
                method: user.two_factor_method,
                expires_at,
            })
            .await?;

        // Best-effort dispatch under a bounded timeout: a slow or
        // failing notifier is treated as sent, never as a login error.
        let timeout = StdDuration::from_millis(self.config.dispatch_timeout_millis);
        let send = self.notifier.send_two_factor_code(
            user.two_factor_destination(),
            &code,
            user.two_factor_method,
        );
        match tokio::time::timeout(timeout, send).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(user = %user.id, error = %e, "two-factor dispatch failed"),
            Err(_) => warn!(user = %user.id, "two-factor dispatch timed out"),
        }
        Ok(())
    }

    async fn mint_session<S: TenantStore>(
        &self,
        store: &S,
        tenant_id: &str,
        user: &User,
        meta: &ClientMeta,
    ) -> AuthResult<AuthOutcome> {
        let raw_token = token::generate_session_token();
        let token_hash = token::hash_session_token(&raw_token);
        let expires_at = Utc::now() + Duration::seconds(self.config.session_lifetime_secs as i64);

        store
            .sessions()
            .create(CreateSession {
                user_id: user.id,
                token_hash,
                ip_address: meta.ip_address.clone(),
                user_agent: meta.user_agent.clone(),
                expires_at,
            })
            .await?;

        store.users().record_login(user.id, Utc::now()).await?;

        Ok(AuthOutcome::Authenticated {
            token: raw_token,
            principal: Principal {
                user_id: user.id,
                tenant_id: tenant_id.to_string(),
                email: user.email.clone(),
                role: user.role,
            },
        })
    }
}
