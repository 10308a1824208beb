//! Integration tests for the session manager: tenant resolution,
//! login, lockout, second factor, token validation, and the
//! session-invalidating administrative actions. Each tenant gets its
//! own in-memory SurrealDB.

use std::sync::Arc;

use chrono::{Duration, Utc};
use infrareg_auth::{
    AuthConfig, AuthError, AuthOutcome, ClientMeta, LogNotifier, Principal, SessionManager,
    password, token,
};
use infrareg_core::models::session::CreateSession;
use infrareg_core::models::tenant::Tenant;
use infrareg_core::models::user::{CreateUser, Role, TwoFactorMethod};
use infrareg_core::store::{
    AuditFilter, AuditStore, Pagination, SessionStore, TenantStore, TwoFactorStore, UserStore,
};
use infrareg_core::{StoreManager, TenantDirectory};
use infrareg_db::FixedStoreOpener;
use infrareg_db::store::SurrealTenantStore;
use sha2::{Digest, Sha256};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

fn tenant(id: &str) -> Tenant {
    Tenant {
        id: id.into(),
        name: id.to_uppercase(),
        active: true,
        plan_id: "enterprise".into(),
        created_at: Utc::now(),
        settings: serde_json::json!({}),
    }
}

async fn mem_db() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    infrareg_db::run_migrations(&db).await.unwrap();
    db
}

struct Env {
    directory: Arc<TenantDirectory>,
    manager: SessionManager<LogNotifier>,
    stores: StoreManager<FixedStoreOpener<Db>>,
}

impl Env {
    /// One in-memory store per tenant id, directory in the given order.
    async fn with_tenants(ids: &[&str], config: AuthConfig) -> Self {
        let mut opener = FixedStoreOpener::new();
        for id in ids {
            opener.insert(*id, mem_db().await);
        }
        let directory = Arc::new(TenantDirectory::new(
            ids.iter().map(|id| tenant(id)).collect(),
        ));
        Self {
            manager: SessionManager::new(directory.clone(), LogNotifier, config),
            directory,
            stores: StoreManager::new(opener),
        }
    }

    async fn store(&mut self, tenant_id: &str) -> SurrealTenantStore<Db> {
        let tenant = self.directory.get(tenant_id).unwrap();
        self.stores.get(&tenant).await.unwrap()
    }

    /// Seed an active user with an Argon2id hash of `pass`.
    async fn seed_user(&mut self, tenant_id: &str, email: &str, pass: &str) -> Uuid {
        let hash = password::hash_password(pass, None).unwrap();
        let store = self.store(tenant_id).await;
        let user = store
            .users()
            .create(CreateUser {
                email: email.into(),
                password_hash: hash,
                role: Role::User,
                two_factor_enabled: false,
                two_factor_method: TwoFactorMethod::Email,
                two_factor_destination: None,
            })
            .await
            .unwrap();
        user.id
    }
}

fn superadmin(tenant_id: &str) -> Principal {
    Principal {
        user_id: Uuid::new_v4(),
        tenant_id: tenant_id.into(),
        email: "root@example.com".into(),
        role: Role::Superadmin,
    }
}

// -----------------------------------------------------------------------
// Login and tenant resolution
// -----------------------------------------------------------------------

#[tokio::test]
async fn login_succeeds_and_token_validates() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = env.seed_user("acme", "alice@example.com", "correct horse battery").await;

    let outcome = env
        .manager
        .authenticate(
            &mut env.stores,
            "alice@example.com",
            "correct horse battery",
            ClientMeta::default(),
        )
        .await
        .unwrap();

    let AuthOutcome::Authenticated { token, principal } = outcome else {
        panic!("expected direct authentication");
    };
    assert_eq!(principal.user_id, user_id);
    assert_eq!(principal.tenant_id, "acme");
    assert_eq!(principal.role, Role::User);

    let validated = env.manager.validate_token(&mut env.stores, &token).await.unwrap();
    assert_eq!(validated.user_id, user_id);
    assert_eq!(validated.tenant_id, "acme");
}

#[tokio::test]
async fn login_normalizes_email_case() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    env.seed_user("acme", "alice@example.com", "correct horse battery").await;

    let outcome = env
        .manager
        .authenticate(
            &mut env.stores,
            "  Alice@Example.COM ",
            "correct horse battery",
            ClientMeta::default(),
        )
        .await;
    assert!(matches!(outcome, Ok(AuthOutcome::Authenticated { .. })));
}

#[tokio::test]
async fn wrong_password_and_unknown_email_are_indistinguishable() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    env.seed_user("acme", "alice@example.com", "correct horse battery").await;

    let wrong = env
        .manager
        .authenticate(&mut env.stores, "alice@example.com", "nope nope nope", ClientMeta::default())
        .await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

    let unknown = env
        .manager
        .authenticate(&mut env.stores, "nobody@example.com", "whatever here", ClientMeta::default())
        .await;
    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn duplicate_email_resolves_to_first_tenant_in_directory_order() {
    let mut env = Env::with_tenants(&["alpha", "beta"], AuthConfig::default()).await;
    env.seed_user("alpha", "bob@example.com", "alpha password!").await;
    env.seed_user("beta", "bob@example.com", "beta password!!").await;

    // The alpha account wins; the beta password does not work even
    // though a beta account exists with it.
    let outcome = env
        .manager
        .authenticate(&mut env.stores, "bob@example.com", "alpha password!", ClientMeta::default())
        .await
        .unwrap();
    let AuthOutcome::Authenticated { principal, .. } = outcome else {
        panic!("expected direct authentication");
    };
    assert_eq!(principal.tenant_id, "alpha");

    let beta_pass = env
        .manager
        .authenticate(&mut env.stores, "bob@example.com", "beta password!!", ClientMeta::default())
        .await;
    assert!(matches!(beta_pass, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn inactive_account_is_skipped_by_resolution() {
    let mut env = Env::with_tenants(&["alpha", "beta"], AuthConfig::default()).await;
    let alpha_user = env.seed_user("alpha", "bob@example.com", "alpha password!").await;
    env.seed_user("beta", "bob@example.com", "beta password!!").await;

    let store = env.store("alpha").await;
    store
        .users()
        .update(
            alpha_user,
            infrareg_core::models::user::UpdateUser {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // With alpha's account inactive, the scan falls through to beta.
    let outcome = env
        .manager
        .authenticate(&mut env.stores, "bob@example.com", "beta password!!", ClientMeta::default())
        .await
        .unwrap();
    let AuthOutcome::Authenticated { principal, .. } = outcome else {
        panic!("expected direct authentication");
    };
    assert_eq!(principal.tenant_id, "beta");
}

#[tokio::test]
async fn legacy_sha256_hash_verifies_and_upgrades() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;

    let legacy_digest = hex::encode(Sha256::digest("correct horse battery".as_bytes()));
    let store = env.store("acme").await;
    let user = store
        .users()
        .create(CreateUser {
            email: "old@example.com".into(),
            password_hash: legacy_digest.clone(),
            role: Role::User,
            two_factor_enabled: false,
            two_factor_method: TwoFactorMethod::Email,
            two_factor_destination: None,
        })
        .await
        .unwrap();

    let outcome = env
        .manager
        .authenticate(&mut env.stores, "old@example.com", "correct horse battery", ClientMeta::default())
        .await;
    assert!(matches!(outcome, Ok(AuthOutcome::Authenticated { .. })));

    // The stored hash was silently rewritten to Argon2id.
    let upgraded = store.users().get_by_id(user.id).await.unwrap();
    assert_ne!(upgraded.password_hash, legacy_digest);
    assert!(upgraded.password_hash.starts_with("$argon2"));

    // And the same password still works against the new hash.
    let again = env
        .manager
        .authenticate(&mut env.stores, "old@example.com", "correct horse battery", ClientMeta::default())
        .await;
    assert!(matches!(again, Ok(AuthOutcome::Authenticated { .. })));
}

// -----------------------------------------------------------------------
// Lockout
// -----------------------------------------------------------------------

#[tokio::test]
async fn lockout_after_max_failed_attempts() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    env.seed_user("acme", "alice@example.com", "correct horse battery").await;

    for _ in 0..5 {
        let r = env
            .manager
            .authenticate(&mut env.stores, "alice@example.com", "wrong password!", ClientMeta::default())
            .await;
        assert!(matches!(r, Err(AuthError::InvalidCredentials)));
    }

    // The window is open now; even the right password is refused.
    let locked = env
        .manager
        .authenticate(
            &mut env.stores,
            "alice@example.com",
            "correct horse battery",
            ClientMeta::default(),
        )
        .await;
    assert!(matches!(locked, Err(AuthError::AccountLocked)));
}

#[tokio::test]
async fn lockout_window_elapse_allows_login_and_resets_counter() {
    let config = AuthConfig {
        lockout_secs: 0,
        ..AuthConfig::default()
    };
    let mut env = Env::with_tenants(&["acme"], config).await;
    let user_id = env.seed_user("acme", "alice@example.com", "correct horse battery").await;

    for _ in 0..5 {
        let _ = env
            .manager
            .authenticate(&mut env.stores, "alice@example.com", "wrong password!", ClientMeta::default())
            .await;
    }

    // A zero-length window has already elapsed; the login goes through
    // and zeroes the failure counter.
    let outcome = env
        .manager
        .authenticate(
            &mut env.stores,
            "alice@example.com",
            "correct horse battery",
            ClientMeta::default(),
        )
        .await;
    assert!(matches!(outcome, Ok(AuthOutcome::Authenticated { .. })));

    let store = env.store("acme").await;
    let user = store.users().get_by_id(user_id).await.unwrap();
    assert_eq!(user.failed_login_attempts, 0);
    assert!(user.last_login_at.is_some());
}

// -----------------------------------------------------------------------
// Second factor
// -----------------------------------------------------------------------

async fn seed_two_factor_user(env: &mut Env, tenant_id: &str, email: &str, pass: &str) -> Uuid {
    let hash = password::hash_password(pass, None).unwrap();
    let store = env.store(tenant_id).await;
    let user = store
        .users()
        .create(CreateUser {
            email: email.into(),
            password_hash: hash,
            role: Role::User,
            two_factor_enabled: true,
            two_factor_method: TwoFactorMethod::Email,
            two_factor_destination: None,
        })
        .await
        .unwrap();
    user.id
}

async fn pending_code(env: &mut Env, tenant_id: &str, user_id: Uuid) -> String {
    let store = env.store(tenant_id).await;
    store
        .two_factor()
        .newest_pending(user_id)
        .await
        .unwrap()
        .expect("a pending code should exist")
        .code
}

#[tokio::test]
async fn two_factor_login_requires_code_before_minting_a_session() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    let outcome = env
        .manager
        .authenticate(
            &mut env.stores,
            "alice@example.com",
            "correct horse battery",
            ClientMeta::default(),
        )
        .await
        .unwrap();
    let AuthOutcome::TwoFactorPending { tenant_id, user_id: pending_user, method } = outcome else {
        panic!("expected a pending second factor");
    };
    assert_eq!(tenant_id, "acme");
    assert_eq!(pending_user, user_id);
    assert_eq!(method, TwoFactorMethod::Email);

    let code = pending_code(&mut env, "acme", user_id).await;
    let verified = env
        .manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &code, ClientMeta::default())
        .await
        .unwrap();
    let AuthOutcome::Authenticated { token, principal } = verified else {
        panic!("expected authentication after code verification");
    };
    assert_eq!(principal.user_id, user_id);
    assert!(env.manager.validate_token(&mut env.stores, &token).await.is_ok());
}

#[tokio::test]
async fn two_factor_code_is_single_use() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    env.manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await
        .unwrap();
    let code = pending_code(&mut env, "acme", user_id).await;

    env.manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &code, ClientMeta::default())
        .await
        .unwrap();

    // Replaying the consumed code fails.
    let replay = env
        .manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &code, ClientMeta::default())
        .await;
    assert!(matches!(replay, Err(AuthError::InvalidTwoFactorCode)));
}

#[tokio::test]
async fn three_wrong_guesses_invalidate_the_code() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    env.manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await
        .unwrap();
    let code = pending_code(&mut env, "acme", user_id).await;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    for _ in 0..2 {
        let r = env
            .manager
            .verify_two_factor(&mut env.stores, "acme", user_id, wrong, ClientMeta::default())
            .await;
        assert!(matches!(r, Err(AuthError::InvalidTwoFactorCode)));
    }
    let third = env
        .manager
        .verify_two_factor(&mut env.stores, "acme", user_id, wrong, ClientMeta::default())
        .await;
    assert!(matches!(third, Err(AuthError::TwoFactorExpired)));

    // The real code is burned along with the attempt budget.
    let after = env
        .manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &code, ClientMeta::default())
        .await;
    assert!(matches!(after, Err(AuthError::InvalidTwoFactorCode)));
}

#[tokio::test]
async fn expired_code_never_verifies() {
    let config = AuthConfig {
        two_factor_lifetime_secs: 0,
        ..AuthConfig::default()
    };
    let mut env = Env::with_tenants(&["acme"], config).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    env.manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await
        .unwrap();
    let code = pending_code(&mut env, "acme", user_id).await;

    let r = env
        .manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &code, ClientMeta::default())
        .await;
    assert!(matches!(r, Err(AuthError::InvalidTwoFactorCode)));
}

#[tokio::test]
async fn resend_invalidates_outstanding_codes() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    env.manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await
        .unwrap();
    let store = env.store("acme").await;
    let first = store.two_factor().newest_pending(user_id).await.unwrap().unwrap();

    env.manager
        .resend_two_factor(&mut env.stores, "acme", user_id)
        .await
        .unwrap();

    let second = store.two_factor().newest_pending(user_id).await.unwrap().unwrap();
    assert_ne!(first.id, second.id);

    // The fresh code works.
    let verified = env
        .manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &second.code, ClientMeta::default())
        .await;
    assert!(matches!(verified, Ok(AuthOutcome::Authenticated { .. })));
}

#[tokio::test]
async fn resend_is_audited() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    env.manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await
        .unwrap();
    env.manager
        .resend_two_factor(&mut env.stores, "acme", user_id)
        .await
        .unwrap();

    let store = env.store("acme").await;
    let page = store
        .audit()
        .list(
            AuditFilter {
                action: Some("auth.two_factor_resend".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    let entry = &page.items[0];
    assert_eq!(entry.entity_id.as_deref(), Some(user_id.to_string().as_str()));
    assert_eq!(entry.after["codes_invalidated"], serde_json::json!(1));
}

#[tokio::test]
async fn pending_second_factor_does_not_stamp_a_login() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = seed_two_factor_user(&mut env, "acme", "alice@example.com", "correct horse battery").await;

    let outcome = env
        .manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await
        .unwrap();
    assert!(matches!(outcome, AuthOutcome::TwoFactorPending { .. }));

    // Password alone is not a login.
    let store = env.store("acme").await;
    let user = store.users().get_by_id(user_id).await.unwrap();
    assert!(user.last_login_at.is_none());

    let code = pending_code(&mut env, "acme", user_id).await;
    env.manager
        .verify_two_factor(&mut env.stores, "acme", user_id, &code, ClientMeta::default())
        .await
        .unwrap();

    let user = store.users().get_by_id(user_id).await.unwrap();
    assert!(user.last_login_at.is_some());
}

// -----------------------------------------------------------------------
// Tokens, logout, and administrative invalidation
// -----------------------------------------------------------------------

async fn login_token(env: &mut Env, email: &str, pass: &str) -> String {
    let outcome = env
        .manager
        .authenticate(&mut env.stores, email, pass, ClientMeta::default())
        .await
        .unwrap();
    match outcome {
        AuthOutcome::Authenticated { token, .. } => token,
        AuthOutcome::TwoFactorPending { .. } => panic!("unexpected second factor"),
    }
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    env.seed_user("acme", "alice@example.com", "correct horse battery").await;
    let token = login_token(&mut env, "alice@example.com", "correct horse battery").await;

    let mut tampered = token.clone();
    tampered.pop();
    tampered.push('A');
    if tampered == token {
        tampered.pop();
        tampered.push('B');
    }

    let r = env.manager.validate_token(&mut env.stores, &tampered).await;
    assert!(matches!(r, Err(AuthError::SessionExpired)));
}

#[tokio::test]
async fn expired_session_is_rejected_at_validation() {
    let config = AuthConfig {
        session_lifetime_secs: 0,
        ..AuthConfig::default()
    };
    let mut env = Env::with_tenants(&["acme"], config).await;
    env.seed_user("acme", "alice@example.com", "correct horse battery").await;
    let token = login_token(&mut env, "alice@example.com", "correct horse battery").await;

    let r = env.manager.validate_token(&mut env.stores, &token).await;
    assert!(matches!(r, Err(AuthError::SessionExpired)));
}

#[tokio::test]
async fn expired_row_in_one_tenant_does_not_end_the_token_scan() {
    let mut env = Env::with_tenants(&["alpha", "beta"], AuthConfig::default()).await;
    let stale_user = env.seed_user("alpha", "old@example.com", "correct horse battery").await;
    let live_user = env.seed_user("beta", "bob@example.com", "correct horse battery").await;

    let raw = token::generate_session_token();
    let hash = token::hash_session_token(&raw);

    // Same token hash in both stores: long expired in the first
    // tenant scanned, live in the second.
    let store = env.store("alpha").await;
    store
        .sessions()
        .create(CreateSession {
            user_id: stale_user,
            token_hash: hash.clone(),
            ip_address: None,
            user_agent: None,
            expires_at: Utc::now() - Duration::hours(1),
        })
        .await
        .unwrap();
    let store = env.store("beta").await;
    store
        .sessions()
        .create(CreateSession {
            user_id: live_user,
            token_hash: hash,
            ip_address: None,
            user_agent: None,
            expires_at: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    let principal = env.manager.validate_token(&mut env.stores, &raw).await.unwrap();
    assert_eq!(principal.user_id, live_user);
    assert_eq!(principal.tenant_id, "beta");
}

#[tokio::test]
async fn logout_is_idempotent() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    env.seed_user("acme", "alice@example.com", "correct horse battery").await;
    let token = login_token(&mut env, "alice@example.com", "correct horse battery").await;

    env.manager.logout(&mut env.stores, &token).await.unwrap();
    let r = env.manager.validate_token(&mut env.stores, &token).await;
    assert!(matches!(r, Err(AuthError::SessionExpired)));

    // A second logout of the same token, or of a token never issued,
    // still succeeds.
    env.manager.logout(&mut env.stores, &token).await.unwrap();
    env.manager.logout(&mut env.stores, "never-issued").await.unwrap();
}

#[tokio::test]
async fn force_password_reset_drops_all_sessions() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = env.seed_user("acme", "alice@example.com", "correct horse battery").await;
    let first = login_token(&mut env, "alice@example.com", "correct horse battery").await;
    let second = login_token(&mut env, "alice@example.com", "correct horse battery").await;

    env.manager
        .force_password_reset(
            &mut env.stores,
            &superadmin("master"),
            "acme",
            user_id,
            "a brand new password",
        )
        .await
        .unwrap();

    for token in [&first, &second] {
        let r = env.manager.validate_token(&mut env.stores, token).await;
        assert!(matches!(r, Err(AuthError::SessionExpired)));
    }

    // Old password out, new password in.
    let old = env
        .manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await;
    assert!(matches!(old, Err(AuthError::InvalidCredentials)));
    let new = env
        .manager
        .authenticate(&mut env.stores, "alice@example.com", "a brand new password", ClientMeta::default())
        .await;
    assert!(matches!(new, Ok(AuthOutcome::Authenticated { .. })));
}

#[tokio::test]
async fn force_password_reset_enforces_minimum_length() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = env.seed_user("acme", "alice@example.com", "correct horse battery").await;

    let r = env
        .manager
        .force_password_reset(&mut env.stores, &superadmin("master"), "acme", user_id, "short")
        .await;
    assert!(matches!(r, Err(AuthError::Validation(_))));
}

#[tokio::test]
async fn deactivation_invalidates_existing_sessions() {
    let mut env = Env::with_tenants(&["acme"], AuthConfig::default()).await;
    let user_id = env.seed_user("acme", "alice@example.com", "correct horse battery").await;
    let token = login_token(&mut env, "alice@example.com", "correct horse battery").await;

    env.manager
        .deactivate(&mut env.stores, &superadmin("master"), "acme", user_id)
        .await
        .unwrap();

    let r = env.manager.validate_token(&mut env.stores, &token).await;
    assert!(matches!(r, Err(AuthError::SessionExpired)));

    let again = env
        .manager
        .authenticate(&mut env.stores, "alice@example.com", "correct horse battery", ClientMeta::default())
        .await;
    assert!(matches!(again, Err(AuthError::InvalidCredentials)));
}
