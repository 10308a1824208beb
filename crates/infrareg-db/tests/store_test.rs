//! Integration tests for the SurrealDB store implementations using the
//! in-memory engine.

use chrono::{Duration, Utc};
use infrareg_core::models::audit::{AuditOutcome, NewAuditEntry};
use infrareg_core::models::grant::PermissionGrant;
use infrareg_core::models::plan::{ModuleSet, Plan};
use infrareg_core::models::session::CreateSession;
use infrareg_core::models::tenant::Tenant;
use infrareg_core::models::two_factor::CreateTwoFactorCode;
use infrareg_core::models::user::{CreateUser, Role, TwoFactorMethod, UpdateUser};
use infrareg_core::store::{
    AuditFilter, AuditStore, DirectoryStore, GrantStore, Pagination, PlanStore, SessionStore,
    TwoFactorStore, UserStore,
};
use infrareg_db::store::{
    SurrealAuditStore, SurrealDirectoryStore, SurrealGrantStore, SurrealPlanStore,
    SurrealSessionStore, SurrealTwoFactorStore, SurrealUserStore,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

/// Helper: spin up an in-memory tenant store and run migrations.
async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    infrareg_db::run_migrations(&db).await.unwrap();
    db
}

/// Helper: in-memory catalog store with the catalog schema applied.
async fn setup_catalog() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("catalog").await.unwrap();
    infrareg_db::run_catalog_migrations(&db).await.unwrap();
    db
}

fn new_user(email: &str) -> CreateUser {
    CreateUser {
        email: email.into(),
        password_hash: "$argon2id$stub".into(),
        role: Role::User,
        two_factor_enabled: false,
        two_factor_method: TwoFactorMethod::Email,
        two_factor_destination: None,
    }
}

// -----------------------------------------------------------------------
// User store
// -----------------------------------------------------------------------

#[tokio::test]
async fn create_and_get_user() {
    let store = SurrealUserStore::new(setup().await);

    let user = store.create(new_user("Alice@Example.com")).await.unwrap();
    // Stored lowercased.
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.role, Role::User);
    assert!(user.active);
    assert_eq!(user.failed_login_attempts, 0);

    let fetched = store.get_by_id(user.id).await.unwrap();
    assert_eq!(fetched.id, user.id);
    assert_eq!(fetched.email, user.email);
}

#[tokio::test]
async fn find_by_email_returns_none_for_missing() {
    let store = SurrealUserStore::new(setup().await);
    store.create(new_user("alice@example.com")).await.unwrap();

    assert!(store.find_by_email("alice@example.com").await.unwrap().is_some());
    assert!(store.find_by_email("bob@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_email_in_one_store_is_rejected() {
    let store = SurrealUserStore::new(setup().await);
    store.create(new_user("alice@example.com")).await.unwrap();

    let dup = store.create(new_user("alice@example.com")).await;
    assert!(dup.is_err(), "unique email index should reject the duplicate");
}

#[tokio::test]
async fn update_user_fields() {
    let store = SurrealUserStore::new(setup().await);
    let user = store.create(new_user("alice@example.com")).await.unwrap();

    let updated = store
        .update(
            user.id,
            UpdateUser {
                role: Some(Role::Operator),
                two_factor_enabled: Some(true),
                two_factor_destination: Some(Some("+15550001111".into())),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.role, Role::Operator);
    assert!(updated.two_factor_enabled);
    assert_eq!(updated.two_factor_destination.as_deref(), Some("+15550001111"));
    assert_eq!(updated.email, "alice@example.com"); // unchanged

    // Explicit clear of the destination.
    let cleared = store
        .update(
            user.id,
            UpdateUser {
                two_factor_destination: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.two_factor_destination.is_none());
}

#[tokio::test]
async fn failed_login_counter_and_lockout_round_trip() {
    let store = SurrealUserStore::new(setup().await);
    let user = store.create(new_user("alice@example.com")).await.unwrap();

    assert_eq!(store.increment_failed_logins(user.id).await.unwrap(), 1);
    assert_eq!(store.increment_failed_logins(user.id).await.unwrap(), 2);

    let until = Utc::now() + Duration::minutes(15);
    store.set_locked_until(user.id, until).await.unwrap();
    let locked = store.get_by_id(user.id).await.unwrap();
    assert_eq!(locked.failed_login_attempts, 2);
    assert!(locked.locked_until.is_some());

    // A counter reset clears failures and the lock but is not a login.
    store.reset_failed_logins(user.id).await.unwrap();
    let reset = store.get_by_id(user.id).await.unwrap();
    assert_eq!(reset.failed_login_attempts, 0);
    assert!(reset.locked_until.is_none());
    assert!(reset.last_login_at.is_none());

    store.increment_failed_logins(user.id).await.unwrap();

    // A successful login wipes the counter and the lock.
    let now = Utc::now();
    store.record_login(user.id, now).await.unwrap();
    let clean = store.get_by_id(user.id).await.unwrap();
    assert_eq!(clean.failed_login_attempts, 0);
    assert!(clean.locked_until.is_none());
    assert!(clean.last_login_at.is_some());
}

#[tokio::test]
async fn list_users_with_pagination() {
    let store = SurrealUserStore::new(setup().await);
    for i in 0..5 {
        store.create(new_user(&format!("user{i}@example.com"))).await.unwrap();
    }

    let page = store
        .list(Pagination { offset: 0, limit: 2 })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 5);
    assert_eq!(page.items[0].email, "user0@example.com");

    let rest = store
        .list(Pagination { offset: 4, limit: 10 })
        .await
        .unwrap();
    assert_eq!(rest.items.len(), 1);
    assert_eq!(rest.items[0].email, "user4@example.com");
}

// -----------------------------------------------------------------------
// Session store
// -----------------------------------------------------------------------

fn new_session(user_id: Uuid, token_hash: &str, ttl_secs: i64) -> CreateSession {
    CreateSession {
        user_id,
        token_hash: token_hash.into(),
        ip_address: Some("10.0.0.1".into()),
        user_agent: None,
        expires_at: Utc::now() + Duration::seconds(ttl_secs),
    }
}

#[tokio::test]
async fn session_lookup_and_idempotent_delete() {
    let store = SurrealSessionStore::new(setup().await);
    let user_id = Uuid::new_v4();

    let created = store.create(new_session(user_id, "hash-a", 3600)).await.unwrap();
    assert_eq!(created.user_id, user_id);

    let found = store.find_by_token_hash("hash-a").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert!(store.find_by_token_hash("hash-b").await.unwrap().is_none());

    store.delete_by_token_hash("hash-a").await.unwrap();
    assert!(store.find_by_token_hash("hash-a").await.unwrap().is_none());
    // Deleting again is not an error.
    store.delete_by_token_hash("hash-a").await.unwrap();
}

#[tokio::test]
async fn delete_for_user_counts_dropped_sessions() {
    let store = SurrealSessionStore::new(setup().await);
    let user_id = Uuid::new_v4();
    store.create(new_session(user_id, "hash-a", 3600)).await.unwrap();
    store.create(new_session(user_id, "hash-b", 3600)).await.unwrap();
    store.create(new_session(Uuid::new_v4(), "hash-c", 3600)).await.unwrap();

    assert_eq!(store.delete_for_user(user_id).await.unwrap(), 2);
    assert!(store.find_by_token_hash("hash-c").await.unwrap().is_some());
}

#[tokio::test]
async fn delete_expired_leaves_live_sessions() {
    let store = SurrealSessionStore::new(setup().await);
    let user_id = Uuid::new_v4();
    store.create(new_session(user_id, "live", 3600)).await.unwrap();
    store.create(new_session(user_id, "dead-a", -60)).await.unwrap();
    store.create(new_session(user_id, "dead-b", -60)).await.unwrap();

    assert_eq!(store.delete_expired().await.unwrap(), 2);
    assert!(store.find_by_token_hash("live").await.unwrap().is_some());
    assert!(store.find_by_token_hash("dead-a").await.unwrap().is_none());
}

// -----------------------------------------------------------------------
// Two-factor store
// -----------------------------------------------------------------------

fn new_code(user_id: Uuid, code: &str, ttl_secs: i64) -> CreateTwoFactorCode {
    CreateTwoFactorCode {
        user_id,
        code: code.into(),
        method: TwoFactorMethod::Email,
        expires_at: Utc::now() + Duration::seconds(ttl_secs),
    }
}

#[tokio::test]
async fn newest_pending_skips_used_codes() {
    let store = SurrealTwoFactorStore::new(setup().await);
    let user_id = Uuid::new_v4();

    let first = store.create(new_code(user_id, "111111", 600)).await.unwrap();
    assert_eq!(
        store.newest_pending(user_id).await.unwrap().unwrap().id,
        first.id
    );

    store.mark_used(first.id).await.unwrap();
    assert!(store.newest_pending(user_id).await.unwrap().is_none());
}

#[tokio::test]
async fn attempt_counter_increments_per_code() {
    let store = SurrealTwoFactorStore::new(setup().await);
    let user_id = Uuid::new_v4();
    let code = store.create(new_code(user_id, "111111", 600)).await.unwrap();

    assert_eq!(store.increment_attempts(code.id).await.unwrap(), 1);
    assert_eq!(store.increment_attempts(code.id).await.unwrap(), 2);
    assert_eq!(store.increment_attempts(code.id).await.unwrap(), 3);
}

#[tokio::test]
async fn invalidate_all_burns_every_unused_code() {
    let store = SurrealTwoFactorStore::new(setup().await);
    let user_id = Uuid::new_v4();
    store.create(new_code(user_id, "111111", 600)).await.unwrap();
    store.create(new_code(user_id, "222222", 600)).await.unwrap();
    store.create(new_code(Uuid::new_v4(), "333333", 600)).await.unwrap();

    assert_eq!(store.invalidate_all(user_id).await.unwrap(), 2);
    assert!(store.newest_pending(user_id).await.unwrap().is_none());
}

// -----------------------------------------------------------------------
// Grant store
// -----------------------------------------------------------------------

#[tokio::test]
async fn grants_are_keyed_by_section_and_field() {
    let store = SurrealGrantStore::new(setup().await);
    let user_id = Uuid::new_v4();

    let section = PermissionGrant {
        can_view: true,
        ..PermissionGrant::deny_all(user_id, "assets")
    };
    let field = PermissionGrant {
        field: Some("status".into()),
        can_edit: true,
        ..PermissionGrant::deny_all(user_id, "assets")
    };
    store
        .replace_for_user(user_id, vec![section.clone(), field.clone()])
        .await
        .unwrap();

    let found = store.find(user_id, "assets", None).await.unwrap().unwrap();
    assert!(found.can_view);
    assert!(found.field.is_none());

    let found = store.find(user_id, "assets", Some("status")).await.unwrap().unwrap();
    assert!(found.can_edit);
    assert_eq!(found.field.as_deref(), Some("status"));

    assert!(store.find(user_id, "assets", Some("name")).await.unwrap().is_none());
    assert!(store.find(user_id, "tickets", None).await.unwrap().is_none());
}

#[tokio::test]
async fn replace_for_user_clears_previous_grants() {
    let store = SurrealGrantStore::new(setup().await);
    let user_id = Uuid::new_v4();
    let other = Uuid::new_v4();

    store
        .replace_for_user(
            user_id,
            vec![
                PermissionGrant::deny_all(user_id, "assets"),
                PermissionGrant::deny_all(user_id, "tickets"),
            ],
        )
        .await
        .unwrap();
    store
        .replace_for_user(other, vec![PermissionGrant::deny_all(other, "assets")])
        .await
        .unwrap();

    store
        .replace_for_user(user_id, vec![PermissionGrant::deny_all(user_id, "reports")])
        .await
        .unwrap();

    let grants = store.for_user(user_id).await.unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].section, "reports");

    // Other users' grants are untouched.
    assert_eq!(store.for_user(other).await.unwrap().len(), 1);
}

#[tokio::test]
async fn replace_for_user_with_empty_set_revokes_everything() {
    let store = SurrealGrantStore::new(setup().await);
    let user_id = Uuid::new_v4();
    store
        .replace_for_user(user_id, vec![PermissionGrant::deny_all(user_id, "assets")])
        .await
        .unwrap();

    store.replace_for_user(user_id, vec![]).await.unwrap();
    assert!(store.for_user(user_id).await.unwrap().is_empty());
}

// -----------------------------------------------------------------------
// Audit store
// -----------------------------------------------------------------------

fn entry(actor_id: Option<Uuid>, action: &str) -> NewAuditEntry {
    NewAuditEntry {
        actor_id,
        action: action.into(),
        entity: "user".into(),
        entity_id: None,
        before: serde_json::json!({}),
        after: serde_json::json!({ "k": 1 }),
        outcome: AuditOutcome::Success,
        ip_address: None,
    }
}

#[tokio::test]
async fn audit_append_and_filtered_list() {
    let store = SurrealAuditStore::new(setup().await);
    let actor = Uuid::new_v4();

    store.append(entry(Some(actor), "user.create")).await.unwrap();
    store.append(entry(Some(actor), "user.deactivate")).await.unwrap();
    store.append(entry(None, "auth.lockout")).await.unwrap();

    let all = store
        .list(AuditFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(all.total, 3);

    let by_actor = store
        .list(
            AuditFilter {
                actor_id: Some(actor),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_actor.total, 2);

    let by_action = store
        .list(
            AuditFilter {
                action: Some("auth.lockout".into()),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(by_action.total, 1);
    assert!(by_action.items[0].actor_id.is_none());
}

#[tokio::test]
async fn audit_time_window_filter() {
    let store = SurrealAuditStore::new(setup().await);
    store.append(entry(None, "auth.lockout")).await.unwrap();

    let future_only = store
        .list(
            AuditFilter {
                from: Some(Utc::now() + Duration::hours(1)),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(future_only.total, 0);

    let past_window = store
        .list(
            AuditFilter {
                from: Some(Utc::now() - Duration::hours(1)),
                to: Some(Utc::now() + Duration::hours(1)),
                ..Default::default()
            },
            Pagination::default(),
        )
        .await
        .unwrap();
    assert_eq!(past_window.total, 1);
}

// -----------------------------------------------------------------------
// Catalog documents
// -----------------------------------------------------------------------

#[tokio::test]
async fn directory_document_round_trips_whole() {
    let store = SurrealDirectoryStore::new(setup_catalog().await);

    // No document yet: an empty directory, not an error.
    assert!(store.load().await.unwrap().is_empty());

    let tenants = vec![
        Tenant {
            id: "acme".into(),
            name: "ACME".into(),
            active: true,
            plan_id: "base".into(),
            created_at: Utc::now(),
            settings: serde_json::json!({ "brand_color": "#003366" }),
        },
        Tenant {
            id: "globex".into(),
            name: "Globex".into(),
            active: false,
            plan_id: "enterprise".into(),
            created_at: Utc::now(),
            settings: serde_json::json!({}),
        },
    ];
    store.replace(tenants.clone()).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].id, "acme");
    assert_eq!(loaded[0].settings["brand_color"], "#003366");
    assert!(!loaded[1].active);

    // Replace overwrites, never merges.
    store.replace(vec![tenants[1].clone()]).await.unwrap();
    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, "globex");
}

#[tokio::test]
async fn plan_document_round_trips_whole() {
    let store = SurrealPlanStore::new(setup_catalog().await);

    assert!(store.load().await.unwrap().is_empty());

    let plans = vec![
        Plan {
            id: "base".into(),
            name: "Base".into(),
            modules: ModuleSet::Named(["assets".into()].into()),
            limits: [("max_users".into(), 10)].into(),
            features: [("exports".into(), false)].into(),
        },
        Plan {
            id: "enterprise".into(),
            name: "Enterprise".into(),
            modules: ModuleSet::All,
            limits: [("max_users".into(), -1)].into(),
            features: [("exports".into(), true)].into(),
        },
    ];
    store.replace(plans).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded.len(), 2);
    let base = loaded.iter().find(|p| p.id == "base").unwrap();
    assert!(base.allows_module("assets"));
    assert!(!base.allows_module("billing"));
    let ent = loaded.iter().find(|p| p.id == "enterprise").unwrap();
    assert!(ent.allows_module("anything"));
    assert_eq!(ent.limit("max_users"), Some(-1));
}
