use api_client::{Category, RemoteGateway};
use auth::{AuthError, SessionManager, SessionStore};
use mocks::FakeGateway;
use std::sync::Arc;
use tempfile::TempDir;

fn manager(gateway: &Arc<FakeGateway>, store: SessionStore) -> SessionManager {
    let gateway: Arc<dyn RemoteGateway> = gateway.clone();
    SessionManager::new(gateway, store)
}

#[tokio::test]
async fn sign_up_seeds_default_categories() {
    let fake = Arc::new(FakeGateway::new());
    let mut mgr = manager(&fake, SessionStore::memory());

    let signup = mgr.sign_up("ada@example.com", "secret", "Ada").await.unwrap();
    let session = signup.session.expect("auto-confirmed session");
    assert_eq!(mgr.current(), Some(&session));

    let seeded = fake.user_categories(session.user_id()).unwrap();
    assert_eq!(seeded, Category::defaults());
}

#[tokio::test]
async fn sign_up_without_confirmation_leaves_user_signed_out() {
    let fake = Arc::new(FakeGateway::new());
    fake.auto_confirm.store(false, std::sync::atomic::Ordering::SeqCst);
    let mut mgr = manager(&fake, SessionStore::memory());

    let signup = mgr.sign_up("bob@example.com", "secret", "Bob").await.unwrap();
    assert!(signup.session.is_none());
    assert!(mgr.current().is_none());
    assert!(fake.user_categories(&signup.user.id).is_none());
}

#[tokio::test]
async fn sign_up_rejects_empty_display_name() {
    let fake = Arc::new(FakeGateway::new());
    let mut mgr = manager(&fake, SessionStore::memory());
    let err = mgr.sign_up("c@example.com", "pw", "   ").await.unwrap_err();
    assert!(matches!(err, AuthError::Validation(_)));
    assert_eq!(fake.call_count(), 0);
}

#[tokio::test]
async fn sign_in_persists_and_sign_out_clears_file_store() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    let fake = Arc::new(FakeGateway::new());
    fake.with_account("ada@example.com", "secret");
    let mut mgr = manager(&fake, SessionStore::File(path.clone()));

    let session = mgr.sign_in("ada@example.com", "secret").await.unwrap();
    assert!(path.exists());
    let stored = SessionStore::File(path.clone()).load().unwrap();
    assert_eq!(stored, Some(session));

    mgr.sign_out().await.unwrap();
    assert!(mgr.current().is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn sign_in_with_wrong_password_is_auth_error() {
    let fake = Arc::new(FakeGateway::new());
    fake.with_account("ada@example.com", "secret");
    let mut mgr = manager(&fake, SessionStore::memory());

    let err = mgr.sign_in("ada@example.com", "nope").await.unwrap_err();
    match err {
        AuthError::Gateway(e) => assert!(e.is_auth()),
        other => panic!("unexpected error {:?}", other),
    }
    assert!(mgr.current().is_none());
}

#[tokio::test]
async fn sign_out_clears_local_session_even_when_backend_fails() {
    let fake = Arc::new(FakeGateway::new());
    fake.with_account("ada@example.com", "secret");
    let store = SessionStore::memory();
    let mut mgr = manager(&fake, store.clone());
    mgr.sign_in("ada@example.com", "secret").await.unwrap();

    fake.set_fail_writes(true);
    mgr.sign_out().await.unwrap();
    assert!(mgr.current().is_none());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn restore_accepts_valid_session() {
    let fake = Arc::new(FakeGateway::new());
    let session = fake.with_account("ada@example.com", "secret");
    let store = SessionStore::memory();
    store.save(&session).unwrap();

    let mut mgr = manager(&fake, store);
    let restored = mgr.restore().await.unwrap();
    assert_eq!(restored.user_id(), session.user_id());
    assert!(mgr.current().is_some());
}

#[tokio::test]
async fn restore_keeps_stored_session_when_offline() {
    let fake = Arc::new(FakeGateway::new());
    let session = fake.with_account("ada@example.com", "secret");
    let store = SessionStore::memory();
    store.save(&session).unwrap();
    fake.set_fail_reads(true);

    let mut mgr = manager(&fake, store.clone());
    assert!(mgr.restore().await.is_none());
    assert!(mgr.current().is_none());
    assert_eq!(store.load().unwrap(), Some(session));
}

#[tokio::test]
async fn restore_drops_rejected_session() {
    let fake = Arc::new(FakeGateway::new());
    let other = Arc::new(FakeGateway::new());
    // session minted by a different backend is unknown here
    let session = other.with_account("ghost@example.com", "secret");
    let store = SessionStore::memory();
    store.save(&session).unwrap();

    let mut mgr = manager(&fake, store.clone());
    assert!(mgr.restore().await.is_none());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn slow_backend_times_out() {
    let fake = Arc::new(FakeGateway::new());
    fake.with_account("ada@example.com", "secret");
    fake.set_delay(std::time::Duration::from_secs(30));
    let mut mgr = manager(&fake, SessionStore::memory())
        .with_timeout(std::time::Duration::from_secs(1));

    let err = mgr.sign_in("ada@example.com", "secret").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Gateway(api_client::GatewayError::Timeout(_))
    ));
}

#[test]
#[serial_test::serial]
fn store_selection_follows_environment() {
    std::env::set_var("MOCK_KEYRING", "1");
    std::env::set_var(auth::USE_FILE_STORE_ENV, "1");
    match SessionStore::from_env() {
        SessionStore::File(path) => assert!(path.ends_with(".galleryze/session.json")),
        _ => panic!("expected the file store"),
    }

    std::env::remove_var(auth::USE_FILE_STORE_ENV);
    assert!(matches!(SessionStore::from_env(), SessionStore::Keyring));
}
