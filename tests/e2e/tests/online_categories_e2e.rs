use api_client::{Category, RemoteGateway};
use auth::{SessionManager, SessionStore};
use cache::{keys, MemoryStore, PreferenceStore};
use gallery::{Filter, GalleryController, Photo};
use mocks::FakeGateway;
use std::sync::Arc;
use sync::{SnapshotSource, Syncer};

#[tokio::main]
async fn main() {
    let fake = Arc::new(FakeGateway::new());
    let gateway: Arc<dyn RemoteGateway> = fake.clone();
    let store = Arc::new(MemoryStore::new());

    let mut sessions = SessionManager::new(gateway.clone(), SessionStore::memory());
    let signup = sessions
        .sign_up("ada@example.com", "secret-pw", "Ada")
        .await
        .expect("sign up");
    let session = signup.session.expect("confirmed session");
    let user_id = session.user_id().to_string();
    assert_eq!(fake.user_categories(&user_id), Some(Category::defaults()));

    let photos = vec![Photo::new("a.jpg"), Photo::new("b.jpg")];
    let syncer = Syncer::new(gateway.clone(), store.clone());
    let mut controller = GalleryController::new(photos, syncer).with_session(sessions.current().cloned());
    assert_eq!(controller.load_initial_state().await, SnapshotSource::Remote);
    assert_eq!(controller.categories(), Category::defaults().as_slice());

    let pets = controller.create_category("Pets").await.expect("create");
    controller
        .set_categories("a.jpg", [pets.name.as_str(), "Food"])
        .await
        .expect("categories");
    assert_eq!(
        fake.photo_categories(&user_id, "a.jpg"),
        Some(vec!["Food".to_string(), "Pets".to_string()])
    );
    let remote = fake.user_categories(&user_id).expect("user categories");
    assert!(remote.iter().any(|c| c.id == pets.id));

    controller.rename_category(&pets.id, "Animals").await.expect("rename");
    assert_eq!(
        fake.photo_categories(&user_id, "a.jpg"),
        Some(vec!["Animals".to_string(), "Food".to_string()])
    );

    // Backend writes fail from here on; the local store keeps the change.
    fake.set_fail_writes(true);
    controller
        .set_categories("b.jpg", ["Animals"])
        .await
        .expect("fallback");
    assert!(fake.photo_categories(&user_id, "b.jpg").is_none());
    assert!(store.get(&keys::categories("b.jpg")).expect("get").is_some());
    fake.set_fail_writes(false);

    let animals = controller
        .set_filter(Filter::Category("Animals".into()))
        .to_vec();
    assert_eq!(animals, ["a.jpg", "b.jpg"]);

    controller.delete_category(&pets.id).await.expect("delete");
    assert_eq!(controller.filter(), &Filter::All);
    assert!(controller
        .photos()
        .iter()
        .all(|p| !p.categories.contains("Animals")));

    sessions.sign_out().await.expect("sign out");
    assert_eq!(controller.sign_out_session().await, SnapshotSource::Local);
    assert!(controller.session().is_none());
}
