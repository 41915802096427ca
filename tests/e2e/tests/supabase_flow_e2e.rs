use api_client::{RemoteGateway, SupabaseClient};
use auth::{SessionManager, SessionStore};
use cache::MemoryStore;
use classifier::{Bucket, Classifier, DEFAULT_THRESHOLD};
use gallery::{FavoriteState, Filter, GalleryController, Photo};
use serde_json::json;
use std::sync::Arc;
use sync::{SnapshotSource, Syncer};

#[tokio::main]
async fn main() {
    let server = mocks::supabase_server();
    mocks::expect_sign_in(&server, "user-42", "tok-42");
    mocks::expect_list_favorites(&server, &["beach.jpg"]);
    mocks::expect_list_photo_categories(
        &server,
        json!([{ "photo_id": "my_dog_photo.jpg", "categories": ["Family"] }]),
    );
    mocks::expect_user_categories(
        &server,
        json!([
            { "id": "family", "name": "Family", "color": "pink" },
            { "id": "animal", "name": "Animal", "color": "amber" }
        ]),
    );
    mocks::expect_upsert_favorite(&server);

    let client = SupabaseClient::new(&server.url_str("/"), "anon-key".into()).expect("client");
    let gateway: Arc<dyn RemoteGateway> = Arc::new(client);

    let mut sessions = SessionManager::new(gateway.clone(), SessionStore::memory());
    let session = sessions
        .sign_in("user@example.com", "secret-pw")
        .await
        .expect("sign in");
    assert_eq!(session.user_id(), "user-42");

    let photos = vec![Photo::new("beach.jpg"), Photo::new("my_dog_photo.jpg")];
    let syncer = Syncer::new(gateway, Arc::new(MemoryStore::new()));
    let mut controller = GalleryController::new(photos, syncer).with_session(Some(session));
    assert_eq!(controller.load_initial_state().await, SnapshotSource::Remote);
    assert!(controller.photo("beach.jpg").expect("photo").is_favorite());
    assert_eq!(controller.categories().len(), 2);

    let mut classifier = Classifier::new();
    classifier.load_models().expect("models");
    let bucket = classifier
        .categorize("my_dog_photo.jpg", DEFAULT_THRESHOLD)
        .expect("categorize");
    assert_eq!(bucket, Bucket::Animal);

    let state = controller.toggle_favorite("my_dog_photo.jpg").await;
    assert_eq!(state, Some(FavoriteState::Confirmed));

    let favorites = controller.set_filter(Filter::Favorites).to_vec();
    assert_eq!(favorites, ["beach.jpg", "my_dog_photo.jpg"]);
}
