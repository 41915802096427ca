use api_client::OfflineGateway;
use cache::{CacheManager, PhotoRecord};
use gallery::{Filter, GalleryController, Photo, SortDirection, SortMethod, SortState};
use std::sync::Arc;
use sync::{SnapshotSource, Syncer};
use tempfile::TempDir;

fn record(id: &str, size: u64) -> PhotoRecord {
    PhotoRecord {
        id: id.into(),
        path: None,
        captured_at: None,
        size_bytes: Some(size),
        placeholder: id.into(),
    }
}

async fn open(db: &std::path::Path) -> GalleryController {
    let cache = CacheManager::new(db).expect("cache");
    let photos: Vec<Photo> = cache
        .get_all_photos()
        .expect("photos")
        .into_iter()
        .map(Photo::from)
        .collect();
    let syncer = Syncer::new(Arc::new(OfflineGateway), Arc::new(cache));
    let mut controller = GalleryController::new(photos, syncer);
    assert_eq!(controller.load_initial_state().await, SnapshotSource::Local);
    controller
}

#[tokio::main]
async fn main() {

    let dir = TempDir::new().expect("dir");
    let db = dir.path().join("galleryze.sqlite");
    {
        let cache = CacheManager::new(&db).expect("cache");
        cache.insert_photo(&record("1.jpg", 10)).expect("insert1");
        cache.insert_photo(&record("2.jpg", 30)).expect("insert2");
        cache.insert_photo(&record("3.jpg", 20)).expect("insert3");
    }

    let mut controller = open(&db).await;
    controller.toggle_favorite("2.jpg").await.expect("toggle");
    controller
        .set_categories("3.jpg", ["Food", "Family"])
        .await
        .expect("categories");
    controller.set_sort(SortState::new(SortMethod::Size, SortDirection::Asc));
    drop(controller);

    // A fresh controller over the same database sees everything again.
    let mut controller = open(&db).await;
    assert!(controller.photo("2.jpg").expect("photo").is_favorite());
    assert_eq!(controller.sort().to_string(), "size asc");
    assert_eq!(controller.visible_ids(), ["1.jpg", "3.jpg", "2.jpg"]);

    let favorites = controller.set_filter(Filter::Favorites).to_vec();
    assert_eq!(favorites, ["2.jpg"]);

    let family = controller.set_filter(Filter::Category("Family".into())).to_vec();
    assert_eq!(family, ["3.jpg"]);

    controller.toggle_favorite("2.jpg").await.expect("toggle back");
    drop(controller);

    let cache = CacheManager::new(&db).expect("cache");
    assert!(cache.list_keys("photo_2.jpg_favorite").expect("keys").is_empty());
}
