use cache::{keys, CacheManager, MemoryStore, PhotoRecord, PreferenceStore};
use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use tempfile::NamedTempFile;

fn sample_photo(id: &str) -> PhotoRecord {
    PhotoRecord {
        id: id.to_string(),
        path: Some(format!("/tmp/{}.jpg", id)),
        captured_at: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
        size_bytes: Some(2048),
        placeholder: id.to_uppercase(),
    }
}

#[test]
fn test_new_applies_migrations() {
    let file = NamedTempFile::new().unwrap();
    let _ = CacheManager::new(file.path()).unwrap();
    let conn = Connection::open(file.path()).unwrap();
    let version: i64 = conn
        .query_row("SELECT version FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, 3);
}

#[test]
fn test_reopen_keeps_preferences() {
    let file = NamedTempFile::new().unwrap();
    {
        let cache = CacheManager::new(file.path()).unwrap();
        cache.set(&keys::favorite("1"), "true").unwrap();
        cache.set(keys::SORT_DIRECTION, "asc").unwrap();
    }
    let cache = CacheManager::new(file.path()).unwrap();
    assert_eq!(cache.get(&keys::favorite("1")).unwrap().as_deref(), Some("true"));
    assert_eq!(cache.get(keys::SORT_DIRECTION).unwrap().as_deref(), Some("asc"));
}

#[test]
fn test_insert_and_query_photo() {
    let file = NamedTempFile::new().unwrap();
    let cache = CacheManager::new(file.path()).unwrap();
    let photo = sample_photo("holiday");
    cache.insert_photo(&photo).unwrap();
    let retrieved = cache.get_photo("holiday").unwrap().unwrap();
    assert_eq!(retrieved, photo);
}

#[test]
fn test_photo_without_metadata() {
    let cache = CacheManager::in_memory().unwrap();
    let photo = PhotoRecord {
        id: "bare".into(),
        path: None,
        captured_at: None,
        size_bytes: None,
        placeholder: String::new(),
    };
    cache.insert_photo(&photo).unwrap();
    assert_eq!(cache.get_photo("bare").unwrap(), Some(photo));
}

#[test]
fn test_clear_photos_keeps_preferences() {
    let cache = CacheManager::in_memory().unwrap();
    cache.insert_photo(&sample_photo("a")).unwrap();
    cache.set(keys::SORT_METHOD, "size").unwrap();
    cache.clear_photos().unwrap();
    assert!(cache.get_all_photos().unwrap().is_empty());
    assert_eq!(cache.get(keys::SORT_METHOD).unwrap().as_deref(), Some("size"));
}

#[test]
fn test_list_keys_by_prefix() {
    let cache = CacheManager::in_memory().unwrap();
    cache.set(&keys::favorite("b"), "true").unwrap();
    cache.set(&keys::favorite("a"), "true").unwrap();
    cache.set(keys::CUSTOM_CATEGORIES, "[]").unwrap();
    let found = cache.list_keys("photo_").unwrap();
    assert_eq!(found, vec!["photo_a_favorite", "photo_b_favorite"]);
}

#[test]
fn test_memory_store_behaves_like_cache() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    store.set("k", "v").unwrap();
    assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    store.remove("k").unwrap();
    assert_eq!(store.get("k").unwrap(), None);
    assert_eq!(store.len(), 0);
}

#[tokio::test]
async fn test_async_photo_roundtrip() {
    let cache = CacheManager::in_memory().unwrap();
    cache.insert_photo_async(sample_photo("x")).await.unwrap();
    cache.insert_photo_async(sample_photo("y")).await.unwrap();
    let photos = cache.get_all_photos_async().await.unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0].id, "x");
}
