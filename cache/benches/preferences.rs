use cache::{keys, CacheManager, PhotoRecord, PreferenceStore};
use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use tempfile::NamedTempFile;

fn bench_load_annotations(c: &mut Criterion) {
    let tmp = NamedTempFile::new().unwrap();
    let cache = CacheManager::new(tmp.path()).unwrap();

    for i in 0..5_000u32 {
        let id = i.to_string();
        cache
            .insert_photo(&PhotoRecord {
                id: id.clone(),
                path: None,
                captured_at: Utc.timestamp_opt(1_700_000_000 + i64::from(i), 0).single(),
                size_bytes: Some(u64::from(i) * 10),
                placeholder: id.clone(),
            })
            .unwrap();
        if i % 3 == 0 {
            cache.set(&keys::favorite(&id), "true").unwrap();
        }
        cache.set(&keys::categories(&id), r#"["Food","Family"]"#).unwrap();
    }

    c.bench_function("load_annotations", |b| {
        b.iter(|| {
            for photo in cache.get_all_photos().unwrap() {
                let _ = cache.get(&keys::favorite(&photo.id)).unwrap();
                let _ = cache.get(&keys::categories(&photo.id)).unwrap();
            }
        })
    });
}

criterion_group!(benches, bench_load_annotations);
criterion_main!(benches);
