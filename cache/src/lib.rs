//! Local preference store for Galleryze.
//!
//! Everything the gallery must remember without a backend lives here: the
//! per-photo favorite and category annotations, the sort preference, the
//! custom category list and the local photo catalog.

mod memory;

pub use memory::MemoryStore;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rusqlite_migration::{Migrations, M};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database Error: {0}")]
    DatabaseError(String),
    #[error("Serialization Error: {0}")]
    SerializationError(String),
    #[error("Other Error: {0}")]
    Other(String),
}

/// Durable key/value persistence.
///
/// Access is synchronous and may be called from any point, including a
/// recovery path after a failed backend call.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}

/// Key layout of the preference store.
pub mod keys {
    pub const SORT_METHOD: &str = "sort_method";
    pub const SORT_DIRECTION: &str = "sort_direction";
    pub const CUSTOM_CATEGORIES: &str = "custom_categories";

    pub fn favorite(photo_id: &str) -> String {
        format!("photo_{}_favorite", photo_id)
    }

    pub fn categories(photo_id: &str) -> String {
        format!("photo_{}_categories", photo_id)
    }

    /// Newest modification time already classified below `dir`.
    pub fn last_import_mtime(dir: &str) -> String {
        format!("last_import_mtime_{}", dir)
    }
}

/// A photo known to the local catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    pub id: String,
    pub path: Option<String>,
    pub captured_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub placeholder: String,
}

#[derive(Clone)]
pub struct CacheManager {
    conn: Arc<Mutex<Connection>>,
}

fn apply_migrations(conn: &mut Connection) -> Result<(), CacheError> {
    let migrations = Migrations::new(vec![
        M::up(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);\
             INSERT INTO schema_version (version) VALUES (1);\
             CREATE TABLE IF NOT EXISTS preferences (\
                 key TEXT PRIMARY KEY,\
                 value TEXT NOT NULL\
             );",
        ),
        M::up(
            "CREATE TABLE IF NOT EXISTS photos (\
                 id TEXT PRIMARY KEY,\
                 path TEXT,\
                 captured_at INTEGER,\
                 size_bytes INTEGER,\
                 placeholder TEXT NOT NULL DEFAULT ''\
             );\
             UPDATE schema_version SET version = 2;",
        ),
        M::up(
            "CREATE INDEX IF NOT EXISTS idx_photos_captured_at ON photos (captured_at);\
             UPDATE schema_version SET version = 3;",
        ),
    ]);
    migrations
        .to_latest(conn)
        .map_err(|e| CacheError::DatabaseError(format!("Failed to apply migrations: {}", e)))?;
    Ok(())
}

impl CacheManager {
    pub fn lock_conn(&self) -> Result<std::sync::MutexGuard<Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Other("Poisoned lock".into()))
    }

    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        let mut conn = Connection::open(db_path)
            .map_err(|e| CacheError::DatabaseError(format!("Failed to open database: {}", e)))?;
        apply_migrations(&mut conn)?;
        tracing::debug!(path = ?db_path, "Opened preference store");
        Ok(CacheManager { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn in_memory() -> Result<Self, CacheError> {
        let mut conn = Connection::open_in_memory()
            .map_err(|e| CacheError::DatabaseError(format!("Failed to open database: {}", e)))?;
        apply_migrations(&mut conn)?;
        Ok(CacheManager { conn: Arc::new(Mutex::new(conn)) })
    }

    /// All preference keys starting with `prefix`, sorted.
    pub fn list_keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT key FROM preferences WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key")
            .map_err(|e| CacheError::DatabaseError(format!("Failed to prepare statement: {}", e)))?;
        let iter = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))
            .map_err(|e| CacheError::DatabaseError(format!("Failed to query keys: {}", e)))?;
        let mut keys = Vec::new();
        for key in iter {
            keys.push(key.map_err(|e| CacheError::DatabaseError(format!("Failed to read key: {}", e)))?);
        }
        Ok(keys)
    }

    pub fn insert_photo(&self, photo: &PhotoRecord) -> Result<(), CacheError> {
        let size = photo
            .size_bytes
            .map(i64::try_from)
            .transpose()
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT INTO photos (id, path, captured_at, size_bytes, placeholder)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                 path = excluded.path,
                 captured_at = excluded.captured_at,
                 size_bytes = excluded.size_bytes,
                 placeholder = excluded.placeholder",
            params![
                photo.id,
                photo.path,
                photo.captured_at.map(|t| t.timestamp()),
                size,
                photo.placeholder
            ],
        )
        .map_err(|e| CacheError::DatabaseError(format!("Failed to insert photo: {}", e)))?;
        Ok(())
    }

    fn row_to_photo(row: &rusqlite::Row<'_>) -> rusqlite::Result<PhotoRecord> {
        let captured: Option<i64> = row.get(2)?;
        let size: Option<i64> = row.get(3)?;
        Ok(PhotoRecord {
            id: row.get(0)?,
            path: row.get(1)?,
            captured_at: captured.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            size_bytes: size.and_then(|s| u64::try_from(s).ok()),
            placeholder: row.get(4)?,
        })
    }

    pub fn get_photo(&self, id: &str) -> Result<Option<PhotoRecord>, CacheError> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT id, path, captured_at, size_bytes, placeholder FROM photos WHERE id = ?1",
            params![id],
            Self::row_to_photo,
        )
        .optional()
        .map_err(|e| CacheError::DatabaseError(format!("Failed to query photo: {}", e)))
    }

    /// All catalog photos in the order they were first registered.
    pub fn get_all_photos(&self) -> Result<Vec<PhotoRecord>, CacheError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn
            .prepare("SELECT id, path, captured_at, size_bytes, placeholder FROM photos ORDER BY rowid")
            .map_err(|e| CacheError::DatabaseError(format!("Failed to prepare statement: {}", e)))?;
        let iter = stmt
            .query_map([], Self::row_to_photo)
            .map_err(|e| CacheError::DatabaseError(format!("Failed to query photos: {}", e)))?;

        let mut photos = Vec::new();
        for photo in iter {
            photos.push(photo.map_err(|e| {
                CacheError::DatabaseError(format!("Failed to retrieve photo from iterator: {}", e))
            })?);
        }
        Ok(photos)
    }

    /// Remove a photo together with its local annotations.
    pub fn delete_photo(&self, id: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM photos WHERE id = ?1", params![id])
            .map_err(|e| CacheError::DatabaseError(format!("Failed to delete photo: {}", e)))?;
        conn.execute(
            "DELETE FROM preferences WHERE key IN (?1, ?2)",
            params![keys::favorite(id), keys::categories(id)],
        )
        .map_err(|e| CacheError::DatabaseError(format!("Failed to delete annotations: {}", e)))?;
        Ok(())
    }

    pub fn clear_photos(&self) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM photos", [])
            .map_err(|e| CacheError::DatabaseError(format!("Failed to clear photos: {}", e)))?;
        Ok(())
    }

    pub async fn insert_photo_async(&self, photo: PhotoRecord) -> Result<(), CacheError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.insert_photo(&photo))
            .await
            .map_err(|e| CacheError::Other(e.to_string()))?
    }

    pub async fn get_all_photos_async(&self) -> Result<Vec<PhotoRecord>, CacheError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.get_all_photos())
            .await
            .map_err(|e| CacheError::Other(e.to_string()))?
    }
}

impl PreferenceStore for CacheManager {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT value FROM preferences WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CacheError::DatabaseError(format!("Failed to read preference: {}", e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| CacheError::DatabaseError(format!("Failed to write preference: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM preferences WHERE key = ?1", params![key])
            .map_err(|e| CacheError::DatabaseError(format!("Failed to remove preference: {}", e)))?;
        Ok(())
    }
}
