//! Synchronization policy between the backend and the local preference store.
//!
//! Writes go to the backend when a session exists and fall back to the local
//! store when it does not, or when the backend call fails. Category data is
//! additionally mirrored locally so an offline start still finds it.

use api_client::{Category, GatewayError, RemoteGateway, Session};
use cache::{keys, PreferenceStore};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Gateway Error: {0}")]
    Gateway(#[from] GatewayError),
}

/// How a write was settled.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Confirmed by the backend.
    Remote,
    /// No session; written to the local store only.
    Local,
    /// Backend failed and the value was written locally instead.
    Fallback(GatewayError),
    /// Backend failed and nothing was written. The caller decides what to keep.
    Failed(GatewayError),
}

impl SyncOutcome {
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncOutcome::Remote)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotSource {
    #[default]
    Local,
    Remote,
}

/// Favorite and category annotations as loaded from one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub source: SnapshotSource,
    pub favorites: HashSet<String>,
    pub categories: HashMap<String, BTreeSet<String>>,
    /// `None` when the source holds no category list at all.
    pub user_categories: Option<Vec<Category>>,
}

#[derive(Clone)]
pub struct Syncer {
    gateway: Arc<dyn RemoteGateway>,
    store: Arc<dyn PreferenceStore>,
    timeout: Duration,
}

impl Syncer {
    pub fn new(gateway: Arc<dyn RemoteGateway>, store: Arc<dyn PreferenceStore>) -> Self {
        Self {
            gateway,
            store,
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn gateway(&self) -> &Arc<dyn RemoteGateway> {
        &self.gateway
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
    }

    /// Read a local preference. Store failures read as absent.
    pub fn read_local(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(key, error = %e, "Local store read failed");
                None
            }
        }
    }

    /// Write a local preference. Store failures are logged and swallowed.
    pub fn write_local(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            tracing::warn!(key, error = %e, "Local store write failed");
        }
    }

    pub fn remove_local(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "Local store remove failed");
        }
    }

    /// Record a favorite flag locally. Un-favoriting removes the key so no
    /// residue is left behind.
    pub fn store_favorite_locally(&self, photo_id: &str, is_favorite: bool) {
        let key = keys::favorite(photo_id);
        if is_favorite {
            self.write_local(&key, "true");
        } else {
            self.remove_local(&key);
        }
    }

    fn store_categories_locally(&self, photo_id: &str, categories: &BTreeSet<String>) {
        let key = keys::categories(photo_id);
        if categories.is_empty() {
            self.remove_local(&key);
            return;
        }
        match serde_json::to_string(categories) {
            Ok(data) => self.write_local(&key, &data),
            Err(e) => tracing::warn!(photo_id, error = %e, "Failed to encode categories"),
        }
    }

    fn store_user_categories_locally(&self, categories: &[Category]) {
        match serde_json::to_string(categories) {
            Ok(data) => self.write_local(keys::CUSTOM_CATEGORIES, &data),
            Err(e) => tracing::warn!(error = %e, "Failed to encode category list"),
        }
    }

    /// Persist a favorite flag.
    ///
    /// A backend failure is reported as [`SyncOutcome::Failed`] without any
    /// local write: only the caller knows whether the request is still the
    /// latest one for the photo.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session)))]
    pub async fn push_favorite(
        &self,
        session: Option<&Session>,
        photo_id: &str,
        is_favorite: bool,
    ) -> SyncOutcome {
        let Some(session) = session else {
            self.store_favorite_locally(photo_id, is_favorite);
            return SyncOutcome::Local;
        };
        match self
            .bounded(self.gateway.upsert_favorite(session, photo_id, is_favorite))
            .await
        {
            Ok(()) => SyncOutcome::Remote,
            Err(e) => {
                tracing::warn!(photo_id, error = %e, "Favorite upsert failed");
                SyncOutcome::Failed(e)
            }
        }
    }

    /// Persist a photo's category set. The local store always receives a copy.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session)))]
    pub async fn push_categories(
        &self,
        session: Option<&Session>,
        photo_id: &str,
        categories: &BTreeSet<String>,
    ) -> SyncOutcome {
        self.store_categories_locally(photo_id, categories);
        let Some(session) = session else {
            return SyncOutcome::Local;
        };
        let list: Vec<String> = categories.iter().cloned().collect();
        match self
            .bounded(self.gateway.upsert_photo_categories(session, photo_id, &list))
            .await
        {
            Ok(()) => SyncOutcome::Remote,
            Err(e) => {
                tracing::warn!(photo_id, error = %e, "Category upsert failed; kept locally");
                SyncOutcome::Fallback(e)
            }
        }
    }

    /// Persist the user's category list. The local store always receives a copy.
    pub async fn push_user_categories(
        &self,
        session: Option<&Session>,
        categories: &[Category],
    ) -> SyncOutcome {
        self.store_user_categories_locally(categories);
        let Some(session) = session else {
            return SyncOutcome::Local;
        };
        match self
            .bounded(self.gateway.set_user_categories(session, categories))
            .await
        {
            Ok(()) => SyncOutcome::Remote,
            Err(e) => {
                tracing::warn!(error = %e, "Category list update failed; kept locally");
                SyncOutcome::Fallback(e)
            }
        }
    }

    /// Pull favorites and categories from the backend. The first failing call
    /// aborts the load.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, session)))]
    pub async fn load_remote(&self, session: &Session) -> Result<Snapshot, SyncError> {
        let favorites = self.bounded(self.gateway.list_favorites(session)).await?;
        let rows = self
            .bounded(self.gateway.list_photo_categories(session, None))
            .await?;
        let user_categories = self
            .bounded(self.gateway.get_user_categories(session))
            .await?;

        let categories = rows
            .into_iter()
            .map(|row| (row.photo_id, row.categories.into_iter().collect()))
            .collect();

        tracing::info!(
            favorites = favorites.len(),
            categories = user_categories.as_ref().map_or(0, Vec::len),
            stored_categories = user_categories.is_some(),
            "Loaded remote state"
        );
        Ok(Snapshot {
            source: SnapshotSource::Remote,
            favorites: favorites.into_iter().collect(),
            categories,
            user_categories,
        })
    }

    /// Stored sort preference as raw `(method, direction)` values.
    pub fn load_sort(&self) -> (Option<String>, Option<String>) {
        (
            self.read_local(keys::SORT_METHOD),
            self.read_local(keys::SORT_DIRECTION),
        )
    }

    pub fn save_sort(&self, method: &str, direction: &str) {
        self.write_local(keys::SORT_METHOD, method);
        self.write_local(keys::SORT_DIRECTION, direction);
    }

    /// Build a snapshot for `photo_ids` from the local store alone.
    pub fn load_local<'a, I>(&self, photo_ids: I) -> Snapshot
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut snapshot = Snapshot::default();
        for id in photo_ids {
            if self.read_local(&keys::favorite(id)).as_deref() == Some("true") {
                snapshot.favorites.insert(id.to_string());
            }
            if let Some(raw) = self.read_local(&keys::categories(id)) {
                let set = decode_categories(&raw);
                if !set.is_empty() {
                    snapshot.categories.insert(id.to_string(), set);
                }
            }
        }
        snapshot.user_categories = self
            .read_local(keys::CUSTOM_CATEGORIES)
            .and_then(|raw| match serde_json::from_str::<Vec<Category>>(&raw) {
                Ok(list) => Some(list),
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring unreadable category list");
                    None
                }
            });
        snapshot
    }
}

/// Decode a stored category set. Older entries are plain comma-separated
/// lists rather than JSON arrays.
fn decode_categories(raw: &str) -> BTreeSet<String> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list.into_iter().collect();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
