//! In-memory view state of the gallery.
//!
//! [`GalleryController`] owns every photo annotation for the current view,
//! applies user actions optimistically and reconciles them with the outcome
//! reported by [`Syncer`]. The visible photo list is recomputed after every
//! mutation from the active [`Filter`] and [`SortState`].

mod photo;
mod view;

pub use photo::{FavoriteState, Photo, PhotoDetails};
pub use view::{Filter, SortDirection, SortMethod, SortState};

use api_client::{Category, Session, CATEGORY_PALETTE};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use sync::{Snapshot, SnapshotSource, SyncOutcome, Syncer};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error("Validation Error: {0}")]
    Validation(String),
    #[error("Not Found: {0}")]
    NotFound(String),
}

/// Notifications for whoever renders the gallery.
#[derive(Debug, Clone, PartialEq)]
pub enum GalleryEvent {
    FavoriteChanged { photo_id: String, favorite: bool },
    FavoriteReverted { photo_id: String, favorite: bool },
    CategoriesChanged { photo_id: String },
    CategoryCreated(Category),
    VisibleChanged(usize),
}

/// An optimistic favorite change waiting for its sync outcome.
#[derive(Debug, Clone)]
pub struct FavoriteUpdate {
    pub photo_id: String,
    pub desired: bool,
    seq: u64,
    session: Option<Session>,
}

impl FavoriteUpdate {
    /// Session captured when the change was made.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

pub struct GalleryController {
    photos: Vec<Photo>,
    index: HashMap<String, usize>,
    categories: Vec<Category>,
    filter: Filter,
    sort: SortState,
    visible: Vec<String>,
    session: Option<Session>,
    syncer: Syncer,
    latest: HashMap<String, u64>,
    next_seq: u64,
    events: Option<UnboundedSender<GalleryEvent>>,
}

impl GalleryController {
    /// Photos keep the given order as their original order. Repeated ids are dropped.
    pub fn new(photos: Vec<Photo>, syncer: Syncer) -> Self {
        let mut index = HashMap::new();
        let mut unique = Vec::with_capacity(photos.len());
        for photo in photos {
            if index.contains_key(&photo.id) {
                tracing::warn!(photo_id = %photo.id, "Skipping duplicate photo");
                continue;
            }
            index.insert(photo.id.clone(), unique.len());
            unique.push(photo);
        }
        let mut controller = Self {
            photos: unique,
            index,
            categories: Category::defaults(),
            filter: Filter::All,
            sort: SortState::default(),
            visible: Vec::new(),
            session: None,
            syncer,
            latest: HashMap::new(),
            next_seq: 0,
            events: None,
        };
        controller.recompute();
        controller
    }

    pub fn with_events(mut self, events: UnboundedSender<GalleryEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_session(mut self, session: Option<Session>) -> Self {
        self.session = session;
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn syncer(&self) -> &Syncer {
        &self.syncer
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn photo(&self, photo_id: &str) -> Option<&Photo> {
        self.index.get(photo_id).map(|&i| &self.photos[i])
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    /// Ids of the visible photos in display order.
    pub fn visible_ids(&self) -> &[String] {
        &self.visible
    }

    pub fn visible_photos(&self) -> Vec<&Photo> {
        self.visible.iter().filter_map(|id| self.photo(id)).collect()
    }

    pub fn photo_details(&self, photo_id: &str) -> Result<PhotoDetails, GalleryError> {
        self.photo(photo_id)
            .map(Photo::details)
            .ok_or_else(|| GalleryError::NotFound(format!("photo '{}'", photo_id)))
    }

    fn photo_index(&self, photo_id: &str) -> Result<usize, GalleryError> {
        if photo_id.trim().is_empty() {
            return Err(GalleryError::Validation("photo id is required".into()));
        }
        self.index
            .get(photo_id)
            .copied()
            .ok_or_else(|| GalleryError::NotFound(format!("photo '{}'", photo_id)))
    }

    fn emit(&self, event: GalleryEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn recompute(&mut self) {
        let mut visible: Vec<&Photo> = self
            .photos
            .iter()
            .filter(|p| self.filter.matches(p))
            .collect();
        self.sort.apply(&mut visible);
        let ids: Vec<String> = visible.into_iter().map(|p| p.id.clone()).collect();
        if ids != self.visible {
            self.visible = ids;
            self.emit(GalleryEvent::VisibleChanged(self.visible.len()));
        }
    }

    /// Populate annotations from the backend, or from the local store when
    /// there is no session or the backend cannot be reached.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self)))]
    pub async fn load_initial_state(&mut self) -> SnapshotSource {
        let snapshot = match &self.session {
            Some(session) => match self.syncer.load_remote(session).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(error = %e, "Remote load failed; using local state");
                    self.syncer
                        .load_local(self.photos.iter().map(|p| p.id.as_str()))
                }
            },
            None => self
                .syncer
                .load_local(self.photos.iter().map(|p| p.id.as_str())),
        };
        let source = snapshot.source;
        self.apply_snapshot(snapshot);

        let (method, direction) = self.syncer.load_sort();
        self.sort = SortState::from_stored(method.as_deref(), direction.as_deref());
        self.recompute();
        tracing::info!(?source, photos = self.photos.len(), "Gallery state loaded");
        source
    }

    /// Replace every annotation with the snapshot's. Pending favorite
    /// changes become stale.
    fn apply_snapshot(&mut self, mut snapshot: Snapshot) {
        for photo in &mut self.photos {
            photo.favorite = FavoriteState::settled(snapshot.favorites.contains(&photo.id));
            photo.categories = snapshot.categories.remove(&photo.id).unwrap_or_default();
        }
        self.categories = snapshot.user_categories.unwrap_or_else(Category::defaults);
        self.latest.clear();
        if let Filter::Category(name) = &self.filter {
            if !self.label_in_use(name) {
                self.filter = Filter::All;
            }
        }
    }

    /// Whether `name` is a known category or still labels some photo.
    /// Labels outside the category list, such as classifier buckets, count.
    fn label_in_use(&self, name: &str) -> bool {
        self.categories.iter().any(|c| c.name == name)
            || self.photos.iter().any(|p| p.categories.contains(name))
    }

    /// Attach a session and reload state from the backend.
    pub async fn sign_in_session(&mut self, session: Session) -> SnapshotSource {
        tracing::info!(user_id = %session.user_id(), "Session attached");
        self.session = Some(session);
        self.load_initial_state().await
    }

    /// Drop the session and fall back to locally stored state.
    pub async fn sign_out_session(&mut self) -> SnapshotSource {
        if self.session.take().is_some() {
            tracing::info!("Session detached");
        }
        self.load_initial_state().await
    }

    /// Flip the favorite flag optimistically.
    ///
    /// The returned ticket must be settled with
    /// [`finish_toggle_favorite`](Self::finish_toggle_favorite) once the sync
    /// outcome is known.
    pub fn begin_toggle_favorite(&mut self, photo_id: &str) -> Result<FavoriteUpdate, GalleryError> {
        let idx = self.photo_index(photo_id)?;
        let photo = &mut self.photos[idx];
        let desired = !photo.is_favorite();
        photo.favorite = if desired {
            FavoriteState::PendingConfirm
        } else {
            FavoriteState::NotFavorite
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        self.latest.insert(photo_id.to_string(), seq);

        self.emit(GalleryEvent::FavoriteChanged {
            photo_id: photo_id.to_string(),
            favorite: desired,
        });
        self.recompute();
        Ok(FavoriteUpdate {
            photo_id: photo_id.to_string(),
            desired,
            seq,
            session: self.session.clone(),
        })
    }

    /// Reconcile an optimistic change with its outcome.
    ///
    /// Returns `false` when a newer change for the same photo superseded this
    /// one; its outcome is then ignored.
    pub fn finish_toggle_favorite(&mut self, update: FavoriteUpdate, outcome: SyncOutcome) -> bool {
        if self.latest.get(&update.photo_id) != Some(&update.seq) {
            tracing::debug!(photo_id = %update.photo_id, seq = update.seq, "Ignoring stale favorite result");
            return false;
        }
        self.latest.remove(&update.photo_id);
        let Some(idx) = self.index.get(&update.photo_id).copied() else {
            return false;
        };

        match outcome {
            SyncOutcome::Remote | SyncOutcome::Local => {
                self.photos[idx].favorite = FavoriteState::settled(update.desired);
            }
            SyncOutcome::Fallback(e) => {
                tracing::warn!(photo_id = %update.photo_id, error = %e, "Favorite kept locally");
                self.photos[idx].favorite = FavoriteState::settled(update.desired);
            }
            SyncOutcome::Failed(e) => {
                tracing::warn!(photo_id = %update.photo_id, error = %e, "Favorite not confirmed; reverting");
                self.photos[idx].favorite = if update.desired {
                    FavoriteState::Reverted
                } else {
                    FavoriteState::Confirmed
                };
                self.syncer
                    .store_favorite_locally(&update.photo_id, update.desired);
                self.emit(GalleryEvent::FavoriteReverted {
                    photo_id: update.photo_id.clone(),
                    favorite: self.photos[idx].is_favorite(),
                });
            }
        }
        self.recompute();
        true
    }

    /// Toggle a favorite end to end. Failures are logged, never returned.
    pub async fn toggle_favorite(&mut self, photo_id: &str) -> Option<FavoriteState> {
        let update = match self.begin_toggle_favorite(photo_id) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(photo_id, error = %e, "Cannot toggle favorite");
                return None;
            }
        };
        let outcome = self
            .syncer
            .push_favorite(update.session(), &update.photo_id, update.desired)
            .await;
        self.finish_toggle_favorite(update, outcome);
        self.photo(photo_id).map(|p| p.favorite)
    }

    /// Replace a photo's category set. Names are opaque labels; blanks are dropped.
    pub async fn set_categories<I, S>(
        &mut self,
        photo_id: &str,
        names: I,
    ) -> Result<SyncOutcome, GalleryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let idx = self.photo_index(photo_id)?;
        let set: BTreeSet<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        self.photos[idx].categories = set.clone();
        self.emit(GalleryEvent::CategoriesChanged {
            photo_id: photo_id.to_string(),
        });
        self.recompute();
        Ok(self
            .syncer
            .push_categories(self.session.as_ref(), photo_id, &set)
            .await)
    }

    fn next_category_id(&self, name: &str) -> String {
        let slug: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let id = format!("{}_{}", slug, stamp);
            if !self.categories.iter().any(|c| c.id == id) {
                return id;
            }
            stamp += 1;
        }
    }

    /// Add a category to the user's list. Duplicate names are allowed.
    pub async fn create_category(&mut self, name: &str) -> Result<Category, GalleryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GalleryError::Validation("category name is required".into()));
        }
        let category = Category {
            id: self.next_category_id(name),
            name: name.to_string(),
            color: palette_color(name).to_string(),
        };
        self.categories.push(category.clone());
        self.syncer
            .push_user_categories(self.session.as_ref(), &self.categories)
            .await;
        tracing::info!(id = %category.id, name = %category.name, "Category created");
        self.emit(GalleryEvent::CategoryCreated(category.clone()));
        Ok(category)
    }

    fn category_index(&self, category_id: &str) -> Result<usize, GalleryError> {
        self.categories
            .iter()
            .position(|c| c.id == category_id)
            .ok_or_else(|| GalleryError::NotFound(format!("category '{}'", category_id)))
    }

    /// Relabel every photo carrying `old` (dropping it when `new` is `None`)
    /// and push the changed sets.
    async fn relabel(&mut self, old: &str, new: Option<&str>) {
        let mut touched = Vec::new();
        for photo in &mut self.photos {
            if photo.categories.remove(old) {
                if let Some(new) = new {
                    photo.categories.insert(new.to_string());
                }
                touched.push((photo.id.clone(), photo.categories.clone()));
            }
        }
        for (photo_id, set) in touched {
            self.syncer
                .push_categories(self.session.as_ref(), &photo_id, &set)
                .await;
            self.emit(GalleryEvent::CategoriesChanged { photo_id });
        }
    }

    pub async fn rename_category(&mut self, category_id: &str, name: &str) -> Result<(), GalleryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GalleryError::Validation("category name is required".into()));
        }
        let idx = self.category_index(category_id)?;
        let old = std::mem::replace(&mut self.categories[idx].name, name.to_string());
        // photos labelled with a name another category still carries stay put
        let shared = self.categories.iter().any(|c| c.name == old);
        if old != name && !shared {
            self.relabel(&old, Some(name)).await;
            if self.filter == Filter::Category(old.clone()) {
                self.filter = Filter::Category(name.to_string());
            }
        }
        self.syncer
            .push_user_categories(self.session.as_ref(), &self.categories)
            .await;
        tracing::info!(id = category_id, from = %old, to = name, "Category renamed");
        self.recompute();
        Ok(())
    }

    /// Remove a category and, unless another category shares its name, its
    /// label from every photo.
    pub async fn delete_category(&mut self, category_id: &str) -> Result<Category, GalleryError> {
        let idx = self.category_index(category_id)?;
        let removed = self.categories.remove(idx);
        if !self.categories.iter().any(|c| c.name == removed.name) {
            self.relabel(&removed.name, None).await;
            if self.filter == Filter::Category(removed.name.clone()) {
                self.filter = Filter::All;
            }
        }
        self.syncer
            .push_user_categories(self.session.as_ref(), &self.categories)
            .await;
        tracing::info!(id = category_id, name = %removed.name, "Category deleted");
        self.recompute();
        Ok(removed)
    }

    /// Select the visible photos. An unknown category yields an empty view.
    pub fn set_filter(&mut self, filter: Filter) -> &[String] {
        tracing::debug!(%filter, "Filter changed");
        self.filter = filter;
        self.recompute();
        &self.visible
    }

    /// Reorder the visible photos and remember the choice.
    pub fn set_sort(&mut self, sort: SortState) -> &[String] {
        self.sort = sort;
        self.syncer
            .save_sort(sort.method.as_str(), sort.direction.as_str());
        self.recompute();
        &self.visible
    }
}

fn palette_color(name: &str) -> &'static str {
    let sum: usize = name.bytes().map(usize::from).sum();
    CATEGORY_PALETTE[sum % CATEGORY_PALETTE.len()]
}
