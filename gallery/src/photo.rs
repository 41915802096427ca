use cache::PhotoRecord;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;

/// Favorite lifecycle of a single photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoriteState {
    #[default]
    NotFavorite,
    /// Marked optimistically, waiting for the backend.
    PendingConfirm,
    Confirmed,
    /// Marking failed remotely and was rolled back.
    Reverted,
}

impl FavoriteState {
    pub fn is_favorite(&self) -> bool {
        matches!(self, FavoriteState::PendingConfirm | FavoriteState::Confirmed)
    }

    /// Settled state for a stored flag.
    pub fn settled(is_favorite: bool) -> Self {
        if is_favorite {
            FavoriteState::Confirmed
        } else {
            FavoriteState::NotFavorite
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub id: String,
    pub captured_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub favorite: FavoriteState,
    pub categories: BTreeSet<String>,
    pub placeholder: String,
}

impl Photo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            placeholder: id.clone(),
            id,
            captured_at: None,
            size_bytes: None,
            favorite: FavoriteState::NotFavorite,
            categories: BTreeSet::new(),
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn with_date(mut self, captured_at: DateTime<Utc>) -> Self {
        self.captured_at = Some(captured_at);
        self
    }

    pub fn with_placeholder(mut self, text: impl Into<String>) -> Self {
        self.placeholder = text.into();
        self
    }

    pub fn is_favorite(&self) -> bool {
        self.favorite.is_favorite()
    }

    pub fn details(&self) -> PhotoDetails {
        PhotoDetails {
            id: self.id.clone(),
            date: self
                .captured_at
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            size: self.size_bytes.unwrap_or(0),
            categories: if self.categories.is_empty() {
                "None".to_string()
            } else {
                self.categories
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            },
            favorite: if self.is_favorite() { "Yes" } else { "No" },
            preview: self.placeholder.clone(),
        }
    }
}

impl From<PhotoRecord> for Photo {
    fn from(record: PhotoRecord) -> Self {
        Self {
            id: record.id,
            captured_at: record.captured_at,
            size_bytes: record.size_bytes,
            favorite: FavoriteState::NotFavorite,
            categories: BTreeSet::new(),
            placeholder: record.placeholder,
        }
    }
}

/// Human-readable summary of one photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoDetails {
    pub id: String,
    pub date: String,
    pub size: u64,
    pub categories: String,
    pub favorite: &'static str,
    pub preview: String,
}

impl fmt::Display for PhotoDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ID:         {}", self.id)?;
        writeln!(f, "Date:       {}", self.date)?;
        writeln!(f, "Size:       {}", self.size)?;
        writeln!(f, "Categories: {}", self.categories)?;
        writeln!(f, "Favorite:   {}", self.favorite)?;
        write!(f, "Preview:    {}", self.preview)
    }
}
