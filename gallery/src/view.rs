use crate::{GalleryError, Photo};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which photos are visible.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Favorites,
    /// Photos labelled with this category name.
    Category(String),
}

impl Filter {
    pub fn matches(&self, photo: &Photo) -> bool {
        match self {
            Filter::All => true,
            Filter::Favorites => photo.is_favorite(),
            Filter::Category(name) => photo.categories.contains(name),
        }
    }
}

impl FromStr for Filter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s {
            "" | "all" => Filter::All,
            "favorites" => Filter::Favorites,
            other => Filter::Category(other.to_string()),
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "all"),
            Filter::Favorites => write!(f, "favorites"),
            Filter::Category(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMethod {
    #[default]
    Date,
    Size,
}

impl SortMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMethod::Date => "date",
            SortMethod::Size => "size",
        }
    }
}

impl FromStr for SortMethod {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "date" => Ok(SortMethod::Date),
            "size" => Ok(SortMethod::Size),
            other => Err(GalleryError::Validation(format!(
                "unknown sort method '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(GalleryError::Validation(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

/// Sort preference. Defaults to newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortState {
    pub method: SortMethod,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(method: SortMethod, direction: SortDirection) -> Self {
        Self { method, direction }
    }

    /// Parse stored values, falling back to the default for anything unreadable.
    pub fn from_stored(method: Option<&str>, direction: Option<&str>) -> Self {
        let default = SortState::default();
        let method = method.map_or(Ok(default.method), str::parse).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring stored sort method");
            default.method
        });
        let direction = direction
            .map_or(Ok(default.direction), str::parse)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring stored sort direction");
                default.direction
            });
        Self { method, direction }
    }

    fn key(&self, photo: &Photo) -> i64 {
        match self.method {
            SortMethod::Date => photo.captured_at.map_or(0, |d| d.timestamp_millis()),
            SortMethod::Size => photo
                .size_bytes
                .map_or(0, |s| i64::try_from(s).unwrap_or(i64::MAX)),
        }
    }

    pub fn compare(&self, a: &Photo, b: &Photo) -> Ordering {
        let ord = self.key(a).cmp(&self.key(b));
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    /// Stable in-place sort; equal keys keep their relative order.
    pub fn apply(&self, photos: &mut [&Photo]) {
        photos.sort_by(|a, b| self.compare(a, b));
    }
}

impl fmt::Display for SortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.as_str(), self.direction.as_str())
    }
}
