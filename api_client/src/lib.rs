//! Remote sync gateway for Galleryze.
//!
//! The gateway is the only component that talks to the hosted backend. It is
//! exposed as the object-safe [`RemoteGateway`] trait so the rest of the
//! workspace can run against the Supabase client, an offline stand-in or a
//! test double without caring which one it holds.

mod supabase;

pub use supabase::SupabaseClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl User {
    pub fn display_name(&self) -> Option<&str> {
        self.user_metadata.display_name.as_deref()
    }
}

/// An authenticated backend session.
///
/// Every data call on [`RemoteGateway`] takes a `&Session`, so a call can only
/// be made once sign-in has resolved one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }
}

/// Result of creating an account. Backends with email confirmation enabled
/// return the user without a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    pub user: User,
    pub session: Option<Session>,
}

/// Categories every new account starts with.
pub const DEFAULT_CATEGORY_NAMES: [&str; 5] = ["Recent", "Vacation", "Family", "Food", "Nature"];

/// Colors a category may be tagged with.
pub const CATEGORY_PALETTE: [&str; 8] = [
    "red", "pink", "purple", "blue", "teal", "green", "amber", "orange",
];

/// A user-defined category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Category {
    pub fn defaults() -> Vec<Category> {
        DEFAULT_CATEGORY_NAMES
            .iter()
            .zip(CATEGORY_PALETTE.iter().cycle())
            .map(|(name, color)| Category {
                id: name.to_lowercase(),
                name: name.to_string(),
                color: color.to_string(),
            })
            .collect()
    }
}

/// Category assignment of a single photo as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoCategories {
    pub photo_id: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Request Error: {0}")]
    Request(String),
    #[error("Backend Error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Authentication Error: {0}")]
    Auth(String),
    #[error("Gateway call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Decode Error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether the error means the credentials themselves were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, GatewayError::Auth(_))
    }
}

#[async_trait]
pub trait RemoteGateway: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn get_user(&self, session: &Session) -> Result<User, GatewayError>;

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUp, GatewayError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError>;

    async fn sign_out(&self, session: &Session) -> Result<(), GatewayError>;

    async fn upsert_favorite(
        &self,
        session: &Session,
        photo_id: &str,
        is_favorite: bool,
    ) -> Result<(), GatewayError>;

    /// Ids of the photos currently marked as favorite.
    async fn list_favorites(&self, session: &Session) -> Result<Vec<String>, GatewayError>;

    async fn upsert_photo_categories(
        &self,
        session: &Session,
        photo_id: &str,
        categories: &[String],
    ) -> Result<(), GatewayError>;

    async fn list_photo_categories(
        &self,
        session: &Session,
        photo_id: Option<&str>,
    ) -> Result<Vec<PhotoCategories>, GatewayError>;

    /// The user's stored category list, or `None` when nothing was ever saved.
    async fn get_user_categories(
        &self,
        session: &Session,
    ) -> Result<Option<Vec<Category>>, GatewayError>;

    async fn set_user_categories(
        &self,
        session: &Session,
        categories: &[Category],
    ) -> Result<(), GatewayError>;
}

/// Gateway used when no backend is configured. Every call fails, which the
/// sync layer treats like any other outage.
#[derive(Debug, Default, Clone)]
pub struct OfflineGateway;

impl OfflineGateway {
    fn unavailable<T>() -> Result<T, GatewayError> {
        Err(GatewayError::Unavailable("no backend configured".into()))
    }
}

#[async_trait]
impl RemoteGateway for OfflineGateway {
    fn backend_tag(&self) -> &'static str {
        "offline"
    }

    async fn get_user(&self, _session: &Session) -> Result<User, GatewayError> {
        Self::unavailable()
    }

    async fn create_user(&self, _: &str, _: &str, _: &str) -> Result<SignUp, GatewayError> {
        Self::unavailable()
    }

    async fn sign_in(&self, _: &str, _: &str) -> Result<Session, GatewayError> {
        Self::unavailable()
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), GatewayError> {
        Self::unavailable()
    }

    async fn upsert_favorite(&self, _: &Session, _: &str, _: bool) -> Result<(), GatewayError> {
        Self::unavailable()
    }

    async fn list_favorites(&self, _: &Session) -> Result<Vec<String>, GatewayError> {
        Self::unavailable()
    }

    async fn upsert_photo_categories(
        &self,
        _: &Session,
        _: &str,
        _: &[String],
    ) -> Result<(), GatewayError> {
        Self::unavailable()
    }

    async fn list_photo_categories(
        &self,
        _: &Session,
        _: Option<&str>,
    ) -> Result<Vec<PhotoCategories>, GatewayError> {
        Self::unavailable()
    }

    async fn get_user_categories(&self, _: &Session) -> Result<Option<Vec<Category>>, GatewayError> {
        Self::unavailable()
    }

    async fn set_user_categories(&self, _: &Session, _: &[Category]) -> Result<(), GatewayError> {
        Self::unavailable()
    }
}
