//! Session lifecycle for Galleryze.
//!
//! A [`SessionManager`] owns the one explicit session object of the process.
//! It is created on sign-in (or restored from the [`SessionStore`]) and torn
//! down on sign-out. Without it nothing reaches the backend.

use api_client::{Category, GatewayError, RemoteGateway, Session, SignUp};
use keyring::Entry;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

const KEYRING_SERVICE_NAME: &str = "Galleryze";
const KEYRING_ACCOUNT: &str = "session";
pub const USE_FILE_STORE_ENV: &str = "GALLERYZE_SESSION_FILE";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Keyring Error: {0}")]
    Keyring(String),
    #[error("Storage Error: {0}")]
    Storage(String),
    #[error("Validation Error: {0}")]
    Validation(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<keyring::Error> for AuthError {
    fn from(e: keyring::Error) -> Self {
        AuthError::Keyring(e.to_string())
    }
}

/// Where the signed-in session is persisted between runs.
#[derive(Clone)]
pub enum SessionStore {
    Keyring,
    File(PathBuf),
    Memory(Arc<Mutex<Option<Session>>>),
}

impl SessionStore {
    /// Pick a store from the environment: `GALLERYZE_SESSION_FILE=1` selects
    /// the JSON file, otherwise the system keyring is used. `MOCK_KEYRING`
    /// swaps the keyring for its in-process mock.
    pub fn from_env() -> Self {
        if std::env::var("MOCK_KEYRING").is_ok() {
            keyring::set_default_credential_builder(keyring::mock::default_credential_builder());
        }
        if std::env::var(USE_FILE_STORE_ENV).map(|v| v == "1").unwrap_or(false) {
            SessionStore::File(Self::default_file_path())
        } else {
            SessionStore::Keyring
        }
    }

    pub fn memory() -> Self {
        SessionStore::Memory(Arc::new(Mutex::new(None)))
    }

    pub fn default_file_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".galleryze")
            .join("session.json")
    }

    pub fn load(&self) -> Result<Option<Session>, AuthError> {
        match self {
            SessionStore::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE_NAME, KEYRING_ACCOUNT)?;
                match entry.get_password() {
                    Ok(data) => serde_json::from_str(&data)
                        .map(Some)
                        .map_err(|e| AuthError::Storage(e.to_string())),
                    Err(keyring::Error::NoEntry) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            SessionStore::File(path) => {
                if !path.exists() {
                    return Ok(None);
                }
                let data = std::fs::read_to_string(path)
                    .map_err(|e| AuthError::Storage(format!("Failed to read {:?}: {}", path, e)))?;
                serde_json::from_str(&data)
                    .map(Some)
                    .map_err(|e| AuthError::Storage(e.to_string()))
            }
            SessionStore::Memory(slot) => Ok(slot
                .lock()
                .map_err(|_| AuthError::Storage("Poisoned lock".into()))?
                .clone()),
        }
    }

    pub fn save(&self, session: &Session) -> Result<(), AuthError> {
        match self {
            SessionStore::Keyring => {
                let data = serde_json::to_string(session).map_err(|e| AuthError::Storage(e.to_string()))?;
                let entry = Entry::new(KEYRING_SERVICE_NAME, KEYRING_ACCOUNT)?;
                entry.set_password(&data)?;
                Ok(())
            }
            SessionStore::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| AuthError::Storage(e.to_string()))?;
                }
                let data = serde_json::to_string_pretty(session)
                    .map_err(|e| AuthError::Storage(e.to_string()))?;
                std::fs::write(path, data)
                    .map_err(|e| AuthError::Storage(format!("Failed to write {:?}: {}", path, e)))
            }
            SessionStore::Memory(slot) => {
                *slot
                    .lock()
                    .map_err(|_| AuthError::Storage("Poisoned lock".into()))? = Some(session.clone());
                Ok(())
            }
        }
    }

    pub fn clear(&self) -> Result<(), AuthError> {
        match self {
            SessionStore::Keyring => {
                let entry = Entry::new(KEYRING_SERVICE_NAME, KEYRING_ACCOUNT)?;
                match entry.delete_password() {
                    Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                    Err(e) => Err(e.into()),
                }
            }
            SessionStore::File(path) => {
                if path.exists() {
                    std::fs::remove_file(path).map_err(|e| AuthError::Storage(e.to_string()))?;
                }
                Ok(())
            }
            SessionStore::Memory(slot) => {
                *slot
                    .lock()
                    .map_err(|_| AuthError::Storage("Poisoned lock".into()))? = None;
                Ok(())
            }
        }
    }
}

pub struct SessionManager {
    gateway: Arc<dyn RemoteGateway>,
    store: SessionStore,
    current: Option<Session>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(gateway: Arc<dyn RemoteGateway>, store: SessionStore) -> Self {
        Self {
            gateway,
            store,
            current: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))?
    }

    fn remember(&mut self, session: Session) -> Session {
        if let Err(e) = self.store.save(&session) {
            tracing::warn!(error = %e, "Failed to persist session; it will not survive a restart");
        }
        self.current = Some(session.clone());
        session
    }

    /// Create an account. When the backend signs the new user in right away
    /// the default categories are seeded and the session becomes current.
    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, password)))]
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUp, AuthError> {
        validate_credentials(email, password)?;
        if display_name.trim().is_empty() {
            return Err(AuthError::Validation("display name must not be empty".into()));
        }

        let gateway = self.gateway.clone();
        let signup = self
            .bounded(gateway.create_user(email.trim(), password, display_name.trim()))
            .await?;
        tracing::info!(user = %signup.user.id, "Account created");

        if let Some(session) = &signup.session {
            let defaults = Category::defaults();
            if let Err(e) = self
                .bounded(gateway.set_user_categories(session, &defaults))
                .await
            {
                tracing::warn!(error = %e, "Failed to seed default categories");
            }
            self.remember(session.clone());
        }
        Ok(signup)
    }

    #[cfg_attr(feature = "trace-spans", tracing::instrument(skip(self, password)))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<Session, AuthError> {
        validate_credentials(email, password)?;
        let gateway = self.gateway.clone();
        let session = self.bounded(gateway.sign_in(email.trim(), password)).await?;
        tracing::info!(user = %session.user_id(), "Signed in");
        Ok(self.remember(session))
    }

    /// Tear the session down. The backend call is best effort; the local
    /// session is dropped either way.
    pub async fn sign_out(&mut self) -> Result<(), AuthError> {
        if let Some(session) = self.current.take() {
            let gateway = self.gateway.clone();
            if let Err(e) = self.bounded(gateway.sign_out(&session)).await {
                tracing::warn!(error = %e, "Backend sign-out failed");
            }
        }
        self.store.clear()?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Re-establish the stored session if the backend still accepts it.
    ///
    /// Rejected sessions are deleted. Unreachable backends leave the stored
    /// session alone so a later run can try again.
    pub async fn restore(&mut self) -> Option<Session> {
        let stored = match self.store.load() {
            Ok(Some(s)) => s,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load stored session");
                return None;
            }
        };

        let gateway = self.gateway.clone();
        match self.bounded(gateway.get_user(&stored)).await {
            Ok(user) => {
                let mut session = stored;
                session.user = user;
                self.current = Some(session.clone());
                Some(session)
            }
            Err(e) if e.is_auth() => {
                tracing::info!(error = %e, "Stored session rejected; clearing it");
                if let Err(e) = self.store.clear() {
                    tracing::warn!(error = %e, "Failed to clear stored session");
                }
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Backend unreachable; continuing offline");
                None
            }
        }
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() {
        return Err(AuthError::Validation("email must not be empty".into()));
    }
    if password.is_empty() {
        return Err(AuthError::Validation("password must not be empty".into()));
    }
    Ok(())
}
