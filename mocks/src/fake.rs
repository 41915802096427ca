use api_client::{
    Category, GatewayError, PhotoCategories, RemoteGateway, Session, SignUp, User, UserMetadata,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct FakeState {
    accounts: HashMap<String, (String, User)>,
    favorites: HashMap<(String, String), bool>,
    photo_categories: HashMap<(String, String), Vec<String>>,
    user_categories: HashMap<String, Vec<Category>>,
    next_user: u64,
}

/// In-memory [`RemoteGateway`] with failure and latency injection.
pub struct FakeGateway {
    state: Mutex<FakeState>,
    pub fail_writes: AtomicBool,
    pub fail_reads: AtomicBool,
    pub auto_confirm: AtomicBool,
    pub calls: AtomicU64,
    delay: Mutex<Duration>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
            auto_confirm: AtomicBool::new(true),
            calls: AtomicU64::new(0),
            delay: Mutex::new(Duration::ZERO),
        }
    }
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account and return a session for it.
    pub fn with_account(&self, email: &str, password: &str) -> Session {
        let mut state = self.state.lock().unwrap();
        state.next_user += 1;
        let user = User {
            id: format!("user-{}", state.next_user),
            email: Some(email.to_string()),
            user_metadata: UserMetadata::default(),
        };
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), user.clone()));
        Self::session_for(user)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Remote favorite flag of a photo, if one was ever written.
    pub fn favorite(&self, user_id: &str, photo_id: &str) -> Option<bool> {
        self.state
            .lock()
            .unwrap()
            .favorites
            .get(&(user_id.to_string(), photo_id.to_string()))
            .copied()
    }

    pub fn photo_categories(&self, user_id: &str, photo_id: &str) -> Option<Vec<String>> {
        self.state
            .lock()
            .unwrap()
            .photo_categories
            .get(&(user_id.to_string(), photo_id.to_string()))
            .cloned()
    }

    pub fn user_categories(&self, user_id: &str) -> Option<Vec<Category>> {
        self.state.lock().unwrap().user_categories.get(user_id).cloned()
    }

    fn session_for(user: User) -> Session {
        Session {
            access_token: format!("token-{}", user.id),
            refresh_token: None,
            expires_in: Some(3600),
            user,
        }
    }

    async fn enter(&self, write: bool) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let failing = if write {
            self.fail_writes.load(Ordering::SeqCst)
        } else {
            self.fail_reads.load(Ordering::SeqCst)
        };
        if failing {
            return Err(GatewayError::Request("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn get_user(&self, session: &Session) -> Result<User, GatewayError> {
        self.enter(false).await?;
        let state = self.state.lock().unwrap();
        state
            .accounts
            .values()
            .map(|(_, user)| user)
            .find(|user| user.id == session.user_id())
            .cloned()
            .ok_or_else(|| GatewayError::Auth("invalid JWT".into()))
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUp, GatewayError> {
        self.enter(true).await?;
        let mut state = self.state.lock().unwrap();
        if state.accounts.contains_key(email) {
            return Err(GatewayError::Api {
                status: 422,
                message: "User already registered".into(),
            });
        }
        state.next_user += 1;
        let user = User {
            id: format!("user-{}", state.next_user),
            email: Some(email.to_string()),
            user_metadata: UserMetadata {
                display_name: Some(display_name.to_string()),
            },
        };
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), user.clone()));
        let session = self
            .auto_confirm
            .load(Ordering::SeqCst)
            .then(|| Self::session_for(user.clone()));
        Ok(SignUp { user, session })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, GatewayError> {
        self.enter(false).await?;
        let state = self.state.lock().unwrap();
        match state.accounts.get(email) {
            Some((stored, user)) if stored == password => Ok(Self::session_for(user.clone())),
            _ => Err(GatewayError::Auth("Invalid login credentials".into())),
        }
    }

    async fn sign_out(&self, _session: &Session) -> Result<(), GatewayError> {
        self.enter(true).await
    }

    async fn upsert_favorite(
        &self,
        session: &Session,
        photo_id: &str,
        is_favorite: bool,
    ) -> Result<(), GatewayError> {
        self.enter(true).await?;
        self.state.lock().unwrap().favorites.insert(
            (session.user_id().to_string(), photo_id.to_string()),
            is_favorite,
        );
        Ok(())
    }

    async fn list_favorites(&self, session: &Session) -> Result<Vec<String>, GatewayError> {
        self.enter(false).await?;
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state
            .favorites
            .iter()
            .filter(|((user, _), fav)| user == session.user_id() && **fav)
            .map(|((_, photo), _)| photo.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn upsert_photo_categories(
        &self,
        session: &Session,
        photo_id: &str,
        categories: &[String],
    ) -> Result<(), GatewayError> {
        self.enter(true).await?;
        self.state.lock().unwrap().photo_categories.insert(
            (session.user_id().to_string(), photo_id.to_string()),
            categories.to_vec(),
        );
        Ok(())
    }

    async fn list_photo_categories(
        &self,
        session: &Session,
        photo_id: Option<&str>,
    ) -> Result<Vec<PhotoCategories>, GatewayError> {
        self.enter(false).await?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<PhotoCategories> = state
            .photo_categories
            .iter()
            .filter(|((user, photo), _)| {
                user == session.user_id() && photo_id.map_or(true, |id| id == photo)
            })
            .map(|((_, photo), cats)| PhotoCategories {
                photo_id: photo.clone(),
                categories: cats.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.photo_id.cmp(&b.photo_id));
        Ok(rows)
    }

    async fn get_user_categories(
        &self,
        session: &Session,
    ) -> Result<Option<Vec<Category>>, GatewayError> {
        self.enter(false).await?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .user_categories
            .get(session.user_id())
            .cloned())
    }

    async fn set_user_categories(
        &self,
        session: &Session,
        categories: &[Category],
    ) -> Result<(), GatewayError> {
        self.enter(true).await?;
        self.state
            .lock()
            .unwrap()
            .user_categories
            .insert(session.user_id().to_string(), categories.to_vec());
        Ok(())
    }
}
