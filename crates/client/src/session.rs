//! Authenticated session shared by every screen of the client.
//!
//! [`SessionContext`] is the single owner of the token and cached user
//! data. It persists them through a [`SessionStore`] so a restart can
//! resume the session, and announces every transition on a broadcast
//! channel so consumers react explicitly instead of polling storage.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const IS_AUTHENTICATED_KEY: &str = "isAuthenticated";
pub const USER_KEY: &str = "user";
pub const USER_PROFILE_KEY: &str = "userProfile";

/// Inactivity after which the idle watchdog ends the session.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

const EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key-value storage for session data.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
}

/// Session storage that lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

/// Session storage backed by a flat JSON object on disk.
///
/// A missing file reads as an empty store; `clear` removes the file.
/// Writes go to a temporary file in the same directory which is then
/// renamed over the store, so readers never see a partial file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(serde_json::to_string_pretty(&values)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    /// The user asked to sign out.
    Manual,
    /// No activity for the idle timeout.
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LoggedIn,
    LoggedOut { reason: LogoutReason },
    ProfileUpdated,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// What the login endpoint hands back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Value,
}

#[derive(Debug, Clone)]
struct SessionState {
    token: Option<String>,
    refresh_token: Option<String>,
    user: Option<Value>,
    profile: Option<Value>,
    last_activity: Instant,
}

impl SessionState {
    fn signed_out() -> Self {
        Self {
            token: None,
            refresh_token: None,
            user: None,
            profile: None,
            last_activity: Instant::now(),
        }
    }
}

/// Process-wide authentication state with typed accessors.
///
/// Intended to be shared as `Arc<SessionContext>`.
pub struct SessionContext {
    store: Box<dyn SessionStore>,
    state: RwLock<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext").finish_non_exhaustive()
    }
}

impl SessionContext {
    /// A signed-out context over `store`. Nothing is read from the store.
    pub fn new(store: impl SessionStore + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store: Box::new(store),
            state: RwLock::new(SessionState::signed_out()),
            events,
        }
    }

    /// Resume whatever session `store` holds.
    ///
    /// The session counts as authenticated only when the store has both
    /// `isAuthenticated = "true"` and a token. Anything else starts
    /// signed out.
    pub fn restore(store: impl SessionStore + 'static) -> Result<Self, StoreError> {
        let authenticated = store.get(IS_AUTHENTICATED_KEY)?.as_deref() == Some("true");
        let token = store.get(TOKEN_KEY)?.filter(|t| !t.is_empty());

        let mut state = SessionState::signed_out();
        if let (true, Some(token)) = (authenticated, token) {
            state.token = Some(token);
            state.refresh_token = store.get(REFRESH_TOKEN_KEY)?;
            state.user = read_json(&store, USER_KEY)?;
            state.profile = read_json(&store, USER_PROFILE_KEY)?;
            tracing::info!("Restored persisted session");
        }

        let mut context = Self::new(store);
        *context.state.get_mut() = state;
        Ok(context)
    }

    /// Persist `credentials` and mark the session authenticated.
    pub async fn login(&self, credentials: Credentials) -> Result<(), StoreError> {
        let mut state = self.state.write().await;

        self.store.clear()?;
        self.store.set(TOKEN_KEY, &credentials.token)?;
        if let Some(refresh) = &credentials.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh)?;
        }
        self.store.set(USER_KEY, &serde_json::to_string(&credentials.user)?)?;
        self.store.set(IS_AUTHENTICATED_KEY, "true")?;

        *state = SessionState {
            token: Some(credentials.token),
            refresh_token: credentials.refresh_token,
            user: Some(credentials.user),
            profile: None,
            last_activity: Instant::now(),
        };
        drop(state);

        tracing::info!("Session started");
        let _ = self.events.send(SessionEvent::LoggedIn);
        Ok(())
    }

    /// End the session and wipe the store. Returns `false` when already
    /// signed out.
    ///
    /// In-memory state is cleared even if wiping the store fails.
    pub async fn logout(&self, reason: LogoutReason) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.token.is_none() {
            return Ok(false);
        }
        *state = SessionState::signed_out();
        drop(state);

        tracing::info!(?reason, "Session ended");
        let _ = self.events.send(SessionEvent::LoggedOut { reason });
        self.store.clear()?;
        Ok(true)
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh_token.clone()
    }

    pub async fn user(&self) -> Option<Value> {
        self.state.read().await.user.clone()
    }

    pub async fn profile(&self) -> Option<Value> {
        self.state.read().await.profile.clone()
    }

    /// Replace the cached profile.
    pub async fn set_profile(&self, profile: Value) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        self.store
            .set(USER_PROFILE_KEY, &serde_json::to_string(&profile)?)?;
        state.profile = Some(profile);
        drop(state);

        let _ = self.events.send(SessionEvent::ProfileUpdated);
        Ok(())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.token.is_some()
    }

    /// Record user activity, resetting the idle timer.
    pub async fn touch(&self) {
        self.state.write().await.last_activity = Instant::now();
    }

    /// Time since the last recorded activity.
    pub async fn idle_for(&self) -> Duration {
        self.state.read().await.last_activity.elapsed()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn last_activity(&self) -> Instant {
        self.state.read().await.last_activity
    }
}

fn read_json(store: &dyn SessionStore, key: &str) -> Result<Option<Value>, StoreError> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(StoreError::from)
}

// ---------------------------------------------------------------------------
// Idle watchdog
// ---------------------------------------------------------------------------

/// Log the session out after `timeout` without a [`SessionContext::touch`].
///
/// While signed out the task sleeps until the next session event. The
/// task never finishes on its own; abort the handle to stop it.
pub fn spawn_idle_watchdog(session: Arc<SessionContext>, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = session.subscribe();
        loop {
            if !session.is_authenticated().await {
                if let Err(broadcast::error::RecvError::Closed) = events.recv().await {
                    return;
                }
                continue;
            }

            let deadline = session.last_activity().await + timeout;
            if Instant::now() >= deadline {
                if let Err(e) = session.logout(LogoutReason::Idle).await {
                    tracing::error!(error = %e, "Failed to clear session store after idle logout");
                }
                continue;
            }

            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {}
                event = events.recv() => {
                    if let Err(broadcast::error::RecvError::Closed) = event {
                        return;
                    }
                }
            }
        }
    })
}
