//! Current user identity and last-opened conversation.
//!
//! Session state is injected through a [`SessionStore`]; nothing here reads
//! ambient storage. [`SessionContext::load`] is called once at startup and
//! fails with [`ClientError::NotAuthenticated`] when no identity is stored.

use crate::config::SessionConfig;
use crate::error::ClientError;
use async_trait::async_trait;
use chat_types::UserId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

/// Session persistence errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The state file could not be read or written.
    #[error("session file {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The state file is not valid session JSON.
    #[error("invalid session file {path}: {source}")]
    Parse {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The state could not be serialized.
    #[error("failed to encode session: {0}")]
    Encode(String),
}

/// Display fields cached at sign-in for header rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Persisted client state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Signed-in user, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Cached display fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<CachedProfile>,
    /// Last conversation the user opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_peer: Option<UserId>,
}

impl SessionState {
    /// State for a freshly signed-in user.
    pub fn signed_in(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }

    /// Attach cached display fields.
    pub fn with_profile(mut self, profile: CachedProfile) -> Self {
        self.profile = Some(profile);
        self
    }
}

/// Storage for [`SessionState`].
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the stored state. Missing state is the default (signed out).
    async fn load(&self) -> Result<SessionState, SessionError>;

    /// Replace the stored state.
    async fn save(&self, state: &SessionState) -> Result<(), SessionError>;
}

/// JSON file store, written owner-only on Unix.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store state at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store state at the `[session]` config section's path.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(&config.state_path)
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<SessionState, SessionError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(SessionState::default())
            }
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_str(&contents).map_err(|source| SessionError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        let io_err = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let contents =
            serde_json::to_string_pretty(state).map_err(|e| SessionError::Encode(e.to_string()))?;
        write_owner_only(&self.path, contents.as_bytes())
            .await
            .map_err(io_err)
    }
}

/// Write `contents` to a file readable by its owner only (0600 on Unix).
///
/// A new file is created with that mode; an existing one is narrowed
/// before anything is written.
async fn write_owner_only(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);
    let mut file = options.open(path).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await?;
    }
    file.write_all(contents).await?;
    file.flush().await
}

/// In-memory store for injected startup state and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    state: Arc<StdMutex<SessionState>>,
}

impl MemorySessionStore {
    /// Create a store holding `state`.
    pub fn new(state: SessionState) -> Self {
        Self {
            state: Arc::new(StdMutex::new(state)),
        }
    }

    /// The currently stored state.
    pub fn snapshot(&self) -> SessionState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<SessionState, SessionError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &SessionState) -> Result<(), SessionError> {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = state.clone();
        Ok(())
    }
}

/// The signed-in user's session.
pub struct SessionContext {
    user_id: UserId,
    store: Arc<dyn SessionStore>,
    state: Mutex<SessionState>,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Read the persisted identity.
    ///
    /// Fails with [`ClientError::NotAuthenticated`] if no user is stored.
    pub async fn load(store: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let state = store.load().await?;
        let user_id = match &state.user_id {
            Some(id) if !id.is_blank() => id.clone(),
            _ => return Err(ClientError::NotAuthenticated),
        };
        info!(user = %user_id, "session loaded");
        Ok(Self {
            user_id,
            store,
            state: Mutex::new(state),
        })
    }

    /// The current user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Cached display fields.
    pub async fn profile(&self) -> Option<CachedProfile> {
        self.state.lock().await.profile.clone()
    }

    /// Persist `peer` as the last opened conversation.
    pub async fn remember_peer(&self, peer: &UserId) -> Result<(), ClientError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.last_peer.as_ref() == Some(peer) {
                return Ok(());
            }
            state.last_peer = Some(peer.clone());
            state.clone()
        };
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// The last opened conversation, if any.
    pub async fn last_peer(&self) -> Option<UserId> {
        self.state.lock().await.last_peer.clone()
    }

    /// Forget the last opened conversation.
    pub async fn forget_peer(&self) -> Result<(), ClientError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.last_peer.take().is_none() {
                return Ok(());
            }
            state.clone()
        };
        self.store.save(&snapshot).await?;
        Ok(())
    }

    /// Clear the stored identity and last peer.
    ///
    /// The context stays usable for teardown, but a fresh
    /// [`SessionContext::load`] fails afterwards.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        let snapshot = {
            let mut state = self.state.lock().await;
            *state = SessionState::default();
            state.clone()
        };
        self.store.save(&snapshot).await?;
        info!(user = %self.user_id, "signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn memory(state: SessionState) -> Arc<MemorySessionStore> {
        Arc::new(MemorySessionStore::new(state))
    }

    // ===========================================
    // SessionContext Tests
    // ===========================================

    #[tokio::test]
    async fn load_without_identity_is_not_authenticated() {
        let store = memory(SessionState::default());
        let err = SessionContext::load(store).await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }

    #[tokio::test]
    async fn blank_identity_is_not_authenticated() {
        let store = memory(SessionState::signed_in("  "));
        assert!(matches!(
            SessionContext::load(store).await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn load_exposes_user_and_profile() {
        let state = SessionState::signed_in("u1").with_profile(CachedProfile {
            name: "Ann".into(),
            email: "a@x.io".into(),
            avatar_url: None,
        });
        let session = SessionContext::load(memory(state)).await.unwrap();
        assert_eq!(session.user_id(), &UserId::from("u1"));
        assert_eq!(session.profile().await.unwrap().name, "Ann");
    }

    #[tokio::test]
    async fn remembered_peer_is_persisted() {
        let store = memory(SessionState::signed_in("u1"));
        let session = SessionContext::load(store.clone()).await.unwrap();

        session.remember_peer(&UserId::from("u2")).await.unwrap();

        assert_eq!(session.last_peer().await, Some(UserId::from("u2")));
        assert_eq!(store.snapshot().last_peer, Some(UserId::from("u2")));

        let reloaded = SessionContext::load(store.clone()).await.unwrap();
        assert_eq!(reloaded.last_peer().await, Some(UserId::from("u2")));
    }

    #[tokio::test]
    async fn forget_peer_clears_it() {
        let mut state = SessionState::signed_in("u1");
        state.last_peer = Some(UserId::from("u2"));
        let store = memory(state);
        let session = SessionContext::load(store.clone()).await.unwrap();

        session.forget_peer().await.unwrap();
        assert_eq!(store.snapshot().last_peer, None);
    }

    #[tokio::test]
    async fn sign_out_prevents_next_load() {
        let store = memory(SessionState::signed_in("u1"));
        let session = SessionContext::load(store.clone()).await.unwrap();

        session.sign_out().await.unwrap();

        assert_eq!(store.snapshot(), SessionState::default());
        assert!(matches!(
            SessionContext::load(store).await,
            Err(ClientError::NotAuthenticated)
        ));
    }

    // ===========================================
    // FileSessionStore Tests
    // ===========================================

    #[tokio::test]
    async fn missing_file_loads_signed_out() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().await.unwrap(), SessionState::default());
    }

    #[tokio::test]
    async fn file_store_roundtrip_creates_parent() {
        let dir = tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        let mut state = SessionState::signed_in("u1");
        state.last_peer = Some(UserId::from("u2"));

        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn corrupt_file_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = FileSessionStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SessionError::Parse { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn session_file_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        FileSessionStore::new(&path)
            .save(&SessionState::signed_in("u1"))
            .await
            .unwrap();

        let perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600, "file should be 0600");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn existing_world_readable_file_is_narrowed() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        tokio::fs::write(&path, "{}").await.unwrap();
        tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644))
            .await
            .unwrap();

        let store = FileSessionStore::new(&path);
        store.save(&SessionState::signed_in("u1")).await.unwrap();

        let perms = tokio::fs::metadata(&path).await.unwrap().permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
        assert_eq!(store.load().await.unwrap().user_id, Some(UserId::from("u1")));
    }
}
