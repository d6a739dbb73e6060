//! Session storage - persistence layer for the bearer token pair
//!
//! The session manager only talks to [`SessionStore`]; implementations decide
//! where the two tokens live.

use crate::error::{AuthError, AuthResult};
use crate::types::{StoredSession, TokenPair};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

/// Default key names, matching what the web client keeps in local storage
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Injectable token persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read whatever tokens are currently stored
    async fn load(&self) -> AuthResult<StoredSession>;

    /// Replace both tokens
    async fn save(&self, tokens: &TokenPair) -> AuthResult<()>;

    /// Remove both tokens
    async fn clear(&self) -> AuthResult<()>;
}

/// Process-local store, used by tests and short-lived embeddings
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<StoredSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access_token: Option<&str>, refresh_token: Option<&str>) -> Self {
        Self {
            session: RwLock::new(StoredSession {
                access_token: access_token.map(str::to_string),
                refresh_token: refresh_token.map(str::to_string),
            }),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> AuthResult<StoredSession> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, tokens: &TokenPair) -> AuthResult<()> {
        *self.session.write().await = StoredSession::from(tokens.clone());
        Ok(())
    }

    async fn clear(&self) -> AuthResult<()> {
        *self.session.write().await = StoredSession::default();
        Ok(())
    }
}

/// JSON file store: a flat object keyed like browser local storage.
///
/// Keys other than the two token keys are preserved on save and clear.
/// Writes go to a sibling temp file that is renamed into place, so a reader
/// never sees a half-written pair.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    access_key: String,
    refresh_key: String,
}

impl FileSessionStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self::with_keys(path, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY)
    }

    pub fn with_keys<P: AsRef<Path>>(path: P, access_key: &str, refresh_key: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            access_key: access_key.to_string(),
            refresh_key: refresh_key.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> AuthResult<Map<String, Value>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(AuthError::storage("Failed to read session file", e)),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(AuthError::Storage {
                message: format!("Session file {} is not a JSON object", self.path.display()),
                source: None,
            }),
            Err(e) => Err(AuthError::storage("Failed to parse session file", e)),
        }
    }

    async fn write_map(&self, map: &Map<String, Value>) -> AuthResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::storage("Failed to create session directory", e))?;
        }

        let json = serde_json::to_string_pretty(map)
            .map_err(|e| AuthError::storage("Failed to serialize session", e))?;

        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes()).await?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| AuthError::storage("Failed to replace session file", e))?;

        debug!("Saved session to {}", self.path.display());
        Ok(())
    }
}

/// Write `contents` to a fresh file that only the owner can read (0600 on
/// unix). Tokens never touch disk under wider permissions.
async fn write_private(path: &Path, contents: &[u8]) -> AuthResult<()> {
    // A leftover temp file would keep its old mode
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(AuthError::storage("Failed to remove stale session file", e)),
    }

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| AuthError::storage("Failed to create session file", e))?;
    file.write_all(contents)
        .await
        .map_err(|e| AuthError::storage("Failed to write session file", e))?;
    file.sync_all()
        .await
        .map_err(|e| AuthError::storage("Failed to write session file", e))
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> AuthResult<StoredSession> {
        let map = self.read_map().await?;
        let token = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };

        Ok(StoredSession {
            access_token: token(&self.access_key),
            refresh_token: token(&self.refresh_key),
        })
    }

    async fn save(&self, tokens: &TokenPair) -> AuthResult<()> {
        // An unreadable file is replaced rather than blocking login
        let mut map = self.read_map().await.unwrap_or_default();
        map.insert(self.access_key.clone(), Value::String(tokens.access.clone()));
        map.insert(
            self.refresh_key.clone(),
            Value::String(tokens.refresh.clone()),
        );
        self.write_map(&map).await
    }

    async fn clear(&self) -> AuthResult<()> {
        let mut map = match self.read_map().await {
            Ok(map) => map,
            Err(_) => {
                // Corrupt file: dropping it is the only way to be sure no token survives
                return match tokio::fs::remove_file(&self.path).await {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(AuthError::storage("Failed to remove session file", e)),
                };
            }
        };

        let had_access = map.remove(&self.access_key).is_some();
        let had_refresh = map.remove(&self.refresh_key).is_some();
        if !had_access && !had_refresh {
            return Ok(());
        }

        if map.is_empty() {
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AuthError::storage("Failed to remove session file", e)),
            }
        } else {
            self.write_map(&map).await
        }
    }
}
