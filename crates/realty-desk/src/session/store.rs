use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Key holding the short-lived bearer token.
pub const ACCESS_KEY: &str = "access";
/// Key holding the token used to mint new access tokens.
pub const REFRESH_KEY: &str = "refresh";

/// Keyed session storage shared by every API call site.
///
/// Implementations are last-write-wins; callers must not rely on
/// compare-and-swap semantics.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session file {path} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} could not be written: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().expect("session mutex poisoned");
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.clear();
        Ok(())
    }
}

/// Session persisted as a flat JSON object so it survives restarts.
///
/// Every mutation rewrites the whole file while holding the in-memory lock.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Opens the store at `path`. A missing file is an empty session.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => BTreeMap::new(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| SessionError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(SessionError::Read { path, source }),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let body = serde_json::to_string_pretty(entries).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, body).map_err(|source| SessionError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.entries.lock().expect("session mutex poisoned");
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.insert(key.to_string(), value.to_string());
        self.persist(&guard)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        if guard.remove(key).is_some() {
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let mut guard = self.entries.lock().expect("session mutex poisoned");
        guard.clear();
        self.persist(&guard)
    }
}
