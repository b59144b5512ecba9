use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{Error, Result};

/// Shared handle over the bearer token attached to every API request.
///
/// Absence of a token is a precondition failure: requests are refused before
/// they are dispatched, and the caller decides how to route the user to an
/// authentication entry point.
#[derive(Clone, Default)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set(token);
        store
    }

    /// Reads a previously persisted token. A missing file is not an error;
    /// it just yields an empty store.
    pub fn load_from(path: &Path) -> Result<Self> {
        let store = Self::new();
        match fs::read_to_string(path) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    store.set(trimmed);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no token file");
            }
            Err(err) => return Err(err.into()),
        }
        Ok(store)
    }

    pub fn persist_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        match self.get() {
            Some(token) => fs::write(path, token)?,
            None => {
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.write() = Some(token.into());
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn require(&self) -> Result<String> {
        self.get().ok_or(Error::AuthRequired)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<String>> {
        self.token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_fails_without_token() {
        let store = TokenStore::new();
        assert!(matches!(store.require(), Err(Error::AuthRequired)));
        store.set("secret");
        assert_eq!(store.require().unwrap(), "secret");
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");

        let store = TokenStore::with_token("secret");
        store.persist_to(&path).unwrap();

        let loaded = TokenStore::load_from(&path).unwrap();
        assert_eq!(loaded.get().as_deref(), Some("secret"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = TokenStore::load_from(&dir.path().join("absent")).unwrap();
        assert!(loaded.get().is_none());
    }
}
