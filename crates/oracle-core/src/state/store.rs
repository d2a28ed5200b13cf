use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};

use super::PersistentState;
use crate::errors::StoreError;

/// Where persistent state lives between contract calls.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads state; a store that has never been saved yields the default.
    async fn load(&self) -> Result<PersistentState, StoreError>;

    async fn save(&self, state: &PersistentState) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<PersistentState>,
}

impl MemoryStore {
    #[must_use]
    pub fn new(state: PersistentState) -> Self {
        Self { state: Mutex::new(state) }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<PersistentState, StoreError> {
        Ok(self.state.lock().clone())
    }

    async fn save(&self, state: &PersistentState) -> Result<(), StoreError> {
        *self.state.lock() = state.clone();
        Ok(())
    }
}

/// Pretty-printed JSON file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<PersistentState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no state file, starting fresh");
                Ok(PersistentState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, state: &PersistentState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert_eq!(store.load().await.unwrap(), PersistentState::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/state.json"));

        let mut state = PersistentState { price: 3000.0, source: "binance".into(), ..Default::default() };
        state.rotation.add_credential("a2V5").unwrap();
        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), state);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = JsonFileStore::new(path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::default();
        let state = PersistentState { city: "London".into(), ..Default::default() };
        store.save(&state).await.unwrap();
        assert_eq!(store.load().await.unwrap().city, "London");
    }
}
