//! JSON snapshot file store.
//!
//! The whole store is kept in memory and rewritten to disk after every
//! mutation. Writes go to a temp file in the same directory which is then
//! renamed over the target, so a crash never leaves a half-written file.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use lingualab_core::model::{
    Dictionary, DictionaryId, NewWordPair, SessionId, TrainingEvent, TrainingSession, User,
    UserId, WordPair, WordPairId,
};
use lingualab_core::traits::{ProgressStore, UserDirectory, WordBank};
use lingualab_core::StoreError;

use crate::memory::{MemoryStore, Snapshot};

pub struct JsonFileStore {
    inner: MemoryStore,
    path: PathBuf,
    persist_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                StoreError::Unavailable(format!("failed to read {}: {e}", path.display()))
            })?;
            serde_json::from_str::<Snapshot>(&content).map_err(|e| {
                StoreError::Unavailable(format!("failed to parse {}: {e}", path.display()))
            })?
        } else {
            Snapshot::default()
        };

        tracing::debug!(
            path = %path.display(),
            dictionaries = snapshot.dictionaries.len(),
            events = snapshot.events.len(),
            "opened data file"
        );

        Ok(Self {
            inner: MemoryStore::from_snapshot(snapshot),
            path,
            persist_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.inner.snapshot()?;
        let json = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Unavailable(format!("failed to serialize store: {e}")))?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let unavailable = |e: std::io::Error| {
            StoreError::Unavailable(format!("failed to write {}: {e}", self.path.display()))
        };

        std::fs::create_dir_all(&dir).map_err(unavailable)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(unavailable)?;
        tmp.write_all(&json).map_err(unavailable)?;
        tmp.as_file().sync_all().map_err(unavailable)?;
        tmp.persist(&self.path).map_err(|e| unavailable(e.error))?;
        Ok(())
    }
}

#[async_trait]
impl WordBank for JsonFileStore {
    async fn get_dictionary(&self, id: DictionaryId) -> Result<Option<Dictionary>, StoreError> {
        self.inner.get_dictionary(id).await
    }

    async fn list_dictionaries(&self) -> Result<Vec<Dictionary>, StoreError> {
        self.inner.list_dictionaries().await
    }

    async fn list_word_pairs(
        &self,
        dictionary_id: DictionaryId,
    ) -> Result<Vec<WordPair>, StoreError> {
        self.inner.list_word_pairs(dictionary_id).await
    }

    async fn create_dictionary(
        &self,
        name: &str,
        pairs: Vec<NewWordPair>,
    ) -> Result<Dictionary, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let dictionary = self.inner.create_dictionary(name, pairs).await?;
        self.persist()?;
        Ok(dictionary)
    }

    async fn replace_dictionary(
        &self,
        id: DictionaryId,
        pairs: Vec<NewWordPair>,
    ) -> Result<Dictionary, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let dictionary = self.inner.replace_dictionary(id, pairs).await?;
        self.persist()?;
        Ok(dictionary)
    }

    async fn delete_dictionary(&self, id: DictionaryId) -> Result<bool, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let deleted = self.inner.delete_dictionary(id).await?;
        if deleted {
            self.persist()?;
        }
        Ok(deleted)
    }
}

#[async_trait]
impl ProgressStore for JsonFileStore {
    async fn append_event(&self, event: TrainingEvent) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        self.inner.append_event(event).await?;
        self.persist()
    }

    async fn history_for(
        &self,
        user_id: UserId,
        word_pair_id: WordPairId,
    ) -> Result<Vec<TrainingEvent>, StoreError> {
        self.inner.history_for(user_id, word_pair_id).await
    }

    async fn events_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<TrainingEvent>, StoreError> {
        self.inner.events_for_session(session_id).await
    }

    async fn find_open_session(
        &self,
        user_id: UserId,
        dictionary_id: DictionaryId,
    ) -> Result<Option<TrainingSession>, StoreError> {
        self.inner.find_open_session(user_id, dictionary_id).await
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<TrainingSession>, StoreError> {
        self.inner.get_session(id).await
    }

    async fn save_session(&self, session: &TrainingSession) -> Result<(), StoreError> {
        let _guard = self.persist_lock.lock().await;
        self.inner.save_session(session).await?;
        self.persist()
    }
}

#[async_trait]
impl UserDirectory for JsonFileStore {
    async fn get_or_create(&self, external_id: i64) -> Result<User, StoreError> {
        let _guard = self.persist_lock.lock().await;
        let known = self.inner.knows_user(external_id)?;
        let user = self.inner.get_or_create(external_id).await?;
        if !known {
            self.persist()?;
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn animals() -> Vec<NewWordPair> {
        vec![
            NewWordPair::new("cat", "кіт"),
            NewWordPair::new("dog", "пес"),
            NewWordPair::new("car", "авто"),
        ]
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");

        let created = {
            let store = JsonFileStore::open(&path).unwrap();
            let user = store.get_or_create(42).await.unwrap();
            let dictionary = store.create_dictionary("animals", animals()).await.unwrap();
            assert_eq!(user.id, UserId(1));
            dictionary
        };
        assert!(path.exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        let dictionary = reopened.get_dictionary(created.id).await.unwrap().unwrap();
        assert_eq!(dictionary.name, "animals");
        assert_eq!(dictionary.word_count, 3);
        assert_eq!(reopened.get_or_create(42).await.unwrap().id, UserId(1));
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.create_dictionary("animals", animals()).await.unwrap();
        assert!(path.exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::open(&path).err().unwrap();
        assert!(err.to_string().contains("failed to parse"));
    }
}
