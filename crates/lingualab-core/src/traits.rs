//! Storage trait definitions.
//!
//! These async traits are implemented by the `lingualab-store` crate. The
//! engine treats every call as fallible and never retries.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{
    Dictionary, DictionaryId, NewWordPair, SessionId, TrainingEvent, TrainingSession, User,
    UserId, WordPair, WordPairId,
};

// ---------------------------------------------------------------------------
// Word bank
// ---------------------------------------------------------------------------

/// Data access over dictionaries and their word pairs.
#[async_trait]
pub trait WordBank: Send + Sync {
    async fn get_dictionary(&self, id: DictionaryId) -> Result<Option<Dictionary>, StoreError>;

    async fn list_dictionaries(&self) -> Result<Vec<Dictionary>, StoreError>;

    /// All word pairs of a dictionary, ordered by id.
    async fn list_word_pairs(&self, dictionary_id: DictionaryId)
        -> Result<Vec<WordPair>, StoreError>;

    /// Store a new dictionary together with its pairs.
    async fn create_dictionary(
        &self,
        name: &str,
        pairs: Vec<NewWordPair>,
    ) -> Result<Dictionary, StoreError>;

    /// Swap the whole pair set of an existing dictionary.
    async fn replace_dictionary(
        &self,
        id: DictionaryId,
        pairs: Vec<NewWordPair>,
    ) -> Result<Dictionary, StoreError>;

    /// Delete a dictionary and its pairs. Returns `false` if it did not exist.
    async fn delete_dictionary(&self, id: DictionaryId) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// Progress store
// ---------------------------------------------------------------------------

/// Training sessions and the append-only event log.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Append an event. Fails with `StoreError::DuplicateEvent` if an event
    /// with the same session, word pair and question timestamp exists.
    async fn append_event(&self, event: TrainingEvent) -> Result<(), StoreError>;

    /// Events of one user for one word pair, most recent last.
    async fn history_for(
        &self,
        user_id: UserId,
        word_pair_id: WordPairId,
    ) -> Result<Vec<TrainingEvent>, StoreError>;

    async fn events_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<TrainingEvent>, StoreError>;

    async fn find_open_session(
        &self,
        user_id: UserId,
        dictionary_id: DictionaryId,
    ) -> Result<Option<TrainingSession>, StoreError>;

    async fn get_session(&self, id: SessionId) -> Result<Option<TrainingSession>, StoreError>;

    /// Insert or update a session. Rejects a second open session for the same
    /// user and dictionary with `StoreError::SessionConflict`.
    async fn save_session(&self, session: &TrainingSession) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// User directory
// ---------------------------------------------------------------------------

/// Maps chat identities to internal users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_or_create(&self, external_id: i64) -> Result<User, StoreError>;
}
