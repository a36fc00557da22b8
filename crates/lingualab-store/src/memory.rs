//! In-memory store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lingualab_core::model::{
    Dictionary, DictionaryId, NewWordPair, SessionId, TrainingEvent, TrainingSession, User,
    UserId, WordPair, WordPairId,
};
use lingualab_core::traits::{ProgressStore, UserDirectory, WordBank};
use lingualab_core::StoreError;

type EventKey = (SessionId, WordPairId, DateTime<Utc>);

/// Serializable copy of the whole store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub dictionaries: Vec<Dictionary>,
    #[serde(default)]
    pub word_pairs: Vec<WordPair>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub sessions: Vec<TrainingSession>,
    #[serde(default)]
    pub events: Vec<TrainingEvent>,
}

#[derive(Default)]
struct State {
    next_dictionary_id: i64,
    next_word_pair_id: i64,
    next_user_id: i64,
    dictionaries: BTreeMap<DictionaryId, Dictionary>,
    word_pairs: BTreeMap<WordPairId, WordPair>,
    users: HashMap<i64, User>,
    sessions: HashMap<SessionId, TrainingSession>,
    events: Vec<TrainingEvent>,
    event_keys: HashSet<EventKey>,
}

impl State {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut state = State {
            next_dictionary_id: snapshot.dictionaries.iter().map(|d| d.id.0).max().unwrap_or(0),
            next_word_pair_id: snapshot.word_pairs.iter().map(|p| p.id.0).max().unwrap_or(0),
            next_user_id: snapshot.users.iter().map(|u| u.id.0).max().unwrap_or(0),
            ..Default::default()
        };
        state.dictionaries = snapshot.dictionaries.into_iter().map(|d| (d.id, d)).collect();
        state.word_pairs = snapshot.word_pairs.into_iter().map(|p| (p.id, p)).collect();
        state.users = snapshot
            .users
            .into_iter()
            .map(|u| (u.external_id, u))
            .collect();
        state.sessions = snapshot.sessions.into_iter().map(|s| (s.id, s)).collect();
        state.event_keys = snapshot.events.iter().map(event_key).collect();
        state.events = snapshot.events;

        // word_count is derived; never trust the stored value
        let ids: Vec<DictionaryId> = state.dictionaries.keys().copied().collect();
        for id in ids {
            state.recount(id);
        }
        state
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut users: Vec<User> = self.users.values().cloned().collect();
        users.sort_by_key(|u| u.id);
        let mut sessions: Vec<TrainingSession> = self.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        Snapshot {
            dictionaries: self.dictionaries.values().cloned().collect(),
            word_pairs: self.word_pairs.values().cloned().collect(),
            users,
            sessions,
            events: self.events.clone(),
        }
    }

    fn insert_pairs(&mut self, dictionary_id: DictionaryId, pairs: Vec<NewWordPair>) {
        for pair in pairs {
            self.next_word_pair_id += 1;
            let id = WordPairId(self.next_word_pair_id);
            self.word_pairs.insert(
                id,
                WordPair {
                    id,
                    dictionary_id,
                    word: pair.word,
                    translation: pair.translation,
                },
            );
        }
    }

    fn remove_pairs(&mut self, dictionary_id: DictionaryId) {
        self.word_pairs.retain(|_, p| p.dictionary_id != dictionary_id);
    }

    fn recount(&mut self, dictionary_id: DictionaryId) -> Option<Dictionary> {
        let count = self
            .word_pairs
            .values()
            .filter(|p| p.dictionary_id == dictionary_id)
            .count();
        let dictionary = self.dictionaries.get_mut(&dictionary_id)?;
        dictionary.word_count = count;
        Some(dictionary.clone())
    }
}

fn event_key(event: &TrainingEvent) -> EventKey {
    (event.session_id, event.word_pair_id, event.question_issued_at)
}

/// A store that keeps everything in memory.
///
/// Useful on its own for tests and as the working set of [`JsonFileStore`](crate::JsonFileStore).
/// [`set_unavailable`](Self::set_unavailable) makes every call fail, to
/// exercise error paths.
pub struct MemoryStore {
    state: RwLock<State>,
    unavailable: AtomicBool,
    appended_events: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(Snapshot::default())
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            state: RwLock::new(State::from_snapshot(snapshot)),
            unavailable: AtomicBool::new(false),
            appended_events: AtomicU32::new(0),
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot, StoreError> {
        Ok(self.read()?.to_snapshot())
    }

    /// Simulate an outage: every call fails with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    pub fn knows_user(&self, external_id: i64) -> Result<bool, StoreError> {
        Ok(self.read()?.users.contains_key(&external_id))
    }

    /// Number of events accepted by `append_event` since creation.
    pub fn appended_events(&self) -> u32 {
        self.appended_events.load(Ordering::Relaxed)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.check_available()?;
        self.state
            .read()
            .map_err(|_| StoreError::LockPoisoned("read"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.check_available()?;
        self.state
            .write()
            .map_err(|_| StoreError::LockPoisoned("write"))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WordBank for MemoryStore {
    async fn get_dictionary(&self, id: DictionaryId) -> Result<Option<Dictionary>, StoreError> {
        Ok(self.read()?.dictionaries.get(&id).cloned())
    }

    async fn list_dictionaries(&self) -> Result<Vec<Dictionary>, StoreError> {
        Ok(self.read()?.dictionaries.values().cloned().collect())
    }

    async fn list_word_pairs(
        &self,
        dictionary_id: DictionaryId,
    ) -> Result<Vec<WordPair>, StoreError> {
        Ok(self
            .read()?
            .word_pairs
            .values()
            .filter(|p| p.dictionary_id == dictionary_id)
            .cloned()
            .collect())
    }

    async fn create_dictionary(
        &self,
        name: &str,
        pairs: Vec<NewWordPair>,
    ) -> Result<Dictionary, StoreError> {
        let mut state = self.write()?;
        state.next_dictionary_id += 1;
        let id = DictionaryId(state.next_dictionary_id);
        state.dictionaries.insert(
            id,
            Dictionary {
                id,
                name: name.to_string(),
                word_count: 0,
                created_at: Utc::now(),
            },
        );
        state.insert_pairs(id, pairs);
        state
            .recount(id)
            .ok_or_else(|| StoreError::NotFound(format!("dictionary {id}")))
    }

    async fn replace_dictionary(
        &self,
        id: DictionaryId,
        pairs: Vec<NewWordPair>,
    ) -> Result<Dictionary, StoreError> {
        let mut state = self.write()?;
        if !state.dictionaries.contains_key(&id) {
            return Err(StoreError::NotFound(format!("dictionary {id}")));
        }
        state.remove_pairs(id);
        state.insert_pairs(id, pairs);
        state
            .recount(id)
            .ok_or_else(|| StoreError::NotFound(format!("dictionary {id}")))
    }

    async fn delete_dictionary(&self, id: DictionaryId) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.dictionaries.remove(&id).is_none() {
            return Ok(false);
        }
        state.remove_pairs(id);
        Ok(true)
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn append_event(&self, event: TrainingEvent) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.event_keys.insert(event_key(&event)) {
            return Err(StoreError::DuplicateEvent {
                session_id: event.session_id,
                word_pair_id: event.word_pair_id,
            });
        }
        state.events.push(event);
        self.appended_events.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn history_for(
        &self,
        user_id: UserId,
        word_pair_id: WordPairId,
    ) -> Result<Vec<TrainingEvent>, StoreError> {
        let mut history: Vec<TrainingEvent> = self
            .read()?
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.word_pair_id == word_pair_id)
            .cloned()
            .collect();
        history.sort_by_key(|e| e.created_at);
        Ok(history)
    }

    async fn events_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<TrainingEvent>, StoreError> {
        let mut events: Vec<TrainingEvent> = self
            .read()?
            .events
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.created_at);
        Ok(events)
    }

    async fn find_open_session(
        &self,
        user_id: UserId,
        dictionary_id: DictionaryId,
    ) -> Result<Option<TrainingSession>, StoreError> {
        Ok(self
            .read()?
            .sessions
            .values()
            .find(|s| s.is_open() && s.user_id == user_id && s.dictionary_id == dictionary_id)
            .cloned())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<TrainingSession>, StoreError> {
        Ok(self.read()?.sessions.get(&id).cloned())
    }

    async fn save_session(&self, session: &TrainingSession) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if session.is_open() {
            let conflict = state.sessions.values().find(|s| {
                s.id != session.id
                    && s.is_open()
                    && s.user_id == session.user_id
                    && s.dictionary_id == session.dictionary_id
            });
            if let Some(existing) = conflict {
                return Err(StoreError::SessionConflict(existing.id));
            }
        }
        state.sessions.insert(session.id, session.clone());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn get_or_create(&self, external_id: i64) -> Result<User, StoreError> {
        let mut state = self.write()?;
        if let Some(user) = state.users.get(&external_id) {
            return Ok(user.clone());
        }
        state.next_user_id += 1;
        let user = User {
            id: UserId(state.next_user_id),
            external_id,
            created_at: Utc::now(),
        };
        state.users.insert(external_id, user.clone());
        tracing::debug!(user = %user.id, external_id, "user created");
        Ok(user)
    }
}
