//! Training session state machine.
//!
//! A session moves from `NoActiveSession` to `AwaitingAnswer`, loops there
//! for as long as the user keeps answering, and ends in `Closed`. Calls that
//! touch one session are serialized through a per-session async mutex;
//! different sessions never wait on each other.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::clock::Clock;
use crate::distractors::{DistractorSelector, Shuffle};
use crate::error::{StoreError, TrainingError};
use crate::model::{
    AnswerResult, DictionaryId, EventId, Question, SessionId, SessionStatus, StartOutcome,
    TrainingEvent, TrainingSession, UserId, WordPair, WordPairId,
};
use crate::scheduler::{NextWord, QuestionScheduler};
use crate::statistics::{dictionary_progress, session_summary, DictionaryProgress, SessionSummary};
use crate::traits::{ProgressStore, WordBank};

/// Configuration for the training engine.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Options per question, correct answer included.
    pub option_count: usize,
    /// How many recently answered words are kept out of the next pick.
    /// Values below 1 are treated as 1.
    pub recent_window: usize,
    /// Base tie-break seed, mixed with the session id and question number.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            option_count: 4,
            recent_window: 3,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Session(SessionId),
    Start(UserId, DictionaryId),
}

/// Lazily created async mutexes, one per key.
///
/// An entry lives only while some caller holds or waits for it.
struct KeyedLocks<K: Eq + Hash + Clone> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

/// Holds one key of a [`KeyedLocks`] table until dropped.
struct KeyedGuard<'a, K: Eq + Hash + Clone> {
    table: &'a KeyedLocks<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn acquire(&self, key: &K) -> KeyedGuard<'_, K> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        KeyedGuard {
            table: self,
            key: key.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Drop the entry for `key` when the table holds the only reference.
    /// Every clone is taken under the table lock, so a count of one means
    /// nobody holds or waits for this mutex.
    fn release(&self, key: &K) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let unused = locks
            .get(key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if unused {
            locks.remove(key);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl<K: Eq + Hash + Clone> Drop for KeyedGuard<'_, K> {
    fn drop(&mut self) {
        self.guard.take();
        self.table.release(&self.key);
    }
}

/// The training engine: starts, advances and closes sessions.
pub struct TrainingEngine {
    words: Arc<dyn WordBank>,
    progress: Arc<dyn ProgressStore>,
    clock: Arc<dyn Clock>,
    scheduler: QuestionScheduler,
    distractors: DistractorSelector,
    config: TrainingConfig,
    locks: KeyedLocks<LockKey>,
}

impl TrainingEngine {
    pub fn new(
        words: Arc<dyn WordBank>,
        progress: Arc<dyn ProgressStore>,
        clock: Arc<dyn Clock>,
        config: TrainingConfig,
    ) -> Self {
        Self {
            scheduler: QuestionScheduler::new(Arc::clone(&words), Arc::clone(&progress)),
            distractors: DistractorSelector::new(Arc::clone(&words), Arc::clone(&progress)),
            words,
            progress,
            clock,
            config,
            locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Start a session, or resume the open one for this user and dictionary.
    ///
    /// A resumed session re-issues its pending question unchanged. A new
    /// session is only stored once its first question could be built.
    pub async fn start(
        &self,
        user_id: UserId,
        dictionary_id: DictionaryId,
    ) -> Result<StartOutcome, TrainingError> {
        let _start_guard = self
            .locks
            .acquire(&LockKey::Start(user_id, dictionary_id))
            .await;

        if self.words.get_dictionary(dictionary_id).await?.is_none() {
            return Err(TrainingError::DictionaryNotFound(dictionary_id));
        }

        if let Some(open) = self
            .progress
            .find_open_session(user_id, dictionary_id)
            .await?
        {
            if let Some(outcome) = self.resume(open.id).await? {
                return Ok(outcome);
            }
        }

        let pairs = self.words.list_word_pairs(dictionary_id).await?;
        if pairs.is_empty() {
            return Err(TrainingError::EmptyDictionary(dictionary_id));
        }

        let mut session = TrainingSession::new(user_id, dictionary_id, self.clock.now());
        let question = self.issue_question(&mut session, &pairs).await?;
        self.progress.save_session(&session).await?;

        tracing::info!(
            session = %session.id,
            user = %user_id,
            dictionary = %dictionary_id,
            "training session started"
        );

        Ok(StartOutcome {
            session_id: session.id,
            question,
            resumed: false,
        })
    }

    async fn resume(&self, session_id: SessionId) -> Result<Option<StartOutcome>, TrainingError> {
        let _guard = self.locks.acquire(&LockKey::Session(session_id)).await;

        let Some(mut session) = self.progress.get_session(session_id).await? else {
            return Ok(None);
        };
        if !session.is_open() {
            return Ok(None);
        }

        let question = match session.pending.clone() {
            Some(question) => question,
            None => {
                let pairs = self.words.list_word_pairs(session.dictionary_id).await?;
                if pairs.is_empty() {
                    return Err(TrainingError::EmptyDictionary(session.dictionary_id));
                }
                let question = self.issue_question(&mut session, &pairs).await?;
                self.progress.save_session(&session).await?;
                question
            }
        };

        tracing::info!(session = %session.id, "training session resumed");

        Ok(Some(StartOutcome {
            session_id: session.id,
            question,
            resumed: true,
        }))
    }

    /// Evaluate an answer to the pending question and issue the next one.
    ///
    /// Exactly one event is written per pending question; a redelivered
    /// callback gets `StaleAnswer`. When the event of the pending question is
    /// already stored, the stored answer is kept and the session advances.
    pub async fn submit_answer(
        &self,
        session_id: SessionId,
        chosen_word_pair_id: WordPairId,
        presented_word_pair_id: WordPairId,
    ) -> Result<AnswerResult, TrainingError> {
        let _guard = self.locks.acquire(&LockKey::Session(session_id)).await;

        let mut session = self
            .progress
            .get_session(session_id)
            .await?
            .ok_or(TrainingError::SessionNotFound(session_id))?;
        if !session.is_open() {
            return Err(TrainingError::SessionAlreadyClosed(session_id));
        }

        let pending = match &session.pending {
            Some(question) if question.presented_word_pair_id == presented_word_pair_id => {
                question.clone()
            }
            _ => {
                tracing::warn!(
                    session = %session_id,
                    word_pair = %presented_word_pair_id,
                    "answer for a question that is not pending"
                );
                return Err(TrainingError::StaleAnswer {
                    session_id,
                    word_pair_id: presented_word_pair_id,
                });
            }
        };

        if !pending.option_ids.contains(&chosen_word_pair_id) {
            return Err(TrainingError::UnknownOption(chosen_word_pair_id));
        }

        let event = TrainingEvent {
            id: EventId::new(),
            user_id: session.user_id,
            word_pair_id: presented_word_pair_id,
            session_id,
            chosen_word_pair_id,
            question_issued_at: pending.issued_at,
            created_at: self.clock.now(),
            is_correct: chosen_word_pair_id == presented_word_pair_id,
        };

        let recorded = match self.progress.append_event(event.clone()).await {
            Ok(()) => event,
            Err(StoreError::DuplicateEvent { .. }) => {
                // The question is still pending although its answer is stored:
                // an earlier call failed before the session was saved.
                let Some(existing) = self.recorded_answer(session_id, &pending).await? else {
                    tracing::warn!(session = %session_id, "duplicate answer delivery dropped");
                    return Err(TrainingError::StaleAnswer {
                        session_id,
                        word_pair_id: presented_word_pair_id,
                    });
                };
                tracing::warn!(
                    session = %session_id,
                    word_pair = %presented_word_pair_id,
                    "answer already recorded, advancing session"
                );
                existing
            }
            Err(e) => return Err(e.into()),
        };
        let correct = recorded.is_correct;

        session.pending = None;
        session.remember_shown(presented_word_pair_id, self.config.recent_window.max(1));

        let pairs = self.words.list_word_pairs(session.dictionary_id).await?;
        let next_question = if pairs.is_empty() {
            None
        } else {
            match self.issue_question(&mut session, &pairs).await {
                Ok(question) => Some(question),
                Err(e) => {
                    self.progress.save_session(&session).await?;
                    return Err(e);
                }
            }
        };
        self.progress.save_session(&session).await?;

        Ok(AnswerResult {
            correct,
            correct_translation: pending
                .correct_translation()
                .unwrap_or_default()
                .to_string(),
            next_question,
        })
    }

    /// The stored event answering `pending`, if any.
    async fn recorded_answer(
        &self,
        session_id: SessionId,
        pending: &Question,
    ) -> Result<Option<TrainingEvent>, TrainingError> {
        let events = self.progress.events_for_session(session_id).await?;
        Ok(events.into_iter().rev().find(|e| {
            e.word_pair_id == pending.presented_word_pair_id
                && e.question_issued_at == pending.issued_at
        }))
    }

    /// Close a session. Later answers fail with `SessionAlreadyClosed`.
    pub async fn close(&self, session_id: SessionId) -> Result<(), TrainingError> {
        let _guard = self.locks.acquire(&LockKey::Session(session_id)).await;

        let mut session = self
            .progress
            .get_session(session_id)
            .await?
            .ok_or(TrainingError::SessionNotFound(session_id))?;
        if !session.is_open() {
            return Err(TrainingError::SessionAlreadyClosed(session_id));
        }

        session.status = SessionStatus::Closed;
        session.pending = None;
        session.closed_at = Some(self.clock.now());
        self.progress.save_session(&session).await?;

        tracing::info!(session = %session_id, "training session closed");
        Ok(())
    }

    /// The question currently waiting for an answer.
    pub async fn pending_question(
        &self,
        session_id: SessionId,
    ) -> Result<Option<Question>, TrainingError> {
        let session = self
            .progress
            .get_session(session_id)
            .await?
            .ok_or(TrainingError::SessionNotFound(session_id))?;
        if !session.is_open() {
            return Err(TrainingError::SessionAlreadyClosed(session_id));
        }
        Ok(session.pending)
    }

    /// Answer counts for one session.
    pub async fn summary(&self, session_id: SessionId) -> Result<SessionSummary, TrainingError> {
        if self.progress.get_session(session_id).await?.is_none() {
            return Err(TrainingError::SessionNotFound(session_id));
        }
        let events = self.progress.events_for_session(session_id).await?;
        Ok(session_summary(&events))
    }

    /// Mastery breakdown of one user over one dictionary.
    pub async fn progress(
        &self,
        user_id: UserId,
        dictionary_id: DictionaryId,
    ) -> Result<DictionaryProgress, TrainingError> {
        if self.words.get_dictionary(dictionary_id).await?.is_none() {
            return Err(TrainingError::DictionaryNotFound(dictionary_id));
        }
        let pairs = self.words.list_word_pairs(dictionary_id).await?;
        let mut histories = HashMap::new();
        for pair in &pairs {
            histories.insert(pair.id, self.progress.history_for(user_id, pair.id).await?);
        }
        Ok(dictionary_progress(&pairs, &histories))
    }

    async fn issue_question(
        &self,
        session: &mut TrainingSession,
        pairs: &[WordPair],
    ) -> Result<Question, TrainingError> {
        let seed = self.question_seed(session);
        let target = self.pick_target(session, pairs, seed).await?;
        let set = self
            .distractors
            .build_from(
                session.user_id,
                &target,
                pairs,
                self.config.option_count,
                Shuffle::seeded(seed),
            )
            .await?;

        let question = Question {
            presented_word_pair_id: target.id,
            prompt_word: target.word.clone(),
            options: set.options,
            option_ids: set.option_ids,
            correct_option_index: set.correct_index,
            issued_at: self.clock.now(),
        };
        session.pending = Some(question.clone());
        session.questions_issued += 1;
        Ok(question)
    }

    /// Try the recent window first, then only the last answered word, then
    /// the whole dictionary.
    async fn pick_target(
        &self,
        session: &TrainingSession,
        pairs: &[WordPair],
        seed: u64,
    ) -> Result<WordPair, TrainingError> {
        let recent: HashSet<WordPairId> = session.recent.iter().copied().collect();
        let last_only: HashSet<WordPairId> = session.recent.last().copied().into_iter().collect();

        for excluding in [recent, last_only, HashSet::new()] {
            match self
                .scheduler
                .next_from(session.user_id, pairs, &excluding, Some(seed))
                .await?
            {
                NextWord::Picked(pair) => return Ok(pair),
                NextWord::Exhausted => continue,
                NextWord::EmptyDictionary => break,
            }
        }
        Err(TrainingError::EmptyDictionary(session.dictionary_id))
    }

    fn question_seed(&self, session: &TrainingSession) -> u64 {
        let bits = session.id.0.as_u128();
        let session_bits = (bits as u64) ^ ((bits >> 64) as u64);
        self.config
            .seed
            .wrapping_add(session_bits)
            .wrapping_add(session.questions_issued.wrapping_mul(0x9E37_79B9_7F4A_7C15))
    }
}
