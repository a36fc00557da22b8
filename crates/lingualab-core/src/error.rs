//! Error types for the training engine and its collaborators.
//!
//! `StoreError` is defined here rather than in the store crate so the engine
//! can recognise duplicate events without string matching.

use thiserror::Error;

use crate::model::{DictionaryId, SessionId, WordPairId};

/// Errors raised by a `WordBank`, `ProgressStore` or `UserDirectory`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An event for the same pending question was already recorded.
    #[error("duplicate training event for word pair {word_pair_id} in session {session_id}")]
    DuplicateEvent {
        session_id: SessionId,
        word_pair_id: WordPairId,
    },

    /// A second open session for the same user and dictionary was rejected.
    #[error("an open session already exists for this user and dictionary: {0}")]
    SessionConflict(SessionId),

    /// The requested record does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// An internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned ({0})")]
    LockPoisoned(&'static str),

    /// The backing storage could not be read or written.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Broad category of a [`TrainingError`], used by hosts to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller-visible; report the message to the user verbatim.
    Validation,
    /// Protocol violation such as a redelivered callback or stale keyboard.
    State,
    /// A collaborator failed; retry policy belongs to the host.
    Collaborator,
}

/// Errors surfaced by the training engine.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("dictionary {0} has no words")]
    EmptyDictionary(DictionaryId),

    #[error("dictionary {0} not found")]
    DictionaryNotFound(DictionaryId),

    /// Not enough distinct translations to fill every option slot.
    #[error("not enough distinct translations for {requested} options ({available} available)")]
    InsufficientDistractors { requested: usize, available: usize },

    #[error("option count must be at least 2, got {0}")]
    InvalidOptionCount(usize),

    #[error("training session {0} not found")]
    SessionNotFound(SessionId),

    #[error("training session {0} is already closed")]
    SessionAlreadyClosed(SessionId),

    /// The answer refers to a question that is no longer pending.
    #[error("word pair {word_pair_id} is not the pending question of session {session_id}")]
    StaleAnswer {
        session_id: SessionId,
        word_pair_id: WordPairId,
    },

    #[error("word pair {0} was not offered as an option")]
    UnknownOption(WordPairId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TrainingError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TrainingError::EmptyDictionary(_)
            | TrainingError::DictionaryNotFound(_)
            | TrainingError::InsufficientDistractors { .. }
            | TrainingError::InvalidOptionCount(_) => ErrorClass::Validation,
            TrainingError::SessionNotFound(_)
            | TrainingError::SessionAlreadyClosed(_)
            | TrainingError::StaleAnswer { .. }
            | TrainingError::UnknownOption(_) => ErrorClass::State,
            TrainingError::Store(_) => ErrorClass::Collaborator,
        }
    }

    /// Returns `true` when the error means a callback was delivered twice and
    /// can be dropped without telling the user.
    pub fn is_duplicate_delivery(&self) -> bool {
        matches!(self, TrainingError::StaleAnswer { .. })
    }
}

/// Errors raised while turning an upload into a dictionary.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("user {0} is not allowed to add dictionaries")]
    Unauthorized(i64),

    #[error("upload is {size} bytes, the limit is {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("no word pairs found in the upload")]
    NoWordPairs,

    #[error("dictionary {0} not found")]
    DictionaryNotFound(DictionaryId),

    #[error(transparent)]
    Store(#[from] StoreError),
}
