//! Core data model types for lingualab.
//!
//! Dictionaries own their word pairs, sessions own their training events, and
//! the events of a (user, word pair) are the only record of mastery.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned dictionary identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DictionaryId(pub i64);

/// Store-assigned word pair identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordPairId(pub i64);

/// Internal user identifier, distinct from the chat identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DictionaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for WordPairId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named collection of word pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub id: DictionaryId,
    /// Display name, usually the uploaded file name.
    pub name: String,
    /// Number of word pairs; kept equal to the pair set by the store.
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

/// One word and its translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPair {
    pub id: WordPairId,
    pub dictionary_id: DictionaryId,
    pub word: String,
    pub translation: String,
}

/// A validated word pair that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWordPair {
    pub word: String,
    pub translation: String,
}

impl NewWordPair {
    pub fn new(word: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            translation: translation.into(),
        }
    }
}

/// A chat user, created lazily on first interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identity assigned by the chat transport.
    pub external_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Closed,
}

/// One user's quiz run against one dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    pub id: SessionId,
    pub user_id: UserId,
    pub dictionary_id: DictionaryId,
    pub created_at: DateTime<Utc>,
    pub status: SessionStatus,
    /// The question waiting for an answer.
    #[serde(default)]
    pub pending: Option<Question>,
    /// Recently answered word pairs, most recent last.
    #[serde(default)]
    pub recent: Vec<WordPairId>,
    /// Number of questions issued so far; feeds the per-question seed.
    #[serde(default)]
    pub questions_issued: u64,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

impl TrainingSession {
    pub fn new(user_id: UserId, dictionary_id: DictionaryId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            dictionary_id,
            created_at: now,
            status: SessionStatus::Open,
            pending: None,
            recent: Vec::new(),
            questions_issued: 0,
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Push a word pair onto the recently-shown window, keeping at most `window` entries.
    pub fn remember_shown(&mut self, word_pair_id: WordPairId, window: usize) {
        self.recent.retain(|id| *id != word_pair_id);
        self.recent.push(word_pair_id);
        if self.recent.len() > window {
            let excess = self.recent.len() - window;
            self.recent.drain(..excess);
        }
    }
}

/// Immutable record of one answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingEvent {
    pub id: EventId,
    pub user_id: UserId,
    /// The word pair that was being tested.
    pub word_pair_id: WordPairId,
    pub session_id: SessionId,
    /// The option the user picked.
    pub chosen_word_pair_id: WordPairId,
    /// When the answered question was issued; part of the de-duplication key.
    pub question_issued_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_correct: bool,
}

/// A multiple-choice question ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub presented_word_pair_id: WordPairId,
    pub prompt_word: String,
    /// Translations in display order.
    pub options: Vec<String>,
    /// Word pair behind each option, parallel to `options`.
    pub option_ids: Vec<WordPairId>,
    pub correct_option_index: usize,
    pub issued_at: DateTime<Utc>,
}

impl Question {
    /// Map a tapped option index back to the word pair it stands for.
    pub fn option_id(&self, index: usize) -> Option<WordPairId> {
        self.option_ids.get(index).copied()
    }

    pub fn correct_translation(&self) -> Option<&str> {
        self.options
            .get(self.correct_option_index)
            .map(String::as_str)
    }
}

/// Result of starting or resuming a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    pub session_id: SessionId,
    pub question: Question,
    /// `true` when an already open session was resumed.
    pub resumed: bool,
}

/// Result of evaluating one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub correct: bool,
    pub correct_translation: String,
    pub next_question: Option<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_window_keeps_latest_entries() {
        let mut session = TrainingSession::new(UserId(1), DictionaryId(1), Utc::now());
        for id in 1..=5 {
            session.remember_shown(WordPairId(id), 3);
        }
        assert_eq!(
            session.recent,
            vec![WordPairId(3), WordPairId(4), WordPairId(5)]
        );

        session.remember_shown(WordPairId(3), 3);
        assert_eq!(
            session.recent,
            vec![WordPairId(4), WordPairId(5), WordPairId(3)]
        );
    }

    #[test]
    fn zero_window_remembers_nothing() {
        let mut session = TrainingSession::new(UserId(1), DictionaryId(1), Utc::now());
        session.remember_shown(WordPairId(1), 0);
        assert!(session.recent.is_empty());
    }

    #[test]
    fn option_lookup() {
        let question = Question {
            presented_word_pair_id: WordPairId(1),
            prompt_word: "cat".into(),
            options: vec!["пес".into(), "кіт".into()],
            option_ids: vec![WordPairId(2), WordPairId(1)],
            correct_option_index: 1,
            issued_at: Utc::now(),
        };
        assert_eq!(question.option_id(0), Some(WordPairId(2)));
        assert_eq!(question.option_id(2), None);
        assert_eq!(question.correct_translation(), Some("кіт"));
    }

    #[test]
    fn session_serde_defaults() {
        let json = r#"{
            "id": "6f1c2a4e-7d1b-4d55-9a53-0c2b5e9f4a10",
            "user_id": 1,
            "dictionary_id": 2,
            "created_at": "2025-12-25T22:20:33Z",
            "status": "open"
        }"#;
        let session: TrainingSession = serde_json::from_str(json).unwrap();
        assert!(session.is_open());
        assert!(session.pending.is_none());
        assert_eq!(session.questions_issued, 0);
    }
}
