//! Progress statistics derived from the event log.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{TrainingEvent, WordPair, WordPairId};
use crate::scheduler::Mastery;

/// Mastery breakdown of one user over one dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictionaryProgress {
    pub total_words: usize,
    pub untested: usize,
    pub last_incorrect: usize,
    pub learning: usize,
    pub mastered: usize,
    pub answers: usize,
    pub correct_answers: usize,
    /// Correct answers over all answers, `0.0` before the first answer.
    pub accuracy: f64,
}

/// Answer counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub answered: usize,
    pub correct: usize,
}

pub fn dictionary_progress(
    pairs: &[WordPair],
    histories: &HashMap<WordPairId, Vec<TrainingEvent>>,
) -> DictionaryProgress {
    let mut progress = DictionaryProgress {
        total_words: pairs.len(),
        ..Default::default()
    };

    for pair in pairs {
        let history = histories.get(&pair.id).map(Vec::as_slice).unwrap_or(&[]);
        match Mastery::from_history(history) {
            Mastery::Untested => progress.untested += 1,
            Mastery::LastIncorrect => progress.last_incorrect += 1,
            Mastery::Learning => progress.learning += 1,
            Mastery::Mastered => progress.mastered += 1,
        }
        progress.answers += history.len();
        progress.correct_answers += history.iter().filter(|e| e.is_correct).count();
    }

    if progress.answers > 0 {
        progress.accuracy = progress.correct_answers as f64 / progress.answers as f64;
    }
    progress
}

pub fn session_summary(events: &[TrainingEvent]) -> SessionSummary {
    SessionSummary {
        answered: events.len(),
        correct: events.iter().filter(|e| e.is_correct).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DictionaryId, EventId, SessionId, UserId};
    use chrono::Utc;

    fn pair(id: i64) -> WordPair {
        WordPair {
            id: WordPairId(id),
            dictionary_id: DictionaryId(1),
            word: format!("w{id}"),
            translation: format!("t{id}"),
        }
    }

    fn event(word_pair: i64, is_correct: bool) -> TrainingEvent {
        TrainingEvent {
            id: EventId::new(),
            user_id: UserId(1),
            word_pair_id: WordPairId(word_pair),
            session_id: SessionId::new(),
            chosen_word_pair_id: WordPairId(word_pair),
            question_issued_at: Utc::now(),
            created_at: Utc::now(),
            is_correct,
        }
    }

    #[test]
    fn progress_counts_each_level() {
        let pairs: Vec<WordPair> = (1..=4).map(pair).collect();
        let mut histories = HashMap::new();
        histories.insert(WordPairId(1), vec![event(1, true), event(1, true)]);
        histories.insert(WordPairId(2), vec![event(2, false)]);
        histories.insert(WordPairId(3), vec![event(3, false), event(3, true)]);

        let progress = dictionary_progress(&pairs, &histories);
        assert_eq!(progress.total_words, 4);
        assert_eq!(progress.mastered, 1);
        assert_eq!(progress.last_incorrect, 1);
        assert_eq!(progress.learning, 1);
        assert_eq!(progress.untested, 1);
        assert_eq!(progress.answers, 5);
        assert_eq!(progress.correct_answers, 3);
        assert!((progress.accuracy - 0.6).abs() < 1e-9);
    }

    #[test]
    fn empty_history_has_zero_accuracy() {
        let progress = dictionary_progress(&[pair(1)], &HashMap::new());
        assert_eq!(progress.untested, 1);
        assert_eq!(progress.accuracy, 0.0);
    }

    #[test]
    fn session_summary_counts() {
        let summary = session_summary(&[event(1, true), event(2, false), event(3, true)]);
        assert_eq!(summary, SessionSummary { answered: 3, correct: 2 });
    }
}
