//! Next-word selection.
//!
//! Words are ranked by a mastery level derived from the user's event history:
//! untested words first, then words whose last answer was wrong, then words
//! with a single trailing correct answer, and finally words with a correct
//! streak of two or more. Within a level the least recently tested word wins.
//! The ranking is deterministic; the only randomness is the caller's seed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{DictionaryId, TrainingEvent, UserId, WordPair, WordPairId};
use crate::traits::{ProgressStore, WordBank};

/// How well a user knows a word pair. Variants are ordered by scheduling
/// priority: `Untested` is asked first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mastery {
    Untested,
    LastIncorrect,
    Learning,
    Mastered,
}

/// Trailing correct answers needed for `Mastery::Mastered`.
pub const MASTERED_STREAK: usize = 2;

impl Mastery {
    /// Derive the level from a history ordered oldest first.
    pub fn from_history(history: &[TrainingEvent]) -> Self {
        let Some(last) = history.last() else {
            return Mastery::Untested;
        };
        if !last.is_correct {
            return Mastery::LastIncorrect;
        }
        let streak = history.iter().rev().take_while(|e| e.is_correct).count();
        if streak >= MASTERED_STREAK {
            Mastery::Mastered
        } else {
            Mastery::Learning
        }
    }
}

/// A word pair with the facts used to order it.
#[derive(Debug, Clone)]
pub struct RankedPair<'a> {
    pub pair: &'a WordPair,
    pub mastery: Mastery,
    pub last_tested: Option<DateTime<Utc>>,
    tie_key: u64,
}

/// Rank the eligible pairs, best candidate first.
///
/// Ordering: mastery level, then last-tested time (never tested first, then
/// oldest), then a key derived from `seed` when given, then word pair id.
pub fn rank_candidates<'a>(
    pairs: &'a [WordPair],
    histories: &HashMap<WordPairId, Vec<TrainingEvent>>,
    excluding: &HashSet<WordPairId>,
    seed: Option<u64>,
) -> Vec<RankedPair<'a>> {
    let mut ranked: Vec<RankedPair<'a>> = pairs
        .iter()
        .filter(|pair| !excluding.contains(&pair.id))
        .map(|pair| {
            let history = histories.get(&pair.id).map(Vec::as_slice).unwrap_or(&[]);
            RankedPair {
                pair,
                mastery: Mastery::from_history(history),
                last_tested: history.iter().map(|e| e.created_at).max(),
                tie_key: seed.map(|s| tie_key(s, pair.id)).unwrap_or(0),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.mastery
            .cmp(&b.mastery)
            .then_with(|| a.last_tested.cmp(&b.last_tested))
            .then_with(|| a.tie_key.cmp(&b.tie_key))
            .then_with(|| a.pair.id.cmp(&b.pair.id))
    });
    ranked
}

fn tie_key(seed: u64, id: WordPairId) -> u64 {
    let mixed = seed ^ (id.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed).next_u64()
}

/// Outcome of a scheduling request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextWord {
    Picked(WordPair),
    /// The dictionary has no word pairs at all.
    EmptyDictionary,
    /// Every pair is in the exclusion set.
    Exhausted,
}

/// Picks the next word pair to ask. Read-only.
#[derive(Clone)]
pub struct QuestionScheduler {
    words: Arc<dyn WordBank>,
    progress: Arc<dyn ProgressStore>,
}

impl QuestionScheduler {
    pub fn new(words: Arc<dyn WordBank>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { words, progress }
    }

    pub async fn next_word(
        &self,
        user_id: UserId,
        dictionary_id: DictionaryId,
        excluding: &HashSet<WordPairId>,
        seed: Option<u64>,
    ) -> Result<NextWord, StoreError> {
        let pairs = self.words.list_word_pairs(dictionary_id).await?;
        self.next_from(user_id, &pairs, excluding, seed).await
    }

    /// Same as [`next_word`](Self::next_word) over an already loaded pair list.
    pub async fn next_from(
        &self,
        user_id: UserId,
        pairs: &[WordPair],
        excluding: &HashSet<WordPairId>,
        seed: Option<u64>,
    ) -> Result<NextWord, StoreError> {
        if pairs.is_empty() {
            return Ok(NextWord::EmptyDictionary);
        }

        let mut histories = HashMap::new();
        for pair in pairs.iter().filter(|p| !excluding.contains(&p.id)) {
            let history = self.progress.history_for(user_id, pair.id).await?;
            histories.insert(pair.id, history);
        }

        let ranked = rank_candidates(pairs, &histories, excluding, seed);
        match ranked.first() {
            Some(best) => {
                tracing::debug!(
                    word_pair = %best.pair.id,
                    mastery = ?best.mastery,
                    candidates = ranked.len(),
                    "scheduled next word"
                );
                Ok(NextWord::Picked(best.pair.clone()))
            }
            None => Ok(NextWord::Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventId, SessionId};
    use chrono::Duration;

    fn pair(id: i64, word: &str, translation: &str) -> WordPair {
        WordPair {
            id: WordPairId(id),
            dictionary_id: DictionaryId(1),
            word: word.into(),
            translation: translation.into(),
        }
    }

    fn animals() -> Vec<WordPair> {
        vec![
            pair(1, "cat", "кіт"),
            pair(2, "dog", "пес"),
            pair(3, "car", "авто"),
        ]
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-12-25T22:20:33Z")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::minutes(minutes)
    }

    fn event(word_pair: i64, minutes: i64, is_correct: bool) -> TrainingEvent {
        TrainingEvent {
            id: EventId::new(),
            user_id: UserId(1),
            word_pair_id: WordPairId(word_pair),
            session_id: SessionId::new(),
            chosen_word_pair_id: WordPairId(word_pair),
            question_issued_at: at(minutes),
            created_at: at(minutes),
            is_correct,
        }
    }

    fn histories(events: Vec<TrainingEvent>) -> HashMap<WordPairId, Vec<TrainingEvent>> {
        let mut map: HashMap<WordPairId, Vec<TrainingEvent>> = HashMap::new();
        for e in events {
            map.entry(e.word_pair_id).or_default().push(e);
        }
        map
    }

    fn ids(ranked: &[RankedPair<'_>]) -> Vec<i64> {
        ranked.iter().map(|r| r.pair.id.0).collect()
    }

    #[test]
    fn mastery_levels_from_history() {
        assert_eq!(Mastery::from_history(&[]), Mastery::Untested);
        assert_eq!(
            Mastery::from_history(&[event(1, 0, true), event(1, 1, false)]),
            Mastery::LastIncorrect
        );
        assert_eq!(
            Mastery::from_history(&[event(1, 0, false), event(1, 1, true)]),
            Mastery::Learning
        );
        assert_eq!(
            Mastery::from_history(&[event(1, 0, false), event(1, 1, true), event(1, 2, true)]),
            Mastery::Mastered
        );
    }

    #[test]
    fn untested_dominates_incorrect_dominates_streak() {
        let pairs = animals();
        let h = histories(vec![
            // cat: mastered
            event(1, 0, true),
            event(1, 1, true),
            // dog: last answer wrong
            event(2, 2, false),
        ]);
        let ranked = rank_candidates(&pairs, &h, &HashSet::new(), None);
        assert_eq!(ids(&ranked), vec![3, 2, 1]);
        assert_eq!(ranked[0].mastery, Mastery::Untested);
        assert_eq!(ranked[1].mastery, Mastery::LastIncorrect);
        assert_eq!(ranked[2].mastery, Mastery::Mastered);
    }

    #[test]
    fn oldest_test_breaks_ties_within_a_level() {
        let pairs = animals();
        let h = histories(vec![
            event(1, 10, false),
            event(2, 5, false),
            event(3, 7, false),
        ]);
        let ranked = rank_candidates(&pairs, &h, &HashSet::new(), None);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn cat_scenario_ranks_untested_words_first() {
        let pairs = animals();
        let h = histories(vec![
            event(1, 0, false),
            event(1, 1, true),
            event(1, 2, true),
        ]);
        let ranked = rank_candidates(&pairs, &h, &HashSet::new(), None);
        assert_eq!(ranked.last().unwrap().pair.word, "cat");

        // dog tested once, car still untested: car first, cat still last
        let h = histories(vec![
            event(1, 0, false),
            event(1, 1, true),
            event(1, 2, true),
            event(2, 3, true),
        ]);
        let ranked = rank_candidates(&pairs, &h, &HashSet::new(), None);
        assert_eq!(ids(&ranked), vec![3, 2, 1]);
    }

    #[test]
    fn exclusion_removes_candidates() {
        let pairs = animals();
        let excluding: HashSet<_> = [WordPairId(1), WordPairId(3)].into_iter().collect();
        let ranked = rank_candidates(&pairs, &HashMap::new(), &excluding, None);
        assert_eq!(ids(&ranked), vec![2]);

        let all: HashSet<_> = pairs.iter().map(|p| p.id).collect();
        assert!(rank_candidates(&pairs, &HashMap::new(), &all, None).is_empty());
    }

    #[test]
    fn seeded_ranking_is_deterministic() {
        let pairs: Vec<WordPair> = (1..=20)
            .map(|i| pair(i, &format!("w{i}"), &format!("t{i}")))
            .collect();
        let h = HashMap::new();
        let first = ids(&rank_candidates(&pairs, &h, &HashSet::new(), Some(42)));
        let second = ids(&rank_candidates(&pairs, &h, &HashSet::new(), Some(42)));
        assert_eq!(first, second);
        assert_eq!(first.len(), 20);
    }

    #[test]
    fn seed_only_reorders_exact_ties() {
        let pairs = animals();
        let h = histories(vec![event(1, 0, true), event(1, 1, true)]);
        for seed in 0..50 {
            let ranked = rank_candidates(&pairs, &h, &HashSet::new(), Some(seed));
            assert_eq!(ranked.last().unwrap().pair.id, WordPairId(1));
        }
    }

    #[test]
    fn unseeded_ties_fall_back_to_id_order() {
        let pairs = animals();
        let ranked = rank_candidates(&pairs, &HashMap::new(), &HashSet::new(), None);
        assert_eq!(ids(&ranked), vec![1, 2, 3]);
    }
}
