//! Wrong-answer selection for multiple-choice questions.

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::TrainingError;
use crate::model::{DictionaryId, TrainingEvent, UserId, WordPair, WordPairId};
use crate::traits::{ProgressStore, WordBank};

/// Controls distractor sampling and where the correct answer lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shuffle {
    seed: u64,
    correct_index: Option<usize>,
}

impl Shuffle {
    /// Sample and place the correct answer from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            correct_index: None,
        }
    }

    /// Sample from `seed` but put the correct answer at `index`
    /// (clamped to the last slot).
    pub fn fixed(seed: u64, index: usize) -> Self {
        Self {
            seed,
            correct_index: Some(index),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

/// The options of one question in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionSet {
    pub options: Vec<String>,
    pub option_ids: Vec<WordPairId>,
    pub correct_index: usize,
}

/// Word pairs the user picked by mistake for this target, most recent first.
pub fn confusions_from_history(history: &[TrainingEvent]) -> Vec<WordPairId> {
    let mut seen = HashSet::new();
    history
        .iter()
        .rev()
        .filter(|e| !e.is_correct && e.chosen_word_pair_id != e.word_pair_id)
        .map(|e| e.chosen_word_pair_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Build `option_count` options for `target` from `pool`.
///
/// Distractors never repeat the target translation or each other. Earlier
/// confusions are used first; remaining slots are drawn uniformly with the
/// shuffle seed.
pub fn select_options(
    target: &WordPair,
    pool: &[WordPair],
    confusions: &[WordPairId],
    option_count: usize,
    shuffle: Shuffle,
) -> Result<OptionSet, TrainingError> {
    if option_count < 2 {
        return Err(TrainingError::InvalidOptionCount(option_count));
    }

    let mut others: Vec<&WordPair> = pool
        .iter()
        .filter(|p| p.id != target.id && p.translation != target.translation)
        .collect();
    others.sort_by_key(|p| p.id);

    let mut seen_translations = HashSet::new();
    let candidates: Vec<&WordPair> = others
        .into_iter()
        .filter(|p| seen_translations.insert(p.translation.as_str()))
        .collect();

    let needed = option_count - 1;
    if candidates.len() < needed {
        return Err(TrainingError::InsufficientDistractors {
            requested: option_count,
            available: candidates.len() + 1,
        });
    }

    let mut rng = StdRng::seed_from_u64(shuffle.seed);
    let mut chosen: Vec<&WordPair> = Vec::with_capacity(needed);

    for confused_id in confusions {
        if chosen.len() == needed {
            break;
        }
        // a confused pair may have been folded into a same-translation candidate
        let Some(translation) = pool
            .iter()
            .find(|p| p.id == *confused_id)
            .map(|p| p.translation.as_str())
        else {
            continue;
        };
        if let Some(candidate) = candidates
            .iter()
            .copied()
            .find(|c| c.translation == translation)
        {
            if !chosen.iter().any(|c| c.id == candidate.id) {
                chosen.push(candidate);
            }
        }
    }

    let mut rest: Vec<&WordPair> = candidates
        .iter()
        .filter(|c| !chosen.iter().any(|picked| picked.id == c.id))
        .copied()
        .collect();
    rest.shuffle(&mut rng);
    let missing = needed - chosen.len();
    chosen.extend(rest.into_iter().take(missing));
    chosen.shuffle(&mut rng);

    let correct_index = match shuffle.correct_index {
        Some(index) => index.min(option_count - 1),
        None => rng.random_range(0..option_count),
    };

    let mut options = Vec::with_capacity(option_count);
    let mut option_ids = Vec::with_capacity(option_count);
    let mut distractors = chosen.into_iter();
    for slot in 0..option_count {
        let pair = if slot == correct_index {
            target
        } else {
            match distractors.next() {
                Some(p) => p,
                None => break,
            }
        };
        options.push(pair.translation.clone());
        option_ids.push(pair.id);
    }

    Ok(OptionSet {
        options,
        option_ids,
        correct_index,
    })
}

/// Loads the dictionary and the user's history, then runs [`select_options`].
#[derive(Clone)]
pub struct DistractorSelector {
    words: Arc<dyn WordBank>,
    progress: Arc<dyn ProgressStore>,
}

impl DistractorSelector {
    pub fn new(words: Arc<dyn WordBank>, progress: Arc<dyn ProgressStore>) -> Self {
        Self { words, progress }
    }

    pub async fn build_options(
        &self,
        user_id: UserId,
        target: &WordPair,
        dictionary_id: DictionaryId,
        option_count: usize,
        shuffle: Shuffle,
    ) -> Result<OptionSet, TrainingError> {
        let pool = self.words.list_word_pairs(dictionary_id).await?;
        self.build_from(user_id, target, &pool, option_count, shuffle)
            .await
    }

    /// Same as [`build_options`](Self::build_options) over an already loaded pool.
    pub async fn build_from(
        &self,
        user_id: UserId,
        target: &WordPair,
        pool: &[WordPair],
        option_count: usize,
        shuffle: Shuffle,
    ) -> Result<OptionSet, TrainingError> {
        let history = self.progress.history_for(user_id, target.id).await?;
        let confusions = confusions_from_history(&history);
        select_options(target, pool, &confusions, option_count, shuffle)
    }
}
