//! Dictionary ingestion from delimited text.
//!
//! The format is one `word,translation` pair per line with no header. Lines
//! are split on the first comma so translations may contain commas.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::IngestError;
use crate::model::{Dictionary, DictionaryId, NewWordPair};
use crate::traits::WordBank;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Name used when an upload carries no file name.
pub const DEFAULT_DICTIONARY_NAME: &str = "New dictionary";

/// Word pairs parsed from an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPairs {
    pub pairs: Vec<NewWordPair>,
    /// 1-based numbers of non-blank lines that could not be used.
    pub skipped_lines: Vec<usize>,
}

/// Parse `word,translation` lines.
///
/// Whitespace and surrounding double quotes are trimmed from both sides.
/// Blank lines are ignored; lines without a comma or with an empty side are
/// reported in `skipped_lines`.
pub fn parse_word_pairs(content: &str) -> ParsedPairs {
    let mut parsed = ParsedPairs::default();

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let Some((word, translation)) = line.split_once(',') else {
            parsed.skipped_lines.push(index + 1);
            continue;
        };
        let word = clean(word);
        let translation = clean(translation);
        if word.is_empty() || translation.is_empty() {
            parsed.skipped_lines.push(index + 1);
            continue;
        }
        parsed.pairs.push(NewWordPair::new(word, translation));
    }

    parsed
}

fn clean(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

/// Decides who may add or replace dictionaries.
pub trait ModeratorPolicy: Send + Sync {
    fn is_moderator(&self, external_id: i64) -> bool;
}

impl<F> ModeratorPolicy for F
where
    F: Fn(i64) -> bool + Send + Sync,
{
    fn is_moderator(&self, external_id: i64) -> bool {
        self(external_id)
    }
}

/// Allow-list of moderator chat ids. An empty list lets everybody in.
#[derive(Debug, Clone, Default)]
pub struct ModeratorList {
    ids: HashSet<i64>,
}

impl ModeratorList {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl ModeratorPolicy for ModeratorList {
    fn is_moderator(&self, external_id: i64) -> bool {
        self.ids.is_empty() || self.ids.contains(&external_id)
    }
}

/// Turns uploads into stored dictionaries.
pub struct Ingestor {
    words: Arc<dyn WordBank>,
    moderators: Arc<dyn ModeratorPolicy>,
    max_upload_bytes: usize,
}

impl Ingestor {
    pub fn new(words: Arc<dyn WordBank>, moderators: Arc<dyn ModeratorPolicy>) -> Self {
        Self {
            words,
            moderators,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Create a new dictionary from an upload.
    pub async fn create(
        &self,
        uploader: i64,
        name: Option<&str>,
        content: &str,
    ) -> Result<Dictionary, IngestError> {
        let pairs = self.checked_pairs(uploader, content)?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_DICTIONARY_NAME);

        let dictionary = self.words.create_dictionary(name, pairs).await?;
        tracing::info!(
            dictionary = %dictionary.id,
            name = %dictionary.name,
            words = dictionary.word_count,
            "dictionary created"
        );
        Ok(dictionary)
    }

    /// Replace the word pairs of an existing dictionary.
    pub async fn replace(
        &self,
        uploader: i64,
        dictionary_id: DictionaryId,
        content: &str,
    ) -> Result<Dictionary, IngestError> {
        let pairs = self.checked_pairs(uploader, content)?;
        if self.words.get_dictionary(dictionary_id).await?.is_none() {
            return Err(IngestError::DictionaryNotFound(dictionary_id));
        }

        let dictionary = self.words.replace_dictionary(dictionary_id, pairs).await?;
        tracing::info!(
            dictionary = %dictionary.id,
            words = dictionary.word_count,
            "dictionary replaced"
        );
        Ok(dictionary)
    }

    fn checked_pairs(&self, uploader: i64, content: &str) -> Result<Vec<NewWordPair>, IngestError> {
        if !self.moderators.is_moderator(uploader) {
            tracing::warn!(uploader, "upload rejected: not a moderator");
            return Err(IngestError::Unauthorized(uploader));
        }
        if content.len() > self.max_upload_bytes {
            tracing::warn!(uploader, size = content.len(), "upload rejected: too large");
            return Err(IngestError::TooLarge {
                size: content.len(),
                limit: self.max_upload_bytes,
            });
        }

        let parsed = parse_word_pairs(content);
        if !parsed.skipped_lines.is_empty() {
            tracing::debug!(skipped = ?parsed.skipped_lines, "ignored malformed lines");
        }
        if parsed.pairs.is_empty() {
            return Err(IngestError::NoWordPairs);
        }
        Ok(parsed.pairs)
    }
}
