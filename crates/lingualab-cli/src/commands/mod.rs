pub mod import;
pub mod init;
pub mod list;
pub mod stats;
pub mod train;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use lingualab_core::clock::SystemClock;
use lingualab_core::ingest::{Ingestor, ModeratorList};
use lingualab_core::TrainingEngine;
use lingualab_store::{load_config_from, JsonFileStore, LinguaLabConfig};

/// Loaded config plus the data file it points at.
pub struct Workspace {
    pub config: LinguaLabConfig,
    pub store: Arc<JsonFileStore>,
}

impl Workspace {
    pub fn open(config_path: Option<&Path>) -> Result<Self> {
        let config = load_config_from(config_path)?;
        let store = JsonFileStore::open(&config.data_file)
            .with_context(|| format!("failed to open {}", config.data_file.display()))?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    /// An engine over the data file. Without a configured seed every run
    /// draws a fresh one.
    pub fn engine(&self) -> TrainingEngine {
        TrainingEngine::new(
            self.store.clone(),
            self.store.clone(),
            Arc::new(SystemClock),
            self.config.training.engine_config(rand::random()),
        )
    }

    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            self.store.clone(),
            Arc::new(ModeratorList::new(self.config.moderators.iter().copied())),
        )
        .with_max_upload_bytes(self.config.max_upload_bytes)
    }
}
