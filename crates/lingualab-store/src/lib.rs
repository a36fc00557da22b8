//! lingualab-store: Storage backends and configuration.
//!
//! Implements the `WordBank`, `ProgressStore` and `UserDirectory` traits in
//! memory and as a JSON snapshot file, and loads `lingualab.toml`.

pub mod config;
pub mod file;
pub mod memory;

pub use config::{load_config, load_config_from, LinguaLabConfig, TrainingSettings};
pub use file::JsonFileStore;
pub use memory::{MemoryStore, Snapshot};
