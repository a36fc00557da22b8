//! lingualab-core: Training session engine, scheduling, and distractor selection.
//!
//! This crate defines the data model, the storage traits, and the decision
//! logic that picks the next word, builds multiple-choice options, and
//! evaluates answers against an append-only event log.

pub mod clock;
pub mod distractors;
pub mod error;
pub mod ingest;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod statistics;
pub mod traits;

pub use error::{ErrorClass, IngestError, StoreError, TrainingError};
pub use session::{TrainingConfig, TrainingEngine};
