//! Shared data model for stagehand sequences.
//!
//! Steps describe what to activate and when; `DerivedState` is the snapshot
//! the engine publishes and the rendering layer reads. Nothing in this crate
//! knows about timing or tasks.

pub mod config;
pub mod error;
pub mod file_config;
pub mod state;
pub mod types;

pub use config::{Config, LogFormat, ResetPolicy};
pub use error::StagehandError;
pub use file_config::{load_sequence, parse_sequence, SequenceFile, StepSpec};
pub use state::{DerivedState, Presence};
pub use types::*;
