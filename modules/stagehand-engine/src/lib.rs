//! Timed step sequencing.
//!
//! Walks an ordered step list, groups adjacent steps into batches, publishes
//! one `DerivedState` snapshot per batch and sleeps for declared delays and
//! settle time in between.
//!
//! Consumers plug in a `Clock` (how to wait) and any number of
//! `SequenceObserver`s (what happened), and read the latest state through a
//! `tokio::sync::watch` feed.

pub mod batch;
pub mod cancel;
pub mod engine;
pub mod memory;
pub mod traits;
pub mod types;

pub use batch::{batch_range, batches};
pub use cancel::RunToken;
pub use engine::{EngineBuilder, SequenceEngine};
pub use memory::{MemoryTimeline, TimelineEntry};
pub use traits::{Clock, NoopObserver, SequenceObserver, TokioClock};
pub use types::{
    EngineSettings, Publication, RunOutcome, RunSummary, SequenceConfig, StepCallback,
};
