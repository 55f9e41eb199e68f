//! Event runtime for Talewright.
//!
//! Authors build behaviour with the composition algebra ([`on`], [`then`],
//! [`enqueue`]) and hand it to [`Instance::invoke`]. The engine runs chains
//! iteratively, attributes every property change, random draw and output
//! line to the record that made it, and can revert any archived record.

/// Mutable context passed to event functions.
pub mod context;
/// The run queue and its history.
pub mod engine;
/// Error types for the runtime crate.
pub mod error;
/// Tracked events and their composition.
pub mod event;
/// A running instance: store, engine, random source and output.
pub mod instance;
/// Instance configuration.
pub mod options;
/// Output line attribution.
pub mod output;
/// Seeded, replayable random source.
pub mod random;
/// Event records and causal history.
pub mod record;
/// Undoing archived events.
pub mod revert;
/// Persisted instance state.
pub mod snapshot;

/// Re-export of [`context::EventContext`].
pub use context::EventContext;
/// Re-export of [`engine::Engine`].
pub use engine::Engine;
/// Re-exports of [`error::RuntimeError`] and [`error::RuntimeResult`].
pub use error::{RuntimeError, RuntimeResult};
/// Re-exports of the composition algebra.
pub use event::{EventQueue, Next, TrackedEvent, done, enqueue, nq, on, then};
/// Re-export of [`instance::Instance`].
pub use instance::Instance;
/// Re-export of [`options::InstanceOptions`].
pub use options::InstanceOptions;
/// Re-exports of [`output::OutputSink`], [`output::OutputLine`], and [`output::Transcript`].
pub use output::{OutputLine, OutputSink, Transcript};
/// Re-exports of [`random::RandomSource`] and [`random::RandomState`].
pub use random::{ALPHANUMERIC, RandomSource, RandomState};
/// Re-exports of [`record::EventRecord`] and [`record::History`].
pub use record::{EventRecord, History};
/// Re-export of [`revert::RevertSummary`].
pub use revert::RevertSummary;
/// Re-exports of [`snapshot::Snapshot`] and [`snapshot::KeyCounters`].
pub use snapshot::{KeyCounters, Snapshot};
