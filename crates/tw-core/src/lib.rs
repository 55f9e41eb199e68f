//! Core state model for Talewright: identities, agents, static templates, and
//! the per-instance diff store.
//!
//! This crate knows nothing about events or execution. The runtime crate
//! drives mutations through [`AgentStore`] and attributes each one to an
//! [`EventId`].

/// Agent handles and static templates.
pub mod agent;
/// Error types used throughout the crate.
pub mod error;
/// Typed identities and the key provider that allocates them.
pub mod key;
/// Process-level registry of static agent templates.
pub mod registry;
/// Sparse per-instance agent state and its change journal.
pub mod store;
/// Property values.
pub mod value;

/// Re-export agent types.
pub use agent::{AgentHandle, Template};
/// Re-export error types.
pub use error::{StateError, StateResult};
/// Re-export identity types.
pub use key::{AgentId, EventId, Key, KeyProvider, KeyState, LineId};
/// Re-export the static registry.
pub use registry::StaticRegistry;
/// Re-export store types.
pub use store::{AgentStore, ChangeOp, ChangeRef, PropertyChange, Slot, StoreState};
/// Re-export the value type.
pub use value::Value;
