//! Persisted instance state.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tw_core::store::Diff;
use tw_core::{AgentId, KeyState, PropertyChange};

use crate::error::RuntimeResult;
use crate::random::RandomState;
use crate::record::EventRecord;

/// Identity counters of one instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCounters {
    /// Agent identity progress.
    pub agents: KeyState,
    /// Event identity progress.
    pub events: KeyState,
    /// Output line identity progress, when the sink issues its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lines: Option<KeyState>,
}

/// Everything needed to continue an instance in another process.
///
/// Restoring a snapshot and continuing play yields exactly the agent values
/// and random draws the original instance would have produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Instance name at capture time.
    pub name: String,
    /// Number of recycles the instance had been through.
    pub cycle: u64,
    /// Sparse per-agent overrides and tombstones.
    pub agent_diffs: BTreeMap<AgentId, Diff>,
    /// Agents spawned in the instance, with their names.
    #[serde(default)]
    pub spawned_agents: BTreeMap<AgentId, String>,
    /// The change journal of the current cycle.
    #[serde(default)]
    pub changes: Vec<PropertyChange>,
    /// Archived records of the current cycle.
    #[serde(default)]
    pub event_history: Vec<EventRecord>,
    /// Random source position.
    pub random_state: RandomState,
    /// Identity counters.
    pub key_counters: KeyCounters,
    /// Capture time.
    pub taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> RuntimeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Decode from JSON.
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
