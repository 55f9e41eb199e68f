use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StateResult;
use crate::key::{AgentId, EventId};
use crate::store::{AgentStore, ChangeRef};
use crate::value::Value;

/// Capability object for one agent.
///
/// A handle carries only the identity and an activation flag. Handles returned
/// by the static registry are inactive; binding them into an instance store
/// yields an active handle through which properties can be read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AgentHandle {
    id: AgentId,
    active: bool,
}

impl AgentHandle {
    pub(crate) fn inactive(id: AgentId) -> Self {
        Self { id, active: false }
    }

    pub(crate) fn active(id: AgentId) -> Self {
        Self { id, active: true }
    }

    /// The agent's identity.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// True once the handle has been bound into an instance.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Read a property. See [`AgentStore::get`].
    pub fn get(&self, store: &AgentStore, property: &str) -> StateResult<Option<Value>> {
        store.get(*self, property)
    }

    /// Write a property on behalf of `event`. See [`AgentStore::set`].
    pub fn set(
        &self,
        store: &mut AgentStore,
        event: EventId,
        property: &str,
        value: impl Into<Value>,
    ) -> StateResult<ChangeRef> {
        store.set(event, *self, property, value.into())
    }

    /// Delete a property on behalf of `event`. See [`AgentStore::delete`].
    pub fn delete(
        &self,
        store: &mut AgentStore,
        event: EventId,
        property: &str,
    ) -> StateResult<Option<ChangeRef>> {
        store.delete(event, *self, property)
    }
}

impl From<AgentHandle> for Value {
    fn from(handle: AgentHandle) -> Self {
        Value::Agent(handle.id)
    }
}

impl From<&AgentHandle> for Value {
    fn from(handle: &AgentHandle) -> Self {
        Value::Agent(handle.id)
    }
}

/// Default property values for a statically declared agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Display name of the agent.
    pub name: String,
    /// Default property values.
    pub properties: BTreeMap<String, Value>,
}

impl Template {
    /// Create an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    /// Add a default property value.
    pub fn with(mut self, property: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(property.into(), value.into());
        self
    }
}
