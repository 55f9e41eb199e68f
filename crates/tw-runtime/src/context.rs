use tw_core::{AgentHandle, AgentId, AgentStore, EventId, LineId, Template, Value};

use crate::error::RuntimeResult;
use crate::output::OutputSink;
use crate::random::RandomSource;
use crate::record::EventRecord;

/// Mutable context passed to an event function while it runs.
///
/// Every mutation, draw, and output line made through the context is
/// attributed to the executing record.
pub struct EventContext<'a> {
    pub(crate) store: &'a mut AgentStore,
    pub(crate) random: &'a mut RandomSource,
    pub(crate) output: &'a mut dyn OutputSink,
    pub(crate) record: &'a mut EventRecord,
}

impl EventContext<'_> {
    /// Identity of the executing record.
    pub fn event_id(&self) -> EventId {
        self.record.id
    }

    /// Name of the executing event.
    pub fn event_name(&self) -> &str {
        &self.record.name
    }

    /// The record that scheduled this one.
    pub fn cause(&self) -> Option<EventId> {
        self.record.caused_by
    }

    /// Read-only access to agent state.
    pub fn store(&self) -> &AgentStore {
        self.store
    }

    /// Resolve an agent reference into an active handle.
    pub fn agent(&self, id: AgentId) -> RuntimeResult<AgentHandle> {
        Ok(self.store.handle(id)?)
    }

    /// Read a property.
    pub fn get(&self, agent: AgentHandle, property: &str) -> RuntimeResult<Option<Value>> {
        Ok(self.store.get(agent, property)?)
    }

    /// Read an integer property, treating absence or another type as `default`.
    pub fn get_int(&self, agent: AgentHandle, property: &str, default: i64) -> RuntimeResult<i64> {
        Ok(self
            .get(agent, property)?
            .and_then(|v| v.as_int())
            .unwrap_or(default))
    }

    /// Write a property.
    pub fn set(
        &mut self,
        agent: AgentHandle,
        property: &str,
        value: impl Into<Value>,
    ) -> RuntimeResult<()> {
        let change = self
            .store
            .set(self.record.id, agent, property, value.into())?;
        self.record.changes.push(change);
        Ok(())
    }

    /// Delete a property.
    pub fn delete(&mut self, agent: AgentHandle, property: &str) -> RuntimeResult<()> {
        if let Some(change) = self.store.delete(self.record.id, agent, property)? {
            self.record.changes.push(change);
        }
        Ok(())
    }

    /// Create an agent that has no static template.
    pub fn spawn(&mut self, template: Template) -> RuntimeResult<AgentHandle> {
        let (handle, changes) = self.store.spawn(self.record.id, template)?;
        self.record.changes.extend(changes);
        Ok(handle)
    }

    /// The instance's random source.
    pub fn random(&mut self) -> &mut RandomSource {
        self.random
    }

    /// Write an output line.
    pub fn say(&mut self, text: impl AsRef<str>) -> LineId {
        let line = self
            .output
            .record_output_line(self.record.id, text.as_ref());
        self.record.lines.push(line);
        line
    }
}
