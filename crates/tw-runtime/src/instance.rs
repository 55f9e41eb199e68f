use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use tw_core::{
    AgentHandle, AgentId, AgentStore, ChangeRef, EventId, PropertyChange, StaticRegistry,
    StoreState, Template, Value,
};

use crate::engine::Engine;
use crate::error::RuntimeResult;
use crate::event::EventQueue;
use crate::options::InstanceOptions;
use crate::output::{OutputSink, Transcript};
use crate::random::{RandomSource, RandomState};
use crate::record::{EventRecord, History};
use crate::revert::{self, RevertSummary};
use crate::snapshot::{KeyCounters, Snapshot};

/// A running simulation: agent state, event engine, random source and output.
///
/// Owns everything one turn needs. Between turns, [`Instance::recycle`]
/// hands identity counters and random position over to a fresh instance and
/// drops the history.
pub struct Instance<S: OutputSink = Transcript> {
    options: InstanceOptions,
    store: AgentStore,
    engine: Engine,
    random: RandomSource,
    output: S,
    cycle: u64,
}

impl<S: OutputSink> std::fmt::Debug for Instance<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.options.name())
            .field("cycle", &self.cycle)
            .field("history", &self.engine.history().len())
            .field("generation", &self.random.generation())
            .finish()
    }
}

impl Instance<Transcript> {
    /// Create an instance that keeps its output in a [`Transcript`].
    pub fn new(registry: Arc<StaticRegistry>, options: InstanceOptions) -> RuntimeResult<Self> {
        Self::with_output(registry, options, Transcript::new())
    }
}

impl<S: OutputSink> Instance<S> {
    /// Create an instance writing to `output`.
    pub fn with_output(
        registry: Arc<StaticRegistry>,
        options: InstanceOptions,
        output: S,
    ) -> RuntimeResult<Self> {
        let engine = Engine::new(options.max_steps())?;
        let random = RandomSource::new(options.seed());
        Ok(Self {
            store: AgentStore::new(registry),
            engine,
            random,
            output,
            options,
            cycle: 0,
        })
    }

    /// Rebuild an instance from a snapshot.
    ///
    /// The snapshot's seed replaces the one in `options`.
    pub fn restore(
        registry: Arc<StaticRegistry>,
        options: InstanceOptions,
        snapshot: Snapshot,
        mut output: S,
    ) -> RuntimeResult<Self> {
        if let Some(lines) = snapshot.key_counters.lines {
            output.continue_lines(lines)?;
        }
        let store = AgentStore::from_state(
            registry,
            StoreState {
                keys: snapshot.key_counters.agents,
                spawned: snapshot.spawned_agents,
                diffs: snapshot.agent_diffs,
                journal: snapshot.changes,
            },
        )?;
        let engine = Engine::resume(snapshot.key_counters.events, options.max_steps())?
            .with_history(History::from_records(snapshot.event_history));
        let random = RandomSource::from_state(&snapshot.random_state);
        let options = options.with_seed(random.seed());
        info!(
            name = options.name(),
            cycle = snapshot.cycle,
            records = engine.history().len(),
            generation = random.generation(),
            "restored instance"
        );
        Ok(Self {
            options,
            store,
            engine,
            random,
            output,
            cycle: snapshot.cycle,
        })
    }

    /// Capture everything needed to continue elsewhere.
    pub fn snapshot(&self) -> Snapshot {
        let state = self.store.state();
        Snapshot {
            name: self.options.name().to_string(),
            cycle: self.cycle,
            agent_diffs: state.diffs,
            spawned_agents: state.spawned,
            changes: state.journal,
            event_history: self.engine.history().records().to_vec(),
            random_state: self.random.state(),
            key_counters: KeyCounters {
                agents: state.keys,
                events: self.engine.key_state(),
                lines: self.output.line_keys(),
            },
            taken_at: Utc::now(),
        }
    }

    /// Hand agent state, identity counters and random position over to a fresh
    /// instance, dropping history and the change journal.
    pub fn recycle(self) -> RuntimeResult<Self> {
        let engine = Engine::resume(self.engine.key_state(), self.options.max_steps())?;
        let cycle = self.cycle + 1;
        info!(
            name = self.options.name(),
            cycle,
            dropped = self.engine.history().len(),
            generation = self.random.generation(),
            "recycled instance"
        );
        Ok(Self {
            options: self.options,
            store: self.store.recycle(),
            engine,
            random: self.random,
            output: self.output,
            cycle,
        })
    }

    /// Run an event chain to completion.
    ///
    /// Returns the identities of the top-level records.
    pub fn invoke(&mut self, event: impl Into<EventQueue>) -> RuntimeResult<Vec<EventId>> {
        self.engine.invoke(
            event,
            &mut self.store,
            &mut self.random,
            &mut self.output,
        )
    }

    /// Restore state to immediately before `target` executed.
    pub fn revert(&mut self, target: EventId) -> RuntimeResult<RevertSummary> {
        revert::revert(
            &mut self.engine,
            &mut self.store,
            &mut self.random,
            &mut self.output,
            target,
        )
    }

    /// Resolve an agent reference.
    pub fn agent(&self, id: AgentId) -> RuntimeResult<AgentHandle> {
        Ok(self.store.handle(id)?)
    }

    /// Bind a registry handle to this instance.
    pub fn bind(&self, handle: AgentHandle) -> RuntimeResult<AgentHandle> {
        Ok(self.store.bind(handle)?)
    }

    /// Read a property.
    pub fn get(&self, agent: AgentHandle, property: &str) -> RuntimeResult<Option<Value>> {
        Ok(self.store.get(agent, property)?)
    }

    /// Effective view of every property of an agent.
    pub fn properties(&self, agent: AgentHandle) -> RuntimeResult<BTreeMap<String, Value>> {
        Ok(self.store.properties(agent)?)
    }

    /// Write a property outside any event.
    pub fn set(
        &mut self,
        agent: AgentHandle,
        property: &str,
        value: impl Into<Value>,
    ) -> RuntimeResult<ChangeRef> {
        let untracked = self.engine.untracked();
        Ok(self.store.set(untracked, agent, property, value.into())?)
    }

    /// Delete a property outside any event.
    pub fn delete(
        &mut self,
        agent: AgentHandle,
        property: &str,
    ) -> RuntimeResult<Option<ChangeRef>> {
        let untracked = self.engine.untracked();
        Ok(self.store.delete(untracked, agent, property)?)
    }

    /// Create an agent outside any event.
    pub fn spawn(&mut self, template: Template) -> RuntimeResult<AgentHandle> {
        let untracked = self.engine.untracked();
        let (handle, _) = self.store.spawn(untracked, template)?;
        Ok(handle)
    }

    /// Archived records of the current cycle.
    pub fn history(&self) -> &History {
        self.engine.history()
    }

    /// One archived record.
    pub fn record(&self, id: EventId) -> Option<&EventRecord> {
        self.engine.history().get(id)
    }

    /// The record followed by its causes, up to the root.
    pub fn causal_chain(&self, id: EventId) -> Vec<&EventRecord> {
        self.engine.history().causal_chain(id)
    }

    /// Property changes attributed to `id`, in journal order.
    pub fn changes_of(&self, id: EventId) -> Vec<&PropertyChange> {
        self.store
            .journal()
            .iter()
            .filter(|c| c.event == id)
            .collect()
    }

    /// The identity owning changes made outside any event.
    pub fn untracked(&self) -> EventId {
        self.engine.untracked()
    }

    /// The identity standing for "no cause".
    pub fn root(&self) -> EventId {
        self.engine.root()
    }

    /// The output sink.
    pub fn output(&self) -> &S {
        &self.output
    }

    /// Mutable access to the output sink.
    pub fn output_mut(&mut self) -> &mut S {
        &mut self.output
    }

    /// The random source. Draws made here belong to no event.
    pub fn random(&mut self) -> &mut RandomSource {
        &mut self.random
    }

    /// Current random position.
    pub fn random_state(&self) -> RandomState {
        self.random.state()
    }

    /// Agent state.
    pub fn store(&self) -> &AgentStore {
        &self.store
    }

    /// Configuration.
    pub fn options(&self) -> &InstanceOptions {
        &self.options
    }

    /// Number of recycles so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }
}
