//! Per-instance agent state.
//!
//! The store is a sparse diff over the [`StaticRegistry`]: each agent gets a
//! diff map the first time an instance mutates it, holding overrides and
//! tombstones. Reads check the diff first and fall back to the template.
//!
//! Every mutation is appended to a change journal and attributed to an event.
//! The journal is what revert walks backwards.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::agent::{AgentHandle, Template};
use crate::error::{StateError, StateResult};
use crate::key::{AgentId, EventId, KeyProvider, KeyState};
use crate::registry::StaticRegistry;
use crate::value::Value;

/// One entry in an agent's instance diff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// The instance overrides the property with this value.
    Override(Value),
    /// The instance deleted the property; the template is not consulted.
    Tombstone,
}

/// Instance-level property overrides for one agent.
pub type Diff = BTreeMap<String, Slot>;

/// The kind of a recorded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// The property was absent before.
    Add,
    /// The property was present and got a new value.
    Modify,
    /// The property was removed.
    Delete,
}

/// Index of a [`PropertyChange`] in the store's journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeRef(pub usize);

/// One recorded mutation of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    /// The mutated agent.
    pub agent: AgentId,
    /// The mutated property.
    pub property: String,
    /// What kind of mutation happened.
    pub op: ChangeOp,
    /// Effective value before the change.
    pub prior: Option<Value>,
    /// Effective value after the change.
    pub value: Option<Value>,
    /// The event that made the change.
    pub event: EventId,
    /// Raw diff slot before the change; `None` means the template showed through.
    pub previous_slot: Option<Slot>,
}

/// Serializable contents of an [`AgentStore`], minus the shared registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreState {
    /// Agent identity allocation progress.
    pub keys: KeyState,
    /// Agents created inside instances, with their display names.
    #[serde(default)]
    pub spawned: BTreeMap<AgentId, String>,
    /// Per-agent overrides and tombstones.
    #[serde(default)]
    pub diffs: BTreeMap<AgentId, Diff>,
    /// Mutation journal of the current cycle.
    #[serde(default)]
    pub journal: Vec<PropertyChange>,
}

/// Sparse per-instance agent state on top of the static registry.
#[derive(Debug, Clone)]
pub struct AgentStore {
    registry: Arc<StaticRegistry>,
    keys: KeyProvider<AgentId>,
    spawned: BTreeMap<AgentId, String>,
    diffs: BTreeMap<AgentId, Diff>,
    journal: Vec<PropertyChange>,
}

impl AgentStore {
    /// Create an empty store over a registry.
    pub fn new(registry: Arc<StaticRegistry>) -> Self {
        let keys = registry.agent_keys();
        Self {
            registry,
            keys,
            spawned: BTreeMap::new(),
            diffs: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    /// Rebuild a store from captured state.
    pub fn from_state(registry: Arc<StaticRegistry>, state: StoreState) -> StateResult<Self> {
        let keys = KeyProvider::resume(state.keys)?;
        // Agent keys must never fall behind the registry they sit on.
        if let Some(last) = registry.agent_keys().last_issued() {
            if keys.last_issued().is_none_or(|own| own < last) {
                return Err(StateError::IdentityCollision {
                    token: "generated".to_string(),
                    value: last.0,
                });
            }
        }
        Ok(Self {
            registry,
            keys,
            spawned: state.spawned,
            diffs: state.diffs,
            journal: state.journal,
        })
    }

    /// Capture the full state, journal included.
    pub fn state(&self) -> StoreState {
        StoreState {
            keys: self.keys.state(),
            spawned: self.spawned.clone(),
            diffs: self.diffs.clone(),
            journal: self.journal.clone(),
        }
    }

    /// A fresh store carrying the same agent state and key progress but no journal.
    pub fn recycle(self) -> Self {
        Self {
            journal: Vec::new(),
            ..self
        }
    }

    /// The shared static registry.
    pub fn registry(&self) -> &Arc<StaticRegistry> {
        &self.registry
    }

    /// True if the identity has a template or was spawned in this instance.
    pub fn knows(&self, id: AgentId) -> bool {
        self.registry.contains(id) || self.spawned.contains_key(&id)
    }

    /// Resolve an identity into an active handle.
    pub fn handle(&self, id: AgentId) -> StateResult<AgentHandle> {
        if self.knows(id) {
            Ok(AgentHandle::active(id))
        } else {
            Err(StateError::UnknownAgentId(id))
        }
    }

    /// Bind a registry handle to this store.
    pub fn bind(&self, handle: AgentHandle) -> StateResult<AgentHandle> {
        self.handle(handle.id())
    }

    /// Display name of an agent.
    pub fn name(&self, id: AgentId) -> Option<&str> {
        self.spawned
            .get(&id)
            .map(String::as_str)
            .or_else(|| self.registry.template(id).map(|t| t.name.as_str()))
    }

    /// Every known agent: static ones first, then spawned ones, each in identity order.
    pub fn agents(&self) -> Vec<AgentId> {
        self.registry
            .ids()
            .chain(self.spawned.keys().copied())
            .collect()
    }

    /// Read the effective value of a property.
    ///
    /// A tombstone hides the template value; otherwise an override wins over
    /// the template.
    pub fn get(&self, handle: AgentHandle, property: &str) -> StateResult<Option<Value>> {
        self.check(handle)?;
        Ok(self.effective(handle.id(), property).cloned())
    }

    /// Effective view of every property of an agent.
    pub fn properties(&self, handle: AgentHandle) -> StateResult<BTreeMap<String, Value>> {
        self.check(handle)?;
        let id = handle.id();
        let mut props: BTreeMap<String, Value> = self
            .registry
            .template(id)
            .map(|t| t.properties.clone())
            .unwrap_or_default();
        if let Some(diff) = self.diffs.get(&id) {
            for (property, slot) in diff {
                match slot {
                    Slot::Override(v) => {
                        props.insert(property.clone(), v.clone());
                    }
                    Slot::Tombstone => {
                        props.remove(property);
                    }
                }
            }
        }
        Ok(props)
    }

    /// Write a property, recording the change against `event`.
    pub fn set(
        &mut self,
        event: EventId,
        handle: AgentHandle,
        property: &str,
        value: Value,
    ) -> StateResult<ChangeRef> {
        self.check(handle)?;
        let id = handle.id();
        let prior = self.effective(id, property).cloned();
        let op = if prior.is_some() {
            ChangeOp::Modify
        } else {
            ChangeOp::Add
        };
        let previous_slot = self
            .diffs
            .entry(id)
            .or_default()
            .insert(property.to_string(), Slot::Override(value.clone()));
        Ok(self.record(PropertyChange {
            agent: id,
            property: property.to_string(),
            op,
            prior,
            value: Some(value),
            event,
            previous_slot,
        }))
    }

    /// Delete a property, recording the change against `event`.
    ///
    /// Deleting a property that is already absent changes nothing and records
    /// nothing.
    pub fn delete(
        &mut self,
        event: EventId,
        handle: AgentHandle,
        property: &str,
    ) -> StateResult<Option<ChangeRef>> {
        self.check(handle)?;
        let id = handle.id();
        let Some(prior) = self.effective(id, property).cloned() else {
            return Ok(None);
        };
        let previous_slot = self
            .diffs
            .entry(id)
            .or_default()
            .insert(property.to_string(), Slot::Tombstone);
        Ok(Some(self.record(PropertyChange {
            agent: id,
            property: property.to_string(),
            op: ChangeOp::Delete,
            prior: Some(prior),
            value: None,
            event,
            previous_slot,
        })))
    }

    /// Create an agent that has no static template.
    ///
    /// Initial properties are recorded as `Add` changes against `event`.
    pub fn spawn(
        &mut self,
        event: EventId,
        template: Template,
    ) -> StateResult<(AgentHandle, Vec<ChangeRef>)> {
        let id = self.keys.next();
        self.spawned.insert(id, template.name);
        let handle = AgentHandle::active(id);
        let mut changes = Vec::with_capacity(template.properties.len());
        for (property, value) in template.properties {
            changes.push(self.set(event, handle, &property, value)?);
        }
        Ok((handle, changes))
    }

    /// Undo journal entries back to `len`, newest first, and truncate the journal.
    ///
    /// Returns the number of undone changes.
    pub fn rollback_to(&mut self, len: usize) -> usize {
        let mut undone = 0;
        while self.journal.len() > len {
            let Some(change) = self.journal.pop() else {
                break;
            };
            self.restore_slot(change);
            undone += 1;
        }
        undone
    }

    /// A journal entry.
    pub fn change(&self, change: ChangeRef) -> Option<&PropertyChange> {
        self.journal.get(change.0)
    }

    /// The whole journal of the current cycle.
    pub fn journal(&self) -> &[PropertyChange] {
        &self.journal
    }

    /// Raw diff of one agent, if the instance ever touched it.
    pub fn diff(&self, id: AgentId) -> Option<&Diff> {
        self.diffs.get(&id)
    }

    /// Agent identity allocation progress.
    pub fn key_state(&self) -> KeyState {
        self.keys.state()
    }

    fn check(&self, handle: AgentHandle) -> StateResult<()> {
        if !handle.is_active() {
            return Err(StateError::AccessBeforeActivation(handle.id()));
        }
        if !self.knows(handle.id()) {
            return Err(StateError::UnknownAgentId(handle.id()));
        }
        Ok(())
    }

    fn effective(&self, id: AgentId, property: &str) -> Option<&Value> {
        match self.diffs.get(&id).and_then(|d| d.get(property)) {
            Some(Slot::Tombstone) => None,
            Some(Slot::Override(v)) => Some(v),
            None => self.registry.get(id, property),
        }
    }

    fn record(&mut self, change: PropertyChange) -> ChangeRef {
        trace!(
            agent = %change.agent,
            property = %change.property,
            op = ?change.op,
            event = %change.event,
            "property change"
        );
        let change_ref = ChangeRef(self.journal.len());
        self.journal.push(change);
        change_ref
    }

    fn restore_slot(&mut self, change: PropertyChange) {
        let diff = self.diffs.entry(change.agent).or_default();
        match change.previous_slot {
            Some(slot) => {
                diff.insert(change.property, slot);
            }
            None => {
                diff.remove(&change.property);
            }
        }
        if diff.is_empty() {
            self.diffs.remove(&change.agent);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const E1: EventId = EventId(1100);
    const E2: EventId = EventId(1101);

    fn setup() -> (AgentStore, AgentHandle) {
        let mut reg = StaticRegistry::new();
        let keeper = reg.add_new(Template::new("Keeper").with("hp", 10).with("lamp", "lit"));
        let store = AgentStore::new(Arc::new(reg));
        let handle = store.bind(keeper).unwrap();
        (store, handle)
    }

    #[test]
    fn falls_back_to_template() {
        let (store, keeper) = setup();
        assert_eq!(store.get(keeper, "hp").unwrap(), Some(Value::Int(10)));
        assert_eq!(store.get(keeper, "missing").unwrap(), None);
        assert!(store.diff(keeper.id()).is_none());
    }

    #[test]
    fn set_records_add_or_modify() {
        let (mut store, keeper) = setup();
        let modify = store.set(E1, keeper, "hp", Value::Int(7)).unwrap();
        let add = store.set(E1, keeper, "oil", Value::Int(3)).unwrap();

        let modify = store.change(modify).unwrap();
        assert_eq!(modify.op, ChangeOp::Modify);
        assert_eq!(modify.prior, Some(Value::Int(10)));
        assert_eq!(modify.event, E1);
        assert_eq!(store.change(add).unwrap().op, ChangeOp::Add);
        assert_eq!(store.get(keeper, "hp").unwrap(), Some(Value::Int(7)));
    }

    #[test]
    fn delete_writes_tombstone_over_template() {
        let (mut store, keeper) = setup();
        let change = store.delete(E1, keeper, "hp").unwrap().unwrap();
        assert_eq!(store.change(change).unwrap().prior, Some(Value::Int(10)));
        assert_eq!(store.get(keeper, "hp").unwrap(), None);
        assert_eq!(
            store.diff(keeper.id()).unwrap().get("hp"),
            Some(&Slot::Tombstone)
        );
    }

    #[test]
    fn delete_of_absent_property_records_nothing() {
        let (mut store, keeper) = setup();
        assert!(store.delete(E1, keeper, "missing").unwrap().is_none());
        assert!(store.journal().is_empty());
    }

    #[test]
    fn set_after_delete_is_add() {
        let (mut store, keeper) = setup();
        store.delete(E1, keeper, "hp").unwrap();
        let change = store.set(E2, keeper, "hp", Value::Int(1)).unwrap();
        let change = store.change(change).unwrap();
        assert_eq!(change.op, ChangeOp::Add);
        assert_eq!(change.previous_slot, Some(Slot::Tombstone));
    }

    #[test]
    fn rollback_restores_tombstones_and_template() {
        let (mut store, keeper) = setup();
        store.set(E1, keeper, "hp", Value::Int(7)).unwrap();
        let mark = store.journal().len();
        store.delete(E2, keeper, "hp").unwrap();
        store.set(E2, keeper, "hp", Value::Int(2)).unwrap();

        assert_eq!(store.rollback_to(mark), 2);
        assert_eq!(store.get(keeper, "hp").unwrap(), Some(Value::Int(7)));
        assert_eq!(store.rollback_to(0), 1);
        assert_eq!(store.get(keeper, "hp").unwrap(), Some(Value::Int(10)));
        assert!(store.diff(keeper.id()).is_none());
    }

    #[test]
    fn inactive_handle_is_rejected() {
        let mut reg = StaticRegistry::new();
        let keeper = reg.add_new(Template::new("Keeper").with("hp", 10));
        let mut store = AgentStore::new(Arc::new(reg));
        assert_eq!(
            store.get(keeper, "hp").unwrap_err(),
            StateError::AccessBeforeActivation(keeper.id())
        );
        assert!(matches!(
            store.set(E1, keeper, "hp", Value::Int(1)),
            Err(StateError::AccessBeforeActivation(_))
        ));
    }

    #[test]
    fn unknown_identity_is_rejected() {
        let (store, _) = setup();
        assert_eq!(
            store.handle(AgentId(5000)).unwrap_err(),
            StateError::UnknownAgentId(AgentId(5000))
        );
    }

    #[test]
    fn spawned_agents_continue_registry_keys() {
        let (mut store, keeper) = setup();
        let (gull, changes) = store
            .spawn(E1, Template::new("Gull").with("hunger", 2))
            .unwrap();
        assert!(gull.id() > keeper.id());
        assert_eq!(changes.len(), 1);
        assert_eq!(store.name(gull.id()), Some("Gull"));
        assert_eq!(store.get(gull, "hunger").unwrap(), Some(Value::Int(2)));
        assert_eq!(store.agents(), vec![keeper.id(), gull.id()]);
    }

    #[test]
    fn agent_references_allow_cycles() {
        let (mut store, keeper) = setup();
        let (gull, _) = store.spawn(E1, Template::new("Gull")).unwrap();
        store.set(E1, keeper, "pet", gull.into()).unwrap();
        store.set(E1, gull, "owner", keeper.into()).unwrap();

        let pet = store.get(keeper, "pet").unwrap().and_then(|v| v.as_agent()).unwrap();
        let pet = store.handle(pet).unwrap();
        let owner = store.get(pet, "owner").unwrap().and_then(|v| v.as_agent());
        assert_eq!(owner, Some(keeper.id()));

        let json = serde_json::to_string(&store.state()).unwrap();
        assert!(json.contains("\"agent\""));
    }

    #[test]
    fn recycle_keeps_state_and_drops_journal() {
        let (mut store, keeper) = setup();
        store.set(E1, keeper, "hp", Value::Int(4)).unwrap();
        let store = store.recycle();
        assert!(store.journal().is_empty());
        assert_eq!(store.get(keeper, "hp").unwrap(), Some(Value::Int(4)));
    }

    #[test]
    fn state_round_trip() {
        let (mut store, keeper) = setup();
        store.set(E1, keeper, "hp", Value::Int(4)).unwrap();
        store.delete(E1, keeper, "lamp").unwrap();
        let json = serde_json::to_string(&store.state()).unwrap();
        let state: StoreState = serde_json::from_str(&json).unwrap();
        let restored = AgentStore::from_state(store.registry().clone(), state).unwrap();
        assert_eq!(restored.get(keeper, "hp").unwrap(), Some(Value::Int(4)));
        assert_eq!(restored.get(keeper, "lamp").unwrap(), None);
        assert_eq!(restored.journal().len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8, i64),
        Delete(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..3, -5i64..5).prop_map(|(p, v)| Op::Set(p, v)),
            (0u8..3).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn rollback_restores_every_property(
            before in proptest::collection::vec(op(), 0..12),
            after in proptest::collection::vec(op(), 0..12),
        ) {
            let (mut store, keeper) = setup();
            let names = ["hp", "lamp", "oil"];
            let apply = |store: &mut AgentStore, ops: &[Op]| {
                for op in ops {
                    match op {
                        Op::Set(p, v) => {
                            store.set(E1, keeper, names[*p as usize], Value::Int(*v)).unwrap();
                        }
                        Op::Delete(p) => {
                            store.delete(E1, keeper, names[*p as usize]).unwrap();
                        }
                    }
                }
            };
            apply(&mut store, &before);
            let expected = store.properties(keeper).unwrap();
            let mark = store.journal().len();
            apply(&mut store, &after);
            store.rollback_to(mark);
            prop_assert_eq!(store.properties(keeper).unwrap(), expected);
        }
    }
}
