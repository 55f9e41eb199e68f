//! Process-level store of static agent templates.
//!
//! The registry is filled while authoring code declares its agents, then shared
//! (behind an `Arc`) with every instance. Instances never copy templates; they
//! only record deltas on top of them.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::agent::{AgentHandle, Template};
use crate::error::{StateError, StateResult};
use crate::key::{AgentId, KeyProvider};
use crate::value::Value;

/// Default property values for every statically declared agent.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    keys: KeyProvider<AgentId>,
    declared: BTreeSet<AgentId>,
    templates: BTreeMap<AgentId, Template>,
}

impl StaticRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an identity without a template yet.
    ///
    /// The returned handle can be stored in other templates as a forward
    /// reference and completed later with [`StaticRegistry::add`].
    pub fn declare(&mut self) -> AgentHandle {
        let id = self.keys.next();
        self.declared.insert(id);
        AgentHandle::inactive(id)
    }

    /// Attach a template to a declared agent.
    pub fn add(&mut self, handle: AgentHandle, template: Template) -> StateResult<AgentId> {
        let id = handle.id();
        if handle.is_active() {
            return Err(StateError::AgentAlreadyBound(id));
        }
        if self.templates.contains_key(&id) {
            return Err(StateError::AgentAlreadyStatic(id));
        }
        if !self.declared.contains(&id) {
            return Err(StateError::UnknownAgentId(id));
        }
        debug!(agent = %id, name = %template.name, "registered static template");
        self.templates.insert(id, template);
        Ok(id)
    }

    /// Declare and register in one step.
    pub fn add_new(&mut self, template: Template) -> AgentHandle {
        let handle = self.declare();
        self.templates.insert(handle.id(), template);
        handle
    }

    /// The default value of a property.
    pub fn get(&self, id: AgentId, property: &str) -> Option<&Value> {
        self.templates.get(&id)?.properties.get(property)
    }

    /// True if the template defines the property.
    pub fn has(&self, id: AgentId, property: &str) -> bool {
        self.get(id, property).is_some()
    }

    /// True if the agent has a template.
    pub fn contains(&self, id: AgentId) -> bool {
        self.templates.contains_key(&id)
    }

    /// The full template of an agent.
    pub fn template(&self, id: AgentId) -> Option<&Template> {
        self.templates.get(&id)
    }

    /// All agents with a template, in identity order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.templates.keys().copied()
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True if no template has been registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Key provider from which instances continue allocating agent identities.
    pub fn agent_keys(&self) -> KeyProvider<AgentId> {
        self.keys.clone()
    }

    /// Drop every template and restart identity allocation.
    pub fn reset(&mut self) {
        self.keys = KeyProvider::new();
        self.declared.clear();
        self.templates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_lookup() {
        let mut reg = StaticRegistry::new();
        let keeper = reg.add_new(Template::new("Keeper").with("hp", 10));
        assert!(!keeper.is_active());
        assert_eq!(reg.get(keeper.id(), "hp"), Some(&Value::Int(10)));
        assert!(reg.has(keeper.id(), "hp"));
        assert!(!reg.has(keeper.id(), "mp"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn forward_references_allow_cycles() {
        let mut reg = StaticRegistry::new();
        let a = reg.declare();
        let b = reg.declare();
        reg.add(a, Template::new("A").with("friend", b)).unwrap();
        reg.add(b, Template::new("B").with("friend", a)).unwrap();
        assert_eq!(reg.get(a.id(), "friend"), Some(&Value::Agent(b.id())));
        assert_eq!(reg.get(b.id(), "friend"), Some(&Value::Agent(a.id())));
    }

    #[test]
    fn double_registration_rejected() {
        let mut reg = StaticRegistry::new();
        let h = reg.add_new(Template::new("Keeper"));
        let err = reg.add(h, Template::new("Again")).unwrap_err();
        assert_eq!(err, StateError::AgentAlreadyStatic(h.id()));
    }

    #[test]
    fn bound_handle_rejected() {
        let mut reg = StaticRegistry::new();
        let h = reg.declare();
        let bound = AgentHandle::active(h.id());
        let err = reg.add(bound, Template::new("Keeper")).unwrap_err();
        assert_eq!(err, StateError::AgentAlreadyBound(h.id()));
    }

    #[test]
    fn undeclared_handle_rejected() {
        let mut reg = StaticRegistry::new();
        let stray = AgentHandle::inactive(AgentId(9999));
        assert!(matches!(
            reg.add(stray, Template::new("Stray")),
            Err(StateError::UnknownAgentId(_))
        ));
    }

    #[test]
    fn reset_clears_everything() {
        let mut reg = StaticRegistry::new();
        reg.add_new(Template::new("Keeper"));
        reg.reset();
        assert!(reg.is_empty());
        assert_eq!(reg.declare().id(), AgentId(crate::key::RESERVED_BAND));
    }
}
