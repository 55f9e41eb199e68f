//! Event records and the causal history they form.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tw_core::{ChangeRef, EventId, LineId};

/// The execution record of one tracked event.
///
/// A record is created when its event is scheduled and archived into
/// [`History`] once it has run. The event function itself is never archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Record identity.
    pub id: EventId,
    /// Name of the tracked event.
    pub name: String,
    /// The record whose function returned this event, if any.
    pub caused_by: Option<EventId>,
    /// Records scheduled from this record's return value.
    #[serde(default)]
    pub caused: Vec<EventId>,
    /// Property changes made while this record executed.
    #[serde(default)]
    pub changes: Vec<ChangeRef>,
    /// Output lines written while this record executed.
    #[serde(default)]
    pub lines: Vec<LineId>,
    /// Zero-based positions in the random sequence drawn while this record executed.
    #[serde(default)]
    pub draws: Vec<u64>,
    /// Journal length when execution began.
    pub journal_start: usize,
    /// Random generation count when execution began.
    pub generation_start: u64,
    /// True if the event function returned an error.
    #[serde(default)]
    pub failed: bool,
}

impl EventRecord {
    pub(crate) fn scheduled(id: EventId, name: &str, caused_by: Option<EventId>) -> Self {
        Self {
            id,
            name: name.to_string(),
            caused_by,
            caused: Vec::new(),
            changes: Vec::new(),
            lines: Vec::new(),
            draws: Vec::new(),
            journal_start: 0,
            generation_start: 0,
            failed: false,
        }
    }

    /// True if the record has no cause.
    pub fn is_root(&self) -> bool {
        self.caused_by.is_none()
    }
}

/// Archived records in execution order.
#[derive(Debug, Clone, Default)]
pub struct History {
    records: Vec<EventRecord>,
    index: HashMap<EventId, usize>,
}

impl History {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from records in execution order.
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(pos, r)| (r.id, pos))
            .collect();
        Self { records, index }
    }

    pub(crate) fn push(&mut self, record: EventRecord) {
        self.index.insert(record.id, self.records.len());
        self.records.push(record);
    }

    /// Position of a record in execution order.
    pub fn position(&self, id: EventId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Look up a record.
    pub fn get(&self, id: EventId) -> Option<&EventRecord> {
        self.position(id).map(|pos| &self.records[pos])
    }

    /// All records in execution order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// The most recently archived record.
    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    /// Iterate in execution order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &EventRecord> {
        self.records.iter()
    }

    /// Records that have no cause.
    pub fn roots(&self) -> impl Iterator<Item = &EventRecord> {
        self.records.iter().filter(|r| r.is_root())
    }

    /// The record followed by its causes, up to the root.
    ///
    /// Causes that are no longer archived end the walk.
    pub fn causal_chain(&self, id: EventId) -> Vec<&EventRecord> {
        let mut chain = Vec::new();
        let mut cursor = self.get(id);
        while let Some(record) = cursor {
            chain.push(record);
            cursor = record.caused_by.and_then(|cause| self.get(cause));
        }
        chain
    }

    /// Number of archived records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing has been archived.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Remove records from `pos` onwards and return them in execution order.
    ///
    /// Surviving records forget links to removed ones.
    pub(crate) fn split_off(&mut self, pos: usize) -> Vec<EventRecord> {
        let removed = self.records.split_off(pos);
        for record in &removed {
            self.index.remove(&record.id);
        }
        let ids: Vec<EventId> = removed.iter().map(|r| r.id).collect();
        self.unlink(&ids);
        removed
    }

    /// Forget links to records that will never be archived.
    pub(crate) fn unlink(&mut self, ids: &[EventId]) {
        for record in &mut self.records {
            record.caused.retain(|id| !ids.contains(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, caused_by: Option<u64>) -> EventRecord {
        EventRecord::scheduled(EventId(id), &format!("ev{id}"), caused_by.map(EventId))
    }

    #[test]
    fn push_and_lookup() {
        let mut h = History::new();
        h.push(record(1100, None));
        h.push(record(1101, Some(1100)));
        assert_eq!(h.len(), 2);
        assert_eq!(h.position(EventId(1101)), Some(1));
        assert_eq!(h.get(EventId(1100)).unwrap().name, "ev1100");
        assert_eq!(h.roots().count(), 1);
    }

    #[test]
    fn causal_chain_walks_to_root() {
        let mut h = History::new();
        h.push(record(1100, None));
        h.push(record(1101, Some(1100)));
        h.push(record(1102, Some(1101)));
        let chain: Vec<EventId> = h.causal_chain(EventId(1102)).iter().map(|r| r.id).collect();
        assert_eq!(chain, [EventId(1102), EventId(1101), EventId(1100)]);
        assert!(h.causal_chain(EventId(9)).is_empty());
    }

    #[test]
    fn split_off_unlinks_removed_records() {
        let mut h = History::new();
        let mut root = record(1100, None);
        root.caused = vec![EventId(1101), EventId(1102)];
        h.push(root);
        h.push(record(1101, Some(1100)));
        h.push(record(1102, Some(1100)));

        let removed = h.split_off(2);
        assert_eq!(removed.len(), 1);
        assert!(h.get(EventId(1102)).is_none());
        assert_eq!(h.get(EventId(1100)).unwrap().caused, [EventId(1101)]);
    }

    #[test]
    fn unlink_keeps_other_links() {
        let mut h = History::new();
        let mut root = record(1100, None);
        root.caused = vec![EventId(1101), EventId(1102), EventId(1103)];
        h.push(root);
        h.push(record(1101, Some(1100)));

        h.unlink(&[EventId(1102), EventId(1103)]);
        assert_eq!(h.get(EventId(1100)).unwrap().caused, [EventId(1101)]);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn from_records_rebuilds_index() {
        let h = History::from_records(vec![record(1100, None), record(1101, Some(1100))]);
        assert_eq!(h.position(EventId(1101)), Some(1));
        assert_eq!(h.last().unwrap().id, EventId(1101));
    }
}
