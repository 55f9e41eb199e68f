//! The execution engine: a run queue of allocated event records.

use std::collections::VecDeque;

use tracing::{debug, warn};
use tw_core::{AgentStore, EventId, KeyProvider, KeyState};

use crate::context::EventContext;
use crate::error::{RuntimeError, RuntimeResult};
use crate::event::{Action, EventQueue, Next, TrackedEvent};
use crate::output::OutputSink;
use crate::random::RandomSource;
use crate::record::{EventRecord, History};

/// Sentinel event owning changes made outside any event.
pub const UNTRACKED: &str = "untracked";
/// Sentinel reserved for displaying "no cause". Records themselves carry
/// `caused_by: None`; this identity never appears in history.
pub const ROOT: &str = "root";

struct Pending {
    record: EventRecord,
    action: Action,
}

/// Drains event chains iteratively and archives what ran.
pub struct Engine {
    keys: KeyProvider<EventId>,
    untracked: EventId,
    root: EventId,
    queue: VecDeque<Pending>,
    history: History,
    max_steps: usize,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("issued", &self.keys.issued())
            .field("pending", &self.queue.len())
            .field("history", &self.history.len())
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl Engine {
    /// A fresh engine. `max_steps == 0` disables the chain guard.
    pub fn new(max_steps: usize) -> RuntimeResult<Self> {
        Self::resume(KeyState::default(), max_steps)
    }

    /// An engine whose event identities continue from `keys`.
    pub fn resume(keys: KeyState, max_steps: usize) -> RuntimeResult<Self> {
        let mut keys = KeyProvider::resume(keys)?;
        let untracked = keys.reserve(UNTRACKED, 0)?;
        let root = keys.reserve(ROOT, 1)?;
        Ok(Self {
            keys,
            untracked,
            root,
            queue: VecDeque::new(),
            history: History::new(),
            max_steps,
        })
    }

    /// Replace the archived history, used when restoring a snapshot.
    pub(crate) fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    /// The identity attributed to changes made outside any event.
    pub fn untracked(&self) -> EventId {
        self.untracked
    }

    /// The identity shown in place of a missing cause. Display only.
    pub fn root(&self) -> EventId {
        self.root
    }

    /// Archived records of the current cycle.
    pub fn history(&self) -> &History {
        &self.history
    }

    pub(crate) fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// Event identity allocation progress.
    pub fn key_state(&self) -> KeyState {
        self.keys.state()
    }

    /// Records scheduled but not yet run. Always zero between `invoke` calls.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Configured chain guard.
    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run `event` and everything it leads to.
    ///
    /// Returns the identities allocated for the top-level expansion. On error
    /// the failing record is archived with `failed` set and the rest of the
    /// run queue is dropped.
    pub fn invoke(
        &mut self,
        event: impl Into<EventQueue>,
        store: &mut AgentStore,
        random: &mut RandomSource,
        output: &mut dyn OutputSink,
    ) -> RuntimeResult<Vec<EventId>> {
        let roots = self.schedule(event.into(), None);
        let mut steps = 0usize;

        while let Some(Pending { mut record, action }) = self.queue.pop_front() {
            if self.max_steps > 0 && steps >= self.max_steps {
                warn!(event = %record.id, limit = self.max_steps, "step limit reached, dropping chain");
                self.abandon(Some(record.id));
                return Err(RuntimeError::StepLimitExceeded(self.max_steps));
            }
            steps += 1;

            record.journal_start = store.journal().len();
            record.generation_start = random.generation();
            debug!(
                event = %record.id,
                name = %record.name,
                cause = ?record.caused_by,
                "executing event"
            );

            let result = {
                let mut ctx = EventContext {
                    store: &mut *store,
                    random: &mut *random,
                    output: &mut *output,
                    record: &mut record,
                };
                (*action)(&mut ctx)
            };
            record.draws = (record.generation_start..random.generation()).collect();

            match result {
                Ok(Next::Done) => self.history.push(record),
                Ok(Next::Then(queue)) => {
                    let caused = self.schedule(queue, Some(record.id));
                    record.caused.extend(caused);
                    self.history.push(record);
                }
                Err(err) => {
                    warn!(event = %record.id, name = %record.name, error = %err, "event failed");
                    record.failed = true;
                    self.history.push(record);
                    self.abandon(None);
                    return Err(err);
                }
            }
        }

        Ok(roots)
    }

    /// Drop the run queue and unlink the dropped records from their causes.
    fn abandon(&mut self, popped: Option<EventId>) {
        let mut dropped: Vec<EventId> = self.queue.drain(..).map(|p| p.record.id).collect();
        dropped.extend(popped);
        if !dropped.is_empty() {
            debug!(dropped = dropped.len(), "abandoning queued events");
            self.history.unlink(&dropped);
        }
    }

    fn schedule(&mut self, queue: EventQueue, cause: Option<EventId>) -> Vec<EventId> {
        let (immediate, delayed) = queue.into_parts();
        debug!(
            cause = ?cause,
            immediate = immediate.len(),
            delayed = delayed.len(),
            "expanding queue"
        );
        let mut ids = Vec::with_capacity(immediate.len() + delayed.len());

        let front: Vec<Pending> = immediate
            .iter()
            .map(|event| self.allocate(event, cause))
            .collect();
        for pending in front.into_iter().rev() {
            ids.push(pending.record.id);
            self.queue.push_front(pending);
        }
        ids.reverse();

        for event in &delayed {
            let pending = self.allocate(event, cause);
            ids.push(pending.record.id);
            self.queue.push_back(pending);
        }
        ids
    }

    fn allocate(&mut self, event: &TrackedEvent, cause: Option<EventId>) -> Pending {
        Pending {
            record: EventRecord::scheduled(self.keys.next(), event.name(), cause),
            action: event.action(),
        }
    }
}
