//! Undoing archived events.
//!
//! Reverting to a record restores agent state, the random source and the
//! output sink to how they were immediately before that record executed.
//! The target and everything archived after it are removed from history.

use tracing::info;
use tw_core::{AgentStore, EventId, LineId};

use crate::engine::Engine;
use crate::error::{RuntimeError, RuntimeResult};
use crate::output::OutputSink;
use crate::random::RandomSource;

/// What a revert undid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertSummary {
    /// The record reverted to.
    pub target: EventId,
    /// Records removed from history, target included.
    pub records: usize,
    /// Property changes undone.
    pub changes: usize,
    /// Output lines retracted.
    pub lines: usize,
    /// Random generation count after rewinding.
    pub generation: u64,
}

/// Undo `target` and every change made after it.
///
/// The journal is rolled back from the target's starting position, so
/// untracked changes made after the target are undone too.
pub(crate) fn revert(
    engine: &mut Engine,
    store: &mut AgentStore,
    random: &mut RandomSource,
    output: &mut dyn OutputSink,
    target: EventId,
) -> RuntimeResult<RevertSummary> {
    let pos = engine
        .history()
        .position(target)
        .ok_or(RuntimeError::InvalidRevertTarget(target))?;
    let (journal_start, generation_start) = {
        let record = &engine.history().records()[pos];
        (record.journal_start, record.generation_start)
    };

    let removed = engine.history_mut().split_off(pos);
    let changes = store.rollback_to(journal_start);

    let lines: Vec<LineId> = removed
        .iter()
        .flat_map(|r| r.lines.iter().copied())
        .collect();
    output.retract(&lines);

    *random = RandomSource::resume(random.seed().to_string(), generation_start);

    info!(
        target = %target,
        records = removed.len(),
        changes,
        generation = generation_start,
        "reverted"
    );
    Ok(RevertSummary {
        target,
        records: removed.len(),
        changes,
        lines: lines.len(),
        generation: generation_start,
    })
}
