//! Output line attribution.
//!
//! The runtime does not format text. It only asks a sink for a line identity
//! so the executing event can record that it wrote something.

use serde::{Deserialize, Serialize};
use tw_core::{EventId, KeyProvider, KeyState, LineId};

use crate::error::RuntimeResult;

/// Receives lines written by events.
pub trait OutputSink {
    /// Store a line written by `event` and return its identity.
    fn record_output_line(&mut self, event: EventId, text: &str) -> LineId;

    /// Forget lines whose events were reverted. Sinks that cannot take output
    /// back may ignore this.
    fn retract(&mut self, _lines: &[LineId]) {}

    /// Line identity progress, if the sink issues identities that should
    /// survive a snapshot.
    fn line_keys(&self) -> Option<KeyState> {
        None
    }

    /// Continue issuing line identities from a captured state.
    fn continue_lines(&mut self, _keys: KeyState) -> RuntimeResult<()> {
        Ok(())
    }
}

/// One line held by a [`Transcript`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    /// Line identity.
    pub id: LineId,
    /// The event that wrote the line.
    pub event: EventId,
    /// Line text as written.
    pub text: String,
}

/// In-memory sink that keeps every line.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    keys: KeyProvider<LineId>,
    lines: Vec<OutputLine>,
}

impl Transcript {
    /// Create an empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines in write order.
    pub fn lines(&self) -> &[OutputLine] {
        &self.lines
    }

    /// Lines written by one event.
    pub fn lines_of(&self, event: EventId) -> impl Iterator<Item = &OutputLine> {
        self.lines.iter().filter(move |l| l.event == event)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Remove every line. Identities keep increasing.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl OutputSink for Transcript {
    fn record_output_line(&mut self, event: EventId, text: &str) -> LineId {
        let id = self.keys.next();
        self.lines.push(OutputLine {
            id,
            event,
            text: text.to_string(),
        });
        id
    }

    fn retract(&mut self, lines: &[LineId]) {
        self.lines.retain(|l| !lines.contains(&l.id));
    }

    fn line_keys(&self) -> Option<KeyState> {
        Some(self.keys.state())
    }

    fn continue_lines(&mut self, keys: KeyState) -> RuntimeResult<()> {
        if keys.next > self.keys.state().next {
            self.keys = KeyProvider::resume(keys)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_retracts() {
        let mut t = Transcript::new();
        let a = t.record_output_line(EventId(1100), "The lamp flickers.");
        let b = t.record_output_line(EventId(1101), "A gull cries.");
        assert_ne!(a, b);
        assert_eq!(t.lines_of(EventId(1101)).count(), 1);

        t.retract(&[b]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.lines()[0].text, "The lamp flickers.");
    }

    #[test]
    fn identities_survive_clear() {
        let mut t = Transcript::new();
        let a = t.record_output_line(EventId(1100), "one");
        t.clear();
        assert!(t.is_empty());
        let b = t.record_output_line(EventId(1100), "two");
        assert!(b > a);
    }

    #[test]
    fn continued_transcript_skips_issued_lines() {
        let mut first = Transcript::new();
        let a = first.record_output_line(EventId(1100), "one");
        let b = first.record_output_line(EventId(1100), "two");

        let mut second = Transcript::new();
        second.continue_lines(first.line_keys().unwrap()).unwrap();
        let c = second.record_output_line(EventId(1101), "three");
        assert!(c > a && c > b);

        // An older state never moves identities backwards.
        second.continue_lines(KeyState::default()).unwrap();
        assert!(second.record_output_line(EventId(1101), "four") > c);
    }
}
