//! Tracked events and their composition algebra.
//!
//! Everything here builds plain values. Nothing runs, mutates state, or
//! allocates identities until an [`EventQueue`] is handed to the engine.
//!
//! A queue has two phases: `immediate` events run in order as soon as the
//! queue is expanded, `delayed` events are appended to the back of the run
//! queue and run after everything already scheduled.

use std::fmt;
use std::rc::Rc;

use crate::context::EventContext;
use crate::error::{RuntimeError, RuntimeResult};

/// The function behind a tracked event.
pub type Action = Rc<dyn Fn(&mut EventContext<'_>) -> RuntimeResult<Next>>;

/// What an event function asks the engine to run next.
#[derive(Debug, Clone, Default)]
pub enum Next {
    /// The chain ends here.
    #[default]
    Done,
    /// Expand this queue with the current event as its cause.
    Then(EventQueue),
}

impl From<TrackedEvent> for Next {
    fn from(event: TrackedEvent) -> Self {
        Self::Then(event.into())
    }
}

impl From<EventQueue> for Next {
    fn from(queue: EventQueue) -> Self {
        Self::Then(queue)
    }
}

/// Shorthand for an event function that ends its chain.
pub fn done() -> RuntimeResult<Next> {
    Ok(Next::Done)
}

/// A named unit of behaviour.
#[derive(Clone)]
pub struct TrackedEvent {
    name: Rc<str>,
    action: Action,
}

impl fmt::Debug for TrackedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TrackedEvent").field(&self.name).finish()
    }
}

impl TrackedEvent {
    /// The event's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn action(&self) -> Action {
        Rc::clone(&self.action)
    }

    /// `then(self, next)`.
    pub fn then(self, next: impl Into<EventQueue>) -> RuntimeResult<EventQueue> {
        EventQueue::from(self).then(next)
    }

    /// `then(self, enqueue(items))`.
    pub fn thenq<I>(self, items: I) -> RuntimeResult<EventQueue>
    where
        I: IntoIterator,
        I::Item: Into<EventQueue>,
    {
        self.then(enqueue(items))
    }
}

/// Wrap a state-mutating function as a named event.
///
/// When the engine runs the event it calls `action`; whatever the function
/// returns is expanded next, with this event recorded as its cause.
pub fn on<F>(name: impl AsRef<str>, action: F) -> TrackedEvent
where
    F: Fn(&mut EventContext<'_>) -> RuntimeResult<Next> + 'static,
{
    TrackedEvent {
        name: Rc::from(name.as_ref()),
        action: Rc::new(action),
    }
}

/// An ordered two-phase bundle of tracked events.
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    immediate: Vec<TrackedEvent>,
    delayed: Vec<TrackedEvent>,
}

impl From<TrackedEvent> for EventQueue {
    fn from(event: TrackedEvent) -> Self {
        Self {
            immediate: vec![event],
            delayed: Vec::new(),
        }
    }
}

impl EventQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Events that run as soon as the queue is expanded.
    pub fn immediate(&self) -> &[TrackedEvent] {
        &self.immediate
    }

    /// Events that run after everything already scheduled.
    pub fn delayed(&self) -> &[TrackedEvent] {
        &self.delayed
    }

    /// True if the queue carries delayed events and can no longer be followed by `then`.
    pub fn has_delayed(&self) -> bool {
        !self.delayed.is_empty()
    }

    /// Total number of events.
    pub fn len(&self) -> usize {
        self.immediate.len() + self.delayed.len()
    }

    /// True if the queue holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequential composition of `self` and `next`.
    pub fn then(self, next: impl Into<EventQueue>) -> RuntimeResult<EventQueue> {
        then([self, next.into()])
    }

    /// `then(self, enqueue(items))`.
    pub fn thenq<I>(self, items: I) -> RuntimeResult<EventQueue>
    where
        I: IntoIterator,
        I::Item: Into<EventQueue>,
    {
        self.then(enqueue(items))
    }

    pub(crate) fn into_parts(self) -> (Vec<TrackedEvent>, Vec<TrackedEvent>) {
        (self.immediate, self.delayed)
    }
}

/// Sequential composition.
///
/// Immediate events are concatenated in argument order and the result adopts
/// the delayed events of the last argument. Any argument other than the last
/// that carries delayed events makes the composition fail with
/// [`RuntimeError::IllegalQueueComposition`].
pub fn then<I>(items: I) -> RuntimeResult<EventQueue>
where
    I: IntoIterator,
    I::Item: Into<EventQueue>,
{
    let mut result = EventQueue::new();
    for item in items {
        if result.has_delayed() {
            return Err(RuntimeError::IllegalQueueComposition);
        }
        let (immediate, delayed) = item.into().into_parts();
        result.immediate.extend(immediate);
        result.delayed = delayed;
    }
    Ok(result)
}

/// Flatten events into the delayed phase of one queue, in argument order.
///
/// A queue argument contributes its immediate events followed by its delayed
/// events.
pub fn enqueue<I>(items: I) -> EventQueue
where
    I: IntoIterator,
    I::Item: Into<EventQueue>,
{
    let mut result = EventQueue::new();
    for item in items {
        let (immediate, delayed) = item.into().into_parts();
        result.delayed.extend(immediate);
        result.delayed.extend(delayed);
    }
    result
}

/// Alias for [`enqueue`].
pub fn nq<I>(items: I) -> EventQueue
where
    I: IntoIterator,
    I::Item: Into<EventQueue>,
{
    enqueue(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ev(name: &str) -> TrackedEvent {
        on(name, |_| done())
    }

    fn names(events: &[TrackedEvent]) -> Vec<&str> {
        events.iter().map(TrackedEvent::name).collect()
    }

    #[test]
    fn single_event_is_immediate() {
        let q = EventQueue::from(ev("a"));
        assert_eq!(names(q.immediate()), ["a"]);
        assert!(q.delayed().is_empty());
    }

    #[test]
    fn then_concatenates_immediates() {
        let q = ev("a").then(ev("b")).unwrap().then(ev("c")).unwrap();
        assert_eq!(names(q.immediate()), ["a", "b", "c"]);
        assert!(!q.has_delayed());
    }

    #[test]
    fn then_adopts_last_delayed() {
        let q = ev("a").thenq([ev("x"), ev("y")]).unwrap();
        assert_eq!(names(q.immediate()), ["a"]);
        assert_eq!(names(q.delayed()), ["x", "y"]);
    }

    #[test]
    fn then_after_delayed_fails() {
        let q = ev("a").thenq([ev("x")]).unwrap();
        assert!(matches!(
            q.then(ev("b")),
            Err(RuntimeError::IllegalQueueComposition)
        ));
        assert!(matches!(
            then([enqueue([ev("x")]), ev("b").into()]),
            Err(RuntimeError::IllegalQueueComposition)
        ));
    }

    #[test]
    fn enqueue_splices_queue_phases() {
        let inner = ev("a").thenq([ev("b")]).unwrap();
        let q = nq([inner, ev("c").into()]);
        assert!(q.immediate().is_empty());
        assert_eq!(names(q.delayed()), ["a", "b", "c"]);
    }

    #[test]
    fn enqueue_nested_matches_flat() {
        let nested = enqueue([enqueue([ev("a"), ev("b")]), ev("c").into()]);
        let flat = enqueue([ev("a"), ev("b"), ev("c")]);
        assert_eq!(names(nested.delayed()), names(flat.delayed()));
        assert_eq!(names(nested.delayed()), ["a", "b", "c"]);
    }

    #[test]
    fn empty_compositions() {
        assert!(then(Vec::<EventQueue>::new()).unwrap().is_empty());
        assert!(enqueue(Vec::<TrackedEvent>::new()).is_empty());
    }

    fn label(i: usize) -> String {
        format!("e{i}")
    }

    proptest! {
        #[test]
        fn then_on_delayed_queue_always_fails(
            delayed in 1usize..6,
            immediate in 0usize..4,
            rest in 1usize..4,
        ) {
            let mut queue = enqueue((0..delayed).map(|i| ev(&label(i))));
            for i in 0..immediate {
                queue = ev(&label(100 + i)).then(queue).unwrap();
            }
            prop_assert!(queue.has_delayed());
            let tail: Vec<EventQueue> = (0..rest).map(|i| ev(&label(200 + i)).into()).collect();
            let mut items = vec![queue];
            items.extend(tail);
            prop_assert!(matches!(then(items), Err(RuntimeError::IllegalQueueComposition)));
        }

        #[test]
        fn enqueue_flattening_preserves_order(
            groups in proptest::collection::vec(1usize..4, 1..6),
        ) {
            let mut counter = 0;
            let mut expected = Vec::new();
            let mut nested = Vec::new();
            for size in groups {
                let group: Vec<TrackedEvent> = (0..size)
                    .map(|_| {
                        counter += 1;
                        expected.push(label(counter));
                        ev(&label(counter))
                    })
                    .collect();
                nested.push(enqueue(group));
            }
            let q = enqueue(nested);
            prop_assert_eq!(names(q.delayed()), expected.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
