//! Single-slot pending-update holders.
//!
//! A queue coalesces state transitions for one slot: enqueueing overwrites
//! whatever was pending, so only the last write before a pass drains the
//! queue takes effect. This is deliberate; widening it into a multi-update
//! list changes observable semantics and belongs to an extension, not here.

use std::fmt;
use std::rc::Rc;

/// A state transition: either a replacement value or a function of the
/// previous state.
pub enum Action<S> {
    Replace(S),
    Compute(Rc<dyn Fn(&S) -> S>),
}

impl<S: Clone> Clone for Action<S> {
    fn clone(&self) -> Self {
        match self {
            Action::Replace(value) => Action::Replace(value.clone()),
            Action::Compute(f) => Action::Compute(Rc::clone(f)),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for Action<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            Action::Compute(_) => f.write_str("Compute(..)"),
        }
    }
}

/// One wrapped state transition.
pub struct Update<S> {
    action: Action<S>,
}

impl<S> Update<S> {
    pub fn new(action: Action<S>) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &Action<S> {
        &self.action
    }
}

/// Holder for at most one pending [`Update`].
pub struct UpdateQueue<S> {
    pending: Option<Update<S>>,
}

impl<S> UpdateQueue<S> {
    pub fn new() -> Self {
        Self { pending: None }
    }

    /// Overwrite the pending slot; the previous update, if any, is dropped.
    pub fn enqueue(&mut self, update: Update<S>) {
        self.pending = Some(update);
    }

    pub fn take(&mut self) -> Option<Update<S>> {
        self.pending.take()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the next memoized state from a base state and an optional
/// pending update.
pub fn process<S: Clone>(base: S, pending: Option<Update<S>>) -> S {
    match pending {
        None => base,
        Some(update) => match update.action {
            Action::Replace(value) => value,
            Action::Compute(f) => f(&base),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_without_pending_returns_base_unchanged() {
        let queue: UpdateQueue<i32> = UpdateQueue::new();
        assert!(!queue.has_pending());
        assert_eq!(process(7, None), 7);
    }

    #[test]
    fn compute_action_receives_previous_state() {
        let mut queue = UpdateQueue::new();
        queue.enqueue(Update::new(Action::Compute(Rc::new(|n: &i32| n + 1))));
        assert_eq!(process(1210, queue.take()), 1211);
    }

    #[test]
    fn replace_action_ignores_previous_state() {
        let mut queue = UpdateQueue::new();
        queue.enqueue(Update::new(Action::Replace(5)));
        assert_eq!(process(1210, queue.take()), 5);
    }

    #[test]
    fn enqueue_overwrites_the_single_slot() {
        let mut queue = UpdateQueue::new();
        queue.enqueue(Update::new(Action::Replace(1)));
        queue.enqueue(Update::new(Action::Replace(2)));
        queue.enqueue(Update::new(Action::Compute(Rc::new(|n: &i32| n * 10))));
        // Last write wins; the two replacements are gone.
        assert_eq!(process(4, queue.take()), 40);
        assert!(queue.take().is_none());
    }
}
