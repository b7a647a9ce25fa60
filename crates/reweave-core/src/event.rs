//! Synthetic-event vocabulary shared between element props and the
//! delegation layer.
//!
//! Handlers are stored on element props under the author-facing callback
//! names (`onClick`, `onClickCapture`, ...). The delegation layer in
//! `reweave-events` collects them along the host ancestor path and replays
//! them against a [`SyntheticEvent`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Callback attached to an element's props for one event phase.
pub type EventHandler = Rc<dyn Fn(&SyntheticEvent)>;

/// Wrapper around a host-level event carrying a tracked propagation flag.
///
/// `stop_propagation` sets the flag and still forwards to the native stop,
/// so the host sees the stop even though replay ordering is decided here.
pub struct SyntheticEvent {
    category: String,
    stopped: Cell<bool>,
    native_stop: RefCell<Option<Box<dyn FnMut()>>>,
}

impl SyntheticEvent {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            stopped: Cell::new(false),
            native_stop: RefCell::new(None),
        }
    }

    /// Attach the underlying native stop-propagation callback.
    pub fn with_native_stop(mut self, stop: Box<dyn FnMut()>) -> Self {
        self.native_stop = RefCell::new(Some(stop));
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
        if let Some(stop) = self.native_stop.borrow_mut().as_mut() {
            stop();
        }
    }

    pub fn propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl fmt::Debug for SyntheticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticEvent")
            .field("category", &self.category)
            .field("stopped", &self.stopped.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn stop_propagation_sets_flag_and_forwards_to_native_stop() {
        let native_calls = Rc::new(Cell::new(0usize));
        let calls = Rc::clone(&native_calls);
        let event = SyntheticEvent::new("click")
            .with_native_stop(Box::new(move || calls.set(calls.get() + 1)));

        assert!(!event.propagation_stopped());
        event.stop_propagation();
        assert!(event.propagation_stopped());
        assert_eq!(native_calls.get(), 1);
    }
}
