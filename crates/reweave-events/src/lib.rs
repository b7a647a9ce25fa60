#![doc = r"Event delegation for the reweave UI framework.

One native listener per supported event category is attached at the
container boundary. When a native event arrives, the layer walks the host
ancestor path from the event target up to the container, collects the
capture- and bubble-phase callbacks from each node's committed props bag,
and replays them against a [`SyntheticEvent`]: capture outermost-first,
then bubble innermost-first unless propagation was stopped during capture,
halting either chain as soon as the flag sets."]

use reweave_core::collections::map::HashSet;
use reweave_core::event::{EventHandler, SyntheticEvent};
use reweave_core::host::{HostAdapter, HostError, HostId, MemoryHost};
use reweave_core::Props;

/// Event categories with a delegated listener implementation.
const SUPPORTED_CATEGORIES: &[&str] = &["click"];

/// Capture/bubble callback names for a category, e.g. `click` maps to
/// `onClickCapture` + `onClick`.
fn callback_names(category: &str) -> Option<(&'static str, &'static str)> {
    match category {
        "click" => Some(("onClickCapture", "onClick")),
        _ => None,
    }
}

/// Host-tree introspection the delegation layer needs: the ancestor chain
/// and each node's committed props bag.
pub trait EventSurface {
    fn parent_of(&self, node: HostId) -> Option<HostId>;
    fn props_of(&self, node: HostId) -> Option<Props>;
}

impl EventSurface for MemoryHost {
    fn parent_of(&self, node: HostId) -> Option<HostId> {
        self.parent(node)
    }

    fn props_of(&self, node: HostId) -> Option<Props> {
        self.props(node)
    }
}

/// A host-level event as handed to the delegated listener.
pub struct NativeEvent {
    category: String,
    target: Option<HostId>,
    native_stop: Option<Box<dyn FnMut()>>,
}

impl NativeEvent {
    /// `target` is the innermost host node the event happened at; `None`
    /// models a malformed event, which is warned about and dropped.
    pub fn new(category: impl Into<String>, target: Option<HostId>) -> Self {
        Self {
            category: category.into(),
            target,
            native_stop: None,
        }
    }

    /// Attach the host's own stop-propagation callback; the synthetic
    /// wrapper still invokes it when propagation is stopped here.
    pub fn with_native_stop(mut self, stop: Box<dyn FnMut()>) -> Self {
        self.native_stop = Some(stop);
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

impl std::fmt::Debug for NativeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeEvent")
            .field("category", &self.category)
            .field("target", &self.target)
            .finish()
    }
}

/// A collected event ready for replay: callbacks resolved against the
/// component-facing tree, detached from the host borrow they were
/// collected under.
pub struct PendingDispatch {
    capture: Vec<EventHandler>,
    bubble: Vec<EventHandler>,
    event: SyntheticEvent,
}

impl PendingDispatch {
    /// Invoke the capture chain, then the bubble chain unless capture
    /// stopped propagation. Returns the synthetic event for inspection.
    pub fn deliver(self) -> SyntheticEvent {
        trigger_event_flow(&self.capture, &self.event);
        if !self.event.propagation_stopped() {
            trigger_event_flow(&self.bubble, &self.event);
        }
        self.event
    }

    pub fn capture_len(&self) -> usize {
        self.capture.len()
    }

    pub fn bubble_len(&self) -> usize {
        self.bubble.len()
    }
}

fn trigger_event_flow(handlers: &[EventHandler], event: &SyntheticEvent) {
    for handler in handlers {
        handler(event);
        if event.propagation_stopped() {
            break;
        }
    }
}

/// Delegated-listener registry for one container.
pub struct EventRoot {
    container: HostId,
    listened: HashSet<String>,
}

impl EventRoot {
    pub fn new(container: HostId) -> Self {
        Self {
            container,
            listened: HashSet::new(),
        }
    }

    pub fn container(&self) -> HostId {
        self.container
    }

    pub fn is_listening(&self, category: &str) -> bool {
        self.listened.contains(category)
    }

    /// Attach the single delegated listener for a category.
    ///
    /// Attaching twice is a checked warning and otherwise a no-op;
    /// unsupported categories are warned about and skipped.
    pub fn listen<H: HostAdapter>(
        &mut self,
        host: &mut H,
        category: &str,
    ) -> Result<(), HostError> {
        if !SUPPORTED_CATEGORIES.contains(&category) {
            log::warn!("unsupported event category {category:?}; listener not attached");
            return Ok(());
        }
        if !self.listened.insert(category.to_string()) {
            log::warn!("listener for {category:?} already attached to container");
            return Ok(());
        }
        host.add_native_listener(self.container, category)
    }

    /// Resolve a native event into a replayable dispatch.
    ///
    /// Only borrows the surface while walking the ancestor path; the
    /// returned [`PendingDispatch`] can be delivered after the borrow is
    /// gone, which matters when handlers re-enter the runtime.
    pub fn prepare<S: EventSurface>(
        &self,
        surface: &S,
        native: NativeEvent,
    ) -> Option<PendingDispatch> {
        let NativeEvent {
            category,
            target,
            native_stop,
        } = native;
        let Some(target) = target else {
            log::warn!("{category:?} event has no target; dropping");
            return None;
        };
        let Some((capture_name, bubble_name)) = callback_names(&category) else {
            log::warn!("unsupported event category {category:?}; dropping");
            return None;
        };

        // Walk target -> container (exclusive). Capture callbacks end up
        // outermost-first, bubble callbacks innermost-first, because
        // capture fires top-down and bubble bottom-up.
        let mut capture: Vec<EventHandler> = Vec::new();
        let mut bubble: Vec<EventHandler> = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            if node == self.container {
                break;
            }
            if let Some(props) = surface.props_of(node) {
                if let Some(handler) = props.handler(capture_name) {
                    capture.insert(0, handler);
                }
                if let Some(handler) = props.handler(bubble_name) {
                    bubble.push(handler);
                }
            }
            cursor = surface.parent_of(node);
        }

        let mut event = SyntheticEvent::new(category);
        if let Some(stop) = native_stop {
            event = event.with_native_stop(stop);
        }
        Some(PendingDispatch {
            capture,
            bubble,
            event,
        })
    }

    /// Collect and replay in one step.
    ///
    /// The surface borrow is held across handler invocation; use
    /// [`EventRoot::prepare`] + [`PendingDispatch::deliver`] when handlers
    /// may need to re-enter the runtime that owns the surface.
    pub fn dispatch<S: EventSurface>(&self, surface: &S, native: NativeEvent) {
        if let Some(pending) = self.prepare(surface, native) {
            pending.deliver();
        }
    }
}

impl std::fmt::Debug for EventRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRoot")
            .field("container", &self.container)
            .field("listened", &self.listened.len())
            .finish()
    }
}
