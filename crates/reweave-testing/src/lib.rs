#![doc = r"Headless harness for exercising the reweave runtime in tests.

[`RenderTest`] wires a [`RenderRoot`] to the in-memory host and the
delegated event layer, and exposes helpers for rendering element trees,
firing synthetic clicks, and asserting on the produced host tree without
any windowing or document backend."]

use reweave_core::host::{HostId, MemoryHost};
use reweave_core::{Element, RenderError, RenderRoot};
use reweave_events::{EventRoot, NativeEvent};

/// Headless root + in-memory host + delegated events, ready to render.
pub struct RenderTest {
    root: RenderRoot<MemoryHost>,
    events: EventRoot,
    container: HostId,
}

impl RenderTest {
    /// Create a harness with a fresh container and a click listener
    /// already delegated, mirroring what a real mount entry point does.
    pub fn new() -> Self {
        let mut host = MemoryHost::new();
        let container = host.create_container();
        let root = RenderRoot::new(host, container);
        let mut events = EventRoot::new(container);
        root.with_host_mut(|host| events.listen(host, "click"))
            .expect("attach delegated click listener");
        Self {
            root,
            events,
            container,
        }
    }

    /// Render an element tree into the container.
    pub fn render(&mut self, element: Element) -> Result<(), RenderError> {
        self.root.render(element)
    }

    /// Unmount whatever is currently rendered.
    pub fn unmount(&mut self) -> Result<(), RenderError> {
        self.root.unmount()
    }

    pub fn container(&self) -> HostId {
        self.container
    }

    pub fn root(&self) -> &RenderRoot<MemoryHost> {
        &self.root
    }

    /// Inspect the in-memory host tree.
    pub fn with_host<R>(&self, f: impl FnOnce(&MemoryHost) -> R) -> R {
        self.root.with_host(f)
    }

    /// Drain the host mutation log accumulated since the last call.
    pub fn take_host_ops(&mut self) -> Vec<String> {
        self.root.with_host_mut(|host| host.take_ops())
    }

    /// Child handles of a host node, outermost container by default.
    pub fn host_children(&self, id: HostId) -> Vec<HostId> {
        self.with_host(|host| host.child_ids(id))
    }

    /// The single top-level host child, if exactly one exists.
    pub fn top_host_child(&self) -> Option<HostId> {
        let children = self.host_children(self.container);
        match children.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }

    /// Fire a click at a host node through the delegation layer.
    ///
    /// Paths are collected under the host borrow, then replayed after it
    /// is released, so handlers are free to dispatch state updates that
    /// re-enter the runtime synchronously.
    pub fn click(&mut self, target: HostId) {
        let native = NativeEvent::new("click", Some(target));
        let events = &self.events;
        let pending = self.root.with_host(|host| events.prepare(host, native));
        if let Some(pending) = pending {
            pending.deliver();
        }
    }

    pub fn dump_tree(&self) -> String {
        self.with_host(|host| host.dump_tree(self.container))
    }
}

impl Default for RenderTest {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RenderTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTest")
            .field("container", &self.container)
            .finish()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// [`RenderTest`].
pub fn run_render_test<R>(f: impl FnOnce(&mut RenderTest) -> R) -> R {
    let mut harness = RenderTest::new();
    f(&mut harness)
}
