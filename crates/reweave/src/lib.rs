#![doc = r"Public facade for the reweave UI framework.

Re-exports the reconciliation runtime and the delegated event layer under
one roof, plus a prelude for the common surface."]

pub use reweave_core::{
    element, event, fiber, hooks, host, key_of, process, Action, Component, EffectFlags, Element,
    ElementKind, EventHandler, FiberArena, FiberError, FiberId, HookCell, HookError, HostAdapter,
    HostError, HostId, Key, MemoryHost, NodeState, Props, RenderError, RenderRoot, Scope, SetState,
    StateSlot, SyntheticEvent, Update, UpdateQueue, WorkKind, WorkNode, MUTATION_MASK,
};

pub use reweave_events::{EventRoot, EventSurface, NativeEvent, PendingDispatch};

pub mod prelude {
    pub use reweave_core::{
        Element, EventHandler, HostAdapter, HostId, MemoryHost, Props, RenderError, RenderRoot,
        Scope, SetState, SyntheticEvent,
    };
    pub use reweave_events::{EventRoot, NativeEvent};
}
