#![doc = r"Core reconciliation runtime for the reweave UI framework.

A [`RenderRoot`] owns a double-buffered tree of [`WorkNode`]s describing what
is currently mounted in a host container. Feeding it an [`Element`]
description runs a synchronous render pass (begin/complete diffing against
the live tree) followed by a commit pass that applies the accumulated effect
flags to the host tree through a [`HostAdapter`]."]

pub mod collections;
pub mod commit;
pub mod element;
pub mod event;
pub mod fiber;
pub mod hash;
pub mod hooks;
pub mod host;
pub mod render;
pub mod runtime;
pub mod update_queue;

pub use element::{Component, Element, ElementKind, Props};
pub use event::{EventHandler, SyntheticEvent};
pub use fiber::{EffectFlags, FiberArena, FiberId, NodeState, WorkKind, WorkNode, MUTATION_MASK};
pub use hash::hash_one;
pub use hooks::{HookCell, Scope, SetState, StateSlot};
pub use host::{HostAdapter, HostError, HostId, MemoryHost};
pub use runtime::RenderRoot;
pub use update_queue::{process, Action, Update, UpdateQueue};

/// Stable identity attached to an element description, hashed from whatever
/// key the author supplied.
pub type Key = u64;

/// Hash an author-facing key value into a [`Key`].
pub fn key_of<K: std::hash::Hash>(key: &K) -> Key {
    hash::hash_one(key)
}

/// Errors raised by work-node arena lookups.
///
/// A `Missing` id means a tree link survived past the node it pointed at,
/// which the render and commit phases treat as a failed pass rather than a
/// recoverable condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FiberError {
    Missing { id: FiberId },
    KindMismatch { id: FiberId, expected: &'static str },
}

impl std::fmt::Display for FiberError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FiberError::Missing { id } => write!(f, "work node {id} missing"),
            FiberError::KindMismatch { id, expected } => {
                write!(f, "work node {id} kind mismatch; expected {expected}")
            }
        }
    }
}

impl std::error::Error for FiberError {}

/// Usage errors raised by the stateful-unit registry.
///
/// Both variants mean the component broke the positional-hooks contract:
/// the number, order, and types of `use_state` calls must be identical
/// between the mount render and every later render of the same unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookError {
    CountMismatch { previous: usize, index: usize },
    TypeMismatch { index: usize, expected: &'static str },
}

impl std::fmt::Display for HookError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookError::CountMismatch { previous, index } => write!(
                f,
                "state cell {index} requested but previous render produced {previous} cells"
            ),
            HookError::TypeMismatch { index, expected } => {
                write!(f, "state cell {index} type mismatch; expected {expected}")
            }
        }
    }
}

impl std::error::Error for HookError {}

/// Any failure that aborts a render or commit pass.
///
/// The live tree and the committed host tree are untouched by a failed
/// pass; the in-progress tree is discarded and the error is surfaced to
/// whoever requested the pass.
#[derive(Debug, Clone)]
pub enum RenderError {
    Fiber(FiberError),
    Hook(HookError),
    Host(HostError),
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Fiber(err) => write!(f, "render pass failed: {err}"),
            RenderError::Hook(err) => write!(f, "render pass failed: {err}"),
            RenderError::Host(err) => write!(f, "render pass failed: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Fiber(err) => Some(err),
            RenderError::Hook(err) => Some(err),
            RenderError::Host(err) => Some(err),
        }
    }
}

impl From<FiberError> for RenderError {
    fn from(err: FiberError) -> Self {
        RenderError::Fiber(err)
    }
}

impl From<HookError> for RenderError {
    fn from(err: HookError) -> Self {
        RenderError::Hook(err)
    }
}

impl From<HostError> for RenderError {
    fn from(err: HostError) -> Self {
        RenderError::Host(err)
    }
}
