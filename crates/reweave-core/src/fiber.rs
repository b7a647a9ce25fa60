//! Work nodes and the double-buffered tree they form.
//!
//! One [`WorkNode`] exists per rendered tree position, twice at most: the
//! live instance and its in-progress counterpart, cross-linked through
//! `alternate`. All nodes live in a [`FiberArena`]; tree links are plain
//! [`FiberId`] indices, so ownership stays with the arena and the upward
//! `parent` references never form an ownership cycle.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::element::{Element, ElementKind, Props};
use crate::hooks::HookCell;
use crate::host::HostId;
use crate::update_queue::UpdateQueue;
use crate::{FiberError, Key};

bitflags::bitflags! {
    /// Side-effect markers accumulated during the render phase and applied
    /// (then cleared) during commit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EffectFlags: u8 {
        const PLACEMENT = 1 << 0;
        const UPDATE = 1 << 1;
        const CHILD_DELETION = 1 << 2;
    }
}

/// Flags that require commit-phase work on the host tree.
pub const MUTATION_MASK: EffectFlags = EffectFlags::all();

/// Category of a work node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    Root,
    HostElement,
    HostText,
    FunctionalUnit,
}

/// State committed on the root's queue: the mounted element tree.
pub type RootState = Option<Element>;

/// Committed state of a work node, shaped by its kind.
#[derive(Default)]
pub enum NodeState {
    #[default]
    None,
    /// Root: the element tree mounted into the container.
    Element(RootState),
    /// Functional unit: its ordered state cells.
    Hooks(Vec<HookCell>),
}

impl NodeState {
    fn replicate(&self) -> NodeState {
        match self {
            NodeState::None => NodeState::None,
            NodeState::Element(element) => NodeState::Element(element.clone()),
            NodeState::Hooks(cells) => NodeState::Hooks(cells.clone()),
        }
    }

    pub fn hook_cells(&self) -> Option<&[HookCell]> {
        match self {
            NodeState::Hooks(cells) => Some(cells),
            _ => None,
        }
    }
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::None => f.write_str("None"),
            NodeState::Element(element) => f.debug_tuple("Element").field(&element.is_some()).finish(),
            NodeState::Hooks(cells) => f.debug_tuple("Hooks").field(&cells.len()).finish(),
        }
    }
}

/// Index of a work node in its [`FiberArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(usize);

impl FiberId {
    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for FiberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One persistent node of the internal render tree.
pub struct WorkNode {
    pub kind: WorkKind,
    /// What this node renders; `None` only for the root.
    pub element: Option<ElementKind>,
    pub key: Option<Key>,
    pub pending_props: Props,
    pub memoized_props: Option<Props>,
    pub memoized_state: NodeState,
    /// Present on the root; stateful units keep queues inside their cells.
    pub update_queue: Option<Rc<RefCell<UpdateQueue<RootState>>>>,
    pub host_instance: Option<HostId>,
    pub parent: Option<FiberId>,
    pub first_child: Option<FiberId>,
    pub next_sibling: Option<FiberId>,
    pub child_index: usize,
    /// Cross-link to this position's other buffer, if one exists.
    pub alternate: Option<FiberId>,
    pub flags: EffectFlags,
    pub subtree_flags: EffectFlags,
    /// Live children removed this pass, consumed by the commit phase.
    pub pending_deletions: SmallVec<[FiberId; 4]>,
}

impl WorkNode {
    pub fn new(kind: WorkKind, pending_props: Props, key: Option<Key>) -> Self {
        Self {
            kind,
            element: None,
            key,
            pending_props,
            memoized_props: None,
            memoized_state: NodeState::None,
            update_queue: None,
            host_instance: None,
            parent: None,
            first_child: None,
            next_sibling: None,
            child_index: 0,
            alternate: None,
            flags: EffectFlags::empty(),
            subtree_flags: EffectFlags::empty(),
            pending_deletions: SmallVec::new(),
        }
    }

    /// Build a fresh node from a tree description.
    pub fn from_element(element: &Element) -> Self {
        let kind = match element.kind() {
            ElementKind::Host(_) => WorkKind::HostElement,
            ElementKind::Text => WorkKind::HostText,
            ElementKind::Component(_) => WorkKind::FunctionalUnit,
        };
        let mut node = Self::new(kind, element.props().clone(), element.key());
        node.element = Some(element.kind().clone());
        node
    }

    /// Whether this node owns a position in the host tree.
    pub fn is_host_bearing(&self) -> bool {
        matches!(self.kind, WorkKind::HostElement | WorkKind::HostText)
    }

    /// Whether a description can reuse this node's position.
    pub fn matches_element(&self, element: &Element) -> bool {
        if self.key != element.key() {
            return false;
        }
        match &self.element {
            Some(kind) => kind.same_identity(element.kind()),
            None => false,
        }
    }
}

impl fmt::Debug for WorkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkNode")
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("flags", &self.flags)
            .field("subtree_flags", &self.subtree_flags)
            .field("host_instance", &self.host_instance)
            .field("alternate", &self.alternate)
            .finish()
    }
}

/// Owning store for every work node of one root, live and in-progress.
#[derive(Default)]
pub struct FiberArena {
    nodes: Vec<Option<WorkNode>>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: WorkNode) -> FiberId {
        let id = FiberId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    pub fn get(&self, id: FiberId) -> Result<&WorkNode, FiberError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(FiberError::Missing { id })
    }

    pub fn get_mut(&mut self, id: FiberId) -> Result<&mut WorkNode, FiberError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(FiberError::Missing { id })
    }

    /// Release one node's slot. Tree links into the slot must already be
    /// severed.
    pub fn free(&mut self, id: FiberId) {
        if let Some(slot) = self.nodes.get_mut(id.0) {
            slot.take();
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of a node's children in sibling order.
    pub fn children_of(&self, id: FiberId) -> Result<Vec<FiberId>, FiberError> {
        let mut out = Vec::new();
        let mut cursor = self.get(id)?.first_child;
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.get(child)?.next_sibling;
        }
        Ok(out)
    }

    /// Produce or refresh the in-progress counterpart of a live node.
    ///
    /// On first use a new node is allocated, copying `kind`/`element`/
    /// `key`/`host_instance`, and the two are cross-linked; afterwards the
    /// existing alternate is reused with the new pending props. Either
    /// way the counterpart starts as a structural clone of the live node
    /// with cleared effect state, so the diff only records real changes.
    pub fn create_or_reuse_in_progress(
        &mut self,
        live: FiberId,
        pending_props: Props,
    ) -> Result<FiberId, FiberError> {
        let in_progress = match self.get(live)?.alternate {
            Some(existing) => {
                let node = self.get_mut(existing)?;
                node.pending_props = pending_props;
                existing
            }
            None => {
                let source = self.get(live)?;
                let mut node = WorkNode::new(source.kind, pending_props, source.key);
                node.element = source.element.clone();
                node.host_instance = source.host_instance;
                node.alternate = Some(live);
                let id = self.insert(node);
                self.get_mut(live)?.alternate = Some(id);
                id
            }
        };

        let (queue, first_child, memoized_props, memoized_state, child_index) = {
            let source = self.get(live)?;
            (
                source.update_queue.clone(),
                source.first_child,
                source.memoized_props.clone(),
                source.memoized_state.replicate(),
                source.child_index,
            )
        };
        let node = self.get_mut(in_progress)?;
        node.flags = EffectFlags::empty();
        node.subtree_flags = EffectFlags::empty();
        node.pending_deletions.clear();
        node.update_queue = queue;
        node.first_child = first_child;
        node.memoized_props = memoized_props;
        node.memoized_state = memoized_state;
        node.child_index = child_index;
        Ok(in_progress)
    }

    /// Drop an aborted in-progress tree.
    ///
    /// Frees nodes allocated for this pass and clears effect state on
    /// reused alternates, leaving the live tree and all cross-links exactly
    /// as they were before the pass began. Children are only followed when
    /// they point back at the in-progress parent; a `first_child` still
    /// copied from the live buffer leads into the live tree and must not
    /// be walked.
    pub fn discard_in_progress(&mut self, root: FiberId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.get(id) else { continue };
            let fresh = node.alternate.is_none();
            let mut cursor = node.first_child;
            while let Some(child) = cursor {
                let Ok(child_node) = self.get(child) else { break };
                if child_node.parent != Some(id) {
                    break;
                }
                stack.push(child);
                cursor = child_node.next_sibling;
            }
            if fresh && id != root {
                self.free(id);
            } else if let Ok(node) = self.get_mut(id) {
                node.flags = EffectFlags::empty();
                node.subtree_flags = EffectFlags::empty();
                node.pending_deletions.clear();
            }
        }
    }

    /// Release a deleted subtree's slots, including stale alternates.
    pub fn free_subtree(&mut self, root: FiberId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.get(id) else { continue };
            let alternate = node.alternate;
            let mut cursor = node.first_child;
            while let Some(child) = cursor {
                stack.push(child);
                cursor = match self.get(child) {
                    Ok(c) => c.next_sibling,
                    Err(_) => None,
                };
            }
            if let Some(alt) = alternate {
                if let Ok(alt_node) = self.get_mut(alt) {
                    alt_node.alternate = None;
                }
                self.free(alt);
            }
            self.free(id);
        }
    }
}

impl fmt::Debug for FiberArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiberArena")
            .field("live_nodes", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_text(arena: &mut FiberArena) -> FiberId {
        let element = Element::text("hello");
        arena.insert(WorkNode::from_element(&element))
    }

    #[test]
    fn first_in_progress_allocates_and_cross_links() {
        let mut arena = FiberArena::new();
        let live = live_text(&mut arena);
        let wip = arena
            .create_or_reuse_in_progress(live, Props::new().text("hello"))
            .unwrap();

        assert_ne!(live, wip);
        assert_eq!(arena.get(live).unwrap().alternate, Some(wip));
        assert_eq!(arena.get(wip).unwrap().alternate, Some(live));
        assert_eq!(arena.get(wip).unwrap().kind, WorkKind::HostText);
    }

    #[test]
    fn second_pass_reuses_the_same_alternate() {
        let mut arena = FiberArena::new();
        let live = live_text(&mut arena);
        let first = arena
            .create_or_reuse_in_progress(live, Props::new())
            .unwrap();
        let second = arena
            .create_or_reuse_in_progress(live, Props::new().text("again"))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(arena.len(), 2);
        assert_eq!(
            arena.get(second).unwrap().pending_props.text_content(),
            Some("again")
        );
    }

    #[test]
    fn reuse_clears_effect_state_and_copies_committed_fields() {
        let mut arena = FiberArena::new();
        let live = live_text(&mut arena);
        {
            let node = arena.get_mut(live).unwrap();
            node.memoized_props = Some(Props::new().text("hello"));
        }
        let wip = arena
            .create_or_reuse_in_progress(live, Props::new())
            .unwrap();
        {
            let node = arena.get_mut(wip).unwrap();
            node.flags |= EffectFlags::PLACEMENT;
            node.subtree_flags |= EffectFlags::UPDATE;
            node.pending_deletions.push(live);
        }

        let again = arena
            .create_or_reuse_in_progress(live, Props::new())
            .unwrap();
        let node = arena.get(again).unwrap();
        assert!(node.flags.is_empty());
        assert!(node.subtree_flags.is_empty());
        assert!(node.pending_deletions.is_empty());
        assert_eq!(
            node.memoized_props.as_ref().and_then(|p| p.text_content()),
            Some("hello")
        );
    }

    #[test]
    fn free_subtree_releases_alternates_too() {
        let mut arena = FiberArena::new();
        let live = live_text(&mut arena);
        let wip = arena
            .create_or_reuse_in_progress(live, Props::new())
            .unwrap();
        assert_eq!(arena.len(), 2);

        arena.free_subtree(live);
        assert_eq!(arena.len(), 0);
        assert!(arena.get(live).is_err());
        assert!(arena.get(wip).is_err());
    }

    #[test]
    fn matches_element_requires_kind_and_key() {
        let mut arena = FiberArena::new();
        let keyed = Element::host("li", Props::new()).keyed("1");
        let id = arena.insert(WorkNode::from_element(&keyed));
        let node = arena.get(id).unwrap();

        assert!(node.matches_element(&Element::host("li", Props::new()).keyed("1")));
        assert!(!node.matches_element(&Element::host("li", Props::new()).keyed("2")));
        assert!(!node.matches_element(&Element::host("ul", Props::new()).keyed("1")));
    }
}
