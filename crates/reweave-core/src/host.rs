//! Host-environment adapter contract and the in-memory reference host.
//!
//! The reconciler only ever talks to the host tree through [`HostAdapter`];
//! everything it needs is covered by instance creation, attachment,
//! text/props updates, detachment, and delegated-listener registration.
//! Attachment operations have move semantics: appending or inserting a
//! handle that is already attached relocates it, so re-applying a placement
//! is not an error.

use std::fmt;

use crate::collections::map::HashSet;
use crate::element::Props;

/// Opaque handle into the host tree, minted by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostId(usize);

impl HostId {
    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors surfaced by host-adapter operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    Missing { id: HostId },
    TypeMismatch { id: HostId, expected: &'static str },
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::Missing { id } => write!(f, "host node {id} missing"),
            HostError::TypeMismatch { id, expected } => {
                write!(f, "host node {id} type mismatch; expected {expected}")
            }
        }
    }
}

impl std::error::Error for HostError {}

/// The synchronous host-tree operations consumed by the reconciler.
pub trait HostAdapter {
    /// Create a detached host element.
    fn create_element_instance(&mut self, kind: &str, props: &Props) -> Result<HostId, HostError>;

    /// Create a detached text node.
    fn create_text_instance(&mut self, content: &str) -> Result<HostId, HostError>;

    /// Attach a child while its parent subtree is still being built, before
    /// the parent itself is attached anywhere.
    fn append_initial_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError>;

    /// Attach an already-built subtree at the end of a live location.
    fn append_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError>;

    /// Attach an already-built subtree immediately before `before`.
    fn insert_before(
        &mut self,
        parent: HostId,
        child: HostId,
        before: HostId,
    ) -> Result<(), HostError>;

    /// Replace a text node's content in place.
    fn update_text_content(&mut self, node: HostId, content: &str) -> Result<(), HostError>;

    /// Refresh the props bag attached to a host element, keeping the
    /// delegation layer's view of handlers current.
    fn update_element_props(&mut self, node: HostId, props: &Props) -> Result<(), HostError>;

    /// Detach a child from its parent. The adapter is not required to
    /// recurse; everything beneath the child leaves the tree with it.
    fn remove_child(&mut self, child: HostId, parent: HostId) -> Result<(), HostError>;

    /// Register the single delegated listener for an event category at the
    /// container boundary.
    fn add_native_listener(&mut self, container: HostId, category: &str)
        -> Result<(), HostError>;
}

enum MemoryNodeKind {
    Container { listeners: HashSet<String> },
    Element { tag: String, props: Props },
    Text { content: String },
}

struct MemoryNode {
    kind: MemoryNodeKind,
    parent: Option<HostId>,
    children: Vec<HostId>,
}

/// In-memory host tree used by tests and headless harnesses.
///
/// Every mutating operation is appended to an op log so tests can assert
/// not just on the final shape but on whether the commit phase touched the
/// tree at all.
#[derive(Default)]
pub struct MemoryHost {
    nodes: Vec<Option<MemoryNode>>,
    ops: Vec<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root container node for a [`crate::runtime::RenderRoot`].
    pub fn create_container(&mut self) -> HostId {
        self.insert(MemoryNodeKind::Container {
            listeners: HashSet::new(),
        })
    }

    pub fn parent(&self, id: HostId) -> Option<HostId> {
        self.node(id).ok().and_then(|node| node.parent)
    }

    pub fn child_ids(&self, id: HostId) -> Vec<HostId> {
        self.node(id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn tag(&self, id: HostId) -> Option<&str> {
        match self.node(id).ok()?.kind {
            MemoryNodeKind::Element { ref tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn text(&self, id: HostId) -> Option<&str> {
        match self.node(id).ok()?.kind {
            MemoryNodeKind::Text { ref content } => Some(content),
            _ => None,
        }
    }

    /// Props bag last committed to a host element.
    pub fn props(&self, id: HostId) -> Option<Props> {
        match self.node(id).ok()?.kind {
            MemoryNodeKind::Element { ref props, .. } => Some(props.clone()),
            _ => None,
        }
    }

    pub fn listeners(&self, container: HostId) -> Vec<String> {
        match self.node(container).ok().map(|node| &node.kind) {
            Some(MemoryNodeKind::Container { listeners }) => {
                let mut out: Vec<String> = listeners.iter().cloned().collect();
                out.sort();
                out
            }
            _ => Vec::new(),
        }
    }

    pub fn contains(&self, id: HostId) -> bool {
        self.node(id).is_ok()
    }

    /// Drain the mutation log accumulated since the last call.
    pub fn take_ops(&mut self) -> Vec<String> {
        std::mem::take(&mut self.ops)
    }

    pub fn dump_tree(&self, root: HostId) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, root, 0);
        out
    }

    fn dump_node(&self, out: &mut String, id: HostId, depth: usize) {
        let indent = "  ".repeat(depth);
        match self.node(id) {
            Ok(node) => {
                let label = match &node.kind {
                    MemoryNodeKind::Container { .. } => "#container".to_string(),
                    MemoryNodeKind::Element { tag, .. } => format!("<{tag}>"),
                    MemoryNodeKind::Text { content } => format!("{content:?}"),
                };
                out.push_str(&format!("{indent}[{id}] {label}\n"));
                for child in &node.children {
                    self.dump_node(out, *child, depth + 1);
                }
            }
            Err(_) => out.push_str(&format!("{indent}[{id}] (missing)\n")),
        }
    }

    fn insert(&mut self, kind: MemoryNodeKind) -> HostId {
        let id = HostId(self.nodes.len());
        self.nodes.push(Some(MemoryNode {
            kind,
            parent: None,
            children: Vec::new(),
        }));
        id
    }

    fn node(&self, id: HostId) -> Result<&MemoryNode, HostError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(HostError::Missing { id })
    }

    fn node_mut(&mut self, id: HostId) -> Result<&mut MemoryNode, HostError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(HostError::Missing { id })
    }

    /// Detach `child` from its current parent, if it has one.
    fn detach(&mut self, child: HostId) -> Result<(), HostError> {
        let Some(old_parent) = self.node(child)?.parent else {
            return Ok(());
        };
        let parent = self.node_mut(old_parent)?;
        parent.children.retain(|c| *c != child);
        self.node_mut(child)?.parent = None;
        Ok(())
    }

    fn attach(&mut self, parent: HostId, child: HostId, index: Option<usize>) -> Result<(), HostError> {
        self.node(parent)?;
        self.detach(child)?;
        let parent_node = self.node_mut(parent)?;
        match index {
            Some(i) => parent_node.children.insert(i, child),
            None => parent_node.children.push(child),
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn drop_subtree(&mut self, id: HostId) {
        let children = self
            .nodes
            .get_mut(id.0)
            .and_then(Option::take)
            .map(|node| node.children)
            .unwrap_or_default();
        for child in children {
            self.drop_subtree(child);
        }
    }
}

impl HostAdapter for MemoryHost {
    fn create_element_instance(&mut self, kind: &str, props: &Props) -> Result<HostId, HostError> {
        let id = self.insert(MemoryNodeKind::Element {
            tag: kind.to_string(),
            props: props.clone(),
        });
        self.ops.push(format!("create_element {kind} -> {id}"));
        Ok(id)
    }

    fn create_text_instance(&mut self, content: &str) -> Result<HostId, HostError> {
        let id = self.insert(MemoryNodeKind::Text {
            content: content.to_string(),
        });
        self.ops.push(format!("create_text {content:?} -> {id}"));
        Ok(id)
    }

    fn append_initial_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError> {
        self.attach(parent, child, None)?;
        self.ops.push(format!("append_initial {child} -> {parent}"));
        Ok(())
    }

    fn append_child(&mut self, parent: HostId, child: HostId) -> Result<(), HostError> {
        self.attach(parent, child, None)?;
        self.ops.push(format!("append {child} -> {parent}"));
        Ok(())
    }

    fn insert_before(
        &mut self,
        parent: HostId,
        child: HostId,
        before: HostId,
    ) -> Result<(), HostError> {
        // Resolve the anchor after detaching: the child may precede it.
        self.node(parent)?;
        self.detach(child)?;
        let index = self
            .node(parent)?
            .children
            .iter()
            .position(|c| *c == before)
            .ok_or(HostError::Missing { id: before })?;
        self.attach(parent, child, Some(index))?;
        self.ops
            .push(format!("insert {child} -> {parent} before {before}"));
        Ok(())
    }

    fn update_text_content(&mut self, node: HostId, content: &str) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Text { content: existing } => {
                *existing = content.to_string();
                self.ops.push(format!("update_text {node} {content:?}"));
                Ok(())
            }
            _ => Err(HostError::TypeMismatch {
                id: node,
                expected: "text",
            }),
        }
    }

    fn update_element_props(&mut self, node: HostId, props: &Props) -> Result<(), HostError> {
        match &mut self.node_mut(node)?.kind {
            MemoryNodeKind::Element { props: existing, .. } => {
                *existing = props.clone();
                self.ops.push(format!("update_props {node}"));
                Ok(())
            }
            _ => Err(HostError::TypeMismatch {
                id: node,
                expected: "element",
            }),
        }
    }

    fn remove_child(&mut self, child: HostId, parent: HostId) -> Result<(), HostError> {
        let children = &self.node(parent)?.children;
        if !children.contains(&child) {
            return Err(HostError::Missing { id: child });
        }
        self.node_mut(parent)?.children.retain(|c| *c != child);
        self.drop_subtree(child);
        self.ops.push(format!("remove {child} from {parent}"));
        Ok(())
    }

    fn add_native_listener(
        &mut self,
        container: HostId,
        category: &str,
    ) -> Result<(), HostError> {
        match &mut self.node_mut(container)?.kind {
            MemoryNodeKind::Container { listeners } => {
                listeners.insert(category.to_string());
                self.ops.push(format!("listen {category} on {container}"));
                Ok(())
            }
            _ => Err(HostError::TypeMismatch {
                id: container,
                expected: "container",
            }),
        }
    }
}

impl fmt::Debug for MemoryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHost")
            .field("nodes", &self.nodes.iter().filter(|n| n.is_some()).count())
            .field("ops", &self.ops.len())
            .finish()
    }
}
