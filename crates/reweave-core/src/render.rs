//! Render phase: the begin/complete walk that builds the in-progress tree.
//!
//! "Begin" descends depth-first, diffing each node's desired children
//! against the live tree and producing or reusing work nodes; "complete"
//! ascends, creating host instances for new host nodes, recording update
//! flags for existing ones, and bubbling effect flags so commit can skip
//! clean subtrees without rescanning them. Nothing in this phase touches
//! the committed host tree; new host instances stay detached until commit.

use std::rc::Rc;

use crate::element::{Element, ElementKind};
use crate::fiber::{EffectFlags, FiberArena, FiberId, NodeState, WorkKind, WorkNode};
use crate::hooks::Scope;
use crate::host::HostAdapter;
use crate::update_queue::process;
use crate::{FiberError, RenderError};

/// One render pass over a single root's dual tree.
pub(crate) struct RenderPass<'a> {
    pub arena: &'a mut FiberArena,
    pub host: &'a mut dyn HostAdapter,
    /// Re-entry point handed to dispatch closures minted this pass.
    pub schedule: Rc<dyn Fn()>,
}

impl RenderPass<'_> {
    /// Drive begin/complete to completion over the in-progress tree.
    pub fn run(&mut self, root: FiberId) -> Result<(), RenderError> {
        let mut next = Some(root);
        while let Some(unit) = next {
            let child = self.begin_work(unit)?;
            {
                let node = self.arena.get_mut(unit)?;
                let committed = node.pending_props.clone();
                node.memoized_props = Some(committed);
            }
            next = match child {
                Some(child) => Some(child),
                None => self.complete_unit(unit)?,
            };
        }
        Ok(())
    }

    /// Diff one node against the live tree, returning its first child to
    /// descend into.
    fn begin_work(&mut self, wip: FiberId) -> Result<Option<FiberId>, RenderError> {
        match self.arena.get(wip)?.kind {
            WorkKind::Root => self.update_root(wip),
            WorkKind::HostElement => self.update_host_element(wip),
            WorkKind::HostText => Ok(None),
            WorkKind::FunctionalUnit => self.update_functional_unit(wip),
        }
    }

    fn update_root(&mut self, wip: FiberId) -> Result<Option<FiberId>, RenderError> {
        let queue = self
            .arena
            .get(wip)?
            .update_queue
            .clone()
            .ok_or(FiberError::KindMismatch {
                id: wip,
                expected: "root with update queue",
            })?;
        let base = match &self.arena.get(wip)?.memoized_state {
            NodeState::Element(element) => element.clone(),
            _ => None,
        };
        let pending = queue.borrow_mut().take();
        let mounted = process(base, pending);
        self.arena.get_mut(wip)?.memoized_state = NodeState::Element(mounted.clone());

        match mounted {
            Some(element) => self.reconcile_children(wip, std::slice::from_ref(&element)),
            None => self.reconcile_children(wip, &[]),
        }
    }

    fn update_host_element(&mut self, wip: FiberId) -> Result<Option<FiberId>, RenderError> {
        let children = self.arena.get(wip)?.pending_props.child_list().to_vec();
        self.reconcile_children(wip, &children)
    }

    fn update_functional_unit(&mut self, wip: FiberId) -> Result<Option<FiberId>, RenderError> {
        let component = match &self.arena.get(wip)?.element {
            Some(ElementKind::Component(component)) => component.clone(),
            _ => {
                return Err(FiberError::KindMismatch {
                    id: wip,
                    expected: "functional unit",
                }
                .into())
            }
        };
        // Previous cells come from the live counterpart; a first render has
        // none and mounts fresh cells.
        let prev_cells = match self.arena.get(wip)?.alternate {
            Some(live) => self
                .arena
                .get(live)?
                .memoized_state
                .hook_cells()
                .map(|cells| cells.to_vec()),
            None => None,
        };
        let props = self.arena.get(wip)?.pending_props.clone();

        let mut scope = Scope::new(prev_cells, Rc::clone(&self.schedule));
        let child = component.render(&mut scope, &props)?;
        self.arena.get_mut(wip)?.memoized_state = NodeState::Hooks(scope.finish());

        self.reconcile_children(wip, std::slice::from_ref(&child))
    }

    /// Positionally match the live child list against the new descriptions.
    ///
    /// Index by index: a kind+key match reuses the live node's alternate
    /// with fresh props; a mismatch queues the live child for deletion and
    /// mounts a placement-flagged replacement. Trailing live children are
    /// deleted, trailing descriptions mounted. Keyed reordering beyond
    /// positional matching is a documented extension point, not handled
    /// here.
    fn reconcile_children(
        &mut self,
        wip: FiberId,
        descriptions: &[Element],
    ) -> Result<Option<FiberId>, RenderError> {
        let mut old_child = match self.arena.get(wip)?.alternate {
            Some(live) => self.arena.get(live)?.first_child,
            None => None,
        };

        let mut first: Option<FiberId> = None;
        let mut previous: Option<FiberId> = None;
        for (index, description) in descriptions.iter().enumerate() {
            let child = match old_child {
                Some(old) => {
                    if self.arena.get(old)?.matches_element(description) {
                        self.arena
                            .create_or_reuse_in_progress(old, description.props().clone())?
                    } else {
                        self.delete_child(wip, old)?;
                        self.mount_child(description)?
                    }
                }
                None => self.mount_child(description)?,
            };
            if let Some(old) = old_child {
                old_child = self.arena.get(old)?.next_sibling;
            }

            {
                let node = self.arena.get_mut(child)?;
                node.parent = Some(wip);
                node.child_index = index;
                node.next_sibling = None;
            }
            match previous {
                None => first = Some(child),
                Some(prev) => self.arena.get_mut(prev)?.next_sibling = Some(child),
            }
            previous = Some(child);
        }

        // Live children with no counterpart in the new description.
        while let Some(old) = old_child {
            let next = self.arena.get(old)?.next_sibling;
            self.delete_child(wip, old)?;
            old_child = next;
        }

        self.arena.get_mut(wip)?.first_child = first;
        Ok(first)
    }

    fn mount_child(&mut self, description: &Element) -> Result<FiberId, RenderError> {
        let mut node = WorkNode::from_element(description);
        node.flags |= EffectFlags::PLACEMENT;
        Ok(self.arena.insert(node))
    }

    fn delete_child(&mut self, wip: FiberId, child: FiberId) -> Result<(), RenderError> {
        let parent = self.arena.get_mut(wip)?;
        parent.pending_deletions.push(child);
        parent.flags |= EffectFlags::CHILD_DELETION;
        Ok(())
    }

    /// Complete a finished node, then its ancestors, until a sibling opens
    /// a new begin branch.
    fn complete_unit(&mut self, fiber: FiberId) -> Result<Option<FiberId>, RenderError> {
        let mut node = fiber;
        loop {
            self.complete_work(node)?;
            let current = self.arena.get(node)?;
            if let Some(sibling) = current.next_sibling {
                return Ok(Some(sibling));
            }
            match current.parent {
                Some(parent) => node = parent,
                None => return Ok(None),
            }
        }
    }

    fn complete_work(&mut self, wip: FiberId) -> Result<(), RenderError> {
        match self.arena.get(wip)?.kind {
            WorkKind::Root | WorkKind::FunctionalUnit => {}
            WorkKind::HostElement => {
                let has_live_instance = {
                    let node = self.arena.get(wip)?;
                    node.alternate.is_some() && node.host_instance.is_some()
                };
                if has_live_instance {
                    self.mark_host_update(wip, "element")?;
                } else {
                    let (tag, props) = {
                        let node = self.arena.get(wip)?;
                        let tag = match &node.element {
                            Some(ElementKind::Host(tag)) => tag.clone(),
                            _ => {
                                return Err(FiberError::KindMismatch {
                                    id: wip,
                                    expected: "host element",
                                }
                                .into())
                            }
                        };
                        (tag, node.pending_props.clone())
                    };
                    let instance = self.host.create_element_instance(&tag, &props)?;
                    self.arena.get_mut(wip)?.host_instance = Some(instance);
                    self.append_all_children(instance, wip)?;
                }
            }
            WorkKind::HostText => {
                let has_live_instance = {
                    let node = self.arena.get(wip)?;
                    node.alternate.is_some() && node.host_instance.is_some()
                };
                if has_live_instance {
                    self.mark_host_update(wip, "text")?;
                } else {
                    let content = self
                        .arena
                        .get(wip)?
                        .pending_props
                        .text_content()
                        .unwrap_or_default()
                        .to_string();
                    let instance = self.host.create_text_instance(&content)?;
                    self.arena.get_mut(wip)?.host_instance = Some(instance);
                }
            }
        }
        self.bubble_flags(wip)
    }

    /// Record an `UPDATE` flag when the committed props differ from this
    /// pass's props; the new props themselves are the diff metadata the
    /// commit phase reads.
    fn mark_host_update(&mut self, wip: FiberId, what: &'static str) -> Result<(), RenderError> {
        let changed = {
            let node = self.arena.get(wip)?;
            let live = node.alternate.ok_or(FiberError::Missing { id: wip })?;
            let previous = &self.arena.get(live)?.memoized_props;
            match previous {
                Some(previous) => !previous.host_props_eq(&node.pending_props),
                None => true,
            }
        };
        if changed {
            log::trace!("marking {what} update on node {wip}");
            self.arena.get_mut(wip)?.flags |= EffectFlags::UPDATE;
        }
        Ok(())
    }

    /// Attach every host-bearing descendant to a freshly created instance,
    /// skipping over non-host intermediates, so the subtree is fully
    /// connected before its own parent ever attaches it.
    fn append_all_children(&mut self, parent: crate::host::HostId, wip: FiberId) -> Result<(), RenderError> {
        let mut cursor = self.arena.get(wip)?.first_child;
        while let Some(id) = cursor {
            let node = self.arena.get(id)?;
            if node.is_host_bearing() {
                let instance = node.host_instance.ok_or(FiberError::Missing { id })?;
                self.host.append_initial_child(parent, instance)?;
            } else if let Some(child) = node.first_child {
                cursor = Some(child);
                continue;
            }

            let mut current = id;
            loop {
                if current == wip {
                    return Ok(());
                }
                let node = self.arena.get(current)?;
                if let Some(sibling) = node.next_sibling {
                    cursor = Some(sibling);
                    break;
                }
                match node.parent {
                    Some(parent_fiber) if parent_fiber != wip => current = parent_fiber,
                    _ => return Ok(()),
                }
            }
        }
        Ok(())
    }

    /// Union the children's own and subtree flags into this node, the O(1)
    /// ledger the commit walk consults before descending.
    fn bubble_flags(&mut self, wip: FiberId) -> Result<(), RenderError> {
        let mut subtree = EffectFlags::empty();
        let mut cursor = self.arena.get(wip)?.first_child;
        while let Some(child) = cursor {
            let node = self.arena.get_mut(child)?;
            subtree |= node.flags;
            subtree |= node.subtree_flags;
            node.parent = Some(wip);
            cursor = node.next_sibling;
        }
        self.arena.get_mut(wip)?.subtree_flags |= subtree;
        Ok(())
    }
}
