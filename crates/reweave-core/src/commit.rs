//! Commit phase: applying accumulated effect flags to the host tree.
//!
//! A single pointer-chasing walk descends only while a node's
//! `subtree_flags` show qualifying work below, then applies each node's own
//! flags in fixed order (placement, update, child deletion), clearing every
//! bit as it is consumed. This is the only code that mutates the committed
//! host tree.

use crate::fiber::{EffectFlags, FiberArena, FiberId, WorkKind, MUTATION_MASK};
use crate::host::{HostAdapter, HostId};
use crate::{FiberError, RenderError};

/// Apply every mutation flagged in the finished tree.
pub(crate) fn commit_mutation_effects(
    arena: &mut FiberArena,
    host: &mut dyn HostAdapter,
    container: HostId,
    finished: FiberId,
) -> Result<(), RenderError> {
    let mut next_effect = Some(finished);
    while let Some(current) = next_effect {
        let node = arena.get(current)?;
        let child = node.first_child;
        if node.subtree_flags.intersects(MUTATION_MASK) && child.is_some() {
            next_effect = child;
            continue;
        }

        // Nothing qualifying below: apply this node's effects, then move to
        // a sibling or keep ascending, applying along the way.
        let mut cursor = current;
        loop {
            commit_effects_on_node(arena, host, container, cursor)?;
            if let Some(sibling) = arena.get(cursor)?.next_sibling {
                next_effect = Some(sibling);
                break;
            }
            match arena.get(cursor)?.parent {
                Some(parent) => cursor = parent,
                None => {
                    next_effect = None;
                    break;
                }
            }
        }
    }
    Ok(())
}

fn commit_effects_on_node(
    arena: &mut FiberArena,
    host: &mut dyn HostAdapter,
    container: HostId,
    id: FiberId,
) -> Result<(), RenderError> {
    let flags = arena.get(id)?.flags;
    if flags.contains(EffectFlags::PLACEMENT) {
        commit_placement(arena, host, container, id)?;
        arena.get_mut(id)?.flags.remove(EffectFlags::PLACEMENT);
    }
    if flags.contains(EffectFlags::UPDATE) {
        commit_update(arena, host, id)?;
        arena.get_mut(id)?.flags.remove(EffectFlags::UPDATE);
    }
    if flags.contains(EffectFlags::CHILD_DELETION) {
        commit_deletions(arena, host, container, id)?;
        arena.get_mut(id)?.flags.remove(EffectFlags::CHILD_DELETION);
    }
    Ok(())
}

/// Attach a node's host subtree at its committed position.
fn commit_placement(
    arena: &FiberArena,
    host: &mut dyn HostAdapter,
    container: HostId,
    id: FiberId,
) -> Result<(), RenderError> {
    log::trace!("commit placement for node {id}");
    let Some(parent_instance) = host_parent_of(arena, container, id)? else {
        log::warn!("placement of node {id} found no host parent; skipping");
        return Ok(());
    };
    let before = host_sibling_of(arena, id)?;
    place_node(arena, host, id, parent_instance, before)
}

/// Nearest ancestor owning a host instance, or the root container.
fn host_parent_of(
    arena: &FiberArena,
    container: HostId,
    id: FiberId,
) -> Result<Option<HostId>, FiberError> {
    let mut cursor = arena.get(id)?.parent;
    while let Some(parent) = cursor {
        let node = arena.get(parent)?;
        match node.kind {
            WorkKind::HostElement => {
                return Ok(Some(node.host_instance.ok_or(FiberError::Missing { id: parent })?))
            }
            WorkKind::Root => return Ok(Some(container)),
            _ => cursor = node.parent,
        }
    }
    Ok(None)
}

/// The nearest following stable host node in document order, if any.
///
/// Walks sibling/parent chains, skipping subtrees that are themselves
/// placement-flagged or hold no resolvable host descendant; an anchor that
/// is itself being placed cannot serve as an insertion point.
fn host_sibling_of(arena: &FiberArena, id: FiberId) -> Result<Option<HostId>, FiberError> {
    let mut node = id;
    'siblings: loop {
        while arena.get(node)?.next_sibling.is_none() {
            match arena.get(node)?.parent {
                None => return Ok(None),
                Some(parent) => {
                    if matches!(arena.get(parent)?.kind, WorkKind::HostElement | WorkKind::Root) {
                        return Ok(None);
                    }
                    node = parent;
                }
            }
        }
        node = arena.get(node)?.next_sibling.ok_or(FiberError::Missing { id: node })?;

        while !arena.get(node)?.is_host_bearing() {
            let candidate = arena.get(node)?;
            if candidate.flags.contains(EffectFlags::PLACEMENT) {
                continue 'siblings;
            }
            match candidate.first_child {
                None => continue 'siblings,
                Some(child) => node = child,
            }
        }

        let candidate = arena.get(node)?;
        if !candidate.flags.contains(EffectFlags::PLACEMENT) {
            return Ok(candidate.host_instance);
        }
    }
}

/// Insert or append the host-bearing nodes at and below `id`.
fn place_node(
    arena: &FiberArena,
    host: &mut dyn HostAdapter,
    id: FiberId,
    parent_instance: HostId,
    before: Option<HostId>,
) -> Result<(), RenderError> {
    let node = arena.get(id)?;
    if node.is_host_bearing() {
        let instance = node.host_instance.ok_or(FiberError::Missing { id })?;
        match before {
            Some(anchor) => host.insert_before(parent_instance, instance, anchor)?,
            None => host.append_child(parent_instance, instance)?,
        }
        return Ok(());
    }
    // Not host-bearing: place every host-bearing child subtree instead.
    let mut cursor = node.first_child;
    while let Some(child) = cursor {
        place_node(arena, host, child, parent_instance, before)?;
        cursor = arena.get(child)?.next_sibling;
    }
    Ok(())
}

/// Dispatch a recorded update to the host.
fn commit_update(
    arena: &FiberArena,
    host: &mut dyn HostAdapter,
    id: FiberId,
) -> Result<(), RenderError> {
    log::trace!("commit update for node {id}");
    let node = arena.get(id)?;
    let instance = node.host_instance.ok_or(FiberError::Missing { id })?;
    let props = node.memoized_props.as_ref().ok_or(FiberError::Missing { id })?;
    match node.kind {
        WorkKind::HostText => {
            host.update_text_content(instance, props.text_content().unwrap_or_default())?;
        }
        WorkKind::HostElement => {
            host.update_element_props(instance, props)?;
        }
        WorkKind::Root | WorkKind::FunctionalUnit => {
            log::warn!("update flag on non-host node {id}; nothing to apply");
        }
    }
    Ok(())
}

/// Tear down every subtree queued on this node's deletion list.
fn commit_deletions(
    arena: &mut FiberArena,
    host: &mut dyn HostAdapter,
    container: HostId,
    id: FiberId,
) -> Result<(), RenderError> {
    let deletions: Vec<FiberId> = arena.get_mut(id)?.pending_deletions.drain(..).collect();
    for deleted in deletions {
        commit_deletion(arena, host, container, deleted)?;
    }
    Ok(())
}

fn commit_deletion(
    arena: &mut FiberArena,
    host: &mut dyn HostAdapter,
    container: HostId,
    deleted: FiberId,
) -> Result<(), RenderError> {
    log::trace!("commit deletion of node {deleted}");
    // Visit the whole subtree depth-first; the first host-bearing node is
    // the deletion's host root, everything beneath it leaves the host tree
    // with it.
    let mut host_root: Option<HostId> = None;
    visit_subtree(arena, deleted, |node| match node.kind {
        WorkKind::HostElement | WorkKind::HostText => {
            if host_root.is_none() {
                host_root = node.host_instance;
            }
        }
        // Unmount effects for functional units are not implemented yet;
        // their cells are simply dropped with the subtree.
        WorkKind::FunctionalUnit => {}
        WorkKind::Root => {}
    })?;

    if let Some(instance) = host_root {
        match host_parent_of(arena, container, deleted)? {
            Some(parent_instance) => host.remove_child(instance, parent_instance)?,
            None => log::warn!("deletion of node {deleted} found no host parent; skipping"),
        }
    }

    // Sever the subtree from the tree, then release its arena slots.
    {
        let node = arena.get_mut(deleted)?;
        node.parent = None;
    }
    arena.free_subtree(deleted);
    Ok(())
}

/// Depth-first pre-order visit over a subtree, following tree links only.
fn visit_subtree(
    arena: &FiberArena,
    root: FiberId,
    mut visit: impl FnMut(&crate::fiber::WorkNode),
) -> Result<(), FiberError> {
    let mut node = root;
    loop {
        visit(arena.get(node)?);

        if let Some(child) = arena.get(node)?.first_child {
            node = child;
            continue;
        }
        if node == root {
            return Ok(());
        }
        while arena.get(node)?.next_sibling.is_none() {
            match arena.get(node)?.parent {
                None => return Ok(()),
                Some(parent) if parent == root => return Ok(()),
                Some(parent) => node = parent,
            }
        }
        node = arena.get(node)?.next_sibling.ok_or(FiberError::Missing { id: node })?;
    }
}
