//! The synchronous work loop driving render and commit passes for one root.
//!
//! Every update request (the initial mount or a state dispatch) lands on
//! the root's single-slot queue and schedules a pass. A pass runs to
//! completion: begin/complete build the finished in-progress tree, commit
//! applies its flags to the host tree, and the live pointer swaps. A
//! dispatch arriving while a pass is running only marks the root pending;
//! the loop drains pending passes after the current one returns, so passes
//! never interleave.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::commit::commit_mutation_effects;
use crate::element::{Element, Props};
use crate::fiber::{FiberArena, FiberId, NodeState, WorkKind, WorkNode, MUTATION_MASK};
use crate::host::{HostAdapter, HostId};
use crate::render::RenderPass;
use crate::update_queue::{Action, Update, UpdateQueue};
use crate::RenderError;

struct RootCore<H: HostAdapter> {
    host: H,
    container: HostId,
    arena: FiberArena,
    /// The live root work node; swapped to the finished tree at commit.
    current: FiberId,
    /// Finished in-progress root, held between render and commit.
    finished: Option<FiberId>,
}

struct RootShared<H: HostAdapter> {
    core: RefCell<RootCore<H>>,
    /// Lifecycle guard: exactly one pass may be in flight.
    in_pass: Cell<bool>,
    /// An update arrived; a pass should run once the loop is free.
    pending: Cell<bool>,
}

/// Container record owning one host container and its dual work-node tree.
pub struct RenderRoot<H: HostAdapter> {
    shared: Rc<RootShared<H>>,
}

impl<H: HostAdapter + 'static> RenderRoot<H> {
    /// Create the root work node and bind it to a host container.
    pub fn new(host: H, container: HostId) -> Self {
        let mut arena = FiberArena::new();
        let mut root = WorkNode::new(WorkKind::Root, Props::new(), None);
        root.update_queue = Some(Rc::new(RefCell::new(UpdateQueue::new())));
        root.memoized_state = NodeState::Element(None);
        let current = arena.insert(root);
        Self {
            shared: Rc::new(RootShared {
                core: RefCell::new(RootCore {
                    host,
                    container,
                    arena,
                    current,
                    finished: None,
                }),
                in_pass: Cell::new(false),
                pending: Cell::new(false),
            }),
        }
    }

    /// Mount or replace the element tree in this root's container.
    ///
    /// Runs synchronously to completion unless a pass is already in
    /// flight, in which case the update is queued and picked up when the
    /// running loop drains.
    pub fn render(&self, element: Element) -> Result<(), RenderError> {
        self.enqueue_root_update(Some(element))?;
        self.shared.pending.set(true);
        if self.shared.in_pass.get() {
            return Ok(());
        }
        Self::drain(&self.shared)
    }

    /// Unmount everything from the container.
    pub fn unmount(&self) -> Result<(), RenderError> {
        self.enqueue_root_update(None)?;
        self.shared.pending.set(true);
        if self.shared.in_pass.get() {
            return Ok(());
        }
        Self::drain(&self.shared)
    }

    /// Borrow the host adapter for inspection.
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.shared.core.borrow().host)
    }

    /// Borrow the host adapter mutably, e.g. to register listeners.
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.shared.core.borrow_mut().host)
    }

    /// Borrow the work-node arena and the live root id for assertions.
    pub fn with_tree<R>(&self, f: impl FnOnce(&FiberArena, FiberId) -> R) -> R {
        let core = self.shared.core.borrow();
        f(&core.arena, core.current)
    }

    pub fn container(&self) -> HostId {
        self.shared.core.borrow().container
    }

    fn enqueue_root_update(&self, element: Option<Element>) -> Result<(), RenderError> {
        let core = self.shared.core.borrow();
        let queue = core
            .arena
            .get(core.current)?
            .update_queue
            .clone()
            .ok_or(crate::FiberError::KindMismatch {
                id: core.current,
                expected: "root with update queue",
            })?;
        queue
            .borrow_mut()
            .enqueue(Update::new(Action::Replace(element)));
        Ok(())
    }

    /// Run passes until no update is pending.
    fn drain(shared: &Rc<RootShared<H>>) -> Result<(), RenderError> {
        while shared.pending.replace(false) {
            shared.in_pass.set(true);
            let outcome = {
                let mut core = shared.core.borrow_mut();
                let schedule = Self::schedule_fn(shared);
                core.render_pass(schedule)
            };
            shared.in_pass.set(false);
            outcome?;
        }
        Ok(())
    }

    /// Re-entry point handed to dispatch closures. Weakly bound: a
    /// dispatch outliving its root becomes a no-op.
    fn schedule_fn(shared: &Rc<RootShared<H>>) -> Rc<dyn Fn()> {
        let weak: Weak<RootShared<H>> = Rc::downgrade(shared);
        Rc::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            shared.pending.set(true);
            if shared.in_pass.get() {
                return;
            }
            if let Err(err) = Self::drain(&shared) {
                log::error!("scheduled render pass failed: {err}");
            }
        })
    }
}

impl<H: HostAdapter> RootCore<H> {
    /// One full render+commit pass.
    fn render_pass(&mut self, schedule: Rc<dyn Fn()>) -> Result<(), RenderError> {
        let in_progress = self
            .arena
            .create_or_reuse_in_progress(self.current, Props::new())?;

        let outcome = {
            let RootCore { arena, host, .. } = self;
            let mut pass = RenderPass {
                arena,
                host,
                schedule,
            };
            pass.run(in_progress)
        };

        match outcome {
            Ok(()) => {
                self.finished = Some(in_progress);
                self.commit_root()
            }
            Err(err) => {
                // The live tree is untouched; drop the half-built buffer so
                // the next pass starts from a clean clone again.
                self.arena.discard_in_progress(in_progress);
                Err(err)
            }
        }
    }

    fn commit_root(&mut self) -> Result<(), RenderError> {
        let Some(finished) = self.finished.take() else {
            return Ok(());
        };
        let has_work = {
            let node = self.arena.get(finished)?;
            (node.flags | node.subtree_flags).intersects(MUTATION_MASK)
        };
        if has_work {
            let RootCore {
                arena,
                host,
                container,
                ..
            } = self;
            commit_mutation_effects(arena, host, *container, finished)?;
        } else {
            log::trace!("commit skipped; no mutation flags anywhere");
        }
        self.current = finished;
        Ok(())
    }
}

impl<H: HostAdapter> std::fmt::Debug for RenderRoot<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderRoot")
            .field("in_pass", &self.shared.in_pass.get())
            .field("pending", &self.shared.pending.get())
            .finish()
    }
}
