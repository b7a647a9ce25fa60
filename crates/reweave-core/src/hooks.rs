//! State cells backing functional units.
//!
//! Every render of a functional unit walks an ordered list of cells: the
//! Nth `use_state` call on the mount render and the Nth call on every later
//! render must address the same cell. The registry is carried by an
//! explicit [`Scope`] handed to the render function, so a cell can only be
//! reached while its unit is actually rendering; there is no process-wide
//! "currently rendering" register to misuse.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::update_queue::{process, Action, Update, UpdateQueue};
use crate::HookError;

/// Opaque committed value of one state cell.
pub type StateSlot = Rc<dyn Any>;

type DynDispatch = Rc<dyn Fn(Action<StateSlot>)>;

/// One state cell of a functional unit.
///
/// The queue and dispatch are shared between the live and in-progress
/// copies of the cell, so a dispatch bound on an earlier pass still reaches
/// the slot the next pass drains.
pub struct HookCell {
    value: StateSlot,
    queue: Rc<RefCell<UpdateQueue<StateSlot>>>,
    dispatch: DynDispatch,
}

impl Clone for HookCell {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            queue: Rc::clone(&self.queue),
            dispatch: Rc::clone(&self.dispatch),
        }
    }
}

impl HookCell {
    pub fn has_pending(&self) -> bool {
        self.queue.borrow().has_pending()
    }
}

impl std::fmt::Debug for HookCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookCell")
            .field("pending", &self.has_pending())
            .finish()
    }
}

/// Render-scope handle passed to a functional unit's render function.
///
/// Mount renders (no previous cells) allocate; update renders walk the
/// previous pass's cells positionally. `finish` hands the new cell list
/// back to the reconciler once the render function returns.
pub struct Scope {
    prev: Option<Vec<HookCell>>,
    cells: Vec<HookCell>,
    schedule: Rc<dyn Fn()>,
}

impl Scope {
    pub(crate) fn new(prev: Option<Vec<HookCell>>, schedule: Rc<dyn Fn()>) -> Self {
        Self {
            prev,
            cells: Vec::new(),
            schedule,
        }
    }

    /// Mount or update the next state cell in call order.
    ///
    /// Returns the cell's current value and a setter bound to the cell's
    /// queue and the owning root. Running past the previous pass's cell
    /// count, or reading a cell whose stored type changed, is a usage
    /// error fatal to the pass.
    pub fn use_state<T: Clone + 'static>(
        &mut self,
        init: impl FnOnce() -> T,
    ) -> Result<(T, SetState<T>), HookError> {
        let index = self.cells.len();
        let cell = match &self.prev {
            None => {
                let queue = Rc::new(RefCell::new(UpdateQueue::new()));
                HookCell {
                    value: Rc::new(init()),
                    dispatch: self.bind_dispatch(&queue),
                    queue,
                }
            }
            Some(prev) => {
                let prev_cell = prev.get(index).ok_or(HookError::CountMismatch {
                    previous: prev.len(),
                    index,
                })?;
                let pending = prev_cell.queue.borrow_mut().take();
                HookCell {
                    value: process(Rc::clone(&prev_cell.value), pending),
                    queue: Rc::clone(&prev_cell.queue),
                    dispatch: Rc::clone(&prev_cell.dispatch),
                }
            }
        };

        let value = cell
            .value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(HookError::TypeMismatch {
                index,
                expected: std::any::type_name::<T>(),
            })?;
        let setter = SetState {
            dispatch: Rc::clone(&cell.dispatch),
            _marker: PhantomData,
        };
        self.cells.push(cell);
        Ok((value, setter))
    }

    /// Number of cells walked so far this render.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn finish(self) -> Vec<HookCell> {
        self.cells
    }

    fn bind_dispatch(&self, queue: &Rc<RefCell<UpdateQueue<StateSlot>>>) -> DynDispatch {
        let queue = Rc::clone(queue);
        let schedule = Rc::clone(&self.schedule);
        Rc::new(move |action| {
            queue.borrow_mut().enqueue(Update::new(action));
            schedule();
        })
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("cells", &self.cells.len())
            .field("mounting", &self.prev.is_none())
            .finish()
    }
}

/// Typed setter for one state cell.
///
/// Usable from anywhere (event handlers, timers): it enqueues on the
/// cell's queue and schedules a render pass on the owning root.
pub struct SetState<T> {
    dispatch: DynDispatch,
    _marker: PhantomData<fn(T) -> T>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            dispatch: Rc::clone(&self.dispatch),
            _marker: PhantomData,
        }
    }
}

impl<T: Clone + 'static> SetState<T> {
    /// Replace the cell's value outright.
    pub fn set(&self, value: T) {
        (self.dispatch)(Action::Replace(Rc::new(value) as StateSlot));
    }

    /// Derive the next value from the previous one.
    pub fn update(&self, f: impl Fn(&T) -> T + 'static) {
        (self.dispatch)(Action::Compute(Rc::new(move |prev: &StateSlot| {
            match prev.downcast_ref::<T>() {
                Some(value) => Rc::new(f(value)) as StateSlot,
                // Leave the slot untouched; the drift surfaces as a type
                // mismatch when the cell is next read.
                None => Rc::clone(prev),
            }
        })));
    }
}

impl<T> std::fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SetState(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop_schedule() -> Rc<dyn Fn()> {
        Rc::new(|| {})
    }

    fn counting_schedule(counter: &Rc<Cell<usize>>) -> Rc<dyn Fn()> {
        let counter = Rc::clone(counter);
        Rc::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn mount_allocates_cells_in_call_order() {
        let mut scope = Scope::new(None, noop_schedule());
        let (a, _) = scope.use_state(|| 1i32).unwrap();
        let (b, _) = scope.use_state(|| "two".to_string()).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, "two");
        assert_eq!(scope.finish().len(), 2);
    }

    #[test]
    fn update_walks_previous_cells_positionally() {
        let mut mount = Scope::new(None, noop_schedule());
        let (_, set_a) = mount.use_state(|| 10i32).unwrap();
        mount.use_state(|| 20i32).unwrap();
        let cells = mount.finish();

        set_a.update(|n| n + 1);

        let mut update = Scope::new(Some(cells), noop_schedule());
        let (a, _) = update.use_state(|| 0i32).unwrap();
        let (b, _) = update.use_state(|| 0i32).unwrap();
        assert_eq!(a, 11);
        assert_eq!(b, 20);
        assert_eq!(update.finish().len(), 2);
    }

    #[test]
    fn running_past_previous_cells_is_a_count_mismatch() {
        let mut mount = Scope::new(None, noop_schedule());
        mount.use_state(|| 1i32).unwrap();
        let cells = mount.finish();

        let mut update = Scope::new(Some(cells), noop_schedule());
        update.use_state(|| 1i32).unwrap();
        let err = update.use_state(|| 2i32).unwrap_err();
        assert_eq!(
            err,
            HookError::CountMismatch {
                previous: 1,
                index: 1
            }
        );
    }

    #[test]
    fn reading_a_cell_with_a_different_type_is_a_type_mismatch() {
        let mut mount = Scope::new(None, noop_schedule());
        mount.use_state(|| 1i32).unwrap();
        let cells = mount.finish();

        let mut update = Scope::new(Some(cells), noop_schedule());
        let err = update.use_state(|| String::new()).unwrap_err();
        assert!(matches!(err, HookError::TypeMismatch { index: 0, .. }));
    }

    #[test]
    fn dispatch_enqueues_and_schedules() {
        let schedules = Rc::new(Cell::new(0usize));
        let mut mount = Scope::new(None, counting_schedule(&schedules));
        let (_, setter) = mount.use_state(|| 0i32).unwrap();
        let cells = mount.finish();

        setter.set(5);
        setter.set(6);
        assert_eq!(schedules.get(), 2);
        assert!(cells[0].has_pending());

        // Only the last write survives the single slot.
        let mut update = Scope::new(Some(cells), noop_schedule());
        let (value, _) = update.use_state(|| 0i32).unwrap();
        assert_eq!(value, 6);
    }

    #[test]
    fn queue_identity_survives_across_passes() {
        let mut mount = Scope::new(None, noop_schedule());
        let (_, setter) = mount.use_state(|| 0i32).unwrap();
        let first = mount.finish();

        let mut second_pass = Scope::new(Some(first), noop_schedule());
        second_pass.use_state(|| 0i32).unwrap();
        let second = second_pass.finish();

        // Dispatch bound at mount still reaches the cell reused on pass two.
        setter.update(|n| n + 41);
        let mut third_pass = Scope::new(Some(second), noop_schedule());
        let (value, _) = third_pass.use_state(|| 0i32).unwrap();
        assert_eq!(value, 41);
    }
}
