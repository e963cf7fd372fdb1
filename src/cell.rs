// src/cell.rs

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

// --- Erased Representation ---

// Values and transforms are type-erased inside the engine; the typed
// `Lazy<A>` wrapper re-establishes the concrete type at the boundary.
pub(crate) type Value = Rc<dyn Any>;
pub(crate) type MapFn = Rc<dyn Fn(Value) -> Value>;
pub(crate) type FlatMapFn = Rc<dyn Fn(Value) -> CellRef>;

/// One unevaluated computation step.
#[derive(Clone)]
pub(crate) enum Step {
    /// A resolved value not yet swapped into the owning cell's own state.
    Done(Value),
    /// Transform the source cell's value into this cell's value.
    Map { source: CellRef, transform: MapFn },
    /// Feed the source cell's value to a function producing another cell.
    FlatMap { source: CellRef, transform: FlatMapFn },
}

#[derive(Clone)]
pub(crate) enum CellState {
    Final(Value),
    Pending(Step),
}

/// Shared handle to one cell. Cloning the handle shares the cell, never the
/// state: a cell forced through one handle is final through all of them.
/// The state transitions Pending -> Final at most once and never reverts.
#[derive(Clone)]
pub(crate) struct CellRef {
    state: Rc<RefCell<CellState>>,
}

impl CellRef {
    pub(crate) fn final_value(value: Value) -> Self {
        CellRef {
            state: Rc::new(RefCell::new(CellState::Final(value))),
        }
    }

    pub(crate) fn pending(step: Step) -> Self {
        CellRef {
            state: Rc::new(RefCell::new(CellState::Pending(step))),
        }
    }

    /// A trivial already-final `()` cell, used as the source of wrapped
    /// thunks so they fit the ordinary Map/FlatMap machinery.
    pub(crate) fn unit() -> Self {
        CellRef::final_value(Rc::new(()))
    }

    /// Two-phase construction for self-referential cells: `init` receives a
    /// weak back-reference to the cell being built and returns its first
    /// step. The back-reference is weak, so an unforced self-referential
    /// cell dropped by all holders is still reclaimed.
    pub(crate) fn cyclic(init: impl FnOnce(WeakCellRef) -> Step) -> Self {
        CellRef {
            state: Rc::new_cyclic(|weak| {
                let back = WeakCellRef {
                    state: weak.clone(),
                };
                RefCell::new(CellState::Pending(init(back)))
            }),
        }
    }

    pub(crate) fn ptr_eq(a: &CellRef, b: &CellRef) -> bool {
        Rc::ptr_eq(&a.state, &b.state)
    }

    /// The final value if this cell has already resolved. Never evaluates.
    pub(crate) fn peek_final(&self) -> Option<Value> {
        match &*self.state.borrow() {
            CellState::Final(value) => Some(value.clone()),
            CellState::Pending(_) => None,
        }
    }

    /// A snapshot of the current state. Cheap: only shared pointers move.
    pub(crate) fn snapshot(&self) -> CellState {
        self.state.borrow().clone()
    }

    /// Overwrite the state in place.
    pub(crate) fn install(&self, state: CellState) {
        *self.state.borrow_mut() = state;
    }

    /// Promote this cell to its final value.
    pub(crate) fn resolve_to(&self, value: Value) {
        self.install(CellState::Final(value));
    }
}

/// Non-owning handle used for the single controlled self-reference a
/// recursive definition installs into its own cell.
#[derive(Clone)]
pub(crate) struct WeakCellRef {
    state: Weak<RefCell<CellState>>,
}

impl WeakCellRef {
    pub(crate) fn upgrade(&self) -> Option<CellRef> {
        self.state.upgrade().map(|state| CellRef { state })
    }
}
