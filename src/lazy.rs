// src/lazy.rs

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use crate::cell::{CellRef, FlatMapFn, MapFn, Step, Value};
use crate::error::StepBudgetExceeded;
use crate::trampoline;

/// A deferred, memoized computation of one `A`. Cloning shares the
/// underlying cell, so a cell forced through one handle is final through all
/// of them. `map` and `flat_map` only allocate; nothing runs until
/// [`Lazy::force`].
pub struct Lazy<A> {
    cell: CellRef,
    marker: PhantomData<fn() -> A>,
}

impl<A> Clone for Lazy<A> {
    fn clone(&self) -> Self {
        Lazy {
            cell: self.cell.clone(),
            marker: PhantomData,
        }
    }
}

// Re-establish the concrete type behind an erased value. The typed wrapper
// is the only writer of these slots, so the downcast cannot miss.
fn unerase<A: Clone + 'static>(value: Value) -> A {
    let concrete = value
        .downcast::<A>()
        .unwrap_or_else(|_| unreachable!("erased cell value does not match its handle's type"));
    concrete.as_ref().clone()
}

impl<A: 'static> Lazy<A> {
    pub(crate) fn from_cell(cell: CellRef) -> Self {
        Lazy {
            cell,
            marker: PhantomData,
        }
    }

    /// A cell that is already final. No laziness involved.
    pub fn now(value: A) -> Self {
        Lazy::from_cell(CellRef::final_value(Rc::new(value)))
    }

    /// Defer a value-returning thunk. It does not run until the cell is
    /// forced, and runs at most once on the success path.
    pub fn new(thunk: impl Fn() -> A + 'static) -> Self {
        let transform: MapFn = Rc::new(move |_unit| Rc::new(thunk()) as Value);
        Lazy::from_cell(CellRef::pending(Step::Map {
            source: CellRef::unit(),
            transform,
        }))
    }

    /// Defer a cell-returning thunk; the produced cell is spliced in when
    /// forced. The thunk runs inside the evaluator, so recursively deferred
    /// definitions unfold one level per step, off the host stack.
    pub fn defer(thunk: impl Fn() -> Lazy<A> + 'static) -> Self {
        let transform: FlatMapFn = Rc::new(move |_unit| thunk().cell);
        Lazy::from_cell(CellRef::pending(Step::FlatMap {
            source: CellRef::unit(),
            transform,
        }))
    }

    /// A lazily self-referential cell: `definition` receives a handle to the
    /// very cell being constructed. The handle may be embedded in further
    /// `map`/`flat_map` chains, but must not be forced during `definition`'s
    /// own invocation; that loops forever rather than erroring, and
    /// [`Lazy::force_bounded`] is the way to observe it finitely.
    pub fn recursive(definition: impl Fn(Lazy<A>) -> Lazy<A> + 'static) -> Self {
        let cell = CellRef::cyclic(|back| {
            let transform: FlatMapFn = Rc::new(move |_unit| {
                // The evaluator holds a strong handle to this cell while the
                // transform runs, so the upgrade cannot fail here.
                let me = back
                    .upgrade()
                    .expect("self-referential cell freed while being evaluated");
                definition(Lazy::from_cell(me)).cell
            });
            Step::FlatMap {
                source: CellRef::unit(),
                transform,
            }
        });
        Lazy::from_cell(cell)
    }

    /// The final value if this cell has already resolved. Never forces.
    pub fn peek(&self) -> Option<A>
    where
        A: Clone,
    {
        self.cell.peek_final().map(unerase::<A>)
    }

    /// Force the cell to its final value, memoizing it and every
    /// intermediate cell on the evaluation path. The first call pays the
    /// evaluation cost; every later call on the same cell is O(1).
    /// Panics raised by user transforms propagate out unchanged.
    pub fn force(&self) -> A
    where
        A: Clone,
    {
        if let Some(value) = self.cell.peek_final() {
            return unerase(value);
        }
        match trampoline::run(&self.cell, None) {
            Ok(value) => unerase(value),
            Err(_) => unreachable!("unbudgeted evaluation cannot exhaust a step budget"),
        }
    }

    /// Like [`Lazy::force`], but gives up after `max_steps` evaluator steps.
    /// Cells resolved before giving up keep their memoized state, so a
    /// retry resumes from where this call stopped.
    pub fn force_bounded(&self, max_steps: usize) -> Result<A, StepBudgetExceeded>
    where
        A: Clone,
    {
        if let Some(value) = self.cell.peek_final() {
            return Ok(unerase(value));
        }
        trampoline::run(&self.cell, Some(max_steps)).map(unerase)
    }

    /// Derive a new cell transforming this one's value. Allocates one cell,
    /// forces nothing, mutates nothing.
    pub fn map<B: 'static>(&self, f: impl Fn(A) -> B + 'static) -> Lazy<B>
    where
        A: Clone,
    {
        let transform: MapFn = Rc::new(move |value| Rc::new(f(unerase::<A>(value))) as Value);
        Lazy::from_cell(CellRef::pending(Step::Map {
            source: self.cell.clone(),
            transform,
        }))
    }

    /// Derive a new cell chaining into whatever cell `f` produces. Same
    /// non-forcing guarantee as [`Lazy::map`].
    pub fn flat_map<B: 'static>(&self, f: impl Fn(A) -> Lazy<B> + 'static) -> Lazy<B>
    where
        A: Clone,
    {
        let transform: FlatMapFn = Rc::new(move |value| f(unerase::<A>(value)).cell);
        Lazy::from_cell(CellRef::pending(Step::FlatMap {
            source: self.cell.clone(),
            transform,
        }))
    }

    /// Sequence `self` before `other`, yielding `other`'s value.
    pub fn zip_left<B: Clone + 'static>(&self, other: &Lazy<B>) -> Lazy<B>
    where
        A: Clone,
    {
        let other = other.clone();
        self.flat_map(move |_| other.clone())
    }

    /// Sequence `self` before `other`, yielding `self`'s value.
    pub fn zip_right<B: Clone + 'static>(&self, other: &Lazy<B>) -> Lazy<A>
    where
        A: Clone,
    {
        let other = other.clone();
        self.flat_map(move |a| other.map(move |_| a.clone()))
    }

    /// Sequence `self` before `other`, yielding both values.
    pub fn zip<B: Clone + 'static>(&self, other: &Lazy<B>) -> Lazy<(A, B)>
    where
        A: Clone,
    {
        let other = other.clone();
        self.flat_map(move |a| other.map(move |b| (a.clone(), b)))
    }
}

/// Free-function form of [`Lazy::recursive`].
pub fn recursive<A: 'static>(definition: impl Fn(Lazy<A>) -> Lazy<A> + 'static) -> Lazy<A> {
    Lazy::recursive(definition)
}

// --- Identity & Presentation Adapters ---

/// Equality is handle identity first, forced-value equality second. The
/// fallback forces both sides; using unforced cells as map keys pays that
/// cost up front.
impl<A: Clone + PartialEq + 'static> PartialEq for Lazy<A> {
    fn eq(&self, other: &Self) -> bool {
        CellRef::ptr_eq(&self.cell, &other.cell) || self.force() == other.force()
    }
}

impl<A: Clone + Eq + 'static> Eq for Lazy<A> {}

/// Hashes the forced value, forcing the cell if necessary.
impl<A: Clone + Hash + 'static> Hash for Lazy<A> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.force().hash(state);
    }
}

impl<A: fmt::Debug + 'static> fmt::Debug for Lazy<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.peek_final() {
            Some(value) => match value.as_ref().downcast_ref::<A>() {
                Some(a) => write!(f, "Lazy({:?})", a),
                None => write!(f, "Lazy(<opaque>)"),
            },
            None => write!(f, "Lazy(<suspended>)"),
        }
    }
}

impl<A: fmt::Display + 'static> fmt::Display for Lazy<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.cell.peek_final() {
            Some(value) => match value.as_ref().downcast_ref::<A>() {
                Some(a) => write!(f, "{}", a),
                None => write!(f, "<opaque>"),
            },
            None => write!(f, "<suspended>"),
        }
    }
}
