// src/trampoline.rs

use crate::cell::{CellRef, CellState, FlatMapFn, MapFn, Step, Value};
use crate::error::StepBudgetExceeded;

// --- The Continuation Stack ---

/// One suspended operation, waiting on the cell currently being reduced.
/// `target` is the cell whose state gets overwritten once the value below
/// it arrives.
enum Frame {
    Map { target: CellRef, transform: MapFn },
    FlatMap { target: CellRef, transform: FlatMapFn },
}

/// What one inspection of the current cell tells the loop to do next.
enum Inspect {
    /// State was already Final.
    Resolved(Value),
    /// A Done step: promote the cell, then treat the value as resolved.
    Fresh(Value),
    /// A Map/FlatMap step: suspend it and walk down to its source.
    Descend(Frame, CellRef),
}

/// Reduce the chain rooted at `root` to a final value. Pending operations
/// live on an explicit frame stack, never the host call stack, and every
/// cell visited on the walk is overwritten with its resolved state, so
/// re-forcing any cell on the path is O(1) afterwards. With
/// `budget: Some(max)` the loop gives up after `max` inspections; all
/// promotions performed before giving up stand.
pub(crate) fn run(
    root: &CellRef,
    budget: Option<usize>,
) -> Result<Value, StepBudgetExceeded> {
    let mut current = root.clone();
    let mut stack: Vec<Frame> = Vec::new();
    let mut steps: usize = 0;

    loop {
        if let Some(max) = budget {
            if steps >= max {
                return Err(StepBudgetExceeded { steps });
            }
        }
        steps += 1;

        // Snapshot the state and release the borrow before anything else
        // runs: transforms are user code and may re-enter the library.
        let inspected = match current.snapshot() {
            CellState::Final(value) => Inspect::Resolved(value),
            CellState::Pending(Step::Done(value)) => Inspect::Fresh(value),
            CellState::Pending(Step::Map { source, transform }) => Inspect::Descend(
                Frame::Map {
                    target: current.clone(),
                    transform,
                },
                source,
            ),
            CellState::Pending(Step::FlatMap { source, transform }) => Inspect::Descend(
                Frame::FlatMap {
                    target: current.clone(),
                    transform,
                },
                source,
            ),
        };

        let value = match inspected {
            Inspect::Resolved(value) => value,
            Inspect::Fresh(value) => {
                current.resolve_to(value.clone());
                value
            }
            Inspect::Descend(frame, source) => {
                stack.push(frame);
                current = source;
                continue;
            }
        };

        // `current` now stands for `value`; hand it to whoever was waiting.
        match stack.pop() {
            None => return Ok(value),
            Some(Frame::Map { target, transform }) => {
                let produced = transform(value);
                target.install(CellState::Pending(Step::Done(produced)));
                current = target;
            }
            Some(Frame::FlatMap { target, transform }) => {
                let next = transform(value);
                // Copy the produced cell's representation, not the cell
                // itself: `target` stands in for it from here on, and the
                // spliced state may still be pending. Snapshot before
                // installing; `next` may be `target` itself when a
                // self-referential definition returns its own argument.
                let spliced = next.snapshot();
                target.install(spliced);
                current = target;
            }
        }
    }
}
