// src/lib.rs

// --- Module Declarations ---
// The erased cell representation and the evaluator are implementation
// detail; the public surface is the typed wrapper and the memo builder.
mod cell;
mod trampoline;

pub mod error;
pub mod lazy;
pub mod memo;

// --- Public API Re-exports ---
// This makes the core components available to users of the library
// without them needing to know the internal file structure.
pub use error::StepBudgetExceeded;
pub use lazy::{recursive, Lazy};
pub use memo::{memoize, Memo};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    // Shared invocation counter for checking how often a transform ran.
    fn counter() -> Rc<Cell<usize>> {
        Rc::new(Cell::new(0))
    }

    fn hash_of<T: std::hash::Hash>(value: &T) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher;
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_now_map_chain_forces_to_twelve() {
        let cell = Lazy::now(5).map(|x| x + 1).map(|x| x * 2);
        assert_eq!(cell.force(), 12);
    }

    #[test]
    fn test_transforms_do_not_run_at_composition_time() {
        let runs = counter();
        let r = runs.clone();
        let cell = Lazy::now(1).map(move |x| {
            r.set(r.get() + 1);
            x + 1
        });
        let chained = cell.flat_map(|x| Lazy::now(x * 10));
        assert_eq!(runs.get(), 0);
        assert_eq!(chained.force(), 20);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_force_is_idempotent_and_runs_the_thunk_once() {
        let runs = counter();
        let r = runs.clone();
        let cell = Lazy::new(move || {
            r.set(r.get() + 1);
            42
        });
        assert_eq!(cell.force(), 42);
        assert_eq!(cell.force(), 42);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_shared_base_runs_its_transform_once() {
        let runs = counter();
        let r = runs.clone();
        let base = Lazy::new(move || {
            r.set(r.get() + 1);
            10
        });
        let left = base.map(|x| x + 1);
        let right = base.map(|x| x + 2);
        assert_eq!(left.force(), 11);
        assert_eq!(right.force(), 12);
        // Both derived cells walked through the same base cell; it was
        // memoized by the first force.
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_defer_splices_the_produced_cell() {
        let runs = counter();
        let r = runs.clone();
        let cell = Lazy::defer(move || {
            r.set(r.get() + 1);
            Lazy::now(7)
        });
        assert_eq!(runs.get(), 0);
        assert_eq!(cell.force(), 7);
        assert_eq!(cell.force(), 7);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_flat_map_chains_dependent_cells() {
        let cell = Lazy::now(2)
            .flat_map(|x| Lazy::now(x * 10))
            .flat_map(|x| Lazy::now(x + 1).map(|y| y * 2));
        assert_eq!(cell.force(), 42);
    }

    #[test]
    fn test_zip_family_sequences_and_selects() {
        let a = Lazy::now(1);
        let b = Lazy::now(2);
        assert_eq!(a.zip(&b).force(), (1, 2));
        assert_eq!(a.zip_left(&b).force(), 2);
        assert_eq!(a.zip_right(&b).force(), 1);
    }

    #[test]
    fn test_zip_forces_each_side_once() {
        let left_runs = counter();
        let right_runs = counter();
        let lr = left_runs.clone();
        let rr = right_runs.clone();
        let a = Lazy::new(move || {
            lr.set(lr.get() + 1);
            3
        });
        let b = Lazy::new(move || {
            rr.set(rr.get() + 1);
            4
        });
        assert_eq!(a.zip(&b).force(), (3, 4));
        assert_eq!(a.zip_right(&b).force(), 3);
        assert_eq!(left_runs.get(), 1);
        assert_eq!(right_runs.get(), 1);
    }

    #[test]
    fn test_recursive_definition_may_embed_its_own_handle() {
        // The self-handle sits in the untaken branch, so forcing terminates.
        let cell = Lazy::recursive(|me| {
            Lazy::now(3u32).flat_map(move |n| if n == 0 { me.clone() } else { Lazy::now(n) })
        });
        assert_eq!(cell.force(), 3);
    }

    #[test]
    fn test_recursive_identity_exceeds_any_step_budget() {
        let cell: Lazy<u32> = Lazy::recursive(|me| me);
        let denied = cell.force_bounded(10_000);
        assert_eq!(denied, Err(StepBudgetExceeded { steps: 10_000 }));
        // The cell is still structurally sound: another bounded attempt
        // loops again instead of producing a bogus value.
        assert!(cell.force_bounded(1_000).is_err());
        assert_eq!(cell.peek(), None);
    }

    #[test]
    fn test_failing_transform_is_retried_after_its_prefix_resolved() {
        let base_runs = counter();
        let failing = Rc::new(Cell::new(true));

        let r = base_runs.clone();
        let base = Lazy::new(move || {
            r.set(r.get() + 1);
            5
        });
        let fail_flag = failing.clone();
        let derived = base.map(move |x| {
            if fail_flag.get() {
                panic!("transform rejected its input");
            }
            x + 1
        });

        let unwound = catch_unwind(AssertUnwindSafe(|| derived.force()));
        assert!(unwound.is_err());
        // The prefix below the failing step stays memoized...
        assert_eq!(base.peek(), Some(5));
        assert_eq!(base_runs.get(), 1);
        // ...and the failing step itself stays installed for retry.
        failing.set(false);
        assert_eq!(derived.force(), 6);
        assert_eq!(base_runs.get(), 1);
    }

    #[test]
    fn test_bounded_force_resumes_where_it_stopped() {
        let first_runs = counter();
        let r = first_runs.clone();
        let mut cell = Lazy::now(0).map(move |x| {
            r.set(r.get() + 1);
            x + 1
        });
        let first = cell.clone();
        for _ in 0..9 {
            cell = cell.map(|x| x + 1);
        }

        // Budget large enough to resolve the bottom of the chain but not
        // the root.
        assert!(cell.force_bounded(15).is_err());
        assert_eq!(first.peek(), Some(1));
        assert_eq!(first_runs.get(), 1);

        // The retry picks up the memoized prefix instead of recomputing it.
        assert_eq!(cell.force(), 10);
        assert_eq!(first_runs.get(), 1);
    }

    #[test]
    fn test_bounded_force_succeeds_within_budget() {
        let cell = Lazy::now(5).map(|x| x + 1).map(|x| x * 2);
        assert_eq!(cell.force_bounded(100), Ok(12));
        // Already final: later bounded calls cost nothing.
        assert_eq!(cell.force_bounded(0), Ok(12));
    }

    #[test]
    fn test_clones_compare_equal_without_forcing() {
        let cell = Lazy::new(|| 5);
        let alias = cell.clone();
        assert_eq!(cell, alias);
        assert_eq!(cell.peek(), None);
    }

    #[test]
    fn test_independent_cells_compare_by_forced_value() {
        let eager = Lazy::now(5);
        let deferred = Lazy::new(|| 5);
        assert_eq!(eager, deferred);
        assert_eq!(deferred.peek(), Some(5));
        assert_ne!(Lazy::now(1), Lazy::now(2));
    }

    #[test]
    fn test_hash_reflects_the_forced_value() {
        let eager = Lazy::now(99u64);
        let deferred = Lazy::new(|| 99u64);
        assert_eq!(hash_of(&eager), hash_of(&deferred));
    }

    #[test]
    fn test_debug_and_display_peek_without_forcing() {
        let cell = Lazy::new(|| 12);
        assert_eq!(format!("{:?}", cell), "Lazy(<suspended>)");
        assert_eq!(format!("{}", cell), "<suspended>");
        assert_eq!(cell.peek(), None);

        cell.force();
        assert_eq!(format!("{:?}", cell), "Lazy(12)");
        assert_eq!(format!("{}", cell), "12");
    }

    #[test]
    fn test_memo_resolves_through_its_table() {
        let squares = memoize(|_g: Memo<u32, u32>, key| Lazy::now(Some(key * key)));
        assert_eq!(squares.call(4).force(), Some(16));
        assert!(squares.is_cached(&4));
        assert_eq!(squares.call(4).force(), Some(16));
    }
}
