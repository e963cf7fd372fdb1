// src/error.rs

use std::fmt;

/// Returned by the bounded evaluation entry point when the step budget runs
/// out before the root cell resolves. Cells resolved before the budget was
/// spent keep their memoized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBudgetExceeded {
    /// Evaluator steps consumed before giving up.
    pub steps: usize,
}

impl fmt::Display for StepBudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "evaluation exceeded its step budget after {} steps",
            self.steps
        )
    }
}
