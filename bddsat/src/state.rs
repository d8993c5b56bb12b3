//! Miscellaneous solver state.
use std::time::Instant;

use crate::variables::VarOrder;

/// Result of running a strategy.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Outcome {
    /// The empty clause was derived.
    Unsat,
    /// All terms were conjoined into a single satisfiable term.
    Sat,
    /// The run ended with several terms and no contradiction.
    Incomplete,
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be moved into a separate
/// part of [`Context`](crate::context::Context).
pub struct SolverState {
    /// Order to use when the formula is loaded.
    pub order: Option<VarOrder>,
    pub loaded: bool,
    pub input_vars: usize,
    pub input_clauses: usize,
    pub outcome: Option<Outcome>,
    pub start: Instant,
}

impl Default for SolverState {
    fn default() -> SolverState {
        SolverState {
            order: None,
            loaded: false,
            input_vars: 0,
            input_clauses: 0,
            outcome: None,
            start: Instant::now(),
        }
    }
}
