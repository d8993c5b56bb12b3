//! Checker state and dispatching of proof steps.
use partial_ref::{partial, PartialRef};

use bddsat_formula::Lit;
use bddsat_lrat::{ClauseId, LratStep};

use crate::clauses::delete_clauses;
use crate::context::{parts::*, Context};
use crate::rup::check_clause;
use crate::CheckerError;

/// Miscellaneous checker state.
#[derive(Default)]
pub struct CheckerState {
    /// Current step number, counting from 1.
    pub step: u64,
    /// Whether the empty clause was added by a checked step.
    pub unsat: bool,
    /// Number of clauses of the input formula.
    pub input_clauses: usize,
}

/// Add a clause of the input formula, using the next free id.
pub fn add_input_clause(
    mut ctx: partial!(Context, mut CheckerStateP, mut ClausesP),
    clause: &[Lit],
) -> ClauseId {
    let clauses = ctx.part_mut(ClausesP);
    let id = clauses.max_id + 1;
    clauses.insert(id, clause);
    ctx.part_mut(CheckerStateP).input_clauses += 1;
    id
}

/// Check a single proof step.
pub fn check_step(
    mut ctx: partial!(Context, mut CheckerStateP, mut ClausesP, mut RupCheckP),
    step: LratStep,
) -> Result<(), CheckerError> {
    match step {
        LratStep::Add { id, clause, hints } => {
            check_clause(ctx.borrow(), id, clause, hints)?;
            if clause.is_empty() {
                ctx.part_mut(CheckerStateP).unsat = true;
            }
        }
        LratStep::Delete { ids } => delete_clauses(ctx.borrow(), ids)?,
    }
    Ok(())
}
