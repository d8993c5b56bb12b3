//! Checking added clauses by reverse unit propagation (RUP) and resolution asymmetric tautology
//! (RAT) with hints.
use std::mem::replace;

use partial_ref::{partial, PartialRef};

use bddsat_formula::Lit;
use bddsat_lrat::ClauseId;

use crate::{
    clauses::{Clauses, Missing},
    context::{parts::*, Context},
    CheckerError,
};

/// Temporary assignment used while checking a single step.
#[derive(Default)]
pub struct RupCheck {
    /// Value of each variable, indexed by variable index.
    values: Vec<Option<bool>>,
    /// Assigned literals in assignment order.
    trail: Vec<Lit>,
    /// Buffer for the clauses that have to be checked in a RAT step.
    candidates: Vec<ClauseId>,
}

impl RupCheck {
    /// Value of a literal under the current assignment.
    pub fn lit_value(&self, lit: Lit) -> Option<bool> {
        self.values
            .get(lit.index())
            .copied()
            .flatten()
            .map(|value| value ^ lit.is_negative())
    }

    /// Make a literal true.
    fn assign(&mut self, lit: Lit) {
        if self.values.len() <= lit.index() {
            self.values.resize(lit.index() + 1, None);
        }
        self.values[lit.index()] = Some(lit.is_positive());
        self.trail.push(lit);
    }

    /// Undo assignments until `len` assignments are left.
    fn backtrack(&mut self, len: usize) {
        for lit in self.trail.drain(len..) {
            self.values[lit.index()] = None;
        }
    }
}

/// State of a hint clause under the current assignment.
enum HintState {
    Conflict,
    Unit(Lit),
    Satisfied,
    Open,
}

fn hint_state(rup: &RupCheck, lits: &[Lit]) -> HintState {
    let mut unassigned = None;
    for &lit in lits {
        match rup.lit_value(lit) {
            Some(true) => return HintState::Satisfied,
            Some(false) => (),
            None => match unassigned {
                Some(other) if other != lit => return HintState::Open,
                _ => unassigned = Some(lit),
            },
        }
    }
    match unassigned {
        None => HintState::Conflict,
        Some(lit) => HintState::Unit(lit),
    }
}

/// Check an added clause and store it when the check passes.
pub fn check_clause(
    mut ctx: partial!(Context, mut ClausesP, mut RupCheckP, CheckerStateP),
    id: ClauseId,
    clause: &[Lit],
    hints: &[i64],
) -> Result<(), CheckerError> {
    let step = ctx.part(CheckerStateP).step;

    let max_id = ctx.part(ClausesP).max_id;
    if id <= max_id {
        return Err(CheckerError::check_failed(
            step,
            id,
            format!("clause id is not larger than the previous id {}", max_id),
        ));
    }

    let (rup, mut ctx) = ctx.split_part_mut(RupCheckP);
    let clauses = ctx.part_mut(ClausesP);

    debug_assert!(rup.trail.is_empty());
    let result = check_redundancy(rup, clauses, clause, hints);
    rup.backtrack(0);

    result.map_err(|msg| CheckerError::check_failed(step, id, msg))?;

    clauses.insert(id, clause);
    Ok(())
}

/// Check the hints of a step under the negated clause.
///
/// Leaves the assignment for the caller to undo.
fn check_redundancy(
    rup: &mut RupCheck,
    clauses: &mut Clauses,
    clause: &[Lit],
    hints: &[i64],
) -> Result<(), String> {
    for &hint in hints {
        antecedent(clauses, hint)?;
    }

    for &lit in clause {
        match rup.lit_value(lit) {
            // the clause contains a literal and its negation
            Some(true) => return Ok(()),
            Some(false) => (),
            None => rup.assign(!lit),
        }
    }

    let rat_start = hints
        .iter()
        .position(|&hint| hint < 0)
        .unwrap_or_else(|| hints.len());

    if propagate(rup, clauses, &hints[..rat_start])? {
        return Ok(());
    }

    let pivot = match clause.first() {
        Some(&pivot) => pivot,
        None => return Err("unit propagation of the hints did not produce a conflict".to_owned()),
    };

    let groups = &hints[rat_start..];

    let mut candidates = replace(&mut rup.candidates, vec![]);
    candidates.clear();
    candidates.extend_from_slice(clauses.clauses_containing(!pivot));

    let result = check_rat_candidates(rup, clauses, pivot, groups, &candidates);

    rup.candidates = candidates;
    result
}

/// RAT check on `pivot` for every clause containing its negation.
fn check_rat_candidates(
    rup: &mut RupCheck,
    clauses: &Clauses,
    pivot: Lit,
    groups: &[i64],
    candidates: &[ClauseId],
) -> Result<(), String> {
    for &candidate in candidates {
        let lits = antecedent(clauses, candidate as i64)?;

        let blocked = lits
            .iter()
            .any(|&lit| lit != !pivot && rup.lit_value(lit) == Some(true));
        if blocked {
            continue;
        }

        let group = rat_group(groups, candidate).ok_or_else(|| {
            format!(
                "RAT check on {} is missing hints for clause {}",
                pivot, candidate
            )
        })?;

        let mark = rup.trail.len();
        for &lit in lits {
            if lit != !pivot && rup.lit_value(lit).is_none() {
                rup.assign(!lit);
            }
        }

        let conflict = propagate(rup, clauses, group);
        rup.backtrack(mark);

        if !conflict? {
            return Err(format!(
                "RAT check on {} failed for clause {}: no conflict",
                pivot, candidate
            ));
        }
    }
    Ok(())
}

/// The hints following `-candidate` up to the next negative hint.
fn rat_group(groups: &[i64], candidate: ClauseId) -> Option<&[i64]> {
    let start = groups
        .iter()
        .position(|&hint| hint < 0 && hint.unsigned_abs() == candidate)?
        + 1;
    let len = groups[start..]
        .iter()
        .position(|&hint| hint < 0)
        .unwrap_or(groups.len() - start);
    Some(&groups[start..][..len])
}

/// Unit propagate the given antecedents in order. Returns whether a conflict was reached.
fn propagate(rup: &mut RupCheck, clauses: &Clauses, hints: &[i64]) -> Result<bool, String> {
    for &hint in hints {
        let lits = antecedent(clauses, hint)?;
        match hint_state(rup, lits) {
            HintState::Conflict => return Ok(true),
            HintState::Unit(lit) => rup.assign(lit),
            HintState::Satisfied => return Err(format!("antecedent {} is satisfied", hint)),
            HintState::Open => {
                return Err(format!(
                    "antecedent {} has more than one unassigned literal",
                    hint
                ))
            }
        }
    }
    Ok(false)
}

/// Literals of the clause referenced by a hint.
fn antecedent(clauses: &Clauses, hint: i64) -> Result<&[Lit], String> {
    let id = hint.unsigned_abs();
    clauses.get(id).map_err(|missing| match missing {
        Missing::Deleted => format!("antecedent {} was deleted", id),
        Missing::Unknown => format!("antecedent {} does not exist", id),
    })
}
