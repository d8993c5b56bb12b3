//! Loading a formula into the solver.
use std::cmp::Reverse;

use partial_ref::{partial, PartialRef};

use bddsat_formula::{CnfFormula, Lit};
use bddsat_lrat::ClauseId;

use crate::bdd::{find_or_make, NodeRef};
use crate::context::{parts::*, Context};
use crate::prover::ProofLit;
use crate::solver::SolverError;
use crate::term::add_term;
use crate::variables::VarOrder;

/// Add the clauses of a formula as terms.
///
/// Every input clause becomes the term with the same id. The formula can only be loaded once.
pub fn load_formula<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut BddP,
        mut ProverP<'a>,
        mut SolverStateP,
        mut TermsP
    ),
    formula: &CnfFormula,
) -> Result<(), SolverError> {
    let state = ctx.part_mut(SolverStateP);
    if state.loaded {
        return Err(SolverError::AlreadyLoaded);
    }

    let var_count = formula.var_count();
    let order = state
        .order
        .take()
        .unwrap_or_else(|| VarOrder::identity(var_count));
    if order.len() < var_count {
        return Err(SolverError::OrderMismatch {
            order: order.len(),
            formula: var_count,
        });
    }

    state.loaded = true;
    state.input_vars = var_count;
    state.input_clauses = formula.len();

    let mut ids = Vec::with_capacity(formula.len());
    for clause in formula.iter() {
        ids.push(ctx.part_mut(ProverP).add_input(clause)?);
    }

    ctx.part_mut(BddP).set_order(order, var_count);

    for (clause, &id) in formula.iter().zip(ids.iter()) {
        let (root, validation) = load_clause(ctx.borrow(), clause, id)?;
        add_term(ctx.borrow(), root, validation);
    }

    log::info!(
        "Loaded {} clauses over {} variables",
        formula.len(),
        var_count
    );
    Ok(())
}

/// Build the BDD of an input clause and derive its validation from the clause.
///
/// The input clause is deleted once the validation is derived. Tautologies are represented by
/// the true terminal and have no validation, their input clause is deleted right away.
fn load_clause<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    clause: &[Lit],
    id: ClauseId,
) -> Result<(NodeRef, Option<ClauseId>), SolverError> {
    let order = ctx.part(BddP).order();

    // bottom level first
    let mut lits = clause.to_vec();
    lits.sort_unstable_by_key(|lit| (Reverse(order.level(lit.var())), lit.code()));
    lits.dedup();

    if lits.windows(2).any(|pair| pair[0].var() == pair[1].var()) {
        ctx.part_mut(ProverP).delete(&[id])?;
        return Ok((NodeRef::TRUE, None));
    }

    let mut root = NodeRef::FALSE;
    let mut candidates = Vec::with_capacity(2 * lits.len() + 1);

    for &lit in lits.iter() {
        let level = ctx.part(BddP).order().level(lit.var());
        root = if lit.is_positive() {
            find_or_make(ctx.borrow(), level, NodeRef::TRUE, root)?
        } else {
            find_or_make(ctx.borrow(), level, root, NodeRef::TRUE)?
        };
        let def = ctx.part(BddP).definition(root);
        candidates.push(def.true_up);
        candidates.push(def.false_up);
    }
    candidates.push(Some(id));

    let root_lit: ProofLit = ctx.part(BddP).proof_lit(root);
    let prover = ctx.part_mut(ProverP);
    let validation = prover.derive(&[root_lit], &candidates, None)?;
    prover.delete(&[id])?;

    Ok((root, validation))
}
