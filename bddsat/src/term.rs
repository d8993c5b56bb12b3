//! Validated BDDs.
//!
//! A term is a BDD root together with the unit clause `[root]` that the proof derived for it. The
//! conjunction of all active terms is implied by the input formula.
use std::collections::BTreeMap;

use partial_ref::{partial, PartialRef};

use bddsat_formula::Var;
use bddsat_lrat::ClauseId;

use crate::bdd::{
    apply::apply_and, gc::maybe_collect, imply::justify_imply, quantify::exists, NodeRef,
};
use crate::context::{parts::*, Context};
use crate::solver::SolverError;

/// Identifies a term. The terms of the input clauses share the ids of their clauses.
pub type TermId = usize;

#[derive(Copy, Clone, Debug)]
pub struct Term {
    pub root: NodeRef,
    /// Id of the unit clause `[root]`, `None` for the true terminal.
    pub validation: Option<ClauseId>,
}

/// Active terms.
#[derive(Default)]
pub struct Terms {
    active: BTreeMap<TermId, Term>,
    last_id: TermId,
    unsat: bool,
}

impl Terms {
    pub fn get(&self, id: TermId) -> Option<Term> {
        self.active.get(&id).copied()
    }

    pub fn contains(&self, id: TermId) -> bool {
        self.active.contains_key(&id)
    }

    /// Ids of the active terms in increasing order.
    pub fn ids(&self) -> impl Iterator<Item = TermId> + '_ {
        self.active.keys().copied()
    }

    /// Number of active terms.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether the empty clause was derived.
    pub fn is_unsat(&self) -> bool {
        self.unsat
    }

    fn take(&mut self, id: TermId) -> Result<Term, SolverError> {
        self.active
            .remove(&id)
            .ok_or(SolverError::UnknownTerm { id })
    }
}

/// Make a BDD an active term.
pub fn add_term<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut TermsP),
    root: NodeRef,
    validation: Option<ClauseId>,
) -> TermId {
    ctx.part_mut(BddP).retain(root);
    let terms = ctx.part_mut(TermsP);
    terms.last_id += 1;
    terms.active.insert(terms.last_id, Term { root, validation });
    if root == NodeRef::FALSE {
        terms.unsat = true;
    }
    terms.last_id
}

/// Replace two terms by their conjunction.
pub fn combine<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>, mut TermsP),
    a: TermId,
    b: TermId,
) -> Result<TermId, SolverError> {
    let terms = ctx.part_mut(TermsP);
    let term_a = terms.take(a)?;
    let term_b = match terms.take(b) {
        Ok(term) => term,
        Err(err) => {
            terms.active.insert(a, term_a);
            return Err(err);
        }
    };

    let (root, implication) = apply_and(ctx.borrow(), term_a.root, term_b.root)?;

    let validation = if implication.is_none() && root == term_a.root {
        term_a.validation
    } else if implication.is_none() && root == term_b.root {
        term_b.validation
    } else {
        let proof_lit = ctx.part(BddP).proof_lit(root);
        ctx.part_mut(ProverP).derive(
            &[proof_lit],
            &[term_a.validation, term_b.validation, implication],
            None,
        )?
    };

    let unused: Vec<ClauseId> = [term_a.validation, term_b.validation]
        .iter()
        .flatten()
        .copied()
        .filter(|&id| Some(id) != validation)
        .collect();
    ctx.part_mut(ProverP).delete(&unused)?;

    let bdd = ctx.part_mut(BddP);
    bdd.release(term_a.root);
    bdd.release(term_b.root);

    let id = add_term(ctx.borrow(), root, validation);

    log::debug!(
        "T{} (Node {}) & T{} (Node {}) --> T{} (Node {})",
        a,
        term_a.root,
        b,
        term_b.root,
        id,
        root
    );
    ctx.part_mut(ProverP).comment(format_args!(
        "T{} (Node {}) & T{} (Node {}) --> T{} (Node {})",
        a, term_a.root, b, term_b.root, id, root
    ))?;

    Ok(id)
}

/// Replace a term by its existential quantification over the given input variables.
pub fn quantify<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut BddP,
        mut ProverP<'a>,
        mut TermsP,
        SolverConfigP
    ),
    id: TermId,
    vars: &[Var],
) -> Result<TermId, SolverError> {
    let term = ctx.part_mut(TermsP).take(id)?;

    let root = exists(ctx.borrow(), term.root, vars)?;

    let validation = if root == term.root {
        term.validation
    } else {
        let implication = justify_imply(ctx.borrow(), term.root, root)?;
        let proof_lit = ctx.part(BddP).proof_lit(root);
        let prover = ctx.part_mut(ProverP);
        let validation = prover.derive(&[proof_lit], &[term.validation, implication], None)?;
        if let Some(old) = term.validation {
            prover.delete(&[old])?;
        }
        validation
    };

    ctx.part_mut(BddP).release(term.root);
    let new_id = add_term(ctx.borrow(), root, validation);

    log::debug!(
        "T{} (Node {}) quantified over {} variables --> T{} (Node {})",
        id,
        term.root,
        vars.len(),
        new_id,
        root
    );
    ctx.part_mut(ProverP).comment(format_args!(
        "EQuant(T{} (Node {})) --> T{} (Node {})",
        id, term.root, new_id, root
    ))?;

    let threshold = ctx.part(SolverConfigP).gc_threshold;
    maybe_collect(ctx.borrow(), threshold)?;

    Ok(new_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use bddsat_formula::{lits, var};

    use crate::bdd::{literal, tests::test_context};

    #[test]
    fn combine_and_quantify() {
        let mut proof = vec![];
        let mut ctx_box = test_context(2, &mut proof);
        let mut ctx = ctx_box.into_partial_ref_mut();

        let input_a = ctx.part_mut(ProverP).add_input(&lits![1]).unwrap();
        let input_b = ctx.part_mut(ProverP).add_input(&lits![2]).unwrap();

        let x1 = literal(ctx.borrow(), var!(1), true).unwrap();
        let x2 = literal(ctx.borrow(), var!(2), true).unwrap();

        // the unit clauses [x1] and [x2] of the nodes
        let mut units = vec![];
        for &(node, input) in [(x1, input_a), (x2, input_b)].iter() {
            let bdd = ctx.part(BddP);
            let (lit, true_up) = (bdd.proof_lit(node), bdd.definition(node).true_up);
            let unit = ctx
                .part_mut(ProverP)
                .derive(&[lit], &[true_up, Some(input)], None)
                .unwrap();
            units.push(unit);
        }
        let (val_a, val_b) = (units[0], units[1]);

        let a = add_term(ctx.borrow(), x1, val_a);
        let b = add_term(ctx.borrow(), x2, val_b);
        assert_eq!((a, b), (1, 2));

        let both = combine(ctx.borrow(), a, b).unwrap();
        assert_eq!(both, 3);
        assert!(!ctx.part(TermsP).contains(a));
        assert!(ctx.part(ProverP).clause(val_a.unwrap()).is_none());

        let term = ctx.part(TermsP).get(both).unwrap();
        assert_eq!(ctx.part(BddP).size(term.root), 2);
        let unit = ctx.part(ProverP).clause(term.validation.unwrap()).unwrap();
        assert_eq!(unit, &[ctx.part(BddP).ext_var(term.root).positive()]);

        let top = quantify(ctx.borrow(), both, &[var!(2)]).unwrap();
        let term = ctx.part(TermsP).get(top).unwrap();
        assert_eq!(term.root, x1);
        assert!(term.validation.is_some());

        let unchanged = quantify(ctx.borrow(), top, &[var!(2)]).unwrap();
        assert_eq!(
            ctx.part(TermsP).get(unchanged).unwrap().validation,
            term.validation
        );

        let everything = quantify(ctx.borrow(), unchanged, &[var!(1)]).unwrap();
        let term = ctx.part(TermsP).get(everything).unwrap();
        assert_eq!(term.root, NodeRef::TRUE);
        assert_eq!(term.validation, None);
        assert_eq!(ctx.part(TermsP).len(), 1);
        assert!(!ctx.part(TermsP).is_unsat());

        match combine(ctx.borrow(), everything, 17) {
            Err(SolverError::UnknownTerm { id: 17 }) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert!(ctx.part(TermsP).contains(everything));
    }
}
