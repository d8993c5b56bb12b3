//! Proofs of implications between BDDs.
use partial_ref::{partial, PartialRef};

use bddsat_lrat::ClauseId;

use crate::context::{parts::*, Context};
use crate::solver::SolverError;

use super::{CacheEntry, NodeRef, Op};

/// Derive the clause `¬U ∨ V` stating that `u` implies `v`.
///
/// Returns `None` when the clause is a tautology. Fails if `u` does not imply `v`.
pub fn justify_imply<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    u: NodeRef,
    v: NodeRef,
) -> Result<Option<ClauseId>, SolverError> {
    if u == v || u == NodeRef::FALSE || v == NodeRef::TRUE {
        return Ok(None);
    }
    if u == NodeRef::TRUE || v == NodeRef::FALSE {
        return Err(SolverError::ImplicationFailed);
    }

    let bdd = ctx.part(BddP);
    if let Some(entry) = bdd.cached(Op::Imply, u, v) {
        return Ok(entry.clause);
    }

    let level = bdd.level(u).min(bdd.level(v));
    let (u_high, u_low) = bdd.cofactors(u, level);
    let (v_high, v_low) = bdd.cofactors(v, level);

    let j_high = justify_imply(ctx.borrow(), u_high, v_high)?;
    let j_low = justify_imply(ctx.borrow(), u_low, v_low)?;

    let (bdd, mut ctx) = ctx.split_part_mut(BddP);

    let mut candidates = Vec::with_capacity(6);
    candidates.extend_from_slice(&bdd.down_clauses(u, level));
    candidates.extend_from_slice(&bdd.up_clauses(v, level));
    candidates.push(j_high);
    candidates.push(j_low);

    let target = [!bdd.proof_lit(u), bdd.proof_lit(v)];
    let split = bdd.order().var(level);

    let clause = ctx
        .part_mut(ProverP)
        .derive(&target, &candidates, Some(split))?;

    bdd.insert_cache(Op::Imply, u, v, CacheEntry { result: v, clause });

    Ok(clause)
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use bddsat_formula::{lits, var};

    use crate::bdd::{
        apply::{apply_and, apply_or},
        literal,
        tests::test_context,
    };

    #[test]
    fn implications() {
        let mut proof = vec![];
        let mut ctx_box = test_context(3, &mut proof);
        let mut ctx = ctx_box.into_partial_ref_mut();

        let x1 = literal(ctx.borrow(), var!(1), true).unwrap();
        let x3 = literal(ctx.borrow(), var!(3), true).unwrap();
        let (both, _) = apply_and(ctx.borrow(), x1, x3).unwrap();
        let either = apply_or(ctx.borrow(), x1, x3).unwrap();

        let clause = justify_imply(ctx.borrow(), both, either).unwrap().unwrap();
        let bdd = ctx.part(BddP);
        let expected = lits![
            -bdd.ext_var(both).to_dimacs(),
            bdd.ext_var(either).to_dimacs()
        ];
        assert_eq!(ctx.part(ProverP).clause(clause), Some(&expected[..]));

        assert_eq!(
            justify_imply(ctx.borrow(), both, either).unwrap(),
            Some(clause)
        );
        assert_eq!(justify_imply(ctx.borrow(), x1, x1).unwrap(), None);
        assert_eq!(
            justify_imply(ctx.borrow(), NodeRef::FALSE, x3).unwrap(),
            None
        );

        match justify_imply(ctx.borrow(), either, both) {
            Err(SolverError::ImplicationFailed) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}
