//! Conjunction and disjunction of BDDs.
use partial_ref::{partial, PartialRef};

use bddsat_lrat::ClauseId;

use crate::context::{parts::*, Context};
use crate::solver::SolverError;

use super::{find_or_make, CacheEntry, NodeRef, Op};

/// Conjunction of two BDDs.
///
/// Returns the result `W` together with the id of a clause `¬A ∨ ¬B ∨ W`. The clause is `None`
/// when it is a tautology, i.e. for terminal cases and when `W` is one of the operands.
///
/// The clause belongs to the operation cache and is deleted when the cache entry is reclaimed.
pub fn apply_and<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    a: NodeRef,
    b: NodeRef,
) -> Result<(NodeRef, Option<ClauseId>), SolverError> {
    if a == NodeRef::FALSE || b == NodeRef::FALSE {
        return Ok((NodeRef::FALSE, None));
    }
    if a == NodeRef::TRUE {
        return Ok((b, None));
    }
    if b == NodeRef::TRUE || a == b {
        return Ok((a, None));
    }

    let (a, b) = if a < b { (a, b) } else { (b, a) };

    let bdd = ctx.part_mut(BddP);
    if let Some(entry) = bdd.cached(Op::And, a, b) {
        return Ok((entry.result, entry.clause));
    }
    bdd.stats.apply_count += 1;

    let level = bdd.level(a).min(bdd.level(b));
    let (a_high, a_low) = bdd.cofactors(a, level);
    let (b_high, b_low) = bdd.cofactors(b, level);

    let (w_high, j_high) = apply_and(ctx.borrow(), a_high, b_high)?;
    let (w_low, j_low) = apply_and(ctx.borrow(), a_low, b_low)?;
    let w = find_or_make(ctx.borrow(), level, w_high, w_low)?;

    let (bdd, mut ctx) = ctx.split_part_mut(BddP);

    let mut candidates = Vec::with_capacity(8);
    candidates.extend_from_slice(&bdd.down_clauses(a, level));
    candidates.extend_from_slice(&bdd.down_clauses(b, level));
    candidates.push(j_high);
    candidates.push(j_low);
    candidates.extend_from_slice(&bdd.up_clauses(w, level));

    let target = [!bdd.proof_lit(a), !bdd.proof_lit(b), bdd.proof_lit(w)];
    let split = bdd.order().var(level);

    let clause = ctx
        .part_mut(ProverP)
        .derive(&target, &candidates, Some(split))?;

    bdd.insert_cache(Op::And, a, b, CacheEntry { result: w, clause });

    Ok((w, clause))
}

/// Disjunction of two BDDs, without justification.
pub fn apply_or<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    a: NodeRef,
    b: NodeRef,
) -> Result<NodeRef, SolverError> {
    if a == NodeRef::TRUE || b == NodeRef::TRUE {
        return Ok(NodeRef::TRUE);
    }
    if a == NodeRef::FALSE {
        return Ok(b);
    }
    if b == NodeRef::FALSE || a == b {
        return Ok(a);
    }

    let (a, b) = if a < b { (a, b) } else { (b, a) };

    let bdd = ctx.part_mut(BddP);
    if let Some(entry) = bdd.cached(Op::Or, a, b) {
        return Ok(entry.result);
    }
    bdd.stats.apply_count += 1;

    let level = bdd.level(a).min(bdd.level(b));
    let (a_high, a_low) = bdd.cofactors(a, level);
    let (b_high, b_low) = bdd.cofactors(b, level);

    let high = apply_or(ctx.borrow(), a_high, b_high)?;
    let low = apply_or(ctx.borrow(), a_low, b_low)?;
    let w = find_or_make(ctx.borrow(), level, high, low)?;

    ctx.part_mut(BddP).insert_cache(
        Op::Or,
        a,
        b,
        CacheEntry {
            result: w,
            clause: None,
        },
    );

    Ok(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use bddsat_formula::{lits, var};

    use crate::bdd::{literal, tests::test_context};

    #[test]
    fn conjunction_is_canonical() {
        let mut proof = vec![];
        let mut ctx_box = test_context(3, &mut proof);
        let mut ctx = ctx_box.into_partial_ref_mut();

        let x1 = literal(ctx.borrow(), var!(1), true).unwrap();
        let x2 = literal(ctx.borrow(), var!(2), true).unwrap();
        let not_x1 = literal(ctx.borrow(), var!(1), false).unwrap();

        let (w, clause) = apply_and(ctx.borrow(), x1, x2).unwrap();
        let (w_swapped, clause_swapped) = apply_and(ctx.borrow(), x2, x1).unwrap();
        assert_eq!(w, w_swapped);
        assert_eq!(clause, clause_swapped);

        let bdd = ctx.part(BddP);
        assert_eq!(bdd.level(w), 0);
        assert_eq!(bdd.high(w), x2);
        assert_eq!(bdd.low(w), NodeRef::FALSE);

        let (nothing, _) = apply_and(ctx.borrow(), x1, not_x1).unwrap();
        assert_eq!(nothing, NodeRef::FALSE);

        let either = apply_or(ctx.borrow(), x1, x2).unwrap();
        let (same, trivial) = apply_and(ctx.borrow(), w, either).unwrap();
        assert_eq!(same, w);
        assert_eq!(trivial, None);

        let everything = apply_or(ctx.borrow(), x1, not_x1).unwrap();
        assert_eq!(everything, NodeRef::TRUE);
    }

    #[test]
    fn conjunction_clause() {
        let mut proof = vec![];
        let mut ctx_box = test_context(2, &mut proof);
        let mut ctx = ctx_box.into_partial_ref_mut();

        let x1 = literal(ctx.borrow(), var!(1), true).unwrap();
        let x2 = literal(ctx.borrow(), var!(2), true).unwrap();
        let (w, clause) = apply_and(ctx.borrow(), x1, x2).unwrap();

        let bdd = ctx.part(BddP);
        let target = lits![
            -bdd.ext_var(x1).to_dimacs(),
            -bdd.ext_var(x2).to_dimacs(),
            bdd.ext_var(w).to_dimacs()
        ];
        let clause = clause.unwrap();
        assert_eq!(ctx.part(ProverP).clause(clause), Some(&target[..]));

        let (_, cached) = apply_and(ctx.borrow(), x1, x2).unwrap();
        assert_eq!(cached, Some(clause));
        assert_eq!(ctx.part(BddP).stats().cached_with_proof, 1);
    }
}
