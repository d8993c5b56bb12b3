//! Restriction and existential quantification.
use partial_ref::{partial, PartialRef};
use rustc_hash::FxHashMap;

use bddsat_formula::Var;

use crate::context::{parts::*, Context};
use crate::solver::SolverError;

use super::{apply::apply_or, find_or_make, NodeRef};

/// Cofactor of a BDD with the variable at `level` fixed to `value`.
pub fn restrict<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    node: NodeRef,
    level: u32,
    value: bool,
) -> Result<NodeRef, SolverError> {
    let mut memo = FxHashMap::default();
    restrict_memo(ctx.borrow(), node, level, value, &mut memo)
}

fn restrict_memo<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    node: NodeRef,
    level: u32,
    value: bool,
    memo: &mut FxHashMap<NodeRef, NodeRef>,
) -> Result<NodeRef, SolverError> {
    let bdd = ctx.part(BddP);
    let node_level = bdd.level(node);

    if node_level > level {
        return Ok(node);
    }
    if node_level == level {
        return Ok(if value { bdd.high(node) } else { bdd.low(node) });
    }
    if let Some(&result) = memo.get(&node) {
        return Ok(result);
    }

    let (high, low) = (bdd.high(node), bdd.low(node));
    let high = restrict_memo(ctx.borrow(), high, level, value, memo)?;
    let low = restrict_memo(ctx.borrow(), low, level, value, memo)?;
    let result = find_or_make(ctx.borrow(), node_level, high, low)?;

    memo.insert(node, result);
    Ok(result)
}

/// Existentially quantify input variables, one after another in the given order.
pub fn exists<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    mut node: NodeRef,
    vars: &[Var],
) -> Result<NodeRef, SolverError> {
    for &var in vars {
        let bdd = ctx.part_mut(BddP);
        bdd.quantified.insert(var);
        let level = bdd.order.level(var);

        let high = restrict(ctx.borrow(), node, level, true)?;
        let low = restrict(ctx.borrow(), node, level, false)?;
        node = apply_or(ctx.borrow(), high, low)?;
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use bddsat_formula::var;

    use crate::bdd::{apply::apply_and, literal, tests::test_context};

    #[test]
    fn quantify_conjunction() {
        let mut proof = vec![];
        let mut ctx_box = test_context(3, &mut proof);
        let mut ctx = ctx_box.into_partial_ref_mut();

        let x1 = literal(ctx.borrow(), var!(1), true).unwrap();
        let x2 = literal(ctx.borrow(), var!(2), true).unwrap();
        let x3 = literal(ctx.borrow(), var!(3), false).unwrap();
        let (x12, _) = apply_and(ctx.borrow(), x1, x2).unwrap();
        let (x123, _) = apply_and(ctx.borrow(), x12, x3).unwrap();

        assert_eq!(restrict(ctx.borrow(), x123, 1, false).unwrap(), NodeRef::FALSE);
        let (x13, _) = apply_and(ctx.borrow(), x1, x3).unwrap();
        assert_eq!(restrict(ctx.borrow(), x123, 1, true).unwrap(), x13);

        assert_eq!(exists(ctx.borrow(), x123, &[var!(2)]).unwrap(), x13);
        assert_eq!(
            exists(ctx.borrow(), x123, &[var!(3), var!(1)]).unwrap(),
            x2
        );
        assert_eq!(
            exists(ctx.borrow(), x123, &[var!(1), var!(2), var!(3)]).unwrap(),
            NodeRef::TRUE
        );
        assert_eq!(ctx.part(BddP).quantified_vars(), 3);

        // not in the support
        assert_eq!(exists(ctx.borrow(), x2, &[var!(3)]).unwrap(), x2);
    }
}
