//! Reclamation of unreferenced nodes.
use partial_ref::{partial, PartialRef};
use rustc_hash::FxHashSet;

use bddsat_lrat::ClauseId;

use crate::context::{parts::*, Context};
use crate::solver::SolverError;

use super::{NodeRef, FREE_LEVEL};

/// Free all nodes without references, their cache entries and their proof clauses.
///
/// Returns the number of freed nodes.
pub fn collect_garbage<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
) -> Result<usize, SolverError> {
    let (bdd, mut ctx) = ctx.split_part_mut(BddP);

    let mut pending: Vec<NodeRef> = (2..bdd.nodes.len())
        .map(|index| NodeRef(index as u32))
        .filter(|&node| {
            let node = &bdd.nodes[node.index()];
            node.level < FREE_LEVEL && node.refs == 0
        })
        .collect();

    let mut freed = FxHashSet::default();
    let mut clauses: Vec<ClauseId> = vec![];

    while let Some(node_ref) = pending.pop() {
        let node = &mut bdd.nodes[node_ref.index()];
        let (level, high, low) = (node.level, node.high, node.low);
        clauses.extend(node.def.ids());
        node.level = FREE_LEVEL;

        bdd.unique.remove(&(level, high, low));
        bdd.free.push(node_ref);
        freed.insert(node_ref);

        for &child in [high, low].iter() {
            if !child.is_terminal() {
                let child_node = &mut bdd.nodes[child.index()];
                child_node.refs -= 1;
                if child_node.refs == 0 {
                    pending.push(child);
                }
            }
        }
    }

    if freed.is_empty() {
        bdd.quantified_at_gc = bdd.quantified.len();
        return Ok(0);
    }

    let cache_before = bdd.cache.len();
    bdd.cache.retain(|&(_, a, b), entry| {
        let keep = !(freed.contains(&a) || freed.contains(&b) || freed.contains(&entry.result));
        if !keep {
            clauses.extend(entry.clause);
        }
        keep
    });
    let cache_removed = cache_before - bdd.cache.len();

    ctx.part_mut(ProverP).delete(&clauses)?;

    bdd.stats.gc_count += 1;
    bdd.stats.nodes_removed += freed.len() as u64;
    bdd.stats.cache_removed += cache_removed as u64;
    bdd.quantified_at_gc = bdd.quantified.len();

    log::debug!(
        "GC freed {} nodes and {} cache entries, {} nodes remain",
        freed.len(),
        cache_removed,
        bdd.unique.len()
    );

    Ok(freed.len())
}

/// Collect garbage if more than `threshold` variables were quantified since the last collection.
pub fn maybe_collect<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    threshold: usize,
) -> Result<(), SolverError> {
    let bdd = ctx.part(BddP);
    if bdd.quantified.len() - bdd.quantified_at_gc > threshold {
        collect_garbage(ctx.borrow())?;
    }
    Ok(())
}

/// Whether a node was not freed.
#[cfg(test)]
pub fn is_live(bdd: &super::Bdd, node: NodeRef) -> bool {
    let level = bdd.nodes[node.index()].level;
    level == super::TERMINAL_LEVEL || level < FREE_LEVEL
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use bddsat_formula::var;

    use crate::bdd::{apply::apply_and, literal, tests::test_context};

    #[test]
    fn unreferenced_nodes_are_freed() {
        let mut proof = vec![];
        {
            let mut ctx_box = test_context(3, &mut proof);
            let mut ctx = ctx_box.into_partial_ref_mut();

            let x1 = literal(ctx.borrow(), var!(1), true).unwrap();
            let x2 = literal(ctx.borrow(), var!(2), true).unwrap();
            let x3 = literal(ctx.borrow(), var!(3), true).unwrap();
            let (x12, clause) = apply_and(ctx.borrow(), x1, x2).unwrap();
            let (x23, _) = apply_and(ctx.borrow(), x2, x3).unwrap();
            ctx.part_mut(BddP).retain(x12);

            let live_clauses = ctx.part(ProverP).live_clauses();

            // x1, x3 and x23 are unreferenced, x2 is a child of x12
            assert_eq!(collect_garbage(ctx.borrow()).unwrap(), 3);

            let bdd = ctx.part(BddP);
            assert!(is_live(bdd, x12));
            assert!(is_live(bdd, x2));
            assert!(!is_live(bdd, x1));
            assert!(!is_live(bdd, x23));
            assert_eq!(bdd.live_nodes(), 2);
            assert_eq!(bdd.stats().nodes_removed, 3);
            assert!(ctx.part(ProverP).clause(clause.unwrap()).is_none());
            assert!(ctx.part(ProverP).live_clauses() < live_clauses);

            assert_eq!(collect_garbage(ctx.borrow()).unwrap(), 0);
            assert_eq!(ctx.part(BddP).stats().gc_count, 1);

            // freed slots are reused, the extension variable is fresh
            let again = literal(ctx.borrow(), var!(3), true).unwrap();
            assert!(again == x1 || again == x3 || again == x23);
            assert_eq!(ctx.part(BddP).ext_var(again), var!(9));

            ctx.part_mut(BddP).release(x12);
            assert_eq!(collect_garbage(ctx.borrow()).unwrap(), 3);
            assert_eq!(ctx.part(BddP).live_nodes(), 0);
        }

        let text = String::from_utf8(proof).unwrap();
        assert_eq!(text.lines().filter(|line| line.contains(" d ")).count(), 2);
    }
}
