//! Queries that don't modify BDDs.
use num_bigint::BigUint;
use rustc_hash::{FxHashMap, FxHashSet};

use bddsat_formula::{Lit, Var};

use super::{Bdd, NodeRef};

impl Bdd {
    /// Number of distinct non-terminal nodes reachable from a root.
    pub fn size(&self, root: NodeRef) -> usize {
        let mut seen = FxHashSet::default();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if node.is_terminal() || !seen.insert(node) {
                continue;
            }
            pending.push(self.high(node));
            pending.push(self.low(node));
        }
        seen.len()
    }

    /// Input variables a BDD depends on, from the top level down.
    pub fn support(&self, root: NodeRef) -> Vec<Var> {
        let mut seen = FxHashSet::default();
        let mut levels = FxHashSet::default();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            if node.is_terminal() || !seen.insert(node) {
                continue;
            }
            levels.insert(self.level(node));
            pending.push(self.high(node));
            pending.push(self.low(node));
        }
        let mut levels: Vec<u32> = levels.into_iter().collect();
        levels.sort_unstable();
        levels.into_iter().map(|level| self.order.var(level)).collect()
    }

    /// Number of satisfying assignments over all input variables.
    pub fn sat_count(&self, root: NodeRef) -> BigUint {
        let max = BigUint::from(1u32) << self.var_count();
        let mut cache = FxHashMap::default();
        self.sat_count_rec(root, &max, &mut cache)
    }

    fn sat_count_rec(
        &self,
        node: NodeRef,
        max: &BigUint,
        cache: &mut FxHashMap<NodeRef, BigUint>,
    ) -> BigUint {
        match node {
            NodeRef::FALSE => return BigUint::from(0u32),
            NodeRef::TRUE => return max.clone(),
            _ => (),
        }
        if let Some(count) = cache.get(&node) {
            return count.clone();
        }
        let high = self.sat_count_rec(self.high(node), max, cache);
        let low = self.sat_count_rec(self.low(node), max, cache);
        // every node halves the assignments on each branch
        let count: BigUint = (high + low) >> 1;
        cache.insert(node, count.clone());
        count
    }

    /// Literals along one path to the true terminal, preferring high branches.
    ///
    /// Variables not on the path can take any value. Returns `None` for the false terminal.
    pub fn witness(&self, root: NodeRef) -> Option<Vec<Lit>> {
        if root == NodeRef::FALSE {
            return None;
        }
        let mut lits = vec![];
        let mut node = root;
        while !node.is_terminal() {
            let var = self.var(node);
            if self.high(node) != NodeRef::FALSE {
                lits.push(var.positive());
                node = self.high(node);
            } else {
                lits.push(var.negative());
                node = self.low(node);
            }
        }
        Some(lits)
    }
}
