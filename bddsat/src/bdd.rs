//! Reduced ordered binary decision diagrams with proof generation.
//!
//! Every non-terminal node `N = ITE(x, H, L)` owns a fresh extension variable that never gets
//! reused. When a node is created, four defining clauses tie the extension variable to the
//! function of the node:
//!
//! * TrueUp `N ∨ ¬x ∨ ¬H`
//! * FalseUp `N ∨ x ∨ ¬L`
//! * TrueDown `¬N ∨ ¬x ∨ H`
//! * FalseDown `¬N ∨ x ∨ L`
//!
//! The up clauses are added by RAT on the fresh variable. The down clauses are added by RAT on
//! its negation, checked against the two up clauses. Operations that combine nodes justify their
//! results in terms of these clauses.
use std::fmt;

use partial_ref::{partial, PartialRef};
use rustc_hash::{FxHashMap, FxHashSet};

use bddsat_formula::Var;
use bddsat_lrat::ClauseId;

use crate::context::{parts::*, Context};
use crate::prover::ProofLit;
use crate::solver::SolverError;
use crate::variables::VarOrder;

pub mod apply;
pub mod gc;
pub mod imply;
pub mod quantify;
pub mod query;

/// Level of the terminal nodes, below every variable.
pub const TERMINAL_LEVEL: u32 = u32::max_value();

/// Level marking an arena slot on the free list.
const FREE_LEVEL: u32 = u32::max_value() - 1;

/// Reference to a node in the arena.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef(u32);

impl NodeRef {
    pub const FALSE: NodeRef = NodeRef(0);
    pub const TRUE: NodeRef = NodeRef(1);

    /// The terminal for a constant.
    pub fn constant(value: bool) -> NodeRef {
        if value {
            NodeRef::TRUE
        } else {
            NodeRef::FALSE
        }
    }

    pub fn is_terminal(self) -> bool {
        self.0 <= 1
    }

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NodeRef::FALSE => write!(f, "F"),
            NodeRef::TRUE => write!(f, "T"),
            NodeRef(index) => write!(f, "N{}", index),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ids of the defining clauses of a node. Tautologies are not added and have no id.
#[derive(Copy, Clone, Default, Debug)]
pub struct Definition {
    pub true_up: Option<ClauseId>,
    pub false_up: Option<ClauseId>,
    pub true_down: Option<ClauseId>,
    pub false_down: Option<ClauseId>,
}

impl Definition {
    fn ids(&self) -> impl Iterator<Item = ClauseId> {
        let clauses = [self.true_up, self.false_up, self.true_down, self.false_down];
        (0..4).filter_map(move |index| clauses[index])
    }
}

#[derive(Clone, Debug)]
struct Node {
    level: u32,
    high: NodeRef,
    low: NodeRef,
    /// Extension variable of the node.
    ext: Var,
    /// Number of parents and external retains.
    refs: u32,
    def: Definition,
}

impl Node {
    fn terminal() -> Node {
        Node {
            level: TERMINAL_LEVEL,
            high: NodeRef::FALSE,
            low: NodeRef::FALSE,
            ext: Var::from_index(0),
            refs: 0,
            def: Definition::default(),
        }
    }
}

/// Operations with memoized results.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Op {
    And,
    Or,
    Imply,
}

/// A memoized operation result with the proof clause justifying it.
#[derive(Copy, Clone, Debug)]
struct CacheEntry {
    result: NodeRef,
    clause: Option<ClauseId>,
}

/// Counters reported at the end of a run.
#[derive(Default, Debug, Clone)]
pub struct BddStats {
    pub nodes_created: u64,
    pub nodes_removed: u64,
    pub max_live_nodes: usize,
    pub apply_count: u64,
    pub cached_with_proof: u64,
    pub cached_without_proof: u64,
    pub cache_removed: u64,
    pub gc_count: u64,
}

/// Node arena, unique table and operation cache.
pub struct Bdd {
    nodes: Vec<Node>,
    free: Vec<NodeRef>,
    unique: FxHashMap<(u32, NodeRef, NodeRef), NodeRef>,
    cache: FxHashMap<(Op, NodeRef, NodeRef), CacheEntry>,
    order: VarOrder,
    /// Index of the next extension variable.
    next_ext: usize,
    /// Input variables quantified so far.
    quantified: FxHashSet<Var>,
    /// Size of `quantified` at the last garbage collection.
    quantified_at_gc: usize,
    stats: BddStats,
}

impl Default for Bdd {
    fn default() -> Bdd {
        Bdd {
            nodes: vec![Node::terminal(), Node::terminal()],
            free: vec![],
            unique: FxHashMap::default(),
            cache: FxHashMap::default(),
            order: VarOrder::identity(0),
            next_ext: 0,
            quantified: FxHashSet::default(),
            quantified_at_gc: 0,
            stats: BddStats::default(),
        }
    }
}

impl Bdd {
    /// Set the variable order for a formula over `var_count` variables.
    ///
    /// Extension variables are numbered after all input variables.
    pub fn set_order(&mut self, order: VarOrder, var_count: usize) {
        self.next_ext = var_count.max(order.len());
        self.order = order;
    }

    pub fn order(&self) -> &VarOrder {
        &self.order
    }

    /// Number of input variables.
    pub fn var_count(&self) -> usize {
        self.order.len()
    }

    pub fn stats(&self) -> &BddStats {
        &self.stats
    }

    /// Number of nodes currently in the unique table.
    pub fn live_nodes(&self) -> usize {
        self.unique.len()
    }

    /// Number of distinct input variables quantified so far.
    pub fn quantified_vars(&self) -> usize {
        self.quantified.len()
    }

    fn node(&self, node: NodeRef) -> &Node {
        let node = &self.nodes[node.index()];
        debug_assert_ne!(node.level, FREE_LEVEL);
        node
    }

    /// Level of a node, [`TERMINAL_LEVEL`] for terminals.
    pub fn level(&self, node: NodeRef) -> u32 {
        self.node(node).level
    }

    pub fn high(&self, node: NodeRef) -> NodeRef {
        self.node(node).high
    }

    pub fn low(&self, node: NodeRef) -> NodeRef {
        self.node(node).low
    }

    /// Input variable a non-terminal node branches on.
    pub fn var(&self, node: NodeRef) -> Var {
        self.order.var(self.level(node))
    }

    /// Extension variable of a non-terminal node.
    pub fn ext_var(&self, node: NodeRef) -> Var {
        self.node(node).ext
    }

    pub fn definition(&self, node: NodeRef) -> Definition {
        self.node(node).def
    }

    /// The node as a literal of a proof clause.
    pub fn proof_lit(&self, node: NodeRef) -> ProofLit {
        match node {
            NodeRef::FALSE => ProofLit::Const(false),
            NodeRef::TRUE => ProofLit::Const(true),
            _ => ProofLit::Lit(self.node(node).ext.positive()),
        }
    }

    /// The two cofactors of a node with respect to the variable at `level`.
    pub fn cofactors(&self, node: NodeRef, level: u32) -> (NodeRef, NodeRef) {
        let node_data = self.node(node);
        if node_data.level == level {
            (node_data.high, node_data.low)
        } else {
            debug_assert!(node_data.level > level);
            (node, node)
        }
    }

    /// The down clauses of a node, if it branches on the variable at `level`.
    pub fn down_clauses(&self, node: NodeRef, level: u32) -> [Option<ClauseId>; 2] {
        let node_data = self.node(node);
        if node_data.level == level {
            [node_data.def.true_down, node_data.def.false_down]
        } else {
            [None, None]
        }
    }

    /// The up clauses of a node, if it branches on the variable at `level`.
    pub fn up_clauses(&self, node: NodeRef, level: u32) -> [Option<ClauseId>; 2] {
        let node_data = self.node(node);
        if node_data.level == level {
            [node_data.def.true_up, node_data.def.false_up]
        } else {
            [None, None]
        }
    }

    /// Count an external reference to a node.
    pub fn retain(&mut self, node: NodeRef) {
        if !node.is_terminal() {
            self.nodes[node.index()].refs += 1;
        }
    }

    /// Drop an external reference to a node.
    ///
    /// The node is not freed before the next garbage collection.
    pub fn release(&mut self, node: NodeRef) {
        if !node.is_terminal() {
            let refs = &mut self.nodes[node.index()].refs;
            debug_assert!(*refs > 0);
            *refs -= 1;
        }
    }

    fn cached(&self, op: Op, a: NodeRef, b: NodeRef) -> Option<CacheEntry> {
        self.cache.get(&(op, a, b)).copied()
    }

    fn insert_cache(&mut self, op: Op, a: NodeRef, b: NodeRef, entry: CacheEntry) {
        if entry.clause.is_some() {
            self.stats.cached_with_proof += 1;
        } else {
            self.stats.cached_without_proof += 1;
        }
        self.cache.insert((op, a, b), entry);
    }

    fn alloc(&mut self, node: Node) -> NodeRef {
        match self.free.pop() {
            Some(node_ref) => {
                self.nodes[node_ref.index()] = node;
                node_ref
            }
            None => {
                self.nodes.push(node);
                NodeRef((self.nodes.len() - 1) as u32)
            }
        }
    }
}

/// The node `ITE(x, high, low)` for the variable `x` at `level`.
///
/// Returns an existing node when there is one. A new node gets a fresh extension variable and its
/// defining clauses are added to the proof.
pub fn find_or_make<'a>(
    mut ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    level: u32,
    high: NodeRef,
    low: NodeRef,
) -> Result<NodeRef, SolverError> {
    if high == low {
        return Ok(high);
    }

    let (bdd, mut ctx) = ctx.split_part_mut(BddP);

    if let Some(&node) = bdd.unique.get(&(level, high, low)) {
        return Ok(node);
    }

    debug_assert!(level < bdd.level(high) && level < bdd.level(low));

    let ext = Var::from_index(bdd.next_ext);
    bdd.next_ext += 1;

    let node_lit = ProofLit::Lit(ext.positive());
    let var_lit = ProofLit::Lit(bdd.order.var(level).positive());
    let high_lit = bdd.proof_lit(high);
    let low_lit = bdd.proof_lit(low);

    let prover = ctx.part_mut(ProverP);

    let true_up = prover.define(&[node_lit, !var_lit, !high_lit], &[])?;
    let false_up = prover.define(&[node_lit, var_lit, !low_lit], &[])?;

    let hints: Vec<i64> = [true_up, false_up]
        .iter()
        .flatten()
        .map(|&id| -(id as i64))
        .collect();

    let true_down = prover.define(&[!node_lit, !var_lit, high_lit], &hints)?;
    let false_down = prover.define(&[!node_lit, var_lit, low_lit], &hints)?;

    for &child in [high, low].iter() {
        bdd.retain(child);
    }

    let node = bdd.alloc(Node {
        level,
        high,
        low,
        ext,
        refs: 0,
        def: Definition {
            true_up,
            false_up,
            true_down,
            false_down,
        },
    });

    bdd.unique.insert((level, high, low), node);
    bdd.stats.nodes_created += 1;
    bdd.stats.max_live_nodes = bdd.stats.max_live_nodes.max(bdd.unique.len());

    log::trace!(
        "{} = ITE({}, {}, {}) with variable {}",
        node,
        bdd.order.var(level),
        high,
        low,
        ext
    );

    Ok(node)
}

/// The node of a single literal of an input variable.
#[cfg(test)]
pub fn literal<'a>(
    ctx: partial!(Context<'a>, mut BddP, mut ProverP<'a>),
    var: Var,
    polarity: bool,
) -> Result<NodeRef, SolverError> {
    let level = ctx.part(BddP).order.level(var);
    find_or_make(
        ctx,
        level,
        NodeRef::constant(polarity),
        NodeRef::constant(!polarity),
    )
}
