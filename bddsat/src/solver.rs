//! Proof producing BDD based solver.
use std::io;

use anyhow::Error;
use partial_ref::{partial, IntoPartialRef, IntoPartialRefMut, PartialRef};
use thiserror::Error;

use bddsat_dimacs::DimacsParser;
use bddsat_formula::{CnfFormula, Lit, Var};
use bddsat_lrat::{ProofFormat, ProofWriter};

use crate::bdd::NodeRef;
use crate::config::SolverConfigUpdate;
use crate::context::{parts::*, Context};
use crate::load::load_formula;
use crate::schedule::ScheduleError;
use crate::state::Outcome;
use crate::strategy::Strategy;
use crate::term::TermId;
use crate::variables::{OrderError, VarOrder};

/// Possible errors while solving a formula.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("{0}")]
    Schedule(#[from] ScheduleError),
    #[error("{0}")]
    Order(#[from] OrderError),
    #[error("Could not justify clause {:?}", clause)]
    JustificationFailed { clause: Vec<isize> },
    #[error("Could not justify implication during quantification")]
    ImplicationFailed,
    #[error("Error writing proof file: {}", cause)]
    ProofIo {
        #[from]
        cause: io::Error,
    },
    #[error("A formula was already loaded")]
    AlreadyLoaded,
    #[error(
        "Variable order covers {} variables but the formula has {}",
        order,
        formula
    )]
    OrderMismatch { order: usize, formula: usize },
    #[error("No formula was loaded")]
    NotLoaded,
    #[error("Unknown term {}", id)]
    UnknownTerm { id: TermId },
}

/// A proof producing BDD based SAT solver.
#[derive(Default)]
pub struct Solver<'a> {
    ctx: Box<Context<'a>>,
}

impl<'a> Solver<'a> {
    /// Create a new solver.
    pub fn new() -> Solver<'a> {
        Solver::default()
    }

    /// Change the solver configuration.
    pub fn config(&mut self, update: &SolverConfigUpdate) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        update.apply(ctx.part_mut(SolverConfigP));
        let comments = ctx.part(SolverConfigP).proof_comments;
        ctx.part_mut(ProverP).set_comments(comments);
    }

    /// Use the given variable order instead of ordering variables by index.
    ///
    /// Has to be called before the formula is added.
    pub fn set_order(&mut self, order: VarOrder) -> Result<(), SolverError> {
        let state = &mut self.ctx.solver_state;
        if state.loaded {
            return Err(SolverError::AlreadyLoaded);
        }
        state.order = Some(order);
        Ok(())
    }

    /// Generate a proof of unsatisfiability.
    ///
    /// This needs to be called before any clauses are added.
    pub fn write_proof(&mut self, target: impl io::Write + 'a, format: ProofFormat) {
        self.ctx
            .prover
            .set_writer(ProofWriter::new(target, format));
    }

    /// Stop generating a proof and flush the proof output.
    pub fn close_proof(&mut self) -> Result<(), SolverError> {
        self.ctx.prover.close()?;
        Ok(())
    }

    /// Add a formula to the solver.
    ///
    /// Only a single formula can be added.
    pub fn add_formula(&mut self, formula: &CnfFormula) -> Result<(), SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        load_formula(ctx.borrow(), formula)
    }

    /// Reads and adds a formula in DIMACS CNF format.
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let formula = DimacsParser::parse(input)?;
        self.add_formula(&formula)?;
        Ok(())
    }

    /// Conjoin the clauses of the formula using the given strategy.
    pub fn solve(&mut self, strategy: &mut dyn Strategy) -> Result<Outcome, SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        if !ctx.part(SolverStateP).loaded {
            return Err(SolverError::NotLoaded);
        }

        let outcome = if ctx.part(TermsP).is_unsat() {
            Outcome::Unsat
        } else {
            log::info!("Using {} strategy", strategy.name());
            strategy.run(ctx.borrow())?
        };

        match outcome {
            Outcome::Unsat => log::info!("Derived empty clause"),
            Outcome::Sat => log::info!("Formula is satisfiable"),
            Outcome::Incomplete => log::info!(
                "Ended with {} terms and no contradiction",
                ctx.part(TermsP).len()
            ),
        }

        ctx.part_mut(SolverStateP).outcome = Some(outcome);
        log_summary(ctx.borrow());

        Ok(outcome)
    }

    /// Outcome of the last call to [`solve`](Solver::solve).
    pub fn outcome(&self) -> Option<Outcome> {
        self.ctx.solver_state.outcome
    }

    /// Whether the empty clause was derived.
    pub fn is_unsat(&self) -> bool {
        self.ctx.terms.is_unsat()
    }

    /// Set of literals that satisfy the formula.
    ///
    /// Only available when the formula is satisfiable and no variable was quantified.
    pub fn model(&self) -> Option<Vec<Lit>> {
        let ctx = self.ctx.into_partial_ref();
        let state = ctx.part(SolverStateP);
        let bdd = ctx.part(BddP);
        let terms = ctx.part(TermsP);

        if state.outcome != Some(Outcome::Sat) || bdd.quantified_vars() > 0 {
            return None;
        }

        let root = match terms.ids().next() {
            Some(id) => terms.get(id)?.root,
            None => NodeRef::TRUE,
        };

        let mut model: Vec<Lit> = (0..state.input_vars)
            .map(|index| Var::from_index(index).negative())
            .collect();
        for lit in bdd.witness(root)? {
            model[lit.index()] = lit;
        }
        Some(model)
    }
}

/// Report statistics of the run.
fn log_summary<'a>(ctx: partial!(Context<'a>, BddP, ProverP<'a>, SolverStateP)) {
    let bdd = ctx.part(BddP);
    let bdd_stats = bdd.stats();
    let prover_stats = ctx.part(ProverP).stats();
    let state = ctx.part(SolverStateP);

    log::info!("Input variables: {}", state.input_vars);
    log::info!("Variables quantified out: {}", bdd.quantified_vars());
    log::info!("Total nodes created: {}", bdd_stats.nodes_created);
    log::info!("Nodes removed by gc: {}", bdd_stats.nodes_removed);
    log::info!("Maximum live nodes: {}", bdd_stats.max_live_nodes);
    log::info!("Total apply operations: {}", bdd_stats.apply_count);
    log::info!(
        "Cached results with proofs: {}, without proofs: {}",
        bdd_stats.cached_with_proof,
        bdd_stats.cached_without_proof
    );
    log::info!("Cache entries removed: {}", bdd_stats.cache_removed);
    log::info!("Total GCs performed: {}", bdd_stats.gc_count);
    log::info!("Total clauses: {}", prover_stats.total_clauses);
    log::info!("Input clauses: {}", prover_stats.input_clauses);
    log::info!(
        "Added clauses without antecedents: {}",
        prover_stats.defined_clauses
    );
    log::info!(
        "Added clauses requiring proofs: {}",
        prover_stats.derived_clauses
    );
    log::info!("Maximum live clauses: {}", prover_stats.max_live_clauses);
    log::info!(
        "Elapsed time: {:.2} seconds",
        state.start.elapsed().as_secs_f64()
    );
}
