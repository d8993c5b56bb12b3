//! A SAT solver based on [binary decision diagrams][bdd] that proves unsatisfiability.
//!
//! The solver conjoins the BDDs of the clauses of a formula in [conjunctive normal form][cnf],
//! optionally quantifying out variables along the way. Every BDD operation is accompanied by
//! clauses in extended resolution, so that deriving the false BDD yields an [LRAT] proof of
//! unsatisfiability that an independent checker can verify.
//!
//! [bdd]: https://en.wikipedia.org/wiki/Binary_decision_diagram
//! [cnf]: https://en.wikipedia.org/wiki/Conjunctive_normal_form
//! [LRAT]: https://www.cs.utexas.edu/~marijn/publications/lrat.pdf

pub mod config;
pub mod schedule;
pub mod solver;
pub mod state;
pub mod strategy;
pub mod variables;

mod bdd;
mod context;
mod load;
mod prover;
mod term;

pub use bddsat_formula::{cnf, lit, CnfFormula, Lit, Var};
pub use bddsat_lrat::ProofFormat;

pub use config::{SolverConfig, SolverConfigUpdate};
pub use schedule::{Schedule, ScheduleError};
pub use solver::{Solver, SolverError};
pub use state::Outcome;
pub use strategy::{Bucket, Linear, Scripted, Strategy};
pub use variables::{OrderError, VarOrder};

pub mod dimacs {
    //! DIMCAS CNF parser and writer.
    pub use bddsat_dimacs::*;
}
