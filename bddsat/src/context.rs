//! Central solver data structure.
use partial_ref::{part, PartialRefTarget};

use crate::bdd::Bdd;
use crate::config::SolverConfig;
use crate::prover::Prover;
use crate::state::SolverState;
use crate::term::Terms;

/// Part declarations for the [`Context`] struct.
pub mod parts {
    use super::*;

    part!(pub BddP: Bdd);
    part!(pub ProverP<'a>: Prover<'a>);
    part!(pub SolverConfigP: SolverConfig);
    part!(pub SolverStateP: SolverState);
    part!(pub TermsP: Terms);
}

pub use parts::*;

/// Central solver data structure.
///
/// This struct contains all data kept by the solver. Most functions operating on multiple fields of
/// the context use partial references provided by the `partial_ref` crate. This documents the data
/// dependencies and makes the borrow checker happy without the overhead of passing individual
/// references.
#[derive(PartialRefTarget, Default)]
pub struct Context<'a> {
    #[part(BddP)]
    pub bdd: Bdd,
    #[part(ProverP<'a>)]
    pub prover: Prover<'a>,
    #[part(SolverConfigP)]
    pub solver_config: SolverConfig,
    #[part(SolverStateP)]
    pub solver_state: SolverState,
    #[part(TermsP)]
    pub terms: Terms,
}
