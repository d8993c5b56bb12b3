//! Independent checker for LRAT unsatisfiability certificates.
//!
//! The checker is seeded with the clauses of a CNF formula, numbered from 1 in file order, and
//! then replays an LRAT proof in textual or binary encoding. Every added clause has to be
//! justified by its hints, either by reverse unit propagation or by a RAT check on its first
//! literal. The proof is accepted once the empty clause was added and every step passed.
use std::io;

use anyhow::Error;
use partial_ref::{IntoPartialRefMut, PartialRef};
use thiserror::Error;

use bddsat_dimacs::DimacsParser;
use bddsat_formula::{CnfFormula, Lit};
use bddsat_lrat::{ClauseId, LratParser, LratStep};

mod clauses;
mod context;
mod rup;
mod state;

use context::{parts::*, Context};
use state::{add_input_clause, check_step};

/// Possible errors while checking an LRAT proof.
#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("step {}: Checking clause {} failed: {}", step, id, msg)]
    CheckFailed { step: u64, id: ClauseId, msg: String },
    #[error("All {} proof steps passed but the empty clause was never added", steps)]
    NotUnsat { steps: u64 },
    #[error("step {}: Could not parse proof step: {}", step, cause)]
    ParseError {
        step: u64,
        #[source]
        cause: bddsat_lrat::ParseError,
    },
    #[error("step {}: Error reading proof file: {}", step, cause)]
    IoError {
        step: u64,
        #[source]
        cause: io::Error,
    },
}

impl CheckerError {
    fn check_failed(step: u64, id: ClauseId, msg: String) -> CheckerError {
        CheckerError::CheckFailed { step, id, msg }
    }
}

/// A checker for LRAT proofs.
#[derive(Default)]
pub struct Checker {
    ctx: Box<Context>,
}

impl Checker {
    /// Create a new checker.
    pub fn new() -> Checker {
        Checker::default()
    }

    /// Adds a clause to the checker and returns its id.
    pub fn add_clause(&mut self, clause: &[Lit]) -> ClauseId {
        let mut ctx = self.ctx.into_partial_ref_mut();
        add_input_clause(ctx.borrow(), clause)
    }

    /// Add a formula to the checker.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        for clause in formula.iter() {
            self.add_clause(clause);
        }
    }

    /// Reads and adds a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`](bddsat_formula::CnfFormula).
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), Error> {
        let parser = DimacsParser::parse_incremental(input, |parser| {
            self.add_formula(&parser.take_formula());
            Ok(())
        })?;

        log::info!(
            "Parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Check a single proof step.
    pub fn check_step(&mut self, step: LratStep) -> Result<(), CheckerError> {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ctx.part_mut(CheckerStateP).step += 1;
        check_step(ctx.borrow(), step)
    }

    /// Checks a proof, detecting whether it is in textual or binary LRAT.
    pub fn check_proof(&mut self, input: impl io::BufRead) -> Result<(), CheckerError> {
        self.check_proof_steps(LratParser::new(input))
    }

    /// Checks a proof in the given encoding.
    pub fn check_proof_with_encoding(
        &mut self,
        input: impl io::BufRead,
        binary: bool,
    ) -> Result<(), CheckerError> {
        self.check_proof_steps(LratParser::with_encoding(input, binary))
    }

    fn check_proof_steps(
        &mut self,
        mut parser: LratParser<impl io::BufRead>,
    ) -> Result<(), CheckerError> {
        loop {
            let step = self.steps() + 1;
            if step % 100000 == 0 {
                log::info!("checking step {}k", step / 1000);
            }

            match parser.next_step() {
                Ok(Some(proof_step)) => self.check_step(proof_step)?,
                Ok(None) => break,
                Err(bddsat_lrat::ParseError::Io { cause }) => {
                    return Err(CheckerError::IoError { step, cause })
                }
                Err(cause) => return Err(CheckerError::ParseError { step, cause }),
            }
        }

        let steps = self.steps();
        if !self.is_unsat() {
            return Err(CheckerError::NotUnsat { steps });
        }

        log::info!(
            "Verified {} proof steps, {} clauses active at the end",
            steps,
            self.ctx.clauses.len()
        );

        Ok(())
    }

    /// Whether the empty clause was added by a checked step.
    pub fn is_unsat(&self) -> bool {
        self.ctx.checker_state.unsat
    }

    /// Number of proof steps checked so far.
    pub fn steps(&self) -> u64 {
        self.ctx.checker_state.step
    }

    /// Number of clauses of the input formula.
    pub fn input_clauses(&self) -> usize {
        self.ctx.checker_state.input_clauses
    }
}
