//! Clausal proof formats used by the bddsat solver.
//!
//! The solver emits its certificate as a sequence of [`ProofStep`]s which a [`ProofWriter`]
//! serializes in one of three encodings:
//!
//! * tracecheck, every clause with its antecedents and no deletions,
//! * textual LRAT,
//! * binary LRAT, the LEB128 based compressed encoding.
//!
//! The [`parse`] module reads both LRAT encodings back for checking.
use std::path::Path;

use bddsat_formula::Lit;

pub mod parse;
pub mod write;

pub use parse::{LratParser, LratStep, ParseError};
pub use write::ProofWriter;

/// Clause identifier shared by input clauses and derived clauses.
///
/// Input clauses are numbered from 1 in file order, derived clauses continue after them.
pub type ClauseId = u64;

/// Output encoding of a proof.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ProofFormat {
    Tracecheck,
    Lrat,
    BinaryLrat,
}

impl ProofFormat {
    /// Select the format from a file name extension: `.proof`, `.lrat` or `.lratb`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<ProofFormat> {
        match path.as_ref().extension()?.to_str()? {
            "proof" => Some(ProofFormat::Tracecheck),
            "lrat" => Some(ProofFormat::Lrat),
            "lratb" => Some(ProofFormat::BinaryLrat),
            _ => None,
        }
    }

    /// Select the format from a single letter code as used for piped output.
    ///
    /// `p` is tracecheck, `t` is textual LRAT and `b` binary LRAT.
    pub fn from_code(code: &str) -> Option<ProofFormat> {
        match code {
            "p" => Some(ProofFormat::Tracecheck),
            "t" => Some(ProofFormat::Lrat),
            "b" => Some(ProofFormat::BinaryLrat),
            _ => None,
        }
    }

    pub fn is_binary(self) -> bool {
        self == ProofFormat::BinaryLrat
    }
}

/// A single step of a generated proof.
#[derive(Copy, Clone, Debug)]
pub enum ProofStep<'a> {
    /// Announces an input clause. Only the tracecheck format lists these.
    Input { id: ClauseId, clause: &'a [Lit] },
    /// Adds a derived clause.
    ///
    /// The hints are RUP antecedents, optionally followed by RAT groups. A negative hint `-d`
    /// starts the group for the clause `d` that contains the negation of the first literal.
    Add {
        id: ClauseId,
        clause: &'a [Lit],
        hints: &'a [i64],
    },
    /// Deletes a batch of clauses.
    Delete { ids: &'a [ClauseId] },
    /// A free form comment.
    Comment(&'a str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_selection() {
        assert_eq!(
            ProofFormat::from_path("out/chess8.lrat"),
            Some(ProofFormat::Lrat)
        );
        assert_eq!(
            ProofFormat::from_path("chess8.lratb"),
            Some(ProofFormat::BinaryLrat)
        );
        assert_eq!(
            ProofFormat::from_path("chess8.proof"),
            Some(ProofFormat::Tracecheck)
        );
        assert_eq!(ProofFormat::from_path("chess8.cnf"), None);
        assert_eq!(ProofFormat::from_path("chess8"), None);

        assert_eq!(ProofFormat::from_code("b"), Some(ProofFormat::BinaryLrat));
        assert_eq!(ProofFormat::from_code("t"), Some(ProofFormat::Lrat));
        assert_eq!(ProofFormat::from_code("p"), Some(ProofFormat::Tracecheck));
        assert_eq!(ProofFormat::from_code("x"), None);
    }
}
