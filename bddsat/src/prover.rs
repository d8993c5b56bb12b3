//! Justification of derived clauses.
//!
//! Every clause the solver adds to the proof goes through the [`Prover`]. It hands out clause ids,
//! keeps the literals of all clauses that have not been deleted yet and searches for the unit
//! propagation chains that justify derived clauses.
use std::{fmt, io, ops};

use rustc_hash::FxHashMap;

use bddsat_formula::{Lit, Var};
use bddsat_lrat::{ClauseId, ProofStep, ProofWriter};

use crate::solver::SolverError;

/// A literal of a clause before simplification.
///
/// BDD terminals show up as constants in the defining clauses of nodes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ProofLit {
    Const(bool),
    Lit(Lit),
}

impl ops::Not for ProofLit {
    type Output = ProofLit;

    fn not(self) -> ProofLit {
        match self {
            ProofLit::Const(value) => ProofLit::Const(!value),
            ProofLit::Lit(lit) => ProofLit::Lit(!lit),
        }
    }
}

impl From<Lit> for ProofLit {
    fn from(lit: Lit) -> ProofLit {
        ProofLit::Lit(lit)
    }
}

/// Remove false constants and repeated literals.
///
/// Returns `None` for a tautological clause. The order of the remaining literals is kept.
pub fn clean_clause(lits: &[ProofLit]) -> Option<Vec<Lit>> {
    let mut clause = Vec::with_capacity(lits.len());
    for &lit in lits {
        match lit {
            ProofLit::Const(true) => return None,
            ProofLit::Const(false) => (),
            ProofLit::Lit(lit) => {
                if clause.contains(&!lit) {
                    return None;
                }
                if !clause.contains(&lit) {
                    clause.push(lit);
                }
            }
        }
    }
    Some(clause)
}

/// Counters reported at the end of a run.
#[derive(Default, Debug, Clone)]
pub struct ProverStats {
    pub total_clauses: u64,
    pub input_clauses: u64,
    pub defined_clauses: u64,
    pub derived_clauses: u64,
    pub deleted_clauses: u64,
    pub max_live_clauses: usize,
}

/// Assigns clause ids and justifies clauses.
#[derive(Default)]
pub struct Prover<'a> {
    /// Id of the last added clause.
    last_id: ClauseId,
    writer: Option<ProofWriter<'a>>,
    comments: bool,
    /// Literals of all clauses that were not deleted.
    live: FxHashMap<ClauseId, Vec<Lit>>,
    stats: ProverStats,
}

impl<'a> Prover<'a> {
    /// Start writing proof steps.
    pub fn set_writer(&mut self, mut writer: ProofWriter<'a>) {
        writer.set_comments(self.comments);
        self.writer = Some(writer);
    }

    /// Flush and stop writing proof steps.
    pub fn close(&mut self) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    /// Enable or disable comment lines in textual proofs.
    pub fn set_comments(&mut self, comments: bool) {
        self.comments = comments;
        if let Some(writer) = &mut self.writer {
            writer.set_comments(comments);
        }
    }

    /// Write a comment line. The text is only formatted when comments are enabled.
    pub fn comment(&mut self, text: fmt::Arguments) -> Result<(), SolverError> {
        if self.comments {
            if let Some(writer) = &mut self.writer {
                writer.write_step(&ProofStep::Comment(&text.to_string()))?;
            }
        }
        Ok(())
    }

    pub fn stats(&self) -> &ProverStats {
        &self.stats
    }

    /// Literals of a clause that was not deleted.
    pub fn clause(&self, id: ClauseId) -> Option<&[Lit]> {
        self.live.get(&id).map(|lits| &lits[..])
    }

    /// Number of clauses that were not deleted.
    pub fn live_clauses(&self) -> usize {
        self.live.len()
    }

    /// Record a clause of the input formula.
    ///
    /// Input clauses have to be added before any other clause, so that they are numbered from 1.
    pub fn add_input(&mut self, clause: &[Lit]) -> Result<ClauseId, SolverError> {
        debug_assert_eq!(self.last_id, self.stats.input_clauses);
        let id = self.next_id();
        if let Some(writer) = &mut self.writer {
            writer.write_step(&ProofStep::Input { id, clause })?;
        }
        self.stats.input_clauses += 1;
        self.insert(id, clause.to_vec());
        Ok(id)
    }

    /// Add a clause with the given hints without searching for a justification.
    ///
    /// This is used for the clauses defining extension variables. Returns `None` without adding
    /// anything for a tautology.
    pub fn define(
        &mut self,
        clause: &[ProofLit],
        hints: &[i64],
    ) -> Result<Option<ClauseId>, SolverError> {
        match clean_clause(clause) {
            None => Ok(None),
            Some(lits) => {
                self.stats.defined_clauses += 1;
                self.add(lits, hints).map(Some)
            }
        }
    }

    /// Add a clause implied by the given candidate clauses.
    ///
    /// The candidates are searched for a chain of unit propagations that refutes the negated
    /// clause. When there is none and a split variable is given, the clause is derived from its
    /// two extensions by the split variable, which in turn are justified by unit propagation.
    ///
    /// Returns `None` without adding anything for a tautology.
    pub fn derive(
        &mut self,
        target: &[ProofLit],
        candidates: &[Option<ClauseId>],
        split: Option<Var>,
    ) -> Result<Option<ClauseId>, SolverError> {
        let target = match clean_clause(target) {
            None => return Ok(None),
            Some(target) => target,
        };

        let candidates: Vec<ClauseId> = candidates.iter().flatten().copied().collect();

        if let Some(hints) = self.rup_chain(&target, &candidates) {
            self.stats.derived_clauses += 1;
            return self.add(target, &hints).map(Some);
        }

        if let Some(var) = split {
            if target.iter().all(|lit| lit.var() != var) {
                let mut halves = vec![];
                for &split_lit in [var.negative(), var.positive()].iter() {
                    let mut half = target.clone();
                    half.push(split_lit);
                    match self.rup_chain(&half, &candidates) {
                        Some(hints) => halves.push((half, hints)),
                        None => return Err(justification_failed(&half)),
                    }
                }

                let mut half_ids = vec![];
                for (half, hints) in halves {
                    self.stats.derived_clauses += 1;
                    half_ids.push(self.add(half, &hints)?);
                }

                let hints: Vec<i64> = half_ids.iter().map(|&id| id as i64).collect();
                self.stats.derived_clauses += 1;
                let id = self.add(target, &hints)?;
                self.delete(&half_ids)?;
                return Ok(Some(id));
            }
        }

        Err(justification_failed(&target))
    }

    /// Delete clauses, emitting a single deletion step.
    pub fn delete(&mut self, ids: &[ClauseId]) -> Result<(), SolverError> {
        let ids: Vec<ClauseId> = ids
            .iter()
            .copied()
            .filter(|id| self.live.remove(id).is_some())
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.stats.deleted_clauses += ids.len() as u64;
        if let Some(writer) = &mut self.writer {
            writer.write_step(&ProofStep::Delete { ids: &ids })?;
        }
        Ok(())
    }

    fn next_id(&mut self) -> ClauseId {
        self.last_id += 1;
        self.stats.total_clauses += 1;
        self.last_id
    }

    fn insert(&mut self, id: ClauseId, lits: Vec<Lit>) {
        self.live.insert(id, lits);
        self.stats.max_live_clauses = self.stats.max_live_clauses.max(self.live.len());
    }

    fn add(&mut self, clause: Vec<Lit>, hints: &[i64]) -> Result<ClauseId, SolverError> {
        let id = self.next_id();
        if let Some(writer) = &mut self.writer {
            writer.write_step(&ProofStep::Add {
                id,
                clause: &clause,
                hints,
            })?;
        }
        log::trace!("Clause {}: {:?} from {:?}", id, clause, hints);
        self.insert(id, clause);
        Ok(id)
    }

    /// Search a unit propagation refutation of the negated target among the candidates.
    ///
    /// Returns the clause ids in propagation order, leaving out clauses that don't contribute to
    /// the conflict.
    fn rup_chain(&self, target: &[Lit], candidates: &[ClauseId]) -> Option<Vec<i64>> {
        // value of each assigned variable and the step that propagated it
        let mut values: FxHashMap<Var, (bool, Option<usize>)> = FxHashMap::default();
        for &lit in target {
            values.insert(lit.var(), (lit.is_negative(), None));
        }
        let lit_value = |values: &FxHashMap<Var, (bool, Option<usize>)>, lit: Lit| {
            values
                .get(&lit.var())
                .map(|&(value, _)| value ^ lit.is_negative())
        };

        let mut done = vec![false; candidates.len()];
        let mut steps: Vec<&[Lit]> = vec![];
        let mut step_ids: Vec<ClauseId> = vec![];

        loop {
            let mut progress = false;
            for (pos, &id) in candidates.iter().enumerate() {
                if done[pos] {
                    continue;
                }
                let lits = match self.live.get(&id) {
                    Some(lits) => lits,
                    None => {
                        done[pos] = true;
                        continue;
                    }
                };

                let mut unassigned = None;
                let mut open = false;
                let mut satisfied = false;
                for &lit in lits.iter() {
                    match lit_value(&values, lit) {
                        Some(true) => {
                            satisfied = true;
                            break;
                        }
                        Some(false) => (),
                        None if unassigned.is_none() => unassigned = Some(lit),
                        None => {
                            open = true;
                            break;
                        }
                    }
                }

                if satisfied {
                    done[pos] = true;
                } else if open {
                    continue;
                } else if let Some(lit) = unassigned {
                    done[pos] = true;
                    progress = true;
                    values.insert(lit.var(), (lit.is_positive(), Some(steps.len())));
                    steps.push(lits);
                    step_ids.push(id);
                } else {
                    steps.push(lits);
                    step_ids.push(id);
                    return Some(trim_chain(&steps, &step_ids, &values));
                }
            }
            if !progress {
                return None;
            }
        }
    }
}

/// Keep only the steps of a refutation that the final conflict depends on.
fn trim_chain(
    steps: &[&[Lit]],
    step_ids: &[ClauseId],
    values: &FxHashMap<Var, (bool, Option<usize>)>,
) -> Vec<i64> {
    let mut needed = vec![false; steps.len()];
    let mut pending = vec![steps.len() - 1];
    needed[steps.len() - 1] = true;

    while let Some(step) = pending.pop() {
        for &lit in steps[step] {
            if let Some(&(_, Some(reason))) = values.get(&lit.var()) {
                if reason != step && !needed[reason] {
                    needed[reason] = true;
                    pending.push(reason);
                }
            }
        }
    }

    step_ids
        .iter()
        .zip(needed)
        .filter(|&(_, needed)| needed)
        .map(|(&id, _)| id as i64)
        .collect()
}

fn justification_failed(clause: &[Lit]) -> SolverError {
    SolverError::JustificationFailed {
        clause: clause.iter().map(|lit| lit.to_dimacs()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use bddsat_checker::Checker;
    use bddsat_formula::{lit, lits, var};
    use bddsat_lrat::ProofFormat;

    fn pl(number: isize) -> ProofLit {
        ProofLit::Lit(lit!(number))
    }

    #[test]
    fn cleaning() {
        assert_eq!(
            clean_clause(&[pl(1), ProofLit::Const(false), pl(-2), pl(1)]),
            Some(lits![1, -2].to_vec())
        );
        assert_eq!(clean_clause(&[pl(1), ProofLit::Const(true)]), None);
        assert_eq!(clean_clause(&[pl(3), pl(-3)]), None);
        assert_eq!(clean_clause(&[ProofLit::Const(false)]), Some(vec![]));
        assert_eq!(!ProofLit::Const(false), ProofLit::Const(true));
        assert_eq!(!pl(4), pl(-4));
    }

    #[test]
    fn chains_are_trimmed() {
        let mut prover = Prover::default();
        let a = prover.add_input(&lits![1, 2]).unwrap();
        let unused = prover.add_input(&lits![3, 4]).unwrap();
        let b = prover.add_input(&lits![-1, 3]).unwrap();
        let c = prover.add_input(&lits![-3, 2]).unwrap();

        // ¬2 propagates ¬3 through c, 4 through the unused clause and ¬1 through b, then a
        // is falsified
        let id = prover
            .derive(&[pl(2)], &[Some(c), Some(unused), None, Some(b), Some(a)], None)
            .unwrap();
        assert_eq!(id, Some(5));
        assert_eq!(prover.clause(5), Some(&lits![2][..]));

        let chain = prover.rup_chain(&lits![2], &[c, unused, b, a]).unwrap();
        assert_eq!(chain, vec![c as i64, b as i64, a as i64]);

        assert_eq!(prover.derive(&[pl(2), pl(-2)], &[], None).unwrap(), None);
        assert!(prover.derive(&[pl(4)], &[Some(a), Some(b)], None).is_err());
    }

    #[test]
    fn case_split() {
        let mut proof = vec![];
        {
            let mut prover = Prover::default();
            prover.set_writer(ProofWriter::new(&mut proof, ProofFormat::Lrat));

            let input = [lits![1, 2], lits![-1, 2], lits![1, -2], lits![-1, -2]];
            let ids: Vec<_> = input
                .iter()
                .map(|clause| prover.add_input(clause).map(Some))
                .collect::<Result<_, _>>()
                .unwrap();

            assert!(prover.rup_chain(&[], &[1, 2, 3, 4]).is_none());

            let id = prover.derive(&[], &ids, Some(var!(1))).unwrap();
            assert_eq!(id, Some(7));
            assert!(prover.clause(5).is_none());
            assert!(prover.clause(6).is_none());
            assert_eq!(prover.clause(7), Some(&[] as &[Lit]));
            assert_eq!(prover.stats().derived_clauses, 3);
            prover.close().unwrap();
        }

        let mut checker = Checker::new();
        checker.add_formula(&bddsat_formula::cnf_formula![
            1, 2;
            -1, 2;
            1, -2;
            -1, -2;
        ]);
        checker.check_proof(&proof[..]).unwrap();
    }

    #[test]
    fn deletion_batches() {
        let mut proof = vec![];
        {
            let mut prover = Prover::default();
            prover.set_writer(ProofWriter::new(&mut proof, ProofFormat::Lrat));
            prover.set_comments(true);
            prover.add_input(&lits![1]).unwrap();
            prover.define(&[pl(2), pl(-1)], &[]).unwrap();
            prover.comment(format_args!("node {}", 2)).unwrap();
            prover.delete(&[2, 9]).unwrap();
            prover.delete(&[2]).unwrap();
            prover.close().unwrap();
        }
        assert_eq!(
            String::from_utf8(proof).unwrap(),
            "2 2 -1 0 0\nc node 2\n2 d 2 0\n"
        );
    }
}
