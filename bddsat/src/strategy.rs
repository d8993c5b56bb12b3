//! Strategies deciding the order of conjunctions and quantifications.
use partial_ref::{partial, PartialRef};

use crate::context::{parts::*, Context};
use crate::schedule::{run_schedule, Schedule};
use crate::solver::SolverError;
use crate::state::Outcome;
use crate::term::{combine, quantify, TermId};

/// Drives the conjunction of all terms.
pub trait Strategy {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Combine the active terms until the formula is refuted or no more steps remain.
    fn run<'a>(
        &mut self,
        ctx: partial!(
            Context<'a>,
            mut BddP,
            mut ProverP<'a>,
            mut TermsP,
            SolverConfigP,
            SolverStateP
        ),
    ) -> Result<Outcome, SolverError>;
}

/// Outcome once a strategy ran out of steps.
fn final_outcome<'a>(ctx: partial!(Context<'a>, TermsP)) -> Outcome {
    let terms = ctx.part(TermsP);
    if terms.is_unsat() {
        Outcome::Unsat
    } else if terms.len() <= 1 {
        Outcome::Sat
    } else {
        Outcome::Incomplete
    }
}

/// Conjoin the two oldest terms until a single term remains.
#[derive(Default)]
pub struct Linear;

impl Strategy for Linear {
    fn name(&self) -> &str {
        "linear"
    }

    fn run<'a>(
        &mut self,
        mut ctx: partial!(
            Context<'a>,
            mut BddP,
            mut ProverP<'a>,
            mut TermsP,
            SolverConfigP,
            SolverStateP
        ),
    ) -> Result<Outcome, SolverError> {
        while !ctx.part(TermsP).is_unsat() {
            let pair: Vec<TermId> = ctx.part(TermsP).ids().take(2).collect();
            if pair.len() < 2 {
                break;
            }
            combine(ctx.borrow(), pair[0], pair[1])?;
        }
        Ok(final_outcome(ctx.borrow()))
    }
}

/// Bucket elimination along the variable order.
///
/// Every term is placed in the bucket of the top variable of its BDD. The buckets are processed
/// from the top level down. All terms of a bucket are conjoined, and then the variable of the
/// bucket is quantified out of the result.
#[derive(Default)]
pub struct Bucket;

impl Bucket {
    /// Terminal terms go to bucket 0, a term with top level `l` goes to bucket `l + 1`.
    fn bucket<'a>(
        ctx: partial!(Context<'a>, BddP, TermsP),
        id: TermId,
    ) -> Result<usize, SolverError> {
        let term = ctx
            .part(TermsP)
            .get(id)
            .ok_or(SolverError::UnknownTerm { id })?;
        Ok(if term.root.is_terminal() {
            0
        } else {
            ctx.part(BddP).level(term.root) as usize + 1
        })
    }
}

impl Strategy for Bucket {
    fn name(&self) -> &str {
        "bucket"
    }

    fn run<'a>(
        &mut self,
        mut ctx: partial!(
            Context<'a>,
            mut BddP,
            mut ProverP<'a>,
            mut TermsP,
            SolverConfigP,
            SolverStateP
        ),
    ) -> Result<Outcome, SolverError> {
        let levels = ctx.part(BddP).var_count();
        let mut buckets: Vec<Vec<TermId>> = vec![vec![]; levels + 1];

        let ids: Vec<TermId> = ctx.part(TermsP).ids().collect();
        for id in ids {
            let bucket = Bucket::bucket(ctx.borrow(), id)?;
            buckets[bucket].push(id);
        }

        for index in 0..buckets.len() {
            while buckets[index].len() > 1 {
                let rest = buckets[index].split_off(2);
                let pair = std::mem::replace(&mut buckets[index], rest);
                let id = combine(ctx.borrow(), pair[0], pair[1])?;
                if ctx.part(TermsP).is_unsat() {
                    return Ok(Outcome::Unsat);
                }
                let bucket = Bucket::bucket(ctx.borrow(), id)?;
                buckets[bucket].push(id);
            }

            if index > 0 {
                if let Some(id) = buckets[index].pop() {
                    let var = ctx.part(BddP).order().var(index as u32 - 1);
                    log::debug!("Eliminating variable {}", var);
                    let id = quantify(ctx.borrow(), id, &[var])?;
                    let bucket = Bucket::bucket(ctx.borrow(), id)?;
                    buckets[bucket].push(id);
                }
            }
        }

        // only true terms remain
        Ok(Outcome::Sat)
    }
}

/// Follow a schedule.
pub struct Scripted {
    schedule: Schedule,
}

impl Scripted {
    pub fn new(schedule: Schedule) -> Scripted {
        Scripted { schedule }
    }
}

impl Strategy for Scripted {
    fn name(&self) -> &str {
        "schedule"
    }

    fn run<'a>(
        &mut self,
        mut ctx: partial!(
            Context<'a>,
            mut BddP,
            mut ProverP<'a>,
            mut TermsP,
            SolverConfigP,
            SolverStateP
        ),
    ) -> Result<Outcome, SolverError> {
        run_schedule(ctx.borrow(), &self.schedule)?;
        Ok(final_outcome(ctx.borrow()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use partial_ref::IntoPartialRefMut;

    use bddsat_formula::cnf_formula;

    use crate::bdd::NodeRef;
    use crate::load::load_formula;

    fn run_strategy(strategy: &mut dyn Strategy) -> (Outcome, Vec<NodeRef>) {
        let mut ctx = Context::default();
        let mut ctx = ctx.into_partial_ref_mut();
        load_formula(
            ctx.borrow(),
            &cnf_formula![
                1, 2;
                -1, 3;
                -2, 3;
                -3, 4;
            ],
        )
        .unwrap();
        let outcome = strategy.run(ctx.borrow()).unwrap();
        let terms = ctx.part(TermsP);
        let roots = terms.ids().map(|id| terms.get(id).unwrap().root).collect();
        (outcome, roots)
    }

    #[test]
    fn linear_conjoins_everything() {
        let (outcome, roots) = run_strategy(&mut Linear);
        assert_eq!(outcome, Outcome::Sat);
        assert_eq!(roots.len(), 1);
        assert_ne!(roots[0], NodeRef::FALSE);
    }

    #[test]
    fn bucket_eliminates_everything() {
        let (outcome, roots) = run_strategy(&mut Bucket);
        assert_eq!(outcome, Outcome::Sat);
        assert!(roots.iter().all(|&root| root == NodeRef::TRUE));
    }

    #[test]
    fn partial_schedule() {
        let schedule = Schedule::parse(&b"c 1 2\na 1\n"[..]).unwrap();
        let (outcome, roots) = run_strategy(&mut Scripted::new(schedule));
        assert_eq!(outcome, Outcome::Incomplete);
        assert_eq!(roots.len(), 3);
    }
}
