//! Clause storage.
use partial_ref::{partial, PartialRef};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use smallvec::SmallVec;

use bddsat_formula::Lit;
use bddsat_lrat::ClauseId;

use crate::{
    context::{parts::*, Context},
    CheckerError,
};

/// Literals of a stored clause.
pub type ClauseLits = SmallVec<[Lit; 4]>;

/// Active and deleted clauses of the checked proof.
#[derive(Default)]
pub struct Clauses {
    /// Literals of all active clauses.
    active: HashMap<ClauseId, ClauseLits>,
    /// Ids of clauses removed by a deletion step.
    deleted: HashSet<ClauseId>,
    /// Clause ids by literal code.
    ///
    /// Entries are appended in increasing id order. Ids of deleted clauses are only removed when
    /// the list is scanned.
    occurrences: Vec<Vec<ClauseId>>,
    /// Largest id seen so far.
    pub max_id: ClauseId,
}

/// Why a clause id can't be used.
pub enum Missing {
    Deleted,
    Unknown,
}

impl Clauses {
    /// Number of active clauses.
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Literals of an active clause.
    pub fn get(&self, id: ClauseId) -> Result<&[Lit], Missing> {
        match self.active.get(&id) {
            Some(lits) => Ok(&lits[..]),
            None if self.deleted.contains(&id) => Err(Missing::Deleted),
            None => Err(Missing::Unknown),
        }
    }

    /// Ids of active clauses containing `lit`, in increasing order.
    pub fn clauses_containing(&mut self, lit: Lit) -> &[ClauseId] {
        let active = &self.active;
        match self.occurrences.get_mut(lit.code()) {
            Some(list) => {
                list.retain(|id| active.contains_key(id));
                &list[..]
            }
            None => &[],
        }
    }

    /// Store a clause under a new id.
    pub fn insert(&mut self, id: ClauseId, lits: &[Lit]) {
        for &lit in lits {
            if self.occurrences.len() <= lit.code() {
                // keep both polarities of a variable available
                self.occurrences.resize_with((lit.code() | 1) + 1, Vec::new);
            }
            let list = &mut self.occurrences[lit.code()];
            if list.last() != Some(&id) {
                list.push(id);
            }
        }
        self.active.insert(id, lits.iter().copied().collect());
        self.max_id = self.max_id.max(id);
    }

    /// Remove an active clause.
    fn remove(&mut self, id: ClauseId) -> Result<(), Missing> {
        match self.active.remove(&id) {
            Some(_) => {
                self.deleted.insert(id);
                Ok(())
            }
            None if self.deleted.contains(&id) => Err(Missing::Deleted),
            None => Err(Missing::Unknown),
        }
    }
}

/// Check a deletion step.
pub fn delete_clauses(
    mut ctx: partial!(Context, mut ClausesP, CheckerStateP),
    ids: &[ClauseId],
) -> Result<(), CheckerError> {
    for &id in ids {
        if let Err(missing) = ctx.part_mut(ClausesP).remove(id) {
            let msg = match missing {
                Missing::Deleted => "deleted clause was already deleted",
                Missing::Unknown => "deleted clause does not exist",
            };
            return Err(CheckerError::check_failed(
                ctx.part(CheckerStateP).step,
                id,
                msg.to_owned(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use bddsat_formula::lits;

    #[test]
    fn occurrence_lists_skip_deleted() {
        let mut clauses = Clauses::default();
        clauses.insert(1, &lits![1, -2]);
        clauses.insert(2, &lits![-2, 3]);
        clauses.insert(3, &lits![2, 3]);

        assert_eq!(clauses.clauses_containing(lit(-2)), &[1, 2]);
        assert!(clauses.remove(1).is_ok());
        assert_eq!(clauses.clauses_containing(lit(-2)), &[2]);
        assert_eq!(clauses.clauses_containing(lit(-3)), &[] as &[ClauseId]);
        assert_eq!(clauses.clauses_containing(lit(9)), &[] as &[ClauseId]);

        assert!(matches!(clauses.remove(1), Err(Missing::Deleted)));
        assert!(matches!(clauses.remove(4), Err(Missing::Unknown)));
        assert!(matches!(clauses.get(1), Err(Missing::Deleted)));
        assert_eq!(clauses.get(3).ok(), Some(&lits![2, 3][..]));
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses.max_id, 3);
    }

    fn lit(number: isize) -> Lit {
        Lit::from_dimacs(number)
    }
}
