//! Variable order used by the BDD engine.
use std::io::{self, BufRead};

use thiserror::Error;

use bddsat_formula::Var;

/// Possible errors while reading a variable order.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("line {}: Invalid variable '{}'", line, field)]
    InvalidField { line: usize, field: String },
    #[error("line {}: Variable {} out of range", line, value)]
    OutOfRange { line: usize, value: isize },
    #[error("line {}: Variable {} listed twice", line, var)]
    Repeated { line: usize, var: Var },
    #[error("Error reading variable order: {}", cause)]
    Io {
        #[from]
        cause: io::Error,
    },
}

const UNLISTED: u32 = u32::max_value();

/// Assignment of BDD levels to the input variables.
///
/// Level 0 is the top of every BDD.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarOrder {
    /// Variable at each level.
    vars: Vec<Var>,
    /// Level of each variable, indexed by variable index.
    levels: Vec<u32>,
}

impl VarOrder {
    /// Order variables by their index.
    pub fn identity(count: usize) -> VarOrder {
        VarOrder {
            vars: (0..count).map(Var::from_index).collect(),
            levels: (0..count as u32).collect(),
        }
    }

    /// Order listing the given variables from the top level down.
    ///
    /// The variables have to be a permutation of `1..=vars.len()`.
    pub fn from_vars(vars: Vec<Var>) -> Result<VarOrder, OrderError> {
        let lines: Vec<usize> = (1..=vars.len()).collect();
        VarOrder::from_listed(vars, &lines)
    }

    /// Read an order from a text file.
    ///
    /// The file lists whitespace separated variables from the top level down. Empty lines and
    /// lines starting with `#` are skipped.
    pub fn parse(input: impl io::Read) -> Result<VarOrder, OrderError> {
        let mut vars = vec![];
        let mut lines = vec![];

        for (index, line) in io::BufReader::new(input).lines().enumerate() {
            let line_number = index + 1;
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            for field in line.split_whitespace() {
                let value: isize = field.parse().map_err(|_| OrderError::InvalidField {
                    line: line_number,
                    field: field.to_owned(),
                })?;
                if value < 1 || value > Var::max_var().to_dimacs() {
                    return Err(OrderError::OutOfRange {
                        line: line_number,
                        value,
                    });
                }
                vars.push(Var::from_dimacs(value));
                lines.push(line_number);
            }
        }

        let order = VarOrder::from_listed(vars, &lines)?;
        log::info!("Read order of {} variables", order.len());
        Ok(order)
    }

    /// Every listed variable has to be within `1..=vars.len()` and listed once, which makes the
    /// list a permutation.
    fn from_listed(vars: Vec<Var>, lines: &[usize]) -> Result<VarOrder, OrderError> {
        let count = vars.len();
        let mut levels = vec![UNLISTED; count];

        for (level, (&var, &line)) in vars.iter().zip(lines).enumerate() {
            if var.index() >= count {
                return Err(OrderError::OutOfRange {
                    line,
                    value: var.to_dimacs(),
                });
            }
            if levels[var.index()] != UNLISTED {
                return Err(OrderError::Repeated { line, var });
            }
            levels[var.index()] = level as u32;
        }

        Ok(VarOrder { vars, levels })
    }

    /// Number of ordered variables.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Level of an input variable.
    pub fn level(&self, var: Var) -> u32 {
        self.levels[var.index()]
    }

    /// Variable at a level.
    pub fn var(&self, level: u32) -> Var {
        self.vars[level as usize]
    }

    /// Variables from the top level down.
    pub fn vars(&self) -> &[Var] {
        &self.vars
    }
}
