//! Schedules of conjunctions and quantifications.
//!
//! A schedule is a program for a stack machine, one instruction per line:
//!
//! * `c C1 C2 ...` pushes the terms of the listed input clauses.
//! * `a K` pops two entries and pushes their conjunction, K times.
//! * `q V1 V2 ...` replaces the top entry by its existential quantification over the listed
//!   variables, in the given order.
//! * `i TEXT` reports the size of the top entry.
//! * `e` pops two entries and reports whether they are the same BDD.
//!
//! Empty lines and lines whose first field starts with `#` are skipped.
use std::io::{self, BufRead};

use partial_ref::{partial, PartialRef};
use rustc_hash::FxHashSet;
use thiserror::Error;

use bddsat_formula::Var;
use bddsat_lrat::ClauseId;

use crate::context::{parts::*, Context};
use crate::solver::SolverError;
use crate::term::{combine, quantify, TermId};

/// Possible errors while reading or running a schedule.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("line {}: Unknown command '{}'", line, text)]
    UnknownCommand { line: usize, text: String },
    #[error("line {}: Invalid field '{}' in '{}'", line, field, text)]
    InvalidField {
        line: usize,
        text: String,
        field: String,
    },
    #[error("line {}: Missing count in '{}'", line, text)]
    MissingCount { line: usize, text: String },
    #[error(
        "line {}: Invalid conjunction count {}. Only have {} on stack",
        line,
        count,
        available
    )]
    StackUnderflow {
        line: usize,
        text: String,
        count: usize,
        available: usize,
    },
    #[error("line {}: Not enough entries on stack for '{}'", line, text)]
    EmptyStack { line: usize, text: String },
    #[error("line {}: Undefined clause {} in '{}'", line, id, text)]
    UndefinedClause {
        line: usize,
        text: String,
        id: ClauseId,
    },
    #[error("line {}: Clause {} was already used in '{}'", line, id, text)]
    ClauseConsumed {
        line: usize,
        text: String,
        id: ClauseId,
    },
    #[error("line {}: Undefined variable {} in '{}'", line, var, text)]
    UndefinedVariable {
        line: usize,
        text: String,
        var: isize,
    },
    #[error(
        "line {}: Variable {} is still used by another term in '{}'",
        line,
        var,
        text
    )]
    VariableInUse {
        line: usize,
        text: String,
        var: isize,
    },
    #[error("Error reading schedule: {}", cause)]
    Io {
        #[from]
        cause: io::Error,
    },
}

/// A single schedule instruction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Instruction {
    Clauses(Vec<ClauseId>),
    And(usize),
    Quantify(Vec<Var>),
    Info(String),
    Equal,
}

/// An instruction together with its position in the schedule file.
#[derive(Clone, Debug)]
pub struct Line {
    pub line: usize,
    pub text: String,
    pub instruction: Instruction,
}

/// A parsed schedule.
#[derive(Clone, Default, Debug)]
pub struct Schedule {
    lines: Vec<Line>,
}

impl Schedule {
    /// Parse a schedule file.
    pub fn parse(input: impl io::Read) -> Result<Schedule, ScheduleError> {
        let mut lines = vec![];

        for (index, text) in io::BufReader::new(input).lines().enumerate() {
            let text = text?;
            let text = text.trim();
            let line = index + 1;

            let mut fields = text.split_whitespace();
            let command = match fields.next() {
                None => continue,
                Some(command) if command.starts_with('#') => continue,
                Some(command) => command,
            };

            let invalid_field = |field: &str| ScheduleError::InvalidField {
                line,
                text: text.to_owned(),
                field: field.to_owned(),
            };

            let instruction = match command {
                "c" => Instruction::Clauses(
                    fields
                        .map(|field| match field.parse::<ClauseId>() {
                            Ok(id) if id > 0 => Ok(id),
                            _ => Err(invalid_field(field)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                "a" => {
                    let field = fields.next().ok_or_else(|| ScheduleError::MissingCount {
                        line,
                        text: text.to_owned(),
                    })?;
                    let count = field.parse().map_err(|_| invalid_field(field))?;
                    if let Some(extra) = fields.next() {
                        return Err(invalid_field(extra));
                    }
                    Instruction::And(count)
                }
                "q" => Instruction::Quantify(
                    fields
                        .map(|field| match field.parse::<isize>() {
                            Ok(value) if value > 0 && value <= Var::max_var().to_dimacs() => {
                                Ok(Var::from_dimacs(value))
                            }
                            _ => Err(invalid_field(field)),
                        })
                        .collect::<Result<_, _>>()?,
                ),
                "i" => Instruction::Info(text[1..].trim().to_owned()),
                "e" => Instruction::Equal,
                _ => {
                    return Err(ScheduleError::UnknownCommand {
                        line,
                        text: text.to_owned(),
                    })
                }
            };

            lines.push(Line {
                line,
                text: text.to_owned(),
                instruction,
            });
        }

        log::info!("Read schedule of {} instructions", lines.len());

        Ok(Schedule { lines })
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// The schedule with all quantification instructions removed.
    pub fn without_quantification(&self) -> Schedule {
        Schedule {
            lines: self
                .lines
                .iter()
                .filter(|line| match line.instruction {
                    Instruction::Quantify(_) => false,
                    _ => true,
                })
                .cloned()
                .collect(),
        }
    }
}

/// An entry of the schedule stack.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Handle {
    /// The term of an input clause.
    Input(ClauseId),
    /// A term computed by the schedule.
    Derived(TermId),
}

impl Handle {
    pub fn term(self) -> TermId {
        match self {
            Handle::Input(id) => id as TermId,
            Handle::Derived(id) => id,
        }
    }
}

/// Execute a schedule.
///
/// Stops early when the empty clause is derived.
pub fn run_schedule<'a>(
    mut ctx: partial!(
        Context<'a>,
        mut BddP,
        mut ProverP<'a>,
        mut TermsP,
        SolverConfigP,
        SolverStateP
    ),
    schedule: &Schedule,
) -> Result<(), SolverError> {
    let mut stack: Vec<Handle> = vec![];
    let mut used: FxHashSet<ClauseId> = FxHashSet::default();

    let (input_vars, input_clauses) = {
        let state = ctx.part(SolverStateP);
        (state.input_vars, state.input_clauses as ClauseId)
    };

    for line in schedule.lines() {
        if ctx.part(TermsP).is_unsat() {
            break;
        }

        let text = || line.text.clone();

        match line.instruction {
            Instruction::Clauses(ref ids) => {
                for &id in ids {
                    if id > input_clauses {
                        return Err(ScheduleError::UndefinedClause {
                            line: line.line,
                            text: text(),
                            id,
                        }
                        .into());
                    }
                    if !used.insert(id) || !ctx.part(TermsP).contains(id as TermId) {
                        return Err(ScheduleError::ClauseConsumed {
                            line: line.line,
                            text: text(),
                            id,
                        }
                        .into());
                    }
                    stack.push(Handle::Input(id));
                }
            }
            Instruction::And(count) => {
                if count + 1 > stack.len() {
                    return Err(ScheduleError::StackUnderflow {
                        line: line.line,
                        text: text(),
                        count,
                        available: stack.len(),
                    }
                    .into());
                }
                for _ in 0..count {
                    let pair = stack.split_off(stack.len() - 2);
                    let id = combine(ctx.borrow(), pair[1].term(), pair[0].term())?;
                    stack.push(Handle::Derived(id));
                    if ctx.part(TermsP).is_unsat() {
                        break;
                    }
                }
            }
            Instruction::Quantify(ref vars) => {
                if let Some(&var) = vars.iter().find(|var| var.index() >= input_vars) {
                    return Err(ScheduleError::UndefinedVariable {
                        line: line.line,
                        text: text(),
                        var: var.to_dimacs(),
                    }
                    .into());
                }
                let top = stack.pop().ok_or_else(|| ScheduleError::EmptyStack {
                    line: line.line,
                    text: text(),
                })?;
                let in_use = support_of_others(ctx.borrow(), top.term());
                if let Some(&var) = vars.iter().find(|var| in_use.contains(var)) {
                    return Err(ScheduleError::VariableInUse {
                        line: line.line,
                        text: text(),
                        var: var.to_dimacs(),
                    }
                    .into());
                }
                let id = quantify(ctx.borrow(), top.term(), vars)?;
                stack.push(Handle::Derived(id));
            }
            Instruction::Info(ref info) => {
                let top = stack.last().ok_or_else(|| ScheduleError::EmptyStack {
                    line: line.line,
                    text: text(),
                })?;
                let root = term_root(ctx.borrow(), *top)?;
                let bdd = ctx.part(BddP);
                let size = bdd.size(root);
                if ctx.part(SolverConfigP).count_solutions {
                    log::info!(
                        "Node {}. Size = {}, Solutions = {}. {}",
                        root,
                        size,
                        bdd.sat_count(root),
                        info
                    );
                } else {
                    log::info!("Node {}. Size = {}. {}", root, size, info);
                }
            }
            Instruction::Equal => {
                if stack.len() < 2 {
                    return Err(ScheduleError::EmptyStack {
                        line: line.line,
                        text: text(),
                    }
                    .into());
                }
                let first = term_root(ctx.borrow(), stack[stack.len() - 1])?;
                let second = term_root(ctx.borrow(), stack[stack.len() - 2])?;
                stack.truncate(stack.len() - 2);
                if first == second {
                    log::info!("Equality test PASSED. {} == {}", first, second);
                } else {
                    log::info!("Equality test FAILED. {} != {}", first, second);
                }
            }
        }
    }

    Ok(())
}

/// Variables in the support of every active term except `skip`.
fn support_of_others<'a>(
    ctx: partial!(Context<'a>, BddP, TermsP),
    skip: TermId,
) -> FxHashSet<Var> {
    let bdd = ctx.part(BddP);
    let terms = ctx.part(TermsP);
    terms
        .ids()
        .filter(|&id| id != skip)
        .filter_map(|id| terms.get(id))
        .flat_map(|term| bdd.support(term.root))
        .collect()
}

fn term_root<'a>(
    ctx: partial!(Context<'a>, TermsP),
    handle: Handle,
) -> Result<crate::bdd::NodeRef, SolverError> {
    let id = handle.term();
    ctx.part(TermsP)
        .get(id)
        .map(|term| term.root)
        .ok_or(SolverError::UnknownTerm { id })
}
