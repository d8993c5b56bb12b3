//! Serialization of proof steps.
use std::io::{self, BufWriter, Write};

use bddsat_formula::Lit;

use crate::{ClauseId, ProofFormat, ProofStep};

/// Writes proof steps in one of the supported encodings.
pub struct ProofWriter<'a> {
    format: ProofFormat,
    target: BufWriter<Box<dyn Write + 'a>>,
    last_added_id: ClauseId,
    comments: bool,
}

impl<'a> ProofWriter<'a> {
    /// Create a proof writer emitting to `target`.
    pub fn new(target: impl Write + 'a, format: ProofFormat) -> ProofWriter<'a> {
        ProofWriter {
            format,
            target: BufWriter::new(Box::new(target)),
            last_added_id: 0,
            comments: false,
        }
    }

    pub fn format(&self) -> ProofFormat {
        self.format
    }

    /// Enable or disable `c` comment lines. Only the textual LRAT format carries comments.
    pub fn set_comments(&mut self, comments: bool) {
        self.comments = comments;
    }

    /// Serialize a single step.
    pub fn write_step(&mut self, step: &ProofStep) -> io::Result<()> {
        match (self.format, *step) {
            (ProofFormat::Tracecheck, ProofStep::Input { id, clause }) => {
                self.write_ids(&[id])?;
                self.write_lits(clause)?;
                self.write_sep()?;
                self.write_end()?;
            }
            (ProofFormat::Tracecheck, ProofStep::Add { id, clause, hints }) => {
                // tracecheck has no RAT groups
                let mut antecedents: Vec<i64> =
                    hints.iter().copied().filter(|&hint| hint > 0).collect();
                antecedents.sort_unstable();

                self.write_ids(&[id])?;
                self.write_lits(clause)?;
                self.write_sep()?;
                self.write_hints(&antecedents)?;
                self.write_end()?;
            }
            (ProofFormat::Tracecheck, _) => (),
            (_, ProofStep::Input { .. }) => (),
            (_, ProofStep::Add { id, clause, hints }) => {
                self.last_added_id = id;
                self.write_add_step()?;
                self.write_ids(&[id])?;
                self.write_lits(clause)?;
                self.write_sep()?;
                self.write_hints(hints)?;
                self.write_end()?;
            }
            (_, ProofStep::Delete { ids }) => {
                if !ids.is_empty() {
                    if !self.format.is_binary() {
                        self.write_ids(&[self.last_added_id])?;
                    }
                    self.write_delete_step()?;
                    self.write_ids(ids)?;
                    self.write_end()?;
                }
            }
            (ProofFormat::Lrat, ProofStep::Comment(text)) => {
                if self.comments {
                    for line in text.lines() {
                        self.target.write_all(b"c ")?;
                        self.target.write_all(line.as_bytes())?;
                        self.target.write_all(b"\n")?;
                    }
                }
            }
            (_, ProofStep::Comment(_)) => (),
        }
        Ok(())
    }

    /// Write out all steps processed so far.
    ///
    /// This is automatically called when the writer is dropped. Calling this explicitly is
    /// recommended to handle possible IO errors.
    pub fn flush(&mut self) -> io::Result<()> {
        self.target.flush()
    }

    /// Begin a deletion step.
    fn write_delete_step(&mut self) -> io::Result<()> {
        if self.format.is_binary() {
            self.target.write_all(b"d")
        } else {
            self.target.write_all(b"d ")
        }
    }

    /// Begin a clause addition step.
    fn write_add_step(&mut self) -> io::Result<()> {
        if self.format.is_binary() {
            self.target.write_all(b"a")?;
        }
        Ok(())
    }

    /// Write a list of clause ids.
    fn write_ids(&mut self, ids: &[ClauseId]) -> io::Result<()> {
        if self.format.is_binary() {
            for &id in ids {
                leb128::write::unsigned(&mut self.target, id * 2)?;
            }
        } else {
            for &id in ids {
                itoa::write(&mut self.target, id)?;
                self.target.write_all(b" ")?;
            }
        }
        Ok(())
    }

    /// Write a list of signed hints.
    fn write_hints(&mut self, hints: &[i64]) -> io::Result<()> {
        if self.format.is_binary() {
            for &hint in hints {
                let code = (hint.abs() as u64) * 2 + (hint < 0) as u64;
                leb128::write::unsigned(&mut self.target, code)?;
            }
        } else {
            for &hint in hints {
                itoa::write(&mut self.target, hint)?;
                self.target.write_all(b" ")?;
            }
        }
        Ok(())
    }

    /// Write a list of literals.
    fn write_lits(&mut self, lits: &[Lit]) -> io::Result<()> {
        if self.format.is_binary() {
            for &lit in lits {
                leb128::write::unsigned(&mut self.target, lit.code() as u64 + 2)?;
            }
        } else {
            for &lit in lits {
                itoa::write(&mut self.target, lit.to_dimacs())?;
                self.target.write_all(b" ")?;
            }
        }
        Ok(())
    }

    /// End the current step.
    fn write_end(&mut self) -> io::Result<()> {
        if self.format.is_binary() {
            self.target.write_all(&[0])
        } else {
            self.target.write_all(b"0\n")
        }
    }

    /// Write a separator.
    fn write_sep(&mut self) -> io::Result<()> {
        if self.format.is_binary() {
            self.target.write_all(&[0])
        } else {
            self.target.write_all(b"0 ")
        }
    }
}
