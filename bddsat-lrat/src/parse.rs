//! Parser for textual and binary LRAT proofs.
use std::io::{self, BufRead};

use thiserror::Error;

use bddsat_formula::{Lit, Var};

use crate::ClauseId;

/// Possible errors while parsing an LRAT proof.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {}", cause)]
    Io {
        #[from]
        cause: io::Error,
    },
    #[error("line {}: {}", line, msg)]
    Text { line: usize, msg: String },
    #[error("byte {}: {}", offset, msg)]
    Binary { offset: u64, msg: String },
}

/// A single parsed LRAT step.
///
/// The slices point into buffers owned by the parser and are valid until the next step is parsed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum LratStep<'a> {
    Add {
        id: ClauseId,
        clause: &'a [Lit],
        hints: &'a [i64],
    },
    Delete {
        ids: &'a [ClauseId],
    },
}

/// Streaming LRAT parser.
///
/// The encoding is detected from the first byte of the input: binary LRAT proofs begin with an
/// `a` or `d` step marker, which is never the first byte of a textual proof.
pub struct LratParser<R> {
    source: R,
    binary: Option<bool>,
    line: usize,
    offset: u64,
    line_buf: Vec<u8>,
    lit_buf: Vec<Lit>,
    hint_buf: Vec<i64>,
    id_buf: Vec<ClauseId>,
}

impl<R: BufRead> LratParser<R> {
    /// Create a parser that detects the encoding.
    pub fn new(source: R) -> LratParser<R> {
        LratParser {
            source,
            binary: None,
            line: 0,
            offset: 0,
            line_buf: vec![],
            lit_buf: vec![],
            hint_buf: vec![],
            id_buf: vec![],
        }
    }

    /// Create a parser for a known encoding.
    pub fn with_encoding(source: R, binary: bool) -> LratParser<R> {
        let mut parser = LratParser::new(source);
        parser.binary = Some(binary);
        parser
    }

    /// Whether the input is parsed as binary LRAT.
    ///
    /// Detects the encoding if that didn't happen yet.
    pub fn is_binary(&mut self) -> Result<bool, ParseError> {
        if let Some(binary) = self.binary {
            return Ok(binary);
        }
        let data = self.source.fill_buf()?;
        let binary = matches!(data.first(), Some(b'a') | Some(b'd'));
        self.binary = Some(binary);
        Ok(binary)
    }

    /// Parse the next step or return `None` at the end of the input.
    pub fn next_step(&mut self) -> Result<Option<LratStep>, ParseError> {
        if self.is_binary()? {
            self.next_binary_step()
        } else {
            self.next_text_step()
        }
    }

    fn next_text_step(&mut self) -> Result<Option<LratStep>, ParseError> {
        loop {
            self.line_buf.clear();
            if self.source.read_until(b'\n', &mut self.line_buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;

            let line = match std::str::from_utf8(&self.line_buf) {
                Ok(line) => line.trim(),
                Err(_) => return Err(text_error(self.line, "invalid UTF-8")),
            };

            if line.is_empty() || line.starts_with('c') {
                continue;
            }

            let line_number = self.line;
            let mut fields = line.split_whitespace();

            let id = parse_number::<ClauseId>(fields.next(), line_number, "clause id")?;

            let mut fields = fields.peekable();
            if fields.peek() == Some(&"d") {
                fields.next();
                self.id_buf.clear();
                loop {
                    match parse_number::<ClauseId>(fields.next(), line_number, "clause id")? {
                        0 => break,
                        id => self.id_buf.push(id),
                    }
                }
                expect_end(fields.next(), line_number)?;
                return Ok(Some(LratStep::Delete { ids: &self.id_buf }));
            }

            if id == 0 {
                return Err(text_error(line_number, "clause id 0"));
            }

            self.lit_buf.clear();
            loop {
                match parse_number::<isize>(fields.next(), line_number, "literal")? {
                    0 => break,
                    number => {
                        if number.unsigned_abs() > Var::max_count() {
                            return Err(text_error(
                                line_number,
                                format!("literal {} is too large", number),
                            ));
                        }
                        self.lit_buf.push(Lit::from_dimacs(number));
                    }
                }
            }

            self.hint_buf.clear();
            loop {
                match parse_number::<i64>(fields.next(), line_number, "hint")? {
                    0 => break,
                    hint => self.hint_buf.push(hint),
                }
            }
            expect_end(fields.next(), line_number)?;

            return Ok(Some(LratStep::Add {
                id,
                clause: &self.lit_buf,
                hints: &self.hint_buf,
            }));
        }
    }

    fn next_binary_step(&mut self) -> Result<Option<LratStep>, ParseError> {
        let marker = match self.source.fill_buf()?.first() {
            None => return Ok(None),
            Some(&marker) => marker,
        };
        let offset = self.offset;
        self.source.consume(1);
        self.offset += 1;

        match marker {
            b'a' => {
                let id = self.read_number()?;
                if id == 0 || id % 2 != 0 {
                    return Err(binary_error(offset, format!("invalid clause id code {}", id)));
                }

                self.lit_buf.clear();
                loop {
                    match self.read_number()? {
                        0 => break,
                        1 => return Err(binary_error(offset, "invalid literal code 1")),
                        code => {
                            let code = (code - 2) as usize;
                            if code >> 1 >= Var::max_count() {
                                return Err(binary_error(offset, "literal is too large"));
                            }
                            self.lit_buf.push(Lit::from_code(code))
                        }
                    }
                }

                self.hint_buf.clear();
                loop {
                    match self.read_number()? {
                        0 => break,
                        code => {
                            let magnitude = (code >> 1) as i64;
                            let hint = if code & 1 != 0 { -magnitude } else { magnitude };
                            self.hint_buf.push(hint);
                        }
                    }
                }

                Ok(Some(LratStep::Add {
                    id: id / 2,
                    clause: &self.lit_buf,
                    hints: &self.hint_buf,
                }))
            }
            b'd' => {
                self.id_buf.clear();
                loop {
                    match self.read_number()? {
                        0 => break,
                        code => self.id_buf.push(code / 2),
                    }
                }
                Ok(Some(LratStep::Delete { ids: &self.id_buf }))
            }
            other => Err(binary_error(
                offset,
                format!("unexpected step marker 0x{:02x}", other),
            )),
        }
    }

    fn read_number(&mut self) -> Result<u64, ParseError> {
        let mut counter = CountingReader {
            inner: &mut self.source,
            count: 0,
        };
        let result = leb128::read::unsigned(&mut counter);
        let offset = self.offset;
        self.offset += counter.count;
        match result {
            Ok(value) => Ok(value),
            Err(leb128::read::Error::IoError(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Err(binary_error(offset, "unexpected end of input"))
            }
            Err(leb128::read::Error::IoError(err)) => Err(err.into()),
            Err(leb128::read::Error::Overflow) => Err(binary_error(offset, "number overflow")),
        }
    }
}

struct CountingReader<'a, R> {
    inner: &'a mut R,
    count: u64,
}

impl<'a, R: io::Read> io::Read for CountingReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.inner.read(buf)?;
        self.count += len as u64;
        Ok(len)
    }
}

fn text_error(line: usize, msg: impl Into<String>) -> ParseError {
    ParseError::Text {
        line,
        msg: msg.into(),
    }
}

fn binary_error(offset: u64, msg: impl Into<String>) -> ParseError {
    ParseError::Binary {
        offset,
        msg: msg.into(),
    }
}

fn parse_number<T: std::str::FromStr>(
    field: Option<&str>,
    line: usize,
    what: &str,
) -> Result<T, ParseError> {
    match field {
        None => Err(text_error(line, format!("missing {} or terminating 0", what))),
        Some(field) => field
            .parse()
            .map_err(|_| text_error(line, format!("invalid {} '{}'", what, field))),
    }
}

fn expect_end(field: Option<&str>, line: usize) -> Result<(), ParseError> {
    match field {
        None => Ok(()),
        Some(field) => Err(text_error(
            line,
            format!("unexpected '{}' after terminating 0", field),
        )),
    }
}
