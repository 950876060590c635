use std::iter::Peekable;
use std::str::Chars;

use crate::reader::ReadError;

/// A parsed CSV record together with the line on which it starts.
#[derive(Debug, PartialEq, Eq)]
pub(super) struct RawRecord {
    pub(super) line_nr: usize,
    pub(super) fields: Vec<Option<String>>,
}

/// Splits a CSV source into records.
///
/// Quoted fields may contain separators, doubled quotes and line breaks. Empty lines between
/// records are skipped. An unquoted empty field is reported as `None`, a quoted empty field as
/// an empty string.
pub(super) struct RecordParser<'src> {
    chars: Peekable<Chars<'src>>,
    line_nr: usize,
}

impl<'src> RecordParser<'src> {
    pub(super) fn new(source: &'src str) -> Self {
        let source = source.strip_prefix('\u{feff}').unwrap_or(source);

        RecordParser {
            chars: source.chars().peekable(),
            line_nr: 1,
        }
    }

    /// Parse the next record, or return `Ok(None)` when the source is exhausted.
    pub(super) fn next_record(&mut self) -> Result<Option<RawRecord>, ReadError> {
        self.skip_empty_lines();

        if self.chars.peek().is_none() {
            return Ok(None);
        }

        let line_nr = self.line_nr;
        let mut fields = vec![];

        loop {
            let field = self.parse_field()?;
            fields.push(field);

            match self.chars.next() {
                Some(',') => continue,
                Some('\n') => {
                    self.line_nr += 1;
                    break;
                }
                Some('\r') => {
                    if self.chars.peek() == Some(&'\n') {
                        let _ = self.chars.next();
                    }
                    self.line_nr += 1;
                    break;
                }
                None => break,
                Some(c) => {
                    return Err(ReadError::ParseError {
                        line_nr: self.line_nr,
                        reason: format!("unexpected character '{c}' after field"),
                    });
                }
            }
        }

        Ok(Some(RawRecord { line_nr, fields }))
    }

    fn skip_empty_lines(&mut self) {
        while let Some(&c) = self.chars.peek() {
            match c {
                '\n' => self.line_nr += 1,
                '\r' => {}
                _ => return,
            }
            let _ = self.chars.next();
        }
    }

    /// Parses a field, leaving the terminating separator or line break in the input.
    fn parse_field(&mut self) -> Result<Option<String>, ReadError> {
        if self.chars.peek() == Some(&'"') {
            let _ = self.chars.next();
            return self.parse_quoted_field().map(Some);
        }

        let mut field = String::new();
        while let Some(&c) = self.chars.peek() {
            match c {
                ',' | '\n' | '\r' => break,
                '"' => {
                    return Err(ReadError::ParseError {
                        line_nr: self.line_nr,
                        reason: "quote inside an unquoted field".to_owned(),
                    });
                }
                c => {
                    field.push(c);
                    let _ = self.chars.next();
                }
            }
        }

        if field.is_empty() {
            Ok(None)
        } else {
            Ok(Some(field))
        }
    }

    /// Parses the remainder of a quoted field, after the opening quote.
    fn parse_quoted_field(&mut self) -> Result<String, ReadError> {
        let start_line = self.line_nr;
        let mut field = String::new();

        loop {
            match self.chars.next() {
                None => {
                    return Err(ReadError::ParseError {
                        line_nr: start_line,
                        reason: "unterminated quoted field".to_owned(),
                    });
                }
                Some('"') => {
                    if self.chars.peek() == Some(&'"') {
                        let _ = self.chars.next();
                        field.push('"');
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    if c == '\n' {
                        self.line_nr += 1;
                    }
                    field.push(c);
                }
            }
        }

        match self.chars.peek() {
            None | Some(',') | Some('\n') | Some('\r') => Ok(field),
            Some(c) => Err(ReadError::ParseError {
                line_nr: self.line_nr,
                reason: format!("unexpected character '{c}' after closing quote"),
            }),
        }
    }
}
