//! A small byte lexer implementing the runtime's scanner port.
//!
//! Turns a byte stream into calculator symbols with spans attached. There
//! is no token-mode machinery here; the calculator syntax is single-byte
//! operators, integer literals, and whitespace. Stray bytes and literals
//! out of `i64` range surface as scan errors with the offending span.

use crate::error::CalcError;
use crate::tables::sym;
use crate::token::CalcValue;
use parlr::{span, ParseError, Position, Scanner, Span, Symbol};
use smartstring::alias::String;

/// Byte-stream lexer for the calculator.
pub struct CalcLexer<I>
where
    I: Iterator<Item = u8>,
{
    input: std::iter::Peekable<I>,
    line: usize,
    column: usize,
}

impl<I> CalcLexer<I>
where
    I: Iterator<Item = u8>,
{
    pub fn new(input: I) -> Self {
        Self { input: input.peekable(), line: 1, column: 1 }
    }

    /// Consume one byte, tracking line/column.
    fn bump(&mut self) -> Option<u8> {
        let b = self.input.next()?;
        if b == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(b)
    }

    #[inline]
    fn pos(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn span_from(&self, start: Position) -> Option<Span> {
        Some(Span::new(start, self.pos()))
    }
}

impl<I> Scanner for CalcLexer<I>
where
    I: Iterator<Item = u8>,
{
    type Value = CalcValue;

    fn next_token(&mut self) -> Result<Symbol<CalcValue>, ParseError> {
        loop {
            let start = self.pos();
            let Some(b) = self.bump() else {
                let p = self.pos();
                return Ok(Symbol::with_span(
                    sym::EOF,
                    CalcValue::None,
                    span!(p.line, p.column, p.line, p.column),
                ));
            };
            let id = match b {
                b' ' | b'\t' | b'\r' | b'\n' => continue,
                b'0'..=b'9' => {
                    let mut text = String::new();
                    text.push(b as char);
                    while let Some(d) = self.input.peek().copied() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        self.bump();
                        text.push(d as char);
                    }
                    let span = self.span_from(start);
                    let n = text
                        .as_str()
                        .parse::<i64>()
                        .map_err(|e| ParseError::scan(CalcError::from(e), span))?;
                    log::trace!("lexed NUM {} at {}:{}", n, start.line, start.column);
                    return Ok(Symbol::with_span(sym::NUM, CalcValue::Num(n), span));
                }
                b'+' => sym::PLUS,
                b'-' => sym::MINUS,
                b'*' => sym::MUL,
                b'/' => sym::DIV,
                b'(' => sym::LPAREN,
                b')' => sym::RPAREN,
                b';' => sym::SEMI,
                byte => {
                    return Err(ParseError::scan(
                        CalcError::StrayByte { byte },
                        self.span_from(start),
                    ));
                }
            };
            return Ok(Symbol::with_span(id, CalcValue::None, self.span_from(start)));
        }
    }
}
