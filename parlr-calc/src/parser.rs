//! Semantic actions and the calculator parser.
//!
//! [`CalcDriver`] couples the calculator tables with the actions run at each
//! reduction: `exp` productions evaluate arithmetic, `session` productions
//! accumulate statement results in input order, and the start production
//! hands the accumulated list to the accept symbol. [`CalcParser`] is the
//! thin wrapper embedders use: bytes in, statement results out.
//!
//! A statement swallowed by the `error` production contributes no result;
//! parsing continues with the next statement. Division by zero fails the
//! reduction and aborts the parse.

use crate::lexer::CalcLexer;
use crate::tables::{nt, prod, CalcTables};
use crate::token::CalcValue;
use parlr::{ParseError, Parser, ParserDriver, ParserStats, Rhs, Symbol};

/// Semantic actions for the calculator grammar.
pub struct CalcDriver;

impl ParserDriver for CalcDriver {
    type Tables = CalcTables;
    type Value = CalcValue;

    fn do_action(
        &mut self,
        prod_id: usize,
        rhs: &mut Rhs<'_, CalcValue>,
        lookahead: &Symbol<CalcValue>,
    ) -> Result<Symbol<CalcValue>, ParseError> {
        let sym = match prod_id {
            prod::START => {
                // $start -> session EOF
                let value = rhs.take_value(0);
                Symbol::with_span(nt::START, value, rhs.merged_span())
            }
            prod::SESSION_EMPTY => {
                // session ->
                Symbol::with_span(nt::SESSION, CalcValue::Session(Vec::new()), lookahead.span)
            }
            prod::SESSION_STMT => {
                // session -> exp SEMI session
                let CalcValue::Num(value) = rhs.take_value(0) else {
                    unreachable!()
                };
                let CalcValue::Session(mut results) = rhs.take_value(2) else {
                    unreachable!()
                };
                results.insert(0, value);
                Symbol::with_span(nt::SESSION, CalcValue::Session(results), rhs.merged_span())
            }
            prod::SESSION_ERROR => {
                // session -> error SEMI session
                let CalcValue::Session(results) = rhs.take_value(2) else {
                    unreachable!()
                };
                Symbol::with_span(nt::SESSION, CalcValue::Session(results), rhs.merged_span())
            }
            prod::EXP_NUM => {
                // exp -> NUM
                let value = rhs.take_value(0);
                Symbol::with_span(nt::EXP, value, rhs.span(0))
            }
            prod::EXP_PLUS | prod::EXP_MINUS | prod::EXP_MUL | prod::EXP_DIV => {
                // exp -> exp op exp
                let CalcValue::Num(value1) = rhs.take_value(0) else {
                    unreachable!()
                };
                let CalcValue::Num(value2) = rhs.take_value(2) else {
                    unreachable!()
                };
                let value = match prod_id {
                    prod::EXP_PLUS => value1.wrapping_add(value2),
                    prod::EXP_MINUS => value1.wrapping_sub(value2),
                    prod::EXP_MUL => value1.wrapping_mul(value2),
                    _ => {
                        if value2 == 0 {
                            return Err(ParseError::action("division by zero", rhs.merged_span()));
                        }
                        value1.wrapping_div(value2)
                    }
                };
                Symbol::with_span(nt::EXP, CalcValue::Num(value), rhs.merged_span())
            }
            prod::EXP_PAREN => {
                // exp -> ( exp )
                let value = rhs.take_value(1);
                Symbol::with_span(nt::EXP, value, rhs.merged_span())
            }
            _ => unreachable!("unknown production {prod_id}"),
        };
        Ok(sym)
    }
}

/// The calculator parser: a byte stream in, one `Vec<i64>` of statement
/// results out.
///
/// Statements are semicolon-terminated expressions. A malformed statement
/// is reported through the driver's error callbacks, repaired by panic-mode
/// recovery, and contributes no result; when recovery is impossible the
/// parse ends with a fatal [`ParseError`].
///
/// # Example
///
/// ```rust
/// # use parlr_calc::CalcParser;
/// let mut parser = CalcParser::new("1 + 2; 6 * 7;".bytes());
/// assert_eq!(parser.parse().unwrap(), vec![3, 42]);
/// ```
pub struct CalcParser<I>
where
    I: Iterator<Item = u8>,
{
    parser: Parser<CalcLexer<I>, CalcDriver>,
}

impl<I> CalcParser<I>
where
    I: Iterator<Item = u8>,
{
    pub fn new(input: I) -> Self {
        Self { parser: Parser::new(CalcLexer::new(input), CalcDriver) }
    }

    /// Run the parse and return the statement results in input order.
    pub fn parse(&mut self) -> Result<Vec<i64>, ParseError> {
        Self::into_results(self.parser.parse()?)
    }

    /// Like [`parse`](CalcParser::parse), with shift/reduce diagnostics at
    /// `debug` level.
    pub fn debug_parse(&mut self) -> Result<Vec<i64>, ParseError> {
        Self::into_results(self.parser.debug_parse()?)
    }

    /// Counters for the most recent run.
    pub fn stats(&self) -> ParserStats {
        self.parser.stats()
    }

    /// How many symbols past an error must parse cleanly for recovery.
    pub fn set_error_sync_size(&mut self, n: usize) -> Result<(), ParseError> {
        self.parser.set_error_sync_size(n)
    }

    fn into_results(accept: Symbol<CalcValue>) -> Result<Vec<i64>, ParseError> {
        match accept.value {
            CalcValue::Session(results) => Ok(results),
            other => Err(ParseError::fatal(
                format!("accept symbol carried {:?}", other),
                accept.span,
            )),
        }
    }
}

/// Parse a string of calculator statements.
pub fn eval(input: &str) -> Result<Vec<i64>, ParseError> {
    CalcParser::new(input.bytes()).parse()
}
