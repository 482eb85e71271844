//! The table-driven LR driver.
//!
//! The driver runs the shift/reduce loop over generator-supplied tables
//! (see [`ParserTables`]), pulling symbols from a [`Scanner`] and invoking
//! the embedder's semantic actions through a [`ParserDriver`]. Syntax errors
//! trigger panic-mode recovery with parse-ahead validation (see the
//! `recovery` module); unrecovered errors surface as
//! [`ParseError::Fatal`](crate::ParseError).
//!
//! A parser is built from a scanner and a driver:
//!
//! ```text
//! let mut parser = Parser::new(lexer, MyDriver::default());
//! let accept = parser.parse()?;
//! ```
//!
//! `parse()` returns the accept symbol produced by the start production's
//! action. `debug_parse()` behaves identically and additionally emits
//! shift/reduce and stack-dump diagnostics at `debug` level through the
//! `log` facade.

use crate::error::ParseError;
use crate::recovery::{Lookahead, RecoveryStatus};
use crate::scanner::Scanner;
use crate::stack::ParseStack;
use crate::symbol::Symbol;
use crate::tables::{decode_action, get_action, get_reduce, Action, ParserTables, ProdEntry};
use crate::Span;
use smartstring::alias::String;
use std::fmt::Debug;

/// Capacity bound of the lookahead buffer used by error recovery.
pub const MAX_ERROR_SYNC_SIZE: usize = 8;

/// Default number of symbols past an error that must parse cleanly for a
/// recovery to count as successful.
pub const DEFAULT_ERROR_SYNC_SIZE: usize = 3;

/// Read access to the handle (the RHS symbols about to be reduced).
///
/// Position `0` is the leftmost RHS symbol, `len() - 1` the stack top. An
/// action takes the payloads it consumes with [`take_value`](Rhs::take_value)
/// and builds the LHS symbol from them; it cannot push or pop. The driver
/// pops the handle itself after the action returns.
pub struct Rhs<'a, V> {
    syms: &'a mut [Symbol<V>],
}

impl<'a, V> Rhs<'a, V> {
    pub(crate) fn new(syms: &'a mut [Symbol<V>]) -> Self {
        Self { syms }
    }

    /// Number of RHS symbols (the production's RHS size).
    #[inline]
    pub fn len(&self) -> usize {
        self.syms.len()
    }

    /// True for an empty production.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.syms.is_empty()
    }

    /// The symbol at position `i`, counted from the left end of the handle.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn sym(&self, i: usize) -> &Symbol<V> {
        &self.syms[i]
    }

    /// The payload at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn value(&self, i: usize) -> &V {
        &self.syms[i].value
    }

    /// Take ownership of the payload at position `i`, leaving the default
    /// value behind.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn take_value(&mut self, i: usize) -> V
    where
        V: Default,
    {
        std::mem::take(&mut self.syms[i].value)
    }

    /// The span of the symbol at position `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[inline]
    pub fn span(&self, i: usize) -> Option<Span> {
        self.syms[i].span
    }

    /// The union of all RHS spans, for the LHS symbol.
    pub fn merged_span(&self) -> Option<Span> {
        self.syms
            .iter()
            .fold(None, |acc, s| crate::error::merge_spans(acc, s.span))
    }
}

/// The generated side of a parser: tables, semantic actions, and the
/// overridable diagnostic callbacks.
///
/// `do_action` is required; everything else has the conventional default.
/// The driver engine is handed in nowhere: an action receives everything it
/// may consult as arguments, so there is no cyclic engine/driver reference
/// to manage.
pub trait ParserDriver {
    /// The generated tables this driver's actions belong to.
    type Tables: ParserTables;
    /// The payload type carried by symbols. `default()` is the payload of
    /// synthesized EOF and `error` symbols.
    type Value: Default + Debug;

    /// Execute the semantic action for a reduce by production `prod` and
    /// return the LHS symbol. `rhs` is the handle about to be popped;
    /// `lookahead` is the current input symbol (useful for positioning the
    /// result of an empty production). The driver assigns the returned
    /// symbol's `parse_state` itself.
    fn do_action(
        &mut self,
        prod: usize,
        rhs: &mut Rhs<'_, Self::Value>,
        lookahead: &Symbol<Self::Value>,
    ) -> Result<Symbol<Self::Value>, ParseError>;

    /// Embedder initialization, run before the first symbol is requested.
    fn user_init(&mut self) -> Result<(), ParseError> {
        Ok(())
    }

    /// Action-side initialization, run before any parse action.
    fn init_actions(&mut self) -> Result<(), ParseError> {
        Ok(())
    }

    /// Called as soon as a syntax error is detected, before recovery.
    fn syntax_error(&mut self, cur_token: &Symbol<Self::Value>) {
        self.report_error("syntax error", Some(cur_token));
    }

    /// Called when syntax-error recovery has failed.
    fn unrecovered_syntax_error(&mut self, cur_token: &Symbol<Self::Value>) {
        self.report_fatal_error("couldn't repair and continue parse", Some(cur_token));
    }

    /// Report a non-fatal error or warning.
    fn report_error(&mut self, message: &str, sym: Option<&Symbol<Self::Value>>) {
        match sym.and_then(|s| s.span) {
            Some(sp) => log::error!("{} at {}", message, sp.display()),
            None => log::error!("{}", message),
        }
    }

    /// Report a fatal error. The parse does not resume afterwards; `parse()`
    /// returns the fatal condition as an `Err`. Embedders wanting non-local
    /// termination may panic here instead.
    fn report_fatal_error(&mut self, message: &str, sym: Option<&Symbol<Self::Value>>) {
        self.report_error(message, sym);
    }

    /// Called once for every symbol popped or discarded during error
    /// recovery. The default destroys the symbol immediately.
    fn dispose_of(&mut self, sym: Symbol<Self::Value>) {
        drop(sym);
    }
}

/// When recovery-popped symbols are handed to [`ParserDriver::dispose_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposal {
    /// Dispose each symbol as it is popped.
    #[default]
    Immediate,
    /// Collect popped symbols on a pending list, drained through
    /// `dispose_of` by [`Parser::drain_pending`] or on drop. Destruction
    /// order is unspecified but exhaustive.
    Deferred,
}

/// Counters accumulated over one `parse()` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserStats {
    /// Symbols obtained from the scanner.
    pub tokens: usize,
    /// Shift steps, including replayed ones.
    pub shifts: usize,
    /// Reduce steps, including replayed ones. Speculative parse-ahead is
    /// not counted.
    pub reductions: usize,
    /// Syntax errors detected.
    pub syntax_errors: usize,
    /// Syntax errors recovered from.
    pub recoveries: usize,
}

/// The LR parse engine.
///
/// Generic over the scanner `S` and the generated driver `D`; table access
/// monomorphises through `D::Tables`.
pub struct Parser<S, D>
where
    D: ParserDriver,
    S: Scanner<Value = D::Value>,
{
    scanner: S,
    pub(crate) driver: D,
    pub(crate) stack: ParseStack<D::Value>,
    pub(crate) cur_token: Option<Symbol<D::Value>>,
    pub(crate) lookahead: Lookahead<D::Value>,
    pub(crate) got_eof: bool,
    pub(crate) error_sync_size: usize,
    disposal: Disposal,
    pub(crate) pending: Vec<Symbol<D::Value>>,
    pub(crate) stats: ParserStats,
}

impl<S, D> Parser<S, D>
where
    D: ParserDriver,
    S: Scanner<Value = D::Value>,
{
    /// Build a parser over `scanner` with the given driver.
    pub fn new(scanner: S, driver: D) -> Self {
        Self {
            scanner,
            driver,
            stack: ParseStack::new(),
            cur_token: None,
            lookahead: Lookahead::new(),
            got_eof: false,
            error_sync_size: DEFAULT_ERROR_SYNC_SIZE,
            disposal: Disposal::default(),
            pending: Vec::new(),
            stats: ParserStats::default(),
        }
    }

    /// Replace the scanner, returning the previous one.
    pub fn set_scanner(&mut self, scanner: S) -> S {
        std::mem::replace(&mut self.scanner, scanner)
    }

    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    pub fn scanner_mut(&mut self) -> &mut S {
        &mut self.scanner
    }

    /// Replace the action driver, returning the previous one.
    pub fn set_driver(&mut self, driver: D) -> D {
        std::mem::replace(&mut self.driver, driver)
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Set how many symbols past an error must parse cleanly for a recovery
    /// to succeed. Values outside `2..=MAX_ERROR_SYNC_SIZE` are rejected.
    pub fn set_error_sync_size(&mut self, n: usize) -> Result<(), ParseError> {
        if !(2..=MAX_ERROR_SYNC_SIZE).contains(&n) {
            return Err(ParseError::config(format!(
                "error_sync_size {} out of range 2..={}",
                n, MAX_ERROR_SYNC_SIZE
            )));
        }
        self.error_sync_size = n;
        Ok(())
    }

    pub fn error_sync_size(&self) -> usize {
        self.error_sync_size
    }

    /// Choose immediate or deferred disposal of recovery-popped symbols.
    pub fn set_disposal(&mut self, disposal: Disposal) {
        self.disposal = disposal;
    }

    pub fn disposal(&self) -> Disposal {
        self.disposal
    }

    /// Hand every symbol on the pending-disposal list to
    /// [`ParserDriver::dispose_of`]. Also runs on drop.
    pub fn drain_pending(&mut self) {
        let pending: Vec<_> = self.pending.drain(..).collect();
        for sym in pending {
            self.driver.dispose_of(sym);
        }
    }

    /// Counters for the most recent `parse()` run.
    pub fn stats(&self) -> ParserStats {
        self.stats.clone()
    }

    /// Run the parse to acceptance or fatal error. On success the returned
    /// symbol is the one produced by the start production's action.
    pub fn parse(&mut self) -> Result<Symbol<D::Value>, ParseError> {
        self.run(false)
    }

    /// Identical to [`parse`](Parser::parse), with shift/reduce and
    /// stack-dump diagnostics emitted at `debug` level.
    pub fn debug_parse(&mut self) -> Result<Symbol<D::Value>, ParseError> {
        self.run(true)
    }

    fn run(&mut self, debug: bool) -> Result<Symbol<D::Value>, ParseError> {
        if !(2..=MAX_ERROR_SYNC_SIZE).contains(&self.error_sync_size) {
            return Err(ParseError::config(format!(
                "error_sync_size {} out of range 2..={}",
                self.error_sync_size, MAX_ERROR_SYNC_SIZE
            )));
        }
        self.driver.init_actions()?;
        self.driver.user_init()?;

        // Fresh configuration. Leftovers from an earlier run go through the
        // disposal path before the bottom marker is pushed.
        self.got_eof = false;
        self.stats = ParserStats::default();
        let leftovers = self.stack.remove_all_elements();
        for sym in leftovers {
            self.dispose(sym);
        }
        if let Some(tok) = self.cur_token.take() {
            self.dispose(tok);
        }
        for sym in self.lookahead.drain_all() {
            self.dispose(sym);
        }

        let mut bottom = Symbol::new(0, <D::Value>::default());
        bottom.parse_state = Self::start_state();
        self.stack.push(bottom);
        if debug {
            log::debug!("parse begins in state {}", Self::start_state());
        }

        loop {
            if self.cur_token.is_none() {
                self.cur_token = Some(self.scan()?);
            }
            let state = self.stack.top_state();
            let sym_id = self.cur_token.as_ref().map_or(Self::eof_sym(), |t| t.sym_id);

            match decode_action(Self::action_of(state, sym_id)) {
                Action::Shift(new_state) => {
                    let Some(mut tok) = self.cur_token.take() else {
                        return Err(ParseError::fatal("lookahead missing at shift", None));
                    };
                    log::trace!("shift symbol #{} -> state {}", tok.sym_id, new_state);
                    if debug {
                        self.debug_shift(&tok, new_state);
                    }
                    tok.parse_state = new_state;
                    self.stack.push(tok);
                    self.stats.shifts += 1;
                }

                Action::Reduce(prod) => {
                    let entry = Self::production(prod);
                    log::trace!(
                        "reduce by production {} (lhs #{}, rhs {})",
                        prod,
                        entry.lhs_sym,
                        entry.rhs_size
                    );
                    if debug {
                        self.debug_reduce(prod, entry);
                    }
                    let lhs_sym = {
                        let Some(la) = self.cur_token.as_ref() else {
                            return Err(ParseError::fatal("lookahead missing at reduce", None));
                        };
                        let mut rhs = Rhs::new(self.stack.handle_mut(entry.rhs_size));
                        self.driver.do_action(prod, &mut rhs, la)?
                    };
                    self.stack.npop(entry.rhs_size);
                    self.stats.reductions += 1;
                    if prod == Self::start_production() {
                        debug_assert_eq!(self.stack.size(), 1);
                        log::trace!("accept");
                        if debug {
                            log::debug!("parse accepts");
                        }
                        return Ok(lhs_sym);
                    }
                    let goto = Self::goto_of(self.stack.top_state(), entry.lhs_sym);
                    if goto < 0 {
                        return Err(ParseError::fatal(
                            format!(
                                "no goto from state {} under symbol #{}",
                                self.stack.top_state(),
                                entry.lhs_sym
                            ),
                            lhs_sym.span,
                        ));
                    }
                    let mut lhs_sym = lhs_sym;
                    lhs_sym.parse_state = goto as usize;
                    self.stack.push(lhs_sym);
                }

                Action::Error => {
                    self.stats.syntax_errors += 1;
                    if let Some(cur) = self.cur_token.as_ref() {
                        self.driver.syntax_error(cur);
                    }
                    match self.error_recovery(debug)? {
                        RecoveryStatus::Fail => {
                            // The offending symbol is still in hand when no
                            // recovery configuration existed, or sits at the
                            // front of the lookahead buffer when the discard
                            // loop hit EOF.
                            let sym = self
                                .cur_token
                                .take()
                                .or_else(|| self.lookahead.pop_front());
                            if let Some(s) = sym.as_ref() {
                                self.driver.unrecovered_syntax_error(s);
                            }
                            let span = sym.as_ref().and_then(|s| s.span);
                            return Err(ParseError::fatal(
                                "couldn't repair and continue parse",
                                span,
                            ));
                        }
                        RecoveryStatus::Success => {
                            self.stats.recoveries += 1;
                        }
                        RecoveryStatus::Accept(sym) => {
                            self.stats.recoveries += 1;
                            return Ok(sym);
                        }
                    }
                }
            }
        }
    }

    /// Get the next symbol, latching EOF. After the scanner has produced its
    /// EOF symbol it is never called again; further requests synthesize EOF.
    pub(crate) fn scan(&mut self) -> Result<Symbol<D::Value>, ParseError> {
        if self.got_eof {
            return Ok(Symbol::new(Self::eof_sym(), <D::Value>::default()));
        }
        let sym = self.scanner.next_token()?;
        if sym.sym_id == Self::eof_sym() {
            self.got_eof = true;
        }
        self.stats.tokens += 1;
        Ok(sym)
    }

    /// Route one recovery-popped symbol to its owner-of-last-resort.
    pub(crate) fn dispose(&mut self, sym: Symbol<D::Value>) {
        match self.disposal {
            Disposal::Immediate => self.driver.dispose_of(sym),
            Disposal::Deferred => self.pending.push(sym),
        }
    }

    /// Dump the current stack configuration at `debug` level.
    pub fn dump_stack(&self) {
        let mut output = String::new();
        for i in 0..self.stack.size() {
            let sym = self.stack.element_at(i);
            output.push_str(&format!("<{}>#{}  ", sym.parse_state, sym.sym_id));
        }
        log::debug!("stack: {}", output);
    }

    fn debug_shift(&self, tok: &Symbol<D::Value>, new_state: usize) {
        log::debug!("shift: symbol #{} -> state {}", tok.sym_id, new_state);
    }

    fn debug_reduce(&self, prod: usize, entry: ProdEntry) {
        log::debug!(
            "reduce: production {} (lhs #{}, rhs size {})",
            prod,
            entry.lhs_sym,
            entry.rhs_size
        );
        self.dump_stack();
    }

    #[inline]
    pub(crate) fn action_of(state: usize, sym: i16) -> i16 {
        get_action::<D::Tables>(state, sym)
    }

    #[inline]
    pub(crate) fn goto_of(state: usize, sym: i16) -> i16 {
        get_reduce::<D::Tables>(state, sym)
    }

    #[inline]
    pub(crate) fn production(prod: usize) -> ProdEntry {
        <D::Tables as ParserTables>::production(prod)
    }

    #[inline]
    fn start_state() -> usize {
        <D::Tables as ParserTables>::start_state()
    }

    #[inline]
    pub(crate) fn start_production() -> usize {
        <D::Tables as ParserTables>::start_production()
    }

    #[inline]
    pub(crate) fn eof_sym() -> i16 {
        <D::Tables as ParserTables>::eof_sym()
    }

    #[inline]
    pub(crate) fn error_sym() -> i16 {
        <D::Tables as ParserTables>::error_sym()
    }
}

impl<S, D> Drop for Parser<S, D>
where
    D: ParserDriver,
    S: Scanner<Value = D::Value>,
{
    fn drop(&mut self) {
        self.drain_pending();
    }
}
