//! Panic-mode error recovery with parse-ahead validation.
//!
//! Recovery runs in four phases. First the real stack is unwound to a state
//! that can shift the reserved `error` symbol, and the error symbol is
//! shifted (symbols popped on the way out go through the disposal path).
//! Next a small buffer of lookahead symbols is read. The discard loop then
//! alternates speculative parse-ahead over the buffer (on a virtual stack,
//! executing no actions and leaving the real stack untouched) with
//! discarding the offending symbol and pulling one more from the input.
//! Once a parse-ahead run survives the whole buffer, the buffered symbols
//! are replayed through the real machinery, actions included, and control
//! returns to the normal driver.

use crate::error::{merge_spans, ParseError};
use crate::parser::{Parser, ParserDriver, Rhs, MAX_ERROR_SYNC_SIZE};
use crate::scanner::Scanner;
use crate::stack::VirtualStack;
use crate::symbol::Symbol;
use crate::tables::{decode_action, Action};
use std::collections::VecDeque;

/// Outcome of an error-recovery attempt.
#[derive(Debug)]
pub(crate) enum RecoveryStatus<V> {
    /// No recovery configuration, or end of input before one validated.
    Fail,
    /// The buffered symbols replayed cleanly; resume the normal loop.
    Success,
    /// Replay reached the accept reduction; the parse is over.
    Accept(Symbol<V>),
}

/// Bounded FIFO of symbols read past an error point.
///
/// `pos` is the cursor of the speculative parse-ahead walk; replay consumes
/// from the front instead. `0 <= pos <= len <= MAX_ERROR_SYNC_SIZE` always
/// holds.
#[derive(Debug)]
pub(crate) struct Lookahead<V> {
    buf: VecDeque<Symbol<V>>,
    pos: usize,
}

impl<V> Lookahead<V> {
    pub(crate) fn new() -> Self {
        Self { buf: VecDeque::with_capacity(MAX_ERROR_SYNC_SIZE), pos: 0 }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub(crate) fn push_back(&mut self, sym: Symbol<V>) {
        debug_assert!(self.buf.len() < MAX_ERROR_SYNC_SIZE);
        self.buf.push_back(sym);
    }

    /// Remove and return the front symbol, rewinding the cursor.
    pub(crate) fn pop_front(&mut self) -> Option<Symbol<V>> {
        self.pos = 0;
        self.buf.pop_front()
    }

    #[inline]
    pub(crate) fn front(&self) -> Option<&Symbol<V>> {
        self.buf.front()
    }

    /// The symbol under the parse-ahead cursor.
    ///
    /// # Panics
    ///
    /// Panics if the cursor is past the end of the buffer.
    #[inline]
    pub(crate) fn current(&self) -> &Symbol<V> {
        &self.buf[self.pos]
    }

    /// Step the cursor; returns whether a symbol remains under it.
    #[inline]
    pub(crate) fn advance(&mut self) -> bool {
        self.pos += 1;
        self.pos < self.buf.len()
    }

    #[inline]
    pub(crate) fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Empty the buffer, transferring the symbols to the caller.
    pub(crate) fn drain_all(&mut self) -> Vec<Symbol<V>> {
        self.pos = 0;
        self.buf.drain(..).collect()
    }
}

impl<S, D> Parser<S, D>
where
    D: ParserDriver,
    S: Scanner<Value = D::Value>,
{
    /// Attempt to recover from a syntax error at the current configuration.
    pub(crate) fn error_recovery(
        &mut self,
        debug: bool,
    ) -> Result<RecoveryStatus<D::Value>, ParseError> {
        if debug {
            log::debug!("attempting error recovery");
        }
        if !self.find_recovery_config(debug) {
            if debug {
                log::debug!("error recovery fails");
            }
            return Ok(RecoveryStatus::Fail);
        }
        self.read_lookahead()?;
        loop {
            if debug {
                log::debug!("trying to parse ahead");
            }
            if self.try_parse_ahead(debug)? {
                break;
            }
            // the error symbol itself may be end-of-input: nothing further
            // can be discarded
            if self.lookahead.front().map_or(true, |s| s.sym_id == Self::eof_sym()) {
                if debug {
                    log::debug!("error recovery fails at EOF");
                }
                return Ok(RecoveryStatus::Fail);
            }
            self.restart_lookahead()?;
        }
        if debug {
            log::debug!("parse-ahead ok, replaying buffered input");
        }
        self.parse_lookahead(debug)
    }

    /// Can the state on top of the real stack shift the `error` symbol?
    fn shift_under_error(&self) -> bool {
        Self::action_of(self.stack.top_state(), Self::error_sym()) > 0
    }

    /// Unwind the real stack to a state with a shift under `error`, then
    /// shift a synthesized error symbol. Returns `false` when the stack
    /// empties first. Every popped symbol goes through the disposal path;
    /// the error symbol's span covers the unwound region plus the offending
    /// token.
    fn find_recovery_config(&mut self, debug: bool) -> bool {
        if debug {
            log::debug!("finding recovery state on stack");
            self.dump_stack();
        }
        let mut span = self.cur_token.as_ref().and_then(|t| t.span);
        while !self.shift_under_error() {
            if debug {
                log::debug!("popping state {}", self.stack.top_state());
            }
            let Some(sym) = self.stack.pop() else {
                return false;
            };
            span = merge_spans(span, sym.span);
            self.dispose(sym);
            if self.stack.is_empty() {
                return false;
            }
        }
        let act = Self::action_of(self.stack.top_state(), Self::error_sym());
        debug_assert!(act > 0);
        let mut err_sym = Symbol::with_span(Self::error_sym(), <D::Value>::default(), span);
        err_sym.parse_state = (act - 1) as usize;
        if debug {
            log::debug!("shifting error symbol into state {}", err_sym.parse_state);
        }
        self.stack.push(err_sym);
        true
    }

    /// Fill the lookahead buffer, starting with the offending symbol. EOF
    /// shortens the fill; it is always the buffer's last element when
    /// present.
    fn read_lookahead(&mut self) -> Result<(), ParseError> {
        debug_assert!(self.lookahead.is_empty());
        let Some(mut tok) = self.cur_token.take() else {
            return Err(ParseError::fatal("no lookahead at error point", None));
        };
        loop {
            let is_eof = tok.sym_id == Self::eof_sym();
            self.lookahead.push_back(tok);
            if is_eof || self.lookahead.len() >= self.error_sync_size {
                break;
            }
            tok = self.scan()?;
        }
        self.lookahead.rewind();
        Ok(())
    }

    /// Discard the front of the buffer through the disposal path and pull
    /// one fresh symbol in at the tail (unless the input already ended),
    /// rewinding the cursor.
    fn restart_lookahead(&mut self) -> Result<(), ParseError> {
        if let Some(discarded) = self.lookahead.pop_front() {
            if log::log_enabled!(log::Level::Trace) {
                log::trace!("discarding symbol #{}", discarded.sym_id);
            }
            self.dispose(discarded);
        }
        if !self.got_eof {
            let tok = self.scan()?;
            self.lookahead.push_back(tok);
        }
        self.lookahead.rewind();
        Ok(())
    }

    /// Simulate parsing the buffered symbols on a virtual stack, without
    /// executing actions or touching the real stack. Returns `true` when
    /// the whole buffer (or an accept) is reached without error.
    pub(crate) fn try_parse_ahead(&mut self, debug: bool) -> Result<bool, ParseError> {
        let mut vstack = VirtualStack::new(&self.stack);
        self.lookahead.rewind();
        loop {
            let sym = self.lookahead.current().sym_id;
            match decode_action(Self::action_of(vstack.top(), sym)) {
                Action::Error => return Ok(false),
                Action::Shift(state) => {
                    if debug {
                        log::debug!("parse-ahead shifts symbol #{} into state {}", sym, state);
                    }
                    vstack.push(state);
                    if !self.lookahead.advance() {
                        return Ok(true);
                    }
                }
                Action::Reduce(prod) => {
                    if prod == Self::start_production() {
                        if debug {
                            log::debug!("parse-ahead accepts");
                        }
                        return Ok(true);
                    }
                    let entry = Self::production(prod);
                    for _ in 0..entry.rhs_size {
                        if !vstack.pop() {
                            return Err(ParseError::fatal(
                                "virtual stack underflow during parse-ahead",
                                None,
                            ));
                        }
                    }
                    let goto = Self::goto_of(vstack.top(), entry.lhs_sym);
                    if goto < 0 {
                        return Err(ParseError::fatal("no goto during parse-ahead", None));
                    }
                    if debug {
                        log::debug!(
                            "parse-ahead reduces by production {} and goes to state {}",
                            prod,
                            goto
                        );
                    }
                    vstack.push(goto as usize);
                }
            }
        }
    }

    /// Replay the validated buffer through the real machinery: real shifts,
    /// real reductions, semantic actions in buffer order. Returns once the
    /// buffer is exhausted or the accept reduction fires.
    fn parse_lookahead(&mut self, debug: bool) -> Result<RecoveryStatus<D::Value>, ParseError> {
        if debug {
            log::debug!("replaying buffered symbols");
            self.dump_stack();
        }
        self.lookahead.rewind();
        while !self.lookahead.is_empty() {
            let state = self.stack.top_state();
            let Some(sym_id) = self.lookahead.front().map(|s| s.sym_id) else {
                break;
            };
            match decode_action(Self::action_of(state, sym_id)) {
                Action::Shift(new_state) => {
                    let Some(mut tok) = self.lookahead.pop_front() else {
                        return Err(ParseError::fatal("lookahead underflow during replay", None));
                    };
                    log::trace!("shift symbol #{} -> state {}", tok.sym_id, new_state);
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
                    let lhs_sym = {
                        let Some(la) = self.lookahead.front() else {
                            return Err(ParseError::fatal(
                                "lookahead underflow during replay",
                                None,
                            ));
                        };
                        let mut rhs = Rhs::new(self.stack.handle_mut(entry.rhs_size));
                        self.driver.do_action(prod, &mut rhs, la)?
                    };
                    self.stack.npop(entry.rhs_size);
                    self.stats.reductions += 1;
                    if prod == Self::start_production() {
                        if debug {
                            log::debug!("replay accepts");
                        }
                        return Ok(RecoveryStatus::Accept(lhs_sym));
                    }
                    let goto = Self::goto_of(self.stack.top_state(), entry.lhs_sym);
                    if goto < 0 {
                        return Err(ParseError::fatal("no goto during replay", lhs_sym.span));
                    }
                    let mut lhs_sym = lhs_sym;
                    lhs_sym.parse_state = goto as usize;
                    self.stack.push(lhs_sym);
                }
                Action::Error => {
                    // parse-ahead validated this buffer; only corrupt tables
                    // can land here
                    return Err(ParseError::fatal("syntax error during validated replay", None));
                }
            }
        }
        Ok(RecoveryStatus::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Disposal, ParserStats};
    use crate::tables::{ParserTables, ProdEntry, ROW_SENTINEL};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    // Fixture grammar with an error production:
    //   0: $start -> list EOF
    //   1: list   -> (empty)
    //   2: list   -> NUM SEMI list
    //   3: list   -> error SEMI list
    // Terminals: EOF=0, error=1, NUM=2, SEMI=3. Non-terminals: $start=0,
    // list=1. The list payload counts statements that parsed cleanly.
    const T_EOF: i16 = 0;
    const T_NUM: i16 = 2;
    const T_SEMI: i16 = 3;

    struct ListTables;

    impl ParserTables for ListTables {
        fn production(prod: usize) -> ProdEntry {
            match prod {
                0 => ProdEntry { lhs_sym: 0, rhs_size: 2 },
                1 => ProdEntry { lhs_sym: 1, rhs_size: 0 },
                2 | 3 => ProdEntry { lhs_sym: 1, rhs_size: 3 },
                _ => unreachable!("unknown production {prod}"),
            }
        }

        fn action_row(state: usize) -> &'static [i16] {
            const ROWS: [&[i16]; 9] = [
                &[0, -2, 1, 4, 2, 3, ROW_SENTINEL, 0], // 0: list starters
                &[0, 5, ROW_SENTINEL, 0],              // 1: $start -> list . EOF
                &[3, 6, ROW_SENTINEL, 0],              // 2: list -> NUM . SEMI list
                &[3, 7, ROW_SENTINEL, 0],              // 3: list -> error . SEMI list
                &[ROW_SENTINEL, -1],                   // 4: accept reduce
                &[0, -2, 1, 4, 2, 3, ROW_SENTINEL, 0], // 5: list -> NUM SEMI . list
                &[0, -2, 1, 4, 2, 3, ROW_SENTINEL, 0], // 6: list -> error SEMI . list
                &[ROW_SENTINEL, -3],                   // 7: list -> NUM SEMI list .
                &[ROW_SENTINEL, -4],                   // 8: list -> error SEMI list .
            ];
            ROWS[state]
        }

        fn reduce_row(state: usize) -> &'static [i16] {
            const ROWS: [&[i16]; 9] = [
                &[1, 1, ROW_SENTINEL, -1],
                &[ROW_SENTINEL, -1],
                &[ROW_SENTINEL, -1],
                &[ROW_SENTINEL, -1],
                &[ROW_SENTINEL, -1],
                &[1, 7, ROW_SENTINEL, -1],
                &[1, 8, ROW_SENTINEL, -1],
                &[ROW_SENTINEL, -1],
                &[ROW_SENTINEL, -1],
            ];
            ROWS[state]
        }

        fn start_state() -> usize {
            0
        }
        fn start_production() -> usize {
            0
        }
        fn eof_sym() -> i16 {
            0
        }
        fn error_sym() -> i16 {
            1
        }
    }

    #[derive(Default)]
    struct ListDriver {
        reduces: Vec<usize>,
        fatals: usize,
        disposed: Vec<i16>,
    }

    impl ParserDriver for ListDriver {
        type Tables = ListTables;
        type Value = i64;

        fn do_action(
            &mut self,
            prod: usize,
            rhs: &mut Rhs<'_, i64>,
            _lookahead: &Symbol<i64>,
        ) -> Result<Symbol<i64>, ParseError> {
            self.reduces.push(prod);
            match prod {
                // $start -> list EOF
                0 => Ok(Symbol::new(0, rhs.take_value(0))),
                // list -> (empty)
                1 => Ok(Symbol::new(1, 0)),
                // list -> NUM SEMI list
                2 => Ok(Symbol::new(1, rhs.take_value(2) + 1)),
                // list -> error SEMI list
                3 => Ok(Symbol::new(1, rhs.take_value(2))),
                _ => unreachable!(),
            }
        }

        fn report_fatal_error(&mut self, _message: &str, _sym: Option<&Symbol<i64>>) {
            self.fatals += 1;
        }

        fn dispose_of(&mut self, sym: Symbol<i64>) {
            self.disposed.push(sym.sym_id);
        }
    }

    struct VecScanner {
        toks: std::vec::IntoIter<i16>,
        done: bool,
    }

    impl VecScanner {
        fn new(toks: Vec<i16>) -> Self {
            Self { toks: toks.into_iter(), done: false }
        }
    }

    impl Scanner for VecScanner {
        type Value = i64;

        fn next_token(&mut self) -> Result<Symbol<i64>, ParseError> {
            assert!(!self.done, "scanner called after EOF");
            match self.toks.next() {
                Some(id) => {
                    if id == T_EOF {
                        self.done = true;
                    }
                    Ok(Symbol::new(id, 0))
                }
                None => panic!("scanner exhausted"),
            }
        }
    }

    fn list_parser(toks: Vec<i16>) -> Parser<VecScanner, ListDriver> {
        Parser::new(VecScanner::new(toks), ListDriver::default())
    }

    #[test]
    fn lookahead_cursor_invariants() {
        let mut la: Lookahead<i64> = Lookahead::new();
        la.push_back(Symbol::new(T_SEMI, 0));
        la.push_back(Symbol::new(T_NUM, 0));
        assert_eq!(la.len(), 2);
        assert_eq!(la.current().sym_id, T_SEMI);
        assert!(la.advance());
        assert_eq!(la.current().sym_id, T_NUM);
        assert!(!la.advance());
        la.rewind();
        assert_eq!(la.current().sym_id, T_SEMI);
        let front = la.pop_front().unwrap();
        assert_eq!(front.sym_id, T_SEMI);
        assert_eq!(la.current().sym_id, T_NUM);
    }

    #[test]
    fn recovers_by_discarding_to_a_statement_boundary() {
        init_logger();
        // NUM NUM SEMI NUM SEMI EOF: the doubled NUM is a syntax error; the
        // first statement is swallowed by the error production, the second
        // parses cleanly.
        let mut p = list_parser(vec![T_NUM, T_NUM, T_SEMI, T_NUM, T_SEMI, T_EOF]);
        let accept = p.parse().unwrap();
        assert_eq!(accept.value, 1);
        // one symbol unwound from the stack, one discarded from the input,
        // each disposed exactly once
        assert_eq!(p.driver().disposed, vec![T_NUM, T_NUM]);
        // actions fire in canonical order over the repaired stream
        assert_eq!(p.driver().reduces, vec![1, 2, 3, 0]);
        let ParserStats { syntax_errors, recoveries, .. } = p.stats();
        assert_eq!(syntax_errors, 1);
        assert_eq!(recoveries, 1);
        assert_eq!(p.driver().fatals, 0);
    }

    #[test]
    fn fails_when_eof_reaches_the_front_of_the_buffer() {
        init_logger();
        let mut p = list_parser(vec![T_NUM, T_NUM, T_EOF]);
        let err = p.parse().unwrap_err();
        assert!(matches!(err, ParseError::Fatal { .. }));
        assert_eq!(p.driver().fatals, 1);
        assert_eq!(p.driver().disposed, vec![T_NUM, T_NUM]);
        assert_eq!(p.stats().recoveries, 0);
    }

    #[test]
    fn eof_as_error_token_fails_without_discarding() {
        init_logger();
        // NUM EOF: error at EOF, which is the first (and only) buffered
        // symbol; recovery must give up immediately.
        let mut p = list_parser(vec![T_NUM, T_EOF]);
        let err = p.parse().unwrap_err();
        assert!(matches!(err, ParseError::Fatal { .. }));
        assert_eq!(p.driver().fatals, 1);
        // only the unwound NUM was disposed; EOF was never discarded
        assert_eq!(p.driver().disposed, vec![T_NUM]);
    }

    #[test]
    fn deferred_disposal_batches_until_drained() {
        init_logger();
        let mut p = list_parser(vec![T_NUM, T_NUM, T_SEMI, T_NUM, T_SEMI, T_EOF]);
        p.set_disposal(Disposal::Deferred);
        let accept = p.parse().unwrap();
        assert_eq!(accept.value, 1);
        assert!(p.driver().disposed.is_empty());
        assert_eq!(p.pending.len(), 2);
        p.drain_pending();
        assert_eq!(p.driver().disposed.len(), 2);
        assert!(p.pending.is_empty());
    }

    #[test]
    fn parse_ahead_leaves_the_real_stack_untouched() {
        init_logger();
        let mut p = list_parser(vec![]);
        let mut bottom = Symbol::new(0, 0i64);
        bottom.parse_state = 0;
        p.stack.push(bottom);
        let mut err_sym = Symbol::new(1, 0i64);
        err_sym.parse_state = 3;
        p.stack.push(err_sym);
        p.lookahead.push_back(Symbol::new(T_SEMI, 0));
        p.lookahead.push_back(Symbol::new(T_EOF, 0));
        p.lookahead.rewind();

        let before: Vec<(i16, usize)> = (0..p.stack.size())
            .map(|i| {
                let s = p.stack.element_at(i);
                (s.sym_id, s.parse_state)
            })
            .collect();
        // SEMI EOF parses through: shift SEMI, reduce the empty list, reduce
        // the error production, shift EOF
        assert!(p.try_parse_ahead(false).unwrap());
        let after: Vec<(i16, usize)> = (0..p.stack.size())
            .map(|i| {
                let s = p.stack.element_at(i);
                (s.sym_id, s.parse_state)
            })
            .collect();
        assert_eq!(before, after);
        assert_eq!(p.lookahead.len(), 2);
        // no action ran, nothing was disposed
        assert!(p.driver().reduces.is_empty());
        assert!(p.driver().disposed.is_empty());
    }

    #[test]
    fn error_symbol_span_covers_the_unwound_region() {
        init_logger();

        struct SpanScanner {
            toks: std::vec::IntoIter<Symbol<i64>>,
        }
        impl Scanner for SpanScanner {
            type Value = i64;
            fn next_token(&mut self) -> Result<Symbol<i64>, ParseError> {
                Ok(self.toks.next().expect("scanner exhausted"))
            }
        }

        // capture the error symbol's span at the error-production reduce
        #[derive(Default)]
        struct SpanDriver {
            inner: ListDriver,
            error_span: Option<crate::Span>,
        }
        impl ParserDriver for SpanDriver {
            type Tables = ListTables;
            type Value = i64;

            fn do_action(
                &mut self,
                prod: usize,
                rhs: &mut Rhs<'_, i64>,
                lookahead: &Symbol<i64>,
            ) -> Result<Symbol<i64>, ParseError> {
                if prod == 3 {
                    self.error_span = rhs.span(0);
                }
                self.inner.do_action(prod, rhs, lookahead)
            }
        }

        let toks = vec![
            Symbol::with_span(T_NUM, 0, crate::span!(1, 1, 1, 2)),
            Symbol::with_span(T_NUM, 0, crate::span!(1, 4, 1, 5)),
            Symbol::with_span(T_SEMI, 0, crate::span!(1, 6, 1, 7)),
            Symbol::with_span(T_EOF, 0, crate::span!(1, 8, 1, 8)),
        ];
        let scanner = SpanScanner { toks: toks.into_iter() };
        let mut p = Parser::new(scanner, SpanDriver::default());
        let accept = p.parse().unwrap();
        assert_eq!(accept.value, 0);
        // unwound NUM at 1:1 merged with the offending NUM at 1:4
        assert_eq!(p.driver().error_span, crate::span!(1, 1, 1, 5));
    }
}
