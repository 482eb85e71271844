//! The symbol value carried on the parse stack.

use crate::error::{merge_spans, Span};

/// A terminal or non-terminal symbol together with its payload.
///
/// Symbols are produced by the scanner (terminals) or by semantic actions
/// (non-terminals). While a symbol sits on the parse stack the driver owns
/// it and `parse_state` records the LR state reached after shifting or
/// going to it; off the stack, `parse_state` is meaningless.
///
/// Ownership is exclusive: the stack transfers a symbol out on `pop`, an
/// action takes payloads out of the handle it is given, and symbols popped
/// during error recovery go through the driver's disposal path exactly once.
#[derive(Debug, Clone)]
pub struct Symbol<V> {
    /// Terminal or non-terminal id. Terminals and non-terminals are numbered
    /// in separate spaces; the action table is keyed by terminal ids and the
    /// reduce-goto table by non-terminal ids.
    pub sym_id: i16,
    /// LR state recorded by the driver on shift/goto. Only meaningful while
    /// the symbol is on the parse stack.
    pub parse_state: usize,
    /// Source region covered by this symbol, when known.
    pub span: Option<Span>,
    /// The payload owned by this symbol.
    pub value: V,
}

impl<V> Symbol<V> {
    /// A symbol with no span.
    #[inline]
    pub fn new(sym_id: i16, value: V) -> Self {
        Self { sym_id, parse_state: 0, span: None, value }
    }

    /// A symbol covering the given source region.
    #[inline]
    pub fn with_span(sym_id: i16, value: V, span: Option<Span>) -> Self {
        Self { sym_id, parse_state: 0, span, value }
    }

    /// Widen this symbol's span to also cover `other`.
    pub fn merge_span(&mut self, other: Option<Span>) {
        self.span = merge_spans(self.span, other);
    }
}
