//! Parse tables for the calculator grammar.
//!
//! This module plays the role of generator output: symbol ids, production
//! metadata, and the compacted SLR(1) action/goto tables for
//!
//! ```text
//!  0: $start  -> session EOF
//!  1: session ->
//!  2: session -> exp SEMI session
//!  3: session -> error SEMI session
//!  4: exp     -> NUM
//!  5: exp     -> exp PLUS exp
//!  6: exp     -> exp MINUS exp
//!  7: exp     -> exp MUL exp
//!  8: exp     -> exp DIV exp
//!  9: exp     -> LPAREN exp RPAREN
//! ```
//!
//! Shift/reduce conflicts are resolved in the tables: `MUL`/`DIV` bind
//! tighter than `PLUS`/`MINUS`, and all binary operators are
//! left-associative. Rows are sorted by symbol id, so binary row search is
//! enabled.

use parlr::{ParserTables, ProdEntry, ROW_SENTINEL};

/// Terminal ids.
pub mod sym {
    pub const EOF: i16 = 0;
    pub const ERROR: i16 = 1;
    pub const NUM: i16 = 2;
    pub const PLUS: i16 = 3;
    pub const MINUS: i16 = 4;
    pub const MUL: i16 = 5;
    pub const DIV: i16 = 6;
    pub const LPAREN: i16 = 7;
    pub const RPAREN: i16 = 8;
    pub const SEMI: i16 = 9;
}

/// Non-terminal ids.
pub mod nt {
    pub const START: i16 = 0;
    pub const SESSION: i16 = 1;
    pub const EXP: i16 = 2;
}

/// Production numbers.
pub mod prod {
    pub const START: usize = 0;
    pub const SESSION_EMPTY: usize = 1;
    pub const SESSION_STMT: usize = 2;
    pub const SESSION_ERROR: usize = 3;
    pub const EXP_NUM: usize = 4;
    pub const EXP_PLUS: usize = 5;
    pub const EXP_MINUS: usize = 6;
    pub const EXP_MUL: usize = 7;
    pub const EXP_DIV: usize = 8;
    pub const EXP_PAREN: usize = 9;
}

const PRODUCTIONS: [ProdEntry; 10] = [
    ProdEntry { lhs_sym: nt::START, rhs_size: 2 },   // $start -> session EOF
    ProdEntry { lhs_sym: nt::SESSION, rhs_size: 0 }, // session ->
    ProdEntry { lhs_sym: nt::SESSION, rhs_size: 3 }, // session -> exp SEMI session
    ProdEntry { lhs_sym: nt::SESSION, rhs_size: 3 }, // session -> error SEMI session
    ProdEntry { lhs_sym: nt::EXP, rhs_size: 1 },     // exp -> NUM
    ProdEntry { lhs_sym: nt::EXP, rhs_size: 3 },     // exp -> exp PLUS exp
    ProdEntry { lhs_sym: nt::EXP, rhs_size: 3 },     // exp -> exp MINUS exp
    ProdEntry { lhs_sym: nt::EXP, rhs_size: 3 },     // exp -> exp MUL exp
    ProdEntry { lhs_sym: nt::EXP, rhs_size: 3 },     // exp -> exp DIV exp
    ProdEntry { lhs_sym: nt::EXP, rhs_size: 3 },     // exp -> LPAREN exp RPAREN
];

const ACTION_ROWS: [&[i16]; 21] = [
    // 0: session starters; EOF reduces the empty session
    &[0, -2, 1, 4, 2, 5, 7, 6, ROW_SENTINEL, 0],
    // 1: $start -> session . EOF
    &[0, 7, ROW_SENTINEL, 0],
    // 2: session -> exp . SEMI session; exp -> exp . op exp
    &[3, 9, 4, 10, 5, 11, 6, 12, 9, 8, ROW_SENTINEL, 0],
    // 3: session -> error . SEMI session
    &[9, 13, ROW_SENTINEL, 0],
    // 4: exp -> NUM .
    &[ROW_SENTINEL, -5],
    // 5: exp -> LPAREN . exp RPAREN
    &[2, 5, 7, 6, ROW_SENTINEL, 0],
    // 6: $start -> session EOF .
    &[ROW_SENTINEL, -1],
    // 7: session -> exp SEMI . session
    &[0, -2, 1, 4, 2, 5, 7, 6, ROW_SENTINEL, 0],
    // 8: exp -> exp PLUS . exp
    &[2, 5, 7, 6, ROW_SENTINEL, 0],
    // 9: exp -> exp MINUS . exp
    &[2, 5, 7, 6, ROW_SENTINEL, 0],
    // 10: exp -> exp MUL . exp
    &[2, 5, 7, 6, ROW_SENTINEL, 0],
    // 11: exp -> exp DIV . exp
    &[2, 5, 7, 6, ROW_SENTINEL, 0],
    // 12: session -> error SEMI . session
    &[0, -2, 1, 4, 2, 5, 7, 6, ROW_SENTINEL, 0],
    // 13: exp -> LPAREN exp . RPAREN; exp -> exp . op exp
    &[3, 9, 4, 10, 5, 11, 6, 12, 8, 21, ROW_SENTINEL, 0],
    // 14: session -> exp SEMI session .
    &[ROW_SENTINEL, -3],
    // 15: exp -> exp PLUS exp .; shift MUL/DIV, otherwise reduce
    &[5, 11, 6, 12, ROW_SENTINEL, -6],
    // 16: exp -> exp MINUS exp .; shift MUL/DIV, otherwise reduce
    &[5, 11, 6, 12, ROW_SENTINEL, -7],
    // 17: exp -> exp MUL exp .
    &[ROW_SENTINEL, -8],
    // 18: exp -> exp DIV exp .
    &[ROW_SENTINEL, -9],
    // 19: session -> error SEMI session .
    &[ROW_SENTINEL, -4],
    // 20: exp -> LPAREN exp RPAREN .
    &[ROW_SENTINEL, -10],
];

const REDUCE_ROWS: [&[i16]; 21] = [
    &[1, 1, 2, 2, ROW_SENTINEL, -1],  // 0
    &[ROW_SENTINEL, -1],              // 1
    &[ROW_SENTINEL, -1],              // 2
    &[ROW_SENTINEL, -1],              // 3
    &[ROW_SENTINEL, -1],              // 4
    &[2, 13, ROW_SENTINEL, -1],       // 5
    &[ROW_SENTINEL, -1],              // 6
    &[1, 14, 2, 2, ROW_SENTINEL, -1], // 7
    &[2, 15, ROW_SENTINEL, -1],       // 8
    &[2, 16, ROW_SENTINEL, -1],       // 9
    &[2, 17, ROW_SENTINEL, -1],       // 10
    &[2, 18, ROW_SENTINEL, -1],       // 11
    &[1, 19, 2, 2, ROW_SENTINEL, -1], // 12
    &[ROW_SENTINEL, -1],              // 13
    &[ROW_SENTINEL, -1],              // 14
    &[ROW_SENTINEL, -1],              // 15
    &[ROW_SENTINEL, -1],              // 16
    &[ROW_SENTINEL, -1],              // 17
    &[ROW_SENTINEL, -1],              // 18
    &[ROW_SENTINEL, -1],              // 19
    &[ROW_SENTINEL, -1],              // 20
];

/// The calculator grammar's tables.
pub struct CalcTables;

impl ParserTables for CalcTables {
    const SORTED_ROWS: bool = true;

    fn production(prod: usize) -> ProdEntry {
        PRODUCTIONS[prod]
    }

    fn action_row(state: usize) -> &'static [i16] {
        ACTION_ROWS[state]
    }

    fn reduce_row(state: usize) -> &'static [i16] {
        REDUCE_ROWS[state]
    }

    fn start_state() -> usize {
        0
    }

    fn start_production() -> usize {
        prod::START
    }

    fn eof_sym() -> i16 {
        sym::EOF
    }

    fn error_sym() -> i16 {
        sym::ERROR
    }
}
