// src/error.rs
use std::fmt;

use serde::{Deserialize, Serialize};

/// A positioned diagnostic reported by the grammar processor.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub col: usize,
    pub msg: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() && self.line == 0 {
            return f.write_str(&self.msg);
        }
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.col, self.msg)
    }
}

/// Generation-time failure. Every variant names the invariant that broke.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("grammar has {} error(s)", .0.len())]
    Malformed(Vec<Diagnostic>),

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    #[error("duplicate symbol `{0}`")]
    DuplicateSymbol(String),

    #[error("symbols `{first}` and `{second}` share the value {value}")]
    DuplicateValue {
        value: i32,
        first: String,
        second: String,
    },

    #[error("rule {rule} refers to unknown rule {parent}")]
    UnknownRule { rule: usize, parent: usize },

    #[error("state {state} has an action on reserved symbol `{name}`")]
    ReservedSymbolInTable { state: usize, name: String },

    #[error("state {state} has two actions on `{name}`")]
    DuplicateCell { state: usize, name: String },

    #[error("grammar does not define the `{0}` symbol")]
    MissingReserved(&'static str),

    #[error("internal error: symbol `{name}` (value {value}) has no translated id")]
    MissingTranslation { name: String, value: i32 },

    #[error("encoded span {span} does not fit in 32 bits")]
    WidthOverflow { span: i64 },

    #[error("state {state}: value {raw} encodes to {stored} which does not fit u{bits}")]
    CellOverflow {
        state: usize,
        raw: i64,
        stored: i64,
        bits: u32,
    },

    #[error("state {state}: value {raw} encodes to the empty cell (offset {offset})")]
    OffsetCollision { state: usize, raw: i64, offset: i64 },

    #[error("error example has an empty state stack: {0:?}")]
    EmptyExampleStack(String),

    #[error("rule {rule}: ${num} is out of range 1..={max}")]
    PositionalOutOfRange { rule: usize, num: usize, max: usize },

    #[error("rule {rule}: $$ used but `{name}` has no declared type")]
    UntypedResult { rule: usize, name: String },

    #[error("rule {rule}: ${num} used but `{name}` has no declared type")]
    UntypedComponent { rule: usize, num: usize, name: String },

    #[error("invalid name prefix {0:?}")]
    InvalidPrefix(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("malformed table data: {0}")]
    Format(String),
}

/// Run-time failure of the in-process automaton.
///
/// Syntax errors that recovery absorbs never surface here; only a parse that
/// could not resynchronise, or a table that violates its own invariants.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("error recovery emptied the stack in state {state}")]
    StackExhausted { state: usize },

    #[error("error recovery reached end of input in state {state}")]
    EofDuringRecovery { state: usize },

    #[error("internal error: state {state} has no goto on `{symbol}`")]
    MissingGoto { state: usize, symbol: String },

    #[error("internal error: rule {rule} cannot be reduced")]
    BadRule { rule: usize },
}

impl ParseError {
    /// Status code the generated parser would return for this outcome.
    pub fn exit_code(&self) -> i32 {
        1
    }
}
