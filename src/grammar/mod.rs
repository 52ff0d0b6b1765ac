// src/grammar/mod.rs
// The grammar processor's output, ingested into an arena of symbols addressed
// by `SymbolId`. Everything downstream works on these handles.
pub mod io;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::GenError;

pub use io::{GrammarDisk, load_grammar_json, load_grammar_json_bytes};

/// Names that never receive a translated id.
pub const RESERVED_NAMES: [&str; 4] = ["", "ε", "$accept", "#"];
pub const END_NAME: &str = "$end";
pub const ERROR_NAME: &str = "error";
pub const DEFAULT_NAME: &str = "$default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub is_terminal: bool,
    /// Value assigned by the grammar processor; what the lexer returns.
    pub value: i32,
    /// Payload field used for this symbol's stack slot (empty when untyped).
    pub ty: String,
}

impl Symbol {
    pub fn is_reserved(&self) -> bool {
        RESERVED_NAMES.contains(&self.name.as_str())
    }

    pub fn is_char_literal(&self) -> bool {
        self.name.starts_with('\'')
    }
}

/// A `$`-reference inside an action fragment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PseudoVar {
    /// `$$`
    Result,
    /// `$N`
    Positional(usize),
    /// `$<tag>$`
    TaggedResult(String),
    /// `$<tag>N`
    TaggedPositional { num: usize, tag: String },
}

/// Literal source followed by an optional pseudo-variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionPart {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub var: Option<PseudoVar>,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub index: usize,
    pub sym: SymbolId,
    pub components: Vec<SymbolId>,
    /// Rule this mid-rule action was synthesized from.
    pub parent: Option<usize>,
    /// Highest `$N` the mid-rule action may address in its parent.
    pub max_parent_dlr: usize,
    pub action: Vec<ActionPart>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept,
    Error,
}

impl Action {
    /// Raw integer encoding before the table offset is applied.
    pub fn raw(self) -> i64 {
        match self {
            Action::Shift(state) => state as i64,
            Action::Reduce(rule) => -(rule as i64),
            Action::Accept | Action::Error => 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TableEntry {
    pub sym: SymbolId,
    pub action: Action,
}

#[derive(Debug, Clone)]
pub struct XErrorExample {
    pub stack: Vec<usize>,
    pub lookahead: Option<SymbolId>,
    pub msg: String,
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    pub rules: Vec<Rule>,
    /// Per-state (symbol, action) pairs in original numbering.
    pub table: Vec<Vec<TableEntry>>,
    pub conflicts_sr: usize,
    pub conflicts_rr: usize,
    pub xerrors: Vec<XErrorExample>,
    pub prologue: String,
    pub union_src: String,
    pub tail: String,
    pub accept_state: usize,
}

impl Grammar {
    /// Resolves every name in the on-disk form to a `SymbolId`.
    ///
    /// Diagnostics reported by the processor abort ingestion with
    /// `GenError::Malformed`.
    pub fn from_disk(disk: GrammarDisk) -> Result<Self, GenError> {
        if !disk.diagnostics.is_empty() {
            return Err(GenError::Malformed(disk.diagnostics));
        }

        let mut symbols = Vec::with_capacity(disk.symbols.len());
        let mut by_name = HashMap::with_capacity(disk.symbols.len());
        for s in disk.symbols {
            let id = SymbolId(symbols.len() as u32);
            if by_name.insert(s.name.clone(), id).is_some() {
                return Err(GenError::DuplicateSymbol(s.name));
            }
            symbols.push(Symbol {
                id,
                name: s.name,
                is_terminal: s.terminal,
                value: s.value,
                ty: s.ty,
            });
        }

        let resolve = |name: &str| -> Result<SymbolId, GenError> {
            by_name
                .get(name)
                .copied()
                .ok_or_else(|| GenError::UnknownSymbol(name.to_string()))
        };

        let n_rules = disk.rules.len();
        let mut rules = Vec::with_capacity(n_rules);
        for (index, r) in disk.rules.into_iter().enumerate() {
            if let Some(parent) = r.parent {
                if parent >= n_rules {
                    return Err(GenError::UnknownRule {
                        rule: index,
                        parent,
                    });
                }
            }
            let components = r
                .components
                .iter()
                .map(|c| resolve(c))
                .collect::<Result<Vec<_>, _>>()?;
            rules.push(Rule {
                index,
                sym: resolve(&r.sym)?,
                components,
                parent: r.parent,
                max_parent_dlr: r.max_parent_dlr,
                action: r.action,
            });
        }

        let mut table = Vec::with_capacity(disk.table.len());
        for row in disk.table {
            let mut entries = Vec::with_capacity(row.len());
            for e in row {
                entries.push(TableEntry {
                    sym: resolve(&e.sym)?,
                    action: e.action,
                });
            }
            table.push(entries);
        }

        let mut xerrors = Vec::with_capacity(disk.xerrors.len());
        for x in disk.xerrors {
            let lookahead = match x.lookahead.as_deref() {
                Some(name) => Some(resolve(name)?),
                None => None,
            };
            xerrors.push(XErrorExample {
                stack: x.stack,
                lookahead,
                msg: x.msg,
            });
        }

        log::debug!(
            "ingested grammar: {} symbols, {} rules, {} states, {} error examples",
            symbols.len(),
            rules.len(),
            table.len(),
            xerrors.len()
        );

        Ok(Self {
            symbols,
            by_name,
            rules,
            table,
            conflicts_sr: disk.conflicts_sr,
            conflicts_rr: disk.conflicts_rr,
            xerrors,
            prologue: disk.prologue,
            union_src: disk.union_src,
            tail: disk.tail,
            accept_state: disk.accept_state,
        })
    }

    #[inline]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.idx()]
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }
}
