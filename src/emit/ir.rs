// src/emit/ir.rs
// Ordered declarations of a generated parser, independent of target syntax.
use crate::{
    actions::StitchedAction,
    grammar::{DEFAULT_NAME, ERROR_NAME, Grammar},
    tables::{EncodedTable, ParseTables, Reduction, Translation, XErrorKey},
};

/// A named terminal exported as a constant for the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConst {
    pub name: String,
    pub value: i32,
    /// `$default`, rendered under the prefix.
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlatEntry {
    pub value: i32,
    pub xsym: usize,
    pub name: String,
    pub used: usize,
}

#[derive(Debug, Clone)]
pub struct ParserModule {
    pub prologue: String,
    /// Payload field declarations.
    pub union_src: String,
    pub tokens: Vec<TokenConst>,
    pub tab_ofs: i64,
    pub eof: usize,
    pub err_sym: usize,
    pub accept_state: usize,
    /// Sorted by `value`.
    pub xlat: Vec<XlatEntry>,
    pub sym_names: Vec<String>,
    pub reductions: Vec<Reduction>,
    pub xerrors: Vec<(XErrorKey, String)>,
    pub table: EncodedTable,
    pub actions: Vec<StitchedAction>,
    pub tail: String,
}

impl ParserModule {
    pub fn lower(
        g: &Grammar,
        tr: &Translation,
        tables: &ParseTables,
        actions: Vec<StitchedAction>,
    ) -> Self {
        let mut tokens: Vec<TokenConst> = tr
            .order()
            .iter()
            .map(|u| g.symbol(u.sym))
            .filter(|s| {
                s.name == DEFAULT_NAME
                    || (s.is_terminal && !s.is_char_literal() && s.value > 0 && s.name != ERROR_NAME)
            })
            .map(|s| TokenConst {
                name: s.name.clone(),
                value: s.value,
                is_default: s.name == DEFAULT_NAME,
            })
            .collect();
        tokens.sort_by(|a, b| a.name.cmp(&b.name));

        let xlat = tables
            .xlat
            .iter()
            .map(|&(value, xsym)| XlatEntry {
                value,
                xsym,
                name: tables.sym_names[xsym].clone(),
                used: tr.order()[xsym].used,
            })
            .collect();

        Self {
            prologue: g.prologue.clone(),
            union_src: g.union_src.clone(),
            tokens,
            tab_ofs: tables.table.offset,
            eof: tables.end_sym,
            err_sym: tables.err_sym,
            accept_state: tables.accept_state,
            xlat,
            sym_names: tables.sym_names.clone(),
            reductions: tables.reductions.iter().copied().collect(),
            xerrors: tables
                .xerrors
                .iter()
                .map(|(k, v)| (*k, v.clone()))
                .collect(),
            table: tables.table.clone(),
            actions,
            tail: g.tail.clone(),
        }
    }
}
