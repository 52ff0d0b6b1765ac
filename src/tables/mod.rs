// src/tables/mod.rs
pub mod encode;
pub mod io;
pub mod reductions;
pub mod symbols;
pub mod xerrors;

use serde::{Deserialize, Serialize};

use crate::{error::GenError, grammar::Grammar};

pub use encode::{CellWidth, Decoded, EncodedRow, EncodedTable, Run, TableStats};
pub use io::{
    load_tables_bin_bytes, load_tables_json_bytes, save_tables_bin, save_tables_json,
    write_tables_bin,
};
pub use reductions::{Reduction, ReductionCatalog};
pub use symbols::{SymbolUse, Translation};
pub use xerrors::{GENERIC_MESSAGE, WILDCARD, XErrorKey, XErrorTable};

/// Everything the automaton reads at run time. Immutable once built.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParseTables {
    /// Symbol names indexed by translated id.
    pub sym_names: Vec<String>,
    /// (lexer token value, translated id), sorted by value.
    pub xlat: Vec<(i32, usize)>,
    pub table: EncodedTable,
    pub reductions: ReductionCatalog,
    pub xerrors: XErrorTable,
    pub end_sym: usize,
    pub err_sym: usize,
    pub accept_state: usize,
}

impl ParseTables {
    /// Translated id for a lexer token. Non-positive and unknown tokens both
    /// mean end of input.
    pub fn translate(&self, tok: i32) -> usize {
        if tok <= 0 {
            return self.end_sym;
        }
        match self.xlat.binary_search_by_key(&tok, |&(v, _)| v) {
            Ok(i) => self.xlat[i].1,
            Err(_) => self.end_sym,
        }
    }

    /// Name of a translated id. Unknown ids render as a quoted character
    /// literal of the id, or the bare number past the char range.
    pub fn sym_name(&self, xsym: usize) -> String {
        match self.sym_names.get(xsym) {
            Some(name) => name.clone(),
            None => match u32::try_from(xsym).ok().and_then(char::from_u32) {
                Some(c) => format!("{c:?}"),
                None => xsym.to_string(),
            },
        }
    }

    pub fn n_states(&self) -> usize {
        self.table.rows.len()
    }

    pub fn stats(&self) -> TableStats {
        self.table.stats(self.sym_names.len())
    }

    /// Checks what the automaton takes for granted: sentinels and targets in
    /// range, `xlat` strictly sorted for binary search, runs sorted and
    /// disjoint, cells within the declared width. Loaders run this on
    /// everything they read.
    pub fn validate(&self) -> Result<(), String> {
        let n_syms = self.sym_names.len();
        let n_states = self.table.rows.len();
        let n_rules = self.reductions.len();

        if self.end_sym >= n_syms || self.err_sym >= n_syms {
            return Err(format!(
                "end symbol {} / error symbol {} outside {n_syms} symbols",
                self.end_sym, self.err_sym
            ));
        }
        if self.accept_state >= n_states {
            return Err(format!(
                "accept state {} outside {n_states} states",
                self.accept_state
            ));
        }

        if self.xlat.len() != n_syms {
            return Err(format!(
                "{} translations for {n_syms} symbols",
                self.xlat.len()
            ));
        }
        if let Some(w) = self.xlat.windows(2).find(|w| w[0].0 >= w[1].0) {
            return Err(format!(
                "xlat not strictly sorted: token {} before {}",
                w[0].0, w[1].0
            ));
        }
        if let Some(&(value, xsym)) = self.xlat.iter().find(|&&(_, x)| x >= n_syms) {
            return Err(format!("token {value} translates to unknown symbol {xsym}"));
        }

        self.table.validate().map_err(|e| e.to_string())?;
        for (state, row) in self.table.rows.iter().enumerate() {
            let mut next = 0usize;
            for run in &row.runs {
                if run.cells.is_empty() || run.start < next {
                    return Err(format!("state {state}: runs empty, unsorted or overlapping"));
                }
                next = run.start + run.cells.len();
            }
            if next > n_syms {
                return Err(format!("state {state}: cell beyond {n_syms} symbols"));
            }
            for (xsym, _) in row.cells() {
                match self.table.decode(state, xsym) {
                    Decoded::Shift(to) if to >= n_states => {
                        return Err(format!("state {state}: shift to unknown state {to}"));
                    }
                    Decoded::Reduce(rule) if rule >= n_rules => {
                        return Err(format!("state {state}: reduce by unknown rule {rule}"));
                    }
                    _ => {}
                }
            }
        }

        for (rule, r) in self.reductions.iter().enumerate() {
            if r.xsym.is_some_and(|x| x >= n_syms) {
                return Err(format!("rule {rule}: result symbol outside {n_syms} symbols"));
            }
        }
        for (key, _) in self.xerrors.iter() {
            let sym_ok = key.xsym == WILDCARD || (key.xsym >= 0 && (key.xsym as usize) < n_syms);
            if key.state >= n_states || !sym_ok {
                return Err(format!(
                    "error example keyed on unknown state {} / symbol {}",
                    key.state, key.xsym
                ));
            }
        }
        Ok(())
    }
}

/// Runs the table half of the pipeline: translation first, then the encoder,
/// the reduction catalog and the error-example table off the same id space.
pub fn build_tables(g: &Grammar) -> Result<(Translation, ParseTables), GenError> {
    let tr = Translation::build(g)?;
    let table = EncodedTable::encode(g, &tr)?;
    table.validate()?;
    let reductions = ReductionCatalog::build(g, &tr)?;
    let xerrors = XErrorTable::build(g, &tr)?;

    let sym_names = tr
        .order()
        .iter()
        .map(|u| g.symbol(u.sym).name.clone())
        .collect();
    let xlat = tr.value_pairs(g);

    log::info!(
        "tables: {} symbols, {} states, {} rules, {} error examples, offset {}, u{} cells",
        tr.len(),
        table.rows.len(),
        reductions.len(),
        xerrors.len(),
        table.offset,
        table.width.bits()
    );

    let tables = ParseTables {
        sym_names,
        xlat,
        table,
        reductions,
        xerrors,
        end_sym: tr.end_sym,
        err_sym: tr.err_sym,
        accept_state: g.accept_state,
    };
    Ok((tr, tables))
}
