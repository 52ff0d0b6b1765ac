// src/tables/symbols.rs
// Dense renumbering of grammar symbols, most used first.
use std::cmp::Ordering;

use hashbrown::HashMap;

use crate::{
    error::GenError,
    grammar::{END_NAME, ERROR_NAME, Grammar, SymbolId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolUse {
    pub sym: SymbolId,
    pub used: usize,
}

/// Bijection between non-reserved symbols and `0..len()`.
#[derive(Debug, Clone)]
pub struct Translation {
    order: Vec<SymbolUse>,
    xsym_of: Vec<Option<usize>>,
    by_value: HashMap<i32, usize>,
    pub end_sym: usize,
    pub err_sym: usize,
}

/// Counts every occurrence of a symbol in any action of any state.
/// Reserved symbols have no count (`None`).
pub fn count_usage(g: &Grammar) -> Result<Vec<Option<usize>>, GenError> {
    let mut used: Vec<Option<usize>> = g
        .symbols
        .iter()
        .map(|s| if s.is_reserved() { None } else { Some(0) })
        .collect();
    for (state, row) in g.table.iter().enumerate() {
        for entry in row {
            match &mut used[entry.sym.idx()] {
                Some(n) => *n += 1,
                None => {
                    return Err(GenError::ReservedSymbolInTable {
                        state,
                        name: g.symbol(entry.sym).name.clone(),
                    });
                }
            }
        }
    }
    Ok(used)
}

fn by_usage(g: &Grammar, a: &SymbolUse, b: &SymbolUse) -> Ordering {
    let (sa, sb) = (g.symbol(a.sym), g.symbol(b.sym));
    b.used
        .cmp(&a.used)
        .then_with(|| sa.name.to_lowercase().cmp(&sb.name.to_lowercase()))
        .then_with(|| sa.name.cmp(&sb.name))
        .then_with(|| sa.value.cmp(&sb.value))
}

impl Translation {
    pub fn build(g: &Grammar) -> Result<Self, GenError> {
        let used = count_usage(g)?;
        let mut order: Vec<SymbolUse> = used
            .iter()
            .enumerate()
            .filter_map(|(i, u)| {
                u.map(|used| SymbolUse {
                    sym: SymbolId(i as u32),
                    used,
                })
            })
            .collect();
        order.sort_by(|a, b| by_usage(g, a, b));

        let mut xsym_of = vec![None; g.symbols.len()];
        let mut by_value: HashMap<i32, usize> = HashMap::with_capacity(order.len());
        for (xsym, u) in order.iter().enumerate() {
            let sym = g.symbol(u.sym);
            xsym_of[u.sym.idx()] = Some(xsym);
            if let Some(prev) = by_value.insert(sym.value, xsym) {
                return Err(GenError::DuplicateValue {
                    value: sym.value,
                    first: g.symbol(order[prev].sym).name.clone(),
                    second: sym.name.clone(),
                });
            }
            log::debug!("xsym {xsym:4} <- {} ({}x)", sym.name, u.used);
        }

        let find = |name: &'static str| -> Result<usize, GenError> {
            g.lookup(name)
                .and_then(|id| xsym_of[id.idx()])
                .ok_or(GenError::MissingReserved(name))
        };
        let end_sym = find(END_NAME)?;
        let err_sym = find(ERROR_NAME)?;

        Ok(Self {
            order,
            xsym_of,
            by_value,
            end_sym,
            err_sym,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Symbols in translated order; index is the translated id.
    pub fn order(&self) -> &[SymbolUse] {
        &self.order
    }

    #[inline]
    pub fn xsym(&self, sym: SymbolId) -> Option<usize> {
        self.xsym_of.get(sym.idx()).copied().flatten()
    }

    pub fn xsym_of_value(&self, value: i32) -> Option<usize> {
        self.by_value.get(&value).copied()
    }

    /// Like `xsym`, but a miss is an internal invariant failure.
    pub fn require(&self, g: &Grammar, sym: SymbolId) -> Result<usize, GenError> {
        self.xsym(sym).ok_or_else(|| {
            let s = g.symbol(sym);
            GenError::MissingTranslation {
                name: s.name.clone(),
                value: s.value,
            }
        })
    }

    /// (original value, translated id) pairs sorted by value.
    pub fn value_pairs(&self, g: &Grammar) -> Vec<(i32, usize)> {
        let mut pairs: Vec<(i32, usize)> = self
            .order
            .iter()
            .enumerate()
            .map(|(xsym, u)| (g.symbol(u.sym).value, xsym))
            .collect();
        pairs.sort_unstable();
        pairs
    }
}
