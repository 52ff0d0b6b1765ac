// src/tables/reductions.rs
use serde::{Deserialize, Serialize};

use super::symbols::Translation;
use crate::{error::GenError, grammar::Grammar};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduction {
    /// Translated id of the result symbol; `None` for rules that are never
    /// reduced (the `$accept` rule).
    pub xsym: Option<usize>,
    /// Frames popped by the reduction.
    pub components: usize,
    /// Frames below the top the action may address. For a mid-rule action this
    /// is the parent's maximum positional bound.
    pub window: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ReductionCatalog {
    entries: Vec<Reduction>,
}

impl ReductionCatalog {
    pub fn build(g: &Grammar, tr: &Translation) -> Result<Self, GenError> {
        let mut entries = Vec::with_capacity(g.rules.len());
        for rule in &g.rules {
            let sym = g.symbol(rule.sym);
            let xsym = if sym.is_reserved() {
                None
            } else {
                Some(tr.require(g, rule.sym)?)
            };
            let window = match rule.parent {
                Some(_) => rule.max_parent_dlr,
                None => rule.components.len(),
            };
            entries.push(Reduction {
                xsym,
                components: rule.components.len(),
                window,
            });
        }
        Ok(Self { entries })
    }

    #[inline]
    pub fn get(&self, rule: usize) -> Option<&Reduction> {
        self.entries.get(rule)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reduction> {
        self.entries.iter()
    }
}

impl FromIterator<Reduction> for ReductionCatalog {
    fn from_iter<I: IntoIterator<Item = Reduction>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::load_grammar_json_bytes;

    #[test]
    fn mid_rule_actions_address_the_parent_window() {
        let src = br#"{
            "symbols": [
                {"name": "$accept", "value": 60000},
                {"name": "$end", "terminal": true, "value": -1},
                {"name": "error", "terminal": true, "value": 256},
                {"name": "A", "terminal": true, "value": 57346},
                {"name": "B", "terminal": true, "value": 57347},
                {"name": "s", "value": 57348},
                {"name": "$$1", "value": 57349}
            ],
            "rules": [
                {"sym": "$accept", "components": ["s", "$end"]},
                {"sym": "s", "components": ["A", "$$1", "B"]},
                {"sym": "$$1", "parent": 1, "max_parent_dlr": 1}
            ],
            "table": [[{"sym": "A", "action": {"shift": 2}}, {"sym": "s", "action": {"shift": 1}}]]
        }"#;
        let g = load_grammar_json_bytes(src).unwrap();
        let tr = Translation::build(&g).unwrap();
        let cat = ReductionCatalog::build(&g, &tr).unwrap();

        assert_eq!(cat.len(), 3);
        assert_eq!(cat.get(0).unwrap().xsym, None);
        let s = cat.get(1).unwrap();
        assert_eq!(s.xsym, tr.xsym(g.lookup("s").unwrap()));
        assert_eq!((s.components, s.window), (3, 3));
        let mid = cat.get(2).unwrap();
        assert_eq!(mid.xsym, tr.xsym(g.lookup("$$1").unwrap()));
        assert_eq!((mid.components, mid.window), (0, 1));
        assert!(cat.get(3).is_none());
    }
}
