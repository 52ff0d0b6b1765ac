// src/grammar/io.rs
use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use super::{Action, ActionPart, Grammar};
use crate::error::{Diagnostic, GenError};

// -------------------- on-disk form of the processor output --------------------

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct GrammarDisk {
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    pub symbols: Vec<SymbolDisk>,
    #[serde(default)]
    pub rules: Vec<RuleDisk>,
    #[serde(default)]
    pub table: Vec<Vec<EntryDisk>>,
    #[serde(default)]
    pub conflicts_sr: usize,
    #[serde(default)]
    pub conflicts_rr: usize,
    #[serde(default)]
    pub xerrors: Vec<XErrorDisk>,
    #[serde(default)]
    pub prologue: String,
    #[serde(default, rename = "union")]
    pub union_src: String,
    #[serde(default)]
    pub tail: String,
    #[serde(default = "default_accept_state")]
    pub accept_state: usize,
}

fn default_accept_state() -> usize {
    1
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SymbolDisk {
    pub name: String,
    #[serde(default)]
    pub terminal: bool,
    pub value: i32,
    #[serde(default, rename = "type")]
    pub ty: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RuleDisk {
    pub sym: String,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub parent: Option<usize>,
    #[serde(default)]
    pub max_parent_dlr: usize,
    #[serde(default)]
    pub action: Vec<ActionPart>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EntryDisk {
    pub sym: String,
    pub action: Action,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct XErrorDisk {
    pub stack: Vec<usize>,
    #[serde(default)]
    pub lookahead: Option<String>,
    pub msg: String,
}

pub fn load_grammar_json(path: &Path) -> Result<Grammar, GenError> {
    log::debug!("Loading grammar from: {}", path.display());
    let data = fs::read(path)?;
    load_grammar_json_bytes(&data)
}

pub fn load_grammar_json_bytes(data: &[u8]) -> Result<Grammar, GenError> {
    let disk: GrammarDisk = serde_json::from_slice(data)?;
    Grammar::from_disk(disk)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::PseudoVar;

    #[test]
    fn diagnostics_abort_ingestion() {
        let src = br#"{
            "diagnostics": [{"file": "g.y", "line": 3, "col": 7, "msg": "unexpected ';'"}],
            "symbols": []
        }"#;
        match load_grammar_json_bytes(src) {
            Err(GenError::Malformed(d)) => {
                assert_eq!(d.len(), 1);
                assert_eq!(d[0].to_string(), "g.y:3:7: unexpected ';'");
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn unknown_component_is_rejected() {
        let src = br#"{
            "symbols": [{"name": "$end", "terminal": true, "value": -1},
                        {"name": "s", "value": 60000}],
            "rules": [{"sym": "s", "components": ["nope"]}]
        }"#;
        assert!(matches!(
            load_grammar_json_bytes(src),
            Err(GenError::UnknownSymbol(name)) if name == "nope"
        ));
    }

    #[test]
    fn action_parts_and_actions_decode() {
        let src = br#"{
            "symbols": [{"name": "$end", "terminal": true, "value": -1},
                        {"name": "NUM", "terminal": true, "value": 57346, "type": "num"},
                        {"name": "e", "value": 57347, "type": "num"}],
            "rules": [{"sym": "e", "components": ["NUM"],
                       "action": [{"src": " ", "var": "result"},
                                  {"src": " = ", "var": {"positional": 1}},
                                  {"src": "; "}]}],
            "table": [[{"sym": "NUM", "action": {"shift": 2}},
                       {"sym": "$end", "action": "accept"},
                       {"sym": "e", "action": {"reduce": 0}}]]
        }"#;
        let g = load_grammar_json_bytes(src).unwrap();
        assert_eq!(g.accept_state, 1);
        assert_eq!(g.rules[0].action[1].var, Some(PseudoVar::Positional(1)));
        assert_eq!(g.table[0][0].action, Action::Shift(2));
        assert_eq!(g.table[0][1].action, Action::Accept);
        assert_eq!(g.table[0][2].action.raw(), 0);
        assert_eq!(g.symbol(g.table[0][0].sym).name, "NUM");
    }
}
