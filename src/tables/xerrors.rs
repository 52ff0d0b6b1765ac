// src/tables/xerrors.rs
// (state, lookahead) -> message, derived from the processor's error examples.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use super::symbols::Translation;
use crate::{error::GenError, grammar::Grammar};

pub const GENERIC_MESSAGE: &str = "syntax error";
/// Lookahead of an example that matches any token.
pub const WILDCARD: i32 = -1;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XErrorKey {
    pub state: usize,
    pub xsym: i32,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct XErrorTable {
    #[serde_as(as = "Vec<(_, _)>")]
    entries: BTreeMap<XErrorKey, String>,
}

impl XErrorTable {
    pub fn build(g: &Grammar, tr: &Translation) -> Result<Self, GenError> {
        let mut entries = BTreeMap::new();
        for x in &g.xerrors {
            let Some(&state) = x.stack.last() else {
                return Err(GenError::EmptyExampleStack(x.msg.clone()));
            };
            let xsym = match x.lookahead {
                Some(sym) => tr.require(g, sym)? as i32,
                None => WILDCARD,
            };
            let key = XErrorKey { state, xsym };
            if entries.contains_key(&key) {
                log::warn!(
                    "duplicate error example for state {state}, lookahead {xsym}: {:?} ignored",
                    x.msg
                );
                continue;
            }
            entries.insert(key, x.msg.clone());
        }
        Ok(Self { entries })
    }

    pub fn get(&self, state: usize, xsym: i32) -> Option<&str> {
        self.entries
            .get(&XErrorKey { state, xsym })
            .map(String::as_str)
    }

    /// Exact lookahead first, then the state's wildcard, then the generic text.
    pub fn message(&self, state: usize, xsym: usize) -> &str {
        self.get(state, xsym as i32)
            .or_else(|| self.get(state, WILDCARD))
            .unwrap_or(GENERIC_MESSAGE)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&XErrorKey, &String)> {
        self.entries.iter()
    }
}

impl FromIterator<(XErrorKey, String)> for XErrorTable {
    fn from_iter<I: IntoIterator<Item = (XErrorKey, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
