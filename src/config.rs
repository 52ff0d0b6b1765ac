// src/config.rs
use std::path::PathBuf;

use crate::error::GenError;

pub const DEFAULT_PREFIX: &str = "yy";
pub const DEFAULT_OUTPUT: &str = "y.rs";

/// Generation settings. Built once by the driver and passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenConfig {
    /// Name prefix for generated items (`yy` -> `YySymType`, `yy_parse`, `YY_EOF`).
    pub prefix: String,
    pub output: PathBuf,
    /// Also persist the finished tables; `.json` selects JSON, anything else binary.
    pub tables_out: Option<PathBuf>,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            output: PathBuf::from(DEFAULT_OUTPUT),
            tables_out: None,
        }
    }
}

impl GenConfig {
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Result<Self, GenError> {
        let prefix = prefix.into();
        let mut chars = prefix.chars();
        let ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric());
        if !ok {
            return Err(GenError::InvalidPrefix(prefix));
        }
        self.prefix = prefix;
        Ok(self)
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_tables_out(mut self, path: Option<PathBuf>) -> Self {
        self.tables_out = path;
        self
    }
}
