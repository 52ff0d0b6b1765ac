// src/lib.rs
pub mod actions;
pub mod config;
pub mod emit;
pub mod error;
pub mod generate;
pub mod grammar;
pub mod runtime;
pub mod tables;

pub use config::GenConfig;
pub use error::{Diagnostic, GenError, ParseError};
pub use generate::{Generated, generate, generate_from_json};
pub use grammar::Grammar;
pub use tables::ParseTables;
