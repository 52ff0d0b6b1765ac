// src/emit/mod.rs
pub mod ir;
pub mod rust;

pub use ir::{ParserModule, TokenConst, XlatEntry};
pub use rust::{Names, RustBackend};

/// A serializer for one target language.
pub trait Backend {
    fn render(&self, module: &ParserModule) -> String;
}
