//! AST Parser: recursive-descent builder of the structural tree (spec §4.3).

pub mod model;
pub mod parser;

pub use model::*;
pub use parser::parse;
