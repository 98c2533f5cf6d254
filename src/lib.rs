//! `descent` is a parser generator: it reads a `.desc` specification of a
//! recursive-descent byte-oriented parser and emits, as source text in a
//! target language, a callback-based parser for that grammar.
//!
//! # Pipeline
//!
//! Six feed-forward stages turn `.desc` source into rendered output, each
//! living in its own module:
//!
//! 1. [`lexer`] splits source into a flat [`token::Token`] stream.
//! 2. [`charclass`] is the shared character/string/class literal
//!    sub-parser every later stage routes through.
//! 3. [`ast`] builds the syntactic [`ast::Machine`] tree.
//! 4. [`ir`] lowers it into the semantic [`ir::IrParser`] — type
//!    resolution, `SCAN` inference, parameter-type fix-point
//!    propagation, and the rest of the inference passes described in
//!    `DESIGN.md`.
//! 5. [`validate`] cross-checks the IR for dangling references.
//! 6. [`generate`] renders the IR through a target's Handlebars
//!    templates and post-processes the result.
//!
//! [`cli`] wires all six into the `descent` binary (`src/bin/descent.rs`).
//!
//! # Example
//!
//! ```
//! use descent::{ast, ir, lexer, validate};
//!
//! let source = "\
//! parser[Demo]
//! | entry_point[main]
//! | type[Text] CONTENT
//! | function[main] Text
//! | mark
//! | state[s]
//! | default
//! | ->
//! | >>
//! ";
//!
//! let tokens = lexer::tokenize(source).unwrap();
//! let machine = ast::parse(&tokens).unwrap();
//! let parser_ir = ir::build(&machine).unwrap();
//! let report = validate::validate(&parser_ir);
//! assert!(!report.has_errors());
//! ```

pub mod ast;
pub mod charclass;
pub mod cli;
pub mod debug_tree;
pub mod error;
pub mod generate;
pub mod ir;
pub mod lexer;
pub mod token;
pub mod validate;

pub use error::Error;
