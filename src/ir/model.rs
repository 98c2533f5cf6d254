//! The semantic IR produced by [`super::build`] (spec §3 / §4.4). Every
//! node here extends its AST counterpart with inferred fields; characters
//! are fully resolved bytes rather than raw text.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::TypeKind;
use crate::charclass::ClassResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParamType {
    I32,
    Byte,
    Bytes,
}

impl ParamType {
    /// Lattice join used by fix-point propagation: `i32 < byte`,
    /// `i32 < bytes`, no join between `byte` and `bytes` (spec §9).
    /// Returns `None` if the two types are incomparable.
    pub fn join(self, other: ParamType) -> Option<ParamType> {
        use ParamType::*;
        match (self, other) {
            (a, b) if a == b => Some(a),
            (I32, x) | (x, I32) => Some(x),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TypeInfo {
    pub name: String,
    pub kind: TypeKind,
    pub emits_start: bool,
    pub emits_end: bool,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub enum EmitSpec {
    Bare,
    Value(String),
}

#[derive(Debug, Clone)]
pub enum ArgValue {
    Byte(u8),
    Bytes(Vec<u8>),
    I32(String),
}

#[derive(Debug, Clone)]
pub enum IrCommand {
    Advance,
    AdvanceTo(Vec<u8>),
    Mark,
    Term(Option<i32>),
    Transition(Option<String>),
    Return { emit_spec: Option<EmitSpec>, suppress_auto_emit: bool },
    Call { name: String, args: Vec<ArgValue> },
    ErrorCmd(Option<String>),
    Assign { var: String, expr: String },
    AddAssign { var: String, expr: String },
    SubAssign { var: String, expr: String },
    Prepend(Vec<u8>),
    PrependParam(String),
    InlineEmitBare(String),
    InlineEmitMark(String),
    InlineEmitLiteral(String, String),
    KeywordsLookup(String),
    Conditional(Vec<(String, Vec<IrCommand>)>),
    Noop,
}

#[derive(Debug, Clone)]
pub enum IrSelector {
    Chars(ClassResult),
    SpecialClass(String),
    ParamRef(String),
    Conditional(String),
    Default,
    None,
}

#[derive(Debug, Clone)]
pub struct IrCase {
    pub selector: IrSelector,
    pub substate: Option<String>,
    pub commands: Vec<IrCommand>,
    pub lineno: usize,
}

#[derive(Debug, Clone, Default)]
pub struct IrState {
    pub name: Option<String>,
    pub cases: Vec<IrCase>,
    pub eof_handler: Option<Vec<IrCommand>>,
    pub scan_chars: Option<Vec<u8>>,
    pub is_self_looping: bool,
    pub has_default: bool,
    pub is_unconditional: bool,
    pub newline_injected: bool,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub struct IrFunction {
    pub name: String,
    pub return_type: Option<String>,
    pub params: Vec<String>,
    pub param_types: BTreeMap<String, ParamType>,
    pub locals: BTreeSet<String>,
    pub local_init_values: BTreeMap<String, i64>,
    pub states: Vec<IrState>,
    pub entry_actions: Vec<IrCommand>,
    pub eof_handler: Option<Vec<IrCommand>>,
    pub expects_char: Option<u8>,
    pub emits_content_on_close: bool,
    pub emits_events: bool,
    pub prepend_values: BTreeMap<String, BTreeSet<u8>>,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub struct KeywordTable {
    pub name: String,
    pub fallback_func: Option<String>,
    pub fallback_args: Option<String>,
    pub mappings: Vec<(String, String)>,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub struct IrParser {
    pub name: String,
    pub entry_point: String,
    pub types: Vec<TypeInfo>,
    pub functions: Vec<IrFunction>,
    pub keywords: Vec<KeywordTable>,
    pub custom_error_codes: Vec<String>,
}
