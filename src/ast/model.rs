//! Structural tree produced by the [`super::parser`] (spec §3/§4.3). Every
//! field here is syntactic: character classes, conditions, and call
//! arguments are kept as raw text and only resolved once the IR builder
//! runs them through [`crate::charclass`].

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Bracket,
    Content,
    Internal,
    /// A `type[...]` directive whose kind text didn't match `BRACKET`,
    /// `CONTENT`, or `INTERNAL`. The AST parser never rejects this itself
    /// (spec §4.5 lists "unknown type kind" as a *Validator* error, not a
    /// parse error) — it carries the raw, as-written text through so
    /// `validate::validate` can report it with the offending spelling.
    Unknown(String),
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub struct Machine {
    pub name: String,
    pub entry_point: String,
    pub types: Vec<TypeDecl>,
    pub functions: Vec<Function>,
    pub keywords: Vec<KeywordBlock>,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub return_type: Option<String>,
    pub params: Vec<String>,
    pub states: Vec<State>,
    pub entry_actions: Vec<Command>,
    pub eof_handler: Option<Vec<Command>>,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub struct State {
    pub name: Option<String>,
    pub cases: Vec<Case>,
    pub eof_handler: Option<Vec<Command>>,
    pub lineno: usize,
}

/// Exactly one selector kind per case (spec §3 Case invariant).
#[derive(Debug, Clone)]
pub enum Selector {
    /// `c[...]` — raw CharacterClass text.
    Chars(String),
    /// A predefined class name used bare as the case-starter tag
    /// (`letter`, `digit`, ...).
    SpecialClass(String),
    /// A bare `:name` parameter-reference case-starter.
    ParamRef(String),
    /// `if[cond]` used as a case-level conditional guard.
    Conditional(String),
    /// `default` — explicit fallback case.
    Default,
    /// No selector at all: legal only as the first case of a state
    /// (bare-action state), where the case-starter token is itself the
    /// first command.
    None,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub selector: Selector,
    pub substate: Option<String>,
    pub commands: Vec<Command>,
    pub lineno: usize,
}

#[derive(Debug, Clone)]
pub enum InlineEmitKind {
    Bare,
    Mark,
    Literal(String),
}

/// Sentinel type name for `emit(...)`, whose event type is implicit from
/// the enclosing function's return type rather than spelled out.
pub const IMPLICIT_EMIT_TYPE: &str = "$self";

#[derive(Debug, Clone)]
pub enum Command {
    Advance,
    AdvanceTo { raw: String },
    Mark,
    Term { offset_raw: Option<String> },
    Transition { target: Option<String> },
    Return { raw: Option<String> },
    Call { name: String, args_raw: Option<String> },
    Error { code_raw: Option<String> },
    Assign { var: String, expr_raw: String },
    AddAssign { var: String, expr_raw: String },
    SubAssign { var: String, expr_raw: String },
    Prepend { raw: String },
    InlineEmit { type_name: String, kind: InlineEmitKind },
    KeywordsLookup { name: String },
    Conditional { clauses: Vec<(String, Vec<Command>)> },
    Noop,
}

#[derive(Debug, Clone)]
pub struct KeywordBlock {
    pub name: String,
    pub fallback_func: Option<String>,
    pub fallback_args: Option<String>,
    pub mappings: Vec<(String, String)>,
    pub lineno: usize,
}
