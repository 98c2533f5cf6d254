//! Render-context construction (spec §4.6): turns the immutable
//! [`crate::ir::IrParser`] into a `Serialize` tree Handlebars can walk.
//! Every field a template might need is pre-computed here rather than
//! left for template logic to derive, the same split the teacher draws
//! between "what the tokenizer computes" and "what the grammar author
//! writes" — templates stay declarative, the context does the analysis.

use serde::Serialize;

use crate::ast::TypeKind;
use crate::ir::{ArgValue, EmitSpec, IrCase, IrCommand, IrFunction, IrParser, IrSelector, IrState, KeywordTable, ParamType, TypeInfo};

use super::helpers::{self, HelperUsage};

#[derive(Debug, Clone, Serialize)]
pub struct TypeCtx {
    pub name: String,
    pub kind: &'static str,
    pub emits_start: bool,
    pub emits_end: bool,
}

impl From<&TypeInfo> for TypeCtx {
    fn from(t: &TypeInfo) -> Self {
        let kind = match t.kind {
            TypeKind::Bracket => "bracket",
            TypeKind::Content => "content",
            TypeKind::Internal => "internal",
            // Unreachable once `validate::validate` has run: an `Unknown`
            // kind is a validator error, and `generate` refuses to render
            // when the report has errors (spec §4.5/§7).
            TypeKind::Unknown(_) => "unknown",
        };
        TypeCtx { name: t.name.clone(), kind, emits_start: t.emits_start, emits_end: t.emits_end }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParamCtx {
    pub name: String,
    pub type_name: &'static str,
}

fn param_type_name(ty: ParamType) -> &'static str {
    match ty {
        ParamType::I32 => "i32",
        ParamType::Byte => "byte",
        ParamType::Bytes => "bytes",
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum ArgCtx {
    Byte { value: u8 },
    Bytes { values: Vec<u8> },
    Expr { text: String },
}

impl From<&ArgValue> for ArgCtx {
    fn from(a: &ArgValue) -> Self {
        match a {
            ArgValue::Byte(b) => ArgCtx::Byte { value: *b },
            ArgValue::Bytes(bs) => ArgCtx::Bytes { values: bs.clone() },
            ArgValue::I32(text) => ArgCtx::Expr { text: text.clone() },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum CommandCtx {
    Advance,
    AdvanceTo { bytes: Vec<u8> },
    Mark,
    Term { code: Option<i32> },
    Transition { target: Option<String> },
    Return { emit: Option<EmitCtx>, suppress_auto_emit: bool },
    Call { name: String, args: Vec<ArgCtx> },
    Error { code: Option<String> },
    Assign { var: String, expr: String },
    AddAssign { var: String, expr: String },
    SubAssign { var: String, expr: String },
    Prepend { bytes: Vec<u8> },
    PrependParam { name: String },
    InlineEmitBare { type_name: String },
    InlineEmitMark { type_name: String },
    InlineEmitLiteral { type_name: String, text: String },
    KeywordsLookup { table: String },
    Conditional { clauses: Vec<ClauseCtx> },
    Noop,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClauseCtx {
    pub condition: String,
    pub commands: Vec<CommandCtx>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmitCtx {
    pub bare: bool,
    pub value_expr: Option<String>,
}

impl From<&EmitSpec> for EmitCtx {
    fn from(e: &EmitSpec) -> Self {
        match e {
            EmitSpec::Bare => EmitCtx { bare: true, value_expr: None },
            EmitSpec::Value(expr) => EmitCtx { bare: false, value_expr: Some(expr.clone()) },
        }
    }
}

impl From<&IrCommand> for CommandCtx {
    fn from(cmd: &IrCommand) -> Self {
        match cmd {
            IrCommand::Advance => CommandCtx::Advance,
            IrCommand::AdvanceTo(bytes) => CommandCtx::AdvanceTo { bytes: bytes.clone() },
            IrCommand::Mark => CommandCtx::Mark,
            IrCommand::Term(code) => CommandCtx::Term { code: *code },
            IrCommand::Transition(target) => CommandCtx::Transition { target: target.clone() },
            IrCommand::Return { emit_spec, suppress_auto_emit } => {
                CommandCtx::Return { emit: emit_spec.as_ref().map(EmitCtx::from), suppress_auto_emit: *suppress_auto_emit }
            }
            IrCommand::Call { name, args } => CommandCtx::Call { name: name.clone(), args: args.iter().map(ArgCtx::from).collect() },
            IrCommand::ErrorCmd(code) => CommandCtx::Error { code: code.clone() },
            IrCommand::Assign { var, expr } => CommandCtx::Assign { var: var.clone(), expr: expr.clone() },
            IrCommand::AddAssign { var, expr } => CommandCtx::AddAssign { var: var.clone(), expr: expr.clone() },
            IrCommand::SubAssign { var, expr } => CommandCtx::SubAssign { var: var.clone(), expr: expr.clone() },
            IrCommand::Prepend(bytes) => CommandCtx::Prepend { bytes: bytes.clone() },
            IrCommand::PrependParam(name) => CommandCtx::PrependParam { name: name.clone() },
            IrCommand::InlineEmitBare(t) => CommandCtx::InlineEmitBare { type_name: t.clone() },
            IrCommand::InlineEmitMark(t) => CommandCtx::InlineEmitMark { type_name: t.clone() },
            IrCommand::InlineEmitLiteral(t, text) => CommandCtx::InlineEmitLiteral { type_name: t.clone(), text: text.clone() },
            IrCommand::KeywordsLookup(table) => CommandCtx::KeywordsLookup { table: table.clone() },
            IrCommand::Conditional(clauses) => CommandCtx::Conditional {
                clauses: clauses.iter().map(|(cond, body)| ClauseCtx { condition: cond.clone(), commands: body.iter().map(CommandCtx::from).collect() }).collect(),
            },
            IrCommand::Noop => CommandCtx::Noop,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectorCtx {
    pub kind: &'static str,
    pub bytes: Vec<u8>,
    pub special_class: Option<String>,
    pub param_ref: Option<String>,
    pub condition: Option<String>,
}

impl From<&IrSelector> for SelectorCtx {
    fn from(s: &IrSelector) -> Self {
        match s {
            IrSelector::Chars(class) => SelectorCtx {
                kind: "chars",
                bytes: class.bytes.clone(),
                special_class: class.special_class.clone(),
                param_ref: class.param_ref.clone(),
                condition: None,
            },
            IrSelector::SpecialClass(name) => SelectorCtx { kind: "special_class", bytes: vec![], special_class: Some(name.clone()), param_ref: None, condition: None },
            IrSelector::ParamRef(name) => SelectorCtx { kind: "param_ref", bytes: vec![], special_class: None, param_ref: Some(name.clone()), condition: None },
            IrSelector::Conditional(cond) => SelectorCtx { kind: "conditional", bytes: vec![], special_class: None, param_ref: None, condition: Some(cond.clone()) },
            IrSelector::Default => SelectorCtx { kind: "default", bytes: vec![], special_class: None, param_ref: None, condition: None },
            IrSelector::None => SelectorCtx { kind: "none", bytes: vec![], special_class: None, param_ref: None, condition: None },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseCtx {
    pub selector: SelectorCtx,
    pub substate: Option<String>,
    pub commands: Vec<CommandCtx>,
}

impl From<&IrCase> for CaseCtx {
    fn from(c: &IrCase) -> Self {
        CaseCtx { selector: SelectorCtx::from(&c.selector), substate: c.substate.clone(), commands: c.commands.iter().map(CommandCtx::from).collect() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StateCtx {
    pub name: Option<String>,
    pub cases: Vec<CaseCtx>,
    pub eof_handler: Option<Vec<CommandCtx>>,
    pub scan_chars: Option<Vec<u8>>,
    pub is_self_looping: bool,
    pub has_default: bool,
    pub is_unconditional: bool,
    pub newline_injected: bool,
}

impl From<&IrState> for StateCtx {
    fn from(s: &IrState) -> Self {
        StateCtx {
            name: s.name.clone(),
            cases: s.cases.iter().map(CaseCtx::from).collect(),
            eof_handler: s.eof_handler.as_ref().map(|cmds| cmds.iter().map(CommandCtx::from).collect()),
            scan_chars: s.scan_chars.clone(),
            is_self_looping: s.is_self_looping,
            has_default: s.has_default,
            is_unconditional: s.is_unconditional,
            newline_injected: s.newline_injected,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionCtx {
    pub name: String,
    pub return_type: Option<String>,
    pub params: Vec<ParamCtx>,
    pub locals: Vec<String>,
    pub local_init_values: Vec<(String, i64)>,
    pub states: Vec<StateCtx>,
    pub entry_actions: Vec<CommandCtx>,
    pub eof_handler: Option<Vec<CommandCtx>>,
    pub expects_char: Option<u8>,
    pub emits_content_on_close: bool,
    pub emits_events: bool,
    pub prepend_values: Vec<(String, Vec<u8>)>,
    pub helpers: HelperUsage,
}

impl From<&IrFunction> for FunctionCtx {
    fn from(f: &IrFunction) -> Self {
        FunctionCtx {
            name: f.name.clone(),
            return_type: f.return_type.clone(),
            params: f.params.iter().map(|p| ParamCtx { name: p.clone(), type_name: param_type_name(f.param_types.get(p).copied().unwrap_or(ParamType::I32)) }).collect(),
            locals: f.locals.iter().cloned().collect(),
            local_init_values: f.local_init_values.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            states: f.states.iter().map(StateCtx::from).collect(),
            entry_actions: f.entry_actions.iter().map(CommandCtx::from).collect(),
            eof_handler: f.eof_handler.as_ref().map(|cmds| cmds.iter().map(CommandCtx::from).collect()),
            expects_char: f.expects_char,
            emits_content_on_close: f.emits_content_on_close,
            emits_events: f.emits_events,
            prepend_values: f.prepend_values.iter().map(|(k, v)| (k.clone(), v.iter().copied().collect())).collect(),
            helpers: helpers::analyze(f),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordCtx {
    pub name: String,
    pub const_name: String,
    pub fallback_func: Option<String>,
    pub fallback_args: Option<String>,
    pub mappings: Vec<(String, String)>,
}

/// A stable, collision-free Rust `const` identifier for a keyword table
/// (`descent-json` → `KEYWORDS_DESCENT_JSON`).
fn keyword_const_name(name: &str) -> String {
    let mut out = String::from("KEYWORDS_");
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push('_');
        }
    }
    out
}

impl From<&KeywordTable> for KeywordCtx {
    fn from(k: &KeywordTable) -> Self {
        KeywordCtx {
            name: k.name.clone(),
            const_name: keyword_const_name(&k.name),
            fallback_func: k.fallback_func.clone(),
            fallback_args: k.fallback_args.clone(),
            mappings: k.mappings.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderContext {
    pub parser_name: String,
    pub entry_point: String,
    pub target: String,
    pub trace: bool,
    pub uses_unicode: bool,
    pub types: Vec<TypeCtx>,
    pub functions: Vec<FunctionCtx>,
    pub keywords: Vec<KeywordCtx>,
    pub custom_error_codes: Vec<String>,
}

fn uses_unicode(ir: &IrParser) -> bool {
    ir.functions.iter().any(|f| {
        f.states.iter().any(|s| {
            s.cases.iter().any(|c| matches!(&c.selector, IrSelector::SpecialClass(_)) || matches!(&c.selector, IrSelector::Chars(class) if class.special_class.is_some()))
        })
    })
}

/// Build the full render context for one `(ir, target)` pair (spec §4.6).
pub fn build(ir: &IrParser, target: &str, trace: bool) -> RenderContext {
    RenderContext {
        parser_name: ir.name.clone(),
        entry_point: ir.entry_point.clone(),
        target: target.to_string(),
        trace,
        uses_unicode: uses_unicode(ir),
        types: ir.types.iter().map(TypeCtx::from).collect(),
        functions: ir.functions.iter().map(FunctionCtx::from).collect(),
        keywords: ir.keywords.iter().map(KeywordCtx::from).collect(),
        custom_error_codes: ir.custom_error_codes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse as parse_ast;
    use crate::ir::build as build_ir;
    use crate::lexer::tokenize;

    fn context_for(src: &str) -> RenderContext {
        let tokens = tokenize(src).unwrap();
        let machine = parse_ast(&tokens).unwrap();
        let ir = build_ir(&machine).unwrap();
        build(&ir, "rust", false)
    }

    #[test]
    fn keyword_const_name_is_stable_and_uppercased() {
        assert_eq!(keyword_const_name("json-keywords"), "KEYWORDS_JSON_KEYWORDS");
    }

    #[test]
    fn context_serializes_function_params_with_types() {
        let ctx = context_for(
            "parser[D] | entry_point[main] | function[foo(x)] | state[s] | c[:x] | >> | default | -> | >> | function[main] | state[s] | /foo(:y) | -> | >> | default | -> | >>",
        );
        let foo = ctx.functions.iter().find(|f| f.name == "foo").unwrap();
        assert_eq!(foo.params[0].type_name, "byte");
    }

    #[test]
    fn uses_unicode_detects_special_class_selectors() {
        let ctx = context_for("parser[D] | entry_point[main] | function[main] | state[s] | c[XID_START] | >> | default | -> | >>");
        assert!(ctx.uses_unicode);
    }
}
