//! A generic labeled tree used by `descent debug --tokens/--ast/--ir` to
//! print a pipeline stage's output as an indented tree via `ptree`,
//! grounded on the teacher's `ASTNode`/`ptree::TreeItem` pairing —
//! rebuilt from scratch against this crate's own `Machine`/`IrParser`
//! shapes rather than the teacher's generic `ASTNode<TNode>`.

use std::borrow::Cow;
use std::io;

use ptree::{Style, TreeItem};

use crate::ast::{Case, Command, Function, Machine, Selector, State};
use crate::ir::{IrCase, IrCommand, IrFunction, IrParser, IrSelector, IrState};
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct DebugNode {
    pub label: String,
    pub children: Vec<DebugNode>,
}

impl DebugNode {
    pub fn leaf(label: impl Into<String>) -> Self {
        Self { label: label.into(), children: Vec::new() }
    }

    pub fn branch(label: impl Into<String>, children: Vec<DebugNode>) -> Self {
        Self { label: label.into(), children }
    }
}

impl TreeItem for DebugNode {
    type Child = DebugNode;

    fn write_self<W: io::Write>(&self, f: &mut W, style: &Style) -> io::Result<()> {
        write!(f, "{}", style.paint(&self.label))
    }

    fn children(&self) -> Cow<[Self::Child]> {
        Cow::from(&self.children)
    }
}

/// One token per line, tagged with its lineno, in source order.
pub fn tokens_tree(tokens: &[Token]) -> DebugNode {
    let children = tokens
        .iter()
        .map(|t| DebugNode::leaf(format!("[{}] {}:{} {}", t.lineno, t.tag, t.id.as_deref().unwrap_or(""), t.rest)))
        .collect();
    DebugNode::branch("tokens", children)
}

fn selector_label(selector: &Selector) -> String {
    match selector {
        Selector::Chars(raw) => format!("chars[{}]", raw),
        Selector::SpecialClass(name) => format!("class[{}]", name),
        Selector::ParamRef(name) => format!("param[:{}]", name),
        Selector::Conditional(cond) => format!("if[{}]", cond),
        Selector::Default => "default".to_string(),
        Selector::None => "(none)".to_string(),
    }
}

fn command_label(cmd: &Command) -> String {
    match cmd {
        Command::Advance => "advance ->".to_string(),
        Command::AdvanceTo { raw } => format!("advance_to[{}]", raw),
        Command::Mark => "mark".to_string(),
        Command::Term { offset_raw } => format!("term{}", offset_raw.as_deref().map(|c| format!("[{}]", c)).unwrap_or_default()),
        Command::Transition { target } => format!("transition[{}]", target.as_deref().unwrap_or(":self")),
        Command::Return { raw } => format!("return{}", raw.as_deref().map(|s| format!("[{}]", s)).unwrap_or_default()),
        Command::Call { name, args_raw } => format!("call {}({})", name, args_raw.as_deref().unwrap_or("")),
        Command::Error { code_raw } => format!("err{}", code_raw.as_deref().map(|c| format!("[{}]", c)).unwrap_or_default()),
        Command::Assign { var, expr_raw } => format!("{} = {}", var, expr_raw),
        Command::AddAssign { var, expr_raw } => format!("{} += {}", var, expr_raw),
        Command::SubAssign { var, expr_raw } => format!("{} -= {}", var, expr_raw),
        Command::Prepend { raw } => format!("prepend[{}]", raw),
        Command::InlineEmit { type_name, kind } => format!("emit {} {:?}", type_name, kind),
        Command::KeywordsLookup { name } => format!("keywords[{}]", name),
        Command::Conditional { clauses } => format!("conditional ({} clauses)", clauses.len()),
        Command::Noop => "noop".to_string(),
    }
}

fn commands_children(commands: &[Command]) -> Vec<DebugNode> {
    commands
        .iter()
        .map(|cmd| {
            if let Command::Conditional { clauses } = cmd {
                let children = clauses.iter().map(|(cond, body)| DebugNode::branch(format!("if[{}]", cond), commands_children(body))).collect();
                DebugNode::branch(command_label(cmd), children)
            } else {
                DebugNode::leaf(command_label(cmd))
            }
        })
        .collect()
}

fn case_node(case: &Case) -> DebugNode {
    DebugNode::branch(format!("case {} (line {})", selector_label(&case.selector), case.lineno), commands_children(&case.commands))
}

fn state_node(state: &State) -> DebugNode {
    let mut children: Vec<DebugNode> = state.cases.iter().map(case_node).collect();
    if let Some(eof) = &state.eof_handler {
        children.push(DebugNode::branch("eof", commands_children(eof)));
    }
    DebugNode::branch(format!("state[{}]", state.name.as_deref().unwrap_or("(anonymous)")), children)
}

fn function_node(function: &Function) -> DebugNode {
    let mut children = vec![DebugNode::branch("entry_actions", commands_children(&function.entry_actions))];
    children.extend(function.states.iter().map(state_node));
    if let Some(eof) = &function.eof_handler {
        children.push(DebugNode::branch("eof", commands_children(eof)));
    }
    DebugNode::branch(format!("function[{}({})] -> {}", function.name, function.params.join(", "), function.return_type.as_deref().unwrap_or("$self")), children)
}

/// Render an [`Machine`] AST as a tree.
pub fn ast_tree(machine: &Machine) -> DebugNode {
    let mut children: Vec<DebugNode> = machine.types.iter().map(|t| DebugNode::leaf(format!("type[{}] {:?}", t.name, t.kind))).collect();
    children.extend(machine.functions.iter().map(function_node));
    for block in &machine.keywords {
        children.push(DebugNode::leaf(format!("keywords[{}] ({} entries)", block.name, block.mappings.len())));
    }
    DebugNode::branch(format!("parser[{}] entry_point[{}]", machine.name, machine.entry_point), children)
}

fn ir_selector_label(selector: &IrSelector) -> String {
    match selector {
        IrSelector::Chars(class) => format!("chars{:?}", class.bytes),
        IrSelector::SpecialClass(name) => format!("class[{}]", name),
        IrSelector::ParamRef(name) => format!("param[:{}]", name),
        IrSelector::Conditional(cond) => format!("if[{}]", cond),
        IrSelector::Default => "default".to_string(),
        IrSelector::None => "(none)".to_string(),
    }
}

fn ir_command_label(cmd: &IrCommand) -> String {
    match cmd {
        IrCommand::Advance => "advance ->".to_string(),
        IrCommand::AdvanceTo(bytes) => format!("advance_to{:?}", bytes),
        IrCommand::Mark => "mark".to_string(),
        IrCommand::Term(code) => format!("term{}", code.map(|c| format!("[{}]", c)).unwrap_or_default()),
        IrCommand::Transition(target) => format!("transition[{}]", target.as_deref().unwrap_or(":self")),
        IrCommand::Return { emit_spec, suppress_auto_emit } => format!("return emit={:?} suppress={}", emit_spec, suppress_auto_emit),
        IrCommand::Call { name, args } => format!("call {}({:?})", name, args),
        IrCommand::ErrorCmd(code) => format!("err{}", code.as_deref().map(|c| format!("[{}]", c)).unwrap_or_default()),
        IrCommand::Assign { var, expr } => format!("{} = {}", var, expr),
        IrCommand::AddAssign { var, expr } => format!("{} += {}", var, expr),
        IrCommand::SubAssign { var, expr } => format!("{} -= {}", var, expr),
        IrCommand::Prepend(bytes) => format!("prepend{:?}", bytes),
        IrCommand::PrependParam(name) => format!("prepend_param[:{}]", name),
        IrCommand::InlineEmitBare(t) => format!("emit {}", t),
        IrCommand::InlineEmitMark(t) => format!("emit mark {}", t),
        IrCommand::InlineEmitLiteral(t, text) => format!("emit {} '{}'", t, text),
        IrCommand::KeywordsLookup(name) => format!("keywords[{}]", name),
        IrCommand::Conditional(clauses) => format!("conditional ({} clauses)", clauses.len()),
        IrCommand::Noop => "noop".to_string(),
    }
}

fn ir_commands_children(commands: &[IrCommand]) -> Vec<DebugNode> {
    commands
        .iter()
        .map(|cmd| {
            if let IrCommand::Conditional(clauses) = cmd {
                let children = clauses.iter().map(|(cond, body)| DebugNode::branch(format!("if[{}]", cond), ir_commands_children(body))).collect();
                DebugNode::branch(ir_command_label(cmd), children)
            } else {
                DebugNode::leaf(ir_command_label(cmd))
            }
        })
        .collect()
}

fn ir_case_node(case: &IrCase) -> DebugNode {
    DebugNode::branch(format!("case {} (line {})", ir_selector_label(&case.selector), case.lineno), ir_commands_children(&case.commands))
}

fn ir_state_node(state: &IrState) -> DebugNode {
    let mut children: Vec<DebugNode> = state.cases.iter().map(ir_case_node).collect();
    if let Some(eof) = &state.eof_handler {
        children.push(DebugNode::branch("eof", ir_commands_children(eof)));
    }
    let scan = state.scan_chars.as_ref().map(|b| format!(" scan{:?}", b)).unwrap_or_default();
    DebugNode::branch(format!("state[{}]{}", state.name.as_deref().unwrap_or("(anonymous)"), scan), children)
}

fn ir_function_node(function: &IrFunction) -> DebugNode {
    let mut children = vec![DebugNode::branch("entry_actions", ir_commands_children(&function.entry_actions))];
    children.extend(function.states.iter().map(ir_state_node));
    if let Some(eof) = &function.eof_handler {
        children.push(DebugNode::branch("eof", ir_commands_children(eof)));
    }
    let params: Vec<String> = function.params.iter().map(|p| format!("{}: {:?}", p, function.param_types.get(p))).collect();
    DebugNode::branch(format!("function[{}({})] expects_char={:?}", function.name, params.join(", "), function.expects_char), children)
}

/// Render an [`IrParser`] as a tree.
pub fn ir_tree(ir: &IrParser) -> DebugNode {
    let mut children: Vec<DebugNode> = ir.types.iter().map(|t| DebugNode::leaf(format!("type[{}] {:?}", t.name, t.kind))).collect();
    children.extend(ir.functions.iter().map(ir_function_node));
    for block in &ir.keywords {
        children.push(DebugNode::leaf(format!("keywords[{}] ({} entries)", block.name, block.mappings.len())));
    }
    if !ir.custom_error_codes.is_empty() {
        children.push(DebugNode::leaf(format!("custom_error_codes: {:?}", ir.custom_error_codes)));
    }
    DebugNode::branch(format!("parser[{}] entry_point[{}]", ir.name, ir.entry_point), children)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ast_tree_includes_functions_and_types() {
        let tokens = crate::lexer::tokenize("parser[D] | entry_point[main] | type[T] CONTENT | function[main] T | state[s] | default | -> | >>").unwrap();
        let machine = crate::ast::parser::parse(&tokens).unwrap();
        let tree = ast_tree(&machine);
        assert!(tree.children.iter().any(|c| c.label.starts_with("type[T]")));
        assert!(tree.children.iter().any(|c| c.label.starts_with("function[main")));
    }

    #[test]
    fn ir_tree_reports_scan_chars_on_self_looping_state() {
        let tokens = crate::lexer::tokenize("parser[D] | entry_point[main] | function[main] | state[s] | c['a'] | -> | >> | default | -> | >>").unwrap();
        let machine = crate::ast::parser::parse(&tokens).unwrap();
        let ir = crate::ir::build(&machine).unwrap();
        let tree = ir_tree(&ir);
        let function_node = tree.children.iter().find(|c| c.label.starts_with("function[main")).unwrap();
        let state_node = function_node.children.iter().find(|c| c.label.starts_with("state[s]")).unwrap();
        assert!(state_node.label.contains("scan"));
    }
}
