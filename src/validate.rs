//! Validator (spec §4.5): a post-IR cross-reference check. Produces a
//! report of fatal **errors** (generation must stop) and non-fatal
//! **warnings** (generation proceeds but the caller is notified).
//! Everything here is line-tagged the same way the three fatal
//! taxonomies are (spec §7), even though a warning never becomes an
//! `Error`.

use std::collections::HashSet;

use crate::ast::TypeKind;
use crate::ir::{IrCommand, IrFunction, IrParser};

/// Suffixes the generator appends when it derives an event name from a
/// type (`FooStart`, `FooEnd`) or synthesizes an anonymous one (`FooAnon`)
/// — stripped before checking whether an emitted type is declared.
const DERIVED_SUFFIXES: &[&str] = &["Start", "End", "Anon"];
/// Event names the generator emits itself, never declared as a `type`.
const BUILTIN_EMIT_NAMES: &[&str] = &["Error", "Warning"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub lineno: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn error(&mut self, lineno: usize, message: impl Into<String>) {
        self.errors.push(Diagnostic { lineno, message: message.into() });
    }

    fn warn(&mut self, lineno: usize, message: impl Into<String>) {
        self.warnings.push(Diagnostic { lineno, message: message.into() });
    }
}

fn strip_emit_suffix<'a>(name: &'a str, known_types: &HashSet<&str>) -> &'a str {
    if known_types.contains(name) {
        return name;
    }
    for suffix in DERIVED_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            if known_types.contains(stripped) {
                return stripped;
            }
        }
    }
    name
}

fn check_emit_target(name: &str, lineno: usize, known_types: &HashSet<&str>, report: &mut ValidationReport) {
    if BUILTIN_EMIT_NAMES.contains(&name) || name == crate::ast::IMPLICIT_EMIT_TYPE {
        return;
    }
    let base = strip_emit_suffix(name, known_types);
    if !known_types.contains(base) {
        report.warn(lineno, format!("emit of undeclared type '{}'", name));
    }
}

fn walk_commands(
    commands: &[IrCommand],
    lineno: usize,
    known_functions: &HashSet<&str>,
    known_types: &HashSet<&str>,
    report: &mut ValidationReport,
) {
    for cmd in commands {
        match cmd {
            IrCommand::Call { name, .. } => {
                if !known_functions.contains(name.as_str()) {
                    report.warn(lineno, format!("call to undefined function '{}'", name));
                }
            }
            IrCommand::InlineEmitBare(name) | IrCommand::InlineEmitMark(name) => {
                check_emit_target(name, lineno, known_types, report);
            }
            IrCommand::InlineEmitLiteral(name, _) => {
                check_emit_target(name, lineno, known_types, report);
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    walk_commands(body, lineno, known_functions, known_types, report);
                }
            }
            _ => {}
        }
    }
}

fn check_transition_targets(function: &IrFunction, report: &mut ValidationReport) {
    let state_names: HashSet<&str> = function.states.iter().filter_map(|s| s.name.as_deref()).collect();
    let check = |commands: &[IrCommand], lineno: usize, report: &mut ValidationReport| {
        fn inner(commands: &[IrCommand], lineno: usize, state_names: &HashSet<&str>, report: &mut ValidationReport) {
            for cmd in commands {
                match cmd {
                    IrCommand::Transition(Some(target)) => {
                        let target = target.trim().trim_start_matches(':');
                        if !state_names.contains(target) {
                            report.warn(lineno, format!("transition target ':{}' is not a state in this function", target));
                        }
                    }
                    IrCommand::Conditional(clauses) => {
                        for (_, body) in clauses {
                            inner(body, lineno, state_names, report);
                        }
                    }
                    _ => {}
                }
            }
        }
        inner(commands, lineno, &state_names, report);
    };

    for state in &function.states {
        for case in &state.cases {
            check(&case.commands, case.lineno, report);
        }
    }
}

/// Run the full cross-reference check over an already-built IR (spec
/// §4.5). Walks nested conditional clauses the same way the IR-build
/// passes do.
pub fn validate(ir: &IrParser) -> ValidationReport {
    let mut report = ValidationReport::default();

    let mut seen_types = HashSet::new();
    for t in &ir.types {
        if !seen_types.insert(t.name.as_str()) {
            report.error(0, format!("duplicate type declaration '{}'", t.name));
        }
        if let TypeKind::Unknown(raw) = &t.kind {
            report.error(t.lineno, format!("unknown type kind '{}' for type '{}'", raw, t.name));
        }
    }
    let known_types: HashSet<&str> = ir.types.iter().map(|t| t.name.as_str()).collect();

    let known_functions: HashSet<&str> = ir.functions.iter().map(|f| f.name.as_str()).collect();
    if !known_functions.contains(ir.entry_point.as_str()) {
        report.error(0, format!("entry point references undefined function '{}'", ir.entry_point));
    }

    let mut seen_functions = HashSet::new();
    for f in &ir.functions {
        if !seen_functions.insert(f.name.as_str()) {
            report.warn(f.lineno, format!("duplicate function '{}'", f.name));
        }
        if f.states.is_empty() {
            report.warn(f.lineno, format!("function '{}' has no states", f.name));
        }
        if let Some(return_type) = &f.return_type {
            if !known_types.contains(return_type.as_str()) {
                report.warn(f.lineno, format!("function '{}' returns undeclared type '{}'", f.name, return_type));
            }
        }
        for state in &f.states {
            if state.cases.is_empty() {
                report.warn(state.lineno, format!("state in function '{}' has no cases", f.name));
            }
            for case in &state.cases {
                walk_commands(&case.commands, case.lineno, &known_functions, &known_types, &mut report);
            }
            if let Some(eof) = &state.eof_handler {
                walk_commands(eof, state.lineno, &known_functions, &known_types, &mut report);
            }
        }
        walk_commands(&f.entry_actions, f.lineno, &known_functions, &known_types, &mut report);
        if let Some(eof) = &f.eof_handler {
            walk_commands(eof, f.lineno, &known_functions, &known_types, &mut report);
        }
        check_transition_targets(f, &mut report);
    }

    let mut seen_keyword_names = HashSet::new();
    for block in &ir.keywords {
        if !seen_keyword_names.insert(block.name.as_str()) {
            report.warn(block.lineno, format!("duplicate keywords block '{}' (latest wins)", block.name));
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse as parse_ast;
    use crate::ir::build;
    use crate::lexer::tokenize;

    fn validate_source(src: &str) -> ValidationReport {
        let tokens = tokenize(src).unwrap();
        let machine = parse_ast(&tokens).unwrap();
        let ir = build(&machine).unwrap();
        validate(&ir)
    }

    #[test]
    fn undefined_entry_point_is_an_error() {
        let report = validate_source("parser[D] | entry_point[missing] | function[main] | state[s] | default | -> | >>");
        assert!(report.has_errors());
    }

    #[test]
    fn call_to_undefined_function_is_a_warning() {
        let report = validate_source(
            "parser[D] | entry_point[main] | function[main] | state[s] | /ghost | -> | >> | default | -> | >>",
        );
        assert!(!report.has_errors());
        assert!(report.warnings.iter().any(|w| w.message.contains("undefined function")));
    }

    #[test]
    fn empty_state_is_a_warning() {
        let report = validate_source("parser[D] | entry_point[main] | function[main] | state[s]");
        assert!(report.warnings.iter().any(|w| w.message.contains("no cases")));
    }

    #[test]
    fn undeclared_return_type_is_a_warning() {
        let report = validate_source("parser[D] | entry_point[main] | function[main] Ghost | state[s] | default | -> | >>");
        assert!(report.warnings.iter().any(|w| w.message.contains("undeclared type")));
    }

    #[test]
    fn unknown_type_kind_is_an_error() {
        let report = validate_source("parser[D] | entry_point[main] | type[Obj] BOGUS | function[main] | state[s] | default | -> | >>");
        assert!(report.has_errors());
        assert!(report.errors.iter().any(|e| e.message.contains("unknown type kind") && e.message.contains("BOGUS")));
    }

    #[test]
    fn well_formed_machine_has_no_diagnostics() {
        let report = validate_source("parser[D] | entry_point[main] | function[main] | state[s] | default | -> | >>");
        assert!(!report.has_errors());
        assert!(report.warnings.is_empty());
    }
}
