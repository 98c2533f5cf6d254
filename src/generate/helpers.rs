//! Helper-usage analysis (spec §4.6): scans a lowered function for the
//! handful of runtime helper calls a generated parser might need
//! (`col()`, `prev()`, setting the terminal flag, emitting spans,
//! `is_letter`/`is_digit`) so the template only emits the helper
//! plumbing a function actually exercises, and records the widest
//! `SCAN` arity seen so the template can size its dispatch table.

use serde::Serialize;

use crate::ir::{IrCommand, IrFunction};

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct HelperUsage {
    pub uses_col: bool,
    pub uses_prev: bool,
    pub uses_set_term: bool,
    pub emits_spans: bool,
    pub uses_is_letter: bool,
    pub uses_is_digit: bool,
    pub max_scan_arity: usize,
}

fn expr_mentions(expr: &str, name: &str) -> bool {
    expr.contains(name)
}

fn scan_expr(usage: &mut HelperUsage, expr: &str) {
    if expr_mentions(expr, "col(") {
        usage.uses_col = true;
    }
    if expr_mentions(expr, "prev(") {
        usage.uses_prev = true;
    }
    if expr_mentions(expr, "is_letter(") {
        usage.uses_is_letter = true;
    }
    if expr_mentions(expr, "is_digit(") {
        usage.uses_is_digit = true;
    }
}

fn scan_commands(usage: &mut HelperUsage, commands: &[IrCommand]) {
    for cmd in commands {
        match cmd {
            IrCommand::Term(_) => usage.uses_set_term = true,
            IrCommand::Assign { expr, .. } | IrCommand::AddAssign { expr, .. } | IrCommand::SubAssign { expr, .. } => scan_expr(usage, expr),
            IrCommand::InlineEmitLiteral(_, text) => scan_expr(usage, text),
            IrCommand::Return { .. } | IrCommand::InlineEmitBare(_) | IrCommand::InlineEmitMark(_) => usage.emits_spans = true,
            IrCommand::Call { args, .. } => {
                for arg in args {
                    if let crate::ir::ArgValue::I32(text) = arg {
                        scan_expr(usage, text);
                    }
                }
            }
            IrCommand::Conditional(clauses) => {
                for (condition, body) in clauses {
                    scan_expr(usage, condition);
                    scan_commands(usage, body);
                }
            }
            _ => {}
        }
    }
}

/// Analyze one lowered function for which runtime helpers its generated
/// body would call.
pub fn analyze(function: &IrFunction) -> HelperUsage {
    let mut usage = HelperUsage::default();
    scan_commands(&mut usage, &function.entry_actions);
    for state in &function.states {
        if let Some(scan) = &state.scan_chars {
            usage.max_scan_arity = usage.max_scan_arity.max(scan.len());
        }
        for case in &state.cases {
            scan_commands(&mut usage, &case.commands);
        }
        if let Some(eof) = &state.eof_handler {
            scan_commands(&mut usage, eof);
        }
    }
    if let Some(eof) = &function.eof_handler {
        scan_commands(&mut usage, eof);
    }
    usage
}
