//! Command transformation (spec §4.4.2): lowers each AST [`Command`] into
//! an [`IrCommand`], running character-bearing commands through
//! [`crate::charclass`] and rejecting the forms spec §4.4.2/§4.4 Failures
//! disallows (`advance_to` with a special class or param ref, or more than
//! six bytes; `PREPEND`/call arguments that are a bare identifier
//! colliding with a known parameter name).

use crate::ast::{Case, Command, InlineEmitKind, Selector, State};
use crate::charclass::{self, ClassResult};
use crate::error::{Error, ValidationError};

use super::model::{ArgValue, IrCase, IrCommand, IrSelector, IrState};

/// Maximum literal bytes `advance_to` may chain (spec §4.4.2).
pub const ADVANCE_TO_MAX_BYTES: usize = 6;

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Lower one `advance_to`/`PREPEND` literal, enforcing the byte-cap and
/// class/param-ref rejection for `advance_to` (the `cap` argument is
/// `Some(ADVANCE_TO_MAX_BYTES)` for `advance_to`, `None` for `PREPEND`,
/// which has no arity cap in the source spec).
fn lower_byte_literal(raw: &str, lineno: usize, forbid_class_and_param: bool, cap: Option<usize>) -> Result<Vec<u8>, Error> {
    let result = charclass::parse(raw, lineno)?;
    if forbid_class_and_param {
        if result.special_class.is_some() {
            return Err(ValidationError::new(lineno, "advance_to cannot use a special character class").into());
        }
        if result.param_ref.is_some() {
            return Err(ValidationError::new(lineno, "advance_to cannot use a parameter reference").into());
        }
    }
    let bytes = charclass::to_bytes(&result);
    if let Some(max) = cap {
        if bytes.len() > max {
            return Err(ValidationError::new(
                lineno,
                format!("advance_to chains at most {} bytes, got {}", max, bytes.len()),
            )
            .into());
        }
    }
    Ok(bytes)
}

/// Lower a `PREPEND` raw argument: `:name` becomes [`IrCommand::PrependParam`];
/// a bare identifier that collides with a known parameter name is a
/// validation error suggesting the `:name` form; anything else is parsed
/// as a character literal.
fn lower_prepend(raw: &str, lineno: usize, params: &[String]) -> Result<IrCommand, Error> {
    let trimmed = raw.trim();
    if let Some(name) = trimmed.strip_prefix(':') {
        return Ok(IrCommand::PrependParam(name.to_string()));
    }
    if is_identifier(trimmed) && params.iter().any(|p| p == trimmed) {
        return Err(ValidationError::new(
            lineno,
            format!("'{}' is a parameter; did you mean ':{}' in PREPEND?", trimmed, trimmed),
        )
        .into());
    }
    let bytes = lower_byte_literal(trimmed, lineno, false, None)?;
    Ok(IrCommand::Prepend(bytes))
}

/// Lower a call's raw argument list. Each argument is kept as its raw,
/// trimmed source text inside [`ArgValue::I32`] — a placeholder
/// representation later replaced by [`super::call_rewrite`] once the
/// callee's parameter types are known (spec §4.4.10). A bare identifier
/// colliding with a known parameter name (missing the `:` sigil) is
/// rejected immediately.
fn lower_call_args(args_raw: &Option<String>, lineno: usize, params: &[String]) -> Result<Vec<ArgValue>, Error> {
    let Some(raw) = args_raw else { return Ok(Vec::new()) };
    let mut args = Vec::new();
    for arg in charclass::split_args(raw) {
        if is_identifier(&arg) && params.iter().any(|p| p == &arg) {
            return Err(ValidationError::new(
                lineno,
                format!("'{}' is a parameter; did you mean ':{}'?", arg, arg),
            )
            .into());
        }
        args.push(ArgValue::I32(arg));
    }
    Ok(args)
}

pub fn lower_command(command: &Command, lineno: usize, params: &[String]) -> Result<IrCommand, Error> {
    Ok(match command {
        Command::Advance => IrCommand::Advance,
        Command::AdvanceTo { raw } => IrCommand::AdvanceTo(lower_byte_literal(raw, lineno, true, Some(ADVANCE_TO_MAX_BYTES))?),
        Command::Mark => IrCommand::Mark,
        Command::Term { offset_raw } => IrCommand::Term(
            offset_raw
                .as_deref()
                .map(|s| {
                    s.trim().parse::<i32>().map_err(|_| {
                        Error::from(ValidationError::new(lineno, format!("TERM offset '{}' is not an integer", s)))
                    })
                })
                .transpose()?,
        ),
        Command::Transition { target } => IrCommand::Transition(target.clone()),
        Command::Return { raw } => IrCommand::Return {
            emit_spec: raw.clone().map(super::model::EmitSpec::Value),
            suppress_auto_emit: false,
        },
        Command::Call { name, args_raw } => IrCommand::Call {
            name: name.clone(),
            args: lower_call_args(args_raw, lineno, params)?,
        },
        Command::Error { code_raw } => IrCommand::ErrorCmd(code_raw.clone()),
        Command::Assign { var, expr_raw } => IrCommand::Assign { var: var.clone(), expr: expr_raw.clone() },
        Command::AddAssign { var, expr_raw } => IrCommand::AddAssign { var: var.clone(), expr: expr_raw.clone() },
        Command::SubAssign { var, expr_raw } => IrCommand::SubAssign { var: var.clone(), expr: expr_raw.clone() },
        Command::Prepend { raw } => lower_prepend(raw, lineno, params)?,
        Command::InlineEmit { type_name, kind } => match kind {
            InlineEmitKind::Bare => IrCommand::InlineEmitBare(type_name.clone()),
            InlineEmitKind::Mark => IrCommand::InlineEmitMark(type_name.clone()),
            InlineEmitKind::Literal(lit) => IrCommand::InlineEmitLiteral(type_name.clone(), lit.clone()),
        },
        Command::KeywordsLookup { name } => IrCommand::KeywordsLookup(name.clone()),
        Command::Conditional { clauses } => IrCommand::Conditional(
            clauses
                .iter()
                .map(|(cond, body)| Ok((cond.clone(), lower_commands(body, lineno, params)?)))
                .collect::<Result<Vec<_>, Error>>()?,
        ),
        Command::Noop => IrCommand::Noop,
    })
}

pub fn lower_commands(commands: &[Command], lineno: usize, params: &[String]) -> Result<Vec<IrCommand>, Error> {
    commands.iter().map(|c| lower_command(c, lineno, params)).collect()
}

fn lower_selector(selector: &Selector, lineno: usize) -> Result<IrSelector, Error> {
    Ok(match selector {
        Selector::Chars(raw) => IrSelector::Chars(charclass::parse(raw, lineno)?),
        Selector::SpecialClass(name) => IrSelector::SpecialClass(name.clone()),
        Selector::ParamRef(name) => IrSelector::ParamRef(name.clone()),
        Selector::Conditional(cond) => IrSelector::Conditional(cond.clone()),
        Selector::Default => IrSelector::Default,
        Selector::None => IrSelector::None,
    })
}

fn lower_case(case: &Case, params: &[String]) -> Result<IrCase, Error> {
    Ok(IrCase {
        selector: lower_selector(&case.selector, case.lineno)?,
        substate: case.substate.clone(),
        commands: lower_commands(&case.commands, case.lineno, params)?,
        lineno: case.lineno,
    })
}

/// Whether a case's selector denotes "matches the default/fallback path":
/// `default`, or a bare-action `None` selector used as the state's sole
/// catch-all.
fn case_is_default(case: &IrCase) -> bool {
    matches!(case.selector, IrSelector::Default | IrSelector::None)
}

/// Whether a case's command list is *exactly* `[advance, transition(self)]`
/// or `[advance, transition(None)]` — the shape SCAN inference requires of
/// a self-looping default case (spec §4.4.3).
pub fn is_self_loop_commands(commands: &[IrCommand], state_name: &Option<String>) -> bool {
    if commands.len() != 2 {
        return false;
    }
    matches!(commands[0], IrCommand::Advance)
        && match &commands[1] {
            IrCommand::Transition(None) => true,
            IrCommand::Transition(Some(target)) => state_name.as_deref() == Some(target.as_str()),
            _ => false,
        }
}

pub fn lower_state(state: &State, params: &[String]) -> Result<IrState, Error> {
    let cases: Vec<IrCase> = state.cases.iter().map(|c| lower_case(c, params)).collect::<Result<_, _>>()?;
    let has_default = cases.iter().any(case_is_default);
    let is_unconditional = cases.len() == 1 && matches!(cases[0].selector, IrSelector::None);
    let is_self_looping = cases
        .iter()
        .find(|c| case_is_default(c))
        .map(|c| is_self_loop_commands(&c.commands, &state.name))
        .unwrap_or(false);
    let eof_handler = state
        .eof_handler
        .as_ref()
        .map(|cmds| lower_commands(cmds, state.lineno, params))
        .transpose()?;

    Ok(IrState {
        name: state.name.clone(),
        cases,
        eof_handler,
        scan_chars: None,
        is_self_looping,
        has_default,
        is_unconditional,
        newline_injected: false,
        lineno: state.lineno,
    })
}

/// Collect the literal byte set matched by a case's selector, when that
/// selector names literal bytes (`Chars` with no special class/param ref).
pub fn case_literal_bytes(selector: &IrSelector) -> Option<&std::collections::BTreeSet<u8>> {
    match selector {
        IrSelector::Chars(ClassResult { chars, special_class: None, param_ref: None, .. }) => Some(chars),
        _ => None,
    }
}
