//! `expects_char` / unclosed-EOF inference (spec §4.4.5): collects every
//! case across a function's states that issues a `return`. If every such
//! case selects exactly one literal byte, and all those bytes agree, that
//! byte becomes the function's `expects_char` — the byte the emitted
//! parser expects before EOF, driving the "unclosed Foo" error. If any
//! qualifying case runs `TERM` before `return`, `emits_content_on_close`
//! is also set so the emitted EOF handler flushes accumulated content
//! first.

use super::commands::case_literal_bytes;
use super::model::{IrCase, IrCommand, IrState};

fn contains_return(commands: &[IrCommand]) -> bool {
    commands.iter().any(|c| match c {
        IrCommand::Return { .. } => true,
        IrCommand::Conditional(clauses) => clauses.iter().any(|(_, body)| contains_return(body)),
        _ => false,
    })
}

fn term_precedes_a_return(commands: &[IrCommand], term_seen: bool) -> bool {
    let mut seen = term_seen;
    for cmd in commands {
        match cmd {
            IrCommand::Term(_) => seen = true,
            IrCommand::Return { .. } => {
                if seen {
                    return true;
                }
            }
            IrCommand::Conditional(clauses) => {
                if clauses.iter().any(|(_, body)| term_precedes_a_return(body, seen)) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// One return-bearing case's selector byte, or `None` if it does not
/// select exactly one literal byte (disqualifying `expects_char`
/// inference for the whole function).
fn single_selector_byte(case: &IrCase) -> Option<u8> {
    let chars = case_literal_bytes(&case.selector)?;
    if chars.len() == 1 {
        chars.iter().next().copied()
    } else {
        None
    }
}

pub struct EofInference {
    pub expects_char: Option<u8>,
    pub emits_content_on_close: bool,
}

pub fn infer(states: &[IrState]) -> EofInference {
    let mut candidate: Option<u8> = None;
    let mut disqualified = false;
    let mut emits_content_on_close = false;

    for state in states {
        for case in &state.cases {
            if !contains_return(&case.commands) {
                continue;
            }
            match single_selector_byte(case) {
                Some(byte) => match candidate {
                    None => candidate = Some(byte),
                    Some(existing) if existing == byte => {}
                    Some(_) => disqualified = true,
                },
                None => disqualified = true,
            }
            if term_precedes_a_return(&case.commands, false) {
                emits_content_on_close = true;
            }
        }
    }

    EofInference {
        expects_char: if disqualified { None } else { candidate },
        emits_content_on_close,
    }
}
