//! SCAN inference (spec §4.4.3) and newline injection (spec §4.4.4): for
//! each state, detect whether the non-default cases' literal bytes form a
//! small set (`<= 6`) that a self-looping default case can skip past with
//! a single SIMD multi-byte search, then guarantee the scanned set always
//! stops at `\n` so line/column tracking stays correct without a
//! per-byte check.

use super::commands::case_literal_bytes;
use super::model::IrState;

/// Maximum distinct bytes a SCAN set may hold before the optimisation no
/// longer pays for itself (spec §4.4.3/§8 invariant 4).
pub const SCAN_MAX_CHARS: usize = 6;

pub fn infer(state: &mut IrState) {
    if !state.is_self_looping {
        return;
    }

    let mut literal_chars = std::collections::BTreeSet::new();
    for case in &state.cases {
        if matches!(case.selector, super::model::IrSelector::Default | super::model::IrSelector::None) {
            continue;
        }
        if matches!(case.selector, super::model::IrSelector::Conditional(_)) {
            return;
        }
        match case_literal_bytes(&case.selector) {
            Some(bytes) => literal_chars.extend(bytes.iter().copied()),
            None => return,
        }
    }

    if literal_chars.is_empty() || literal_chars.len() > SCAN_MAX_CHARS {
        return;
    }

    if !literal_chars.contains(&b'\n') && literal_chars.len() < SCAN_MAX_CHARS {
        literal_chars.insert(b'\n');
        state.newline_injected = true;
    }

    state.scan_chars = Some(literal_chars.into_iter().collect());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::{IrCase, IrCommand, IrSelector};
    use crate::charclass::ClassResult;

    fn pipe_case() -> IrCase {
        IrCase {
            selector: IrSelector::Chars(ClassResult { chars: [b'|'].into_iter().collect(), bytes: vec![b'|'], ..Default::default() }),
            substate: None,
            commands: vec![IrCommand::Transition(Some("pipe".into()))],
            lineno: 1,
        }
    }

    fn default_self_loop_case(state_name: Option<&str>) -> IrCase {
        IrCase {
            selector: IrSelector::Default,
            substate: None,
            commands: vec![IrCommand::Advance, IrCommand::Transition(state_name.map(|s| s.to_string()))],
            lineno: 1,
        }
    }

    #[test]
    fn scan_chars_inferred_with_newline_injected() {
        let mut state = IrState {
            name: Some("s".into()),
            cases: vec![pipe_case(), default_self_loop_case(Some("s"))],
            is_self_looping: true,
            ..Default::default()
        };
        infer(&mut state);
        let scan = state.scan_chars.unwrap();
        assert!(scan.contains(&b'|'));
        assert!(scan.contains(&b'\n'));
        assert!(state.newline_injected);
    }

    #[test]
    fn not_self_looping_skips_scan() {
        let mut state = IrState {
            name: Some("s".into()),
            cases: vec![pipe_case()],
            is_self_looping: false,
            ..Default::default()
        };
        infer(&mut state);
        assert!(state.scan_chars.is_none());
    }

    #[test]
    fn already_has_newline_does_not_mark_injected() {
        let mut nl_case = pipe_case();
        nl_case.selector = IrSelector::Chars(ClassResult {
            chars: [b'|', b'\n'].into_iter().collect(),
            bytes: vec![b'|', b'\n'],
            ..Default::default()
        });
        let mut state = IrState {
            name: Some("s".into()),
            cases: vec![nl_case, default_self_loop_case(Some("s"))],
            is_self_looping: true,
            ..Default::default()
        };
        infer(&mut state);
        assert!(!state.newline_injected);
    }
}
