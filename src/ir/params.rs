//! Parameter-type inference with fix-point propagation (spec §4.4.6).
//! Every parameter starts as `i32`. Direct promotions come from three
//! syntactic signals inside the owning function (a `:param` selector or
//! case-character-class param ref, a byte-literal comparison in a
//! conditional guard, and `PREPEND` of a bare parameter). A call-site
//! pass then promotes a callee's parameter to `bytes` wherever some
//! caller forwards the empty class `<>`. Finally a fix-point pass flows
//! types from callees back to callers: if `bar` calls `foo(:x)` and
//! `foo`'s matching parameter is `byte`/`bytes`, `bar`'s `:x` picks up
//! that type too, repeating until no function's parameter map changes
//! (lattice height 1, so this always terminates — spec §9).

use std::collections::BTreeMap;

use super::model::{ArgValue, IrCommand, IrState, ParamType};

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Extract the bare parameter name being compared against a quoted
/// character literal in a condition like `p == '|'`, or `None` if the
/// comparison is a numeric flag test (`p == 0`) or not a comparison at
/// all.
fn byte_compare_param(cond: &str) -> Option<String> {
    let idx = cond.find("==")?;
    let lhs = cond[..idx].trim();
    let rhs = cond[idx + 2..].trim();
    let name = lhs.strip_prefix(':').unwrap_or(lhs);
    if !is_identifier(name) {
        return None;
    }
    if rhs.starts_with('\'') || rhs.starts_with('"') {
        Some(name.to_string())
    } else {
        None
    }
}

fn promote(map: &mut BTreeMap<String, ParamType>, name: &str, ty: ParamType) {
    if let Some(current) = map.get(name).copied() {
        if let Some(joined) = current.join(ty) {
            map.insert(name.to_string(), joined);
        }
    }
}

fn scan_commands_for_direct_promotions(commands: &[IrCommand], map: &mut BTreeMap<String, ParamType>) {
    for cmd in commands {
        match cmd {
            IrCommand::PrependParam(name) => promote(map, name, ParamType::Bytes),
            IrCommand::Conditional(clauses) => {
                for (cond, body) in clauses {
                    if let Some(name) = byte_compare_param(cond) {
                        promote(map, &name, ParamType::Byte);
                    }
                    scan_commands_for_direct_promotions(body, map);
                }
            }
            _ => {}
        }
    }
}

fn scan_states_for_direct_promotions(states: &[IrState], map: &mut BTreeMap<String, ParamType>) {
    use super::model::IrSelector;
    for state in states {
        for case in &state.cases {
            match &case.selector {
                IrSelector::ParamRef(name) => promote(map, name, ParamType::Byte),
                IrSelector::Chars(result) => {
                    if let Some(name) = &result.param_ref {
                        promote(map, name, ParamType::Byte);
                    }
                }
                IrSelector::Conditional(cond) => {
                    if let Some(name) = byte_compare_param(cond) {
                        promote(map, &name, ParamType::Byte);
                    }
                }
                _ => {}
            }
            scan_commands_for_direct_promotions(&case.commands, map);
        }
        if let Some(eof) = &state.eof_handler {
            scan_commands_for_direct_promotions(eof, map);
        }
    }
}

/// One `call`'s site, recorded for the fix-point/empty-class passes.
/// `raw` is the caller's exact source text for this argument (kept
/// untouched by call-argument rewriting, which runs after this pass).
struct CallSite {
    caller: String,
    callee: String,
    arg_index: usize,
    raw: String,
}

fn collect_call_sites_from(caller: &str, commands: &[IrCommand], sites: &mut Vec<CallSite>) {
    for cmd in commands {
        match cmd {
            IrCommand::Call { name, args } => {
                for (index, arg) in args.iter().enumerate() {
                    if let ArgValue::I32(raw) = arg {
                        sites.push(CallSite { caller: caller.to_string(), callee: name.clone(), arg_index: index, raw: raw.clone() });
                    }
                }
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    collect_call_sites_from(caller, body, sites);
                }
            }
            _ => {}
        }
    }
}

/// Function shape the inference pass needs: name, params, and every
/// command list that can contain a call or a direct-promotion signal.
pub struct FunctionShape<'a> {
    pub name: &'a str,
    pub params: &'a [String],
    pub states: &'a [IrState],
    pub entry_actions: &'a [IrCommand],
    pub eof_handler: &'a Option<Vec<IrCommand>>,
}

pub fn infer(functions: &[FunctionShape<'_>]) -> BTreeMap<String, BTreeMap<String, ParamType>> {
    let mut types: BTreeMap<String, BTreeMap<String, ParamType>> = functions
        .iter()
        .map(|f| (f.name.to_string(), f.params.iter().map(|p| (p.clone(), ParamType::I32)).collect()))
        .collect();

    for f in functions {
        let map = types.get_mut(f.name).unwrap();
        scan_states_for_direct_promotions(f.states, map);
        scan_commands_for_direct_promotions(f.entry_actions, map);
        if let Some(eof) = f.eof_handler {
            scan_commands_for_direct_promotions(eof, map);
        }
    }

    let mut sites = Vec::new();
    for f in functions {
        collect_call_sites_from(f.name, f.entry_actions, &mut sites);
        for state in f.states {
            for case in &state.cases {
                collect_call_sites_from(f.name, &case.commands, &mut sites);
            }
            if let Some(eof) = &state.eof_handler {
                collect_call_sites_from(f.name, eof, &mut sites);
            }
        }
        if let Some(eof) = f.eof_handler {
            collect_call_sites_from(f.name, eof, &mut sites);
        }
    }

    let params_of: BTreeMap<&str, &[String]> = functions.iter().map(|f| (f.name, f.params)).collect();

    // A literal empty class forces the callee's parameter to `bytes`
    // directly, independent of the caller's own types.
    for site in &sites {
        if site.raw.trim() == "<>" {
            if let Some(callee_params) = params_of.get(site.callee.as_str()) {
                if let Some(callee_param) = callee_params.get(site.arg_index) {
                    if let Some(callee_map) = types.get_mut(&site.callee) {
                        promote(callee_map, callee_param, ParamType::Bytes);
                    }
                }
            }
        }
    }

    loop {
        let mut changed = false;
        for site in &sites {
            let Some(caller_param_name) = site.raw.trim().strip_prefix(':') else { continue };
            let Some(callee_params) = params_of.get(site.callee.as_str()) else { continue };
            let Some(callee_param) = callee_params.get(site.arg_index) else { continue };
            let Some(callee_ty) = types.get(&site.callee).and_then(|m| m.get(callee_param)).copied() else { continue };
            let Some(caller_map) = types.get_mut(&site.caller) else { continue };
            let Some(&current) = caller_map.get(caller_param_name) else { continue };
            if let Some(joined) = current.join(callee_ty) {
                if joined != current {
                    caller_map.insert(caller_param_name.to_string(), joined);
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::{IrCase, IrSelector};

    fn call_case(name: &str, arg: &str) -> IrCase {
        IrCase {
            selector: IrSelector::Default,
            substate: None,
            commands: vec![IrCommand::Call { name: name.into(), args: vec![ArgValue::I32(arg.into())] }],
            lineno: 1,
        }
    }

    #[test]
    fn byte_propagates_from_callee_param_to_caller() {
        let foo_state = IrState {
            cases: vec![IrCase { selector: IrSelector::ParamRef("x".into()), substate: None, commands: vec![], lineno: 1 }],
            ..Default::default()
        };
        let foo_states = vec![foo_state];
        let bar_states = vec![IrState { cases: vec![call_case("foo", ":x")], ..Default::default() }];

        let foo_params = vec!["x".to_string()];
        let bar_params = vec!["x".to_string()];
        let foo = FunctionShape { name: "foo", params: &foo_params, states: &foo_states, entry_actions: &[], eof_handler: &None };
        let bar = FunctionShape { name: "bar", params: &bar_params, states: &bar_states, entry_actions: &[], eof_handler: &None };

        let types = infer(&[foo, bar]);
        assert_eq!(types["foo"]["x"], ParamType::Byte);
        assert_eq!(types["bar"]["x"], ParamType::Byte);
    }

    #[test]
    fn empty_class_argument_forces_bytes_param() {
        let foo_params = vec!["x".to_string()];
        let bar_params: Vec<String> = vec![];
        let foo = FunctionShape { name: "foo", params: &foo_params, states: &[], entry_actions: &[], eof_handler: &None };
        let bar_states = vec![IrState { cases: vec![call_case("foo", "<>")], ..Default::default() }];
        let bar = FunctionShape { name: "bar", params: &bar_params, states: &bar_states, entry_actions: &[], eof_handler: &None };

        let types = infer(&[foo, bar]);
        assert_eq!(types["foo"]["x"], ParamType::Bytes);
    }

    #[test]
    fn numeric_flag_comparison_does_not_promote() {
        let params = vec!["flag".to_string()];
        let states = vec![IrState {
            cases: vec![IrCase {
                selector: IrSelector::Conditional("flag == 0".into()),
                substate: None,
                commands: vec![],
                lineno: 1,
            }],
            ..Default::default()
        }];
        let f = FunctionShape { name: "foo", params: &params, states: &states, entry_actions: &[], eof_handler: &None };
        let types = infer(&[f]);
        assert_eq!(types["foo"]["flag"], ParamType::I32);
    }

    #[test]
    fn prepend_param_forces_bytes() {
        let params = vec!["tail".to_string()];
        let entry = vec![IrCommand::PrependParam("tail".into())];
        let f = FunctionShape { name: "foo", params: &params, states: &[], entry_actions: &entry, eof_handler: &None };
        let types = infer(&[f]);
        assert_eq!(types["foo"]["tail"], ParamType::Bytes);
    }
}
