//! Prepend-value collection: for every parameter a function forwards
//! into `PREPEND` (spec §3 `prepend_values: param → set<byte>`), gathers
//! the literal byte values observed at that parameter's call sites once
//! [`super::call_rewrite`] has resolved arguments into their final
//! representation. Lets the generator special-case a small, statically
//! known set of prepend bytes instead of always emitting a dynamic
//! buffer push.

use std::collections::BTreeSet;

use super::model::{ArgValue, IrCommand, IrFunction};

fn collect_prepend_params(commands: &[IrCommand], used: &mut BTreeSet<String>) {
    for cmd in commands {
        match cmd {
            IrCommand::PrependParam(name) => {
                used.insert(name.clone());
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    collect_prepend_params(body, used);
                }
            }
            _ => {}
        }
    }
}

fn collect_call_bytes(commands: &[IrCommand], observed: &mut std::collections::BTreeMap<(String, usize), BTreeSet<u8>>) {
    for cmd in commands {
        match cmd {
            IrCommand::Call { name, args } => {
                for (index, arg) in args.iter().enumerate() {
                    if let ArgValue::Bytes(bytes) = arg {
                        observed.entry((name.clone(), index)).or_default().extend(bytes.iter().copied());
                    }
                }
            }
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    collect_call_bytes(body, observed);
                }
            }
            _ => {}
        }
    }
}

fn all_command_lists(f: &IrFunction) -> Vec<&[IrCommand]> {
    let mut lists: Vec<&[IrCommand]> = vec![&f.entry_actions];
    for state in &f.states {
        for case in &state.cases {
            lists.push(&case.commands);
        }
        if let Some(eof) = &state.eof_handler {
            lists.push(eof);
        }
    }
    if let Some(eof) = &f.eof_handler {
        lists.push(eof);
    }
    lists
}

pub fn compute(functions: &mut [IrFunction]) {
    let used_per_function: Vec<BTreeSet<String>> = functions
        .iter()
        .map(|f| {
            let mut used = BTreeSet::new();
            for list in all_command_lists(f) {
                collect_prepend_params(list, &mut used);
            }
            used
        })
        .collect();

    let mut observed = std::collections::BTreeMap::new();
    for f in functions.iter() {
        for list in all_command_lists(f) {
            collect_call_bytes(list, &mut observed);
        }
    }

    for (f, used) in functions.iter_mut().zip(used_per_function.iter()) {
        for (index, pname) in f.params.clone().iter().enumerate() {
            if !used.contains(pname) {
                continue;
            }
            if let Some(bytes) = observed.get(&(f.name.clone(), index)) {
                f.prepend_values.entry(pname.clone()).or_default().extend(bytes.iter().copied());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::{IrCase, IrSelector, IrState, ParamType};

    fn make_function(name: &str, params: Vec<&str>, commands: Vec<IrCommand>) -> IrFunction {
        IrFunction {
            name: name.into(),
            return_type: None,
            params: params.iter().map(|s| s.to_string()).collect(),
            param_types: params.iter().map(|s| (s.to_string(), ParamType::Bytes)).collect(),
            locals: Default::default(),
            local_init_values: Default::default(),
            states: vec![IrState {
                cases: vec![IrCase { selector: IrSelector::Default, substate: None, commands, lineno: 1 }],
                ..Default::default()
            }],
            entry_actions: vec![],
            eof_handler: None,
            expects_char: None,
            emits_content_on_close: false,
            emits_events: false,
            prepend_values: Default::default(),
            lineno: 1,
        }
    }

    #[test]
    fn observed_literal_bytes_collected_for_prepend_param() {
        let foo = make_function("foo", vec!["tail"], vec![IrCommand::PrependParam("tail".into())]);
        let bar = make_function("bar", vec![], vec![IrCommand::Call { name: "foo".into(), args: vec![ArgValue::Bytes(vec![b'a'])] }]);
        let baz = make_function("baz", vec![], vec![IrCommand::Call { name: "foo".into(), args: vec![ArgValue::Bytes(vec![b'b'])] }]);
        let mut functions = vec![foo, bar, baz];
        compute(&mut functions);
        let values = &functions[0].prepend_values["tail"];
        assert!(values.contains(&b'a') && values.contains(&b'b'));
    }
}
