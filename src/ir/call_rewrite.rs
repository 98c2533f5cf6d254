//! Call-argument rewriting (spec §4.4.10): the final IR-build pass. For
//! every call whose callee's parameters are known, each argument is
//! re-parsed through [`crate::charclass`] and emitted in the
//! representation the callee's parameter type demands (`byte` → byte
//! literal, `bytes` → byte-string literal, `i32` → passed through). A
//! numeric `0` literal is special-cased per target kind, and a `:param`
//! forwarding reference is always left as a pass-through expression
//! (expanded later by the `rust_expr` template filter) regardless of the
//! callee's declared type.

use std::collections::BTreeMap;

use crate::charclass;
use crate::error::Error;

use super::model::{ArgValue, IrCommand, IrFunction, ParamType};

fn convert_arg(raw: &str, ty: ParamType, lineno: usize) -> Result<ArgValue, Error> {
    let trimmed = raw.trim();
    if trimmed.starts_with(':') {
        return Ok(ArgValue::I32(trimmed.to_string()));
    }
    match ty {
        ParamType::I32 => Ok(ArgValue::I32(trimmed.to_string())),
        ParamType::Byte => {
            if trimmed == "0" {
                return Ok(ArgValue::Byte(0));
            }
            let parsed = charclass::parse(trimmed, lineno)?;
            Ok(ArgValue::Byte(charclass::to_byte(&parsed)))
        }
        ParamType::Bytes => {
            if trimmed == "0" {
                return Ok(ArgValue::Bytes(Vec::new()));
            }
            let parsed = charclass::parse(trimmed, lineno)?;
            Ok(ArgValue::Bytes(charclass::to_bytes(&parsed)))
        }
    }
}

fn rewrite_call(name: &str, args: &mut [ArgValue], callees: &BTreeMap<String, (Vec<String>, BTreeMap<String, ParamType>)>, lineno: usize) -> Result<(), Error> {
    let Some((params, types)) = callees.get(name) else { return Ok(()) };
    for (index, arg) in args.iter_mut().enumerate() {
        let ArgValue::I32(raw) = arg else { continue };
        let Some(param_name) = params.get(index) else { continue };
        let ty = types.get(param_name).copied().unwrap_or(ParamType::I32);
        *arg = convert_arg(raw, ty, lineno)?;
    }
    Ok(())
}

fn rewrite_commands(commands: &mut [IrCommand], callees: &BTreeMap<String, (Vec<String>, BTreeMap<String, ParamType>)>, lineno: usize) -> Result<(), Error> {
    for cmd in commands {
        match cmd {
            IrCommand::Call { name, args } => rewrite_call(name, args, callees, lineno)?,
            IrCommand::Conditional(clauses) => {
                for (_, body) in clauses {
                    rewrite_commands(body, callees, lineno)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn rewrite(functions: &mut [IrFunction]) -> Result<(), Error> {
    let callees: BTreeMap<String, (Vec<String>, BTreeMap<String, ParamType>)> = functions
        .iter()
        .map(|f| (f.name.clone(), (f.params.clone(), f.param_types.clone())))
        .collect();

    for function in functions {
        let lineno = function.lineno;
        rewrite_commands(&mut function.entry_actions, &callees, lineno)?;
        for state in &mut function.states {
            for case in &mut state.cases {
                rewrite_commands(&mut case.commands, &callees, lineno)?;
            }
            if let Some(eof) = &mut state.eof_handler {
                rewrite_commands(eof, &callees, lineno)?;
            }
        }
        if let Some(eof) = &mut function.eof_handler {
            rewrite_commands(eof, &callees, lineno)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::model::{IrCase, IrSelector, IrState};

    fn make_function(name: &str, params: Vec<&str>, types: Vec<(&str, ParamType)>, commands: Vec<IrCommand>) -> IrFunction {
        IrFunction {
            name: name.into(),
            return_type: None,
            params: params.into_iter().map(String::from).collect(),
            param_types: types.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
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
    fn byte_param_gets_byte_literal() {
        let foo = make_function("foo", vec!["x"], vec![("x", ParamType::Byte)], vec![]);
        let bar = make_function("bar", vec![], vec![], vec![IrCommand::Call { name: "foo".into(), args: vec![ArgValue::I32("'|'".into())] }]);
        let mut functions = vec![foo, bar];
        rewrite(&mut functions).unwrap();
        let IrCommand::Call { args, .. } = &functions[1].states[0].cases[0].commands[0] else { panic!() };
        assert!(matches!(args[0], ArgValue::Byte(b) if b == b'|'));
    }

    #[test]
    fn param_forwarding_reference_passes_through() {
        let foo = make_function("foo", vec!["x"], vec![("x", ParamType::Bytes)], vec![]);
        let bar = make_function("bar", vec!["y"], vec![("y", ParamType::Bytes)], vec![IrCommand::Call { name: "foo".into(), args: vec![ArgValue::I32(":y".into())] }]);
        let mut functions = vec![foo, bar];
        rewrite(&mut functions).unwrap();
        let IrCommand::Call { args, .. } = &functions[1].states[0].cases[0].commands[0] else { panic!() };
        assert!(matches!(&args[0], ArgValue::I32(s) if s == ":y"));
    }

    #[test]
    fn zero_literal_to_bytes_param_is_empty_sentinel() {
        let foo = make_function("foo", vec!["x"], vec![("x", ParamType::Bytes)], vec![]);
        let bar = make_function("bar", vec![], vec![], vec![IrCommand::Call { name: "foo".into(), args: vec![ArgValue::I32("0".into())] }]);
        let mut functions = vec![foo, bar];
        rewrite(&mut functions).unwrap();
        let IrCommand::Call { args, .. } = &functions[1].states[0].cases[0].commands[0] else { panic!() };
        assert!(matches!(&args[0], ArgValue::Bytes(b) if b.is_empty()));
    }
}
