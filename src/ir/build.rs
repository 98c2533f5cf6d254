//! The IR Builder's top-level driver (spec §4.4): one AST-to-IR traversal
//! (type resolution, command/state lowering, SCAN inference) followed by
//! the cross-function post-passes in the order spec §4.4 lists them
//! (parameter types, locals, emit dedup fix-up, custom error codes,
//! call-argument rewriting, prepend-value collection).

use crate::ast::Machine;
use crate::error::Error;

use super::call_rewrite;
use super::commands::{lower_commands, lower_state};
use super::emit_fixup;
use super::eof;
use super::error_codes;
use super::locals;
use super::model::{IrFunction, IrParser, KeywordTable};
use super::params::{self, FunctionShape};
use super::prepend;
use super::types;

fn lower_function_shell(ast_fn: &crate::ast::Function, type_infos: &[super::model::TypeInfo]) -> Result<IrFunction, Error> {
    let states = ast_fn
        .states
        .iter()
        .map(|s| lower_state(s, &ast_fn.params))
        .collect::<Result<Vec<_>, _>>()?;
    let entry_actions = lower_commands(&ast_fn.entry_actions, ast_fn.lineno, &ast_fn.params)?;
    let eof_handler = ast_fn
        .eof_handler
        .as_ref()
        .map(|cmds| lower_commands(cmds, ast_fn.lineno, &ast_fn.params))
        .transpose()?;

    let mut states = states;
    for state in &mut states {
        super::scan::infer(state);
    }

    Ok(IrFunction {
        name: ast_fn.name.clone(),
        return_type: ast_fn.return_type.clone(),
        params: ast_fn.params.clone(),
        param_types: Default::default(),
        locals: Default::default(),
        local_init_values: Default::default(),
        states,
        entry_actions,
        eof_handler,
        expects_char: None,
        emits_content_on_close: false,
        emits_events: types::function_emits_events(&ast_fn.return_type, type_infos),
        prepend_values: Default::default(),
        lineno: ast_fn.lineno,
    })
}

fn all_command_lists(f: &IrFunction) -> Vec<&[super::model::IrCommand]> {
    let mut lists: Vec<&[super::model::IrCommand]> = vec![&f.entry_actions];
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

/// Build the complete [`IrParser`] from a parsed [`Machine`] (spec
/// §4.4.1–§4.4.11 in order).
pub fn build(machine: &Machine) -> Result<IrParser, Error> {
    let type_infos = types::resolve(machine)?;

    let mut functions: Vec<IrFunction> = machine
        .functions
        .iter()
        .map(|f| lower_function_shell(f, &type_infos))
        .collect::<Result<_, _>>()?;

    let shapes: Vec<FunctionShape<'_>> = functions
        .iter()
        .map(|f| FunctionShape { name: &f.name, params: &f.params, states: &f.states, entry_actions: &f.entry_actions, eof_handler: &f.eof_handler })
        .collect();
    let param_types = params::infer(&shapes);

    for function in &mut functions {
        function.param_types = param_types.get(&function.name).cloned().unwrap_or_default();

        let eof_result = eof::infer(&function.states);
        function.expects_char = eof_result.expects_char;
        function.emits_content_on_close = eof_result.emits_content_on_close;

        function.local_init_values = locals::hoist_init_values(&function.entry_actions);
    }

    for function in &mut functions {
        let lists = all_command_lists(function);
        function.locals = locals::infer_from_lists(lists);
    }

    for function in &mut functions {
        emit_fixup::apply(&mut function.entry_actions);
        for state in &mut function.states {
            for case in &mut state.cases {
                emit_fixup::apply(&mut case.commands);
            }
            if let Some(eof) = &mut state.eof_handler {
                emit_fixup::apply(eof);
            }
        }
        if let Some(eof) = &mut function.eof_handler {
            emit_fixup::apply(eof);
        }
    }

    let custom_error_codes = {
        let all_lists: Vec<&[super::model::IrCommand]> = functions.iter().flat_map(all_command_lists).collect();
        error_codes::collect_from_lists(all_lists)
    };

    call_rewrite::rewrite(&mut functions)?;
    prepend::compute(&mut functions);

    let keywords = machine
        .keywords
        .iter()
        .map(|k| KeywordTable {
            name: k.name.clone(),
            fallback_func: k.fallback_func.clone(),
            fallback_args: k.fallback_args.clone(),
            mappings: k.mappings.clone(),
            lineno: k.lineno,
        })
        .collect();

    Ok(IrParser {
        name: machine.name.clone(),
        entry_point: machine.entry_point.clone(),
        types: type_infos,
        functions,
        keywords,
        custom_error_codes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parser::parse as parse_ast;
    use crate::lexer::tokenize;

    fn build_source(src: &str) -> IrParser {
        let tokens = tokenize(src).expect("lex");
        let machine = parse_ast(&tokens).expect("ast");
        build(&machine).expect("ir build")
    }

    #[test]
    fn minimal_self_looping_content_function() {
        let ir = build_source(
            "parser[Demo] | entry_point[main] | type[Text] CONTENT | function[main] Text | mark | state[s] | default | -> | >>",
        );
        assert_eq!(ir.name, "Demo");
        let main = ir.functions.iter().find(|f| f.name == "main").unwrap();
        assert!(main.emits_events);
        let state = &main.states[0];
        assert!(state.is_self_looping);
    }

    #[test]
    fn expects_char_and_content_on_close_inferred() {
        let ir = build_source(
            "parser[D] | entry_point[main] | type[Str] CONTENT | function[main] Str | mark | state[s] | c['\"'] | term | return | default | -> | >>",
        );
        let main = &ir.functions[0];
        assert_eq!(main.expects_char, Some(b'"'));
        assert!(main.emits_content_on_close);
    }

    #[test]
    fn byte_param_propagates_through_call() {
        let ir = build_source(
            "parser[D] | entry_point[main] | function[foo(x)] | state[s] | c[:x] | >> | default | -> | >> | function[main] | state[s] | /foo(:y) | -> | >> | default | -> | >>",
        );
        let foo = ir.functions.iter().find(|f| f.name == "foo").unwrap();
        assert_eq!(foo.param_types["x"], crate::ir::model::ParamType::Byte);
    }

    #[test]
    fn custom_error_codes_collected_and_sorted() {
        let ir = build_source("parser[D] | entry_point[main] | function[main] | state[s] | default | -> | >> | eof | err[BetaCode]");
        assert_eq!(ir.custom_error_codes, vec!["BetaCode".to_string()]);
    }
}
