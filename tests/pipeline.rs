//! End-to-end boundary scenarios driving the full pipeline from raw
//! `.desc` source through to a rendered parser (or, where the scenario
//! is about a fatal diagnostic, through to the error itself).

use pretty_assertions::assert_eq;

use descent::generate::GenerateOptions;
use descent::{ast, generate, ir, lexer, validate, Error};

fn build(source: &str) -> ir::IrParser {
    let tokens = lexer::tokenize(source).expect("lex");
    let machine = ast::parse(&tokens).expect("ast");
    ir::build(&machine).expect("ir build")
}

#[test]
fn minimal_self_looping_content_parser() {
    let parser_ir = build(
        "parser[Demo]\n\
         | entry_point[main]\n\
         | type[Text] CONTENT\n\
         | function[main] Text\n\
         | mark\n\
         | state[s]\n\
         | default\n\
         | ->\n\
         | >>\n",
    );
    assert_eq!(parser_ir.name, "Demo");
    assert_eq!(parser_ir.entry_point, "main");
    let main = &parser_ir.functions[0];
    assert!(main.emits_events);
    assert!(main.states[0].is_self_looping);

    let report = validate::validate(&parser_ir);
    assert!(!report.has_errors());
    assert!(report.warnings.is_empty());
}

#[test]
fn empty_input_lexes_to_an_empty_token_stream() {
    let tokens = lexer::tokenize("").unwrap();
    assert!(tokens.is_empty());
}

#[test]
fn unclosed_literal_expects_char_is_inferred_from_the_closing_case() {
    let parser_ir = build(
        "parser[Strings]\n\
         | entry_point[main]\n\
         | type[Str] CONTENT\n\
         | function[main] Str\n\
         | mark\n\
         | state[s]\n\
         | c['\"']\n\
         | term\n\
         | return\n\
         | default\n\
         | ->\n\
         | >>\n",
    );
    let main = &parser_ir.functions[0];
    assert_eq!(main.expects_char, Some(b'"'));
    assert!(main.emits_content_on_close);
}

#[test]
fn scan_inference_injects_a_missing_newline_case() {
    let parser_ir = build(
        "parser[Word]\n\
         | entry_point[main]\n\
         | function[main]\n\
         | state[s]\n\
         | c['a']\n\
         | ->\n\
         | >>\n\
         | c['b']\n\
         | ->\n\
         | >>\n\
         | default\n\
         | ->\n\
         | >>\n",
    );
    let state = &parser_ir.functions[0].states[0];
    assert!(state.newline_injected);
    assert!(state.scan_chars.as_ref().unwrap().contains(&b'\n'));
}

#[test]
fn byte_parameter_type_propagates_through_a_fixpoint_call_chain() {
    let parser_ir = build(
        "parser[Chain]\n\
         | entry_point[main]\n\
         | function[leaf(x)]\n\
         | state[s]\n\
         | c[:x]\n\
         | >>\n\
         | default\n\
         | ->\n\
         | >>\n\
         | function[middle(y)]\n\
         | state[s]\n\
         | /leaf(:y)\n\
         | ->\n\
         | >>\n\
         | default\n\
         | ->\n\
         | >>\n\
         | function[main]\n\
         | state[s]\n\
         | /middle('#')\n\
         | ->\n\
         | >>\n\
         | default\n\
         | ->\n\
         | >>\n",
    );
    let leaf = parser_ir.functions.iter().find(|f| f.name == "leaf").unwrap();
    let middle = parser_ir.functions.iter().find(|f| f.name == "middle").unwrap();
    assert_eq!(leaf.param_types["x"], ir::ParamType::Byte);
    assert_eq!(middle.param_types["y"], ir::ParamType::Byte);
}

#[test]
fn inline_emit_immediately_before_return_suppresses_the_auto_emit() {
    let parser_ir = build(
        "parser[Emit]\n\
         | entry_point[main]\n\
         | type[Tok] CONTENT\n\
         | function[main] Tok\n\
         | state[s]\n\
         | c['\"']\n\
         | emit(Tok)\n\
         | return\n\
         | default\n\
         | ->\n\
         | >>\n",
    );
    let main = &parser_ir.functions[0];
    let case = &main.states[0].cases[0];
    let has_emit_then_suppressed_return = case.commands.windows(2).any(|w| {
        matches!(w[0], ir::IrCommand::InlineEmitBare(_))
            && matches!(&w[1], ir::IrCommand::Return { suppress_auto_emit, .. } if *suppress_auto_emit)
    });
    assert!(has_emit_then_suppressed_return);
}

#[test]
fn undefined_entry_point_is_a_validation_error_not_a_panic() {
    let tokens = lexer::tokenize("parser[Bad]\n| entry_point[missing]\n| function[main]\n| state[s]\n| default\n| ->\n| >>\n").unwrap();
    let machine = ast::parse(&tokens).unwrap();
    let parser_ir = ir::build(&machine).unwrap();
    let report = validate::validate(&parser_ir);
    assert!(report.has_errors());
}

#[test]
fn generate_renders_through_a_fixture_template_directory() {
    let parser_ir = build("parser[Demo]\n| entry_point[main]\n| function[main]\n| state[s]\n| default\n| ->\n| >>\n");
    let options = GenerateOptions::new("rust", "tests/fixtures/templates");
    let rendered = generate::generate(&parser_ir, &options).expect("generate");
    assert!(rendered.contains("pub struct DemoParser"));
    assert!(rendered.contains("fn main_state"));
}

#[test]
fn generate_reports_a_missing_target_as_a_generate_error() {
    let parser_ir = build("parser[Demo]\n| entry_point[main]\n| function[main]\n| state[s]\n| default\n| ->\n| >>\n");
    let options = GenerateOptions::new("nonexistent", "tests/fixtures/templates");
    let err = generate::generate(&parser_ir, &options).unwrap_err();
    assert!(matches!(err, Error::Generate(_)));
}
