//! Recursive-descent AST Parser (spec §4.3). Builds the structural tree
//! from the flat [`Token`] stream: top-level productions `parser`,
//! `entry_point`, `type`, `function`, `keywords`; inside a function,
//! states, an EOF handler, a function-level guard, or entry actions;
//! inside a state, an ordered sequence of cases.

use crate::error::AstParseError;
use crate::token::Token;

use super::model::*;

const PREDEFINED_CLASS_NAMES: &[&str] = &[
    "letter",
    "digit",
    "hex_digit",
    "label_cont",
    "ws",
    "nl",
    "xid_start",
    "xid_cont",
    "xlbl_start",
    "xlbl_cont",
];

fn is_top_level_tag(tag: &str) -> bool {
    matches!(tag, "parser" | "entry_point" | "entry-point" | "type" | "function" | "keywords")
}

fn is_explicit_selector_tag(tag: &str) -> bool {
    tag == "c" || tag == "default" || tag == "if" || tag.starts_with(':') || PREDEFINED_CLASS_NAMES.contains(&tag)
}

fn strip_leading_colon(s: &str) -> String {
    s.strip_prefix(':').unwrap_or(s).to_string()
}

fn strip_call_form(tag: &str, prefix: &str) -> Option<String> {
    if tag.starts_with(prefix) && tag.ends_with(')') && tag.len() >= prefix.len() + 1 {
        Some(tag[prefix.len()..tag.len() - 1].to_string())
    } else {
        None
    }
}

fn strip_prefix_ci<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

/// Parse the complete token stream into a [`Machine`].
pub fn parse(tokens: &[Token]) -> Result<Machine, AstParseError> {
    let mut name = None;
    let mut entry_point = None;
    let mut types = Vec::new();
    let mut functions = Vec::new();
    let mut keywords = Vec::new();

    let mut pos = 0;
    while pos < tokens.len() {
        let token = &tokens[pos];
        match token.tag.as_str() {
            "parser" => {
                name = Some(token.id.clone().ok_or_else(|| {
                    AstParseError::new(token.lineno, "'parser' directive requires a name in [...]")
                })?);
                pos += 1;
            }
            "entry_point" | "entry-point" => {
                entry_point = Some(token.id.clone().ok_or_else(|| {
                    AstParseError::new(token.lineno, "'entry_point' directive requires a function name in [...]")
                })?);
                pos += 1;
            }
            "type" => {
                let type_name = token.id.clone().ok_or_else(|| {
                    AstParseError::new(token.lineno, "'type' directive requires a name in [...]")
                })?;
                let kind = parse_type_kind(&token.rest);
                types.push(TypeDecl { name: type_name, kind, lineno: token.lineno });
                pos += 1;
            }
            "function" => {
                let (function, next_pos) = parse_function(tokens, pos)?;
                functions.push(function);
                pos = next_pos;
            }
            "keywords" => {
                let (block, next_pos) = parse_keywords_block(tokens, pos)?;
                keywords.push(block);
                pos = next_pos;
            }
            other => {
                return Err(AstParseError::new(token.lineno, format!("unknown top-level directive '{}'", other)));
            }
        }
    }

    let name = name.ok_or_else(|| AstParseError::new(1, "missing 'parser[Name]' directive"))?;
    let entry_point = entry_point.ok_or_else(|| AstParseError::new(1, "missing 'entry_point[func]' directive"))?;

    Ok(Machine { name, entry_point, types, functions, keywords })
}

/// Parse a `type[Name]<kind>` directive's kind text. Never fails: an
/// unrecognised kind is carried through as [`TypeKind::Unknown`] rather
/// than rejected here, since spec §4.5 assigns "unknown type kind" to the
/// Validator, after the full AST (and IR) have been built.
fn parse_type_kind(rest: &str) -> TypeKind {
    let trimmed = rest.trim();
    match trimmed.to_ascii_uppercase().as_str() {
        "BRACKET" => TypeKind::Bracket,
        "CONTENT" => TypeKind::Content,
        "INTERNAL" => TypeKind::Internal,
        _ => TypeKind::Unknown(trimmed.to_string()),
    }
}

fn parse_function_header(id: &str) -> (String, Vec<String>) {
    if let Some(paren) = id.find('(') {
        if id.ends_with(')') {
            let name = id[..paren].trim().to_string();
            let params = id[paren + 1..id.len() - 1]
                .split(',')
                .map(|p| p.trim().trim_start_matches(':').to_string())
                .filter(|p| !p.is_empty())
                .collect();
            return (name, params);
        }
    }
    (id.trim().to_string(), Vec::new())
}

fn parse_function(tokens: &[Token], start: usize) -> Result<(Function, usize), AstParseError> {
    let header = &tokens[start];
    let id = header.id.clone().ok_or_else(|| {
        AstParseError::new(header.lineno, "'function' directive requires a name in [...]")
    })?;
    let (name, params) = parse_function_header(&id);
    let return_type = {
        let r = header.rest.trim();
        if r.is_empty() { None } else { Some(r.to_string()) }
    };
    let lineno = header.lineno;

    let mut states: Vec<State> = Vec::new();
    let mut entry_actions = Vec::new();
    let mut eof_handler = None;
    let mut current_state: Option<State> = None;
    let mut pos = start + 1;

    while pos < tokens.len() && !is_top_level_tag(&tokens[pos].tag) {
        let token = &tokens[pos];
        if token.tag == "state" {
            if let Some(state) = current_state.take() {
                states.push(state);
            }
            let state_name = token.id.as_deref().map(strip_leading_colon);
            let mut state = State { name: state_name, cases: Vec::new(), eof_handler: None, lineno: token.lineno };
            pos += 1;
            pos = parse_cases_into(tokens, pos, &mut state)?;
            current_state = Some(state);
        } else if token.tag == "eof" {
            pos += 1;
            let (commands, next_pos) = parse_command_block(tokens, pos)?;
            pos = next_pos;
            match current_state.as_mut() {
                Some(state) => state.eof_handler = Some(commands),
                None => eof_handler = Some(commands),
            }
        } else if token.tag == "if" && current_state.is_none() {
            let cond = token.id.clone().unwrap_or_default();
            pos += 1;
            let (body, next_pos) = parse_command_block(tokens, pos)?;
            pos = next_pos;
            entry_actions.push(Command::Conditional { clauses: vec![(cond, body)] });
        } else if current_state.is_none() {
            entry_actions.push(parse_command_token(token)?);
            pos += 1;
        } else {
            return Err(AstParseError::new(token.lineno, format!("unexpected token '{}' after state body", token.tag)));
        }
    }
    if let Some(state) = current_state.take() {
        states.push(state);
    }

    Ok((
        Function { name, return_type, params, states, entry_actions, eof_handler, lineno },
        pos,
    ))
}

/// Parse the ordered sequence of cases belonging to one state, stopping
/// (without consuming) at the next `state`/`eof`/top-level token.
fn parse_cases_into(tokens: &[Token], mut pos: usize, state: &mut State) -> Result<usize, AstParseError> {
    while pos < tokens.len() {
        let token = &tokens[pos];
        if is_top_level_tag(&token.tag) || token.tag == "state" || token.tag == "eof" {
            break;
        }

        let (selector, starter_is_bare_action) = if is_explicit_selector_tag(&token.tag) {
            (build_selector(token)?, false)
        } else if token.is_command_like() {
            (Selector::None, true)
        } else {
            return Err(AstParseError::new(
                token.lineno,
                format!("expected a case selector or command, found '{}'", token.tag),
            ));
        };
        let case_lineno = token.lineno;
        pos += 1;

        let mut substate = None;
        if pos < tokens.len() && tokens[pos].tag.starts_with('.') && tokens[pos].tag.len() > 1 {
            substate = Some(tokens[pos].tag[1..].to_string());
            pos += 1;
        }

        let mut commands = Vec::new();
        if starter_is_bare_action {
            commands.push(parse_command_token(token)?);
        }

        loop {
            if pos >= tokens.len() {
                break;
            }
            let next = &tokens[pos];
            if is_top_level_tag(&next.tag) || next.tag == "state" || next.tag == "eof" || is_explicit_selector_tag(&next.tag) {
                break;
            }
            let command = parse_command_token(next)?;
            let just_returned = matches!(command, Command::Return { .. });
            commands.push(command);
            pos += 1;

            if just_returned && matches!(selector, Selector::Conditional(_)) {
                if let Some(following) = tokens.get(pos) {
                    if following.is_command_like() {
                        break;
                    }
                }
            }
        }

        state.cases.push(Case { selector, substate, commands, lineno: case_lineno });
    }
    Ok(pos)
}

fn build_selector(token: &Token) -> Result<Selector, AstParseError> {
    match token.tag.as_str() {
        "c" => Ok(Selector::Chars(token.id.clone().unwrap_or_default())),
        "default" => Ok(Selector::Default),
        "if" => Ok(Selector::Conditional(token.id.clone().unwrap_or_default())),
        tag if tag.starts_with(':') => Ok(Selector::ParamRef(strip_leading_colon(tag))),
        tag if PREDEFINED_CLASS_NAMES.contains(&tag) => Ok(Selector::SpecialClass(tag.to_string())),
        other => Err(AstParseError::new(token.lineno, format!("'{}' is not a valid case selector", other))),
    }
}

/// Parse a flat command sequence (EOF handler or function-level guard
/// body), stopping at the next structural keyword.
fn parse_command_block(tokens: &[Token], mut pos: usize) -> Result<(Vec<Command>, usize), AstParseError> {
    let mut commands = Vec::new();
    while pos < tokens.len() {
        let token = &tokens[pos];
        if is_top_level_tag(&token.tag) || token.tag == "state" || token.tag == "eof" || token.tag == "if" {
            break;
        }
        commands.push(parse_command_token(token)?);
        pos += 1;
    }
    Ok((commands, pos))
}

fn build_inline_emit(type_name: String, inner: String) -> Command {
    let trimmed = inner.trim();
    if trimmed == "USE_MARK" {
        Command::InlineEmit { type_name, kind: InlineEmitKind::Mark }
    } else if trimmed.is_empty() {
        Command::InlineEmit { type_name, kind: InlineEmitKind::Bare }
    } else {
        Command::InlineEmit { type_name, kind: InlineEmitKind::Literal(trimmed.to_string()) }
    }
}

fn parse_call_tag(tag: &str, lineno: usize) -> Result<Command, AstParseError> {
    if let Some(paren) = tag.find('(') {
        if !tag.ends_with(')') {
            return Err(AstParseError::new(lineno, format!("malformed call '{}'", tag)));
        }
        let name = tag[1..paren].to_string();
        let args = tag[paren + 1..tag.len() - 1].to_string();
        Ok(Command::Call { name, args_raw: if args.trim().is_empty() { None } else { Some(args) } })
    } else {
        Ok(Command::Call { name: tag[1..].to_string(), args_raw: None })
    }
}

/// Classify one non-selector token as a [`Command`] (spec §4.3 "Commands").
fn parse_command_token(token: &Token) -> Result<Command, AstParseError> {
    let tag = token.tag.as_str();

    if tag.is_empty() {
        let combined = match &token.id {
            Some(id) => format!("[{}]{}", id, token.rest),
            None => token.rest.clone(),
        };
        return parse_inline_command_text(&combined, token.lineno);
    }

    match tag {
        "->" => {
            if let Some(id) = &token.id {
                Ok(Command::AdvanceTo { raw: id.clone() })
            } else {
                Ok(Command::Advance)
            }
        }
        ">>" => {
            let target = token.rest.trim();
            Ok(Command::Transition { target: if target.is_empty() { None } else { Some(target.to_string()) } })
        }
        "return" => {
            let raw = token.id.clone().or_else(|| {
                let r = token.rest.trim();
                if r.is_empty() { None } else { Some(r.to_string()) }
            });
            Ok(Command::Return { raw })
        }
        "mark" => Ok(Command::Mark),
        "term" => {
            let r = token.rest.trim();
            Ok(Command::Term { offset_raw: if r.is_empty() { None } else { Some(r.to_string()) } })
        }
        "err" => {
            let code = token.id.clone().or_else(|| {
                let r = token.rest.trim();
                if r.is_empty() { None } else { Some(r.to_string()) }
            });
            Ok(Command::Error { code_raw: code })
        }
        _ if tag.starts_with('/') => parse_call_tag(tag, token.lineno),
        _ if strip_call_form(tag, "emit(").is_some() => {
            Ok(build_inline_emit(IMPLICIT_EMIT_TYPE.to_string(), strip_call_form(tag, "emit(").unwrap()))
        }
        _ if strip_call_form(tag, "TERM(").is_some() => {
            let inner = strip_call_form(tag, "TERM(").unwrap();
            Ok(Command::Term { offset_raw: if inner.is_empty() { None } else { Some(inner) } })
        }
        _ if strip_call_form(tag, "PREPEND(").is_some() => {
            Ok(Command::Prepend { raw: strip_call_form(tag, "PREPEND(").unwrap() })
        }
        _ if strip_call_form(tag, "KEYWORDS(").is_some() => {
            Ok(Command::KeywordsLookup { name: strip_call_form(tag, "KEYWORDS(").unwrap() })
        }
        _ if tag.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false) => {
            if let Some(paren) = tag.find('(') {
                if tag.ends_with(')') {
                    let type_name = tag[..paren].to_string();
                    let inner = tag[paren + 1..tag.len() - 1].to_string();
                    return Ok(build_inline_emit(type_name, inner));
                }
            }
            Ok(Command::InlineEmit { type_name: tag.to_string(), kind: InlineEmitKind::Bare })
        }
        _ => {
            let combined = format!("{} {}", tag, token.rest).trim().to_string();
            parse_inline_command_text(&combined, token.lineno)
        }
    }
}

/// Parse free text as an inline command: assignment, bare `MARK`/`TERM`,
/// or `PREPEND(...)`/`KEYWORDS(...)` (spec §4.3 bullet 1 and bullet 3).
fn parse_inline_command_text(text: &str, lineno: usize) -> Result<Command, AstParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Command::Noop);
    }
    if trimmed.eq_ignore_ascii_case("mark") {
        return Ok(Command::Mark);
    }
    if let Some(rest) = strip_prefix_ci(trimmed, "term") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let r = rest.trim();
            return Ok(Command::Term { offset_raw: if r.is_empty() { None } else { Some(r.to_string()) } });
        }
    }
    if let Some(inner) = strip_call_form(trimmed, "PREPEND(") {
        return Ok(Command::Prepend { raw: inner });
    }
    if let Some(inner) = strip_call_form(trimmed, "KEYWORDS(") {
        return Ok(Command::KeywordsLookup { name: inner });
    }
    if let Some(op_pos) = trimmed.find("+=") {
        let var = trimmed[..op_pos].trim();
        if is_identifier(var) {
            return Ok(Command::AddAssign { var: var.to_string(), expr_raw: trimmed[op_pos + 2..].trim().to_string() });
        }
    }
    if let Some(op_pos) = trimmed.find("-=") {
        let var = trimmed[..op_pos].trim();
        if is_identifier(var) {
            return Ok(Command::SubAssign { var: var.to_string(), expr_raw: trimmed[op_pos + 2..].trim().to_string() });
        }
    }
    if let Some(op_pos) = trimmed.find('=') {
        let before = &trimmed[..op_pos];
        let after = &trimmed[op_pos + 1..];
        let is_comparison = after.starts_with('=')
            || before.ends_with('!')
            || before.ends_with('<')
            || before.ends_with('>');
        let var = before.trim();
        if !is_comparison && is_identifier(var) {
            return Ok(Command::Assign { var: var.to_string(), expr_raw: after.trim().to_string() });
        }
    }
    Err(AstParseError::new(lineno, format!("unrecognised command form '{}'", trimmed)))
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_keywords_block(tokens: &[Token], start: usize) -> Result<(KeywordBlock, usize), AstParseError> {
    let header = &tokens[start];
    let name = header.id.clone().ok_or_else(|| {
        AstParseError::new(header.lineno, "'keywords' directive requires a name in [...]")
    })?;
    let lineno = header.lineno;
    let mut pos = start + 1;
    let mut fallback_func = None;
    let mut fallback_args = None;
    let mut mappings = Vec::new();

    while pos < tokens.len() && !is_top_level_tag(&tokens[pos].tag) {
        let token = &tokens[pos];
        if token.tag == "fallback" {
            fallback_func = token.id.clone();
            let r = token.rest.trim();
            fallback_args = if r.is_empty() { None } else { Some(r.to_string()) };
        } else {
            let keyword_raw = token.tag.clone();
            let mut event_type = token.rest.trim();
            for prefix in ["->", ">>"] {
                if let Some(stripped) = event_type.strip_prefix(prefix) {
                    event_type = stripped.trim();
                }
            }
            if !keyword_raw.is_empty() && !event_type.is_empty() {
                mappings.push((keyword_raw, event_type.to_string()));
            }
        }
        pos += 1;
    }

    Ok((KeywordBlock { name, fallback_func, fallback_args, mappings, lineno }, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_source(src: &str) -> Machine {
        let tokens = tokenize(src).expect("lex");
        parse(&tokens).expect("parse")
    }

    #[test]
    fn minimal_machine_header() {
        let machine = parse_source("parser[Demo] | entry_point[main] | type[Text] CONTENT | function[main] | state[s] | default -> >> |");
        assert_eq!(machine.name, "Demo");
        assert_eq!(machine.entry_point, "main");
        assert_eq!(machine.types.len(), 1);
        assert_eq!(machine.functions.len(), 1);
    }

    #[test]
    fn bare_action_state_is_self_looping() {
        let machine = parse_source("parser[D] | entry_point[main] | function[main] | state[s] | -> | >> |");
        let state = &machine.functions[0].states[0];
        assert_eq!(state.cases.len(), 1);
        assert!(matches!(state.cases[0].selector, Selector::None));
        assert_eq!(state.cases[0].commands.len(), 3);
    }

    #[test]
    fn explicit_chars_case_with_transition() {
        let machine = parse_source("parser[D] | entry_point[main] | function[main] | state[s] | c['|'] >> pipe | default -> >> |");
        let state = &machine.functions[0].states[0];
        assert_eq!(state.cases.len(), 2);
        assert!(matches!(state.cases[0].selector, Selector::Chars(_)));
        assert!(matches!(state.cases[1].selector, Selector::Default));
    }

    #[test]
    fn inline_emit_with_use_mark() {
        let machine = parse_source("parser[D] | entry_point[main] | function[main] Integer | state[s] | default Float(USE_MARK) | return |");
        let case = &machine.functions[0].states[0].cases[0];
        assert!(matches!(case.commands[0], Command::InlineEmit { ref type_name, kind: InlineEmitKind::Mark } if type_name == "Float"));
        assert!(matches!(case.commands[1], Command::Return { .. }));
    }

    #[test]
    fn return_in_if_case_starts_new_bare_action_case() {
        let machine = parse_source(
            "parser[D] | entry_point[main] | function[main] | state[s] | if[p == '|'] return | mark | >> next |",
        );
        let state = &machine.functions[0].states[0];
        assert_eq!(state.cases.len(), 2);
        assert!(matches!(state.cases[0].selector, Selector::Conditional(_)));
        assert_eq!(state.cases[0].commands.len(), 1);
        assert!(matches!(state.cases[1].selector, Selector::None));
    }

    #[test]
    fn eof_handler_attaches_to_state() {
        let machine = parse_source("parser[D] | entry_point[main] | function[main] | state[s] | default -> >> | eof | err[UnclosedThing] |");
        let state = &machine.functions[0].states[0];
        assert!(state.eof_handler.is_some());
        assert_eq!(state.eof_handler.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn entry_action_assignment() {
        let machine = parse_source("parser[D] | entry_point[main] | function[main] | depth = 1 | state[s] | default -> >> |");
        assert!(matches!(machine.functions[0].entry_actions[0], Command::Assign { .. }));
    }
}
