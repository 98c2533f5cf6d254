//! The four Handlebars helpers spec §4.6 names: `escape_rust_char`,
//! `pascalcase`, `rust_expr`, `transform_call_args`. Each is implemented
//! as a plain function first (so it's directly unit-testable) and
//! registered onto a [`Handlebars`] instance as a thin wrapper.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext as HbRenderContext};

use crate::charclass;

/// Render one byte as a Rust `char` literal, using the named escapes
/// `rustc` itself prefers and falling back to `\xHH` for the rest of the
/// non-printable range.
pub fn escape_rust_char(byte: u8) -> String {
    match byte {
        b'\n' => "'\\n'".to_string(),
        b'\t' => "'\\t'".to_string(),
        b'\r' => "'\\r'".to_string(),
        b'\\' => "'\\\\'".to_string(),
        b'\'' => "'\\''".to_string(),
        0x20..=0x7e => format!("'{}'", byte as char),
        _ => format!("'\\x{:02x}'", byte),
    }
}

/// Render one byte as a Rust byte-literal token (`b'|'`), reusing
/// `escape_rust_char`'s quoting since every byte it can render is ASCII
/// and therefore valid on either side of the `b` prefix.
fn escape_rust_byte_literal(byte: u8) -> String {
    format!("b{}", escape_rust_char(byte))
}

/// `snake_case`/`kebab-case`/`camelCase`/`PascalCase`/`SCREAMING_SNAKE_CASE`
/// → `PascalCase`, the casing the generator uses for type/event
/// identifiers. Splits on `_`, `-`, whitespace, and any lowercase→uppercase
/// boundary, then capitalizes each word's first letter; a word that is
/// entirely uppercase (a `SCREAMING_SNAKE` segment) has its tail
/// lowercased, while a mixed-case word (already part of a `camelCase` or
/// `PascalCase` identifier) keeps its own internal casing untouched — this
/// is what lets an already-`PascalCase` identifier round-trip unchanged.
pub fn pascalcase(input: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in input.chars() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if prev_lower && c.is_uppercase() && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    let mut out = String::new();
    for word in words {
        let mut chars = word.chars();
        let Some(first) = chars.next() else { continue };
        out.extend(first.to_uppercase());
        let rest = chars.as_str();
        if rest.chars().all(|c| !c.is_lowercase()) {
            out.extend(rest.chars().flat_map(|c| c.to_lowercase()));
        } else {
            out.push_str(rest);
        }
    }
    out
}

/// Find the char index one past the `(` matching a balanced parenthesis
/// group starting at `chars[open_index]` (mirrors `lexer::matching_paren`,
/// which solves the same problem for the `.desc` tokenizer's own
/// `/name(args)` tag form).
fn matching_paren(chars: &[char], open_index: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (offset, &c) in chars[open_index..].iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open_index + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrite every `/name(args)` function call into
/// `self.parse_name(args, on_event)`. Recurses into `args` first so a
/// nested call is rewritten before its enclosing one is spliced in. Must
/// run before special-variable expansion: expanding `COL` to `self.col()`
/// first would introduce a fresh matched `()` pair that a naive
/// "first closing paren" scan could mistake for the call's own closing
/// paren (spec §4.6).
fn expand_calls(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] == '/' && chars.get(i + 1).map_or(false, |c| c.is_ascii_alphabetic() || *c == '_') {
            let name_start = i + 1;
            let mut name_end = name_start;
            while chars.get(name_end).map_or(false, |c| c.is_ascii_alphanumeric() || *c == '_') {
                name_end += 1;
            }
            if chars.get(name_end) == Some(&'(') {
                if let Some(close) = matching_paren(&chars, name_end) {
                    let name: String = chars[name_start..name_end].iter().collect();
                    let raw_args: String = chars[name_end + 1..close - 1].iter().collect();
                    let args = expand_calls(&raw_args);
                    if args.trim().is_empty() {
                        out.push_str(&format!("self.parse_{}(on_event)", name));
                    } else {
                        out.push_str(&format!("self.parse_{}({}, on_event)", name, args));
                    }
                    i = close;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Replace every whole-word occurrence of `word` in `input` with
/// `replacement`, leaving the word untouched when it's part of a longer
/// identifier (`COLUMN` must not match `COL`).
fn replace_word(input: &str, word: &str, replacement: &str) -> String {
    let is_word_char = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find(word) {
        let before_ok = rest[..pos].chars().next_back().map_or(true, |c| !is_word_char(c));
        let after = &rest[pos + word.len()..];
        let after_ok = after.chars().next().map_or(true, |c| !is_word_char(c));
        if before_ok && after_ok {
            out.push_str(&rest[..pos]);
            out.push_str(replacement);
            rest = after;
        } else {
            out.push_str(&rest[..pos + word.len()]);
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

/// Expand the three reserved special variables (spec §4.6): `COL` →
/// `self.col()`, `LINE` → `self.line as i32`, `PREV` → `self.prev()`.
fn expand_special_vars(input: &str) -> String {
    let input = replace_word(input, "COL", "self.col()");
    let input = replace_word(&input, "LINE", "self.line as i32");
    replace_word(&input, "PREV", "self.prev()")
}

/// Expand embedded escape tokens `<NAME>` (spec §4.6), one of the
/// reserved single-char names (`P L R LB RB LP RP SQ DQ BS`), into the
/// Rust byte literal for the punctuation byte it stands for (`<P>` →
/// `b'|'`). Any other `<...>` run is left untouched.
fn expand_escape_tokens(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::new();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] == '<' {
            let name_start = i + 1;
            let mut name_end = name_start;
            while chars.get(name_end).map_or(false, |c| c.is_ascii_uppercase()) {
                name_end += 1;
            }
            if chars.get(name_end) == Some(&'>') {
                let name: String = chars[name_start..name_end].iter().collect();
                if let Some(byte) = charclass::reserved_escape_byte(&name) {
                    out.push_str(&escape_rust_byte_literal(byte));
                    i = name_end + 1;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Expand every `:name` parameter reference into the bare local `name`.
fn expand_param_refs(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == ':' && (i == 0 || !input.as_bytes()[i - 1].is_ascii_alphanumeric()) {
            let start = i + 1;
            let mut end = start;
            for (j, nc) in input[start..].char_indices() {
                if nc.is_ascii_alphanumeric() || nc == '_' {
                    end = start + j + nc.len_utf8();
                } else {
                    break;
                }
            }
            out.push_str(&input[start..end]);
            while let Some(&(k, _)) = chars.peek() {
                if k < end {
                    chars.next();
                } else {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Expand a `.desc` expression into the Rust expression a template can
/// splice in verbatim (spec §4.6): function calls (`/name(args)`), then
/// special variables (`COL`/`LINE`/`PREV`), then embedded escape tokens
/// (`<P>`), then parameter references (`:x`), in that fixed order —
/// anything left over (numeric literals, already-Rust boolean/arithmetic
/// expressions copied from the grammar source) passes through unchanged.
pub fn rust_expr(input: &str) -> String {
    let trimmed = input.trim();
    let expanded = expand_calls(trimmed);
    let expanded = expand_special_vars(&expanded);
    let expanded = expand_escape_tokens(&expanded);
    expand_param_refs(&expanded)
}

/// Split a raw call-argument list on top-level commas and expand each
/// argument through [`rust_expr`], producing the comma-joined Rust
/// argument list a `Call` command's template fragment needs.
pub fn transform_call_args(input: &str) -> String {
    charclass::split_args(input).iter().map(|a| rust_expr(a)).collect::<Vec<_>>().join(", ")
}

fn escape_rust_char_helper(h: &Helper, _: &Handlebars, _: &Context, _: &mut HbRenderContext, out: &mut dyn Output) -> HelperResult {
    let byte = h.param(0).and_then(|v| v.value().as_u64()).unwrap_or(0) as u8;
    out.write(&escape_rust_char(byte))?;
    Ok(())
}

fn pascalcase_helper(h: &Helper, _: &Handlebars, _: &Context, _: &mut HbRenderContext, out: &mut dyn Output) -> HelperResult {
    let text = h.param(0).and_then(|v| v.value().as_str().map(str::to_string)).unwrap_or_default();
    out.write(&pascalcase(&text))?;
    Ok(())
}

fn rust_expr_helper(h: &Helper, _: &Handlebars, _: &Context, _: &mut HbRenderContext, out: &mut dyn Output) -> HelperResult {
    let text = h.param(0).and_then(|v| v.value().as_str().map(str::to_string)).unwrap_or_default();
    out.write(&rust_expr(&text))?;
    Ok(())
}

fn transform_call_args_helper(h: &Helper, _: &Handlebars, _: &Context, _: &mut HbRenderContext, out: &mut dyn Output) -> HelperResult {
    let text = h.param(0).and_then(|v| v.value().as_str().map(str::to_string)).unwrap_or_default();
    out.write(&transform_call_args(&text))?;
    Ok(())
}

/// Register all four filters as Handlebars helpers on `registry`.
pub fn register(registry: &mut Handlebars) {
    registry.register_helper("escape_rust_char", Box::new(escape_rust_char_helper));
    registry.register_helper("pascalcase", Box::new(pascalcase_helper));
    registry.register_helper("rust_expr", Box::new(rust_expr_helper));
    registry.register_helper("transform_call_args", Box::new(transform_call_args_helper));
}
