//! Tokeniser for the pipe-delimited `.desc` specification format (spec §4.1).
//!
//! The lexer runs in three passes: strip comments, split on top-level
//! `|`, then split each part into `(tag, id, rest)`. Each pass is a pure
//! function so the boundary behaviour (line preservation, idempotence)
//! can be tested independently of the rest of the pipeline.

use crate::error::LexicalError;
use crate::token::Token;

/// Strip `;` line comments, honouring single/double quotes, `[...]`, and
/// `(...)`. Line structure is preserved: the stripped text has exactly
/// the same number of newlines as the input, in the same places.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_single = false;
    let mut in_double = false;
    let mut bracket_depth: i32 = 0;
    let mut paren_depth: i32 = 0;
    let mut escape = false;

    while let Some(c) = chars.next() {
        if escape {
            out.push(c);
            escape = false;
            continue;
        }
        match c {
            '\\' if in_single || in_double => {
                out.push(c);
                escape = true;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                out.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                out.push(c);
            }
            '[' if !in_single && !in_double => {
                bracket_depth += 1;
                out.push(c);
            }
            ']' if !in_single && !in_double => {
                bracket_depth -= 1;
                out.push(c);
            }
            '(' if !in_single && !in_double => {
                paren_depth += 1;
                out.push(c);
            }
            ')' if !in_single && !in_double => {
                paren_depth -= 1;
                out.push(c);
            }
            ';' if !in_single && !in_double && bracket_depth <= 0 && paren_depth <= 0 => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

struct RawSegment {
    text: String,
    lineno: usize,
}

/// Split comment-stripped text on top-level `|`, never splitting on a
/// `|` nested inside `[...]` or a quoted literal.
fn split_pipes(input: &str) -> Result<Vec<RawSegment>, LexicalError> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_start_line = 1;
    let mut started_segment = false;
    let mut line = 1usize;

    let mut in_single = false;
    let mut in_double = false;
    let mut bracket_depth: i32 = 0;
    let mut escape = false;
    let mut quote_open_line: Option<usize> = None;

    for c in input.chars() {
        if !started_segment && !c.is_whitespace() {
            started_segment = true;
            current_start_line = line;
        }
        if c == '\n' {
            line += 1;
        }
        if escape {
            current.push(c);
            escape = false;
            continue;
        }
        match c {
            '\\' if in_single || in_double => {
                current.push(c);
                escape = true;
            }
            '\'' if !in_double => {
                in_single = !in_single;
                quote_open_line = if in_single { Some(line) } else { None };
                current.push(c);
            }
            '"' if !in_single => {
                in_double = !in_double;
                quote_open_line = if in_double { Some(line) } else { None };
                current.push(c);
            }
            '[' if !in_single && !in_double => {
                bracket_depth += 1;
                current.push(c);
            }
            ']' if !in_single && !in_double => {
                bracket_depth -= 1;
                current.push(c);
            }
            '|' if !in_single && !in_double && bracket_depth <= 0 => {
                segments.push(RawSegment {
                    text: std::mem::take(&mut current),
                    lineno: current_start_line,
                });
                started_segment = false;
            }
            _ => current.push(c),
        }
    }

    if in_single || in_double {
        return Err(LexicalError::new(
            quote_open_line.unwrap_or(line),
            "unterminated quote in specification",
        ));
    }

    segments.push(RawSegment {
        text: current,
        lineno: if started_segment { current_start_line } else { line },
    });
    Ok(segments)
}

fn is_screaming_snake_case(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit())
        && tag.chars().any(|c| c.is_ascii_uppercase())
}

/// Find the char index one past the `(` matching a balanced parenthesis
/// group starting at `chars[open_index]`, or `None` if unbalanced.
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

/// Extract the leading tag from a trimmed segment, returning the tag and
/// the unconsumed remainder. Handles the call-like `/name(args)` and
/// `emit(...)`/`TERM(n)`-style forms (whole parenthesised tail captured,
/// case preserved), falling back to "run to the first space or `[`" with
/// SCREAMING_SNAKE_CASE lowering and PascalCase preservation.
fn extract_tag(trimmed: &str) -> (String, String) {
    let chars: Vec<char> = trimmed.chars().collect();

    if let Some(paren_at) = chars.iter().position(|&c| c == '(') {
        let head: String = chars[..paren_at].iter().collect();
        let head_is_call_form = !head.is_empty() && !head.contains(' ') && !head.contains('[');
        if head_is_call_form {
            if let Some(close) = matching_paren(&chars, paren_at) {
                let tag: String = chars[..close].iter().collect();
                let rest: String = chars[close..].iter().collect();
                return (tag, rest);
            }
        }
    }

    let end = trimmed.find(|c: char| c == ' ' || c == '[').unwrap_or(trimmed.len());
    let tag = &trimmed[..end];
    let rest = trimmed[end..].to_string();
    let tag = if is_screaming_snake_case(tag) {
        tag.to_lowercase()
    } else {
        tag.to_string()
    };
    (tag, rest)
}

/// Extract the content of a leading `[...]` bracket, respecting
/// single-quote balancing (`c[']']` extracts the quoted `]`). Returns
/// `None` if the remainder does not start with `[`.
fn extract_bracket(remainder: &str) -> Option<(String, String)> {
    let chars: Vec<char> = remainder.chars().collect();
    if chars.first() != Some(&'[') {
        return None;
    }

    let mut id = String::new();
    let mut i = 1usize;
    let mut depth = 1i32;
    let mut in_single = false;
    let mut escape = false;

    while i < chars.len() {
        let c = chars[i];
        if escape {
            id.push(c);
            escape = false;
            i += 1;
            continue;
        }
        match c {
            '\\' if in_single => {
                id.push(c);
                escape = true;
            }
            '\'' => {
                in_single = !in_single;
                id.push(c);
            }
            '[' if !in_single => {
                depth += 1;
                id.push(c);
            }
            ']' if !in_single => {
                depth -= 1;
                if depth == 0 {
                    i += 1;
                    break;
                }
                id.push(c);
            }
            _ => id.push(c),
        }
        i += 1;
    }

    let rest: String = chars[i.min(chars.len())..].iter().collect();
    Some((id, rest))
}

fn parse_part(segment: RawSegment) -> Option<Token> {
    let trimmed = segment.text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (tag, after_tag) = extract_tag(trimmed);
    let (id, rest) = match extract_bracket(&after_tag) {
        Some((id, rest)) => (Some(id), rest),
        None => (None, after_tag),
    };

    Some(Token::new(tag, id, rest.trim().to_string(), segment.lineno))
}

/// Tokenise a complete `.desc` source buffer.
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexicalError> {
    let stripped = strip_comments(source);
    let segments = split_pipes(&stripped)?;
    Ok(segments.into_iter().filter_map(parse_part).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_comments_is_idempotent_and_preserves_lines() {
        let src = "a | b ; comment\nc | d\n";
        let once = strip_comments(src);
        let twice = strip_comments(&once);
        assert_eq!(once, twice);
        assert_eq!(src.matches('\n').count(), once.matches('\n').count());
        assert!(!once.contains("comment"));
    }

    #[test]
    fn semicolon_inside_brackets_is_not_a_comment() {
        let src = "c[';' 'a'] | more";
        let stripped = strip_comments(src);
        assert_eq!(stripped, src);
    }

    #[test]
    fn semicolon_inside_quotes_is_not_a_comment() {
        let src = "c['; not a comment']";
        let stripped = strip_comments(src);
        assert_eq!(stripped, src);
    }

    #[test]
    fn pipes_inside_brackets_do_not_split() {
        let segments = split_pipes("c[<'|' ','>] | ->").unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text.trim(), "c[<'|' ','>]");
    }

    #[test]
    fn unterminated_quote_is_a_lexical_error() {
        let err = split_pipes("c['a").unwrap_err();
        assert_eq!(err.lineno, 1);
    }

    #[test]
    fn tag_id_rest_split_for_bracket_form() {
        let tokens = tokenize("state[my_state] extra text").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].tag, "state");
        assert_eq!(tokens[0].id.as_deref(), Some("my_state"));
        assert_eq!(tokens[0].rest, "extra text");
    }

    #[test]
    fn quoted_close_bracket_is_extracted_literally() {
        let tokens = tokenize("c[']']").unwrap();
        assert_eq!(tokens[0].tag, "c");
        assert_eq!(tokens[0].id.as_deref(), Some("']'"));
    }

    #[test]
    fn screaming_snake_case_tag_is_lowered() {
        let tokens = tokenize("LETTER >> next").unwrap();
        assert_eq!(tokens[0].tag, "letter");
    }

    #[test]
    fn pascal_case_tag_is_preserved() {
        let tokens = tokenize("Float(USE_MARK)").unwrap();
        assert_eq!(tokens[0].tag, "Float(USE_MARK)");
    }

    #[test]
    fn call_form_preserves_case_inside_parens() {
        let tokens = tokenize("/parseBody(COL, :x)").unwrap();
        assert_eq!(tokens[0].tag, "/parseBody(COL, :x)");
    }

    #[test]
    fn term_with_explicit_arg_preserves_case() {
        let tokens = tokenize("TERM(-1)").unwrap();
        assert_eq!(tokens[0].tag, "TERM(-1)");
    }

    #[test]
    fn empty_parts_are_dropped() {
        let tokens = tokenize("a[1] || b[2]").unwrap();
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn line_numbers_track_multiline_source() {
        let tokens = tokenize("a[1]\n| b[2]\n\n| c[3]").unwrap();
        assert_eq!(tokens[0].lineno, 1);
        assert_eq!(tokens[1].lineno, 2);
        assert_eq!(tokens[2].lineno, 4);
    }
}
