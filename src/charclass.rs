//! The character/string/class literal sub-parser shared by every site that
//! needs byte content: `c[...]`, `->[...]`, call-argument transformation,
//! `PREPEND`, and inline emits (spec §4.2).
//!
//! Every site that needs byte content routes through [`parse`] rather than
//! rolling its own escape handling; that sharing is the entire point of
//! this module existing.

use std::collections::BTreeSet;

use crate::error::{Error, LexicalError, ValidationError};

/// The normalised result of parsing a character/string/class literal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassResult {
    pub chars: BTreeSet<u8>,
    pub special_class: Option<String>,
    pub param_ref: Option<String>,
    /// Original byte order, when the source was a single literal (used for
    /// `PREPEND` and `advance_to`, which care about sequence, not just set
    /// membership).
    pub bytes: Vec<u8>,
}

impl ClassResult {
    fn literal(bytes: Vec<u8>) -> Self {
        let chars = bytes.iter().copied().collect();
        Self {
            chars,
            bytes,
            ..Default::default()
        }
    }

    fn param(name: String) -> Self {
        Self {
            param_ref: Some(name),
            ..Default::default()
        }
    }

    fn special(name: &str) -> Self {
        Self {
            special_class: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn empty() -> Self {
        Self::default()
    }

    fn union(parts: Vec<ClassResult>) -> Result<Self, String> {
        let mut chars = BTreeSet::new();
        let mut special_class = None;
        let mut param_ref = None;
        for part in parts {
            if part.param_ref.is_some() {
                return Err("a parameter reference cannot appear inside a <...> class".to_string());
            }
            if let Some(name) = part.special_class {
                if special_class.is_some() && special_class.as_deref() != Some(name.as_str()) {
                    return Err("a <...> class can only combine one special Unicode class".to_string());
                }
                special_class = Some(name);
            }
            chars.extend(part.chars);
            param_ref = param_ref.or(part.param_ref);
        }
        let bytes: Vec<u8> = chars.iter().copied().collect();
        Ok(Self {
            chars,
            special_class,
            param_ref,
            bytes,
        })
    }

    /// Whether this result denotes the never-match empty class.
    pub fn is_empty_class(&self) -> bool {
        self.chars.is_empty() && self.special_class.is_none() && self.param_ref.is_none()
    }
}

/// `byte` target kind: a single `u8`. Empty class produces the never-match
/// sentinel `0u8`; ambiguous (multi-byte) classes take the lowest byte.
pub fn to_byte(result: &ClassResult) -> u8 {
    result.chars.iter().next().copied().unwrap_or(0)
}

/// `bytes` target kind: an ordered byte slice. Empty class produces the
/// empty slice sentinel.
pub fn to_bytes(result: &ClassResult) -> Vec<u8> {
    if !result.bytes.is_empty() {
        result.bytes.clone()
    } else {
        result.chars.iter().copied().collect()
    }
}

fn decode_escape(chars: &[char], i: usize, lineno: usize) -> Result<(Vec<u8>, usize), LexicalError> {
    let next = chars.get(i + 1).copied().ok_or_else(|| {
        LexicalError::new(lineno, "dangling escape at end of literal")
    })?;
    match next {
        'n' => Ok((vec![b'\n'], i + 2)),
        't' => Ok((vec![b'\t'], i + 2)),
        'r' => Ok((vec![b'\r'], i + 2)),
        '\\' => Ok((vec![b'\\'], i + 2)),
        '\'' => Ok((vec![b'\''], i + 2)),
        '"' => Ok((vec![b'"'], i + 2)),
        '0' => Ok((vec![0u8], i + 2)),
        'x' => {
            let hex: String = chars.get(i + 2..i + 4).map(|s| s.iter().collect()).unwrap_or_default();
            if hex.len() != 2 {
                return Err(LexicalError::new(lineno, "incomplete \\xHH escape"));
            }
            let byte = u8::from_str_radix(&hex, 16)
                .map_err(|_| LexicalError::new(lineno, format!("invalid \\x escape '\\x{}'", hex)))?;
            Ok((vec![byte], i + 4))
        }
        'u' => {
            let hex: String = chars.get(i + 2..i + 6).map(|s| s.iter().collect()).unwrap_or_default();
            if hex.len() != 4 {
                return Err(LexicalError::new(lineno, "incomplete \\uXXXX escape"));
            }
            let scalar = u32::from_str_radix(&hex, 16)
                .map_err(|_| LexicalError::new(lineno, format!("invalid \\u escape '\\u{}'", hex)))?;
            let ch = char::from_u32(scalar)
                .ok_or_else(|| LexicalError::new(lineno, format!("\\u{} is not a valid code point", hex)))?;
            let mut buf = [0u8; 4];
            let encoded = ch.encode_utf8(&mut buf);
            Ok((encoded.as_bytes().to_vec(), i + 6))
        }
        other => Err(LexicalError::new(lineno, format!("unknown escape '\\{}'", other))),
    }
}

fn parse_quoted(chars: &[char], quote: char, lineno: usize) -> Result<(Vec<u8>, usize), LexicalError> {
    let mut bytes = Vec::new();
    let mut i = 1;
    loop {
        match chars.get(i) {
            None => return Err(LexicalError::new(lineno, "unterminated quote in c[...]")),
            Some(&c) if c == quote => return Ok((bytes, i + 1)),
            Some(&'\\') => {
                let (decoded, next) = decode_escape(chars, i, lineno)?;
                bytes.extend(decoded);
                i = next;
            }
            Some(&c) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                i += 1;
            }
        }
    }
}

/// The reserved single-char class names (spec glossary: `P L R LB RB LP RP
/// SQ DQ BS`), each standing for one punctuation byte the `.desc` grammar
/// itself uses as syntax (`|`, `<`, `>`, brackets, parens, quotes,
/// backslash) and so cannot be written literally in most contexts. Shared
/// by [`lookup_predefined`] (bare-identifier resolution inside `<...>`)
/// and the `rust_expr` template filter's embedded-escape-token expansion
/// (`<P>` → `b'|'`).
pub(crate) fn reserved_escape_byte(name: &str) -> Option<u8> {
    match name {
        "P" => Some(b'|'),
        "L" => Some(b'<'),
        "R" => Some(b'>'),
        "LB" => Some(b'['),
        "RB" => Some(b']'),
        "LP" => Some(b'('),
        "RP" => Some(b')'),
        "SQ" => Some(b'\''),
        "DQ" => Some(b'"'),
        "BS" => Some(b'\\'),
        _ => None,
    }
}

fn lookup_predefined(name: &str) -> Option<ClassResult> {
    let upper = name.to_ascii_uppercase();
    let ascii_class = |pred: fn(u8) -> bool| -> ClassResult {
        let chars: BTreeSet<u8> = (0u8..=127).filter(|&b| pred(b)).collect();
        let bytes = chars.iter().copied().collect();
        ClassResult { chars, bytes, ..Default::default() }
    };
    if let Some(byte) = reserved_escape_byte(upper.as_str()) {
        return Some(ClassResult::literal(vec![byte]));
    }
    match upper.as_str() {
        "LETTER" => Some(ascii_class(|b| b.is_ascii_alphabetic())),
        "DIGIT" => Some(ascii_class(|b| b.is_ascii_digit())),
        "HEX_DIGIT" => Some(ascii_class(|b| b.is_ascii_hexdigit())),
        "LABEL_CONT" => Some(ascii_class(|b| {
            b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
        })),
        "WS" => Some(ClassResult::literal(vec![b' ', b'\t', b'\r'])),
        "NL" => Some(ClassResult::literal(vec![b'\n'])),
        "XID_START" | "XID_CONT" | "XLBL_START" | "XLBL_CONT" => Some(ClassResult::special(&upper)),
        _ => None,
    }
}

fn is_range(token: &str) -> Option<(char, char)> {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() == 3 && chars[1] == '-' && chars[0].is_ascii_alphanumeric() && chars[2].is_ascii_alphanumeric() {
        Some((chars[0], chars[2]))
    } else {
        None
    }
}

fn parse_bare(token: &str, lineno: usize) -> Result<ClassResult, ValidationError> {
    if let Some((lo, hi)) = is_range(token) {
        if lo as u32 <= hi as u32 {
            let chars: BTreeSet<u8> = (lo as u8..=hi as u8).collect();
            let bytes = chars.iter().copied().collect();
            return Ok(ClassResult { chars, bytes, ..Default::default() });
        }
    }
    if let Some(result) = lookup_predefined(token) {
        return Ok(result);
    }
    for c in token.chars() {
        if !(c.is_ascii_alphanumeric() || c == '_' || c == '-') {
            return Err(ValidationError::new(
                lineno,
                format!("unsupported character '{}' in c[...]; quote or name it", c),
            ));
        }
    }
    Ok(ClassResult::literal(token.bytes().collect()))
}

/// Split the inside of a `<...>` class wrapper into space-separated
/// sub-tokens, never splitting inside a quoted literal.
fn split_class_tokens(inner: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c.is_whitespace() {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                } else {
                    if c == '\'' || c == '"' {
                        quote = Some(c);
                    }
                    current.push(c);
                }
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Split a call-argument list on top-level commas, never splitting inside
/// `<...>`, `'...'`, or `"..."`. Used by call-argument transformation
/// (spec §4.4.10) and the `transform_call_args` template filter (spec
/// §4.6).
pub fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut angle_depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '<' => {
                angle_depth += 1;
                current.push(c);
            }
            '>' => {
                angle_depth -= 1;
                current.push(c);
            }
            ',' if angle_depth <= 0 => {
                args.push(current.trim().to_string());
                current = String::new();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() || !args.is_empty() {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            args.push(trimmed.to_string());
        }
    }
    args
}

/// Parse one CharacterClass literal. `input` is the raw bracket/argument
/// text (already trimmed of its enclosing `[...]` or `(...)`).
pub fn parse(input: &str, lineno: usize) -> Result<ClassResult, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(ClassResult::empty());
    }

    if (trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() >= 2)
        || (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2)
    {
        let quote = trimmed.chars().next().unwrap();
        let chars: Vec<char> = trimmed.chars().collect();
        let (bytes, consumed) = parse_quoted(&chars, quote, lineno)?;
        if consumed != chars.len() {
            return Err(LexicalError::new(lineno, "trailing content after quoted literal").into());
        }
        return Ok(ClassResult::literal(bytes));
    }

    if let Some(stripped) = trimmed.strip_prefix(':') {
        if stripped.is_empty() || !stripped.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ValidationError::new(lineno, format!("invalid parameter reference ':{}'", stripped)).into());
        }
        return Ok(ClassResult::param(stripped.to_string()));
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        let inner = &trimmed[1..trimmed.len() - 1];
        if inner.trim().is_empty() {
            return Ok(ClassResult::empty());
        }
        let mut parts = Vec::new();
        for token in split_class_tokens(inner) {
            parts.push(parse(&token, lineno)?);
        }
        return ClassResult::union(parts)
            .map_err(|message| ValidationError::new(lineno, message).into());
    }

    Ok(parse_bare(trimmed, lineno)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_quoted_char() {
        let result = parse("'|'", 1).unwrap();
        assert_eq!(result.bytes, vec![b'|']);
        assert!(result.chars.contains(&b'|'));
    }

    #[test]
    fn escape_sequences_decode() {
        let result = parse("'\\n\\t\\x41\\u0042'", 1).unwrap();
        assert_eq!(result.bytes, vec![b'\n', b'\t', b'A', b'B']);
    }

    #[test]
    fn param_ref() {
        let result = parse(":x", 1).unwrap();
        assert_eq!(result.param_ref.as_deref(), Some("x"));
    }

    #[test]
    fn range_expands() {
        let result = parse("0-9", 1).unwrap();
        assert_eq!(result.chars.len(), 10);
        assert!(result.chars.contains(&b'5'));
    }

    #[test]
    fn predefined_class_letter() {
        let result = parse("LETTER", 1).unwrap();
        assert!(result.chars.contains(&b'a'));
        assert!(result.chars.contains(&b'Z'));
        assert!(!result.chars.contains(&b'0'));
    }

    #[test]
    fn unicode_class_uses_special_class_not_chars() {
        let result = parse("XID_START", 1).unwrap();
        assert_eq!(result.special_class.as_deref(), Some("XID_START"));
        assert!(result.chars.is_empty());
    }

    #[test]
    fn reserved_single_char_names() {
        assert_eq!(parse("LB", 1).unwrap().bytes, vec![b'[']);
        assert_eq!(parse("RP", 1).unwrap().bytes, vec![b')']);
    }

    #[test]
    fn empty_class_never_matches() {
        let result = parse("<>", 1).unwrap();
        assert!(result.is_empty_class());
        assert_eq!(to_byte(&result), 0u8);
        assert!(to_bytes(&result).is_empty());
    }

    #[test]
    fn class_wrapper_unions_tokens() {
        let result = parse("<'|' ',' DIGIT>", 1).unwrap();
        assert!(result.chars.contains(&b'|'));
        assert!(result.chars.contains(&b','));
        assert!(result.chars.contains(&b'5'));
    }

    #[test]
    fn unterminated_quote_is_lexical_error() {
        let err = parse("'abc", 1).unwrap_err();
        assert!(matches!(err, Error::Lexical(_)));
    }

    #[test]
    fn unquoted_special_char_is_validation_error() {
        let err = parse("$", 1).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn bare_literal_word_is_byte_set() {
        let result = parse("abc", 1).unwrap();
        assert_eq!(result.chars.len(), 3);
        assert_eq!(result.bytes, vec![b'a', b'b', b'c']);
    }

    #[test]
    fn split_args_respects_angle_brackets_and_quotes() {
        let args = split_args("COL, <'a' ','>, :x");
        assert_eq!(args, vec!["COL", "<'a' ','>", ":x"]);
    }

    #[test]
    fn split_args_on_empty_input_is_empty() {
        assert!(split_args("").is_empty());
    }

    #[test]
    fn split_args_single_arg_no_comma() {
        assert_eq!(split_args(":x"), vec![":x"]);
    }
}
