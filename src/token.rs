use std::fmt::{Display, Formatter};

/// One `|`-delimited segment of a `.desc` source file, already split into
/// its directive/command name, bracketed body, and trailing free text.
///
/// `tag` identifies the directive or command (`function`, `state`, `c`,
/// `->`, `>>`, `return`, an uppercase command name, or a function call
/// `/name`). `id` is the bracketed body `[...]` (possibly empty). `rest`
/// is the free text following the closing bracket. Every token records
/// the line it started on so diagnostics can point back at the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tag: String,
    pub id: Option<String>,
    pub rest: String,
    pub lineno: usize,
}

impl Token {
    pub fn new(tag: impl Into<String>, id: Option<String>, rest: impl Into<String>, lineno: usize) -> Self {
        Self {
            tag: tag.into(),
            id,
            rest: rest.into(),
            lineno,
        }
    }

    /// Whether this token looks like a command rather than a case
    /// selector: begins with `/`, starts with `->` or `>>`, begins with
    /// an uppercase letter, or is `return`/`err`/`mark`/`term`.
    pub fn is_command_like(&self) -> bool {
        if self.tag.starts_with('/') || self.tag.starts_with("->") || self.tag.starts_with(">>") {
            return true;
        }
        if matches!(self.tag.as_str(), "return" | "err" | "mark" | "term") {
            return true;
        }
        self.tag
            .chars()
            .next()
            .map(|c| c.is_ascii_uppercase())
            .unwrap_or(false)
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag)?;
        if let Some(id) = &self.id {
            write!(f, "[{}]", id)?;
        }
        if !self.rest.is_empty() {
            write!(f, " {}", self.rest)?;
        }
        write!(f, " @ line {}", self.lineno)
    }
}
