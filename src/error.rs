use std::fmt::{Display, Formatter};

/// Failure while splitting the `.desc` source into [`crate::token::Token`]s:
/// an unterminated quote or bracket, or an invalid escape inside `c[...]`.
#[derive(Debug, Clone)]
pub struct LexicalError {
    pub lineno: usize,
    pub message: String,
}

impl LexicalError {
    pub fn new(lineno: usize, message: impl Into<String>) -> Self {
        Self {
            lineno,
            message: message.into(),
        }
    }
}

impl Display for LexicalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LexicalError {}

/// Failure while building the [`crate::ast::Machine`] from the token
/// stream: an unknown top-level directive, an unexpected token inside a
/// function body, or an unrecognised command form.
#[derive(Debug, Clone)]
pub struct AstParseError {
    pub lineno: usize,
    pub message: String,
}

impl AstParseError {
    pub fn new(lineno: usize, message: impl Into<String>) -> Self {
        Self {
            lineno,
            message: message.into(),
        }
    }
}

impl Display for AstParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AstParseError {}

/// Failure enforced while lowering the AST into IR: `advance_to` misuse,
/// a bare identifier colliding with a known parameter name in a
/// `PREPEND`/call argument, or unsupported character syntax in `c[...]`.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub lineno: usize,
    pub message: String,
}

impl ValidationError {
    pub fn new(lineno: usize, message: impl Into<String>) -> Self {
        Self {
            lineno,
            message: message.into(),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Failure while rendering the IR through a target template: no template
/// found for the requested target, or a template-level rendering error.
#[derive(Debug, Clone)]
pub struct GenerateError {
    pub message: String,
}

impl GenerateError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for GenerateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for GenerateError {}

/// The union of every fatal error the pipeline can raise, each carrying
/// the originating line number where one applies (spec's three fatal
/// taxonomies, §7).
#[derive(Debug, Clone)]
pub enum Error {
    Lexical(LexicalError),
    Parse(AstParseError),
    Validation(ValidationError),
    Generate(GenerateError),
}

impl Error {
    /// The originating line number, if this error variant carries one.
    pub fn lineno(&self) -> Option<usize> {
        match self {
            Error::Lexical(e) => Some(e.lineno),
            Error::Parse(e) => Some(e.lineno),
            Error::Validation(e) => Some(e.lineno),
            Error::Generate(_) => None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Lexical(e) => write!(f, "{}", e.message),
            Error::Parse(e) => write!(f, "{}", e.message),
            Error::Validation(e) => write!(f, "{}", e.message),
            Error::Generate(e) => write!(f, "{}", e.message),
        }
    }
}

impl std::error::Error for Error {}

impl From<LexicalError> for Error {
    fn from(e: LexicalError) -> Self {
        Error::Lexical(e)
    }
}
impl From<AstParseError> for Error {
    fn from(e: AstParseError) -> Self {
        Error::Parse(e)
    }
}
impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}
impl From<GenerateError> for Error {
    fn from(e: GenerateError) -> Self {
        Error::Generate(e)
    }
}
