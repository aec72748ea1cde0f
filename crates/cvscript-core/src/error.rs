use crate::config::ConfigError;
use crate::dataset::DatasetError;
use crate::dsl::ast::SourceLocation;
use crate::resource::ResourceError;
use thiserror::Error;

/// Malformed token in the source text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at line {}, column {}", location.line, location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl LexError {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Grammar violation found while building the AST.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "expected {expected}, found {found} at line {}, column {}",
    location.line,
    location.column
)]
pub struct ParseError {
    pub expected: String,
    pub found: String,
    pub location: SourceLocation,
}

/// An entity name that is neither an active loop alias nor a known entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot resolve '{name}': not a known entity or active loop alias")]
pub struct ResolutionError {
    pub name: String,
}

impl ResolutionError {
    pub fn unknown(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Error)]
pub enum CvError {
    #[error("Lexing failed: {0}")]
    Lex(#[from] LexError),
    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),
    #[error("Evaluation failed: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CvError {
    fn from(error: std::io::Error) -> Self {
        CvError::Io(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CvError>;
