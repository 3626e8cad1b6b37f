//! Error types for the query engine.

use thiserror::Error;

use crate::data_type::DataType;

pub type Result<T> = std::result::Result<T, Error>;

/// Raised by the tokenizer on a character it cannot start a token with, or on a
/// string literal that runs off the end of the input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct LexError {
    pub message: String,
    pub position: usize,
}

/// Raised by the parser when the current token is not the construct the grammar
/// expects. `position` is the offset of the offending token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

/// Failures detected while executing a well-formed statement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SemanticError {
    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Table '{0}' already exists")]
    TableExists(String),

    #[error("Column '{0}' does not exist")]
    ColumnNotFound(String),

    #[error("Column '{0}' is listed more than once")]
    DuplicateColumn(String),

    #[error("Number of values ({found}) does not match number of columns ({expected})")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("Constraint violation: column '{column}' of table '{table}' must be unique")]
    ConstraintViolation { table: String, column: String },

    #[error("Unsupported {0}")]
    Unsupported(String),

    #[error("Type mismatch on column '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        found: DataType,
    },

    #[error("Operator '{0}' is only supported between INT values")]
    IncomparableOperands(String),

    #[error("Table '{0}' appears more than once in the query")]
    DuplicateTable(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Lex error: {0}")]
    Lex(#[from] LexError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Semantic(#[from] SemanticError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Corrupt table file '{table}': {reason}")]
    CorruptTable { table: String, reason: String },
}

impl Error {
    /// Returns the semantic failure wrapped by this error, if any.
    pub fn as_semantic(&self) -> Option<&SemanticError> {
        match self {
            Self::Semantic(err) => Some(err),
            _ => None,
        }
    }
}
