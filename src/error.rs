//! Error taxonomy for loading and querying.
//!
//! Load-time coercion problems are not errors: they are collected as
//! [`CoercionFailureRecord`](crate::data::load_report::CoercionFailureRecord)s
//! on the load report. Everything here is surfaced to the caller.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The dataset could not be turned into a table (no columns, unreadable header).
    #[error("Cannot load '{source_name}': {message}")]
    Schema {
        source_name: String,
        message: String,
    },

    #[error("Table '{0}' not found")]
    NotFound(String),

    /// Anything that is not a read-only query.
    #[error("Unsupported statement ({keyword}): only read-only queries are allowed\n  in statement: {statement}")]
    UnsupportedStatement { keyword: String, statement: String },

    #[error(transparent)]
    Query(#[from] QueryError),

    /// The embedded engine failed outside of a user statement (e.g. while materializing tables).
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    pub fn schema(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    pub fn unsupported(keyword: impl Into<String>, statement: impl Into<String>) -> Self {
        Self::UnsupportedStatement {
            keyword: keyword.into(),
            statement: statement.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_unsupported_statement(&self) -> bool {
        matches!(self, Self::UnsupportedStatement { .. })
    }

    pub fn is_query_error(&self) -> bool {
        matches!(self, Self::Query(_))
    }
}

/// A syntax or semantic failure reported by the query engine.
///
/// `message` is the engine's own text, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    pub message: String,
    /// Byte offset into `statement`, when the engine reports one.
    pub position: Option<usize>,
    pub statement: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
            statement: statement.into(),
        }
    }

    pub fn with_position(mut self, position: Option<usize>) -> Self {
        self.position = position;
        self
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQL error: {}", self.message)?;
        if let Some(pos) = self.position {
            write!(f, " (at offset {})", pos)?;
        }
        write!(f, "\n  in statement: {}", self.statement)
    }
}

impl std::error::Error for QueryError {}
