//! Typed error handling for repositories
//!
//! # Error Categories
//!
//! - [`ParseError`]: a method name or query text cannot be turned into a query.
//!   Raised when a method is first resolved and cached, so every later call
//!   of the same method fails identically.
//! - [`RepositoryError`]: everything that can go wrong while invoking a
//!   repository operation, including store failures passed through unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! match repository.find_one_by_spec(Some(&spec)) {
//!     Ok(Some(user)) => println!("Found: {:?}", user),
//!     Ok(None) => println!("No match"),
//!     Err(RepositoryError::NonUniqueResult { actual, .. }) => {
//!         println!("Specification matched {} users", actual);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors produced while parsing method names and query text
///
/// Parse errors are cached alongside successfully parsed templates, hence
/// `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A property expression could not be decomposed into known attributes
    #[error("No property '{property}' found for type '{entity_type}' in method '{method}'")]
    UnresolvableProperty {
        entity_type: String,
        property: String,
        method: String,
    },

    /// The method name does not start with a query prefix such as `findBy`
    #[error("Method name '{method}' does not start with a supported query prefix")]
    UnsupportedMethodName { method: String },

    /// An `OrderBy` clause could not be split into properties and directions
    #[error("Invalid order clause '{clause}' in method '{method}'")]
    InvalidOrderClause { method: String, clause: String },

    /// Explicit query text is malformed
    #[error("Invalid query for method '{method}' at position {position}: {message}")]
    InvalidQuery {
        method: String,
        position: usize,
        message: String,
    },
}

impl ParseError {
    pub fn unresolvable(
        entity_type: impl Into<String>,
        property: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        ParseError::UnresolvableProperty {
            entity_type: entity_type.into(),
            property: property.into(),
            method: method.into(),
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ParseError::UnresolvableProperty { .. } => "UNRESOLVABLE_PROPERTY",
            ParseError::UnsupportedMethodName { .. } => "UNSUPPORTED_METHOD_NAME",
            ParseError::InvalidOrderClause { .. } => "INVALID_ORDER_CLAUSE",
            ParseError::InvalidQuery { .. } => "INVALID_QUERY",
        }
    }
}

/// The main error type for repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Method name or query text could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The runtime arguments do not match what the method binds
    #[error("Method '{method}' binds {expected} argument(s) but {actual} were supplied")]
    ArgumentCountMismatch {
        method: String,
        expected: usize,
        actual: usize,
    },

    /// A runtime argument has the wrong shape for its parameter
    #[error("Argument {index} of method '{method}' must be {expected}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: &'static str,
    },

    /// A single-result contract received more than one row
    #[error("Incorrect result size for '{operation}': expected at most 1, actual {actual}")]
    NonUniqueResult { operation: String, actual: usize },

    /// No operation with that name was registered
    #[error("No repository method '{method}' registered for '{entity_type}'")]
    UnknownMethod { entity_type: String, method: String },

    /// Page index or size out of range
    #[error("Invalid page request: {0}")]
    InvalidPageRequest(String),

    /// The operation produced a different result kind than the caller asked for
    #[error("Method '{method}' returned {actual} but {expected} was requested")]
    UnexpectedOutcome {
        method: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Invalid repository registration or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failure reported by the persistence collaborator, passed through as-is
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl RepositoryError {
    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            RepositoryError::Parse(e) => e.error_code(),
            RepositoryError::ArgumentCountMismatch { .. } => "ARGUMENT_COUNT_MISMATCH",
            RepositoryError::ArgumentType { .. } => "ARGUMENT_TYPE",
            RepositoryError::NonUniqueResult { .. } => "NON_UNIQUE_RESULT",
            RepositoryError::UnknownMethod { .. } => "UNKNOWN_METHOD",
            RepositoryError::InvalidPageRequest(_) => "INVALID_PAGE_REQUEST",
            RepositoryError::UnexpectedOutcome { .. } => "UNEXPECTED_OUTCOME",
            RepositoryError::Config(_) => "CONFIG_ERROR",
            RepositoryError::Store(_) => "STORE_ERROR",
        }
    }

    /// Whether this error belongs to the data-access family
    ///
    /// Callers that only distinguish "the store said no" from programming
    /// errors can match on this instead of individual variants.
    pub fn is_data_access(&self) -> bool {
        matches!(
            self,
            RepositoryError::NonUniqueResult { .. } | RepositoryError::Store(_)
        )
    }
}
