//! Error types for the schedule search.
//!
//! The scoring pipeline itself never fails: evaluation failures are
//! reported through sentinel times and illegal candidates are filtered
//! out. The errors here cover the edges of the system: building
//! transformations that would break their invariants, loading problem
//! descriptions, and validating user configuration.

use thiserror::Error;

/// Top-level error type for the search framework.
#[derive(Error, Debug)]
pub enum SearchError {
    /// A tuning, solver or evaluator setting is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transformation descriptor violates its shape invariant
    #[error("Invalid transformation: {0}")]
    InvalidTransformation(String),

    /// A constraint mode name was not recognised
    #[error("Unknown constraint mode '{0}' (expected hard, soft, penalty or none)")]
    UnknownMode(String),

    /// A strategy name was not recognised
    #[error("Unknown strategy '{0}' (expected optimal_neighbors, all_legal or sampling)")]
    UnknownStrategy(String),

    /// A problem description could not be decoded
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SearchError {
    /// Create an invalid-configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SearchError::InvalidConfig(msg.into())
    }

    /// Create an invalid-transformation error.
    pub fn invalid_transformation(msg: impl Into<String>) -> Self {
        SearchError::InvalidTransformation(msg.into())
    }
}

/// Result type alias using [`SearchError`].
pub type SearchResult<T> = Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SearchError::invalid_config("penalty factor must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: penalty factor must be positive"
        );

        let err = SearchError::UnknownMode("strict".to_string());
        assert!(err.to_string().contains("'strict'"));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err: SearchError = json_err.into();
        assert!(matches!(err, SearchError::Parse(_)));
    }
}
