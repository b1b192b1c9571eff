//! Error types for the search component.
//!
//! Every failure is recoverable from the host's point of view: the worst
//! outcome is an empty suggestion list plus a notification.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    /// Missing or invalid store connection, or an unusable table/column setup.
    /// The session stays inert until it is reconfigured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Opening the database connection failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// Executing a query or decoding its rows failed.
    #[error("query error: {0}")]
    Query(String),

    /// A scale or bbox expression could not be parsed or evaluated.
    #[error("invalid {kind} expression: {message}")]
    Expression { kind: &'static str, message: String },

    /// Reprojecting a result geometry failed.
    #[error("transform error: {0}")]
    Transform(String),

    /// Reading or writing persisted settings failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SearchError {
    pub fn expression(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Expression {
            kind,
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for SearchError {
    fn from(err: sqlx::Error) -> Self {
        SearchError::Query(err.to_string())
    }
}

impl From<std::io::Error> for SearchError {
    fn from(err: std::io::Error) -> Self {
        SearchError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Storage(err.to_string())
    }
}
