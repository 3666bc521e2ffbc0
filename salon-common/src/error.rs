//! Common error types for the salon service

use crate::order_key::OrderKeyError;
use thiserror::Error;

/// Common result type for salon operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across salon crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Credential does not permit the requested action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Concert is frozen; its program cannot be edited
    #[error("Concert {0} is frozen")]
    Frozen(String),

    /// Order key could not be parsed or generated
    #[error(transparent)]
    OrderKey(#[from] OrderKeyError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the error asks the caller to respace a concert's keys
    pub fn needs_rebalance(&self) -> bool {
        matches!(self, Error::OrderKey(e) if e.needs_rebalance())
    }
}
