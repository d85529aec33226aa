/// Relinkdb Error Module
///
/// This module defines the error taxonomy of the database client. Every
/// public operation returns [`Result`], and each failure lands in exactly
/// one variant so callers can decide what to retry.
use crate::core::db::driver::DriverError;
use thiserror::Error;

/// Error type for every database client operation.
///
/// - Connection establishment and reconnection
/// - Statement execution (with the offending SQL attached)
/// - Preconditions checked before any SQL is sent
/// - Transaction and cursor misuse
/// - Configuration loading
#[derive(Error, Debug)]
pub enum DbError {
    /// Connecting or reconnecting to the server failed
    #[error("Connection error{}: {message}", code_suffix(.code))]
    Connection { code: Option<i32>, message: String },

    /// The server rejected a statement (syntax, constraint, type)
    #[error("Query error: {message}\nSQL: {sql}")]
    Query { message: String, sql: String },

    /// A structural precondition failed before any SQL was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation was called in the wrong transaction or cursor state
    #[error("State error: {0}")]
    State(String),

    /// The connection was replaced while a transaction was open
    #[error("Transaction error: connection was lost mid-transaction, pending work was discarded")]
    TransactionLost,

    /// The driver gave up waiting for the server
    #[error("Timeout: {message}\nSQL: {sql}")]
    Timeout { message: String, sql: String },

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    /// Wraps a driver failure raised while opening or repairing a connection.
    pub(crate) fn connection(err: DriverError) -> Self {
        DbError::Connection {
            code: err.code,
            message: err.message,
        }
    }

    /// Wraps a driver failure raised while running `sql`.
    pub(crate) fn statement(err: DriverError, sql: &str) -> Self {
        if err.timed_out {
            DbError::Timeout {
                message: err.message,
                sql: sql.to_string(),
            }
        } else {
            DbError::Query {
                message: err.message,
                sql: sql.to_string(),
            }
        }
    }
}

fn code_suffix(code: &Option<i32>) -> String {
    code.map(|c| format!(" {c}")).unwrap_or_default()
}

/// Type alias for Result to use DbError as the error type.
pub type Result<T> = std::result::Result<T, DbError>;
