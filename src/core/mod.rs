/// Core Module for Relinkdb
///
/// This module contains the database client itself: the connection
/// manager, statement executor, query builders and transaction controller,
/// together with the error type they share.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{DbError, Result};
