// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod repl;

pub use crate::config::{Config, DbConfig, DriverKind};
pub use crate::core::db::{DatabaseClient, Record, TransactionState, Value};
pub use crate::core::{DbError, Result};

#[cfg(test)]
mod test_utils;
