/// Database Module
///
/// This module provides the resilient database client, organized into
/// focused submodules.
///
/// ## Architecture
///
/// - **Driver seam** (`driver.rs`): the `Connector`/`Backend` traits every physical driver implements
/// - **Backends** (`sqlite.rs`, `mysql.rs`): concrete drivers behind the seam
/// - **Connection Management** (`connection.rs`): owns the live connection, liveness checks, reconnects and transactions
/// - **Statement Execution** (`query.rs`): raw SQL execution and result fetching
/// - **Query Builders** (`builder.rs`): SQL assembled from table names and field maps
/// - **Values** (`value.rs`): the `Value` and `Record` types results are returned as
///
/// ## Error Handling
///
/// All operations return `DbError`; driver failures are normalized at the
/// boundary so callers never see driver-specific error types.
pub mod builder;
pub mod connection;
pub mod driver;
#[cfg(feature = "mysql")]
pub mod mysql;
pub mod query;
pub mod sqlite;
pub mod value;

pub use builder::{BatchStatement, Statement};
pub use connection::*;
pub use driver::{connector_for, Backend, Connector, DriverError, StatementOutput};
pub use value::{Record, Value};
