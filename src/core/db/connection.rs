/// Connection Management Module
///
/// This module owns the single physical connection of a [`DatabaseClient`]:
/// establishing it, probing it before every operation, replacing it when it
/// dies, and the transaction state that lives on it.

use crate::config::DbConfig;
use crate::core::db::driver::{connector_for, Backend, Connector};
use crate::core::db::value::Record;
use crate::core::{DbError, Result};
use tracing::{debug, info, warn};

/// Represents database transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No active transaction (autocommit mode)
    #[default]
    Autocommit,
    /// Transaction in progress
    Transaction,
    /// The connection was replaced while a transaction was open. Statements
    /// fail with `DbError::TransactionLost` until `commit` or `rollback`
    /// acknowledges the loss.
    Lost,
}

/// A resilient client around one database connection.
///
/// Every statement and transaction-control call first makes sure the
/// connection is alive and silently replaces it if it is not. A statement
/// that fails is never re-issued; the caller decides whether to retry.
pub struct DatabaseClient {
    config: DbConfig,
    connector: Box<dyn Connector>,
    pub(super) backend: Option<Box<dyn Backend>>,
    /// Result set of the last row-returning statement, until fetched
    pub(super) pending: Option<Vec<Record>>,
    transaction_state: TransactionState,
    connects: u64,
}

impl std::fmt::Debug for DatabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseClient")
            .field("config", &self.config)
            .field("connected", &self.backend.is_some())
            .field("transaction_state", &self.transaction_state)
            .field("connects", &self.connects)
            .finish()
    }
}

impl DatabaseClient {
    /// Connects using the driver named in `config`.
    ///
    /// # Errors
    ///
    /// `DbError::Config` for invalid settings, `DbError::Connection` when
    /// the server is unreachable or rejects the credentials.
    pub fn connect(config: DbConfig) -> Result<Self> {
        let connector = connector_for(config.driver)?;
        Self::with_connector(config, connector)
    }

    /// Connects through a caller-supplied [`Connector`].
    pub fn with_connector(config: DbConfig, connector: Box<dyn Connector>) -> Result<Self> {
        config.validate()?;
        let mut client = DatabaseClient {
            config,
            connector,
            backend: None,
            pending: None,
            transaction_state: TransactionState::Autocommit,
            connects: 0,
        };
        client.reconnect()?;
        Ok(client)
    }

    /// Replaces the current connection with a fresh one.
    ///
    /// The old connection is closed best-effort: it may already be unusable,
    /// so failures while closing it are ignored. Safe to call with no
    /// connection. Any unfetched result set is discarded, and an open
    /// transaction becomes [`TransactionState::Lost`].
    pub fn reconnect(&mut self) -> Result<()> {
        self.drop_backend();

        let mut backend = self
            .connector
            .connect(&self.config)
            .map_err(DbError::connection)?;
        backend.set_autocommit(true).map_err(DbError::connection)?;
        self.backend = Some(backend);
        self.connects += 1;
        info!(
            database = %self.config.database,
            connects = self.connects,
            "database connection established"
        );
        Ok(())
    }

    /// Probes the connection and reconnects if the probe fails.
    ///
    /// Returns `true` when the connection had to be replaced.
    pub fn ensure_live(&mut self) -> Result<bool> {
        let alive = match self.backend.as_mut() {
            Some(backend) => match backend.ping() {
                Ok(()) => true,
                Err(err) => {
                    debug!(error = %err, "liveness probe failed, reconnecting");
                    false
                }
            },
            None => false,
        };
        if alive {
            return Ok(false);
        }
        self.reconnect()?;
        Ok(true)
    }

    /// Closes the connection. The next operation reconnects.
    ///
    /// Closing inside a transaction discards it, exactly like a dropped
    /// connection does.
    pub fn close(&mut self) {
        self.drop_backend();
    }

    fn drop_backend(&mut self) {
        self.pending = None;
        if let Some(backend) = self.backend.take() {
            if let Err(err) = backend.close() {
                debug!(error = %err, "ignoring failure while closing connection");
            }
        }
        if self.transaction_state == TransactionState::Transaction {
            warn!("connection dropped during a transaction; uncommitted work was discarded");
            self.transaction_state = TransactionState::Lost;
        }
    }

    /// Liveness check plus the lost-transaction guard every statement passes.
    pub(super) fn ensure_usable(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.transaction_state == TransactionState::Lost {
            return Err(DbError::TransactionLost);
        }
        Ok(())
    }

    pub(super) fn backend_mut(&mut self) -> Result<&mut (dyn Backend + 'static)> {
        self.backend
            .as_deref_mut()
            .ok_or_else(|| DbError::State("not connected".to_string()))
    }

    /// Starts a transaction by turning autocommit off.
    ///
    /// # Errors
    ///
    /// `DbError::State` if a transaction is already open, and
    /// `DbError::TransactionLost` if a lost transaction was never
    /// acknowledged with `commit` or `rollback`.
    pub fn begin(&mut self) -> Result<()> {
        match self.transaction_state {
            TransactionState::Transaction => {
                return Err(DbError::State("transaction already in progress".to_string()))
            }
            TransactionState::Lost => return Err(DbError::TransactionLost),
            TransactionState::Autocommit => {}
        }
        self.ensure_live()?;
        self.backend_mut()?
            .set_autocommit(false)
            .map_err(DbError::connection)?;
        self.transaction_state = TransactionState::Transaction;
        debug!("transaction started");
        Ok(())
    }

    /// Commits the open transaction and turns autocommit back on.
    ///
    /// If the server refuses the commit, the transaction is rolled back so
    /// the connection is in autocommit mode again when the error returns.
    ///
    /// # Errors
    ///
    /// `DbError::State` if no transaction is open,
    /// `DbError::TransactionLost` if the connection had to be replaced,
    /// which means the server already discarded the pending work, and
    /// `DbError::Query` if the server rejected the commit.
    pub fn commit(&mut self) -> Result<()> {
        self.require_transaction()?;
        self.ensure_live()?;
        if self.transaction_state == TransactionState::Lost {
            self.transaction_state = TransactionState::Autocommit;
            return Err(DbError::TransactionLost);
        }

        let committed = self.backend_mut()?.commit();
        if let Err(err) = committed {
            self.abandon_transaction();
            return Err(DbError::statement(err, "COMMIT"));
        }
        let restored = self.backend_mut()?.set_autocommit(true);
        if let Err(err) = restored {
            self.abandon_transaction();
            return Err(DbError::connection(err));
        }
        self.transaction_state = TransactionState::Autocommit;
        debug!("transaction committed");
        Ok(())
    }

    /// Discards the open transaction and turns autocommit back on.
    ///
    /// If the connection had to be replaced the work is already gone, so
    /// this still succeeds.
    ///
    /// # Errors
    ///
    /// `DbError::State` if no transaction is open.
    pub fn rollback(&mut self) -> Result<()> {
        self.require_transaction()?;
        self.ensure_live()?;
        if self.transaction_state == TransactionState::Lost {
            self.transaction_state = TransactionState::Autocommit;
            return Ok(());
        }

        let backend = self.backend_mut()?;
        let rolled_back = backend.rollback().and_then(|()| backend.set_autocommit(true));
        self.transaction_state = TransactionState::Autocommit;
        if let Err(err) = rolled_back {
            // Closing the session is the only way left to discard the work.
            self.close();
            return Err(DbError::connection(err));
        }
        debug!("transaction rolled back");
        Ok(())
    }

    /// Returns the connection to autocommit after a failed commit.
    ///
    /// The pending work is rolled back. A connection that cannot be put back
    /// into autocommit mode is closed, so the next operation reconnects.
    fn abandon_transaction(&mut self) {
        self.transaction_state = TransactionState::Autocommit;
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        let reset = backend.rollback().and_then(|()| backend.set_autocommit(true));
        if let Err(err) = reset {
            warn!(error = %err, "could not roll back failed commit, closing connection");
            self.close();
        }
    }

    fn require_transaction(&self) -> Result<()> {
        if self.transaction_state == TransactionState::Autocommit {
            return Err(DbError::State("no transaction in progress".to_string()));
        }
        Ok(())
    }

    pub fn transaction_state(&self) -> TransactionState {
        self.transaction_state
    }

    /// Whether the live connection is in autocommit mode.
    pub fn is_autocommit(&self) -> bool {
        self.backend
            .as_ref()
            .map(|b| b.is_autocommit())
            .unwrap_or(true)
    }

    /// Whether a connection handle is currently held.
    ///
    /// This does not probe the server; see [`DatabaseClient::ensure_live`].
    pub fn is_connected(&self) -> bool {
        self.backend.is_some()
    }

    /// Number of physical connections opened so far, the first included.
    pub fn connect_count(&self) -> u64 {
        self.connects
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

impl Drop for DatabaseClient {
    fn drop(&mut self) {
        self.close();
    }
}
