//! Database-level administration: existence probes, CREATE/DROP DATABASE and
//! the has-tables check.
//!
//! Every operation has an async form taking a [`CancellationToken`] and a
//! blocking form that runs it on the shared runtime.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::migrations::{MigrationCommand, MigrationOperation, MigrationsSqlGenerator};
use crate::runtime;

use super::connection::DatabaseConnection;
use super::error_codes::ErrorCodeTable;
use super::execution_strategy::ExecutionStrategy;

/// Samples one table of the current database.
pub const HAS_TABLES_SQL: &str = "SELECT COUNT(*) FROM (SELECT TableName FROM dbc.TablesV WHERE DataBaseName=(SELECT DATABASE) SAMPLE 1) AS Tables";

pub struct DatabaseCreator {
    connection: Arc<dyn DatabaseConnection>,
    sql_generator: MigrationsSqlGenerator,
    error_codes: ErrorCodeTable,
    execution_strategy: ExecutionStrategy,
    retry_delay: Duration,
    retry_timeout: Duration,
}

impl DatabaseCreator {
    pub fn new(connection: Arc<dyn DatabaseConnection>, config: &ProviderConfig) -> Self {
        Self {
            connection,
            sql_generator: MigrationsSqlGenerator::new(),
            error_codes: config.error_codes.clone(),
            execution_strategy: ExecutionStrategy::from_options(&config.options),
            retry_delay: Duration::from_millis(config.admin.retry_delay_ms),
            retry_timeout: Duration::from_secs(config.admin.retry_timeout_secs),
        }
    }

    /// Override the probe delay and total probe budget.
    pub fn with_retry_timing(mut self, delay: Duration, timeout: Duration) -> Self {
        self.retry_delay = delay;
        self.retry_timeout = timeout;
        self
    }

    pub fn connection(&self) -> &Arc<dyn DatabaseConnection> {
        &self.connection
    }

    /// Whether the database exists. Missing databases yield `false`.
    pub async fn exists_async(&self, cancel: &CancellationToken) -> Result<bool> {
        self.probe_until(false, cancel).await
    }

    pub fn exists(&self) -> Result<bool> {
        runtime::block_on(self.exists_async(&CancellationToken::new()))
    }

    /// Create the database through the master connection, then wait until
    /// it accepts connections.
    pub async fn create_async(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let name = self.database_name()?;
        let commands = self
            .sql_generator
            .generate(&[MigrationOperation::create_database(name)])?;

        info!("Creating database {}", name);
        let master = self.connection.create_master_connection();
        execute_commands(master.as_ref(), &commands).await?;
        self.connection.clear_pool();

        self.probe_until(true, cancel).await?;
        info!("Database {} created", name);
        Ok(())
    }

    pub fn create(&self) -> Result<()> {
        runtime::block_on(self.create_async(&CancellationToken::new()))
    }

    /// Drop the database. All pools are cleared first so no pooled
    /// connection keeps the database in use.
    pub async fn delete_async(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        self.connection.clear_all_pools();
        let name = self.database_name()?;
        let commands = self
            .sql_generator
            .generate(&[MigrationOperation::drop_database(name)])?;

        info!("Dropping database {}", name);
        let master = self.connection.create_master_connection();
        execute_commands(master.as_ref(), &commands).await
    }

    pub fn delete(&self) -> Result<()> {
        runtime::block_on(self.delete_async(&CancellationToken::new()))
    }

    /// Whether the current database holds at least one table.
    pub async fn has_tables_async(&self, cancel: &CancellationToken) -> Result<bool> {
        let connection = &self.connection;
        let count = self
            .execution_strategy
            .execute(cancel, move || async move {
                connection.execute_scalar(HAS_TABLES_SQL).await
            })
            .await?;
        Ok(count.unwrap_or(0) != 0)
    }

    pub fn has_tables(&self) -> Result<bool> {
        runtime::block_on(self.has_tables_async(&CancellationToken::new()))
    }

    /// Create the database when it is missing. Returns whether it was created.
    pub async fn ensure_created_async(&self, cancel: &CancellationToken) -> Result<bool> {
        if self.exists_async(cancel).await? {
            return Ok(false);
        }
        self.create_async(cancel).await?;
        Ok(true)
    }

    /// Drop the database when it exists. Returns whether it was dropped.
    pub async fn ensure_deleted_async(&self, cancel: &CancellationToken) -> Result<bool> {
        if !self.exists_async(cancel).await? {
            return Ok(false);
        }
        self.delete_async(cancel).await?;
        Ok(true)
    }

    fn database_name(&self) -> Result<&str> {
        match self.connection.database() {
            "" => Err(ProviderError::NoInitialCatalog),
            name => Ok(name),
        }
    }

    /// Open and close a connection until it succeeds or the budget runs out.
    ///
    /// A does-not-exist failure returns `false` unless the database is
    /// expected to appear. Retryable failures clear the pool and wait
    /// before the next attempt. Anything else, or a failure after the
    /// deadline, is returned unchanged.
    async fn probe_until(&self, retry_on_not_exists: bool, cancel: &CancellationToken) -> Result<bool> {
        let give_up = Instant::now() + self.retry_timeout;
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(ProviderError::Cancelled);
            }
            attempt += 1;
            let err = match self.probe().await {
                Ok(()) => return Ok(true),
                Err(err) => err,
            };

            if !retry_on_not_exists && self.error_codes.is_does_not_exist(&err) {
                debug!("Database {} does not exist", self.connection.database());
                return Ok(false);
            }
            if Instant::now() > give_up || !self.error_codes.is_retryable(&err) {
                return Err(err);
            }

            self.connection.clear_pool();
            warn!(
                "Existence probe {} for {} failed, retrying in {:?}: {}",
                attempt,
                self.connection.database(),
                self.retry_delay,
                err
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
                _ = tokio::time::sleep(self.retry_delay) => {}
            }
        }
    }

    async fn probe(&self) -> Result<()> {
        self.connection.open().await?.close();
        Ok(())
    }
}

/// Run `commands` on one session of `connection`, closing it on every path.
async fn execute_commands(connection: &dyn DatabaseConnection, commands: &[MigrationCommand]) -> Result<()> {
    let mut session = connection.open().await?;
    let mut result = Ok(());
    for command in commands {
        if let Err(e) = session.execute_non_query(&command.sql).await {
            result = Err(e);
            break;
        }
    }
    session.close();
    result
}
