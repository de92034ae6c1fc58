//! Database connection over Tiberius with bb8 pooling.
//!
//! [`DatabaseConnection`] is the seam the database creator, the hi-lo
//! generator and the CLI talk to. [`TdServerConnection`] implements it over a
//! pooled TDS client; tests substitute in-memory fakes.
//!
//! Every [`DatabaseConnection::open`] hands out its own [`DatabaseSession`],
//! so operations sharing one connection never observe each other's
//! physical connection.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection, RunError};
use tiberius::{AuthMethod, Client, Config, EncryptionLevel};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

use crate::config::{ConnectionConfig, ProviderConfig};
use crate::error::{ProviderError, Result};

/// Connection pool timeouts.
const POOL_CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
const POOL_MAX_LIFETIME: Duration = Duration::from_secs(1800);
const TCP_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Connection the provider's administrative and sequence operations run on.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Database (catalog) name; empty when the login default is used.
    fn database(&self) -> &str;

    /// Server address, used in cache keys.
    fn data_source(&self) -> &str;

    fn command_timeout(&self) -> Option<Duration>;

    /// Open a physical connection owned by the caller. Server errors keep
    /// their error number.
    async fn open(&self) -> Result<Box<dyn DatabaseSession>>;

    /// Execute a statement on a session of its own and return the affected
    /// row count.
    async fn execute_non_query(&self, sql: &str) -> Result<u64> {
        let mut session = self.open().await?;
        let result = session.execute_non_query(sql).await;
        session.close();
        result
    }

    /// Execute a query on a session of its own and return the first column
    /// of the first row.
    async fn execute_scalar(&self, sql: &str) -> Result<Option<i64>> {
        let mut session = self.open().await?;
        let result = session.execute_scalar(sql).await;
        session.close();
        result
    }

    /// Drop pooled connections for this connection's target.
    fn clear_pool(&self);

    /// Drop every pooled connection in the process.
    fn clear_all_pools(&self);

    /// Connection to the administrative database used for CREATE/DROP DATABASE.
    fn create_master_connection(&self) -> Arc<dyn DatabaseConnection>;
}

/// One opened connection. Dropping it releases the connection.
#[async_trait]
pub trait DatabaseSession: Send {
    async fn execute_non_query(&mut self, sql: &str) -> Result<u64>;

    async fn execute_scalar(&mut self, sql: &str) -> Result<Option<i64>>;

    /// Release the connection.
    fn close(self: Box<Self>) {}
}

/// Connection manager for bb8 pool with Tiberius.
#[derive(Clone)]
pub struct TiberiusConnectionManager {
    config: ConnectionConfig,
}

impl TiberiusConnectionManager {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    fn build_config(&self) -> Config {
        let mut config = Config::new();
        config.host(&self.config.host);
        config.port(self.config.port);
        if !self.config.database.is_empty() {
            config.database(&self.config.database);
        }
        config.authentication(AuthMethod::sql_server(
            &self.config.user,
            &self.config.password,
        ));

        if self.config.is_encrypted() {
            if self.config.trust_server_cert {
                config.trust_cert();
            }
            config.encryption(EncryptionLevel::Required);
        } else {
            config.encryption(EncryptionLevel::NotSupported);
        }
        config
    }
}

#[async_trait]
impl bb8::ManageConnection for TiberiusConnectionManager {
    type Connection = Client<Compat<TcpStream>>;
    type Error = tiberius::error::Error;

    async fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        let config = self.build_config();
        let tcp = TcpStream::connect(config.get_addr()).await.map_err(|e| {
            tiberius::error::Error::Io {
                kind: e.kind(),
                message: e.to_string(),
            }
        })?;

        tcp.set_nodelay(true).ok();

        let std_tcp = tcp.into_std().map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: e.to_string(),
        })?;
        let socket = socket2::Socket::from(std_tcp);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(TCP_KEEPALIVE_INTERVAL)
            .with_interval(TCP_KEEPALIVE_INTERVAL);
        if let Err(e) = socket.set_tcp_keepalive(&keepalive) {
            warn!("Failed to set TCP keepalive on connection: {}", e);
        }

        let std_tcp: std::net::TcpStream = socket.into();
        std_tcp.set_nonblocking(true).ok();
        let tcp = TcpStream::from_std(std_tcp).map_err(|e| tiberius::error::Error::Io {
            kind: e.kind(),
            message: format!("Failed to convert socket: {}", e),
        })?;

        Client::connect(config, tcp.compat_write()).await
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.simple_query("SELECT 1").await?.into_row().await?;
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

type TdPool = Pool<TiberiusConnectionManager>;
type TdPooledConnection = PooledConnection<'static, TiberiusConnectionManager>;

/// Process-wide pools keyed by connection string.
///
/// Clearing removes the pool; its idle connections close when the last
/// handle drops and the next use builds a fresh pool.
#[derive(Default)]
pub struct PoolRegistry {
    pools: Mutex<HashMap<String, TdPool>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Existing pool for `config`, or a new lazily-connecting one.
    fn get_or_create(&self, config: &ConnectionConfig) -> Result<TdPool> {
        let key = config.connection_string();
        let mut pools = self
            .pools
            .lock()
            .map_err(|_| ProviderError::pool("pool registry lock poisoned", "get_or_create"))?;
        if let Some(pool) = pools.get(&key) {
            return Ok(pool.clone());
        }
        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(POOL_CONNECTION_TIMEOUT)
            .idle_timeout(Some(POOL_IDLE_TIMEOUT))
            .max_lifetime(Some(POOL_MAX_LIFETIME))
            .test_on_check_out(true)
            .build_unchecked(TiberiusConnectionManager::new(config.clone()));
        debug!(
            "Created connection pool for {}:{}/{} (pool_size={})",
            config.host, config.port, config.database, config.pool_size
        );
        pools.insert(key, pool.clone());
        Ok(pool)
    }

    pub fn clear(&self, config: &ConnectionConfig) {
        if let Ok(mut pools) = self.pools.lock() {
            if pools.remove(&config.connection_string()).is_some() {
                debug!("Cleared connection pool for {}/{}", config.host, config.database);
            }
        }
    }

    pub fn clear_all(&self) {
        if let Ok(mut pools) = self.pools.lock() {
            let count = pools.len();
            pools.clear();
            debug!("Cleared {} connection pools", count);
        }
    }

    pub fn len(&self) -> usize {
        self.pools.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pooled TDS connection.
pub struct TdServerConnection {
    config: ConnectionConfig,
    data_source: String,
    command_timeout: Option<Duration>,
    master_database: String,
    master_command_timeout: Duration,
    registry: Arc<PoolRegistry>,
}

impl TdServerConnection {
    pub fn new(config: &ProviderConfig, registry: Arc<PoolRegistry>) -> Self {
        Self {
            data_source: config.connection.data_source(),
            config: config.connection.clone(),
            command_timeout: config.options.command_timeout_secs.map(Duration::from_secs),
            master_database: config.admin.master_database.clone(),
            master_command_timeout: config.master_command_timeout(),
            registry,
        }
    }

    pub fn connection_config(&self) -> &ConnectionConfig {
        &self.config
    }

    async fn checkout(&self) -> Result<TdPooledConnection> {
        let pool = self.registry.get_or_create(&self.config)?;
        pool.get_owned().await.map_err(|e| match e {
            RunError::User(err) => ProviderError::from(err),
            RunError::TimedOut => ProviderError::pool(
                "timed out waiting for a connection",
                format!("opening connection to {}", self.data_source),
            ),
        })
    }
}

/// Pooled connection checked out for one operation; returns to its pool on
/// drop.
pub struct TdServerSession {
    conn: TdPooledConnection,
    command_timeout: Option<Duration>,
}

#[async_trait]
impl DatabaseSession for TdServerSession {
    async fn execute_non_query(&mut self, sql: &str) -> Result<u64> {
        debug!("Executing: {}", sql);
        let conn = &mut self.conn;
        with_timeout(self.command_timeout, async move {
            let result = conn.execute(sql, &[]).await?;
            Ok(result.total())
        })
        .await
    }

    async fn execute_scalar(&mut self, sql: &str) -> Result<Option<i64>> {
        debug!("Executing: {}", sql);
        let conn = &mut self.conn;
        with_timeout(self.command_timeout, async move {
            let row = conn.simple_query(sql).await?.into_row().await?;
            let Some(row) = row else {
                return Ok(None);
            };
            let value = match row.try_get::<i32, usize>(0) {
                Ok(v) => v.map(i64::from),
                Err(_) => row.try_get::<i64, usize>(0)?,
            };
            Ok(value)
        })
        .await
    }
}

async fn with_timeout<T, F>(limit: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send,
{
    match limit {
        None => fut.await,
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            ProviderError::Driver(tiberius::error::Error::Io {
                kind: std::io::ErrorKind::TimedOut,
                message: format!("command timed out after {:?}", limit),
            })
        })?,
    }
}

#[async_trait]
impl DatabaseConnection for TdServerConnection {
    fn database(&self) -> &str {
        &self.config.database
    }

    fn data_source(&self) -> &str {
        &self.data_source
    }

    fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    async fn open(&self) -> Result<Box<dyn DatabaseSession>> {
        Ok(Box::new(TdServerSession {
            conn: self.checkout().await?,
            command_timeout: self.command_timeout,
        }))
    }

    fn clear_pool(&self) {
        self.registry.clear(&self.config);
    }

    fn clear_all_pools(&self) {
        self.registry.clear_all();
    }

    fn create_master_connection(&self) -> Arc<dyn DatabaseConnection> {
        Arc::new(Self {
            config: self.config.with_database(&self.master_database),
            data_source: self.data_source.clone(),
            command_timeout: Some(self.master_command_timeout),
            master_database: self.master_database.clone(),
            master_command_timeout: self.master_command_timeout,
            registry: Arc::clone(&self.registry),
        })
    }
}
