//! Configuration type definitions.

use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::storage::ErrorCodeTable;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Database connection.
    pub connection: ConnectionConfig,

    /// Provider options.
    #[serde(default)]
    pub options: ProviderOptions,

    /// Administrative operation tuning.
    #[serde(default)]
    pub admin: AdminConfig,

    /// Server error numbers used to classify connection failures.
    #[serde(default)]
    pub error_codes: ErrorCodeTable,
}

/// Database connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name. Empty means the login's default database.
    #[serde(default)]
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Encrypt connection (default: "true").
    #[serde(default = "default_true_string")]
    pub encrypt: String,

    /// Trust server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// Maximum pooled connections (default: 8).
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("pool_size", &self.pool_size)
            .finish()
    }
}

/// Provider options that change the generated SQL or runtime behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderOptions {
    /// Page with ROW_NUMBER() instead of OFFSET/FETCH.
    #[serde(default)]
    pub row_number_paging: bool,

    /// Command timeout in seconds. Unset uses the driver default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_timeout_secs: Option<u64>,

    /// Maximum commands per modification batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_batch_size: Option<usize>,

    /// Retry transient failures. Unset means no retries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_on_failure: Option<RetryConfig>,
}

impl ProviderOptions {
    /// Short description of non-default options for log output.
    pub fn log_fragment(&self) -> String {
        let mut fragment = String::new();
        if self.row_number_paging {
            fragment.push_str("RowNumberPaging ");
        }
        if let Some(size) = self.max_batch_size {
            fragment.push_str(&format!("MaxBatchSize={} ", size));
        }
        if let Some(timeout) = self.command_timeout_secs {
            fragment.push_str(&format!("CommandTimeout={} ", timeout));
        }
        if self.retry_on_failure.is_some() {
            fragment.push_str("RetryOnFailure ");
        }
        fragment
    }

    /// Fingerprint of the options that select a distinct service set.
    ///
    /// Only options that change generated SQL take part, so two option sets
    /// that differ only in timeouts share compiled queries.
    pub fn service_provider_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.row_number_paging.hash(&mut hasher);
        hasher.finish()
    }
}

/// Retrying execution strategy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum retry attempts (default: 6).
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,

    /// Upper bound of a single delay in seconds (default: 30).
    #[serde(default = "default_max_retry_delay_secs")]
    pub max_retry_delay_secs: u64,

    /// Extra server error numbers treated as transient.
    #[serde(default)]
    pub error_numbers_to_add: Vec<i32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_count: default_max_retry_count(),
            max_retry_delay_secs: default_max_retry_delay_secs(),
            error_numbers_to_add: Vec::new(),
        }
    }
}

/// Tuning of the create/exists/delete operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Delay between existence probes in milliseconds (default: 500).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Total existence probe budget in seconds (default: 60).
    #[serde(default = "default_retry_timeout_secs")]
    pub retry_timeout_secs: u64,

    /// Database used for CREATE/DROP DATABASE (default: "DBC").
    #[serde(default = "default_master_database")]
    pub master_database: String,

    /// Command timeout of the master connection when none is configured.
    #[serde(default = "default_master_command_timeout_secs")]
    pub master_command_timeout_secs: u64,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            retry_timeout_secs: default_retry_timeout_secs(),
            master_database: default_master_database(),
            master_command_timeout_secs: default_master_command_timeout_secs(),
        }
    }
}

// Default value functions for serde
fn default_port() -> u16 {
    1433
}

fn default_true_string() -> String {
    "true".to_string()
}

fn default_pool_size() -> u32 {
    8
}

fn default_max_retry_count() -> u32 {
    6
}

fn default_max_retry_delay_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_retry_timeout_secs() -> u64 {
    60
}

fn default_master_database() -> String {
    "DBC".to_string()
}

fn default_master_command_timeout_secs() -> u64 {
    60
}
