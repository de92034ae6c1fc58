//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Duration;

impl ProviderConfig {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProviderConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Compute a SHA256 hash of the configuration.
    pub fn hash(&self) -> String {
        let yaml = serde_yaml::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(yaml.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Command timeout of the master connection.
    pub fn master_command_timeout(&self) -> Duration {
        Duration::from_secs(
            self.options
                .command_timeout_secs
                .unwrap_or(self.admin.master_command_timeout_secs),
        )
    }
}

impl ConnectionConfig {
    /// Build an ADO-style connection string.
    pub fn connection_string(&self) -> String {
        let encrypt = match self.encrypt.to_lowercase().as_str() {
            "true" | "yes" | "1" => "true",
            "false" | "no" | "0" | "disable" => "false",
            _ => "true",
        };

        format!(
            "Server=tcp:{},{};Database={};User Id={};Password={};Encrypt={};TrustServerCertificate={}",
            self.host,
            self.port,
            self.database,
            self.user,
            self.password,
            encrypt,
            self.trust_server_cert
        )
    }

    /// Whether the connection should be encrypted.
    pub fn is_encrypted(&self) -> bool {
        !matches!(
            self.encrypt.to_lowercase().as_str(),
            "false" | "no" | "0" | "disable"
        )
    }

    /// Same connection pointed at another database.
    pub fn with_database(&self, database: &str) -> Self {
        Self {
            database: database.to_string(),
            ..self.clone()
        }
    }

    /// `host,port`, used in pool and cache keys.
    pub fn data_source(&self) -> String {
        format!("{},{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
connection:
  host: td.example.com
  database: Sales
  user: dbadmin
  password: hunter2
"#;

    #[test]
    fn test_minimal_yaml_uses_defaults() {
        let config = ProviderConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.connection.port, 1433);
        assert_eq!(config.connection.pool_size, 8);
        assert!(!config.options.row_number_paging);
        assert_eq!(config.admin.retry_delay_ms, 500);
        assert_eq!(config.admin.retry_timeout_secs, 60);
        assert_eq!(config.admin.master_database, "DBC");
        assert_eq!(config.error_codes.does_not_exist, vec![4060, 1832, 5120]);
    }

    #[test]
    fn test_master_timeout_prefers_configured_command_timeout() {
        let mut config = ProviderConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.master_command_timeout(), Duration::from_secs(60));
        config.options.command_timeout_secs = Some(55);
        assert_eq!(config.master_command_timeout(), Duration::from_secs(55));
    }

    #[test]
    fn test_retry_defaults() {
        let yaml = format!("{}options:\n  retry_on_failure: {{}}\n", MINIMAL);
        let config = ProviderConfig::from_yaml(&yaml).unwrap();
        let retry = config.options.retry_on_failure.unwrap();
        assert_eq!(retry.max_retry_count, 6);
        assert_eq!(retry.max_retry_delay_secs, 30);
    }

    #[test]
    fn test_connection_string() {
        let config = ProviderConfig::from_yaml(MINIMAL).unwrap();
        let cs = config.connection.connection_string();
        assert!(cs.contains("Server=tcp:td.example.com,1433"));
        assert!(cs.contains("Database=Sales"));
        assert!(cs.contains("Encrypt=true"));
    }

    #[test]
    fn test_with_database_keeps_credentials() {
        let config = ProviderConfig::from_yaml(MINIMAL).unwrap();
        let master = config.connection.with_database("DBC");
        assert_eq!(master.database, "DBC");
        assert_eq!(master.user, "dbadmin");
        assert_eq!(master.password, "hunter2");
    }

    #[test]
    fn test_hash_changes_with_options() {
        let a = ProviderConfig::from_yaml(MINIMAL).unwrap();
        let mut b = a.clone();
        b.options.row_number_paging = true;
        assert_ne!(a.hash(), b.hash());
        assert_eq!(a.hash(), a.clone().hash());
    }

    #[test]
    fn test_log_fragment_and_service_hash() {
        let mut options = ProviderOptions::default();
        assert_eq!(options.log_fragment(), "");
        let plain = options.service_provider_hash();

        options.row_number_paging = true;
        assert_eq!(options.log_fragment(), "RowNumberPaging ");
        assert_ne!(options.service_provider_hash(), plain);

        let paging = options.service_provider_hash();
        options.command_timeout_secs = Some(30);
        assert_eq!(options.service_provider_hash(), paging);
    }
}
