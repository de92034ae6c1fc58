//! Configuration validation.

use super::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::storage::sql_helper::validate_identifier;

/// Validate the configuration.
pub fn validate(config: &ProviderConfig) -> Result<()> {
    // Connection validation
    if config.connection.host.is_empty() {
        return Err(ProviderError::Config("connection.host is required".into()));
    }
    if config.connection.user.is_empty() {
        return Err(ProviderError::Config("connection.user is required".into()));
    }
    if !config.connection.database.is_empty() {
        validate_identifier(&config.connection.database)?;
    }
    if config.connection.pool_size == 0 {
        return Err(ProviderError::Config(
            "connection.pool_size must be at least 1".into(),
        ));
    }

    // Options validation - only check if explicitly set
    if let Some(0) = config.options.max_batch_size {
        return Err(ProviderError::Config(
            "options.max_batch_size must be at least 1".into(),
        ));
    }
    if let Some(0) = config.options.command_timeout_secs {
        return Err(ProviderError::Config(
            "options.command_timeout_secs must be at least 1".into(),
        ));
    }

    // Admin validation
    if config.admin.master_database.is_empty() {
        return Err(ProviderError::Config(
            "admin.master_database is required".into(),
        ));
    }
    if config.admin.retry_timeout_secs == 0 {
        return Err(ProviderError::Config(
            "admin.retry_timeout_secs must be at least 1".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AdminConfig, ConnectionConfig, ProviderOptions, RetryConfig};
    use crate::storage::ErrorCodeTable;

    fn valid_config() -> ProviderConfig {
        ProviderConfig {
            connection: ConnectionConfig {
                host: "localhost".to_string(),
                port: 1433,
                database: "Sales".to_string(),
                user: "dbc".to_string(),
                password: "password".to_string(),
                encrypt: "false".to_string(),
                trust_server_cert: true,
                pool_size: 4,
            },
            options: ProviderOptions::default(),
            admin: AdminConfig::default(),
            error_codes: ErrorCodeTable::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let config = valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.connection.host = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_user() {
        let mut config = valid_config();
        config.connection.user = "".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_empty_database_is_allowed() {
        let mut config = valid_config();
        config.connection.database = "".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_database_with_null_byte() {
        let mut config = valid_config();
        config.connection.database = "Sales\0; DROP".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = valid_config();
        config.options.max_batch_size = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_retry_config_is_accepted() {
        let mut config = valid_config();
        config.options.retry_on_failure = Some(RetryConfig {
            max_retry_count: 3,
            max_retry_delay_secs: 5,
            error_numbers_to_add: vec![-1, 1807],
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_connection_config_debug_redacts_password() {
        let mut config = valid_config();
        config.connection.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.connection);
        assert!(
            debug_output.contains("[REDACTED]"),
            "Debug output should contain [REDACTED]"
        );
        assert!(
            !debug_output.contains("super_secret_password_123"),
            "Debug output should not contain actual password value"
        );
    }

    #[test]
    fn test_provider_config_debug_redacts_password() {
        let mut config = valid_config();
        config.connection.password = "super_secret_password_456".to_string();
        let debug_output = format!("{:?}", config);
        assert!(!debug_output.contains("super_secret_password_456"));
    }
}
