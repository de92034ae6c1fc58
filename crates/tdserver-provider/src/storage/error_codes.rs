//! Classification of server error numbers seen while probing a database.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// How an existence probe should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The database does not exist (and may be retried when it is expected to).
    DoesNotExist,
    /// Transient; clear the pool and try again.
    Retryable,
    /// Anything else; surface the error unchanged.
    Fatal,
}

/// Error numbers that mean "database does not exist" and "retry".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCodeTable {
    /// Login failed / cannot attach / cannot open the database file.
    #[serde(default = "default_does_not_exist")]
    pub does_not_exist: Vec<i32>,

    /// Transient connection failures worth another probe.
    #[serde(default = "default_retryable")]
    pub retryable: Vec<i32>,
}

impl Default for ErrorCodeTable {
    fn default() -> Self {
        Self {
            does_not_exist: default_does_not_exist(),
            retryable: default_retryable(),
        }
    }
}

impl ErrorCodeTable {
    pub fn is_does_not_exist(&self, err: &ProviderError) -> bool {
        err.error_number()
            .is_some_and(|n| self.does_not_exist.contains(&n))
    }

    pub fn is_retryable(&self, err: &ProviderError) -> bool {
        err.error_number().is_some_and(|n| self.retryable.contains(&n))
    }

    /// Classify a probe failure. Errors with no number are fatal.
    pub fn classify(&self, err: &ProviderError) -> ProbeFailure {
        if self.is_does_not_exist(err) {
            ProbeFailure::DoesNotExist
        } else if self.is_retryable(err) {
            ProbeFailure::Retryable
        } else {
            ProbeFailure::Fatal
        }
    }
}

fn default_does_not_exist() -> Vec<i32> {
    vec![4060, 1832, 5120]
}

fn default_retryable() -> Vec<i32> {
    vec![233, -2, 4060, 1832, 5120]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classification() {
        let table = ErrorCodeTable::default();
        assert_eq!(
            table.classify(&ProviderError::server(4060, "Cannot open database")),
            ProbeFailure::DoesNotExist
        );
        assert_eq!(
            table.classify(&ProviderError::server(233, "pipe closed")),
            ProbeFailure::Retryable
        );
        assert_eq!(
            table.classify(&ProviderError::server(-2, "timeout")),
            ProbeFailure::Retryable
        );
        assert_eq!(
            table.classify(&ProviderError::server(18456, "login failed")),
            ProbeFailure::Fatal
        );
        assert_eq!(
            table.classify(&ProviderError::Config("x".into())),
            ProbeFailure::Fatal
        );
    }

    #[test]
    fn test_does_not_exist_codes_are_also_retryable() {
        let table = ErrorCodeTable::default();
        for code in [4060, 1832, 5120] {
            let err = ProviderError::server(code, "missing");
            assert!(table.is_does_not_exist(&err));
            assert!(table.is_retryable(&err));
        }
    }

    #[test]
    fn test_custom_table_from_yaml() {
        let table: ErrorCodeTable = serde_yaml::from_str("does_not_exist: [3802]\n").unwrap();
        assert_eq!(table.does_not_exist, vec![3802]);
        assert_eq!(table.retryable, default_retryable());
        assert!(table.is_does_not_exist(&ProviderError::server(3802, "Database does not exist")));
    }
}
