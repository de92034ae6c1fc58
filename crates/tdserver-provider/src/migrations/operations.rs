//! Migration operations the provider can script.

use serde::{Deserialize, Serialize};

use super::annotation_provider::MigrationAnnotation;

/// A schema change to script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationOperation {
    CreateDatabase {
        name: String,
    },
    DropDatabase {
        name: String,
    },
    CreateSequence {
        name: String,
        schema: Option<String>,
        start_value: i64,
        increment_by: i32,
    },
    DropSequence {
        name: String,
        schema: Option<String>,
    },
    /// Raw SQL, optionally run outside a transaction.
    Sql {
        sql: String,
        suppress_transaction: bool,
    },
}

impl MigrationOperation {
    pub fn create_database(name: impl Into<String>) -> Self {
        MigrationOperation::CreateDatabase { name: name.into() }
    }

    pub fn drop_database(name: impl Into<String>) -> Self {
        MigrationOperation::DropDatabase { name: name.into() }
    }

    pub fn sql(sql: impl Into<String>) -> Self {
        MigrationOperation::Sql {
            sql: sql.into(),
            suppress_transaction: false,
        }
    }
}

/// A scripted statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationCommand {
    pub sql: String,
    /// Statements like CREATE DATABASE cannot run inside a transaction.
    pub transaction_suppressed: bool,
}

impl MigrationCommand {
    pub fn new(sql: impl Into<String>, transaction_suppressed: bool) -> Self {
        Self {
            sql: sql.into(),
            transaction_suppressed,
        }
    }
}

/// Operation paired with the dialect annotations attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedOperation {
    pub operation: MigrationOperation,
    pub annotations: Vec<MigrationAnnotation>,
}
