//! Scripts migration operations as TdServer SQL.

use tracing::debug;

use crate::error::Result;
use crate::storage::sql_helper::{delimit_identifier, delimit_qualified, STATEMENT_TERMINATOR};

use super::operations::{MigrationCommand, MigrationOperation};

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationsSqlGenerator;

impl MigrationsSqlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Script `operations` in order, one command per operation.
    pub fn generate(&self, operations: &[MigrationOperation]) -> Result<Vec<MigrationCommand>> {
        let commands = operations
            .iter()
            .map(|op| self.generate_one(op))
            .collect::<Result<Vec<_>>>()?;
        debug!("Generated {} migration command(s)", commands.len());
        Ok(commands)
    }

    fn generate_one(&self, operation: &MigrationOperation) -> Result<MigrationCommand> {
        let command = match operation {
            MigrationOperation::CreateDatabase { name } => MigrationCommand::new(
                format!("CREATE DATABASE {}{}", delimit_identifier(name)?, STATEMENT_TERMINATOR),
                true,
            ),
            MigrationOperation::DropDatabase { name } => MigrationCommand::new(
                format!("DROP DATABASE {}{}", delimit_identifier(name)?, STATEMENT_TERMINATOR),
                true,
            ),
            MigrationOperation::CreateSequence {
                name,
                schema,
                start_value,
                increment_by,
            } => MigrationCommand::new(
                format!(
                    "CREATE SEQUENCE {} AS bigint START WITH {} INCREMENT BY {}{}",
                    delimit_qualified(name, schema.as_deref())?,
                    start_value,
                    increment_by,
                    STATEMENT_TERMINATOR
                ),
                false,
            ),
            MigrationOperation::DropSequence { name, schema } => MigrationCommand::new(
                format!(
                    "DROP SEQUENCE {}{}",
                    delimit_qualified(name, schema.as_deref())?,
                    STATEMENT_TERMINATOR
                ),
                false,
            ),
            MigrationOperation::Sql {
                sql,
                suppress_transaction,
            } => MigrationCommand::new(sql.clone(), *suppress_transaction),
        };
        Ok(command)
    }
}
