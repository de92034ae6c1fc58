//! Scripts for the applied-migrations history table.

use crate::error::Result;
use crate::storage::sql_helper::{delimit_identifier, delimit_qualified, escape_literal};
use crate::storage::DatabaseConnection;

pub const DEFAULT_TABLE_NAME: &str = "__EFMigrationsHistory";

/// Row of the history table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub migration_id: String,
    pub product_version: String,
}

impl HistoryRow {
    pub fn new(migration_id: impl Into<String>, product_version: impl Into<String>) -> Self {
        Self {
            migration_id: migration_id.into(),
            product_version: product_version.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryRepository {
    table: String,
    schema: Option<String>,
}

impl Default for HistoryRepository {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE_NAME, None)
    }
}

impl HistoryRepository {
    pub fn new(table: impl Into<String>, schema: Option<String>) -> Self {
        Self {
            table: table.into(),
            schema,
        }
    }

    fn qualified_table(&self) -> Result<String> {
        delimit_qualified(&self.table, self.schema.as_deref())
    }

    /// Count of history tables visible in the current database.
    pub fn exists_sql(&self) -> String {
        let database = match &self.schema {
            Some(schema) => format!("'{}'", escape_literal(schema)),
            None => "(SELECT DATABASE)".to_string(),
        };
        format!(
            "SELECT COUNT(*) FROM dbc.TablesV WHERE DataBaseName={} AND TableName='{}'",
            database,
            escape_literal(&self.table)
        )
    }

    pub async fn exists(&self, connection: &dyn DatabaseConnection) -> Result<bool> {
        Ok(connection.execute_scalar(&self.exists_sql()).await?.unwrap_or(0) > 0)
    }

    pub fn create_script(&self) -> Result<String> {
        let pk = delimit_identifier(&format!("PK_{}", self.table))?;
        Ok(format!(
            "CREATE TABLE {} (\n    [MigrationId] varchar(150) NOT NULL,\n    [ProductVersion] varchar(32) NOT NULL,\n    CONSTRAINT {} PRIMARY KEY ([MigrationId])\n);\n",
            self.qualified_table()?,
            pk
        ))
    }

    pub fn insert_script(&self, row: &HistoryRow) -> Result<String> {
        Ok(format!(
            "INSERT INTO {} ([MigrationId], [ProductVersion])\nVALUES ('{}', '{}');\n",
            self.qualified_table()?,
            escape_literal(&row.migration_id),
            escape_literal(&row.product_version)
        ))
    }

    pub fn delete_script(&self, migration_id: &str) -> Result<String> {
        Ok(format!(
            "DELETE FROM {}\nWHERE [MigrationId] = '{}';\n",
            self.qualified_table()?,
            escape_literal(migration_id)
        ))
    }

    pub fn applied_migrations_sql(&self) -> Result<String> {
        Ok(format!(
            "SELECT [MigrationId], [ProductVersion] FROM {} ORDER BY [MigrationId];",
            self.qualified_table()?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_script() {
        let script = HistoryRepository::default().create_script().unwrap();
        assert!(script.starts_with("CREATE TABLE [__EFMigrationsHistory] ("));
        assert!(script.contains("CONSTRAINT [PK___EFMigrationsHistory] PRIMARY KEY ([MigrationId])"));
    }

    #[test]
    fn test_insert_escapes_literals() {
        let repo = HistoryRepository::new("History", Some("ops".into()));
        let sql = repo
            .insert_script(&HistoryRow::new("2024_O'Brien", "3.1.0"))
            .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO [ops].[History] ([MigrationId], [ProductVersion])\nVALUES ('2024_O''Brien', '3.1.0');\n"
        );
    }

    #[test]
    fn test_exists_sql_defaults_to_current_database() {
        let sql = HistoryRepository::default().exists_sql();
        assert_eq!(
            sql,
            "SELECT COUNT(*) FROM dbc.TablesV WHERE DataBaseName=(SELECT DATABASE) AND TableName='__EFMigrationsHistory'"
        );
    }

    #[test]
    fn test_delete_script() {
        let sql = HistoryRepository::default().delete_script("M1").unwrap();
        assert_eq!(sql, "DELETE FROM [__EFMigrationsHistory]\nWHERE [MigrationId] = 'M1';\n");
    }
}
