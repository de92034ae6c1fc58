//! SQL text for row modifications and sequence reads.

use crate::error::Result;
use crate::storage::sql_helper::{delimit_identifier, delimit_qualified, parameter_name, STATEMENT_TERMINATOR};

/// Kind of row modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    Insert,
    Update,
    Delete,
}

/// One row modification against a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationCommand {
    pub table: String,
    pub schema: Option<String>,
    pub kind: ModificationKind,
    /// Columns written (insert/update).
    pub write_columns: Vec<String>,
    /// Columns identifying the row (update/delete).
    pub condition_columns: Vec<String>,
}

impl ModificationCommand {
    pub fn insert(table: &str, schema: Option<&str>, columns: &[&str]) -> Self {
        Self::new(table, schema, ModificationKind::Insert, columns, &[])
    }

    pub fn update(table: &str, schema: Option<&str>, columns: &[&str], keys: &[&str]) -> Self {
        Self::new(table, schema, ModificationKind::Update, columns, keys)
    }

    pub fn delete(table: &str, schema: Option<&str>, keys: &[&str]) -> Self {
        Self::new(table, schema, ModificationKind::Delete, &[], keys)
    }

    fn new(
        table: &str,
        schema: Option<&str>,
        kind: ModificationKind,
        write: &[&str],
        condition: &[&str],
    ) -> Self {
        Self {
            table: table.to_string(),
            schema: schema.map(str::to_string),
            kind,
            write_columns: write.iter().map(|c| c.to_string()).collect(),
            condition_columns: condition.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Number of parameters the command binds.
    pub fn parameter_count(&self) -> usize {
        self.write_columns.len() + self.condition_columns.len()
    }
}

/// Generates modification and sequence statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateSqlGenerator;

impl UpdateSqlGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Statement returning the next value of a sequence.
    pub fn next_sequence_value_sql(&self, name: &str, schema: Option<&str>) -> Result<String> {
        Ok(format!("SELECT NEXT VALUE FOR {}", delimit_qualified(name, schema)?))
    }

    /// Append the statement for `command`, numbering parameters from
    /// `first_parameter`. Returns the next free parameter number.
    pub fn append(
        &self,
        sql: &mut String,
        command: &ModificationCommand,
        first_parameter: usize,
    ) -> Result<usize> {
        let table = delimit_qualified(&command.table, command.schema.as_deref())?;
        let mut next = first_parameter;
        let mut param = || {
            let name = parameter_name(&format!("p{}", next));
            next += 1;
            name
        };

        match command.kind {
            ModificationKind::Insert => {
                if command.write_columns.is_empty() {
                    sql.push_str(&format!("INSERT INTO {} DEFAULT VALUES", table));
                } else {
                    let columns = delimit_all(&command.write_columns)?;
                    let values: Vec<String> = command.write_columns.iter().map(|_| param()).collect();
                    sql.push_str(&format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        table,
                        columns.join(", "),
                        values.join(", ")
                    ));
                }
            }
            ModificationKind::Update => {
                let mut assignments = Vec::with_capacity(command.write_columns.len());
                for column in &command.write_columns {
                    assignments.push(format!("{} = {}", delimit_identifier(column)?, param()));
                }
                sql.push_str(&format!("UPDATE {} SET {}", table, assignments.join(", ")));
                append_where(sql, &command.condition_columns, &mut param)?;
            }
            ModificationKind::Delete => {
                sql.push_str(&format!("DELETE FROM {}", table));
                append_where(sql, &command.condition_columns, &mut param)?;
            }
        }
        sql.push_str(STATEMENT_TERMINATOR);
        sql.push('\n');
        Ok(next)
    }
}

fn delimit_all(columns: &[String]) -> Result<Vec<String>> {
    columns.iter().map(|c| delimit_identifier(c)).collect()
}

fn append_where(sql: &mut String, columns: &[String], param: &mut impl FnMut() -> String) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }
    let mut conditions = Vec::with_capacity(columns.len());
    for column in columns {
        conditions.push(format!("{} = {}", delimit_identifier(column)?, param()));
    }
    sql.push_str(" WHERE ");
    sql.push_str(&conditions.join(" AND "));
    Ok(())
}
