//! SQL text for translated select expressions.

use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::storage::sql_helper::{delimit_identifier, delimit_qualified, parameter_name};
use crate::storage::{SqlValue, StoreTypeMapping, TypeMappingSource};

use super::expressions::{SelectExpression, SqlExpression, SqlExpressionKind, UnaryOp};

/// Column added by row-number paging.
pub const ROW_NUMBER_COLUMN: &str = "__RowNumber__";
const ROW_NUMBER_CTE: &str = "numbered";

pub struct QuerySqlGenerator {
    row_number_paging: bool,
    type_mappings: Arc<TypeMappingSource>,
}

impl QuerySqlGenerator {
    pub fn new(row_number_paging: bool) -> Self {
        Self::with_type_mappings(row_number_paging, Arc::new(TypeMappingSource::new()))
    }

    pub fn with_type_mappings(row_number_paging: bool, type_mappings: Arc<TypeMappingSource>) -> Self {
        Self {
            row_number_paging,
            type_mappings,
        }
    }

    pub fn generate(&self, select: &SelectExpression) -> Result<String> {
        if self.row_number_paging && select.offset.is_some() {
            return self.generate_row_number_paging(select);
        }

        let mut sql = String::from("SELECT ");
        if select.is_distinct {
            sql.push_str("DISTINCT ");
        }
        // TOP only when there is no offset; otherwise OFFSET/FETCH carries the limit.
        if let (Some(limit), None) = (&select.limit, &select.offset) {
            sql.push_str("TOP(");
            self.visit(limit, &mut sql)?;
            sql.push_str(") ");
        }
        self.append_projection(select, false, &mut sql)?;
        self.append_from_where(select, &mut sql)?;

        if !select.orderings.is_empty() {
            sql.push_str("\nORDER BY ");
            self.append_orderings(select, &mut sql)?;
        } else if select.offset.is_some() {
            sql.push_str("\nORDER BY (SELECT 1)");
        }

        if let Some(offset) = &select.offset {
            sql.push_str("\nOFFSET ");
            self.visit(offset, &mut sql)?;
            sql.push_str(" ROWS");
            if let Some(limit) = &select.limit {
                sql.push_str(" FETCH NEXT ");
                self.visit(limit, &mut sql)?;
                sql.push_str(" ROWS ONLY");
            }
        }
        Ok(sql)
    }

    /// Paging through a numbered CTE for servers without OFFSET/FETCH.
    fn generate_row_number_paging(&self, select: &SelectExpression) -> Result<String> {
        let mut inner = String::from("SELECT ");
        if select.is_distinct {
            inner.push_str("DISTINCT ");
        }
        self.append_projection(select, true, &mut inner)?;
        inner.push_str(", ROW_NUMBER() OVER (ORDER BY ");
        if select.orderings.is_empty() {
            inner.push_str("(SELECT 1)");
        } else {
            self.append_orderings(select, &mut inner)?;
        }
        inner.push_str(") AS ");
        inner.push_str(&delimit_identifier(ROW_NUMBER_COLUMN)?);
        self.append_from_where(select, &mut inner)?;

        let row_number = delimit_identifier(ROW_NUMBER_COLUMN)?;
        let outer_columns = select
            .projection
            .iter()
            .enumerate()
            .map(|(i, p)| delimit_identifier(&p.output_name(i)))
            .collect::<Result<Vec<_>>>()?;
        let outer_columns = if outer_columns.is_empty() {
            "1".to_string()
        } else {
            outer_columns.join(", ")
        };

        let mut offset = String::new();
        if let Some(expr) = &select.offset {
            self.visit(expr, &mut offset)?;
        }
        let mut bounds = format!("{} > {}", row_number, offset);
        if let Some(limit) = &select.limit {
            let mut limit_sql = String::new();
            self.visit(limit, &mut limit_sql)?;
            bounds.push_str(&format!(" AND {} <= {} + {}", row_number, offset, limit_sql));
        }

        Ok(format!(
            "WITH {cte} AS (\n    {inner}\n)\nSELECT {columns} FROM {cte} WHERE {bounds}\nORDER BY {row_number}",
            cte = delimit_identifier(ROW_NUMBER_CTE)?,
            inner = inner.replace('\n', "\n    "),
            columns = outer_columns,
            bounds = bounds,
            row_number = row_number,
        ))
    }

    fn append_projection(&self, select: &SelectExpression, alias_all: bool, sql: &mut String) -> Result<()> {
        if select.projection.is_empty() {
            sql.push('1');
            return Ok(());
        }
        for (i, projection) in select.projection.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.visit(&projection.expression, sql)?;
            let is_bare_column = matches!(
                &projection.expression.kind,
                SqlExpressionKind::Column { name, .. } if projection.alias.as_deref().map_or(true, |a| a == name)
            );
            if !is_bare_column && (alias_all || projection.alias.is_some()) {
                sql.push_str(" AS ");
                sql.push_str(&delimit_identifier(&projection.output_name(i))?);
            }
        }
        Ok(())
    }

    fn append_from_where(&self, select: &SelectExpression, sql: &mut String) -> Result<()> {
        if !select.tables.is_empty() {
            sql.push_str("\nFROM ");
            for (i, table) in select.tables.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&delimit_qualified(&table.name, table.schema.as_deref())?);
                sql.push_str(" AS ");
                sql.push_str(&delimit_identifier(&table.alias)?);
            }
        }
        if let Some(predicate) = &select.predicate {
            sql.push_str("\nWHERE ");
            self.visit(predicate, sql)?;
        }
        Ok(())
    }

    fn append_orderings(&self, select: &SelectExpression, sql: &mut String) -> Result<()> {
        for (i, ordering) in select.orderings.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            self.visit(&ordering.expression, sql)?;
            if !ordering.ascending {
                sql.push_str(" DESC");
            }
        }
        Ok(())
    }

    /// SQL text of a single expression.
    pub fn generate_expression(&self, expression: &SqlExpression) -> Result<String> {
        let mut sql = String::new();
        self.visit(expression, &mut sql)?;
        Ok(sql)
    }

    fn visit(&self, expression: &SqlExpression, sql: &mut String) -> Result<()> {
        match &expression.kind {
            SqlExpressionKind::Column { table, name, .. } => {
                if let Some(table) = table {
                    sql.push_str(&delimit_identifier(table)?);
                    sql.push('.');
                }
                sql.push_str(&delimit_identifier(name)?);
            }
            SqlExpressionKind::Constant(value) => {
                sql.push_str(&self.literal(value, expression.type_mapping.as_ref()));
            }
            SqlExpressionKind::Parameter(name) => sql.push_str(&parameter_name(name)),
            SqlExpressionKind::Fragment(text) => sql.push_str(text),
            SqlExpressionKind::Function(function) => {
                if let Some(schema) = &function.schema {
                    sql.push_str(&delimit_identifier(schema)?);
                    sql.push('.');
                    sql.push_str(&delimit_identifier(&function.name)?);
                } else {
                    sql.push_str(&function.name);
                }
                if !function.is_niladic {
                    sql.push('(');
                    for (i, argument) in function.arguments.iter().enumerate() {
                        if i > 0 {
                            sql.push_str(", ");
                        }
                        self.visit(argument, sql)?;
                    }
                    sql.push(')');
                }
            }
            SqlExpressionKind::Convert(operand) => {
                let mapping = expression.type_mapping.as_ref().ok_or_else(|| {
                    ProviderError::Translation(format!("No store type for conversion to {}", expression.clr_type))
                })?;
                sql.push_str("CONVERT(");
                sql.push_str(mapping.store_type());
                sql.push_str(", ");
                self.visit(operand, sql)?;
                sql.push(')');
            }
            SqlExpressionKind::Unary(op, operand) => match op {
                UnaryOp::Not => {
                    sql.push_str("NOT (");
                    self.visit(operand, sql)?;
                    sql.push(')');
                }
                UnaryOp::Negate => {
                    sql.push('-');
                    self.visit_operand(operand, sql)?;
                }
                UnaryOp::IsNull => {
                    self.visit_operand(operand, sql)?;
                    sql.push_str(" IS NULL");
                }
                UnaryOp::IsNotNull => {
                    self.visit_operand(operand, sql)?;
                    sql.push_str(" IS NOT NULL");
                }
            },
            SqlExpressionKind::Binary(op, left, right) => {
                self.visit_operand(left, sql)?;
                sql.push(' ');
                sql.push_str(op.sql());
                sql.push(' ');
                self.visit_operand(right, sql)?;
            }
            SqlExpressionKind::Case { whens, else_result } => {
                sql.push_str("CASE");
                for when in whens {
                    sql.push_str(" WHEN ");
                    self.visit(&when.test, sql)?;
                    sql.push_str(" THEN ");
                    self.visit(&when.result, sql)?;
                }
                if let Some(else_result) = else_result {
                    sql.push_str(" ELSE ");
                    self.visit(else_result, sql)?;
                }
                sql.push_str(" END");
            }
        }
        Ok(())
    }

    /// Nested binary operations are parenthesized.
    fn visit_operand(&self, operand: &SqlExpression, sql: &mut String) -> Result<()> {
        if matches!(operand.kind, SqlExpressionKind::Binary(..)) {
            sql.push('(');
            self.visit(operand, sql)?;
            sql.push(')');
            Ok(())
        } else {
            self.visit(operand, sql)
        }
    }

    fn literal(&self, value: &SqlValue, mapping: Option<&StoreTypeMapping>) -> String {
        if let Some(mapping) = mapping {
            return mapping.sql_literal(value);
        }
        value
            .clr_type()
            .and_then(|t| self.type_mappings.find_mapping_for_type(&t))
            .map(|m| m.sql_literal(value))
            .unwrap_or_else(|| "NULL".to_string())
    }
}
