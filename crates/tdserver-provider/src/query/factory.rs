//! Construction of typed SQL expressions.

use std::sync::Arc;

use crate::metadata::ClrType;
use crate::storage::{SqlValue, StoreTypeMapping, TypeMappingSource};

use super::expressions::{BinaryOp, CaseWhen, SqlExpression, SqlExpressionKind, SqlFunction, UnaryOp};

/// Builds SQL expressions and assigns store type mappings to them.
#[derive(Clone)]
pub struct SqlExpressionFactory {
    type_mappings: Arc<TypeMappingSource>,
}

impl SqlExpressionFactory {
    pub fn new(type_mappings: Arc<TypeMappingSource>) -> Self {
        Self { type_mappings }
    }

    pub fn type_mappings(&self) -> &TypeMappingSource {
        &self.type_mappings
    }

    pub fn find_mapping(&self, clr_type: &ClrType) -> Option<StoreTypeMapping> {
        self.type_mappings.find_mapping_for_type(clr_type)
    }

    pub fn column(&self, table: Option<&str>, name: &str, clr_type: ClrType, nullable: bool) -> SqlExpression {
        let mapping = self.find_mapping(&clr_type);
        SqlExpression::new(
            SqlExpressionKind::Column {
                table: table.map(str::to_string),
                name: name.to_string(),
                nullable,
            },
            clr_type,
            mapping,
        )
    }

    /// Constant typed by its value. Mapping is left for inference.
    pub fn constant(&self, value: impl Into<SqlValue>) -> SqlExpression {
        let value = value.into();
        let clr_type = value.clr_type().unwrap_or(ClrType::Named("Object".to_string()));
        SqlExpression::new(SqlExpressionKind::Constant(value), clr_type, None)
    }

    pub fn typed_constant(&self, value: impl Into<SqlValue>, clr_type: ClrType) -> SqlExpression {
        SqlExpression::new(SqlExpressionKind::Constant(value.into()), clr_type, None)
    }

    pub fn parameter(&self, name: &str, clr_type: ClrType) -> SqlExpression {
        SqlExpression::new(SqlExpressionKind::Parameter(name.to_string()), clr_type, None)
    }

    pub fn fragment(&self, sql: impl Into<String>) -> SqlExpression {
        SqlExpression::new(
            SqlExpressionKind::Fragment(sql.into()),
            ClrType::Named("Fragment".to_string()),
            None,
        )
    }

    /// Built-in function with the default mapping of `clr_type`.
    pub fn function(&self, name: &str, arguments: Vec<SqlExpression>, clr_type: ClrType) -> SqlExpression {
        let mapping = self.find_mapping(&clr_type);
        self.function_with_mapping(name, arguments, clr_type, mapping)
    }

    pub fn function_with_mapping(
        &self,
        name: &str,
        arguments: Vec<SqlExpression>,
        clr_type: ClrType,
        type_mapping: Option<StoreTypeMapping>,
    ) -> SqlExpression {
        SqlExpression::new(
            SqlExpressionKind::Function(SqlFunction {
                schema: None,
                name: name.to_string(),
                arguments,
                is_builtin: true,
                is_niladic: false,
            }),
            clr_type,
            type_mapping,
        )
    }

    /// User-defined function; the schema is filled in by post-processing when absent.
    pub fn user_function(
        &self,
        schema: Option<&str>,
        name: &str,
        arguments: Vec<SqlExpression>,
        clr_type: ClrType,
    ) -> SqlExpression {
        let mapping = self.find_mapping(&clr_type);
        SqlExpression::new(
            SqlExpressionKind::Function(SqlFunction {
                schema: schema.map(str::to_string),
                name: name.to_string(),
                arguments,
                is_builtin: false,
                is_niladic: false,
            }),
            clr_type,
            mapping,
        )
    }

    pub fn niladic(&self, name: &str, clr_type: ClrType) -> SqlExpression {
        let mapping = self.find_mapping(&clr_type);
        SqlExpression::new(
            SqlExpressionKind::Function(SqlFunction {
                schema: None,
                name: name.to_string(),
                arguments: Vec::new(),
                is_builtin: true,
                is_niladic: true,
            }),
            clr_type,
            mapping,
        )
    }

    /// Explicit conversion. A no-op when the operand already has `clr_type`.
    pub fn convert(&self, operand: SqlExpression, clr_type: ClrType) -> SqlExpression {
        if operand.clr_type == clr_type {
            return operand;
        }
        let mapping = self.find_mapping(&clr_type);
        let operand = self.apply_default_type_mapping(operand);
        SqlExpression::new(SqlExpressionKind::Convert(Box::new(operand)), clr_type, mapping)
    }

    /// Assign `mapping` to an expression that has none. Existing mappings win.
    pub fn apply_type_mapping(&self, mut expression: SqlExpression, mapping: Option<&StoreTypeMapping>) -> SqlExpression {
        if expression.type_mapping.is_none() {
            expression.type_mapping = mapping.cloned();
        }
        expression
    }

    pub fn apply_default_type_mapping(&self, expression: SqlExpression) -> SqlExpression {
        if expression.type_mapping.is_some() {
            return expression;
        }
        let mapping = self.find_mapping(&expression.clr_type);
        self.apply_type_mapping(expression, mapping.as_ref())
    }

    /// Mapping shared by two operands: the left one's when present, else the right one's.
    pub fn infer_type_mapping(&self, left: &SqlExpression, right: &SqlExpression) -> Option<StoreTypeMapping> {
        left.type_mapping
            .clone()
            .or_else(|| right.type_mapping.clone())
    }

    pub fn binary(&self, op: BinaryOp, left: SqlExpression, right: SqlExpression) -> SqlExpression {
        if op.is_comparison() || op.is_logical() {
            let mapping = if op.is_comparison() {
                self.infer_type_mapping(&left, &right)
            } else {
                None
            };
            let left = self.apply_type_mapping(left, mapping.as_ref());
            let right = self.apply_type_mapping(right, mapping.as_ref());
            return SqlExpression::new(
                SqlExpressionKind::Binary(op, Box::new(left), Box::new(right)),
                ClrType::Bool,
                self.find_mapping(&ClrType::Bool),
            );
        }
        let mapping = self.infer_type_mapping(&left, &right);
        let clr_type = left.clr_type.clone();
        let left = self.apply_type_mapping(left, mapping.as_ref());
        let right = self.apply_type_mapping(right, mapping.as_ref());
        SqlExpression::new(
            SqlExpressionKind::Binary(op, Box::new(left), Box::new(right)),
            clr_type,
            mapping,
        )
    }

    pub fn equal(&self, left: SqlExpression, right: SqlExpression) -> SqlExpression {
        self.binary(BinaryOp::Equal, left, right)
    }

    pub fn and(&self, left: SqlExpression, right: SqlExpression) -> SqlExpression {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or(&self, left: SqlExpression, right: SqlExpression) -> SqlExpression {
        self.binary(BinaryOp::Or, left, right)
    }

    pub fn not(&self, operand: SqlExpression) -> SqlExpression {
        let mapping = operand.type_mapping.clone();
        SqlExpression::new(SqlExpressionKind::Unary(UnaryOp::Not, Box::new(operand)), ClrType::Bool, mapping)
    }

    pub fn is_null(&self, operand: SqlExpression) -> SqlExpression {
        SqlExpression::new(
            SqlExpressionKind::Unary(UnaryOp::IsNull, Box::new(operand)),
            ClrType::Bool,
            self.find_mapping(&ClrType::Bool),
        )
    }

    pub fn case(&self, whens: Vec<CaseWhen>, else_result: Option<SqlExpression>) -> SqlExpression {
        let clr_type = whens
            .first()
            .map(|w| w.result.clr_type.clone())
            .unwrap_or(ClrType::Bool);
        let mapping = whens
            .iter()
            .find_map(|w| w.result.type_mapping.clone())
            .or_else(|| else_result.as_ref().and_then(|e| e.type_mapping.clone()))
            .or_else(|| self.find_mapping(&clr_type));
        SqlExpression::new(
            SqlExpressionKind::Case {
                whens,
                else_result: else_result.map(Box::new),
            },
            clr_type,
            mapping,
        )
    }
}
