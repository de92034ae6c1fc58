//! SQL expression tree produced by translation and consumed by the SQL generator.

use crate::metadata::ClrType;
use crate::storage::{SqlValue, StoreTypeMapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanOrEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanOrEqual
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn sql(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::Equal => "=",
            BinaryOp::NotEqual => "<>",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    IsNull,
    IsNotNull,
}

/// Function call. Built-in functions are never schema-qualified.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFunction {
    pub schema: Option<String>,
    pub name: String,
    pub arguments: Vec<SqlExpression>,
    pub is_builtin: bool,
    /// Rendered without parentheses (`CURRENT_TIMESTAMP`).
    pub is_niladic: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhen {
    pub test: SqlExpression,
    pub result: SqlExpression,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpressionKind {
    Column {
        table: Option<String>,
        name: String,
        nullable: bool,
    },
    Constant(SqlValue),
    Parameter(String),
    /// Raw SQL text inserted as-is.
    Fragment(String),
    Function(SqlFunction),
    Convert(Box<SqlExpression>),
    Unary(UnaryOp, Box<SqlExpression>),
    Binary(BinaryOp, Box<SqlExpression>, Box<SqlExpression>),
    Case {
        whens: Vec<CaseWhen>,
        else_result: Option<Box<SqlExpression>>,
    },
}

/// Typed SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlExpression {
    pub kind: SqlExpressionKind,
    pub clr_type: ClrType,
    pub type_mapping: Option<StoreTypeMapping>,
}

impl SqlExpression {
    pub fn new(kind: SqlExpressionKind, clr_type: ClrType, type_mapping: Option<StoreTypeMapping>) -> Self {
        Self {
            kind,
            clr_type,
            type_mapping,
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self.kind, SqlExpressionKind::Column { .. })
    }

    pub fn as_constant(&self) -> Option<&SqlValue> {
        match &self.kind {
            SqlExpressionKind::Constant(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&SqlFunction> {
        match &self.kind {
            SqlExpressionKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this expression is a search condition rather than a value.
    pub fn is_condition(&self) -> bool {
        match &self.kind {
            SqlExpressionKind::Binary(op, _, _) => op.is_comparison() || op.is_logical(),
            SqlExpressionKind::Unary(op, _) => {
                matches!(op, UnaryOp::Not | UnaryOp::IsNull | UnaryOp::IsNotNull)
                    && self.clr_type == ClrType::Bool
            }
            SqlExpressionKind::Function(f) => {
                f.name.eq_ignore_ascii_case("FREETEXT") || f.name.eq_ignore_ascii_case("CONTAINS")
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub expression: SqlExpression,
    pub alias: Option<String>,
}

impl Projection {
    /// Alias used when the projection must be referenced from an outer query.
    pub fn output_name(&self, position: usize) -> String {
        if let Some(alias) = &self.alias {
            return alias.clone();
        }
        match &self.expression.kind {
            SqlExpressionKind::Column { name, .. } => name.clone(),
            _ => format!("c{}", position),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSource {
    pub name: String,
    pub schema: Option<String>,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub expression: SqlExpression,
    pub ascending: bool,
}

/// Single-table select with optional paging.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectExpression {
    pub projection: Vec<Projection>,
    pub tables: Vec<TableSource>,
    pub predicate: Option<SqlExpression>,
    pub orderings: Vec<Ordering>,
    pub limit: Option<SqlExpression>,
    pub offset: Option<SqlExpression>,
    pub is_distinct: bool,
}
