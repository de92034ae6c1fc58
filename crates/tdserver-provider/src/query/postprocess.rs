//! Passes applied to translated queries before SQL generation.
//!
//! Order: default-schema qualification of user functions, search-condition
//! conversion, then simplification. Simplification never turns a search
//! condition into a plain value: folded conditions become `1 = 1` or `0 = 1`.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use crate::metadata::ClrType;
use crate::storage::SqlValue;

use super::expressions::{
    BinaryOp, CaseWhen, Ordering, Projection, SelectExpression, SqlExpression, SqlExpressionKind, UnaryOp,
};
use super::factory::SqlExpressionFactory;

/// Schema given to user functions that do not name one.
pub const DEFAULT_FUNCTION_SCHEMA: &str = "dbo";

pub struct QueryPostprocessor {
    factory: Arc<SqlExpressionFactory>,
    default_schema: String,
}

impl QueryPostprocessor {
    pub fn new(factory: Arc<SqlExpressionFactory>) -> Self {
        Self {
            factory,
            default_schema: DEFAULT_FUNCTION_SCHEMA.to_string(),
        }
    }

    pub fn process(&self, select: SelectExpression) -> SelectExpression {
        let SelectExpression {
            projection,
            tables,
            predicate,
            orderings,
            limit,
            offset,
            is_distinct,
        } = select;
        SelectExpression {
            projection: projection
                .into_iter()
                .map(|p| Projection {
                    expression: self.process_expression(p.expression, false),
                    alias: p.alias,
                })
                .collect(),
            tables,
            predicate: predicate.map(|p| self.process_expression(p, true)),
            orderings: orderings
                .into_iter()
                .map(|o| Ordering {
                    expression: self.process_expression(o.expression, false),
                    ascending: o.ascending,
                })
                .collect(),
            limit: limit.map(|e| self.process_expression(e, false)),
            offset: offset.map(|e| self.process_expression(e, false)),
            is_distinct,
        }
    }

    /// Run all passes over one expression. `condition_required` is true for
    /// predicate positions.
    pub fn process_expression(&self, expression: SqlExpression, condition_required: bool) -> SqlExpression {
        let qualified = self.qualify_functions(expression);
        let converted = self.convert_search_conditions(qualified, condition_required);
        self.simplify(converted)
    }

    pub fn qualify_functions(&self, expression: SqlExpression) -> SqlExpression {
        let mut expression = map_children(expression, &mut |e| self.qualify_functions(e));
        if let SqlExpressionKind::Function(function) = &mut expression.kind {
            if !function.is_builtin && function.schema.as_deref().map_or(true, str::is_empty) {
                function.schema = Some(self.default_schema.clone());
            }
        }
        expression
    }

    /// Make conditions and values appear only where each is allowed.
    pub fn convert_search_conditions(&self, expression: SqlExpression, condition_required: bool) -> SqlExpression {
        let SqlExpression {
            kind,
            clr_type,
            type_mapping,
        } = expression;
        let kind = match kind {
            SqlExpressionKind::Binary(op, left, right) => {
                let operands_are_conditions = op.is_logical();
                SqlExpressionKind::Binary(
                    op,
                    Box::new(self.convert_search_conditions(*left, operands_are_conditions)),
                    Box::new(self.convert_search_conditions(*right, operands_are_conditions)),
                )
            }
            SqlExpressionKind::Unary(UnaryOp::Not, operand) if clr_type == ClrType::Bool => {
                SqlExpressionKind::Unary(UnaryOp::Not, Box::new(self.convert_search_conditions(*operand, true)))
            }
            SqlExpressionKind::Unary(op, operand) => {
                SqlExpressionKind::Unary(op, Box::new(self.convert_search_conditions(*operand, false)))
            }
            SqlExpressionKind::Case { whens, else_result } => SqlExpressionKind::Case {
                whens: whens
                    .into_iter()
                    .map(|w| CaseWhen {
                        test: self.convert_search_conditions(w.test, true),
                        result: self.convert_search_conditions(w.result, false),
                    })
                    .collect(),
                else_result: else_result.map(|e| Box::new(self.convert_search_conditions(*e, false))),
            },
            other => {
                let leaf = SqlExpression::new(other, clr_type.clone(), type_mapping.clone());
                map_children(leaf, &mut |e| self.convert_search_conditions(e, false)).kind
            }
        };
        let converted = SqlExpression::new(kind, clr_type, type_mapping);

        let f = &self.factory;
        if condition_required && !converted.is_condition() && converted.clr_type == ClrType::Bool {
            let truth = f.apply_type_mapping(
                f.typed_constant(true, ClrType::Bool),
                converted.type_mapping.as_ref(),
            );
            return f.equal(converted, truth);
        }
        if !condition_required && converted.is_condition() {
            let bool_mapping = f.find_mapping(&ClrType::Bool);
            let yes = f.apply_type_mapping(f.typed_constant(true, ClrType::Bool), bool_mapping.as_ref());
            let no = f.apply_type_mapping(f.typed_constant(false, ClrType::Bool), bool_mapping.as_ref());
            return f.case(
                vec![CaseWhen {
                    test: converted,
                    result: yes,
                }],
                Some(no),
            );
        }
        converted
    }

    /// Fold double negation, constant boolean operands and constant comparisons.
    pub fn simplify(&self, expression: SqlExpression) -> SqlExpression {
        let expression = map_children(expression, &mut |e| self.simplify(e));
        let is_condition = expression.is_condition();
        match &expression.kind {
            SqlExpressionKind::Unary(UnaryOp::Not, inner) => {
                if let SqlExpressionKind::Unary(UnaryOp::Not, innermost) = &inner.kind {
                    if innermost.clr_type == ClrType::Bool {
                        return (**innermost).clone();
                    }
                }
                if let Some(value) = bool_constant(inner) {
                    return self.bool_result(!value, is_condition);
                }
                expression
            }
            SqlExpressionKind::Binary(op @ (BinaryOp::And | BinaryOp::Or), left, right) => {
                let absorbing = *op == BinaryOp::Or;
                match (bool_constant(left), bool_constant(right)) {
                    (Some(l), _) if l == absorbing => self.bool_result(absorbing, true),
                    (_, Some(r)) if r == absorbing => self.bool_result(absorbing, true),
                    (Some(_), _) => (**right).clone(),
                    (_, Some(_)) => (**left).clone(),
                    _ => expression,
                }
            }
            SqlExpressionKind::Binary(op, _, _) if op.is_comparison() => match bool_constant(&expression) {
                Some(value) => self.bool_result(value, true),
                None => expression,
            },
            _ => expression,
        }
    }

    /// `1 = 1` / `0 = 1` where a condition is needed, a bool constant otherwise.
    fn bool_result(&self, value: bool, as_condition: bool) -> SqlExpression {
        let f = &self.factory;
        if !as_condition {
            let mapping = f.find_mapping(&ClrType::Bool);
            return f.apply_type_mapping(f.typed_constant(value, ClrType::Bool), mapping.as_ref());
        }
        let int = f.find_mapping(&ClrType::Int32);
        let left = f.apply_type_mapping(f.typed_constant(i32::from(value), ClrType::Int32), int.as_ref());
        let right = f.apply_type_mapping(f.typed_constant(1, ClrType::Int32), int.as_ref());
        f.equal(left, right)
    }
}

/// Boolean value of a constant or of a comparison between two constants.
fn bool_constant(expression: &SqlExpression) -> Option<bool> {
    match &expression.kind {
        SqlExpressionKind::Constant(SqlValue::Bool(b)) => Some(*b),
        SqlExpressionKind::Binary(op, left, right) if op.is_comparison() => {
            let ordering = compare_constants(left.as_constant()?, right.as_constant()?)?;
            Some(match op {
                BinaryOp::Equal => ordering == CmpOrdering::Equal,
                BinaryOp::NotEqual => ordering != CmpOrdering::Equal,
                BinaryOp::LessThan => ordering == CmpOrdering::Less,
                BinaryOp::LessThanOrEqual => ordering != CmpOrdering::Greater,
                BinaryOp::GreaterThan => ordering == CmpOrdering::Greater,
                BinaryOp::GreaterThanOrEqual => ordering != CmpOrdering::Less,
                _ => return None,
            })
        }
        _ => None,
    }
}

/// Null never compares.
fn compare_constants(left: &SqlValue, right: &SqlValue) -> Option<CmpOrdering> {
    match (left, right) {
        (SqlValue::Null, _) | (_, SqlValue::Null) => None,
        (SqlValue::Bool(a), SqlValue::Bool(b)) => Some(a.cmp(b)),
        (SqlValue::Bool(a), other) | (other, SqlValue::Bool(a)) if other.as_i64().is_some() => {
            let ordering = i64::from(*a).cmp(&other.as_i64()?);
            Some(if matches!(left, SqlValue::Bool(_)) { ordering } else { ordering.reverse() })
        }
        (SqlValue::Text(a), SqlValue::Text(b)) => Some(a.cmp(b)),
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ if a == b => Some(CmpOrdering::Equal),
            _ => None,
        },
    }
}

/// Rebuild `expression` with each direct child passed through `f`.
fn map_children(expression: SqlExpression, f: &mut impl FnMut(SqlExpression) -> SqlExpression) -> SqlExpression {
    let SqlExpression {
        kind,
        clr_type,
        type_mapping,
    } = expression;
    let kind = match kind {
        SqlExpressionKind::Function(mut function) => {
            function.arguments = function.arguments.into_iter().map(&mut *f).collect();
            SqlExpressionKind::Function(function)
        }
        SqlExpressionKind::Convert(operand) => SqlExpressionKind::Convert(Box::new(f(*operand))),
        SqlExpressionKind::Unary(op, operand) => SqlExpressionKind::Unary(op, Box::new(f(*operand))),
        SqlExpressionKind::Binary(op, left, right) => {
            let left = f(*left);
            SqlExpressionKind::Binary(op, Box::new(left), Box::new(f(*right)))
        }
        SqlExpressionKind::Case { whens, else_result } => SqlExpressionKind::Case {
            whens: whens
                .into_iter()
                .map(|w| CaseWhen {
                    test: f(w.test),
                    result: f(w.result),
                })
                .collect(),
            else_result: else_result.map(|e| Box::new(f(*e))),
        },
        leaf => leaf,
    };
    SqlExpression::new(kind, clr_type, type_mapping)
}
