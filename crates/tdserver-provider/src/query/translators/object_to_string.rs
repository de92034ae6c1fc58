use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::MethodSignature;

use super::MethodCallTranslator;

/// Target type of `ToString()` per instance type, sized for the longest value.
fn store_type_for(clr_type: &ClrType) -> Option<&'static str> {
    let store_type = match clr_type {
        ClrType::Byte => "varchar(3)",
        ClrType::SByte | ClrType::Int16 => "varchar(6)",
        ClrType::Int32 => "varchar(11)",
        ClrType::Int64 => "varchar(20)",
        ClrType::Char => "varchar(1)",
        ClrType::Decimal | ClrType::Double | ClrType::Single => "varchar(100)",
        ClrType::DateTime | ClrType::DateTimeOffset | ClrType::TimeSpan => "varchar(100)",
        ClrType::Guid => "varchar(36)",
        _ => return None,
    };
    Some(store_type)
}

/// Parameterless `ToString()` on scalar instances as `CONVERT(varchar(n), instance)`.
///
/// Any declaring type qualifies, so there is no catalog entry to resolve.
pub struct ObjectToStringTranslator {
    factory: Arc<SqlExpressionFactory>,
}

impl ObjectToStringTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>) -> Self {
        Self { factory }
    }
}

impl MethodCallTranslator for ObjectToStringTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        let Some(instance) = instance else {
            return Ok(None);
        };
        if method.name != "ToString" || !arguments.is_empty() {
            return Ok(None);
        }
        let Some(store_type) = store_type_for(&instance.clr_type) else {
            return Ok(None);
        };
        let f = &self.factory;
        Ok(Some(f.function(
            "CONVERT",
            vec![f.fragment(store_type), instance.clone()],
            ClrType::String,
        )))
    }
}
