use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{accepts_time_span, MethodCatalog, MethodSignature, ParamType, DATE_DIFF_UNITS, DB_FUNCTIONS};

use super::MethodCallTranslator;

/// `DateDiffYear` through `DateDiffNanosecond` as `DATEDIFF(UNIT, start, end)`.
pub struct DateDiffFunctionsTranslator {
    factory: Arc<SqlExpressionFactory>,
    units: HashMap<MethodSignature, &'static str>,
}

impl DateDiffFunctionsTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let mut units = HashMap::new();
        for (unit, sql_unit) in DATE_DIFF_UNITS {
            let name = format!("DateDiff{}", unit);
            let mut operands = vec![ClrType::DateTime, ClrType::DateTimeOffset];
            if accepts_time_span(unit) {
                operands.push(ClrType::TimeSpan);
            }
            for operand in operands {
                for nullable in [false, true] {
                    let param = ParamType {
                        clr_type: operand.clone(),
                        nullable,
                    };
                    let signature = catalog.resolve(
                        DB_FUNCTIONS,
                        &name,
                        &[ParamType::of(ClrType::DbFunctions), param.clone(), param],
                    )?;
                    units.insert(signature, sql_unit);
                }
            }
        }
        Ok(Self { factory, units })
    }
}

impl MethodCallTranslator for DateDiffFunctionsTranslator {
    fn translate(
        &self,
        _instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        let (Some(&unit), [_, start, end]) = (self.units.get(method), arguments) else {
            return Ok(None);
        };
        let f = &self.factory;
        let mapping = f.infer_type_mapping(start, end);
        let start = f.apply_type_mapping(start.clone(), mapping.as_ref());
        let end = f.apply_type_mapping(end.clone(), mapping.as_ref());
        Ok(Some(f.function(
            "DATEDIFF",
            vec![f.fragment(unit), start, end],
            ClrType::Int32,
        )))
    }
}
