use std::collections::HashSet;
use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{MethodCatalog, MethodSignature, ParamType};

use super::MethodCallTranslator;

/// `Convert.ToX` method name to the target type fragment.
const TARGET_TYPES: [(&str, &str); 7] = [
    ("ToByte", "tinyint"),
    ("ToDecimal", "decimal(18, 2)"),
    ("ToDouble", "float"),
    ("ToInt16", "smallint"),
    ("ToInt32", "int"),
    ("ToInt64", "bigint"),
    ("ToString", "varchar(64000)"),
];

/// Source types the conversions accept.
fn supported_sources() -> [ClrType; 9] {
    [
        ClrType::Byte,
        ClrType::DateTime,
        ClrType::Decimal,
        ClrType::Double,
        ClrType::Single,
        ClrType::Int32,
        ClrType::Int64,
        ClrType::Int16,
        ClrType::String,
    ]
}

/// `Convert.ToX(value)` as `CONVERT(type, value)`.
pub struct ConvertTranslator {
    factory: Arc<SqlExpressionFactory>,
    methods: HashSet<MethodSignature>,
}

impl ConvertTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let mut methods = HashSet::new();
        for (name, _) in TARGET_TYPES {
            for source in supported_sources() {
                methods.insert(catalog.resolve("Convert", name, &[ParamType::of(source)])?);
            }
        }
        Ok(Self { factory, methods })
    }
}

fn target_type(method: &str) -> Option<&'static str> {
    TARGET_TYPES
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, target)| *target)
}

impl MethodCallTranslator for ConvertTranslator {
    fn translate(
        &self,
        _instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        if !self.methods.contains(method) {
            return Ok(None);
        }
        let (Some(target), [value]) = (target_type(&method.name), arguments) else {
            return Ok(None);
        };
        let f = &self.factory;
        Ok(Some(f.function(
            "CONVERT",
            vec![f.fragment(target), value.clone()],
            method.return_type.clone(),
        )))
    }
}
