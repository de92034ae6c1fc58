use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{MethodCatalog, MethodSignature, ParamType};

use super::MethodCallTranslator;

/// `Math.Abs`, `Ceiling`, `Floor` and `Round`.
pub struct MathTranslator {
    factory: Arc<SqlExpressionFactory>,
    functions: HashMap<MethodSignature, &'static str>,
}

impl MathTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let mut functions = HashMap::new();
        for numeric in [
            ClrType::Decimal,
            ClrType::Double,
            ClrType::Single,
            ClrType::Int16,
            ClrType::Int32,
            ClrType::Int64,
            ClrType::SByte,
        ] {
            functions.insert(catalog.resolve("Math", "Abs", &[ParamType::of(numeric)])?, "ABS");
        }
        for numeric in [ClrType::Decimal, ClrType::Double] {
            let value = ParamType::of(numeric);
            functions.insert(catalog.resolve("Math", "Ceiling", &[value.clone()])?, "CEILING");
            functions.insert(catalog.resolve("Math", "Floor", &[value.clone()])?, "FLOOR");
            functions.insert(catalog.resolve("Math", "Round", &[value.clone()])?, "ROUND");
            let digits = ParamType::of(ClrType::Int32);
            functions.insert(catalog.resolve("Math", "Round", &[value, digits])?, "ROUND");
        }
        Ok(Self { factory, functions })
    }
}

impl MethodCallTranslator for MathTranslator {
    fn translate(
        &self,
        _instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        let Some(&name) = self.functions.get(method) else {
            return Ok(None);
        };
        let Some(value) = arguments.first() else {
            return Ok(None);
        };
        let f = &self.factory;
        let mut function_arguments = vec![value.clone()];
        if name == "ROUND" {
            function_arguments.push(arguments.get(1).cloned().unwrap_or_else(|| f.constant(0)));
        }
        Ok(Some(f.function_with_mapping(
            name,
            function_arguments,
            method.return_type.clone(),
            value.type_mapping.clone(),
        )))
    }
}
