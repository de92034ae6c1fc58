use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ProviderError, Result};
use crate::metadata::ClrType;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{MethodCatalog, MethodSignature, ParamType, DB_FUNCTIONS};
use crate::storage::SqlValue;

use super::MethodCallTranslator;

const FREE_TEXT: &str = "FREETEXT";
const CONTAINS: &str = "CONTAINS";

/// `FreeText` and `Contains` full-text predicates, with an optional language term.
pub struct FullTextSearchFunctionsTranslator {
    factory: Arc<SqlExpressionFactory>,
    functions: HashMap<MethodSignature, &'static str>,
}

impl FullTextSearchFunctionsTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let receiver = ParamType::of(ClrType::DbFunctions);
        let text = ParamType::of(ClrType::String);
        let language = ParamType::of(ClrType::Int32);
        let mut functions = HashMap::new();
        for (name, sql) in [("FreeText", FREE_TEXT), ("Contains", CONTAINS)] {
            let plain = [receiver.clone(), text.clone(), text.clone()];
            let with_language = [receiver.clone(), text.clone(), text.clone(), language.clone()];
            functions.insert(catalog.resolve(DB_FUNCTIONS, name, &plain)?, sql);
            functions.insert(catalog.resolve(DB_FUNCTIONS, name, &with_language)?, sql);
        }
        Ok(Self { factory, functions })
    }
}

impl MethodCallTranslator for FullTextSearchFunctionsTranslator {
    fn translate(
        &self,
        _instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        let Some(&function) = self.functions.get(method) else {
            return Ok(None);
        };
        let (column, search, language) = match arguments {
            [_, column, search] => (column, search, None),
            [_, column, search, language] => (column, search, Some(language)),
            _ => return Ok(None),
        };
        if !column.is_column() {
            return Err(ProviderError::InvalidColumnNameForFreeText {
                function: function.to_string(),
            });
        }

        let f = &self.factory;
        let search = f.apply_type_mapping(search.clone(), column.type_mapping.as_ref());
        let mut function_arguments = vec![column.clone(), search];
        if let Some(language) = language {
            // Only integer constants are inlined into the fragment.
            match language.as_constant() {
                Some(SqlValue::Int(lcid)) => function_arguments.push(f.fragment(format!("LANGUAGE {}", lcid))),
                _ => {
                    return Err(ProviderError::Translation(format!(
                        "{} language term must be an integer constant",
                        function
                    )))
                }
            }
        }
        Ok(Some(f.function(function, function_arguments, ClrType::Bool)))
    }
}
