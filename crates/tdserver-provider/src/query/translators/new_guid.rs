use std::sync::Arc;

use crate::error::Result;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{MethodCatalog, MethodSignature};

use super::MethodCallTranslator;

/// `Guid.NewGuid()` as `NEWID()`.
pub struct NewGuidTranslator {
    factory: Arc<SqlExpressionFactory>,
    method: MethodSignature,
}

impl NewGuidTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let method = catalog.resolve("Guid", "NewGuid", &[])?;
        Ok(Self { factory, method })
    }
}

impl MethodCallTranslator for NewGuidTranslator {
    fn translate(
        &self,
        _instance: Option<&SqlExpression>,
        method: &MethodSignature,
        _arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        if *method != self.method {
            return Ok(None);
        }
        Ok(Some(self.factory.function("NEWID", Vec::new(), method.return_type.clone())))
    }
}
