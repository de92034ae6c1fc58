//! Method and member translators.
//!
//! A translator returns `Ok(None)` when it does not recognize a call so the
//! provider can try the next one, and an error when it recognizes the call but
//! the arguments cannot be expressed in SQL.

mod convert;
mod date_diff;
mod date_time;
mod full_text;
mod math;
mod new_guid;
mod object_to_string;
mod string;

use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;

use super::expressions::SqlExpression;
use super::factory::SqlExpressionFactory;
use super::signatures::{MemberSignature, MethodCatalog, MethodSignature};

pub use convert::ConvertTranslator;
pub use date_diff::DateDiffFunctionsTranslator;
pub use date_time::{DateTimeMemberTranslator, DateTimeMethodTranslator};
pub use full_text::FullTextSearchFunctionsTranslator;
pub use math::MathTranslator;
pub use new_guid::NewGuidTranslator;
pub use object_to_string::ObjectToStringTranslator;
pub use string::{StringMemberTranslator, StringMethodTranslator};

pub trait MethodCallTranslator: Send + Sync {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>>;
}

pub trait MemberTranslator: Send + Sync {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        member: &MemberSignature,
        return_type: &ClrType,
    ) -> Result<Option<SqlExpression>>;
}

/// Ordered method translators; the first result wins.
pub struct MethodCallTranslatorProvider {
    plugins: Vec<Box<dyn MethodCallTranslator>>,
    translators: Vec<Box<dyn MethodCallTranslator>>,
}

impl MethodCallTranslatorProvider {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let translators: Vec<Box<dyn MethodCallTranslator>> = vec![
            Box::new(MathTranslator::new(factory.clone(), catalog)?),
            Box::new(NewGuidTranslator::new(factory.clone(), catalog)?),
            Box::new(StringMethodTranslator::new(factory.clone(), catalog)?),
            Box::new(DateTimeMethodTranslator::new(factory.clone(), catalog)?),
            Box::new(DateDiffFunctionsTranslator::new(factory.clone(), catalog)?),
            Box::new(ConvertTranslator::new(factory.clone(), catalog)?),
            Box::new(ObjectToStringTranslator::new(factory.clone())),
            Box::new(FullTextSearchFunctionsTranslator::new(factory, catalog)?),
        ];
        Ok(Self {
            plugins: Vec::new(),
            translators,
        })
    }

    /// Translators contributed by extensions run before the provider's own.
    pub fn with_plugin(mut self, plugin: Box<dyn MethodCallTranslator>) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn len(&self) -> usize {
        self.plugins.len() + self.translators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn translate(
        &self,
        instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        for translator in self.plugins.iter().chain(&self.translators) {
            if let Some(sql) = translator.translate(instance, method, arguments)? {
                return Ok(Some(sql));
            }
        }
        Ok(None)
    }
}

/// Ordered member translators; the first result wins.
pub struct MemberTranslatorProvider {
    translators: Vec<Box<dyn MemberTranslator>>,
}

impl MemberTranslatorProvider {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let translators: Vec<Box<dyn MemberTranslator>> = vec![
            Box::new(DateTimeMemberTranslator::new(factory.clone(), catalog)?),
            Box::new(StringMemberTranslator::new(factory, catalog)?),
        ];
        Ok(Self { translators })
    }

    pub fn with_plugin(mut self, plugin: Box<dyn MemberTranslator>) -> Self {
        self.translators.insert(0, plugin);
        self
    }

    pub fn translate(
        &self,
        instance: Option<&SqlExpression>,
        member: &MemberSignature,
        return_type: &ClrType,
    ) -> Result<Option<SqlExpression>> {
        for translator in &self.translators {
            if let Some(sql) = translator.translate(instance, member, return_type)? {
                return Ok(Some(sql));
            }
        }
        Ok(None)
    }
}

/// Shared setup for translator tests.
#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use crate::storage::TypeMappingSource;

    use super::super::factory::SqlExpressionFactory;
    use super::super::signatures::MethodCatalog;

    pub fn factory() -> Arc<SqlExpressionFactory> {
        Arc::new(SqlExpressionFactory::new(Arc::new(TypeMappingSource::new())))
    }

    pub fn catalog() -> MethodCatalog {
        MethodCatalog::standard()
    }
}
