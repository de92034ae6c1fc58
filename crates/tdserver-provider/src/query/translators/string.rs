use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;
use crate::query::expressions::{BinaryOp, SqlExpression};
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{MemberSignature, MethodCatalog, MethodSignature, ParamType};

use super::{MemberTranslator, MethodCallTranslator};

/// `string.Length` as `CONVERT(LENGTH(instance))` to the host's length type.
///
/// LENGTH returns a 64-bit count; the host expects the member's own type.
pub struct StringMemberTranslator {
    factory: Arc<SqlExpressionFactory>,
    length: MemberSignature,
}

impl StringMemberTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let length = catalog.resolve_member("String", "Length")?;
        Ok(Self { factory, length })
    }
}

impl MemberTranslator for StringMemberTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        member: &MemberSignature,
        return_type: &ClrType,
    ) -> Result<Option<SqlExpression>> {
        match instance {
            Some(instance) if *member == self.length && instance.clr_type == ClrType::String => {
                let f = &self.factory;
                let length = f.function("LENGTH", vec![instance.clone()], ClrType::Int64);
                Ok(Some(f.convert(length, return_type.clone())))
            }
            _ => Ok(None),
        }
    }
}

/// Case mapping, trimming, substring and replace on string instances.
pub struct StringMethodTranslator {
    factory: Arc<SqlExpressionFactory>,
    to_upper: MethodSignature,
    to_lower: MethodSignature,
    trim: MethodSignature,
    substring: MethodSignature,
    replace: MethodSignature,
}

impl StringMethodTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let int = ParamType::of(ClrType::Int32);
        let string = ParamType::of(ClrType::String);
        Ok(Self {
            to_upper: catalog.resolve("String", "ToUpper", &[])?,
            to_lower: catalog.resolve("String", "ToLower", &[])?,
            trim: catalog.resolve("String", "Trim", &[])?,
            substring: catalog.resolve("String", "Substring", &[int.clone(), int])?,
            replace: catalog.resolve("String", "Replace", &[string.clone(), string])?,
            factory,
        })
    }
}

impl MethodCallTranslator for StringMethodTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        let Some(instance) = instance else {
            return Ok(None);
        };
        let f = &self.factory;
        let mapping = instance.type_mapping.clone();
        let sql = if *method == self.to_upper {
            f.function_with_mapping("UPPER", vec![instance.clone()], ClrType::String, mapping)
        } else if *method == self.to_lower {
            f.function_with_mapping("LOWER", vec![instance.clone()], ClrType::String, mapping)
        } else if *method == self.trim {
            f.function_with_mapping("TRIM", vec![instance.clone()], ClrType::String, mapping)
        } else if *method == self.substring {
            let [start, length] = arguments else {
                return Ok(None);
            };
            // Host offsets are zero-based.
            let start = f.binary(BinaryOp::Add, start.clone(), f.constant(1));
            f.function_with_mapping(
                "SUBSTRING",
                vec![instance.clone(), start, length.clone()],
                ClrType::String,
                mapping,
            )
        } else if *method == self.replace {
            let [old, new] = arguments else {
                return Ok(None);
            };
            let old = f.apply_type_mapping(old.clone(), mapping.as_ref());
            let new = f.apply_type_mapping(new.clone(), mapping.as_ref());
            f.function_with_mapping("REPLACE", vec![instance.clone(), old, new], ClrType::String, mapping)
        } else {
            return Ok(None);
        };
        Ok(Some(sql))
    }
}
