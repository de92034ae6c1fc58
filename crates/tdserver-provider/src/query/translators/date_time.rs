use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::metadata::ClrType;
use crate::query::expressions::SqlExpression;
use crate::query::factory::SqlExpressionFactory;
use crate::query::signatures::{MemberSignature, MethodCatalog, MethodSignature, ParamType};

use super::{MemberTranslator, MethodCallTranslator};

const ADD_METHODS: [(&str, &str); 7] = [
    ("AddYears", "year"),
    ("AddMonths", "month"),
    ("AddDays", "day"),
    ("AddHours", "hour"),
    ("AddMinutes", "minute"),
    ("AddSeconds", "second"),
    ("AddMilliseconds", "millisecond"),
];

/// `AddYears` through `AddMilliseconds` as `DATEADD(part, CONVERT(int, n), instance)`.
pub struct DateTimeMethodTranslator {
    factory: Arc<SqlExpressionFactory>,
    date_parts: HashMap<MethodSignature, &'static str>,
}

impl DateTimeMethodTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let mut date_parts = HashMap::new();
        for owner in [ClrType::DateTime, ClrType::DateTimeOffset] {
            for (name, part) in ADD_METHODS {
                let amount = match part {
                    "year" | "month" => ClrType::Int32,
                    _ => ClrType::Double,
                };
                let signature = catalog.resolve(owner.name(), name, &[ParamType::of(amount)])?;
                date_parts.insert(signature, part);
            }
        }
        Ok(Self { factory, date_parts })
    }
}

impl MethodCallTranslator for DateTimeMethodTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        method: &MethodSignature,
        arguments: &[SqlExpression],
    ) -> Result<Option<SqlExpression>> {
        let (Some(&part), Some(instance), [amount]) = (self.date_parts.get(method), instance, arguments) else {
            return Ok(None);
        };

        // Sub-month amounts outside the int range would be truncated by CONVERT.
        if part != "year" && part != "month" {
            if let Some(value) = amount.as_constant().and_then(|v| v.as_f64()) {
                if value >= i32::MAX as f64 || value <= i32::MIN as f64 {
                    return Ok(None);
                }
            }
        }

        let f = &self.factory;
        Ok(Some(f.function_with_mapping(
            "DATEADD",
            vec![
                f.fragment(part),
                f.convert(amount.clone(), ClrType::Int32),
                instance.clone(),
            ],
            instance.clr_type.clone(),
            instance.type_mapping.clone(),
        )))
    }
}

/// `DateTime.Now`, `DateTime.Today` and the date-part members.
pub struct DateTimeMemberTranslator {
    factory: Arc<SqlExpressionFactory>,
    members: Vec<MemberSignature>,
}

impl DateTimeMemberTranslator {
    pub fn new(factory: Arc<SqlExpressionFactory>, catalog: &MethodCatalog) -> Result<Self> {
        let members = ["Now", "Today", "Year", "Month", "Day", "Hour", "Minute", "Second"]
            .iter()
            .map(|m| catalog.resolve_member("DateTime", m))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { factory, members })
    }
}

impl MemberTranslator for DateTimeMemberTranslator {
    fn translate(
        &self,
        instance: Option<&SqlExpression>,
        member: &MemberSignature,
        return_type: &ClrType,
    ) -> Result<Option<SqlExpression>> {
        if !self.members.contains(member) {
            return Ok(None);
        }
        let f = &self.factory;
        let sql = match (member.name.as_str(), instance) {
            ("Now", None) => f.niladic("CURRENT_TIMESTAMP", ClrType::DateTime),
            ("Today", None) => f.niladic("CURRENT_DATE", ClrType::DateTime),
            (part, Some(instance)) if part != "Now" && part != "Today" => f.function(
                "DATEPART",
                vec![f.fragment(part.to_ascii_lowercase()), instance.clone()],
                return_type.clone(),
            ),
            _ => return Ok(None),
        };
        Ok(Some(sql))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{catalog, factory};
    use super::*;
    use crate::query::expressions::SqlExpressionKind;
    use crate::query::QuerySqlGenerator;

    fn add(owner: ClrType, name: &str, amount: ClrType) -> MethodSignature {
        catalog().resolve(owner.name(), name, &[ParamType::of(amount)]).unwrap()
    }

    #[test]
    fn test_add_days_renders_dateadd() {
        let f = factory();
        let translator = DateTimeMethodTranslator::new(f.clone(), &catalog()).unwrap();
        let instance = f.column(Some("o"), "OrderDate", ClrType::DateTime, false);
        let sql = translator
            .translate(
                Some(&instance),
                &add(ClrType::DateTime, "AddDays", ClrType::Double),
                &[f.constant(3.0)],
            )
            .unwrap()
            .unwrap();
        assert_eq!(sql.type_mapping, instance.type_mapping);
        let text = QuerySqlGenerator::new(false).generate_expression(&sql).unwrap();
        assert_eq!(text, "DATEADD(day, CONVERT(int, 3E0), [o].[OrderDate])");
    }

    #[test]
    fn test_out_of_range_sub_month_amount_is_not_translated() {
        let f = factory();
        let translator = DateTimeMethodTranslator::new(f.clone(), &catalog()).unwrap();
        let instance = f.column(None, "At", ClrType::DateTimeOffset, false);
        let method = add(ClrType::DateTimeOffset, "AddSeconds", ClrType::Double);
        let huge = f.constant(i32::MAX as f64);
        assert!(translator.translate(Some(&instance), &method, &[huge]).unwrap().is_none());
        let negative = f.constant(i32::MIN as f64);
        assert!(translator.translate(Some(&instance), &method, &[negative]).unwrap().is_none());
    }

    #[test]
    fn test_years_are_not_range_checked() {
        let f = factory();
        let translator = DateTimeMethodTranslator::new(f.clone(), &catalog()).unwrap();
        let instance = f.column(None, "At", ClrType::DateTime, false);
        let method = add(ClrType::DateTime, "AddYears", ClrType::Int32);
        let sql = translator
            .translate(Some(&instance), &method, &[f.constant(i32::MAX)])
            .unwrap();
        assert!(sql.is_some());
    }

    #[test]
    fn test_now_is_niladic() {
        let f = factory();
        let translator = DateTimeMemberTranslator::new(f.clone(), &catalog()).unwrap();
        let now = MemberSignature::new("DateTime", "Now");
        let sql = translator.translate(None, &now, &ClrType::DateTime).unwrap().unwrap();
        match sql.kind {
            SqlExpressionKind::Function(func) => assert!(func.is_niladic),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
