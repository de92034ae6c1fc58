//! Checks run when a model is finalized.

use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::storage::TypeMappingSource;
use crate::value_generation::strategy::check_strategy;

use super::annotations::names;
use super::model::{EntityType, Model, Property, ValueGenerationStrategy};

/// Validates a finalized model: store-generation conflicts, strategy types,
/// column store types and identifier lengths.
#[derive(Default)]
pub struct ModelValidator {
    type_mappings: TypeMappingSource,
}

impl ModelValidator {
    pub fn new(type_mappings: TypeMappingSource) -> Self {
        Self { type_mappings }
    }

    pub fn validate(&self, model: &Model) -> Result<()> {
        let max_length = model.max_identifier_length();
        for entity in &model.entity_types {
            validate_identifier_length("Table", &entity.table, max_length)?;
            for property in &entity.properties {
                validate_store_generation(entity, property)?;
                check_strategy(
                    &entity.name,
                    property,
                    property.value_generation_strategy_annotation(),
                )?;
                validate_identifier_length("Column", &property.name, max_length)?;
                self.type_mappings.find_mapping_for_property(entity, property)?;
            }
        }
        debug!("Validated model with {} entity types", model.entity_types.len());
        Ok(())
    }
}

/// At most one of strategy, default value, default SQL and computed SQL.
pub fn validate_store_generation(entity: &EntityType, property: &Property) -> Result<()> {
    let mut configured = Vec::with_capacity(4);
    if property
        .value_generation_strategy_annotation()
        .is_some_and(|s| s != ValueGenerationStrategy::None)
    {
        configured.push(short_name(names::VALUE_GENERATION_STRATEGY));
    }
    if property.default_value().is_some() {
        configured.push(short_name(names::DEFAULT_VALUE));
    }
    if property.default_value_sql().is_some() {
        configured.push(short_name(names::DEFAULT_VALUE_SQL));
    }
    if property.computed_column_sql().is_some() {
        configured.push(short_name(names::COMPUTED_COLUMN_SQL));
    }
    match configured.as_slice() {
        [first, second, ..] => Err(ProviderError::ConflictingColumnServerGeneration {
            first: first.to_string(),
            second: second.to_string(),
            property: property.name.clone(),
            entity: entity.name.clone(),
        }),
        _ => Ok(()),
    }
}

fn short_name(annotation: &str) -> &str {
    annotation.rsplit(':').next().unwrap_or(annotation)
}

fn validate_identifier_length(kind: &str, name: &str, max_length: i64) -> Result<()> {
    let length = name.chars().count() as i64;
    if length > max_length {
        return Err(ProviderError::Model(format!(
            "{} name '{}' is {} characters long; the maximum is {}",
            kind, name, length, max_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClrType, ConfigurationSource, Key};

    fn blog() -> EntityType {
        let mut blog = EntityType::new("Blog");
        blog.properties.push(Property::new("Id", ClrType::Int32));
        blog.properties.push(Property::new("Name", ClrType::String));
        blog.keys.push(Key::new(vec!["Id".into()], true));
        blog
    }

    #[test]
    fn test_valid_model() {
        let mut model = Model::new();
        model.entity_types.push(blog());
        assert!(ModelValidator::default().validate(&model).is_ok());
    }

    #[test]
    fn test_strategy_and_default_sql_conflict() {
        let mut blog = blog();
        let id = blog.property_mut("Id").unwrap();
        id.annotations.set(
            names::VALUE_GENERATION_STRATEGY,
            ValueGenerationStrategy::IdentityColumn,
            ConfigurationSource::Explicit,
        );
        id.annotations
            .set(names::DEFAULT_VALUE_SQL, "NEXT VALUE FOR s", ConfigurationSource::Explicit);
        let mut model = Model::new();
        model.entity_types.push(blog);

        match ModelValidator::default().validate(&model) {
            Err(ProviderError::ConflictingColumnServerGeneration {
                first,
                second,
                property,
                entity,
            }) => {
                assert_eq!(first, "ValueGenerationStrategy");
                assert_eq!(second, "DefaultValueSql");
                assert_eq!(property, "Id");
                assert_eq!(entity, "Blog");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_default_value_and_computed_conflict() {
        let mut blog = blog();
        let name = blog.property_mut("Name").unwrap();
        name.annotations
            .set(names::DEFAULT_VALUE, "x", ConfigurationSource::Explicit);
        name.annotations
            .set(names::COMPUTED_COLUMN_SQL, "[A] || [B]", ConfigurationSource::Explicit);
        assert!(validate_store_generation(&blog, blog.property("Name").unwrap()).is_err());
    }

    #[test]
    fn test_identity_on_string_is_rejected() {
        let mut blog = blog();
        blog.property_mut("Name").unwrap().annotations.set(
            names::VALUE_GENERATION_STRATEGY,
            ValueGenerationStrategy::IdentityColumn,
            ConfigurationSource::Explicit,
        );
        let mut model = Model::new();
        model.entity_types.push(blog);
        assert!(matches!(
            ModelValidator::default().validate(&model),
            Err(ProviderError::IdentityBadType { .. })
        ));
    }

    #[test]
    fn test_unqualified_store_type_is_rejected() {
        let mut blog = blog();
        blog.property_mut("Name").unwrap().column_type = Some("varchar".into());
        let mut model = Model::new();
        model.entity_types.push(blog);
        assert!(matches!(
            ModelValidator::default().validate(&model),
            Err(ProviderError::UnqualifiedDataTypeOnProperty { .. })
        ));
    }

    #[test]
    fn test_long_table_name() {
        let mut blog = blog();
        blog.table = "t".repeat(129);
        let mut model = Model::new();
        model.entity_types.push(blog);
        assert!(matches!(
            ModelValidator::default().validate(&model),
            Err(ProviderError::Model(_))
        ));
    }
}
