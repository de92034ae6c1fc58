//! Effective value-generation strategy of a property, and guarded writes.

use crate::error::{ProviderError, Result};
use crate::metadata::{
    names, ConfigurationSource, EntityType, Model, Property, Sequence, ValueGenerated,
    ValueGenerationStrategy, DEFAULT_HILO_SEQUENCE_NAME,
};

/// Store-side generation needs an integer or decimal type with no converter.
pub fn is_compatible_with_value_generation(property: &Property) -> bool {
    (property.clr_type.is_integer() || property.clr_type == crate::metadata::ClrType::Decimal)
        && !property.has_value_converter
}

/// Strategy the provider will use for `property`.
///
/// Resolution order: the property's own annotation, then the shared-table
/// root key (only identity carries over), then the model default when the
/// property is generated on add without any store default.
pub fn effective_strategy(
    model: &Model,
    entity: &EntityType,
    property: &Property,
) -> ValueGenerationStrategy {
    if let Some(strategy) = property.value_generation_strategy_annotation() {
        return strategy;
    }

    if let Some((root, root_property)) =
        model.find_shared_table_root_primary_key_property(entity, property)
    {
        return match effective_strategy(model, root, root_property) {
            ValueGenerationStrategy::IdentityColumn => ValueGenerationStrategy::IdentityColumn,
            _ => ValueGenerationStrategy::None,
        };
    }

    if property.value_generated != ValueGenerated::OnAdd || property.has_store_default() {
        return ValueGenerationStrategy::None;
    }

    match model.value_generation_strategy() {
        Some(strategy @ (ValueGenerationStrategy::SequenceHiLo | ValueGenerationStrategy::IdentityColumn))
            if is_compatible_with_value_generation(property) =>
        {
            strategy
        }
        _ => ValueGenerationStrategy::None,
    }
}

/// Reject a strategy the property type cannot support.
pub fn check_strategy(
    entity_name: &str,
    property: &Property,
    value: Option<ValueGenerationStrategy>,
) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if is_compatible_with_value_generation(property) {
        return Ok(());
    }
    match value {
        ValueGenerationStrategy::IdentityColumn => Err(ProviderError::IdentityBadType {
            property: property.name.clone(),
            entity: entity_name.to_string(),
            property_type: property.clr_type.to_string(),
        }),
        ValueGenerationStrategy::SequenceHiLo => Err(ProviderError::SequenceBadType {
            property: property.name.clone(),
            entity: entity_name.to_string(),
            property_type: property.clr_type.to_string(),
        }),
        ValueGenerationStrategy::None => Ok(()),
    }
}

/// Set (or remove) the strategy annotation on a property.
///
/// Identity clears the hi-lo sequence name and schema; hi-lo clears the
/// identity seed and increment. Returns `Ok(false)` when a stronger source
/// already owns the annotation.
pub fn set_strategy(
    entity_name: &str,
    property: &mut Property,
    value: Option<ValueGenerationStrategy>,
    source: ConfigurationSource,
) -> Result<bool> {
    check_strategy(entity_name, property, value)?;
    if !property
        .annotations
        .set_or_remove(names::VALUE_GENERATION_STRATEGY, value, source)
    {
        return Ok(false);
    }
    if value != Some(ValueGenerationStrategy::IdentityColumn) {
        property.annotations.remove(names::IDENTITY_SEED, source);
        property.annotations.remove(names::IDENTITY_INCREMENT, source);
    }
    if value != Some(ValueGenerationStrategy::SequenceHiLo) {
        property.annotations.remove(names::HILO_SEQUENCE_NAME, source);
        property.annotations.remove(names::HILO_SEQUENCE_SCHEMA, source);
    }
    Ok(true)
}

/// Hi-lo sequence backing `property`, if it uses one.
///
/// The property's sequence name and schema fall back to the model's, and the
/// name to [`DEFAULT_HILO_SEQUENCE_NAME`].
pub fn find_hilo_sequence<'a>(
    model: &'a Model,
    entity: &EntityType,
    property: &Property,
) -> Option<&'a Sequence> {
    if effective_strategy(model, entity, property) != ValueGenerationStrategy::SequenceHiLo {
        return None;
    }
    let (name, schema) = hilo_sequence_key(model, property);
    model.find_sequence(name, schema)
}

/// Sequence name and schema a hi-lo property would use.
pub fn hilo_sequence_key<'a>(model: &'a Model, property: &'a Property) -> (&'a str, Option<&'a str>) {
    let name = property
        .hilo_sequence_name()
        .or_else(|| model.hilo_sequence_name())
        .unwrap_or(DEFAULT_HILO_SEQUENCE_NAME);
    let schema = property
        .hilo_sequence_schema()
        .or_else(|| model.hilo_sequence_schema());
    (name, schema)
}

/// Identity seed of a property, falling back to the model value.
pub fn effective_identity_seed(model: &Model, property: &Property) -> i64 {
    property.identity_seed().unwrap_or_else(|| model.identity_seed())
}

/// Identity increment of a property, falling back to the model value.
pub fn effective_identity_increment(model: &Model, property: &Property) -> i64 {
    property
        .identity_increment()
        .unwrap_or_else(|| model.identity_increment())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClrType, Key};
    use ConfigurationSource::*;

    fn model_with(property: Property) -> Model {
        let mut entity = EntityType::new("Blog");
        entity.keys.push(Key::new(vec![property.name.clone()], true));
        entity.properties.push(property);
        let mut model = Model::new();
        model.entity_types.push(entity);
        model
    }

    fn on_add(name: &str, clr: ClrType) -> Property {
        let mut p = Property::new(name, clr);
        p.set_value_generated(ValueGenerated::OnAdd, Convention);
        p
    }

    fn strategy_of(model: &Model, entity: &str, property: &str) -> ValueGenerationStrategy {
        let e = model.entity(entity).unwrap();
        effective_strategy(model, e, e.property(property).unwrap())
    }

    #[test]
    fn test_model_default_applies_to_compatible_on_add() {
        let mut model = model_with(on_add("Id", ClrType::Int32));
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::None);

        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::IdentityColumn);

        model.set_value_generation_strategy(Some(ValueGenerationStrategy::SequenceHiLo), Explicit);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::SequenceHiLo);
    }

    #[test]
    fn test_incompatible_or_defaulted_property_is_none() {
        let mut model = model_with(on_add("Id", ClrType::Guid));
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::None);

        let mut p = on_add("Id", ClrType::Int64);
        p.annotations.set(names::DEFAULT_VALUE_SQL, "NEXT VALUE FOR s", Explicit);
        let mut model = model_with(p);
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::None);

        let mut p = on_add("Id", ClrType::Int64);
        p.has_value_converter = true;
        let mut model = model_with(p);
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::None);
    }

    #[test]
    fn test_never_generated_is_none() {
        let mut model = model_with(Property::new("Id", ClrType::Int32));
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::None);
    }

    #[test]
    fn test_shared_table_dependent_mirrors_identity_only() {
        let mut model = model_with(on_add("Id", ClrType::Int32));
        let mut details = EntityType::new("BlogDetails");
        details.shared_table_principal = Some("Blog".into());
        details.properties.push(on_add("BlogId", ClrType::Int32));
        details.keys.push(Key::new(vec!["BlogId".into()], true));
        model.entity_types.push(details);

        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        assert_eq!(
            strategy_of(&model, "BlogDetails", "BlogId"),
            ValueGenerationStrategy::IdentityColumn
        );

        model.set_value_generation_strategy(Some(ValueGenerationStrategy::SequenceHiLo), Explicit);
        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::SequenceHiLo);
        assert_eq!(strategy_of(&model, "BlogDetails", "BlogId"), ValueGenerationStrategy::None);
    }

    #[test]
    fn test_cyclic_shared_table_chain_falls_back_to_model_default() {
        let mut model = model_with(on_add("Id", ClrType::Int32));
        let mut details = EntityType::new("BlogDetails");
        details.shared_table_principal = Some("Blog".into());
        details.properties.push(on_add("BlogId", ClrType::Int32));
        details.keys.push(Key::new(vec!["BlogId".into()], true));
        model.entity_types.push(details);
        model.entity_mut("Blog").unwrap().shared_table_principal = Some("BlogDetails".into());
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);

        assert_eq!(strategy_of(&model, "Blog", "Id"), ValueGenerationStrategy::IdentityColumn);
        assert_eq!(
            strategy_of(&model, "BlogDetails", "BlogId"),
            ValueGenerationStrategy::IdentityColumn
        );
    }

    #[test]
    fn test_bad_type_errors_name_property_and_entity() {
        let mut p = Property::new("Name", ClrType::String);
        let err = set_strategy("Blog", &mut p, Some(ValueGenerationStrategy::IdentityColumn), Explicit)
            .unwrap_err();
        match err {
            ProviderError::IdentityBadType { property, entity, property_type } => {
                assert_eq!(property, "Name");
                assert_eq!(entity, "Blog");
                assert_eq!(property_type, "String");
            }
            other => panic!("unexpected error: {other}"),
        }
        let err = set_strategy("Blog", &mut p, Some(ValueGenerationStrategy::SequenceHiLo), Explicit)
            .unwrap_err();
        assert!(matches!(err, ProviderError::SequenceBadType { .. }));
        assert!(set_strategy("Blog", &mut p, None, Explicit).unwrap());
    }

    #[test]
    fn test_identity_clears_hilo_and_back() {
        let mut p = Property::new("Id", ClrType::Int64);
        p.set_hilo_sequence_name(Some("Seq"), Explicit);
        p.set_hilo_sequence_schema(Some("dbo"), Explicit);
        assert!(set_strategy("Blog", &mut p, Some(ValueGenerationStrategy::IdentityColumn), Explicit).unwrap());
        assert!(p.hilo_sequence_name().is_none());
        assert!(p.hilo_sequence_schema().is_none());

        p.set_identity_seed(Some(100), Explicit);
        p.set_identity_increment(Some(5), Explicit);
        assert!(set_strategy("Blog", &mut p, Some(ValueGenerationStrategy::SequenceHiLo), Explicit).unwrap());
        assert!(p.identity_seed().is_none());
        assert!(p.identity_increment().is_none());
        assert_eq!(
            p.value_generation_strategy_annotation(),
            Some(ValueGenerationStrategy::SequenceHiLo)
        );
    }

    #[test]
    fn test_convention_cannot_override_explicit_strategy() {
        let mut p = Property::new("Id", ClrType::Int32);
        set_strategy("Blog", &mut p, Some(ValueGenerationStrategy::SequenceHiLo), Explicit).unwrap();
        assert!(!set_strategy("Blog", &mut p, Some(ValueGenerationStrategy::IdentityColumn), Convention).unwrap());
        assert_eq!(
            p.value_generation_strategy_annotation(),
            Some(ValueGenerationStrategy::SequenceHiLo)
        );
    }

    #[test]
    fn test_find_hilo_sequence_falls_back_to_model_names() {
        let mut model = model_with(on_add("Id", ClrType::Int64));
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::SequenceHiLo), Explicit);
        model.add_sequence(DEFAULT_HILO_SEQUENCE_NAME, None);
        let entity = model.entity("Blog").unwrap();
        let p = entity.property("Id").unwrap();
        assert_eq!(
            find_hilo_sequence(&model, entity, p).unwrap().name,
            DEFAULT_HILO_SEQUENCE_NAME
        );

        model.set_hilo_sequence_name(Some("Ids"), Explicit);
        model.set_hilo_sequence_schema(Some("seq"), Explicit);
        let entity = model.entity("Blog").unwrap();
        let p = entity.property("Id").unwrap();
        assert!(find_hilo_sequence(&model, entity, p).is_none());
        model.add_sequence("Ids", Some("seq"));
        let entity = model.entity("Blog").unwrap();
        let p = entity.property("Id").unwrap();
        assert_eq!(find_hilo_sequence(&model, entity, p).unwrap().schema.as_deref(), Some("seq"));
    }

    #[test]
    fn test_identity_seed_falls_back_to_model() {
        let mut model = Model::new();
        let mut p = Property::new("Id", ClrType::Int32);
        assert_eq!(effective_identity_seed(&model, &p), 1);
        model.set_identity_seed(Some(1000), Explicit);
        model.set_identity_increment(Some(10), Explicit);
        assert_eq!(effective_identity_seed(&model, &p), 1000);
        assert_eq!(effective_identity_increment(&model, &p), 10);
        p.set_identity_seed(Some(5), Explicit);
        assert_eq!(effective_identity_seed(&model, &p), 5);
    }
}
