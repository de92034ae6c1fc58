//! Value-generation conventions: model defaults, the value-generated flag and
//! strategy stamping at finalization.

use tracing::debug;

use crate::error::Result;
use crate::metadata::validator;
use crate::metadata::{
    names, ClrType, ConfigurationSource, EntityType, Model, Property, PropertyRef, ValueGenerated,
    ValueGenerationStrategy, MAX_IDENTIFIER_LENGTH,
};
use crate::value_generation::strategy::{effective_strategy, set_strategy};

use super::{AnnotationChange, ConventionFlow};

/// Identity columns are the model default.
pub fn value_generation_strategy_default(model: &mut Model) -> ConventionFlow {
    model.set_value_generation_strategy(
        Some(ValueGenerationStrategy::IdentityColumn),
        ConfigurationSource::Convention,
    );
    ConventionFlow::Continue
}

pub fn max_identifier_length(model: &mut Model) -> ConventionFlow {
    model.annotations.set(
        names::MAX_IDENTIFIER_LENGTH,
        MAX_IDENTIFIER_LENGTH,
        ConfigurationSource::Convention,
    );
    ConventionFlow::Continue
}

/// Flag implied by the relational store settings alone.
fn relational_value_generated(property: &Property) -> Option<ValueGenerated> {
    if property.computed_column_sql().is_some() {
        Some(ValueGenerated::OnAddOrUpdate)
    } else if property.default_value().is_some() || property.default_value_sql().is_some() {
        Some(ValueGenerated::OnAdd)
    } else {
        None
    }
}

/// Recompute the convention value-generated flag after a strategy or store
/// default change.
pub fn value_generated_on_change(
    model: &mut Model,
    property_ref: &PropertyRef,
    change: &AnnotationChange<'_>,
) -> Result<ConventionFlow> {
    let relevant = matches!(
        change.name,
        names::VALUE_GENERATION_STRATEGY
            | names::DEFAULT_VALUE
            | names::DEFAULT_VALUE_SQL
            | names::COMPUTED_COLUMN_SQL
    );
    if !relevant {
        return Ok(ConventionFlow::Continue);
    }
    let Some((entity, property)) = model.property(property_ref) else {
        return Ok(ConventionFlow::Continue);
    };
    let mut generated = relational_value_generated(property);
    if generated.is_none()
        && change.name == names::VALUE_GENERATION_STRATEGY
        && effective_strategy(model, entity, property) != ValueGenerationStrategy::None
    {
        generated = Some(ValueGenerated::OnAdd);
    }
    if let (Some(value), Some(property)) = (generated, model.property_mut(property_ref)) {
        property.set_value_generated(value, ConfigurationSource::Convention);
    }
    Ok(ConventionFlow::Continue)
}

/// Single-column integer or GUID primary keys are generated on add.
pub fn key_value_generated(_memory_optimized: bool, entity: &mut EntityType, key: usize) -> ConventionFlow {
    let Some(key) = entity.keys.get(key) else {
        return ConventionFlow::Continue;
    };
    if !key.is_primary || key.properties.len() != 1 || entity.shared_table_principal.is_some() {
        return ConventionFlow::Continue;
    }
    let name = key.properties[0].clone();
    if let Some(property) = entity.property_mut(&name) {
        if property.clr_type.is_integer() || property.clr_type == ClrType::Guid {
            property.set_value_generated(ValueGenerated::OnAdd, ConfigurationSource::Convention);
        }
    }
    ConventionFlow::Continue
}

/// Write each property's effective strategy as a convention annotation so the
/// finalized model no longer depends on resolution rules.
pub fn stamp_value_generation_strategies(model: &mut Model) -> Result<ConventionFlow> {
    let view: &Model = model;
    let stamped: Vec<(PropertyRef, ValueGenerationStrategy)> = view
        .entity_types
        .iter()
        .flat_map(|entity| {
            entity.properties.iter().filter_map(move |property| {
                match effective_strategy(view, entity, property) {
                    ValueGenerationStrategy::None => None,
                    strategy => Some((PropertyRef::new(&entity.name, &property.name), strategy)),
                }
            })
        })
        .collect();

    for (property_ref, strategy) in &stamped {
        if let Some(property) = model.property_mut(property_ref) {
            set_strategy(
                &property_ref.entity,
                property,
                Some(*strategy),
                ConfigurationSource::Convention,
            )?;
        }
    }
    debug!("Stamped value generation strategy on {} properties", stamped.len());
    Ok(ConventionFlow::Continue)
}

/// Reject properties that combine store-generation settings.
pub fn validate_store_generation(model: &mut Model) -> Result<ConventionFlow> {
    for entity in &model.entity_types {
        for property in &entity.properties {
            validator::validate_store_generation(entity, property)?;
        }
    }
    Ok(ConventionFlow::Continue)
}
