//! Keeps strategy, default value, default SQL and computed SQL mutually
//! exclusive.

use tracing::debug;

use crate::error::Result;
use crate::metadata::{names, ConfigurationSource, Model, PropertyRef};
use crate::value_generation::strategy::set_strategy;

use super::{AnnotationChange, ConventionFlow};

/// Annotations of which at most one may be configured on a property.
pub(crate) const STORE_GENERATION_ANNOTATIONS: [&str; 4] = [
    names::VALUE_GENERATION_STRATEGY,
    names::DEFAULT_VALUE,
    names::DEFAULT_VALUE_SQL,
    names::COMPUTED_COLUMN_SQL,
];

/// When one of the exclusive annotations is newly set, remove the others at
/// the triggering write's strength. If a stronger value blocks the removal,
/// undo the triggering write where possible and stop.
pub fn store_generation(
    model: &mut Model,
    property_ref: &PropertyRef,
    change: &AnnotationChange<'_>,
) -> Result<ConventionFlow> {
    if !STORE_GENERATION_ANNOTATIONS.contains(&change.name) || !change.has_value || change.had_value {
        return Ok(ConventionFlow::Continue);
    }
    let source = match change.source {
        ConfigurationSource::Convention => ConfigurationSource::Convention,
        _ => ConfigurationSource::DataAnnotation,
    };
    let Some(property) = model.property_mut(property_ref) else {
        return Ok(ConventionFlow::Continue);
    };

    let mut blocked = false;
    for other in STORE_GENERATION_ANNOTATIONS {
        if other == change.name || !property.annotations.contains(other) {
            continue;
        }
        let cleared = if other == names::VALUE_GENERATION_STRATEGY {
            set_strategy(&property_ref.entity, property, None, source)?
        } else {
            property.annotations.remove(other, source)
        };
        blocked |= !cleared;
    }

    if blocked {
        property.annotations.remove(change.name, source);
        debug!(
            "{} on {}.{} conflicts with a stronger setting",
            change.name, property_ref.entity, property_ref.property
        );
        return Ok(ConventionFlow::Stop);
    }
    Ok(ConventionFlow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClrType, EntityType, Property, ValueGenerationStrategy};
    use ConfigurationSource::*;

    fn model() -> Model {
        let mut blog = EntityType::new("Blog");
        blog.properties.push(Property::new("Id", ClrType::Int32));
        let mut model = Model::new();
        model.entity_types.push(blog);
        model
    }

    fn new_value(name: &str, source: ConfigurationSource) -> AnnotationChange<'_> {
        AnnotationChange {
            name,
            source,
            had_value: false,
            has_value: true,
        }
    }

    #[test]
    fn test_default_sql_clears_convention_strategy() {
        let mut model = model();
        let id = PropertyRef::new("Blog", "Id");
        let p = model.property_mut(&id).unwrap();
        p.annotations.set(
            names::VALUE_GENERATION_STRATEGY,
            ValueGenerationStrategy::IdentityColumn,
            Convention,
        );
        p.annotations.set(names::IDENTITY_SEED, 5i64, Convention);
        p.annotations.set(names::DEFAULT_VALUE_SQL, "0", Explicit);

        let flow = store_generation(&mut model, &id, &new_value(names::DEFAULT_VALUE_SQL, Explicit)).unwrap();
        assert_eq!(flow, ConventionFlow::Continue);
        let p = model.property(&id).unwrap().1;
        assert_eq!(p.value_generation_strategy_annotation(), None);
        assert_eq!(p.identity_seed(), None);
        assert_eq!(p.default_value_sql(), Some("0"));
    }

    #[test]
    fn test_convention_write_blocked_by_explicit_is_undone() {
        let mut model = model();
        let id = PropertyRef::new("Blog", "Id");
        let p = model.property_mut(&id).unwrap();
        p.annotations.set(names::COMPUTED_COLUMN_SQL, "[A] + 1", Explicit);
        p.annotations.set(names::DEFAULT_VALUE, 0i64, Convention);

        let flow = store_generation(&mut model, &id, &new_value(names::DEFAULT_VALUE, Convention)).unwrap();
        assert_eq!(flow, ConventionFlow::Stop);
        let p = model.property(&id).unwrap().1;
        assert!(p.default_value().is_none());
        assert_eq!(p.computed_column_sql(), Some("[A] + 1"));
    }

    #[test]
    fn test_replacing_existing_value_is_ignored() {
        let mut model = model();
        let id = PropertyRef::new("Blog", "Id");
        let p = model.property_mut(&id).unwrap();
        p.annotations.set(names::DEFAULT_VALUE, 1i64, Convention);
        p.annotations.set(names::DEFAULT_VALUE_SQL, "0", Convention);
        let change = AnnotationChange {
            had_value: true,
            ..new_value(names::DEFAULT_VALUE_SQL, Convention)
        };
        store_generation(&mut model, &id, &change).unwrap();
        assert!(model.property(&id).unwrap().1.default_value().is_some());
    }
}
