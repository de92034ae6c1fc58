//! Model snapshot rendering with host-reserved annotations filtered out.

use serde_json::{json, Map, Value};

use crate::error::Result;
use crate::metadata::{AnnotationValue, Annotations, Model};

/// Annotations owned by the host runtime; never written to a snapshot.
pub const IGNORED_ANNOTATIONS: &[&str] = &[
    "NavigationCandidates",
    "AmbiguousNavigations",
    "InverseNavigations",
    "OwnedTypes",
    "ChangeTrackingStrategy",
    "BeforeSaveBehavior",
    "AfterSaveBehavior",
    "TypeMapping",
    "ValueComparer",
    "KeyValueComparer",
    "StructuralValueComparer",
    "ConstructorBinding",
    "NavigationAccessMode",
    "PropertyAccessMode",
    "ProviderClrType",
    "ValueConverter",
    "ValueGeneratorFactory",
    "DefiningQuery",
    "QueryFilter",
    "Relational:CheckConstraints",
];

/// Annotation name prefixes that are skipped as a family.
pub const IGNORED_ANNOTATION_PREFIXES: &[&str] = &["Relational:DbFunction", "Relational:Sequence:"];

/// Whether `name` is excluded from generated snapshots.
pub fn is_ignored_annotation(name: &str) -> bool {
    IGNORED_ANNOTATIONS.contains(&name)
        || IGNORED_ANNOTATION_PREFIXES
            .iter()
            .any(|prefix| name.starts_with(prefix))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationsCodeGenerator;

impl MigrationsCodeGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Annotation entries that belong in a snapshot, in key order.
    pub fn filter_annotations<'a>(
        &self,
        annotations: &'a Annotations,
    ) -> impl Iterator<Item = (&'a str, &'a AnnotationValue)> {
        annotations
            .iter()
            .filter(|(name, _)| !is_ignored_annotation(name))
            .map(|(name, a)| (name, &a.value))
    }

    /// JSON snapshot of the model: annotations plus tables, columns, keys,
    /// indexes and sequences.
    pub fn snapshot(&self, model: &Model) -> Result<Value> {
        let entities = model
            .entity_types
            .iter()
            .map(|entity| {
                let properties: Vec<Value> = entity
                    .properties
                    .iter()
                    .map(|p| {
                        json!({
                            "name": p.name,
                            "type": p.clr_type.name(),
                            "nullable": p.is_nullable,
                            "column_type": p.column_type,
                            "annotations": self.annotation_map(&p.annotations),
                        })
                    })
                    .collect();
                let keys: Vec<Value> = entity
                    .keys
                    .iter()
                    .map(|k| {
                        json!({
                            "properties": k.properties,
                            "primary": k.is_primary,
                            "annotations": self.annotation_map(&k.annotations),
                        })
                    })
                    .collect();
                let indexes: Vec<Value> = entity
                    .indexes
                    .iter()
                    .map(|i| {
                        json!({
                            "name": i.name,
                            "properties": i.properties,
                            "unique": i.is_unique,
                            "annotations": self.annotation_map(&i.annotations),
                        })
                    })
                    .collect();
                json!({
                    "name": entity.name,
                    "table": entity.table,
                    "schema": entity.schema,
                    "base_type": entity.base_type,
                    "annotations": self.annotation_map(&entity.annotations),
                    "properties": properties,
                    "keys": keys,
                    "indexes": indexes,
                })
            })
            .collect::<Vec<_>>();

        let sequences: Vec<Value> = model
            .sequences
            .iter()
            .map(|s| {
                json!({
                    "name": s.name,
                    "schema": s.schema,
                    "start_value": s.start_value,
                    "increment_by": s.increment_by,
                })
            })
            .collect();

        Ok(json!({
            "annotations": self.annotation_map(&model.annotations),
            "entity_types": entities,
            "sequences": sequences,
        }))
    }

    /// Pretty-printed form of [`MigrationsCodeGenerator::snapshot`].
    pub fn snapshot_string(&self, model: &Model) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot(model)?)?)
    }

    fn annotation_map(&self, annotations: &Annotations) -> Map<String, Value> {
        self.filter_annotations(annotations)
            .filter_map(|(name, value)| {
                serde_json::to_value(value)
                    .ok()
                    .map(|v| (name.to_string(), v))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{names, ClrType, ConfigurationSource, EntityType, Property};

    #[test]
    fn test_ignored_names_and_prefixes() {
        assert!(is_ignored_annotation("TypeMapping"));
        assert!(is_ignored_annotation("ValueConverter"));
        assert!(is_ignored_annotation("Relational:DbFunction:dbo.Fn"));
        assert!(is_ignored_annotation("Relational:Sequence:.Ids"));
        assert!(!is_ignored_annotation(names::IDENTITY_SEED));
        assert!(!is_ignored_annotation(names::MAX_IDENTIFIER_LENGTH));
    }

    #[test]
    fn test_snapshot_skips_reserved_annotations() {
        let mut model = Model::new();
        model
            .annotations
            .set(names::MAX_IDENTIFIER_LENGTH, 128i64, ConfigurationSource::Convention);
        model
            .annotations
            .set("ChangeTrackingStrategy", "Snapshot", ConfigurationSource::Convention);
        let mut blog = EntityType::new("Blog");
        let mut id = Property::new("Id", ClrType::Int32);
        id.annotations.set("ValueComparer", "x", ConfigurationSource::Convention);
        id.annotations.set(names::IDENTITY_SEED, 5i64, ConfigurationSource::Explicit);
        blog.properties.push(id);
        model.entity_types.push(blog);

        let snapshot = MigrationsCodeGenerator::new().snapshot(&model).unwrap();
        assert_eq!(snapshot["annotations"]["Relational:MaxIdentifierLength"], 128);
        assert!(snapshot["annotations"].get("ChangeTrackingStrategy").is_none());
        let id = &snapshot["entity_types"][0]["properties"][0];
        assert_eq!(id["annotations"]["TdServer:IdentitySeed"], 5);
        assert!(id["annotations"].get("ValueComparer").is_none());
        assert_eq!(id["type"], "Int32");
    }
}
