//! Dialect annotations attached to migration operations.

use crate::metadata::{names, AnnotationValue, EntityType, Index, Key, Model, Property, ValueGenerationStrategy};
use crate::value_generation::strategy::{
    effective_identity_increment, effective_identity_seed, effective_strategy,
};

/// Annotation emitted for a migration operation.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationAnnotation {
    pub name: &'static str,
    pub value: AnnotationValue,
}

impl MigrationAnnotation {
    fn new(name: &'static str, value: impl Into<AnnotationValue>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Produces the dialect annotations for each model element.
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationsAnnotationProvider;

impl MigrationsAnnotationProvider {
    pub fn new() -> Self {
        Self
    }

    pub fn for_model(&self, model: &Model) -> Vec<MigrationAnnotation> {
        self.for_remove_model(model)
    }

    pub fn for_entity(&self, model: &Model, entity: &EntityType) -> Vec<MigrationAnnotation> {
        self.for_remove_entity(model, entity)
    }

    pub fn for_key(&self, model: &Model, entity: &EntityType, key: &Key) -> Vec<MigrationAnnotation> {
        model
            .is_clustered_key(entity, key)
            .map(|clustered| vec![MigrationAnnotation::new(names::CLUSTERED, clustered)])
            .unwrap_or_default()
    }

    pub fn for_index(&self, index: &Index) -> Vec<MigrationAnnotation> {
        let mut out = Vec::new();
        if let Some(clustered) = index.clustered_annotation() {
            out.push(MigrationAnnotation::new(names::CLUSTERED, clustered));
        }
        if let Some(include) = index.include_properties() {
            out.push(MigrationAnnotation::new(names::INCLUDE, include.to_vec()));
        }
        if let Some(online) = index.created_online_annotation() {
            out.push(MigrationAnnotation::new(names::CREATED_ONLINE, online));
        }
        out
    }

    /// Identity columns carry the strategy, seed and increment; other
    /// properties carry nothing.
    pub fn for_property(
        &self,
        model: &Model,
        entity: &EntityType,
        property: &Property,
    ) -> Vec<MigrationAnnotation> {
        if effective_strategy(model, entity, property) != ValueGenerationStrategy::IdentityColumn {
            return Vec::new();
        }
        vec![
            MigrationAnnotation::new(
                names::VALUE_GENERATION_STRATEGY,
                ValueGenerationStrategy::IdentityColumn,
            ),
            MigrationAnnotation::new(names::IDENTITY_SEED, effective_identity_seed(model, property)),
            MigrationAnnotation::new(
                names::IDENTITY_INCREMENT,
                effective_identity_increment(model, property),
            ),
        ]
    }

    pub fn for_remove_model(&self, model: &Model) -> Vec<MigrationAnnotation> {
        let any_root_optimized = model
            .root_entity_types()
            .any(|e| e.memory_optimized_annotation() == Some(true));
        if any_root_optimized {
            vec![MigrationAnnotation::new(names::MEMORY_OPTIMIZED, true)]
        } else {
            Vec::new()
        }
    }

    pub fn for_remove_entity(&self, model: &Model, entity: &EntityType) -> Vec<MigrationAnnotation> {
        if model.is_memory_optimized(entity) {
            vec![MigrationAnnotation::new(names::MEMORY_OPTIMIZED, true)]
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{ClrType, ConfigurationSource::*, ValueGenerated};

    fn model() -> Model {
        let mut blog = EntityType::new("Blog");
        let mut id = Property::new("Id", ClrType::Int32);
        id.set_value_generated(ValueGenerated::OnAdd, Convention);
        blog.properties.push(id);
        blog.properties.push(Property::new("Name", ClrType::String));
        blog.keys.push(Key::new(vec!["Id".into()], true));

        let mut model = Model::new();
        model.entity_types.push(blog);
        model.set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), Convention);
        model
    }

    #[test]
    fn test_identity_property_annotations_use_model_defaults() {
        let model = model();
        let blog = model.entity("Blog").unwrap();
        let out = MigrationsAnnotationProvider::new().for_property(&model, blog, blog.property("Id").unwrap());
        assert_eq!(
            out,
            vec![
                MigrationAnnotation::new(names::VALUE_GENERATION_STRATEGY, ValueGenerationStrategy::IdentityColumn),
                MigrationAnnotation::new(names::IDENTITY_SEED, 1i64),
                MigrationAnnotation::new(names::IDENTITY_INCREMENT, 1i64),
            ]
        );
    }

    #[test]
    fn test_non_identity_property_has_no_annotations() {
        let model = model();
        let blog = model.entity("Blog").unwrap();
        let provider = MigrationsAnnotationProvider::new();
        assert!(provider.for_property(&model, blog, blog.property("Name").unwrap()).is_empty());
    }

    #[test]
    fn test_memory_optimized_model_and_derived_entity() {
        let mut model = model();
        model.entity_mut("Blog").unwrap().set_memory_optimized(true, Explicit);
        let mut post = EntityType::new("SpecialBlog");
        post.base_type = Some("Blog".into());
        model.entity_types.push(post);

        let provider = MigrationsAnnotationProvider::new();
        assert_eq!(provider.for_model(&model).len(), 1);
        let derived = model.entity("SpecialBlog").unwrap();
        assert_eq!(
            provider.for_entity(&model, derived),
            vec![MigrationAnnotation::new(names::MEMORY_OPTIMIZED, true)]
        );
    }

    #[test]
    fn test_index_annotations_in_order() {
        let mut index = Index::new(vec!["Name".into()]);
        index.set_clustered(Some(false), Explicit);
        index.set_include_properties(Some(vec!["Url".into()]), Explicit);
        index.set_created_online(Some(true), Explicit);
        let emitted: Vec<_> = MigrationsAnnotationProvider::new()
            .for_index(&index)
            .into_iter()
            .map(|a| a.name)
            .collect();
        assert_eq!(emitted, vec![names::CLUSTERED, names::INCLUDE, names::CREATED_ONLINE]);
    }

    #[test]
    fn test_key_clustered() {
        let mut model = model();
        model.entity_mut("Blog").unwrap().keys[0].set_clustered(Some(true), Explicit);
        let blog = model.entity("Blog").unwrap();
        let out = MigrationsAnnotationProvider::new().for_key(&model, blog, &blog.keys[0]);
        assert_eq!(out, vec![MigrationAnnotation::new(names::CLUSTERED, true)]);
    }
}
