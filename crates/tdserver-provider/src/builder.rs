//! Fluent configuration of the model.
//!
//! Every write goes through the annotation store at [`ConfigurationSource::Explicit`]
//! and raises the matching convention event. Explicitly configuring two
//! store-generation settings on one property fails immediately.

use crate::conventions::{AnnotationChange, ConventionSet};
use crate::error::{ProviderError, Result};
use crate::metadata::{
    names, AnnotationValue, ClrType, ConfigurationSource, EntityType, Index, Key, Model,
    ModelValidator, Property, PropertyRef, Sequence, ValueGenerated, ValueGenerationStrategy,
    DEFAULT_HILO_SEQUENCE_NAME,
};
use crate::storage::TypeMappingSource;
use crate::value_generation::strategy::set_strategy;

const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

/// Increment of sequences created for hi-lo generation.
pub const HILO_SEQUENCE_INCREMENT: i32 = 10;

pub struct ModelBuilder {
    model: Model,
    conventions: ConventionSet,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    /// Builder with the provider conventions applied.
    pub fn new() -> Self {
        Self::with_conventions(ConventionSet::provider())
    }

    pub fn with_conventions(conventions: ConventionSet) -> Self {
        let mut model = Model::new();
        conventions.on_model_initialized(&mut model);
        Self { model, conventions }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Configure an entity type, adding it when missing.
    pub fn entity(&mut self, name: &str) -> EntityTypeBuilder<'_> {
        if self.model.entity(name).is_none() {
            self.model.entity_types.push(EntityType::new(name));
        }
        EntityTypeBuilder {
            model: &mut self.model,
            conventions: &self.conventions,
            entity: name.to_string(),
        }
    }

    /// Use a hi-lo sequence for generated keys by default. The sequence is
    /// created with an increment of 10 when it does not exist.
    pub fn use_sequence_hilo(&mut self, name: Option<&str>, schema: Option<&str>) -> &mut Self {
        let name = name.unwrap_or(DEFAULT_HILO_SEQUENCE_NAME);
        if self.model.find_sequence(name, schema).is_none() {
            self.model.add_sequence(name, schema).increment_by = HILO_SEQUENCE_INCREMENT;
        }
        self.model
            .set_value_generation_strategy(Some(ValueGenerationStrategy::SequenceHiLo), EXPLICIT);
        self.model.set_hilo_sequence_name(Some(name), EXPLICIT);
        self.model.set_hilo_sequence_schema(schema, EXPLICIT);
        self.model.set_identity_seed(None, EXPLICIT);
        self.model.set_identity_increment(None, EXPLICIT);
        self
    }

    /// Use identity columns for generated keys by default.
    pub fn use_identity_columns(&mut self, seed: i64, increment: i64) -> &mut Self {
        self.model
            .set_value_generation_strategy(Some(ValueGenerationStrategy::IdentityColumn), EXPLICIT);
        self.model.set_identity_seed(Some(seed), EXPLICIT);
        self.model.set_identity_increment(Some(increment), EXPLICIT);
        self.model.set_hilo_sequence_name(None, EXPLICIT);
        self.model.set_hilo_sequence_schema(None, EXPLICIT);
        self
    }

    /// Add a sequence, or return the existing one.
    pub fn has_sequence(&mut self, name: &str, schema: Option<&str>) -> &mut Sequence {
        self.model.add_sequence(name, schema)
    }

    /// Run the finalization conventions, validate and freeze the model.
    pub fn finalize(mut self) -> Result<Model> {
        self.conventions.on_model_finalized(&mut self.model)?;
        ModelValidator::new(TypeMappingSource::new()).validate(&self.model)?;
        self.model.mark_finalized();
        Ok(self.model)
    }
}

pub struct EntityTypeBuilder<'a> {
    model: &'a mut Model,
    conventions: &'a ConventionSet,
    entity: String,
}

impl<'a> EntityTypeBuilder<'a> {
    fn entity_mut(&mut self) -> Result<&mut EntityType> {
        self.model
            .entity_mut(&self.entity)
            .ok_or_else(|| ProviderError::Model(format!("Entity type '{}' not found", self.entity)))
    }

    fn memory_optimized_flag(&self) -> bool {
        self.model
            .entity(&self.entity)
            .is_some_and(|e| self.model.is_memory_optimized(e))
    }

    pub fn to_table(&mut self, table: &str, schema: Option<&str>) -> Result<&mut Self> {
        let entity = self.entity_mut()?;
        entity.table = table.to_string();
        entity.schema = schema.map(str::to_string);
        Ok(self)
    }

    pub fn has_base_type(&mut self, base: &str) -> Result<&mut Self> {
        if self.model.entity(base).is_none() {
            return Err(ProviderError::Model(format!("Base type '{}' not found", base)));
        }
        self.entity_mut()?.base_type = Some(base.to_string());
        Ok(self)
    }

    /// Split this entity from the table of `principal`.
    pub fn shares_table_with(&mut self, principal: &str) -> Result<&mut Self> {
        let table = self
            .model
            .entity(principal)
            .map(|p| (p.table.clone(), p.schema.clone()))
            .ok_or_else(|| ProviderError::Model(format!("Principal type '{}' not found", principal)))?;
        if self.principal_chain_contains(principal) {
            return Err(ProviderError::Model(format!(
                "Entity type '{}' cannot share the table of '{}' because the principal chain would form a cycle",
                self.entity, principal
            )));
        }
        let entity = self.entity_mut()?;
        entity.shared_table_principal = Some(principal.to_string());
        entity.table = table.0;
        entity.schema = table.1;
        Ok(self)
    }

    /// Whether walking principals from `start` reaches this entity.
    fn principal_chain_contains(&self, start: &str) -> bool {
        let mut current = Some(start);
        for _ in 0..=self.model.entity_types.len() {
            let Some(name) = current else {
                return false;
            };
            if name == self.entity {
                return true;
            }
            current = self
                .model
                .entity(name)
                .and_then(|e| e.shared_table_principal.as_deref());
        }
        true
    }

    /// Mark the table memory-optimized. Keys and indexes of the entity and
    /// its derived types become non-clustered by convention.
    pub fn is_memory_optimized(&mut self, value: bool) -> Result<&mut Self> {
        let had_value = self.entity_mut()?.memory_optimized_annotation().is_some();
        if !self.entity_mut()?.set_memory_optimized(value, EXPLICIT) {
            return Ok(self);
        }
        let change = AnnotationChange {
            name: names::MEMORY_OPTIMIZED,
            source: EXPLICIT,
            had_value,
            has_value: true,
        };
        let affected: Vec<(String, bool)> = self
            .model
            .entity_types
            .iter()
            .filter(|e| {
                self.model
                    .base_types_inclusive(e)
                    .iter()
                    .any(|b| b.name == self.entity)
            })
            .map(|e| (e.name.clone(), self.model.is_memory_optimized(e)))
            .collect();
        for (name, flag) in affected {
            if let Some(entity) = self.model.entity_mut(&name) {
                self.conventions.on_entity_annotation_changed(flag, entity, &change);
            }
        }
        Ok(self)
    }

    /// Configure a property, adding it when missing.
    pub fn property(&mut self, name: &str, clr_type: ClrType) -> Result<PropertyBuilder<'_>> {
        let entity = self.entity_mut()?;
        match entity.property(name) {
            Some(existing) if existing.clr_type != clr_type => {
                return Err(ProviderError::Model(format!(
                    "Property '{}.{}' is already configured as '{}'",
                    entity.name, name, existing.clr_type
                )));
            }
            Some(_) => {}
            None => entity.properties.push(Property::new(name, clr_type)),
        }
        Ok(PropertyBuilder {
            model: &mut *self.model,
            conventions: self.conventions,
            property: PropertyRef::new(&self.entity, name),
        })
    }

    pub fn has_key(&mut self, properties: &[&str]) -> Result<KeyBuilder<'_>> {
        self.add_key(properties, true)
    }

    pub fn has_alternate_key(&mut self, properties: &[&str]) -> Result<KeyBuilder<'_>> {
        self.add_key(properties, false)
    }

    fn add_key(&mut self, properties: &[&str], primary: bool) -> Result<KeyBuilder<'_>> {
        let memory_optimized = self.memory_optimized_flag();
        let conventions = self.conventions;
        let entity = self.entity_mut()?;
        check_members(entity, properties)?;
        let names: Vec<String> = properties.iter().map(|p| p.to_string()).collect();
        if primary {
            entity.keys.iter_mut().for_each(|k| k.is_primary = false);
        }
        let position = match entity.keys.iter().position(|k| k.properties == names) {
            Some(i) => {
                entity.keys[i].is_primary = primary;
                i
            }
            None => {
                entity.keys.push(Key::new(names, primary));
                entity.keys.len() - 1
            }
        };
        conventions.on_key_added(memory_optimized, entity, position);
        Ok(KeyBuilder {
            key: &mut entity.keys[position],
        })
    }

    pub fn has_index(&mut self, properties: &[&str]) -> Result<IndexBuilder<'_>> {
        let memory_optimized = self.memory_optimized_flag();
        let conventions = self.conventions;
        let entity = self.entity_mut()?;
        check_members(entity, properties)?;
        let names: Vec<String> = properties.iter().map(|p| p.to_string()).collect();
        let position = match entity.indexes.iter().position(|i| i.properties == names) {
            Some(i) => i,
            None => {
                entity.indexes.push(Index::new(names));
                let last = entity.indexes.len() - 1;
                conventions.on_index_added(memory_optimized, &mut entity.indexes[last]);
                last
            }
        };
        Ok(IndexBuilder {
            index: &mut entity.indexes[position],
        })
    }
}

fn check_members(entity: &EntityType, properties: &[&str]) -> Result<()> {
    if properties.is_empty() {
        return Err(ProviderError::Model(format!(
            "A key or index on '{}' needs at least one property",
            entity.name
        )));
    }
    for p in properties {
        if entity.property(p).is_none() {
            return Err(ProviderError::Model(format!(
                "Property '{}.{}' not found",
                entity.name, p
            )));
        }
    }
    Ok(())
}

pub struct PropertyBuilder<'a> {
    model: &'a mut Model,
    conventions: &'a ConventionSet,
    property: PropertyRef,
}

impl std::fmt::Debug for PropertyBuilder<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyBuilder")
            .field("property", &self.property)
            .finish_non_exhaustive()
    }
}

impl<'a> PropertyBuilder<'a> {
    fn get(&self) -> Result<&Property> {
        self.model
            .property(&self.property)
            .map(|(_, p)| p)
            .ok_or_else(|| self.not_found())
    }

    fn get_mut(&mut self) -> Result<&mut Property> {
        let missing = self.not_found();
        self.model.property_mut(&self.property).ok_or(missing)
    }

    fn not_found(&self) -> ProviderError {
        ProviderError::Model(format!(
            "Property '{}.{}' not found",
            self.property.entity, self.property.property
        ))
    }

    /// Fail when another store-generation setting is already explicit.
    fn check_explicit_conflict(&self, name: &str) -> Result<()> {
        let property = self.get()?;
        let others = [
            names::VALUE_GENERATION_STRATEGY,
            names::DEFAULT_VALUE,
            names::DEFAULT_VALUE_SQL,
            names::COMPUTED_COLUMN_SQL,
        ];
        for other in others {
            if other == name {
                continue;
            }
            let explicit = property.annotations.configuration_source(other) == Some(EXPLICIT);
            let active = match other {
                names::VALUE_GENERATION_STRATEGY => property
                    .value_generation_strategy_annotation()
                    .is_some_and(|s| s != ValueGenerationStrategy::None),
                _ => true,
            };
            if explicit && active {
                return Err(ProviderError::ConflictingColumnServerGeneration {
                    first: short(name).to_string(),
                    second: short(other).to_string(),
                    property: self.property.property.clone(),
                    entity: self.property.entity.clone(),
                });
            }
        }
        Ok(())
    }

    /// Write an annotation explicitly and raise the property event.
    fn set_annotation(&mut self, name: &'static str, value: Option<AnnotationValue>) -> Result<()> {
        let property = self.get_mut()?;
        let had_value = property.annotations.contains(name);
        let has_value = value.is_some();
        if !property.annotations.set_or_remove(name, value, EXPLICIT) {
            return Ok(());
        }
        let change = AnnotationChange {
            name,
            source: EXPLICIT,
            had_value,
            has_value,
        };
        self.conventions
            .on_property_annotation_changed(self.model, &self.property, &change)
    }

    fn set_strategy(&mut self, strategy: Option<ValueGenerationStrategy>) -> Result<()> {
        if strategy.is_some_and(|s| s != ValueGenerationStrategy::None) {
            self.check_explicit_conflict(names::VALUE_GENERATION_STRATEGY)?;
        }
        let entity = self.property.entity.clone();
        let property = self.get_mut()?;
        let had_value = property.annotations.contains(names::VALUE_GENERATION_STRATEGY);
        if !set_strategy(&entity, property, strategy, EXPLICIT)? {
            return Ok(());
        }
        let change = AnnotationChange {
            name: names::VALUE_GENERATION_STRATEGY,
            source: EXPLICIT,
            had_value,
            has_value: strategy.is_some(),
        };
        self.conventions
            .on_property_annotation_changed(self.model, &self.property, &change)
    }

    pub fn has_value_generation_strategy(
        &mut self,
        strategy: Option<ValueGenerationStrategy>,
    ) -> Result<&mut Self> {
        self.set_strategy(strategy)?;
        Ok(self)
    }

    /// Generate values from a hi-lo sequence, creating it with an increment
    /// of 10 when missing.
    pub fn use_sequence_hilo(&mut self, name: Option<&str>, schema: Option<&str>) -> Result<&mut Self> {
        let name = name.unwrap_or(DEFAULT_HILO_SEQUENCE_NAME);
        self.set_strategy(Some(ValueGenerationStrategy::SequenceHiLo))?;
        let property = self.get_mut()?;
        property.set_hilo_sequence_name(Some(name), EXPLICIT);
        property.set_hilo_sequence_schema(schema, EXPLICIT);
        if self.model.find_sequence(name, schema).is_none() {
            self.model.add_sequence(name, schema).increment_by = HILO_SEQUENCE_INCREMENT;
        }
        Ok(self)
    }

    pub fn use_identity_column(&mut self, seed: i64, increment: i64) -> Result<&mut Self> {
        self.set_strategy(Some(ValueGenerationStrategy::IdentityColumn))?;
        let property = self.get_mut()?;
        property.set_identity_seed(Some(seed), EXPLICIT);
        property.set_identity_increment(Some(increment), EXPLICIT);
        Ok(self)
    }

    /// Set or, with `None`, clear the column default.
    pub fn has_default_value(&mut self, value: Option<AnnotationValue>) -> Result<&mut Self> {
        self.set_store_generation(names::DEFAULT_VALUE, value)?;
        Ok(self)
    }

    pub fn has_default_value_sql(&mut self, sql: Option<&str>) -> Result<&mut Self> {
        self.set_store_generation(names::DEFAULT_VALUE_SQL, sql.map(AnnotationValue::from))?;
        Ok(self)
    }

    pub fn has_computed_column_sql(&mut self, sql: Option<&str>) -> Result<&mut Self> {
        self.set_store_generation(names::COMPUTED_COLUMN_SQL, sql.map(AnnotationValue::from))?;
        Ok(self)
    }

    fn set_store_generation(&mut self, name: &'static str, value: Option<AnnotationValue>) -> Result<()> {
        if value.is_some() {
            self.check_explicit_conflict(name)?;
        }
        self.set_annotation(name, value)
    }

    pub fn value_generated_on_add(&mut self) -> Result<&mut Self> {
        self.get_mut()?
            .set_value_generated(ValueGenerated::OnAdd, EXPLICIT);
        Ok(self)
    }

    pub fn value_generated_never(&mut self) -> Result<&mut Self> {
        self.get_mut()?
            .set_value_generated(ValueGenerated::Never, EXPLICIT);
        Ok(self)
    }

    pub fn is_required(&mut self, required: bool) -> Result<&mut Self> {
        self.get_mut()?.is_nullable = !required;
        Ok(self)
    }

    pub fn has_conversion(&mut self) -> Result<&mut Self> {
        self.get_mut()?.has_value_converter = true;
        Ok(self)
    }

    pub fn has_column_type(&mut self, store_type: &str) -> Result<&mut Self> {
        self.get_mut()?.column_type = Some(store_type.to_string());
        Ok(self)
    }

    pub fn has_max_length(&mut self, length: i32) -> Result<&mut Self> {
        self.get_mut()?.max_length = Some(length);
        Ok(self)
    }

    pub fn has_precision(&mut self, precision: i32, scale: Option<i32>) -> Result<&mut Self> {
        let property = self.get_mut()?;
        property.precision = Some(precision);
        property.scale = scale;
        Ok(self)
    }

    pub fn is_unicode(&mut self, unicode: bool) -> Result<&mut Self> {
        self.get_mut()?.is_unicode = Some(unicode);
        Ok(self)
    }

    pub fn is_fixed_length(&mut self, fixed: bool) -> Result<&mut Self> {
        self.get_mut()?.is_fixed_length = Some(fixed);
        Ok(self)
    }

    /// Row-version columns are store-generated on add and update.
    pub fn is_row_version(&mut self) -> Result<&mut Self> {
        let property = self.get_mut()?;
        property.is_row_version = true;
        property.set_value_generated(ValueGenerated::OnAddOrUpdate, EXPLICIT);
        Ok(self)
    }
}

fn short(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

pub struct KeyBuilder<'a> {
    key: &'a mut Key,
}

impl KeyBuilder<'_> {
    pub fn is_clustered(&mut self, clustered: bool) -> &mut Self {
        self.key.set_clustered(Some(clustered), EXPLICIT);
        self
    }
}

pub struct IndexBuilder<'a> {
    index: &'a mut Index,
}

impl IndexBuilder<'_> {
    pub fn is_unique(&mut self, unique: bool) -> &mut Self {
        self.index.is_unique = unique;
        self
    }

    pub fn has_name(&mut self, name: &str) -> &mut Self {
        self.index.name = Some(name.to_string());
        self
    }

    pub fn is_clustered(&mut self, clustered: bool) -> &mut Self {
        self.index.set_clustered(Some(clustered), EXPLICIT);
        self
    }

    /// Non-key columns carried in the index leaf, in order.
    pub fn include(&mut self, properties: &[&str]) -> &mut Self {
        let names = properties.iter().map(|p| p.to_string()).collect();
        self.index.set_include_properties(Some(names), EXPLICIT);
        self
    }

    pub fn is_created_online(&mut self, online: bool) -> &mut Self {
        self.index.set_created_online(Some(online), EXPLICIT);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_generation::strategy::effective_strategy;

    fn blog_builder() -> ModelBuilder {
        let mut builder = ModelBuilder::new();
        {
            let mut blog = builder.entity("Blog");
            blog.property("Id", ClrType::Int32).unwrap();
            blog.property("Name", ClrType::String).unwrap();
            blog.has_key(&["Id"]).unwrap();
        }
        builder
    }

    #[test]
    fn test_identity_by_convention() {
        let builder = blog_builder();
        let model = builder.model();
        let blog = model.entity("Blog").unwrap();
        let id = blog.property("Id").unwrap();
        assert_eq!(id.value_generated, ValueGenerated::OnAdd);
        assert_eq!(
            effective_strategy(model, blog, id),
            ValueGenerationStrategy::IdentityColumn
        );
    }

    #[test]
    fn test_model_hilo_creates_sequence_and_clears_identity() {
        let mut builder = blog_builder();
        builder.use_identity_columns(100, 5);
        builder.use_sequence_hilo(None, Some("dbo"));
        let model = builder.model();
        let sequence = model
            .find_sequence(DEFAULT_HILO_SEQUENCE_NAME, Some("dbo"))
            .unwrap();
        assert_eq!(sequence.increment_by, 10);
        assert_eq!(model.identity_seed(), 1);
        assert_eq!(model.hilo_sequence_schema(), Some("dbo"));

        builder.use_identity_columns(100, 5);
        assert_eq!(builder.model().hilo_sequence_name(), None);
        assert_eq!(builder.model().identity_seed(), 100);
    }

    #[test]
    fn test_property_strategy_round_trip_clears_other_settings() {
        let mut builder = blog_builder();
        {
            let mut blog = builder.entity("Blog");
            let mut id = blog.property("Id", ClrType::Int32).unwrap();
            id.use_sequence_hilo(Some("BlogIds"), None).unwrap();
            id.use_identity_column(10, 2).unwrap();
        }
        let (_, id) = builder.model().property(&PropertyRef::new("Blog", "Id")).unwrap();
        assert_eq!(id.hilo_sequence_name(), None);
        assert_eq!(id.identity_seed(), Some(10));
        assert_eq!(id.identity_increment(), Some(2));

        {
            let mut blog = builder.entity("Blog");
            blog.property("Id", ClrType::Int32)
                .unwrap()
                .use_sequence_hilo(Some("BlogIds"), None)
                .unwrap();
        }
        let (_, id) = builder.model().property(&PropertyRef::new("Blog", "Id")).unwrap();
        assert_eq!(id.identity_seed(), None);
        assert_eq!(id.hilo_sequence_name(), Some("BlogIds"));
        assert!(builder.model().find_sequence("BlogIds", None).is_some());
    }

    #[test]
    fn test_explicit_conflict_fails_immediately() {
        let mut builder = blog_builder();
        let mut blog = builder.entity("Blog");
        let mut id = blog.property("Id", ClrType::Int32).unwrap();
        id.use_identity_column(1, 1).unwrap();
        let err = id.has_default_value_sql(Some("0")).unwrap_err();
        match err {
            ProviderError::ConflictingColumnServerGeneration { property, entity, .. } => {
                assert_eq!(property, "Id");
                assert_eq!(entity, "Blog");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_identity_allowed_after_default_sql_cleared() {
        let mut builder = blog_builder();
        let mut blog = builder.entity("Blog");
        let mut id = blog.property("Id", ClrType::Int32).unwrap();
        id.has_default_value_sql(Some("NEXT VALUE FOR [Ids]")).unwrap();

        let err = id.use_identity_column(1, 1).unwrap_err();
        assert!(matches!(err, ProviderError::ConflictingColumnServerGeneration { .. }));

        id.has_default_value_sql(None).unwrap();
        id.use_identity_column(1, 1).unwrap();

        let (_, property) = builder.model().property(&PropertyRef::new("Blog", "Id")).unwrap();
        assert!(!property.annotations.contains(names::DEFAULT_VALUE_SQL));
        assert_eq!(
            property.value_generation_strategy_annotation(),
            Some(ValueGenerationStrategy::IdentityColumn)
        );
    }

    #[test]
    fn test_clearing_default_value_and_computed_sql() {
        let mut builder = blog_builder();
        {
            let mut blog = builder.entity("Blog");
            let mut name = blog.property("Name", ClrType::String).unwrap();
            name.has_default_value(Some("untitled".into())).unwrap();
            name.has_default_value(None).unwrap();
            name.has_computed_column_sql(Some("UPPER([Title])")).unwrap();
            name.has_computed_column_sql(None).unwrap();
        }
        let (_, name) = builder.model().property(&PropertyRef::new("Blog", "Name")).unwrap();
        assert!(!name.annotations.contains(names::DEFAULT_VALUE));
        assert!(!name.annotations.contains(names::COMPUTED_COLUMN_SQL));
    }

    #[test]
    fn test_identity_then_hilo_clears_seed_and_increment() {
        let mut builder = blog_builder();
        {
            let mut blog = builder.entity("Blog");
            let mut id = blog.property("Id", ClrType::Int32).unwrap();
            id.use_identity_column(5, 2).unwrap();
            id.use_sequence_hilo(Some("S1"), None).unwrap();
        }
        let (_, id) = builder.model().property(&PropertyRef::new("Blog", "Id")).unwrap();
        assert_eq!(id.identity_seed(), None);
        assert_eq!(id.identity_increment(), None);
        assert_eq!(id.hilo_sequence_name(), Some("S1"));
        assert_eq!(
            id.value_generation_strategy_annotation(),
            Some(ValueGenerationStrategy::SequenceHiLo)
        );
    }

    #[test]
    fn test_shares_table_with_rejects_cycles() {
        let mut builder = blog_builder();
        {
            let mut details = builder.entity("BlogDetails");
            details.property("BlogId", ClrType::Int32).unwrap();
            details.has_key(&["BlogId"]).unwrap();
            details.shares_table_with("Blog").unwrap();
        }
        {
            let mut extra = builder.entity("BlogExtra");
            extra.property("BlogId", ClrType::Int32).unwrap();
            extra.shares_table_with("BlogDetails").unwrap();
        }

        let err = builder.entity("Blog").shares_table_with("BlogExtra").err().unwrap();
        assert!(matches!(err, ProviderError::Model(ref msg) if msg.contains("cycle")));
        let err = builder.entity("Blog").shares_table_with("Blog").err().unwrap();
        assert!(matches!(err, ProviderError::Model(_)));
        assert!(builder.model().entity("Blog").unwrap().shared_table_principal.is_none());
    }

    #[test]
    fn test_identity_on_string_property_fails() {
        let mut builder = blog_builder();
        let mut blog = builder.entity("Blog");
        let err = blog
            .property("Name", ClrType::String)
            .unwrap()
            .use_identity_column(1, 1)
            .unwrap_err();
        assert!(matches!(err, ProviderError::IdentityBadType { .. }));
    }

    #[test]
    fn test_memory_optimized_marks_keys_and_new_indexes() {
        let mut builder = blog_builder();
        {
            let mut blog = builder.entity("Blog");
            blog.is_memory_optimized(true).unwrap();
            blog.has_index(&["Name"]).unwrap().include(&["Id"]);
        }
        let blog = builder.model().entity("Blog").unwrap();
        assert_eq!(blog.keys[0].clustered_annotation(), Some(false));
        assert_eq!(blog.indexes[0].clustered_annotation(), Some(false));
        assert_eq!(blog.indexes[0].include_properties(), Some(&["Id".to_string()][..]));
    }

    #[test]
    fn test_finalize_stamps_and_validates() {
        let model = blog_builder().finalize().unwrap();
        assert!(model.is_finalized());
        let id = model.entity("Blog").unwrap().property("Id").unwrap();
        assert_eq!(
            id.value_generation_strategy_annotation(),
            Some(ValueGenerationStrategy::IdentityColumn)
        );
    }

    #[test]
    fn test_default_value_turns_off_convention_identity() {
        let mut builder = blog_builder();
        {
            let mut blog = builder.entity("Blog");
            blog.property("Id", ClrType::Int32)
                .unwrap()
                .has_default_value_sql(Some("NEXT VALUE FOR [Ids]"))
                .unwrap();
        }
        let model = builder.finalize().unwrap();
        let id = model.entity("Blog").unwrap().property("Id").unwrap();
        assert_eq!(id.value_generation_strategy_annotation(), None);
    }
}
