//! Typed accessors over the annotation bags.
//!
//! Every dialect setting is read and written through these helpers so that
//! annotation names and value shapes stay in one place.

use super::annotations::{names, AnnotationValue, ConfigurationSource};
use super::model::{EntityType, Index, Key, Model, Property, ValueGenerationStrategy};

/// Default name of the model-wide hi-lo sequence.
pub const DEFAULT_HILO_SEQUENCE_NAME: &str = "EntityFrameworkHiLoSequence";

/// Default identity seed and increment.
pub const DEFAULT_IDENTITY_SEED: i64 = 1;
pub const DEFAULT_IDENTITY_INCREMENT: i64 = 1;

/// Identifier length limit of the engine.
pub const MAX_IDENTIFIER_LENGTH: i64 = 128;

impl Model {
    pub fn value_generation_strategy(&self) -> Option<ValueGenerationStrategy> {
        self.annotations
            .get(names::VALUE_GENERATION_STRATEGY)
            .and_then(AnnotationValue::as_strategy)
    }

    pub fn set_value_generation_strategy(
        &mut self,
        value: Option<ValueGenerationStrategy>,
        source: ConfigurationSource,
    ) -> bool {
        self.annotations
            .set_or_remove(names::VALUE_GENERATION_STRATEGY, value, source)
    }

    pub fn hilo_sequence_name(&self) -> Option<&str> {
        self.annotations
            .get(names::HILO_SEQUENCE_NAME)
            .and_then(AnnotationValue::as_text)
    }

    pub fn set_hilo_sequence_name(&mut self, value: Option<&str>, source: ConfigurationSource) -> bool {
        self.annotations
            .set_or_remove(names::HILO_SEQUENCE_NAME, value, source)
    }

    pub fn hilo_sequence_schema(&self) -> Option<&str> {
        self.annotations
            .get(names::HILO_SEQUENCE_SCHEMA)
            .and_then(AnnotationValue::as_text)
    }

    pub fn set_hilo_sequence_schema(&mut self, value: Option<&str>, source: ConfigurationSource) -> bool {
        self.annotations
            .set_or_remove(names::HILO_SEQUENCE_SCHEMA, value, source)
    }

    /// Model identity seed, 1 when unset.
    pub fn identity_seed(&self) -> i64 {
        self.annotations
            .get(names::IDENTITY_SEED)
            .and_then(AnnotationValue::as_int)
            .unwrap_or(DEFAULT_IDENTITY_SEED)
    }

    pub fn set_identity_seed(&mut self, value: Option<i64>, source: ConfigurationSource) -> bool {
        self.annotations.set_or_remove(names::IDENTITY_SEED, value, source)
    }

    /// Model identity increment, 1 when unset.
    pub fn identity_increment(&self) -> i64 {
        self.annotations
            .get(names::IDENTITY_INCREMENT)
            .and_then(AnnotationValue::as_int)
            .unwrap_or(DEFAULT_IDENTITY_INCREMENT)
    }

    pub fn set_identity_increment(&mut self, value: Option<i64>, source: ConfigurationSource) -> bool {
        self.annotations
            .set_or_remove(names::IDENTITY_INCREMENT, value, source)
    }

    pub fn max_identifier_length(&self) -> i64 {
        self.annotations
            .get(names::MAX_IDENTIFIER_LENGTH)
            .and_then(AnnotationValue::as_int)
            .unwrap_or(MAX_IDENTIFIER_LENGTH)
    }

    /// True if the entity or any of its base types is memory-optimized.
    pub fn is_memory_optimized(&self, entity: &EntityType) -> bool {
        self.base_types_inclusive(entity)
            .iter()
            .any(|e| e.memory_optimized_annotation() == Some(true))
    }

    /// Clustered flag of a key, defaulting from the shared-table root key.
    pub fn is_clustered_key(&self, entity: &EntityType, key: &Key) -> Option<bool> {
        if let Some(clustered) = key.clustered_annotation() {
            return Some(clustered);
        }
        if !key.is_primary {
            return None;
        }
        let root = self.shared_table_root(entity)?;
        root.primary_key()?.clustered_annotation()
    }
}

impl EntityType {
    pub fn memory_optimized_annotation(&self) -> Option<bool> {
        self.annotations
            .get(names::MEMORY_OPTIMIZED)
            .and_then(AnnotationValue::as_bool)
    }

    pub fn set_memory_optimized(&mut self, value: bool, source: ConfigurationSource) -> bool {
        self.annotations.set(names::MEMORY_OPTIMIZED, value, source)
    }
}

impl Property {
    pub fn value_generation_strategy_annotation(&self) -> Option<ValueGenerationStrategy> {
        self.annotations
            .get(names::VALUE_GENERATION_STRATEGY)
            .and_then(AnnotationValue::as_strategy)
    }

    pub fn hilo_sequence_name(&self) -> Option<&str> {
        self.annotations
            .get(names::HILO_SEQUENCE_NAME)
            .and_then(AnnotationValue::as_text)
    }

    pub fn set_hilo_sequence_name(&mut self, value: Option<&str>, source: ConfigurationSource) -> bool {
        self.annotations
            .set_or_remove(names::HILO_SEQUENCE_NAME, value, source)
    }

    pub fn hilo_sequence_schema(&self) -> Option<&str> {
        self.annotations
            .get(names::HILO_SEQUENCE_SCHEMA)
            .and_then(AnnotationValue::as_text)
    }

    pub fn set_hilo_sequence_schema(&mut self, value: Option<&str>, source: ConfigurationSource) -> bool {
        self.annotations
            .set_or_remove(names::HILO_SEQUENCE_SCHEMA, value, source)
    }

    pub fn identity_seed(&self) -> Option<i64> {
        self.annotations
            .get(names::IDENTITY_SEED)
            .and_then(AnnotationValue::as_int)
    }

    pub fn set_identity_seed(&mut self, value: Option<i64>, source: ConfigurationSource) -> bool {
        self.annotations.set_or_remove(names::IDENTITY_SEED, value, source)
    }

    pub fn identity_increment(&self) -> Option<i64> {
        self.annotations
            .get(names::IDENTITY_INCREMENT)
            .and_then(AnnotationValue::as_int)
    }

    pub fn set_identity_increment(&mut self, value: Option<i64>, source: ConfigurationSource) -> bool {
        self.annotations
            .set_or_remove(names::IDENTITY_INCREMENT, value, source)
    }

    pub fn default_value(&self) -> Option<&AnnotationValue> {
        self.annotations.get(names::DEFAULT_VALUE)
    }

    pub fn default_value_sql(&self) -> Option<&str> {
        self.annotations
            .get(names::DEFAULT_VALUE_SQL)
            .and_then(AnnotationValue::as_text)
    }

    pub fn computed_column_sql(&self) -> Option<&str> {
        self.annotations
            .get(names::COMPUTED_COLUMN_SQL)
            .and_then(AnnotationValue::as_text)
    }

    /// True if a default value, default SQL or computed SQL is configured.
    pub fn has_store_default(&self) -> bool {
        self.default_value().is_some()
            || self.default_value_sql().is_some()
            || self.computed_column_sql().is_some()
    }
}

impl Key {
    pub fn clustered_annotation(&self) -> Option<bool> {
        self.annotations
            .get(names::CLUSTERED)
            .and_then(AnnotationValue::as_bool)
    }

    pub fn set_clustered(&mut self, value: Option<bool>, source: ConfigurationSource) -> bool {
        self.annotations.set_or_remove(names::CLUSTERED, value, source)
    }
}

impl Index {
    pub fn clustered_annotation(&self) -> Option<bool> {
        self.annotations
            .get(names::CLUSTERED)
            .and_then(AnnotationValue::as_bool)
    }

    pub fn set_clustered(&mut self, value: Option<bool>, source: ConfigurationSource) -> bool {
        self.annotations.set_or_remove(names::CLUSTERED, value, source)
    }

    pub fn include_properties(&self) -> Option<&[String]> {
        self.annotations
            .get(names::INCLUDE)
            .and_then(AnnotationValue::as_list)
    }

    pub fn set_include_properties(
        &mut self,
        value: Option<Vec<String>>,
        source: ConfigurationSource,
    ) -> bool {
        self.annotations.set_or_remove(names::INCLUDE, value, source)
    }

    pub fn created_online_annotation(&self) -> Option<bool> {
        self.annotations
            .get(names::CREATED_ONLINE)
            .and_then(AnnotationValue::as_bool)
    }

    pub fn set_created_online(&mut self, value: Option<bool>, source: ConfigurationSource) -> bool {
        self.annotations.set_or_remove(names::CREATED_ONLINE, value, source)
    }
}
