//! Convention pipeline.
//!
//! Conventions are plain functions registered per model event. The builder
//! raises an event after every successful write and runs the registered
//! functions in order until one returns [`ConventionFlow::Stop`].

mod memory_optimized;
mod store_generation;
mod value_generation;

use crate::error::Result;
use crate::metadata::{ConfigurationSource, EntityType, Index, Model, PropertyRef};

pub use memory_optimized::{memory_optimized_index_added, memory_optimized_key_added, memory_optimized_tables};
pub use store_generation::store_generation;
pub use value_generation::{
    key_value_generated, max_identifier_length, stamp_value_generation_strategies,
    validate_store_generation, value_generated_on_change, value_generation_strategy_default,
};

/// Whether later conventions for the same event should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConventionFlow {
    Continue,
    Stop,
}

/// An annotation write that triggered an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationChange<'a> {
    pub name: &'a str,
    pub source: ConfigurationSource,
    /// A value was present before the write.
    pub had_value: bool,
    /// A value is present after the write.
    pub has_value: bool,
}

pub type ModelInitializedConvention = fn(&mut Model) -> ConventionFlow;
pub type PropertyAnnotationChangedConvention =
    fn(&mut Model, &PropertyRef, &AnnotationChange<'_>) -> Result<ConventionFlow>;
/// Receives the entity's effective memory-optimized flag, inherited from bases.
pub type EntityAnnotationChangedConvention = fn(bool, &mut EntityType, &AnnotationChange<'_>) -> ConventionFlow;
/// Receives the entity's memory-optimized flag and the new key's position.
pub type KeyAddedConvention = fn(bool, &mut EntityType, usize) -> ConventionFlow;
pub type IndexAddedConvention = fn(bool, &mut Index) -> ConventionFlow;
pub type ModelFinalizedConvention = fn(&mut Model) -> Result<ConventionFlow>;

/// Ordered conventions for each model event.
#[derive(Clone, Default)]
pub struct ConventionSet {
    pub model_initialized: Vec<ModelInitializedConvention>,
    pub property_annotation_changed: Vec<PropertyAnnotationChangedConvention>,
    pub entity_annotation_changed: Vec<EntityAnnotationChangedConvention>,
    pub key_added: Vec<KeyAddedConvention>,
    pub index_added: Vec<IndexAddedConvention>,
    pub model_finalized: Vec<ModelFinalizedConvention>,
}

impl ConventionSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The provider's convention set.
    pub fn provider() -> Self {
        Self {
            model_initialized: vec![value_generation_strategy_default, max_identifier_length],
            property_annotation_changed: vec![store_generation, value_generated_on_change],
            entity_annotation_changed: vec![memory_optimized_tables],
            key_added: vec![memory_optimized_key_added, key_value_generated],
            index_added: vec![memory_optimized_index_added],
            model_finalized: vec![stamp_value_generation_strategies, validate_store_generation],
        }
    }

    pub fn on_model_initialized(&self, model: &mut Model) {
        for convention in &self.model_initialized {
            if convention(model) == ConventionFlow::Stop {
                break;
            }
        }
    }

    pub fn on_property_annotation_changed(
        &self,
        model: &mut Model,
        property: &PropertyRef,
        change: &AnnotationChange<'_>,
    ) -> Result<()> {
        for convention in &self.property_annotation_changed {
            if convention(model, property, change)? == ConventionFlow::Stop {
                break;
            }
        }
        Ok(())
    }

    pub fn on_entity_annotation_changed(
        &self,
        memory_optimized: bool,
        entity: &mut EntityType,
        change: &AnnotationChange<'_>,
    ) {
        for convention in &self.entity_annotation_changed {
            if convention(memory_optimized, entity, change) == ConventionFlow::Stop {
                break;
            }
        }
    }

    pub fn on_key_added(&self, memory_optimized: bool, entity: &mut EntityType, key: usize) {
        for convention in &self.key_added {
            if convention(memory_optimized, entity, key) == ConventionFlow::Stop {
                break;
            }
        }
    }

    pub fn on_index_added(&self, memory_optimized: bool, index: &mut Index) {
        for convention in &self.index_added {
            if convention(memory_optimized, index) == ConventionFlow::Stop {
                break;
            }
        }
    }

    pub fn on_model_finalized(&self, model: &mut Model) -> Result<()> {
        for convention in &self.model_finalized {
            if convention(model)? == ConventionFlow::Stop {
                break;
            }
        }
        Ok(())
    }
}
