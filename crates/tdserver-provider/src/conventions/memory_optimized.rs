//! Memory-optimized tables cannot have clustered keys or indexes.

use crate::metadata::{names, ConfigurationSource, EntityType, Index};

use super::{AnnotationChange, ConventionFlow};

/// Re-mark keys and indexes when the memory-optimized flag changes: non-clustered
/// when set, convention value removed when cleared.
pub fn memory_optimized_tables(
    memory_optimized: bool,
    entity: &mut EntityType,
    change: &AnnotationChange<'_>,
) -> ConventionFlow {
    if change.name != names::MEMORY_OPTIMIZED {
        return ConventionFlow::Continue;
    }
    let clustered = if memory_optimized {
        Some(false)
    } else {
        None
    };
    for key in &mut entity.keys {
        key.set_clustered(clustered, ConfigurationSource::Convention);
    }
    for index in &mut entity.indexes {
        index.set_clustered(clustered, ConfigurationSource::Convention);
    }
    ConventionFlow::Continue
}

pub fn memory_optimized_key_added(memory_optimized: bool, entity: &mut EntityType, key: usize) -> ConventionFlow {
    if memory_optimized {
        if let Some(key) = entity.keys.get_mut(key) {
            key.set_clustered(Some(false), ConfigurationSource::Convention);
        }
    }
    ConventionFlow::Continue
}

pub fn memory_optimized_index_added(memory_optimized: bool, index: &mut Index) -> ConventionFlow {
    if memory_optimized {
        index.set_clustered(Some(false), ConfigurationSource::Convention);
    }
    ConventionFlow::Continue
}
