//! Chooses the client-side generator for a property.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{ProviderError, Result};
use crate::metadata::{ClrType, EntityType, Model, Property, ValueGenerated, ValueGenerationStrategy};
use crate::storage::DatabaseConnection;

use super::cache::ValueGeneratorCache;
use super::hilo::{GeneratedValue, SequenceHiLoValueGenerator, SequenceValueGeneratorFactory};
use super::strategy::{effective_strategy, hilo_sequence_key};

/// 100ns ticks between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// GUIDs whose last eight bytes follow an increasing counter, so rows
/// inserted together sort together in the store's GUID ordering.
#[derive(Debug)]
pub struct SequentialGuidGenerator {
    counter: AtomicI64,
}

impl Default for SequentialGuidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequentialGuidGenerator {
    /// Counter seeded from the current time in ticks.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let ticks = now.timestamp() * 10_000_000
            + i64::from(now.timestamp_subsec_nanos() / 100)
            + UNIX_EPOCH_TICKS;
        Self::with_seed(ticks)
    }

    pub fn with_seed(seed: i64) -> Self {
        Self {
            counter: AtomicI64::new(seed),
        }
    }

    pub fn next(&self) -> Uuid {
        let mut bytes = *Uuid::new_v4().as_bytes();
        let counter = self.counter.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let c = counter.to_le_bytes();
        bytes[8] = c[1];
        bytes[9] = c[0];
        bytes[10] = c[7];
        bytes[11] = c[6];
        bytes[12] = c[5];
        bytes[13] = c[4];
        bytes[14] = c[3];
        bytes[15] = c[2];
        Uuid::from_bytes(bytes)
    }
}

/// Generator selected for a property.
pub enum ValueGenerator {
    HiLo(SequenceHiLoValueGenerator),
    SequentialGuid(Arc<SequentialGuidGenerator>),
}

impl ValueGenerator {
    pub fn generates_temporary_values(&self) -> bool {
        false
    }

    pub async fn next_value_async(&self, cancel: &CancellationToken) -> Result<GeneratedValue> {
        match self {
            ValueGenerator::HiLo(g) => g.next_value_async(cancel).await,
            ValueGenerator::SequentialGuid(g) => Ok(GeneratedValue::Guid(g.next())),
        }
    }

    pub fn next_value(&self) -> Result<GeneratedValue> {
        match self {
            ValueGenerator::HiLo(g) => g.next_value(),
            ValueGenerator::SequentialGuid(g) => Ok(GeneratedValue::Guid(g.next())),
        }
    }
}

/// Picks hi-lo generators for sequence properties and sequential GUIDs for
/// generated GUID keys. Anything else is left to the store.
pub struct ValueGeneratorSelector {
    cache: Arc<ValueGeneratorCache>,
    factory: SequenceValueGeneratorFactory,
    connection: Arc<dyn DatabaseConnection>,
    guids: Arc<SequentialGuidGenerator>,
}

impl ValueGeneratorSelector {
    pub fn new(
        cache: Arc<ValueGeneratorCache>,
        factory: SequenceValueGeneratorFactory,
        connection: Arc<dyn DatabaseConnection>,
    ) -> Self {
        Self {
            cache,
            factory,
            connection,
            guids: Arc::new(SequentialGuidGenerator::new()),
        }
    }

    pub fn select(
        &self,
        model: &Model,
        entity: &EntityType,
        property: &Property,
    ) -> Result<Option<ValueGenerator>> {
        if effective_strategy(model, entity, property) == ValueGenerationStrategy::SequenceHiLo {
            let (name, schema) = hilo_sequence_key(model, property);
            let sequence = model.find_sequence(name, schema).ok_or_else(|| {
                ProviderError::SequenceNotFound {
                    sequence: match schema {
                        Some(schema) => format!("{}.{}", schema, name),
                        None => name.to_string(),
                    },
                    property: property.name.clone(),
                    entity: entity.name.clone(),
                }
            })?;
            let state = self
                .cache
                .get_or_add_sequence_state(sequence, self.connection.as_ref())?;
            let generator =
                self.factory
                    .create(&entity.name, property, state, Arc::clone(&self.connection))?;
            return Ok(Some(ValueGenerator::HiLo(generator)));
        }

        if property.clr_type == ClrType::Guid && property.value_generated == ValueGenerated::OnAdd {
            return Ok(Some(ValueGenerator::SequentialGuid(Arc::clone(&self.guids))));
        }

        Ok(None)
    }
}
