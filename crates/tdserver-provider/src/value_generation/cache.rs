//! Per-sequence hi-lo state shared across generators.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::metadata::Sequence;
use crate::storage::DatabaseConnection;

/// Block of values handed out in-process; `next == high` means exhausted.
#[derive(Debug, Default)]
struct HiLoBlock {
    next: i64,
    high: i64,
}

/// Hi-lo state for one sequence on one database.
#[derive(Debug)]
pub struct SequenceValueGeneratorState {
    sequence: Sequence,
    block_size: i64,
    block: tokio::sync::Mutex<HiLoBlock>,
}

impl SequenceValueGeneratorState {
    /// State for `sequence`; the block size is its increment.
    pub fn new(sequence: Sequence) -> Result<Self> {
        if sequence.increment_by < 1 {
            return Err(ProviderError::Model(format!(
                "The block size used for Hi-Lo value generation must be positive. Sequence '{}' has an increment of {}.",
                sequence.name, sequence.increment_by
            )));
        }
        Ok(Self {
            block_size: i64::from(sequence.increment_by),
            sequence,
            block: tokio::sync::Mutex::new(HiLoBlock::default()),
        })
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn block_size(&self) -> i64 {
        self.block_size
    }

    /// Next value, reserving a new block through `new_low` when the current
    /// one is used up. Concurrent callers never receive the same value.
    pub async fn next<F, Fut>(&self, new_low: F) -> Result<i64>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<i64>>,
    {
        let mut block = self.block.lock().await;
        if block.next >= block.high {
            let low = new_low().await?;
            debug!(
                "Reserved hi-lo block [{}, {}) from sequence {}",
                low,
                low + self.block_size,
                self.sequence.name
            );
            *block = HiLoBlock {
                next: low,
                high: low + self.block_size,
            };
        }
        let value = block.next;
        block.next += 1;
        Ok(value)
    }
}

/// Concurrent map of sequence states, keyed by database, data source and
/// sequence. An entry is created once and never replaced.
#[derive(Debug, Default)]
pub struct ValueGeneratorCache {
    states: Mutex<HashMap<String, Arc<SequenceValueGeneratorState>>>,
}

impl ValueGeneratorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `DATABASE::DATASOURCE::[schema.]name`, database and data source upper-cased.
    pub fn sequence_key(sequence: &Sequence, database: &str, data_source: &str) -> String {
        let qualified = match &sequence.schema {
            Some(schema) => format!("{}.{}", schema, sequence.name),
            None => sequence.name.clone(),
        };
        format!(
            "{}::{}::{}",
            database.to_uppercase(),
            data_source.to_uppercase(),
            qualified
        )
    }

    pub fn get_or_add_sequence_state(
        &self,
        sequence: &Sequence,
        connection: &dyn DatabaseConnection,
    ) -> Result<Arc<SequenceValueGeneratorState>> {
        let key = Self::sequence_key(sequence, connection.database(), connection.data_source());
        let mut states = self
            .states
            .lock()
            .map_err(|_| ProviderError::Model("value generator cache lock poisoned".into()))?;
        if let Some(state) = states.get(&key) {
            return Ok(Arc::clone(state));
        }
        let state = Arc::new(SequenceValueGeneratorState::new(sequence.clone())?);
        states.insert(key, Arc::clone(&state));
        Ok(state)
    }

    pub fn len(&self) -> usize {
        self.states.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
