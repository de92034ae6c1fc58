//! Modification command batching.

use crate::config::ProviderOptions;
use crate::error::Result;

use super::sql_generator::{ModificationCommand, UpdateSqlGenerator};

/// Commands per batch when no maximum is configured.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 42;

/// Parameter limit of a single server request.
pub const MAX_PARAMETER_COUNT: usize = 2100;

/// Ordered group of commands sent in one round trip.
#[derive(Debug, Clone)]
pub struct ModificationCommandBatch {
    max_batch_size: usize,
    commands: Vec<ModificationCommand>,
    parameter_count: usize,
}

impl ModificationCommandBatch {
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            commands: Vec::new(),
            parameter_count: 0,
        }
    }

    /// Add `command` unless the batch is full. Returns false when it did not fit.
    pub fn add_command(&mut self, command: ModificationCommand) -> bool {
        if self.commands.len() >= self.max_batch_size {
            return false;
        }
        let parameters = command.parameter_count();
        if !self.commands.is_empty() && self.parameter_count + parameters > MAX_PARAMETER_COUNT {
            return false;
        }
        self.parameter_count += parameters;
        self.commands.push(command);
        true
    }

    pub fn commands(&self) -> &[ModificationCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Script for the whole batch.
    pub fn generate_sql(&self, generator: &UpdateSqlGenerator) -> Result<String> {
        let mut sql = String::new();
        let mut next = 0;
        for command in &self.commands {
            next = generator.append(&mut sql, command, next)?;
        }
        Ok(sql)
    }
}

/// Creates batches sized by the provider options.
#[derive(Debug, Clone, Copy)]
pub struct ModificationCommandBatchFactory {
    max_batch_size: usize,
}

impl ModificationCommandBatchFactory {
    pub fn new(options: &ProviderOptions) -> Self {
        Self {
            max_batch_size: options.max_batch_size.unwrap_or(DEFAULT_MAX_BATCH_SIZE),
        }
    }

    pub fn create(&self) -> ModificationCommandBatch {
        ModificationCommandBatch::new(self.max_batch_size)
    }
}
