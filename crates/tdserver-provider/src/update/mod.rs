//! Row modification SQL and batching.

mod batch;
mod sql_generator;

pub use batch::{
    ModificationCommandBatch, ModificationCommandBatchFactory, DEFAULT_MAX_BATCH_SIZE,
    MAX_PARAMETER_COUNT,
};
pub use sql_generator::{ModificationCommand, ModificationKind, UpdateSqlGenerator};
