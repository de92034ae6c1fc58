//! Migration support: dialect annotations, operation scripting, snapshots
//! and the history table.

mod annotation_provider;
mod code_generator;
mod history;
mod operations;
mod sql_generator;

pub use annotation_provider::{MigrationAnnotation, MigrationsAnnotationProvider};
pub use code_generator::{
    is_ignored_annotation, MigrationsCodeGenerator, IGNORED_ANNOTATIONS, IGNORED_ANNOTATION_PREFIXES,
};
pub use history::{HistoryRepository, HistoryRow, DEFAULT_TABLE_NAME as HISTORY_TABLE_NAME};
pub use operations::{AnnotatedOperation, MigrationCommand, MigrationOperation};
pub use sql_generator::MigrationsSqlGenerator;
