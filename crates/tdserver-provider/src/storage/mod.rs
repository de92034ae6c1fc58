//! Storage layer: type mappings, connections, error classification,
//! execution strategies and database administration.

mod connection;
mod creator;
mod error_codes;
mod execution_strategy;
mod mapping;
pub mod sql_helper;
mod type_mapping;
mod value;

pub use connection::{
    DatabaseConnection, DatabaseSession, PoolRegistry, TdServerConnection, TdServerSession,
    TiberiusConnectionManager,
};
pub use creator::{DatabaseCreator, HAS_TABLES_SQL};
pub use error_codes::{ErrorCodeTable, ProbeFailure};
pub use execution_strategy::{ExecutionStrategy, RetryingStrategy, TRANSIENT_ERROR_NUMBERS};
pub use mapping::{store_type_name_base, MappingFacets, StoreTypeMapping, StoreTypePostfix, ANSI_MAX, UNICODE_MAX};
pub use type_mapping::{MappingInfo, TypeMappingSource};
pub use value::SqlValue;
