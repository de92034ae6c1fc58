//! # tdserver-provider
//!
//! Dialect provider core for TdServer databases.
//!
//! This library supplies the pieces an object-relational mapper needs to
//! target TdServer:
//!
//! - **Metadata annotations** for identity, hi-lo sequences, clustering,
//!   included columns and memory-optimized tables
//! - **Type mapping** from semantic types and store type names to store types
//! - **Value generation** with identity columns, hi-lo sequences and
//!   sequential GUIDs
//! - **Query translation** of common method calls to TdServer SQL, with
//!   search-condition post-processing and paging
//! - **Migrations** annotations, database create/drop scripts and the
//!   history table
//! - **Administration**: create, drop, exists and has-tables with retries on
//!   transient connection failures
//!
//! ## Example
//!
//! ```rust,no_run
//! use tdserver_provider::{ClrType, ModelBuilder, ProviderConfig, ProviderServices};
//!
//! fn main() -> tdserver_provider::Result<()> {
//!     let config = ProviderConfig::load("config.yaml")?;
//!     let services = ProviderServices::new(config)?;
//!
//!     let mut builder = services.model_builder();
//!     builder.use_sequence_hilo(None, None);
//!     builder.entity("Order").property("Id", ClrType::Int32)?;
//!     builder.entity("Order").has_key(&["Id"])?;
//!     let model = builder.finalize()?;
//!
//!     let creator = services.database_creator();
//!     if !creator.exists()? {
//!         creator.create()?;
//!     }
//!     println!("{} entity types", model.entity_types.len());
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod conventions;
pub mod error;
pub mod metadata;
pub mod migrations;
pub mod query;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod update;
pub mod value_generation;

// Re-exports for convenient access
pub use builder::{EntityTypeBuilder, IndexBuilder, KeyBuilder, ModelBuilder, PropertyBuilder};
pub use config::{AdminConfig, ConnectionConfig, ProviderConfig, ProviderOptions, RetryConfig};
pub use error::{ProviderError, Result};
pub use metadata::{ClrType, ConfigurationSource, EntityType, Model, Property, ValueGenerationStrategy};
pub use services::ProviderServices;
pub use storage::{DatabaseConnection, DatabaseCreator, DatabaseSession, SqlValue, StoreTypeMapping, TypeMappingSource};
