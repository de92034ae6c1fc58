//! Provider service registration.
//!
//! [`ProviderServices`] is built once per distinct option set and hands out
//! the provider's implementation of each service role. Shared state (pools,
//! sequence states, translator tables) lives behind `Arc` so every consumer
//! of the same services sees the same instances.

use std::sync::Arc;

use tracing::debug;

use crate::builder::ModelBuilder;
use crate::config::{ProviderConfig, ProviderOptions};
use crate::conventions::ConventionSet;
use crate::error::Result;
use crate::metadata::ModelValidator;
use crate::migrations::{HistoryRepository, MigrationsAnnotationProvider, MigrationsSqlGenerator};
use crate::query::{
    CompiledQueryCacheKeyGenerator, MemberTranslatorProvider, MethodCallTranslatorProvider, MethodCatalog,
    QueryPostprocessor, QuerySqlGenerator, SqlExpressionFactory,
};
use crate::storage::{DatabaseConnection, DatabaseCreator, ExecutionStrategy, PoolRegistry, TdServerConnection, TypeMappingSource};
use crate::update::{ModificationCommandBatchFactory, UpdateSqlGenerator};
use crate::value_generation::{SequenceValueGeneratorFactory, ValueGeneratorCache, ValueGeneratorSelector};

pub struct ProviderServices {
    config: ProviderConfig,
    type_mappings: Arc<TypeMappingSource>,
    expression_factory: Arc<SqlExpressionFactory>,
    method_translators: Arc<MethodCallTranslatorProvider>,
    member_translators: Arc<MemberTranslatorProvider>,
    value_generator_cache: Arc<ValueGeneratorCache>,
    connection: Arc<dyn DatabaseConnection>,
}

impl ProviderServices {
    /// Services over a pooled connection for `config`.
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let connection = Arc::new(TdServerConnection::new(&config, Arc::new(PoolRegistry::new())));
        Self::with_connection(config, connection)
    }

    /// Services over a caller-supplied connection, for tests and embedding.
    pub fn with_connection(config: ProviderConfig, connection: Arc<dyn DatabaseConnection>) -> Result<Self> {
        Self::with_catalog(config, connection, &MethodCatalog::standard())
    }

    /// Fails when `catalog` lacks a signature one of the translators expects.
    pub fn with_catalog(
        config: ProviderConfig,
        connection: Arc<dyn DatabaseConnection>,
        catalog: &MethodCatalog,
    ) -> Result<Self> {
        let type_mappings = Arc::new(TypeMappingSource::new());
        let expression_factory = Arc::new(SqlExpressionFactory::new(Arc::clone(&type_mappings)));
        let method_translators = Arc::new(MethodCallTranslatorProvider::new(
            Arc::clone(&expression_factory),
            catalog,
        )?);
        let member_translators = Arc::new(MemberTranslatorProvider::new(
            Arc::clone(&expression_factory),
            catalog,
        )?);
        debug!(
            "Registered provider services ({} method translators) {}",
            method_translators.len(),
            config.options.log_fragment()
        );
        Ok(Self {
            config,
            type_mappings,
            expression_factory,
            method_translators,
            member_translators,
            value_generator_cache: Arc::new(ValueGeneratorCache::new()),
            connection,
        })
    }

    /// Replace the sequence-state cache, sharing it across service sets.
    pub fn with_value_generator_cache(mut self, cache: Arc<ValueGeneratorCache>) -> Self {
        self.value_generator_cache = cache;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn options(&self) -> &ProviderOptions {
        &self.config.options
    }

    /// Fingerprint of the options that select a distinct service set.
    pub fn service_key(&self) -> u64 {
        self.config.options.service_provider_hash()
    }

    pub fn type_mapping_source(&self) -> Arc<TypeMappingSource> {
        Arc::clone(&self.type_mappings)
    }

    pub fn model_validator(&self) -> ModelValidator {
        ModelValidator::new(TypeMappingSource::new())
    }

    pub fn convention_set(&self) -> ConventionSet {
        ConventionSet::provider()
    }

    pub fn model_builder(&self) -> ModelBuilder {
        ModelBuilder::with_conventions(self.convention_set())
    }

    pub fn migrations_sql_generator(&self) -> MigrationsSqlGenerator {
        MigrationsSqlGenerator::new()
    }

    pub fn migrations_annotation_provider(&self) -> MigrationsAnnotationProvider {
        MigrationsAnnotationProvider::new()
    }

    pub fn history_repository(&self) -> HistoryRepository {
        HistoryRepository::default()
    }

    pub fn connection(&self) -> Arc<dyn DatabaseConnection> {
        Arc::clone(&self.connection)
    }

    pub fn value_generator_cache(&self) -> Arc<ValueGeneratorCache> {
        Arc::clone(&self.value_generator_cache)
    }

    pub fn sequence_value_generator_factory(&self) -> SequenceValueGeneratorFactory {
        SequenceValueGeneratorFactory::new(self.update_sql_generator())
    }

    pub fn value_generator_selector(&self) -> ValueGeneratorSelector {
        ValueGeneratorSelector::new(
            self.value_generator_cache(),
            self.sequence_value_generator_factory(),
            self.connection(),
        )
    }

    pub fn update_sql_generator(&self) -> UpdateSqlGenerator {
        UpdateSqlGenerator
    }

    pub fn modification_batch_factory(&self) -> ModificationCommandBatchFactory {
        ModificationCommandBatchFactory::new(&self.config.options)
    }

    pub fn sql_expression_factory(&self) -> Arc<SqlExpressionFactory> {
        Arc::clone(&self.expression_factory)
    }

    pub fn method_call_translators(&self) -> Arc<MethodCallTranslatorProvider> {
        Arc::clone(&self.method_translators)
    }

    pub fn member_translators(&self) -> Arc<MemberTranslatorProvider> {
        Arc::clone(&self.member_translators)
    }

    pub fn query_sql_generator(&self) -> QuerySqlGenerator {
        QuerySqlGenerator::with_type_mappings(self.config.options.row_number_paging, self.type_mapping_source())
    }

    pub fn query_postprocessor(&self) -> QueryPostprocessor {
        QueryPostprocessor::new(self.sql_expression_factory())
    }

    pub fn compiled_query_cache_key_generator(&self) -> CompiledQueryCacheKeyGenerator {
        CompiledQueryCacheKeyGenerator::new(&self.config.options)
    }

    pub fn execution_strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::from_options(&self.config.options)
    }

    pub fn database_creator(&self) -> DatabaseCreator {
        DatabaseCreator::new(self.connection(), &self.config)
    }
}
