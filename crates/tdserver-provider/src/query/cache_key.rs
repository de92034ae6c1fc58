//! Cache keys for compiled queries.

use crate::config::ProviderOptions;

/// Key of a compiled query.
///
/// Two queries with the same shape compile to different SQL when the paging
/// mode differs, so the flag is part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompiledQueryCacheKey {
    pub query: String,
    pub async_query: bool,
    pub row_number_paging: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CompiledQueryCacheKeyGenerator {
    row_number_paging: bool,
}

impl CompiledQueryCacheKeyGenerator {
    pub fn new(options: &ProviderOptions) -> Self {
        Self {
            row_number_paging: options.row_number_paging,
        }
    }

    pub fn generate(&self, query: &str, async_query: bool) -> CompiledQueryCacheKey {
        CompiledQueryCacheKey {
            query: query.to_string(),
            async_query,
            row_number_paging: self.row_number_paging,
        }
    }
}
