//! Query translation: SQL expression tree, method/member translators,
//! post-processing and SQL text generation.

pub mod cache_key;
pub mod expressions;
pub mod factory;
pub mod postprocess;
pub mod signatures;
pub mod sql_generator;
pub mod translators;

pub use cache_key::{CompiledQueryCacheKey, CompiledQueryCacheKeyGenerator};
pub use expressions::{
    BinaryOp, CaseWhen, Ordering, Projection, SelectExpression, SqlExpression, SqlExpressionKind, SqlFunction,
    TableSource, UnaryOp,
};
pub use factory::SqlExpressionFactory;
pub use postprocess::{QueryPostprocessor, DEFAULT_FUNCTION_SCHEMA};
pub use signatures::{MemberSignature, MethodCatalog, MethodSignature, ParamType};
pub use sql_generator::QuerySqlGenerator;
pub use translators::{MemberTranslator, MemberTranslatorProvider, MethodCallTranslator, MethodCallTranslatorProvider};
