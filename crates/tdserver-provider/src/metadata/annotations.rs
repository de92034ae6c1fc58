//! Key/value annotation bag attached to model elements.
//!
//! Every dialect setting lives in an [`Annotations`] bag under a namespaced
//! key (see [`names`]). Each entry remembers which [`ConfigurationSource`]
//! wrote it, so conventions cannot overwrite user configuration.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ValueGenerationStrategy;

/// Annotation key names.
pub mod names {
    /// Prefix of every dialect annotation.
    pub const PREFIX: &str = "TdServer:";

    pub const VALUE_GENERATION_STRATEGY: &str = "TdServer:ValueGenerationStrategy";
    pub const HILO_SEQUENCE_NAME: &str = "TdServer:HiLoSequenceName";
    pub const HILO_SEQUENCE_SCHEMA: &str = "TdServer:HiLoSequenceSchema";
    pub const IDENTITY_SEED: &str = "TdServer:IdentitySeed";
    pub const IDENTITY_INCREMENT: &str = "TdServer:IdentityIncrement";
    pub const CLUSTERED: &str = "TdServer:Clustered";
    pub const INCLUDE: &str = "TdServer:Include";
    pub const CREATED_ONLINE: &str = "TdServer:CreatedOnline";
    pub const MEMORY_OPTIMIZED: &str = "TdServer:MemoryOptimized";

    /// Relational keys owned by the host.
    pub const DEFAULT_VALUE: &str = "Relational:DefaultValue";
    pub const DEFAULT_VALUE_SQL: &str = "Relational:DefaultValueSql";
    pub const COMPUTED_COLUMN_SQL: &str = "Relational:ComputedColumnSql";
    pub const MAX_IDENTIFIER_LENGTH: &str = "Relational:MaxIdentifierLength";
}

/// Where a piece of configuration came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfigurationSource {
    /// Applied by a convention.
    Convention,
    /// Applied from an attribute or data annotation.
    DataAnnotation,
    /// Applied by user code.
    Explicit,
}

impl ConfigurationSource {
    /// Whether a write from `self` may replace a value written by `existing`.
    pub fn overrides(self, existing: Option<ConfigurationSource>) -> bool {
        existing.map_or(true, |e| self >= e)
    }
}

/// Value stored under an annotation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<String>),
    Strategy(ValueGenerationStrategy),
}

impl AnnotationValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AnnotationValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnnotationValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            AnnotationValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_strategy(&self) -> Option<ValueGenerationStrategy> {
        match self {
            AnnotationValue::Strategy(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationValue::Bool(b) => write!(f, "{}", b),
            AnnotationValue::Int(i) => write!(f, "{}", i),
            AnnotationValue::Text(s) => write!(f, "\"{}\"", s),
            AnnotationValue::List(l) => write!(f, "[{}]", l.join(", ")),
            AnnotationValue::Strategy(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for AnnotationValue {
    fn from(v: bool) -> Self {
        AnnotationValue::Bool(v)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        AnnotationValue::Int(v)
    }
}

impl From<i32> for AnnotationValue {
    fn from(v: i32) -> Self {
        AnnotationValue::Int(v as i64)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::Text(v.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(v: String) -> Self {
        AnnotationValue::Text(v)
    }
}

impl From<Vec<String>> for AnnotationValue {
    fn from(v: Vec<String>) -> Self {
        AnnotationValue::List(v)
    }
}

impl From<ValueGenerationStrategy> for AnnotationValue {
    fn from(v: ValueGenerationStrategy) -> Self {
        AnnotationValue::Strategy(v)
    }
}

/// A stored annotation with its source.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub value: AnnotationValue,
    pub source: ConfigurationSource,
}

/// Ordered annotation bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    entries: BTreeMap<String, Annotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&AnnotationValue> {
        self.entries.get(name).map(|a| &a.value)
    }

    pub fn find(&self, name: &str) -> Option<&Annotation> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Source of the current value, if any.
    pub fn configuration_source(&self, name: &str) -> Option<ConfigurationSource> {
        self.entries.get(name).map(|a| a.source)
    }

    /// Whether `source` is allowed to change the value under `name`.
    pub fn can_set(&self, name: &str, source: ConfigurationSource) -> bool {
        source.overrides(self.configuration_source(name))
    }

    /// Store `value` under `name`. Returns false if a higher-precedence value
    /// is already present.
    pub fn set(
        &mut self,
        name: &str,
        value: impl Into<AnnotationValue>,
        source: ConfigurationSource,
    ) -> bool {
        if !self.can_set(name, source) {
            return false;
        }
        let value = value.into();
        // An equal value keeps the stronger of the two sources.
        let source = match self.entries.get(name) {
            Some(existing) if existing.value == value => existing.source.max(source),
            _ => source,
        };
        self.entries
            .insert(name.to_string(), Annotation { value, source });
        true
    }

    /// Store `value` or remove the entry when `value` is `None`.
    pub fn set_or_remove<V: Into<AnnotationValue>>(
        &mut self,
        name: &str,
        value: Option<V>,
        source: ConfigurationSource,
    ) -> bool {
        match value {
            Some(v) => self.set(name, v, source),
            None => self.remove(name, source),
        }
    }

    /// Remove `name`. Returns false if a higher-precedence value blocks it.
    pub fn remove(&mut self, name: &str, source: ConfigurationSource) -> bool {
        if !self.can_set(name, source) {
            return false;
        }
        self.entries.remove(name);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Annotation)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Anything carrying an annotation bag.
pub trait Annotatable {
    fn annotations(&self) -> &Annotations;
    fn annotations_mut(&mut self) -> &mut Annotations;
}
