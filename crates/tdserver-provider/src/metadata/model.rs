//! Model graph: entity types, properties, keys, indexes and sequences.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::annotations::{Annotatable, Annotations, ConfigurationSource};
use super::clr_type::ClrType;

/// Store-side value generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueGenerationStrategy {
    /// No store-side generation.
    #[default]
    None,
    /// Hi-lo pattern backed by a database sequence.
    SequenceHiLo,
    /// Identity column.
    IdentityColumn,
}

impl fmt::Display for ValueGenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueGenerationStrategy::None => "None",
            ValueGenerationStrategy::SequenceHiLo => "SequenceHiLo",
            ValueGenerationStrategy::IdentityColumn => "IdentityColumn",
        };
        f.write_str(s)
    }
}

/// When the store generates a value for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ValueGenerated {
    #[default]
    Never,
    OnAdd,
    OnAddOrUpdate,
}

/// Reference to a property by owning entity and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRef {
    pub entity: String,
    pub property: String,
}

impl PropertyRef {
    pub fn new(entity: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            property: property.into(),
        }
    }
}

/// Root of the model graph.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub annotations: Annotations,
    pub entity_types: Vec<EntityType>,
    pub sequences: Vec<Sequence>,
    finalized: bool,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub(crate) fn mark_finalized(&mut self) {
        self.finalized = true;
    }

    pub fn entity(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.iter().find(|e| e.name == name)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut EntityType> {
        self.entity_types.iter_mut().find(|e| e.name == name)
    }

    pub fn property(&self, r: &PropertyRef) -> Option<(&EntityType, &Property)> {
        let entity = self.entity(&r.entity)?;
        let property = entity.property(&r.property)?;
        Some((entity, property))
    }

    pub fn property_mut(&mut self, r: &PropertyRef) -> Option<&mut Property> {
        self.entity_mut(&r.entity)?.property_mut(&r.property)
    }

    /// Entity types without a base type.
    pub fn root_entity_types(&self) -> impl Iterator<Item = &EntityType> {
        self.entity_types.iter().filter(|e| e.base_type.is_none())
    }

    /// The entity and all of its ancestors, nearest first.
    pub fn base_types_inclusive<'a>(&'a self, entity: &'a EntityType) -> Vec<&'a EntityType> {
        let mut chain = vec![entity];
        let mut current = entity.base_type.as_deref();
        while let Some(name) = current {
            // Cycle guard for malformed hierarchies.
            if chain.len() > self.entity_types.len() {
                break;
            }
            match self.entity(name) {
                Some(base) => {
                    chain.push(base);
                    current = base.base_type.as_deref();
                }
                None => break,
            }
        }
        chain
    }

    /// Root of the shared-table principal chain for `entity`, if it has one.
    ///
    /// A cyclic chain has no root. The returned root never has a principal
    /// of its own.
    pub fn shared_table_root<'a>(&'a self, entity: &'a EntityType) -> Option<&'a EntityType> {
        let mut root = None;
        let mut current = entity.shared_table_principal.as_deref();
        let mut hops = 0;
        while let Some(name) = current {
            hops += 1;
            if hops > self.entity_types.len() {
                return None;
            }
            let principal = self.entity(name)?;
            root = Some(principal);
            current = principal.shared_table_principal.as_deref();
        }
        root
    }

    /// Primary-key property of the shared-table root that shares a column
    /// with `property`, matched by position in the primary key.
    pub fn find_shared_table_root_primary_key_property<'a>(
        &'a self,
        entity: &'a EntityType,
        property: &Property,
    ) -> Option<(&'a EntityType, &'a Property)> {
        let pk = entity.primary_key()?;
        let index = pk.properties.iter().position(|p| *p == property.name)?;
        let root = self.shared_table_root(entity)?;
        let root_pk = root.primary_key()?;
        let name = root_pk.properties.get(index)?;
        Some((root, root.property(name)?))
    }

    pub fn find_sequence(&self, name: &str, schema: Option<&str>) -> Option<&Sequence> {
        self.sequences
            .iter()
            .find(|s| s.name == name && s.schema.as_deref() == schema)
    }

    /// Returns the existing sequence or adds a new one.
    pub fn add_sequence(&mut self, name: &str, schema: Option<&str>) -> &mut Sequence {
        let position = self
            .sequences
            .iter()
            .position(|s| s.name == name && s.schema.as_deref() == schema);
        match position {
            Some(i) => &mut self.sequences[i],
            None => {
                self.sequences.push(Sequence::new(name, schema));
                let last = self.sequences.len() - 1;
                &mut self.sequences[last]
            }
        }
    }
}

impl Annotatable for Model {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// Entity type mapped to a table.
#[derive(Debug, Clone)]
pub struct EntityType {
    pub name: String,
    pub table: String,
    pub schema: Option<String>,
    pub base_type: Option<String>,
    /// Principal entity when this type is split from the same table.
    pub shared_table_principal: Option<String>,
    pub properties: Vec<Property>,
    pub keys: Vec<Key>,
    pub indexes: Vec<Index>,
    pub annotations: Annotations,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.clone(),
            name,
            schema: None,
            base_type: None,
            shared_table_principal: None,
            properties: Vec::new(),
            keys: Vec::new(),
            indexes: Vec::new(),
            annotations: Annotations::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.name == name)
    }

    pub fn primary_key(&self) -> Option<&Key> {
        self.keys.iter().find(|k| k.is_primary)
    }

    pub fn is_key_or_index_member(&self, property: &str) -> bool {
        self.keys
            .iter()
            .any(|k| k.properties.iter().any(|p| p == property))
            || self
                .indexes
                .iter()
                .any(|i| i.properties.iter().any(|p| p == property))
    }
}

impl Annotatable for EntityType {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// Property mapped to a column.
#[derive(Debug, Clone)]
pub struct Property {
    pub name: String,
    pub clr_type: ClrType,
    pub is_nullable: bool,
    pub value_generated: ValueGenerated,
    pub value_generated_source: Option<ConfigurationSource>,
    /// A value converter changes the provider type; disables store generation.
    pub has_value_converter: bool,
    pub column_type: Option<String>,
    pub max_length: Option<i32>,
    pub is_unicode: Option<bool>,
    pub is_fixed_length: Option<bool>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_row_version: bool,
    pub annotations: Annotations,
}

impl Property {
    pub fn new(name: impl Into<String>, clr_type: ClrType) -> Self {
        Self {
            name: name.into(),
            clr_type,
            is_nullable: false,
            value_generated: ValueGenerated::Never,
            value_generated_source: None,
            has_value_converter: false,
            column_type: None,
            max_length: None,
            is_unicode: None,
            is_fixed_length: None,
            precision: None,
            scale: None,
            is_row_version: false,
            annotations: Annotations::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.is_nullable = true;
        self
    }

    /// Set the generated flag if `source` may override the current one.
    pub fn set_value_generated(&mut self, value: ValueGenerated, source: ConfigurationSource) -> bool {
        if !source.overrides(self.value_generated_source) {
            return false;
        }
        self.value_generated = value;
        self.value_generated_source = Some(source);
        true
    }
}

impl Annotatable for Property {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// Primary or alternate key.
#[derive(Debug, Clone)]
pub struct Key {
    pub properties: Vec<String>,
    pub is_primary: bool,
    pub annotations: Annotations,
}

impl Key {
    pub fn new(properties: Vec<String>, is_primary: bool) -> Self {
        Self {
            properties,
            is_primary,
            annotations: Annotations::new(),
        }
    }
}

impl Annotatable for Key {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// Table index.
#[derive(Debug, Clone)]
pub struct Index {
    pub name: Option<String>,
    pub properties: Vec<String>,
    pub is_unique: bool,
    pub annotations: Annotations,
}

impl Index {
    pub fn new(properties: Vec<String>) -> Self {
        Self {
            name: None,
            properties,
            is_unique: false,
            annotations: Annotations::new(),
        }
    }
}

impl Annotatable for Index {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }
    fn annotations_mut(&mut self) -> &mut Annotations {
        &mut self.annotations
    }
}

/// Database sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sequence {
    pub name: String,
    pub schema: Option<String>,
    pub start_value: i64,
    pub increment_by: i32,
    pub clr_type: ClrType,
}

impl Sequence {
    pub const DEFAULT_START_VALUE: i64 = 1;
    pub const DEFAULT_INCREMENT_BY: i32 = 1;

    pub fn new(name: &str, schema: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            schema: schema.map(str::to_string),
            start_value: Self::DEFAULT_START_VALUE,
            increment_by: Self::DEFAULT_INCREMENT_BY,
            clr_type: ClrType::Int64,
        }
    }
}
