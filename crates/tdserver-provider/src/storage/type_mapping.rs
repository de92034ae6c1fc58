//! Type mapping source.
//!
//! Resolves a value type plus optional facets (explicit store type name, size,
//! precision/scale, unicode, fixed length, row version, key/index membership)
//! to a [`StoreTypeMapping`]. Resolution is a pure function of the request and
//! the static tables built in [`TypeMappingSource::new`].

use std::collections::{HashMap, HashSet};

use crate::error::{ProviderError, Result};
use crate::metadata::{ClrType, EntityType, Property};

use super::mapping::{
    store_type_name_base, MappingFacets, StoreTypeMapping, StoreTypePostfix, ANSI_MAX, UNICODE_MAX,
};

/// Default size of ANSI string key and index columns.
const ANSI_KEY_SIZE: i32 = 900;
/// Default size of Unicode string key and index columns.
const UNICODE_KEY_SIZE: i32 = 450;
/// Default size of binary key and index columns.
const BINARY_KEY_SIZE: i32 = 900;
/// Largest `float(n)` that is stored as `real`.
const REAL_MAX_SIZE: i32 = 24;

/// Unqualified store types that need an explicit length.
const DISALLOWED_STORE_TYPES: &[&str] = &[
    "binary",
    "binary varying",
    "varbinary",
    "char",
    "character",
    "char varying",
    "character varying",
    "varchar",
    "national char",
    "national character",
    "nchar",
    "national char varying",
    "national character varying",
    "nvarchar",
];

/// What a caller asks the resolver for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingInfo {
    pub clr_type: Option<ClrType>,
    pub store_type_name: Option<String>,
    pub size: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_unicode: Option<bool>,
    pub is_fixed_length: Option<bool>,
    pub is_row_version: Option<bool>,
    pub is_key_or_index: bool,
}

impl MappingInfo {
    pub fn for_type(clr_type: ClrType) -> Self {
        Self {
            clr_type: Some(clr_type),
            ..Default::default()
        }
    }

    /// Request by store type name; facets in parentheses are parsed.
    pub fn for_store_type(store_type_name: &str, clr_type: Option<ClrType>) -> Self {
        let mut info = Self {
            clr_type,
            ..Default::default()
        };
        info.apply_store_type_name(store_type_name);
        info
    }

    /// Request describing a property column.
    pub fn for_property(entity: &EntityType, property: &Property) -> Self {
        let mut info = Self {
            clr_type: Some(property.clr_type.clone()),
            size: property.max_length,
            precision: property.precision,
            scale: property.scale,
            is_unicode: property.is_unicode,
            is_fixed_length: property.is_fixed_length,
            is_row_version: property.is_row_version.then_some(true),
            is_key_or_index: entity.is_key_or_index_member(&property.name),
            ..Default::default()
        };
        if let Some(column_type) = &property.column_type {
            info.apply_store_type_name(column_type);
        }
        info
    }

    fn apply_store_type_name(&mut self, name: &str) {
        let name = name.trim();
        self.store_type_name = Some(name.to_string());
        let (open, close) = match (name.find('('), name.rfind(')')) {
            (Some(o), Some(c)) if c > o => (o, c),
            _ => return,
        };
        let inner = &name[open + 1..close];
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [single] => {
                if let Ok(n) = single.parse::<i32>() {
                    self.size = Some(n);
                    self.precision = Some(n);
                }
            }
            [p, s] => {
                if let (Ok(p), Ok(s)) = (p.parse::<i32>(), s.parse::<i32>()) {
                    self.precision = Some(p);
                    self.scale = Some(s);
                }
            }
            _ => {}
        }
    }

    fn store_type_name_base(&self) -> Option<&str> {
        self.store_type_name.as_deref().map(store_type_name_base)
    }

    fn facets(&self) -> MappingFacets {
        MappingFacets {
            store_type_name: self.store_type_name.clone(),
            size: self.size,
            precision: self.precision,
            scale: self.scale,
            is_unicode: self.is_unicode,
            is_fixed_length: self.is_fixed_length,
        }
    }
}

type NamedMappingFactory = fn(&ClrType) -> StoreTypeMapping;

/// Dialect type mapping source.
pub struct TypeMappingSource {
    clr_mappings: HashMap<ClrType, StoreTypeMapping>,
    store_mappings: HashMap<String, StoreTypeMapping>,
    named_mappings: HashMap<&'static str, NamedMappingFactory>,
    disallowed: HashSet<&'static str>,
    real: StoreTypeMapping,
    rowversion: StoreTypeMapping,
    max_unicode_string: StoreTypeMapping,
    max_ansi_string: StoreTypeMapping,
    max_binary: StoreTypeMapping,
}

impl Default for TypeMappingSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeMappingSource {
    pub fn new() -> Self {
        let int = StoreTypeMapping::new("int", ClrType::Int32);
        let long = StoreTypeMapping::new("bigint", ClrType::Int64);
        let short = StoreTypeMapping::new("smallint", ClrType::Int16);
        let byte = StoreTypeMapping::new("byte", ClrType::Byte);
        let boolean = StoreTypeMapping::new("byteint", ClrType::Bool);
        let double = StoreTypeMapping::new("float", ClrType::Double);
        let real = StoreTypeMapping::new("real", ClrType::Single);
        let timestamp = StoreTypeMapping::new("timestamp", ClrType::DateTime);
        let date = StoreTypeMapping::new("date", ClrType::DateTime);
        let timestamp_tz = StoreTypeMapping::new("timestamp with time zone", ClrType::DateTimeOffset);
        let guid = StoreTypeMapping::new("byte(16)", ClrType::Guid);
        let decimal = StoreTypeMapping::decimal(
            "decimal(18, 2)",
            Some(18),
            Some(2),
            StoreTypePostfix::PrecisionAndScale,
        );
        let time = StoreTypeMapping::new("time", ClrType::TimeSpan);
        let rowversion = StoreTypeMapping::binary(Some("rowversion"), Some(8), false, Some(StoreTypePostfix::None));

        let fixed_ansi = StoreTypeMapping::string(None, false, None, true, None);
        let variable_ansi = StoreTypeMapping::string(None, false, None, false, None);
        let max_ansi_string =
            StoreTypeMapping::string(Some("varchar(64000)"), false, None, false, Some(StoreTypePostfix::None));
        let max_unicode_string =
            StoreTypeMapping::string(Some("varchar(64000)"), true, None, false, Some(StoreTypePostfix::None));
        let variable_binary = StoreTypeMapping::binary(None, None, false, None);
        let max_binary = StoreTypeMapping::binary(Some("varbyte(64000)"), None, false, Some(StoreTypePostfix::None));

        let clr_mappings: HashMap<ClrType, StoreTypeMapping> = [
            (ClrType::Int32, int.clone()),
            (ClrType::Int64, long.clone()),
            (ClrType::DateTime, timestamp.clone()),
            (ClrType::Guid, guid.clone()),
            (ClrType::Bool, boolean),
            (ClrType::Byte, byte.clone()),
            (ClrType::Double, double.clone()),
            (ClrType::DateTimeOffset, timestamp_tz.clone()),
            (ClrType::Int16, short),
            (ClrType::Single, real.clone()),
            (ClrType::Decimal, decimal.clone()),
            (ClrType::TimeSpan, time.clone()),
        ]
        .into_iter()
        .collect();

        // "smallint" resolves to the byte mapping; a smallint request for an
        // Int16 value is therefore rejected by the type check below.
        let store_mappings: HashMap<String, StoreTypeMapping> = [
            ("bigint", long),
            ("char", fixed_ansi),
            ("date", date),
            ("timestamp", timestamp),
            ("timestamp with time zone", timestamp_tz),
            ("decimal", decimal),
            ("float", double),
            ("int", int),
            ("time", time),
            ("smallint", byte),
            ("byte(16)", guid),
            ("varbinary", variable_binary),
            ("varbinary(max)", max_binary.clone()),
            ("varchar", variable_ansi),
            ("varchar(64000)", max_ansi_string.clone()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let named_mappings: HashMap<&'static str, NamedMappingFactory> = [
            ("SqlHierarchyId", hierarchy_id_mapping as NamedMappingFactory),
            ("SqlGeography", geography_mapping as NamedMappingFactory),
            ("SqlGeometry", geometry_mapping as NamedMappingFactory),
        ]
        .into_iter()
        .collect();

        Self {
            clr_mappings,
            store_mappings,
            named_mappings,
            disallowed: DISALLOWED_STORE_TYPES.iter().copied().collect(),
            real,
            rowversion,
            max_unicode_string,
            max_ansi_string,
            max_binary,
        }
    }

    /// Resolve a mapping, or `None` if nothing matches.
    pub fn find_mapping(&self, info: &MappingInfo) -> Option<StoreTypeMapping> {
        let raw = self.find_raw_mapping(info)?;
        let mut facets = info.facets();
        // Text and binary sizes were already settled (defaulted, clamped or
        // unbounded) by the raw lookup.
        if info.store_type_name.is_none()
            && matches!(raw.clr_type(), ClrType::String | ClrType::Bytes)
        {
            facets.size = None;
        }
        Some(raw.clone_with(&facets))
    }

    /// Default mapping for a value type.
    pub fn find_mapping_for_type(&self, clr_type: &ClrType) -> Option<StoreTypeMapping> {
        self.find_mapping(&MappingInfo::for_type(clr_type.clone()))
    }

    /// Mapping for an explicit store type name.
    pub fn find_mapping_for_store_type(&self, store_type: &str) -> Option<StoreTypeMapping> {
        self.find_mapping(&MappingInfo::for_store_type(store_type, None))
    }

    /// Resolve and validate the mapping of a property column.
    pub fn find_mapping_for_property(
        &self,
        entity: &EntityType,
        property: &Property,
    ) -> Result<StoreTypeMapping> {
        let info = MappingInfo::for_property(entity, property);
        let mapping = self
            .find_mapping(&info)
            .ok_or_else(|| ProviderError::NoMapping {
                entity: entity.name.clone(),
                property: property.name.clone(),
                clr_type: property.clr_type.to_string(),
            })?;
        self.validate_mapping(&mapping, Some(&property.name))?;
        Ok(mapping)
    }

    /// Reject store types that need an explicit length.
    pub fn validate_mapping(&self, mapping: &StoreTypeMapping, property: Option<&str>) -> Result<()> {
        let store_type = mapping.store_type().to_lowercase();
        if !self.disallowed.contains(store_type.as_str()) {
            return Ok(());
        }
        Err(match property {
            None => ProviderError::UnqualifiedDataType(mapping.store_type().to_string()),
            Some(p) => ProviderError::UnqualifiedDataTypeOnProperty {
                store_type: mapping.store_type().to_string(),
                property: p.to_string(),
            },
        })
    }

    fn find_raw_mapping(&self, info: &MappingInfo) -> Option<StoreTypeMapping> {
        let clr_type = info.clr_type.as_ref();

        if let (Some(name), Some(base)) = (info.store_type_name.as_deref(), info.store_type_name_base()) {
            let base_lower = base.to_lowercase();
            if clr_type == Some(&ClrType::Single)
                && info.size.is_some_and(|s| s <= REAL_MAX_SIZE)
                && (base_lower == "float" || base_lower == "double precision")
            {
                return Some(self.real.clone());
            }

            let found = self
                .store_mappings
                .get(&name.to_lowercase())
                .or_else(|| self.store_mappings.get(&base_lower));
            if let Some(mapping) = found {
                return match clr_type {
                    None => Some(mapping.clone()),
                    Some(t) if t == mapping.clr_type() => Some(mapping.clone()),
                    Some(_) => None,
                };
            }
        }

        let clr_type = clr_type?;

        if let Some(mapping) = self.clr_mappings.get(clr_type) {
            return Some(mapping.clone());
        }

        if let ClrType::Named(name) = clr_type {
            if let Some(factory) = self.named_mappings.get(name.as_str()) {
                return Some(factory(clr_type));
            }
        }

        match clr_type {
            ClrType::String => Some(self.string_mapping(info)),
            ClrType::Bytes => Some(self.binary_mapping(info)),
            _ => None,
        }
    }

    fn string_mapping(&self, info: &MappingInfo) -> StoreTypeMapping {
        let is_ansi = info.is_unicode == Some(false);
        let is_fixed_length = info.is_fixed_length == Some(true);
        let max_size = if is_ansi { ANSI_MAX } else { UNICODE_MAX };

        let mut size = info.size.or(if info.is_key_or_index {
            Some(if is_ansi { ANSI_KEY_SIZE } else { UNICODE_KEY_SIZE })
        } else {
            None
        });
        if size.is_some_and(|s| s > max_size) {
            size = if is_fixed_length { Some(max_size) } else { None };
        }

        match size {
            None if is_ansi => self.max_ansi_string.clone(),
            None => self.max_unicode_string.clone(),
            Some(size) => StoreTypeMapping::string(None, !is_ansi, Some(size), is_fixed_length, None),
        }
    }

    fn binary_mapping(&self, info: &MappingInfo) -> StoreTypeMapping {
        if info.is_row_version == Some(true) {
            return self.rowversion.clone();
        }
        let is_fixed_length = info.is_fixed_length == Some(true);
        let mut size = info
            .size
            .or(if info.is_key_or_index { Some(BINARY_KEY_SIZE) } else { None });
        if size.is_some_and(|s| s > ANSI_MAX) {
            size = if is_fixed_length { Some(ANSI_MAX) } else { None };
        }
        match size {
            None => self.max_binary.clone(),
            Some(size) => StoreTypeMapping::binary(None, Some(size), is_fixed_length, None),
        }
    }
}

fn hierarchy_id_mapping(clr_type: &ClrType) -> StoreTypeMapping {
    StoreTypeMapping::new("hierarchyid", clr_type.clone())
}

fn geography_mapping(clr_type: &ClrType) -> StoreTypeMapping {
    StoreTypeMapping::new("geography", clr_type.clone())
}

fn geometry_mapping(clr_type: &ClrType) -> StoreTypeMapping {
    StoreTypeMapping::new("geometry", clr_type.clone())
}
