//! Store type mappings: column type name, facets, literals and parameter sizing.

use std::fmt::Write as _;

use chrono::Timelike;

use crate::metadata::ClrType;

use super::value::SqlValue;

/// Unicode string size limit.
pub const UNICODE_MAX: i32 = 4000;
/// ANSI string and binary size limit.
pub const ANSI_MAX: i32 = 8000;

/// Format of DateTime literals: `yyyyMMddHHmmss.fffffff`.
const TIMESTAMP_LITERAL_FORMAT: &str = "%Y%m%d%H%M%S";

/// How facets are appended to the base store type name in DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreTypePostfix {
    None,
    Size,
    Precision,
    PrecisionAndScale,
}

/// Facets requested for a clone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFacets {
    pub store_type_name: Option<String>,
    pub size: Option<i32>,
    pub precision: Option<i32>,
    pub scale: Option<i32>,
    pub is_unicode: Option<bool>,
    pub is_fixed_length: Option<bool>,
}

/// Association between a value type and a concrete column type.
///
/// Instances are never mutated; [`StoreTypeMapping::clone_with`] produces a
/// new mapping with adjusted facets and the same postfix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreTypeMapping {
    clr_type: ClrType,
    store_type: String,
    postfix: StoreTypePostfix,
    size: Option<i32>,
    precision: Option<i32>,
    scale: Option<i32>,
    is_unicode: bool,
    is_fixed_length: bool,
}

impl StoreTypeMapping {
    /// Mapping with no size facet.
    pub fn new(store_type: &str, clr_type: ClrType) -> Self {
        Self {
            clr_type,
            store_type: store_type.to_string(),
            postfix: StoreTypePostfix::None,
            size: None,
            precision: None,
            scale: None,
            is_unicode: false,
            is_fixed_length: false,
        }
    }

    /// String mapping. The store name defaults to `char` or `varchar`.
    pub fn string(
        store_type: Option<&str>,
        unicode: bool,
        size: Option<i32>,
        fixed_length: bool,
        postfix: Option<StoreTypePostfix>,
    ) -> Self {
        let base = if fixed_length { "char" } else { "varchar" };
        Self {
            clr_type: ClrType::String,
            store_type: store_type.unwrap_or(base).to_string(),
            postfix: postfix.unwrap_or(StoreTypePostfix::Size),
            size,
            precision: None,
            scale: None,
            is_unicode: unicode,
            is_fixed_length: fixed_length,
        }
        .render_facets()
    }

    /// Binary mapping. The store name defaults to `byte` or `varbyte`.
    pub fn binary(
        store_type: Option<&str>,
        size: Option<i32>,
        fixed_length: bool,
        postfix: Option<StoreTypePostfix>,
    ) -> Self {
        let base = if fixed_length { "byte" } else { "varbyte" };
        Self {
            clr_type: ClrType::Bytes,
            store_type: store_type.unwrap_or(base).to_string(),
            postfix: postfix.unwrap_or(StoreTypePostfix::Size),
            size,
            precision: None,
            scale: None,
            is_unicode: false,
            is_fixed_length: fixed_length,
        }
        .render_facets()
    }

    /// Decimal mapping with precision and scale.
    pub fn decimal(store_type: &str, precision: Option<i32>, scale: Option<i32>, postfix: StoreTypePostfix) -> Self {
        Self {
            clr_type: ClrType::Decimal,
            store_type: store_type.to_string(),
            postfix,
            size: None,
            precision,
            scale,
            is_unicode: false,
            is_fixed_length: false,
        }
    }

    pub fn with_size(mut self, size: i32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn clr_type(&self) -> &ClrType {
        &self.clr_type
    }

    /// Full store type name including facets, e.g. `varchar(100)`.
    pub fn store_type(&self) -> &str {
        &self.store_type
    }

    /// Store type name with any parenthesized facets stripped.
    pub fn store_type_name_base(&self) -> &str {
        store_type_name_base(&self.store_type)
    }

    pub fn postfix(&self) -> StoreTypePostfix {
        self.postfix
    }

    pub fn size(&self) -> Option<i32> {
        self.size
    }

    pub fn precision(&self) -> Option<i32> {
        self.precision
    }

    pub fn scale(&self) -> Option<i32> {
        self.scale
    }

    pub fn is_unicode(&self) -> bool {
        self.is_unicode
    }

    pub fn is_fixed_length(&self) -> bool {
        self.is_fixed_length
    }

    /// Copy of this mapping with the requested facets applied.
    pub fn clone_with(&self, facets: &MappingFacets) -> Self {
        Self {
            clr_type: self.clr_type.clone(),
            store_type: facets
                .store_type_name
                .clone()
                .unwrap_or_else(|| self.store_type.clone()),
            postfix: self.postfix,
            size: facets.size.or(self.size),
            precision: facets.precision.or(self.precision),
            scale: facets.scale.or(self.scale),
            is_unicode: facets.is_unicode.unwrap_or(self.is_unicode),
            is_fixed_length: facets.is_fixed_length.unwrap_or(self.is_fixed_length),
        }
        .render_facets()
    }

    /// Rebuild the store type name from its base and the postfix.
    fn render_facets(mut self) -> Self {
        let base = store_type_name_base(&self.store_type).to_string();
        match self.postfix {
            StoreTypePostfix::Size => {
                if let Some(size) = self.size {
                    self.store_type = format!("{}({})", base, size);
                }
            }
            StoreTypePostfix::Precision => {
                if let Some(precision) = self.precision {
                    self.store_type = format!("{}({})", base, precision);
                }
            }
            StoreTypePostfix::PrecisionAndScale => {
                if let Some(precision) = self.precision {
                    self.store_type =
                        format!("{}({}, {})", base, precision, self.scale.unwrap_or(0));
                }
            }
            StoreTypePostfix::None => {}
        }
        self
    }

    /// Largest size that still gets a specific parameter size.
    fn max_specific_size(&self) -> i32 {
        let limit = if self.is_unicode { UNICODE_MAX } else { ANSI_MAX };
        match self.size {
            Some(size) if size <= limit => size,
            _ => limit,
        }
    }

    /// Parameter size to bind for `value`.
    ///
    /// Strings and binary values that fit bind the specific maximum, longer
    /// values bind as unbounded (`-1`). Other mappings bind their size facet
    /// if they have one.
    pub fn parameter_size(&self, value: &SqlValue) -> Option<i32> {
        match self.clr_type {
            ClrType::String | ClrType::Bytes => {
                let max = self.max_specific_size();
                match value.length() {
                    Some(len) if len > max as usize => Some(-1),
                    _ => Some(max),
                }
            }
            ClrType::DateTime => self.size.filter(|s| *s != -1),
            _ => None,
        }
    }

    /// SQL literal for `value` in this mapping's store type.
    pub fn sql_literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Text(s) => {
                let escaped = s.replace('\'', "''");
                if self.is_unicode {
                    format!("N'{}'", escaped)
                } else {
                    format!("'{}'", escaped)
                }
            }
            SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            SqlValue::Int(i) => {
                if self.clr_type == ClrType::Char {
                    let c = char::from_u32(*i as u32).unwrap_or('\0').to_string();
                    format!("'{}'", c.replace('\'', "''"))
                } else {
                    i.to_string()
                }
            }
            SqlValue::F32(f) => format!("CAST({} AS {})", f, self.store_type),
            SqlValue::F64(f) => {
                let s = f.to_string();
                if s.contains('e') || s.contains('E') {
                    s
                } else {
                    format!("{}E0", s)
                }
            }
            SqlValue::Decimal(d) => {
                let s = d.to_string();
                if s.contains('.') {
                    s
                } else {
                    format!("{}.0", s)
                }
            }
            SqlValue::Bytes(bytes) => {
                let mut out = String::with_capacity(2 + bytes.len() * 2);
                out.push_str("0x");
                for b in bytes {
                    let _ = write!(out, "{:02X}", b);
                }
                out
            }
            SqlValue::Uuid(u) => format!("'{}'", u),
            SqlValue::DateTime(dt) => {
                let ticks = dt.nanosecond() % 1_000_000_000 / 100;
                format!("{}.{:07}", dt.format(TIMESTAMP_LITERAL_FORMAT), ticks)
            }
            SqlValue::Date(d) => {
                format!("{}000000.0000000", d.format("%Y%m%d"))
            }
            SqlValue::DateTimeOffset(dto) => {
                format!("'{}'", dto.format("%Y-%m-%d %H:%M:%S%.6f%:z"))
            }
            SqlValue::Time(t) => format!("'{}'", t.format("%H:%M:%S%.6f")),
        }
    }
}

/// Strip a trailing parenthesized facet list: `decimal(18, 2)` -> `decimal`.
pub fn store_type_name_base(store_type: &str) -> &str {
    match store_type.find('(') {
        Some(open) => store_type[..open].trim_end(),
        None => store_type.trim(),
    }
}
