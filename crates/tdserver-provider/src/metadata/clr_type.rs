//! Semantic value types of model properties and expressions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, Result};

/// In-memory type of a property or expression value.
///
/// Nullability is tracked separately; a `DateTime?` property has
/// `ClrType::DateTime` and `is_nullable = true`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClrType {
    Bool,
    Byte,
    SByte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Char,
    Decimal,
    Single,
    Double,
    String,
    Bytes,
    DateTime,
    DateTimeOffset,
    TimeSpan,
    Guid,
    /// Marker receiver for static helper functions (`DbFunctions`).
    DbFunctions,
    /// Special type identified by name only (spatial, hierarchy).
    Named(String),
}

impl ClrType {
    /// Integer family, `char` included.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ClrType::Byte
                | ClrType::SByte
                | ClrType::Int16
                | ClrType::UInt16
                | ClrType::Int32
                | ClrType::UInt32
                | ClrType::Int64
                | ClrType::UInt64
                | ClrType::Char
        )
    }

    pub fn is_signed_integer(&self) -> bool {
        matches!(
            self,
            ClrType::SByte | ClrType::Int16 | ClrType::Int32 | ClrType::Int64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, ClrType::Decimal | ClrType::Single | ClrType::Double)
    }

    pub fn name(&self) -> &str {
        match self {
            ClrType::Bool => "Boolean",
            ClrType::Byte => "Byte",
            ClrType::SByte => "SByte",
            ClrType::Int16 => "Int16",
            ClrType::UInt16 => "UInt16",
            ClrType::Int32 => "Int32",
            ClrType::UInt32 => "UInt32",
            ClrType::Int64 => "Int64",
            ClrType::UInt64 => "UInt64",
            ClrType::Char => "Char",
            ClrType::Decimal => "Decimal",
            ClrType::Single => "Single",
            ClrType::Double => "Double",
            ClrType::String => "String",
            ClrType::Bytes => "Byte[]",
            ClrType::DateTime => "DateTime",
            ClrType::DateTimeOffset => "DateTimeOffset",
            ClrType::TimeSpan => "TimeSpan",
            ClrType::Guid => "Guid",
            ClrType::DbFunctions => "DbFunctions",
            ClrType::Named(name) => name,
        }
    }
}

impl fmt::Display for ClrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ClrType {
    type Err = ProviderError;

    /// Parse the type names used on the command line and in signatures.
    /// Both the framework names (`Int32`) and the short aliases (`int`) work.
    fn from_str(s: &str) -> Result<Self> {
        let t = match s.trim_end_matches('?').to_lowercase().as_str() {
            "bool" | "boolean" => ClrType::Bool,
            "byte" => ClrType::Byte,
            "sbyte" => ClrType::SByte,
            "short" | "int16" => ClrType::Int16,
            "ushort" | "uint16" => ClrType::UInt16,
            "int" | "int32" => ClrType::Int32,
            "uint" | "uint32" => ClrType::UInt32,
            "long" | "int64" => ClrType::Int64,
            "ulong" | "uint64" => ClrType::UInt64,
            "char" => ClrType::Char,
            "decimal" => ClrType::Decimal,
            "float" | "single" => ClrType::Single,
            "double" => ClrType::Double,
            "string" => ClrType::String,
            "byte[]" | "bytes" => ClrType::Bytes,
            "datetime" => ClrType::DateTime,
            "datetimeoffset" => ClrType::DateTimeOffset,
            "timespan" => ClrType::TimeSpan,
            "guid" => ClrType::Guid,
            "dbfunctions" => ClrType::DbFunctions,
            "sqlhierarchyid" => ClrType::Named("SqlHierarchyId".into()),
            "sqlgeography" => ClrType::Named("SqlGeography".into()),
            "sqlgeometry" => ClrType::Named("SqlGeometry".into()),
            _ => {
                return Err(ProviderError::Config(format!(
                    "Unknown type name '{}'",
                    s
                )))
            }
        };
        Ok(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_family_includes_char() {
        assert!(ClrType::Char.is_integer());
        assert!(ClrType::UInt64.is_integer());
        assert!(!ClrType::Decimal.is_integer());
        assert!(!ClrType::Double.is_integer());
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!("int".parse::<ClrType>().unwrap(), ClrType::Int32);
        assert_eq!("Int64".parse::<ClrType>().unwrap(), ClrType::Int64);
        assert_eq!("DateTime?".parse::<ClrType>().unwrap(), ClrType::DateTime);
        assert_eq!(
            "SqlGeography".parse::<ClrType>().unwrap(),
            ClrType::Named("SqlGeography".into())
        );
        assert!("Widget".parse::<ClrType>().is_err());
    }
}
