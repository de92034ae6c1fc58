//! Hi-lo value generator backed by a database sequence.

use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::metadata::{ClrType, Property};
use crate::runtime;
use crate::storage::DatabaseConnection;
use crate::update::UpdateSqlGenerator;

use super::cache::SequenceValueGeneratorState;

/// Value produced by a generator, in the property's own type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratedValue {
    Int64(i64),
    Int32(i32),
    Int16(i16),
    Byte(u8),
    SByte(i8),
    UInt64(u64),
    UInt32(u32),
    UInt16(u16),
    Char(char),
    Decimal(Decimal),
    Guid(uuid::Uuid),
}

impl GeneratedValue {
    /// Convert a raw sequence value to `clr_type`, failing when out of range.
    pub fn from_i64(value: i64, clr_type: &ClrType) -> Result<Self> {
        let out_of_range = || {
            ProviderError::Model(format!(
                "Sequence value {} is out of range for type '{}'",
                value, clr_type
            ))
        };
        let converted = match clr_type {
            ClrType::Int64 => GeneratedValue::Int64(value),
            ClrType::Int32 => GeneratedValue::Int32(i32::try_from(value).map_err(|_| out_of_range())?),
            ClrType::Int16 => GeneratedValue::Int16(i16::try_from(value).map_err(|_| out_of_range())?),
            ClrType::Byte => GeneratedValue::Byte(u8::try_from(value).map_err(|_| out_of_range())?),
            ClrType::SByte => GeneratedValue::SByte(i8::try_from(value).map_err(|_| out_of_range())?),
            ClrType::UInt64 => GeneratedValue::UInt64(u64::try_from(value).map_err(|_| out_of_range())?),
            ClrType::UInt32 => GeneratedValue::UInt32(u32::try_from(value).map_err(|_| out_of_range())?),
            ClrType::UInt16 => GeneratedValue::UInt16(u16::try_from(value).map_err(|_| out_of_range())?),
            ClrType::Char => {
                let code = u16::try_from(value).map_err(|_| out_of_range())?;
                GeneratedValue::Char(char::from_u32(u32::from(code)).ok_or_else(out_of_range)?)
            }
            ClrType::Decimal => GeneratedValue::Decimal(Decimal::from(value)),
            _ => return Err(out_of_range()),
        };
        Ok(converted)
    }
}

impl fmt::Display for GeneratedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneratedValue::Int64(v) => write!(f, "{}", v),
            GeneratedValue::Int32(v) => write!(f, "{}", v),
            GeneratedValue::Int16(v) => write!(f, "{}", v),
            GeneratedValue::Byte(v) => write!(f, "{}", v),
            GeneratedValue::SByte(v) => write!(f, "{}", v),
            GeneratedValue::UInt64(v) => write!(f, "{}", v),
            GeneratedValue::UInt32(v) => write!(f, "{}", v),
            GeneratedValue::UInt16(v) => write!(f, "{}", v),
            GeneratedValue::Char(v) => write!(f, "{}", v),
            GeneratedValue::Decimal(v) => write!(f, "{}", v),
            GeneratedValue::Guid(v) => write!(f, "{}", v),
        }
    }
}

/// Hands out values from blocks reserved with `NEXT VALUE FOR`.
///
/// Values are permanent; they are never replaced on save.
pub struct SequenceHiLoValueGenerator {
    state: Arc<SequenceValueGeneratorState>,
    connection: Arc<dyn DatabaseConnection>,
    next_value_sql: String,
    clr_type: ClrType,
}

impl SequenceHiLoValueGenerator {
    pub fn clr_type(&self) -> &ClrType {
        &self.clr_type
    }

    pub fn generates_temporary_values(&self) -> bool {
        false
    }

    /// Next value.
    pub async fn next_value_async(&self, cancel: &CancellationToken) -> Result<GeneratedValue> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let raw = self.state.next(|| self.new_low_value()).await?;
        GeneratedValue::from_i64(raw, &self.clr_type)
    }

    /// Blocking form of [`SequenceHiLoValueGenerator::next_value_async`].
    pub fn next_value(&self) -> Result<GeneratedValue> {
        runtime::block_on(self.next_value_async(&CancellationToken::new()))
    }

    async fn new_low_value(&self) -> Result<i64> {
        self.connection
            .execute_scalar(&self.next_value_sql)
            .await?
            .ok_or_else(|| {
                ProviderError::Model(format!(
                    "Sequence '{}' returned no value",
                    self.state.sequence().name
                ))
            })
    }
}

/// Creates hi-lo generators for integer-like properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceValueGeneratorFactory {
    sql_generator: UpdateSqlGenerator,
}

impl SequenceValueGeneratorFactory {
    pub fn new(sql_generator: UpdateSqlGenerator) -> Self {
        Self { sql_generator }
    }

    pub fn create(
        &self,
        entity_name: &str,
        property: &Property,
        state: Arc<SequenceValueGeneratorState>,
        connection: Arc<dyn DatabaseConnection>,
    ) -> Result<SequenceHiLoValueGenerator> {
        match property.clr_type {
            ClrType::Int64
            | ClrType::Int32
            | ClrType::Decimal
            | ClrType::Int16
            | ClrType::Byte
            | ClrType::Char
            | ClrType::UInt64
            | ClrType::UInt32
            | ClrType::UInt16
            | ClrType::SByte => {}
            _ => {
                return Err(ProviderError::InvalidValueGeneratorFactoryProperty {
                    factory: "SequenceValueGeneratorFactory".to_string(),
                    property: property.name.clone(),
                    entity: entity_name.to_string(),
                })
            }
        }
        let sequence = state.sequence();
        let next_value_sql = self
            .sql_generator
            .next_sequence_value_sql(&sequence.name, sequence.schema.as_deref())?;
        Ok(SequenceHiLoValueGenerator {
            state,
            connection,
            next_value_sql,
            clr_type: property.clr_type.clone(),
        })
    }
}
