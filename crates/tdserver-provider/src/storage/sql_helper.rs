//! Identifier validation, delimiting and statement text helpers.
//!
//! Identifiers cannot be bound as parameters, so every identifier that ends
//! up in generated SQL is validated and then bracket-delimited here.

use crate::error::{ProviderError, Result};
use crate::metadata::MAX_IDENTIFIER_LENGTH;

/// Terminator appended to every generated statement.
pub const STATEMENT_TERMINATOR: &str = ";";

/// Separator between batches in scripts.
pub const BATCH_TERMINATOR: &str = "GO";

/// Validate an identifier.
///
/// Rejects empty identifiers, identifiers containing null bytes and
/// identifiers longer than the engine limit.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(ProviderError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(ProviderError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    let length = name.chars().count();
    if length as i64 > MAX_IDENTIFIER_LENGTH {
        return Err(ProviderError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} characters (got {}): {:?}",
            MAX_IDENTIFIER_LENGTH, length, name
        )));
    }

    Ok(())
}

/// Escape closing brackets without delimiting.
pub fn escape_identifier(name: &str) -> String {
    name.replace(']', "]]")
}

/// Delimit an identifier with brackets after validating it.
///
/// ```ignore
/// assert_eq!(delimit_identifier("users")?, "[users]");
/// assert_eq!(delimit_identifier("table]name")?, "[table]]name]");
/// ```
pub fn delimit_identifier(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("[{}]", escape_identifier(name)))
}

/// Delimit `name`, qualified by `schema` when one is given.
pub fn delimit_qualified(name: &str, schema: Option<&str>) -> Result<String> {
    match schema {
        Some(schema) => Ok(format!(
            "{}.{}",
            delimit_identifier(schema)?,
            delimit_identifier(name)?
        )),
        None => delimit_identifier(name),
    }
}

/// Parameter placeholder for `name`.
pub fn parameter_name(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}

/// Escape a string literal body (single quotes doubled).
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}
