//! Error types for the provider.

use thiserror::Error;

/// Exit code for configuration and model errors.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code for database errors reported by the server.
pub const EXIT_DATABASE_ERROR: u8 = 2;
/// Exit code for connection pool failures.
pub const EXIT_POOL_ERROR: u8 = 3;
/// Exit code for query translation failures.
pub const EXIT_TRANSLATION_ERROR: u8 = 4;
/// Exit code for cancelled operations.
pub const EXIT_CANCELLED: u8 = 5;
/// Exit code for IO errors (missing files etc.)
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised by the server, carrying its error number.
    #[error("Database error {number}: {message}")]
    Server { number: i32, message: String },

    /// Driver error that carries no server error number (IO, TLS, protocol).
    #[error("Driver error: {0}")]
    Driver(tiberius::error::Error),

    /// Connection pool error with context
    #[error("Pool error: {message}\n  Context: {context}")]
    Pool { message: String, context: String },

    /// A store type that needs a length was given without one.
    #[error("Data type '{0}' is not supported in this form. Either specify the length explicitly in the type name, for example as '{0}(16)', or remove the data type and use APIs such as HasMaxLength to allow the provider to choose the data type.")]
    UnqualifiedDataType(String),

    /// Same as [`ProviderError::UnqualifiedDataType`], reported against a property.
    #[error("Data type '{store_type}' for property '{property}' is not supported in this form. Either specify the length explicitly in the type name, for example as '{store_type}(16)', or remove the data type and use APIs such as HasMaxLength to allow the provider to choose the data type.")]
    UnqualifiedDataTypeOnProperty { store_type: String, property: String },

    /// No store type could be found for a property.
    #[error("The property '{entity}.{property}' could not be mapped, because it is of type '{clr_type}' which is not a supported primitive type or a valid entity type.")]
    NoMapping {
        entity: String,
        property: String,
        clr_type: String,
    },

    /// Identity generation on a property whose type cannot hold it.
    #[error("Identity value generation cannot be used for the property '{property}' on entity type '{entity}' because the property type is '{property_type}'. Identity value generation can only be used with signed integer properties.")]
    IdentityBadType {
        property: String,
        entity: String,
        property_type: String,
    },

    /// Hi-lo generation on a property whose type cannot hold it.
    #[error("TdServer sequences cannot be used to generate values for the property '{property}' on entity type '{entity}' because the property type is '{property_type}'. Sequences can only be used with integer properties.")]
    SequenceBadType {
        property: String,
        entity: String,
        property_type: String,
    },

    /// Two store-side generation settings are configured on one property.
    #[error("Both the {first} and {second} are set on property '{property}' on entity type '{entity}'. Configure only one.")]
    ConflictingColumnServerGeneration {
        first: String,
        second: String,
        property: String,
        entity: String,
    },

    /// Hi-lo generation was requested for a property with no backing sequence.
    #[error("No sequence named '{sequence}' is defined for property '{property}' on entity type '{entity}'.")]
    SequenceNotFound {
        sequence: String,
        property: String,
        entity: String,
    },

    /// The value generator factory cannot produce values of the property's type.
    #[error("The '{factory}' cannot create a value generator for property '{property}' on entity type '{entity}'. Only integer properties are supported.")]
    InvalidValueGeneratorFactoryProperty {
        factory: String,
        property: String,
        entity: String,
    },

    /// Full-text predicate over something that is not a column.
    #[error("The expression passed to the 'propertyReference' parameter of the '{function}' method is not a valid reference to a property. The expression should represent a reference to a full-text indexed property on the object referenced in the from clause.")]
    InvalidColumnNameForFreeText { function: String },

    /// Translation recognized a call but cannot express it.
    #[error("Translation failed: {0}")]
    Translation(String),

    /// A translator expected a method signature the catalog does not expose.
    #[error("Method signature not found in catalog: {0}")]
    MissingMethodSignature(String),

    /// Admin operation needs a database name and the connection has none.
    #[error("The database name could not be determined. To use EnsureDeleted, the connection string must specify Initial Catalog.")]
    NoInitialCatalog,

    /// Model validation or builder rule failed.
    #[error("Model error: {0}")]
    Model(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation was cancelled (SIGINT, token, etc.)
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<tiberius::error::Error> for ProviderError {
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Server(token) => ProviderError::Server {
                number: token.code() as i32,
                message: token.message().to_string(),
            },
            other => ProviderError::Driver(other),
        }
    }
}

impl ProviderError {
    /// Create a Pool error with context about where it occurred
    pub fn pool(message: impl Into<String>, context: impl Into<String>) -> Self {
        ProviderError::Pool {
            message: message.into(),
            context: context.into(),
        }
    }

    /// Create a Server error with the given error number.
    pub fn server(number: i32, message: impl Into<String>) -> Self {
        ProviderError::Server {
            number,
            message: message.into(),
        }
    }

    /// Engine error number used for retry classification.
    ///
    /// Client-side timeouts report `-2` and dropped transport connections
    /// report `233`.
    pub fn error_number(&self) -> Option<i32> {
        match self {
            ProviderError::Server { number, .. } => Some(*number),
            ProviderError::Driver(tiberius::error::Error::Io { kind, .. }) => match kind {
                std::io::ErrorKind::TimedOut => Some(-2),
                std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::ConnectionAborted
                | std::io::ErrorKind::BrokenPipe
                | std::io::ErrorKind::UnexpectedEof => Some(233),
                _ => None,
            },
            _ => None,
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            ProviderError::Server { .. } | ProviderError::Driver(_) => EXIT_DATABASE_ERROR,
            ProviderError::Pool { .. } => EXIT_POOL_ERROR,
            ProviderError::InvalidColumnNameForFreeText { .. }
            | ProviderError::Translation(_)
            | ProviderError::MissingMethodSignature(_) => EXIT_TRANSLATION_ERROR,
            ProviderError::Cancelled => EXIT_CANCELLED,
            ProviderError::Io(_) => EXIT_IO_ERROR,
            _ => EXIT_CONFIG_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;
