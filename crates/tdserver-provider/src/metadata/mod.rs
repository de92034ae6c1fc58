//! Model metadata and the annotation store.

mod accessors;
pub mod annotations;
mod clr_type;
mod model;
pub mod validator;

pub use accessors::{
    DEFAULT_HILO_SEQUENCE_NAME, DEFAULT_IDENTITY_INCREMENT, DEFAULT_IDENTITY_SEED,
    MAX_IDENTIFIER_LENGTH,
};
pub use annotations::{names, Annotatable, Annotation, AnnotationValue, Annotations, ConfigurationSource};
pub use clr_type::ClrType;
pub use model::{
    EntityType, Index, Key, Model, Property, PropertyRef, Sequence, ValueGenerated,
    ValueGenerationStrategy,
};
pub use validator::ModelValidator;
