//! Value generation: strategy resolution, hi-lo sequences and generator selection.

mod cache;
mod hilo;
mod selector;
pub mod strategy;

pub use cache::{SequenceValueGeneratorState, ValueGeneratorCache};
pub use hilo::{GeneratedValue, SequenceHiLoValueGenerator, SequenceValueGeneratorFactory};
pub use selector::{SequentialGuidGenerator, ValueGenerator, ValueGeneratorSelector};
pub use strategy::{effective_strategy, is_compatible_with_value_generation};
