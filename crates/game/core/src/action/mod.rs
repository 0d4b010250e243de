//! The unified action model.
//!
//! Attacks, spells, movement, items, and talents are all [`ActionDefinition`]s:
//! a targeting descriptor, a cost descriptor, and an ordered effect list,
//! plus the scheduling metadata the queue needs. Validation, execution, and
//! preview all operate on the same definition without consulting its
//! authoring file.

mod cost;
mod definition;
mod execute;
mod registry;
mod targeting;
mod validate;

pub use cost::ActionCosts;
pub use definition::{ActionBuilder, ActionDefinition, ActionKind, Requirements};
pub use execute::{EffectRecord, ExecutionReport, MoveRecord, TargetRoll, execute, preview};
pub use registry::{ActionRegistry, RegistryError};
pub use targeting::{ActionTarget, TargetType, TargetingSpec};
pub use validate::{ValidationError, can_execute};
