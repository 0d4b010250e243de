//! Static content for the tactical combat core.
//!
//! `battle-content` turns data files into the immutable structures
//! `battle-core` consumes: action registration files become
//! [`battle_core::ActionDefinition`]s, unit template files become
//! [`battle_core::UnitTemplate`]s. A small default data set is embedded so a
//! battle can boot without any external files.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{
    ContentError, EffectKeyError, default_action_registry, default_unit_templates,
    load_action_entries, load_default_content, load_unit_templates, parse_effects,
};
