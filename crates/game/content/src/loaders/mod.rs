//! RON loaders for actions and unit templates.

mod actions;
mod effect_keys;
mod units;

pub use actions::{default_action_registry, load_action_entries};
pub use effect_keys::{EffectKeyError, EffectValue, parse_effects, translate_legacy_key};
pub use units::{default_unit_templates, load_unit_templates};

use std::collections::BTreeMap;

use anyhow::Context;
use battle_core::{ActionRegistry, UnitTemplate};

/// Loads the full embedded data set: frozen action registry plus archetypes.
pub fn load_default_content() -> anyhow::Result<(ActionRegistry, BTreeMap<String, UnitTemplate>)> {
    let registry = default_action_registry().context("loading default action set")?;
    let templates = default_unit_templates().context("loading default unit archetypes")?;
    Ok((registry, templates))
}

/// Loader failures. Parse errors are fatal for the file; entry errors are
/// fatal in strict (startup) mode and logged otherwise.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("data file failed to parse: {0}")]
    Parse(String),

    #[error("entry '{id}' rejected: {message}")]
    BadEntry { id: String, message: String },
}
