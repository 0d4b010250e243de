//! Action registry: id → immutable definition.
//!
//! Populated at startup by the content loaders, then frozen. Reads are the
//! only operations afterwards, so shared references can be handed out freely.

use std::collections::BTreeMap;

use crate::error::{CoreError, ErrorSeverity};
use crate::units::Unit;

use super::definition::{ActionDefinition, ActionKind};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegistryError {
    #[error("action '{0}' is already registered")]
    Duplicate(String),

    #[error("registry is frozen; registration is a startup-only operation")]
    Frozen,
}

impl CoreError for RegistryError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Malformed
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::Duplicate(_) => "REGISTRY_DUPLICATE",
            Self::Frozen => "REGISTRY_FROZEN",
        }
    }
}

/// All registered actions.
#[derive(Clone, Debug, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, ActionDefinition>,
    frozen: bool,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: ActionDefinition) -> Result<(), RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        if self.actions.contains_key(&action.id) {
            return Err(RegistryError::Duplicate(action.id));
        }
        tracing::debug!(id = %action.id, kind = %action.kind, "action registered");
        self.actions.insert(action.id.clone(), action);
        Ok(())
    }

    /// Ends the registration window.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn get(&self, id: &str) -> Option<&ActionDefinition> {
        self.actions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn by_kind(&self, kind: ActionKind) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values().filter(move |a| a.kind == kind)
    }

    /// Actions the unit could start right now: affordable, requirements met,
    /// off cooldown. Targeting is not considered; that depends on the board.
    pub fn available_for<'a>(&'a self, unit: &'a Unit) -> impl Iterator<Item = &'a ActionDefinition> {
        self.actions.values().filter(move |action| {
            action.costs.affordable_by(unit)
                && action.requirements.met_by(unit)
                && unit.cooldown_of(&action.id) == 0
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.actions.values()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
