//! Battle phase and interaction-mode state machines.

use crate::error::{CoreError, ErrorSeverity};
use crate::types::Faction;

/// Top-level battle flow. Transitions are validated; see [`BattlePhase::can_transition`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattlePhase {
    #[default]
    Idle,
    SelectingAction,
    Targeting,
    AwaitingConfirmation,
    Executing,
    TurnEnd,
    /// Terminal.
    BattleOver,
}

impl BattlePhase {
    /// Legal successor phases.
    pub fn can_transition(self, to: BattlePhase) -> bool {
        use BattlePhase::*;
        match self {
            Idle => matches!(to, SelectingAction | BattleOver),
            SelectingAction => matches!(to, Targeting | Executing | TurnEnd | BattleOver),
            Targeting => matches!(to, SelectingAction | AwaitingConfirmation | Executing | BattleOver),
            AwaitingConfirmation => matches!(to, SelectingAction | Targeting | Executing | BattleOver),
            Executing => matches!(to, TurnEnd | SelectingAction | BattleOver),
            TurnEnd => matches!(to, Idle | SelectingAction | BattleOver),
            BattleOver => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BattlePhase::BattleOver)
    }

    /// Phases during which new intents (queue/execute) are accepted.
    pub fn accepts_intents(self) -> bool {
        matches!(
            self,
            BattlePhase::SelectingAction | BattlePhase::Targeting | BattlePhase::AwaitingConfirmation
        )
    }
}

/// Interaction sub-state while collecting the active unit's intents.
/// Escape always returns to `None` without committing anything.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InteractionMode {
    #[default]
    None,
    Move,
    Attack,
    Magic,
    Spirit,
    Inventory,
}

/// How a finished battle ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleOutcome {
    Victory(Faction),
    /// Turn cap reached, or mutual annihilation.
    Draw,
}

/// Illegal phase transition.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[error("illegal phase transition {from} → {to}")]
pub struct PhaseError {
    pub from: BattlePhase,
    pub to: BattlePhase,
}

impl CoreError for PhaseError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Recoverable
    }

    fn error_code(&self) -> &'static str {
        "PHASE_ILLEGAL_TRANSITION"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn battle_over_is_terminal() {
        for to in BattlePhase::iter() {
            assert!(!BattlePhase::BattleOver.can_transition(to));
        }
    }

    #[test]
    fn every_phase_can_reach_battle_over_except_terminal() {
        for from in BattlePhase::iter().filter(|p| !p.is_terminal()) {
            assert!(from.can_transition(BattlePhase::BattleOver), "{from}");
        }
    }

    #[test]
    fn idle_only_starts_selection() {
        assert!(BattlePhase::Idle.can_transition(BattlePhase::SelectingAction));
        assert!(!BattlePhase::Idle.can_transition(BattlePhase::Executing));
        assert!(!BattlePhase::Idle.can_transition(BattlePhase::TurnEnd));
    }
}
