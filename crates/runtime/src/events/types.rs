//! Event types for the battle event bus.

use battle_core::{
    BattleOutcome, ExecutionReport, Position, PredictionScore, PriorityClass, SkipCause,
    TurnNumber, UnitId,
};
use serde::{Deserialize, Serialize};

/// Topics for event routing. Serialized names match the wire contract
/// (`unit_moved`, `action_executed`, …).
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    UnitMoved,
    ActionQueued,
    ActionExecuted,
    ActionFailed,
    ActionSkipped,
    TurnStarted,
    TurnEnded,
    BattleEnded,
    UnitDied,
    /// Queue bookkeeping: clears, reorders, removals.
    QueueChanged,
}

impl Topic {
    /// Every topic, in a stable order. Used to wire catch-all forwarders.
    pub const ALL: [Topic; 10] = [
        Topic::UnitMoved,
        Topic::ActionQueued,
        Topic::ActionExecuted,
        Topic::ActionFailed,
        Topic::ActionSkipped,
        Topic::TurnStarted,
        Topic::TurnEnded,
        Topic::BattleEnded,
        Topic::UnitDied,
        Topic::QueueChanged,
    ];
}

/// Everything observers can learn about a battle, one variant per topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleEvent {
    UnitMoved {
        unit: UnitId,
        from: Position,
        to: Position,
    },
    ActionQueued {
        unit: UnitId,
        action_id: String,
        sequence: u64,
        targets: usize,
        priority: PriorityClass,
    },
    ActionExecuted {
        report: Box<ExecutionReport>,
        prediction: Option<PredictionScore>,
    },
    ActionFailed {
        unit: UnitId,
        action_id: String,
        code: String,
        message: String,
    },
    ActionSkipped {
        unit: UnitId,
        action_id: String,
        cause: SkipCause,
    },
    TurnStarted {
        unit: UnitId,
        round: TurnNumber,
        stunned: bool,
    },
    TurnEnded {
        unit: UnitId,
        round: TurnNumber,
    },
    BattleEnded {
        outcome: BattleOutcome,
    },
    UnitDied {
        unit: UnitId,
    },
    QueueCleared {
        unit: Option<UnitId>,
        removed: usize,
    },
    QueueReordered {
        unit: UnitId,
    },
    QueueEntryRemoved {
        unit: UnitId,
        index: usize,
    },
}

impl BattleEvent {
    pub fn topic(&self) -> Topic {
        match self {
            BattleEvent::UnitMoved { .. } => Topic::UnitMoved,
            BattleEvent::ActionQueued { .. } => Topic::ActionQueued,
            BattleEvent::ActionExecuted { .. } => Topic::ActionExecuted,
            BattleEvent::ActionFailed { .. } => Topic::ActionFailed,
            BattleEvent::ActionSkipped { .. } => Topic::ActionSkipped,
            BattleEvent::TurnStarted { .. } => Topic::TurnStarted,
            BattleEvent::TurnEnded { .. } => Topic::TurnEnded,
            BattleEvent::BattleEnded { .. } => Topic::BattleEnded,
            BattleEvent::UnitDied { .. } => Topic::UnitDied,
            BattleEvent::QueueCleared { .. }
            | BattleEvent::QueueReordered { .. }
            | BattleEvent::QueueEntryRemoved { .. } => Topic::QueueChanged,
        }
    }
}
