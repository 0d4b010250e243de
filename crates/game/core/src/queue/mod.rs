//! Per-unit action queues and the global execution timeline.
//!
//! Units queue one or more actions per turn; timeline resolution flattens
//! every queue into a single execution order:
//!
//! ```text
//! order = priority × 1000
//!       + max(0, 100 − (unit_initiative + action_initiative_bonus))
//!       + cast_time
//! ```
//!
//! sorted ascending, ties broken by unit id then queue sequence number. For a
//! fixed set of queues and unit stats the result is fully deterministic.

mod stepper;
mod timeline;

pub use stepper::{ExecutionStepper, PredictionScore, SkipCause, StepOutcome};
pub use timeline::{ExecutionEvent, resolve_timeline};

use std::collections::BTreeMap;

use crate::action::ActionTarget;
use crate::types::{TurnNumber, UnitId};

/// Coarse ordering bucket above initiative. Lower executes earlier.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
    strum::Display, strum::EnumIter, strum::EnumString,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PriorityClass {
    /// Interrupts and reactions.
    Immediate,
    /// Quick actions, movement.
    High,
    /// Standard attacks and spells.
    #[default]
    Normal,
    /// Slow, powerful actions.
    Low,
    /// End-of-turn effects.
    Cleanup,
}

impl PriorityClass {
    pub fn ordinal(self) -> i32 {
        match self {
            PriorityClass::Immediate => 0,
            PriorityClass::High => 1,
            PriorityClass::Normal => 2,
            PriorityClass::Low => 3,
            PriorityClass::Cleanup => 4,
        }
    }
}

/// A player's declared expectation, scored against the execution result.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Prediction {
    /// Total damage the player expects this action to deal.
    Damage(i32),
    /// A unit the player expects this action to kill.
    Kill(UnitId),
}

/// An action waiting in a unit's queue.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueuedAction {
    pub unit_id: UnitId,
    pub action_id: String,
    pub targets: Vec<ActionTarget>,
    pub priority: PriorityClass,
    pub initiative_bonus: i32,
    pub cast_time: u32,
    /// Global insertion counter; never reused within a battle.
    pub sequence: u64,
    pub prediction: Option<Prediction>,
    pub queued_turn: TurnNumber,
}

impl QueuedAction {
    /// Execution-order value; lower executes earlier.
    pub fn execution_order(&self, unit_initiative: i32) -> i32 {
        let base = self.priority.ordinal() * 1000;
        let initiative = (100 - (unit_initiative + self.initiative_bonus)).max(0);
        base + initiative + self.cast_time as i32
    }
}

/// All queued actions, grouped per unit, plus the resolved timeline.
#[derive(Clone, Debug, Default)]
pub struct ActionQueue {
    unit_queues: BTreeMap<UnitId, Vec<QueuedAction>>,
    next_sequence: u64,
    timeline: Vec<ExecutionEvent>,
    timeline_resolved: bool,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action to its unit's queue and returns its sequence number.
    #[allow(clippy::too_many_arguments)]
    pub fn enqueue(
        &mut self,
        unit_id: UnitId,
        action_id: impl Into<String>,
        targets: Vec<ActionTarget>,
        priority: PriorityClass,
        initiative_bonus: i32,
        cast_time: u32,
        prediction: Option<Prediction>,
        queued_turn: TurnNumber,
    ) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        let action_id = action_id.into();
        tracing::debug!(%unit_id, %action_id, sequence, "action queued");
        self.unit_queues.entry(unit_id).or_default().push(QueuedAction {
            unit_id,
            action_id,
            targets,
            priority,
            initiative_bonus,
            cast_time,
            sequence,
            prediction,
            queued_turn,
        });
        self.timeline_resolved = false;
        sequence
    }

    /// Removes one queued action by position in the unit's queue.
    pub fn remove(&mut self, unit_id: UnitId, index: usize) -> Option<QueuedAction> {
        let queue = self.unit_queues.get_mut(&unit_id)?;
        if index >= queue.len() {
            return None;
        }
        let removed = queue.remove(index);
        if queue.is_empty() {
            self.unit_queues.remove(&unit_id);
        }
        self.timeline_resolved = false;
        Some(removed)
    }

    /// Reorders a unit's queue; `new_order` must be a permutation of
    /// `0..len`. Returns false (and changes nothing) otherwise.
    pub fn reorder(&mut self, unit_id: UnitId, new_order: &[usize]) -> bool {
        let Some(queue) = self.unit_queues.get_mut(&unit_id) else {
            return false;
        };
        if new_order.len() != queue.len() {
            return false;
        }
        let mut check: Vec<usize> = new_order.to_vec();
        check.sort_unstable();
        if check != (0..queue.len()).collect::<Vec<_>>() {
            return false;
        }

        let reordered: Vec<QueuedAction> =
            new_order.iter().map(|&i| queue[i].clone()).collect();
        *queue = reordered;
        self.timeline_resolved = false;
        true
    }

    pub fn clear_unit(&mut self, unit_id: UnitId) -> usize {
        let count = self
            .unit_queues
            .remove(&unit_id)
            .map(|q| q.len())
            .unwrap_or(0);
        if count > 0 {
            self.timeline_resolved = false;
        }
        count
    }

    pub fn clear_all(&mut self) {
        self.unit_queues.clear();
        self.timeline.clear();
        self.timeline_resolved = false;
    }

    pub fn queued_for(&self, unit_id: UnitId) -> &[QueuedAction] {
        self.unit_queues
            .get(&unit_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_queued(&self) -> usize {
        self.unit_queues.values().map(Vec::len).sum()
    }

    pub fn units_with_actions(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.unit_queues.keys().copied()
    }

    pub fn is_timeline_resolved(&self) -> bool {
        self.timeline_resolved
    }

    /// Resolves (or re-resolves) the timeline from the current queues.
    pub fn resolve(&mut self, initiative_of: impl Fn(UnitId) -> i32) -> &[ExecutionEvent] {
        if !self.timeline_resolved {
            self.timeline = timeline::resolve_timeline(&self.unit_queues, initiative_of);
            self.timeline_resolved = true;
            tracing::debug!(events = self.timeline.len(), "timeline resolved");
        }
        &self.timeline
    }

    /// Pops the next event off a resolved timeline, removing the action from
    /// its owner's queue.
    pub fn pop_next(&mut self) -> Option<ExecutionEvent> {
        if !self.timeline_resolved || self.timeline.is_empty() {
            return None;
        }
        let event = self.timeline.remove(0);
        if let Some(queue) = self.unit_queues.get_mut(&event.queued.unit_id) {
            queue.retain(|qa| qa.sequence != event.queued.sequence);
            if queue.is_empty() {
                self.unit_queues.remove(&event.queued.unit_id);
            }
        }
        Some(event)
    }

    /// Sanity check: a resolved timeline must mirror the queues exactly.
    pub fn check_consistency(&self) -> Result<(), crate::error::InvariantError> {
        if self.timeline_resolved && self.timeline.len() != self.total_queued() {
            return Err(crate::error::InvariantError::TimelineMismatch {
                timeline: self.timeline.len(),
                queued: self.total_queued(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enqueue_simple(queue: &mut ActionQueue, unit: UnitId, action: &str) -> u64 {
        queue.enqueue(
            unit,
            action,
            vec![],
            PriorityClass::Normal,
            0,
            0,
            None,
            1,
        )
    }

    #[test]
    fn sequences_are_unique_and_monotonic() {
        let mut queue = ActionQueue::new();
        let a = enqueue_simple(&mut queue, UnitId(1), "strike");
        let b = enqueue_simple(&mut queue, UnitId(1), "strike");
        let c = enqueue_simple(&mut queue, UnitId(2), "guard");
        assert!(a < b && b < c);
    }

    #[test]
    fn remove_out_of_range_is_none() {
        let mut queue = ActionQueue::new();
        enqueue_simple(&mut queue, UnitId(1), "strike");
        assert!(queue.remove(UnitId(1), 5).is_none());
        assert!(queue.remove(UnitId(2), 0).is_none());
        assert_eq!(queue.total_queued(), 1);
    }

    #[test]
    fn reorder_rejects_non_permutations() {
        let mut queue = ActionQueue::new();
        enqueue_simple(&mut queue, UnitId(1), "a");
        enqueue_simple(&mut queue, UnitId(1), "b");
        assert!(!queue.reorder(UnitId(1), &[0, 0]));
        assert!(!queue.reorder(UnitId(1), &[0]));
        assert!(queue.reorder(UnitId(1), &[1, 0]));
        assert_eq!(queue.queued_for(UnitId(1))[0].action_id, "b");
    }

    #[test]
    fn execution_order_formula() {
        let mut queue = ActionQueue::new();
        enqueue_simple(&mut queue, UnitId(1), "strike");
        let qa = &queue.queued_for(UnitId(1))[0];
        // Normal priority (2×1000) + max(0, 100−20) + 0
        assert_eq!(qa.execution_order(20), 2080);
        // Initiative above 100 clamps the middle term at zero.
        assert_eq!(qa.execution_order(150), 2000);
    }

    #[test]
    fn pop_next_drains_queue_and_timeline_together() {
        let mut queue = ActionQueue::new();
        enqueue_simple(&mut queue, UnitId(1), "a");
        enqueue_simple(&mut queue, UnitId(2), "b");
        queue.resolve(|_| 50);

        assert!(queue.pop_next().is_some());
        assert_eq!(queue.total_queued(), 1);
        queue.check_consistency().unwrap();

        assert!(queue.pop_next().is_some());
        assert!(queue.pop_next().is_none());
        assert_eq!(queue.total_queued(), 0);
    }
}
