//! Timeline resolution: queues → ordered execution events.

use std::collections::BTreeMap;

use crate::types::UnitId;

use super::QueuedAction;

/// One slot in the resolved timeline. Lower `order` executes earlier.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutionEvent {
    pub order: i32,
    pub queued: QueuedAction,
}

/// Flattens every unit queue into a single sorted timeline.
///
/// Sort key: `(order, unit_id, sequence)`. Two actions of the same unit and
/// priority therefore keep their insertion order, and cross-unit ties resolve
/// by unit id.
pub fn resolve_timeline(
    unit_queues: &BTreeMap<UnitId, Vec<QueuedAction>>,
    initiative_of: impl Fn(UnitId) -> i32,
) -> Vec<ExecutionEvent> {
    let mut events: Vec<ExecutionEvent> = unit_queues
        .iter()
        .flat_map(|(&unit_id, actions)| {
            let initiative = initiative_of(unit_id);
            actions.iter().map(move |queued| ExecutionEvent {
                order: queued.execution_order(initiative),
                queued: queued.clone(),
            })
        })
        .collect();

    events.sort_by_key(|e| (e.order, e.queued.unit_id, e.queued.sequence));
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{ActionQueue, PriorityClass};

    fn queue_with(entries: &[(u32, &str, PriorityClass, i32, u32)]) -> ActionQueue {
        let mut queue = ActionQueue::new();
        for &(unit, action, priority, bonus, cast_time) in entries {
            queue.enqueue(
                UnitId(unit),
                action,
                vec![],
                priority,
                bonus,
                cast_time,
                None,
                1,
            );
        }
        queue
    }

    #[test]
    fn higher_initiative_acts_first() {
        let mut queue = queue_with(&[
            (1, "slow", PriorityClass::Normal, 0, 0),
            (2, "fast", PriorityClass::Normal, 0, 0),
        ]);
        let events = queue.resolve(|id| if id == UnitId(2) { 80 } else { 20 });
        assert_eq!(events[0].queued.action_id, "fast");
        assert_eq!(events[1].queued.action_id, "slow");
    }

    #[test]
    fn priority_class_dominates_initiative() {
        let mut queue = queue_with(&[
            (1, "normal", PriorityClass::Normal, 0, 0),
            (2, "immediate", PriorityClass::Immediate, 0, 0),
        ]);
        // Unit 1 is far faster, but Immediate still wins.
        let events = queue.resolve(|id| if id == UnitId(1) { 99 } else { 1 });
        assert_eq!(events[0].queued.action_id, "immediate");
    }

    #[test]
    fn cast_time_delays_execution() {
        let mut queue = queue_with(&[
            (1, "channeled", PriorityClass::Normal, 0, 30),
            (2, "instant", PriorityClass::Normal, 0, 0),
        ]);
        let events = queue.resolve(|_| 50);
        assert_eq!(events[0].queued.action_id, "instant");
    }

    #[test]
    fn equal_orders_tie_break_by_unit_then_sequence() {
        let mut queue = queue_with(&[
            (2, "unit2_first", PriorityClass::Normal, 0, 0),
            (1, "unit1_first", PriorityClass::Normal, 0, 0),
            (1, "unit1_second", PriorityClass::Normal, 0, 0),
        ]);
        let events = queue.resolve(|_| 20);
        let order: Vec<&str> = events.iter().map(|e| e.queued.action_id.as_str()).collect();
        assert_eq!(order, ["unit1_first", "unit1_second", "unit2_first"]);
    }

    #[test]
    fn resolution_is_deterministic() {
        let build = || {
            queue_with(&[
                (3, "c", PriorityClass::Low, 2, 1),
                (1, "a", PriorityClass::Normal, 0, 0),
                (2, "b", PriorityClass::Normal, 5, 3),
            ])
        };
        let mut first = build();
        let mut second = build();
        let initiative = |id: UnitId| 30 + id.0 as i32;
        let left: Vec<u64> = first.resolve(initiative).iter().map(|e| e.queued.sequence).collect();
        let right: Vec<u64> = second.resolve(initiative).iter().map(|e| e.queued.sequence).collect();
        assert_eq!(left, right);
    }
}
