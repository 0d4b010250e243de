//! Topic-based synchronous event bus.
//!
//! Handlers subscribe per topic and run in subscription order, in-thread,
//! when an event is published. Publishing while a dispatch is in progress
//! enqueues the event; it is dispatched after the current one completes, so
//! no handler is ever entered reentrantly. Handler faults are logged and
//! isolated: one failing handler never stops the rest.

use std::collections::{HashMap, VecDeque};

use super::types::{BattleEvent, Topic};

/// A handler may fail; the bus logs the fault and moves on.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct HandlerFault(pub String);

type Handler = Box<dyn FnMut(&BattleEvent) -> Result<(), HandlerFault> + Send>;

/// Topic → ordered handler list.
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<Topic, Vec<Handler>>,
    queue: VecDeque<BattleEvent>,
    dispatching: bool,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one topic. Subscription order is dispatch order.
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F)
    where
        F: FnMut(&BattleEvent) -> Result<(), HandlerFault> + Send + 'static,
    {
        self.handlers.entry(topic).or_default().push(Box::new(handler));
    }

    /// Convenience: a handler that can never fail.
    pub fn subscribe_infallible<F>(&mut self, topic: Topic, mut handler: F)
    where
        F: FnMut(&BattleEvent) + Send + 'static,
    {
        self.subscribe(topic, move |event| {
            handler(event);
            Ok(())
        });
    }

    /// Publishes an event to its topic's handlers.
    ///
    /// During an active dispatch the event is queued and delivered once the
    /// current event's handlers have all run.
    pub fn publish(&mut self, event: BattleEvent) {
        self.queue.push_back(event);
        if self.dispatching {
            return;
        }

        self.dispatching = true;
        while let Some(event) = self.queue.pop_front() {
            let topic = event.topic();
            // Take the list out so queued follow-up publishes from this scope
            // never observe a half-dispatched topic.
            let mut handlers = self.handlers.remove(&topic).unwrap_or_default();
            for handler in &mut handlers {
                if let Err(fault) = handler(&event) {
                    tracing::warn!(?topic, %fault, "event handler failed");
                }
            }
            // Merge back behind any handlers subscribed while we dispatched.
            let mut late = self.handlers.remove(&topic).unwrap_or_default();
            handlers.append(&mut late);
            self.handlers.insert(topic, handlers);
        }
        self.dispatching = false;
    }

    pub fn handler_count(&self, topic: Topic) -> usize {
        self.handlers.get(&topic).map(Vec::len).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.handlers.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::UnitId;
    use std::sync::{Arc, Mutex};

    fn died(unit: u32) -> BattleEvent {
        BattleEvent::UnitDied {
            unit: UnitId(unit),
        }
    }

    #[test]
    fn handlers_run_in_subscription_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            bus.subscribe_infallible(Topic::UnitDied, move |_| {
                seen.lock().unwrap().push(tag);
            });
        }

        bus.publish(died(1));
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn a_failing_handler_does_not_stop_the_rest() {
        let seen = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        bus.subscribe(Topic::UnitDied, |_| Err(HandlerFault("broken".into())));
        {
            let seen = Arc::clone(&seen);
            bus.subscribe_infallible(Topic::UnitDied, move |_| {
                *seen.lock().unwrap() += 1;
            });
        }

        bus.publish(died(1));
        bus.publish(died(2));
        assert_eq!(*seen.lock().unwrap(), 2);
    }

    #[test]
    fn topics_are_isolated() {
        let seen = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();
        {
            let seen = Arc::clone(&seen);
            bus.subscribe_infallible(Topic::TurnEnded, move |_| {
                *seen.lock().unwrap() += 1;
            });
        }

        bus.publish(died(1));
        assert_eq!(*seen.lock().unwrap(), 0);
    }

    #[test]
    fn publishes_during_dispatch_are_queued_not_nested() {
        // The bus itself serializes: events pushed while dispatching drain in
        // FIFO order after the current handlers finish.
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            bus.subscribe_infallible(Topic::UnitDied, move |event| {
                if let BattleEvent::UnitDied { unit } = event {
                    seen.lock().unwrap().push(unit.0);
                }
            });
        }

        bus.queue.push_back(died(2));
        bus.publish(died(3));
        assert_eq!(*seen.lock().unwrap(), vec![2, 3]);
    }
}
