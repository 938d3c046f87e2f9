//! Typed multicast event bus with deterministic dispatch order.

use std::collections::VecDeque;

use crate::Event;

/// Topics subscribers may listen to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    /// An enemy attack landed on a wall.
    EnemyAttacked,
    /// A spawner reached a difficulty milestone.
    DifficultyIncreasing,
}

/// Identifier handed out to each subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u32);

impl SubscriberId {
    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Event addressed to a single subscriber.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    /// Subscriber receiving the event.
    pub subscriber: SubscriberId,
    /// Event being delivered.
    pub event: Event,
}

#[derive(Clone, Copy, Debug)]
struct Subscription {
    subscriber: SubscriberId,
    topic: Topic,
}

/// Queue-backed publish/subscribe bus.
///
/// Events published between two calls to [`EventBus::drain`] are delivered in
/// publication order; each event reaches its subscribers in registration order.
#[derive(Debug, Default)]
pub struct EventBus {
    subscriptions: Vec<Subscription>,
    pending: VecDeque<Event>,
    next_subscriber: u32,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `topic`, returning the new subscriber identifier.
    pub fn subscribe(&mut self, topic: Topic) -> SubscriberId {
        let subscriber = SubscriberId(self.next_subscriber);
        self.next_subscriber = self.next_subscriber.saturating_add(1);
        self.subscriptions.push(Subscription { subscriber, topic });
        subscriber
    }

    /// Removes every subscription held by `subscriber`.
    pub fn unsubscribe(&mut self, subscriber: SubscriberId) {
        self.subscriptions
            .retain(|subscription| subscription.subscriber != subscriber);
    }

    /// Queues an event. Events without a topic are discarded.
    pub fn publish(&mut self, event: Event) {
        if event.topic().is_some() {
            self.pending.push_back(event);
        }
    }

    /// Reports whether events are waiting to be drained.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drains pending events into per-subscriber deliveries.
    pub fn drain(&mut self) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Some(event) = self.pending.pop_front() {
            let Some(topic) = event.topic() else {
                continue;
            };
            for subscription in &self.subscriptions {
                if subscription.topic == topic {
                    deliveries.push(Delivery {
                        subscriber: subscription.subscriber,
                        event: event.clone(),
                    });
                }
            }
        }
        deliveries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnemyId, SpawnerNumber, WallId};

    fn attack() -> Event {
        Event::EnemyAttacked {
            enemy: EnemyId::new(3),
            wall: WallId::new(1),
            damage: 10.0,
        }
    }

    #[test]
    fn deliveries_follow_registration_order() {
        let mut bus = EventBus::new();
        let first = bus.subscribe(Topic::EnemyAttacked);
        let second = bus.subscribe(Topic::EnemyAttacked);
        let unrelated = bus.subscribe(Topic::DifficultyIncreasing);

        bus.publish(attack());
        let deliveries = bus.drain();

        let subscribers: Vec<_> = deliveries.iter().map(|d| d.subscriber).collect();
        assert_eq!(subscribers, vec![first, second]);
        assert!(!subscribers.contains(&unrelated));
        assert!(!bus.has_pending());
    }

    #[test]
    fn events_are_delivered_in_publication_order() {
        let mut bus = EventBus::new();
        let listener = bus.subscribe(Topic::EnemyAttacked);
        let _ = bus.subscribe(Topic::DifficultyIncreasing);

        bus.publish(Event::DifficultyIncreasing {
            spawner: SpawnerNumber::new(2),
        });
        bus.publish(attack());
        bus.publish(Event::WavesStarted);

        let deliveries = bus.drain();
        assert_eq!(deliveries.len(), 2);
        assert!(matches!(
            deliveries[0].event,
            Event::DifficultyIncreasing { .. }
        ));
        assert_eq!(deliveries[1].subscriber, listener);
    }

    #[test]
    fn unsubscribed_listeners_receive_nothing() {
        let mut bus = EventBus::new();
        let listener = bus.subscribe(Topic::EnemyAttacked);
        bus.unsubscribe(listener);

        bus.publish(attack());
        assert!(bus.drain().is_empty());
    }
}
