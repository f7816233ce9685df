//! Topic-based event bus implementation.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use tokio::sync::broadcast;

use super::types::{
    BattleRequest, BoardEvent, ParticipantEvent, SelectionEvent, SequenceProcessed, StateChanged,
};

/// Topics for event routing
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::EnumCount,
    strum::EnumIter,
)]
pub enum Topic {
    /// Phase changes with outcome and roster snapshots
    State,
    /// Entities entering or leaving the encounter
    Board,
    /// Selected character, action, and targets
    Selection,
    /// Battle sequences leaving the turn queue
    Queue,
    /// Notifications raised by participants (inbound)
    Participant,
    /// Selection and submission requests (inbound)
    Request,
}

impl Topic {
    const fn index(self) -> usize {
        self as usize
    }
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone)]
pub enum Event {
    StateChanged(StateChanged),
    Board(BoardEvent),
    Selection(SelectionEvent),
    SequenceProcessed(SequenceProcessed),
    Participant(ParticipantEvent),
    Request(BattleRequest),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::StateChanged(_) => Topic::State,
            Event::Board(_) => Topic::Board,
            Event::Selection(_) => Topic::Selection,
            Event::SequenceProcessed(_) => Topic::Queue,
            Event::Participant(_) => Topic::Participant,
            Event::Request(_) => Topic::Request,
        }
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Clones share the same channels.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<[broadcast::Sender<Event>; Topic::COUNT]>,
}

impl EventBus {
    pub const DEFAULT_CAPACITY: usize = 100;

    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(std::array::from_fn(|_| broadcast::channel(capacity).0)),
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channels[topic.index()].send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!(target: "battle::bus", ?topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channels[topic.index()].subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }

    /// Subscribe to every topic, e.g. for logging or replay.
    pub fn subscribe_all(&self) -> HashMap<Topic, broadcast::Receiver<Event>> {
        Topic::iter()
            .map(|topic| (topic, self.subscribe(topic)))
            .collect()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channels[topic.index()].receiver_count()
    }

    /// Convenience for collaborators posting a request to the controller.
    pub fn request(&self, request: BattleRequest) {
        self.publish(Event::Request(request));
    }

    /// Convenience for participants announcing a change.
    pub fn announce(&self, event: ParticipantEvent) {
        self.publish(Event::Participant(event));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subscribers: Vec<_> = Topic::iter()
            .map(|topic| (topic, self.subscriber_count(topic)))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &subscribers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{ParticipantId, StateAltered};
    use tokio::sync::broadcast::error::TryRecvError;

    #[test]
    fn events_are_routed_by_topic() {
        let bus = EventBus::with_capacity(8);
        let mut participants = bus.subscribe(Topic::Participant);
        let mut requests = bus.subscribe(Topic::Request);

        bus.announce(ParticipantEvent::StateAltered(StateAltered::died(ParticipantId(4))));

        match participants.try_recv() {
            Ok(Event::Participant(ParticipantEvent::StateAltered(info))) => {
                assert_eq!(info.participant, ParticipantId(4));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(requests.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.request(BattleRequest::SubmitSelection);
        assert_eq!(bus.subscriber_count(Topic::Request), 0);

        let clone = bus.clone();
        let _rx = clone.subscribe(Topic::Request);
        assert_eq!(bus.subscriber_count(Topic::Request), 1);
        assert_eq!(bus.subscribe_all().len(), Topic::COUNT);
    }
}
