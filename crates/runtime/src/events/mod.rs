//! Topic-based event bus for encounter events.
//!
//! Events are published to specific topics, and consumers subscribe only to
//! the topics they need. The controller itself subscribes to the inbound
//! topics ([`Topic::Request`], [`Topic::Participant`]) and publishes
//! everything else.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{
    BattleRequest, BoardEvent, ParticipantEvent, SelectionEvent, SelectionRole,
    SequenceProcessed, StateChanged,
};
