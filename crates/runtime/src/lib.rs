//! Orchestration for turn-based battle encounters.
//!
//! This crate drives an encounter built from `battle-core` types. Consumers
//! build a [`BattleController`], feed it rosters, and call
//! [`BattleController::tick`] once per frame; everything else flows through
//! the [`EventBus`].
//!
//! Modules are organized by responsibility:
//! - [`controller`] hosts the battle state machine, selection, and roster
//! - [`events`] provides the topic-based event bus and event payloads
//! - [`queue`] serializes submitted battle sequences
//! - [`outcome`] decides victory, defeat, and run attempts
//! - [`oracle`] defines the reward collaborator
//! - [`config`] loads runtime configuration from the environment
pub mod config;
pub mod controller;
pub mod events;
pub mod oracle;
pub mod outcome;
pub mod queue;

mod error;

pub use config::RuntimeConfig;
pub use controller::{BattleController, BattleControllerBuilder};
pub use error::{Result, RuntimeError};
pub use events::{
    BattleRequest, BoardEvent, Event, EventBus, ParticipantEvent, SelectionEvent, SelectionRole,
    SequenceProcessed, StateChanged, Topic,
};
pub use oracle::RewardOracle;
pub use outcome::{OutcomeEvaluator, RunAttempt};
pub use queue::{QueuePoll, TurnQueue};
