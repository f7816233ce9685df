//! Encounter model and pure algorithms for turn-based battles.
//!
//! `battle-core` defines the data an encounter is built from (participants,
//! entities, action data, sequences) together with the algorithms that do not
//! need a scheduler: seat allocation on the battle board, target resolution,
//! and the auto-win / run-chance math. The orchestration loop lives in
//! `battle-runtime`, which depends on the types re-exported here.
pub mod action;
pub mod config;
pub mod entity;
pub mod error;
pub mod outcome;
pub mod participant;
pub mod position;
pub mod targeting;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use action::{ActionCompletion, BattleAction, BattleActionData, BattleSequence, CompletionWatch};
pub use config::{BattleConfig, ConfigError};
pub use entity::{BattleEntity, EntitySnapshot};
pub use error::{BattleError, ErrorSeverity};
pub use outcome::{BattleOutcome, BattleState, is_imposing_encounter, run_chance};
pub use participant::{
    CalculatedStat, CombatParticipant, ParticipantId, StateAltered, StateAlteredKind,
    TransitionType,
};
pub use position::{
    BattleRow, PlacementError, PositionAllocator, Seat, next_row, occupied_columns,
};
pub use targeting::{
    LivingFilter, ParticipantSide, TargetFilter, TargetingError, TargetingNavigation,
    TargetingStrategy, resolve_targets, validate_targets,
};
