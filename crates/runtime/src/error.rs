//! Unified error type surfaced by the controller API.

use battle_core::{
    BattleError, ConfigError, ErrorSeverity, ParticipantId, PlacementError, TargetingError,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("invalid battle configuration")]
    InvalidConfig(#[from] ConfigError),

    #[error("participant {0} is not part of this encounter")]
    UnknownParticipant(ParticipantId),

    #[error("participant {0} is already part of this encounter")]
    DuplicateParticipant(ParticipantId),

    #[error("participant {0} cannot act: dead or cooling down")]
    ActorUnavailable(ParticipantId),

    #[error("no character selected")]
    NoCharacterSelected,

    #[error("no action selected")]
    NoActionSelected,

    #[error("selected action is not armed")]
    ActionNotArmed,

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error(transparent)]
    Targeting(#[from] TargetingError),
}

impl BattleError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidConfig(e) => e.severity(),
            Self::Placement(e) => e.severity(),
            Self::Targeting(e) => e.severity(),
            Self::DuplicateParticipant(_) => ErrorSeverity::Internal,
            Self::UnknownParticipant(_)
            | Self::ActorUnavailable(_)
            | Self::NoCharacterSelected
            | Self::NoActionSelected
            | Self::ActionNotArmed => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(e) => e.error_code(),
            Self::Placement(e) => e.error_code(),
            Self::Targeting(e) => e.error_code(),
            Self::UnknownParticipant(_) => "RUNTIME_UNKNOWN_PARTICIPANT",
            Self::DuplicateParticipant(_) => "RUNTIME_DUPLICATE_PARTICIPANT",
            Self::ActorUnavailable(_) => "RUNTIME_ACTOR_UNAVAILABLE",
            Self::NoCharacterSelected => "RUNTIME_NO_CHARACTER",
            Self::NoActionSelected => "RUNTIME_NO_ACTION",
            Self::ActionNotArmed => "RUNTIME_NOT_ARMED",
        }
    }
}
