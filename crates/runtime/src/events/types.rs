//! Event payloads for each topic.

use std::sync::Arc;

use battle_core::{
    BattleAction, BattleEntity, BattleOutcome, BattleSequence, BattleState, EntitySnapshot,
    ParticipantId, Seat, StateAltered, TargetingNavigation,
};
use serde::{Deserialize, Serialize};

/// Broadcast on every phase change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChanged {
    pub state: BattleState,
    pub outcome: BattleOutcome,
    pub friendlies: Vec<EntitySnapshot>,
    pub hostiles: Vec<EntitySnapshot>,
}

impl StateChanged {
    pub fn new(
        state: BattleState,
        outcome: BattleOutcome,
        friendlies: &[BattleEntity],
        hostiles: &[BattleEntity],
    ) -> Self {
        Self {
            state,
            outcome,
            friendlies: friendlies.iter().map(BattleEntity::snapshot).collect(),
            hostiles: hostiles.iter().map(BattleEntity::snapshot).collect(),
        }
    }
}

/// Entities entering or leaving the encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoardEvent {
    EntityAdded(EntitySnapshot),
    EntityRemoved(EntitySnapshot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SelectionRole {
    /// The acting character.
    Character,
    /// The resolved targets of the armed action.
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// An empty list means the role was deselected.
    EntitySelected {
        role: SelectionRole,
        entities: Vec<EntitySnapshot>,
    },
    ActionSelected {
        action: Option<String>,
    },
    ActionArmed {
        armed: bool,
    },
}

/// A battle sequence left the queue and is about to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceProcessed {
    pub action: String,
    pub sender: EntitySnapshot,
    pub targets: Vec<EntitySnapshot>,
}

impl From<&BattleSequence> for SequenceProcessed {
    fn from(sequence: &BattleSequence) -> Self {
        Self {
            action: sequence.action_name().to_owned(),
            sender: sequence.sender().snapshot(),
            targets: sequence.data.targets.iter().map(BattleEntity::snapshot).collect(),
        }
    }
}

/// Notifications raised on behalf of participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParticipantEvent {
    StateAltered(StateAltered),
    /// The participant's board seat can be reused.
    RemovedFromBoard {
        participant: ParticipantId,
        seat: Seat,
    },
}

/// Requests from input handlers and AI drivers to the controller.
#[derive(Debug, Clone)]
pub enum BattleRequest {
    SelectCharacter(Option<ParticipantId>),
    SelectAction(Option<Arc<dyn BattleAction>>),
    ArmAction(bool),
    CycleTargets(TargetingNavigation),
    /// Queue the current selection.
    SubmitSelection,
    /// Queue a fully resolved sequence, e.g. from hostile AI.
    QueueSubmission(BattleSequence),
}
