//! Actions, their resolved data, and the completion signal the turn queue
//! waits on.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::entity::BattleEntity;
use crate::participant::ParticipantId;
use crate::targeting::{TargetingNavigation, TargetingStrategy};

/// A skill, item or command a participant can perform.
///
/// Effects are out of scope for the encounter: it only asks the action who it
/// should hit and when it has finished.
pub trait BattleAction: Send + Sync {
    fn name(&self) -> &str;

    /// Built-in targeting rule used by [`BattleAction::select_targets`].
    fn targeting(&self) -> TargetingStrategy {
        TargetingStrategy::single_foe()
    }

    /// Updates `data.targets` for a navigation step. Override for targeting
    /// the built-in strategies cannot express.
    fn select_targets(
        &self,
        navigation: TargetingNavigation,
        data: &mut BattleActionData,
        friendlies: &[BattleEntity],
        hostiles: &[BattleEntity],
    ) {
        self.targeting().apply(navigation, data, friendlies, hostiles);
    }

    /// Performs the action. The turn queue stays blocked until `completion`
    /// is fired or dropped.
    fn use_action(&self, data: &BattleActionData, completion: ActionCompletion);
}

impl fmt::Debug for dyn BattleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleAction").field("name", &self.name()).finish()
    }
}

/// One-shot signal handed to [`BattleAction::use_action`].
///
/// Firing it (or letting it drop) marks the in-flight action as finished, so
/// an action that forgets to signal cannot wedge the queue.
#[derive(Debug)]
pub struct ActionCompletion {
    done: Arc<AtomicBool>,
}

impl ActionCompletion {
    /// Creates a linked completion signal and the watch observing it.
    pub fn pair() -> (ActionCompletion, CompletionWatch) {
        let done = Arc::new(AtomicBool::new(false));
        (
            ActionCompletion {
                done: Arc::clone(&done),
            },
            CompletionWatch { done },
        )
    }

    pub fn complete(self) {}
}

impl Drop for ActionCompletion {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);
    }
}

/// Observer side of an [`ActionCompletion`].
#[derive(Clone, Debug)]
pub struct CompletionWatch {
    done: Arc<AtomicBool>,
}

impl CompletionWatch {
    pub fn is_complete(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }
}

/// Sender and resolved targets for one action invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct BattleActionData {
    pub sender: BattleEntity,
    pub targets: Vec<BattleEntity>,
}

impl BattleActionData {
    /// Baseline data: the sender alone, nothing targeted.
    pub fn new(sender: BattleEntity) -> Self {
        Self {
            sender,
            targets: Vec::new(),
        }
    }

    pub fn with_targets(mut self, targets: Vec<BattleEntity>) -> Self {
        self.targets = targets;
        self
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn has_target(&self, id: ParticipantId) -> bool {
        self.targets.iter().any(|target| target.id() == id)
    }

    /// Focal target used as the anchor for navigation.
    pub fn first_target(&self) -> Option<&BattleEntity> {
        self.targets.first()
    }

    pub fn target_ids(&self) -> Vec<ParticipantId> {
        self.targets.iter().map(BattleEntity::id).collect()
    }

    /// True when every target is dead, or there is nothing to hit.
    pub fn all_targets_dead(&self) -> bool {
        self.targets.iter().all(BattleEntity::is_dead)
    }

    /// A sequence built from this data can no longer run meaningfully.
    pub fn is_stale(&self) -> bool {
        self.sender.is_dead() || self.all_targets_dead()
    }
}

/// An action paired with its resolved data, waiting in the turn queue.
#[derive(Clone)]
pub struct BattleSequence {
    pub action: Arc<dyn BattleAction>,
    pub data: BattleActionData,
}

impl BattleSequence {
    pub fn new(action: Arc<dyn BattleAction>, data: BattleActionData) -> Self {
        Self { action, data }
    }

    pub fn sender(&self) -> &BattleEntity {
        &self.data.sender
    }

    pub fn action_name(&self) -> &str {
        self.action.name()
    }
}

impl fmt::Debug for BattleSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleSequence")
            .field("action", &self.action.name())
            .field("sender", &self.data.sender.id())
            .field("targets", &self.data.target_ids())
            .finish()
    }
}
