//! Character, action and target selection.
//!
//! The selection is a small state machine of its own: a character is picked,
//! then an action, then the action is armed, which resolves targets. Every
//! failed step leaves the previous selection in place.

use std::sync::Arc;

use battle_core::{
    BattleAction, BattleActionData, BattleEntity, BattleSequence, ParticipantId,
    TargetingNavigation, resolve_targets, validate_targets,
};
use tracing::debug;

use super::BattleController;
use crate::error::{Result, RuntimeError};
use crate::events::{Event, SelectionEvent, SelectionRole};

#[derive(Default)]
pub(crate) struct Selection {
    character: Option<BattleEntity>,
    action: Option<Arc<dyn BattleAction>>,
    armed: bool,
    data: Option<BattleActionData>,
}

impl Selection {
    fn for_character(character: BattleEntity) -> Self {
        Self {
            data: Some(BattleActionData::new(character.clone())),
            character: Some(character),
            ..Self::default()
        }
    }
}

impl BattleController {
    pub fn selected_character(&self) -> Option<&BattleEntity> {
        self.selection.character.as_ref()
    }

    pub fn selected_action(&self) -> Option<&Arc<dyn BattleAction>> {
        self.selection.action.as_ref()
    }

    pub fn is_action_armed(&self) -> bool {
        self.selection.armed
    }

    /// Current sender and targets; baseline (no targets) until armed.
    pub fn action_data(&self) -> Option<&BattleActionData> {
        self.selection.data.as_ref()
    }

    /// Selects the acting character, or clears the selection with `None`.
    ///
    /// Only living player characters outside cooldown can be selected.
    pub fn set_selected_character(&mut self, id: Option<ParticipantId>) -> Result<()> {
        let Some(id) = id else {
            self.clear_selection();
            return Ok(());
        };

        let entity = self
            .roster
            .friendlies()
            .iter()
            .find(|entity| entity.id() == id && entity.is_character())
            .cloned()
            .ok_or(RuntimeError::UnknownParticipant(id))?;
        if entity.is_dead() || entity.participant().is_in_cooldown() {
            return Err(RuntimeError::ActorUnavailable(id));
        }
        if self.selection.character.as_ref() == Some(&entity) {
            return Ok(());
        }

        debug!(target: "battle::targeting", character = %id, "character selected");
        self.selection = Selection::for_character(entity.clone());
        self.publish_selected(SelectionRole::Character, std::slice::from_ref(&entity));
        Ok(())
    }

    /// Picks the action for the selected character. Any armed targeting is
    /// dropped.
    pub fn set_active_action(&mut self, action: Option<Arc<dyn BattleAction>>) -> Result<()> {
        if action.is_some() && self.selection.character.is_none() {
            return Err(RuntimeError::NoCharacterSelected);
        }
        if self.selection.armed {
            self.disarm();
        }

        let name = action.as_ref().map(|action| action.name().to_owned());
        debug!(target: "battle::targeting", action = ?name, "action selected");
        self.selection.action = action;
        self.event_bus
            .publish(Event::Selection(SelectionEvent::ActionSelected { action: name }));
        Ok(())
    }

    /// Arms the selected action, resolving its initial targets. Arming fails
    /// without side effects when nothing valid can be targeted.
    pub fn set_action_armed(&mut self, armed: bool) -> Result<()> {
        if !armed {
            if self.selection.armed {
                self.disarm();
            }
            return Ok(());
        }

        let resolved = self.resolve(TargetingNavigation::Hold)?;
        validate_targets(&resolved)?;

        self.selection.armed = true;
        self.selection.data = Some(resolved);
        self.event_bus
            .publish(Event::Selection(SelectionEvent::ActionArmed { armed: true }));
        self.publish_targets();
        Ok(())
    }

    /// Moves the armed action's targets. An invalid result keeps the previous
    /// targets.
    pub fn cycle_targets(&mut self, navigation: TargetingNavigation) -> Result<()> {
        if !self.selection.armed {
            return Err(RuntimeError::ActionNotArmed);
        }

        let resolved = self.resolve(navigation)?;
        if let Err(error) = validate_targets(&resolved) {
            debug!(target: "battle::targeting", ?navigation, %error, "selection restored");
            return Err(error.into());
        }

        self.selection.data = Some(resolved);
        self.publish_targets();
        Ok(())
    }

    /// Queues the armed action with its current targets.
    pub fn submit_selection(&mut self) -> Result<()> {
        if !self.selection.armed {
            return Err(RuntimeError::ActionNotArmed);
        }
        let action = self
            .selection
            .action
            .clone()
            .ok_or(RuntimeError::NoActionSelected)?;
        let data = self
            .selection
            .data
            .clone()
            .ok_or(RuntimeError::NoCharacterSelected)?;
        validate_targets(&data)?;

        self.submit(BattleSequence::new(action, data));
        Ok(())
    }

    /// Queues a resolved sequence. Friendly submissions end the current
    /// selection.
    pub fn submit(&mut self, sequence: BattleSequence) {
        let friendly = sequence.sender().is_friendly();
        self.queue.submit(sequence);
        if friendly {
            self.clear_selection();
        }
    }

    /// Re-targets after `id` died.
    pub(super) fn refresh_selection_after_death(&mut self, id: ParticipantId) {
        if self
            .selection
            .character
            .as_ref()
            .is_some_and(|character| character.id() == id)
        {
            debug!(target: "battle::targeting", character = %id, "selected character died");
            self.clear_selection();
            return;
        }

        let targeted = self
            .selection
            .data
            .as_ref()
            .is_some_and(|data| data.has_target(id));
        if !self.selection.armed || !targeted {
            return;
        }

        match self.resolve(TargetingNavigation::Hold) {
            Ok(resolved) if validate_targets(&resolved).is_ok() => {
                self.selection.data = Some(resolved);
                self.publish_targets();
            }
            _ => {
                debug!(target: "battle::targeting", target = %id, "no valid targets remain");
                self.disarm();
            }
        }
    }

    pub(super) fn clear_selection(&mut self) {
        let had_character = self.selection.character.is_some();
        if self.selection.armed {
            self.disarm();
        }
        self.selection = Selection::default();
        if had_character {
            self.publish_selected(SelectionRole::Character, &[]);
        }
    }

    fn resolve(&self, navigation: TargetingNavigation) -> Result<BattleActionData> {
        let action = self
            .selection
            .action
            .as_ref()
            .ok_or(RuntimeError::NoActionSelected)?;
        let current = self
            .selection
            .data
            .as_ref()
            .ok_or(RuntimeError::NoCharacterSelected)?;
        Ok(resolve_targets(
            Some(action.as_ref()),
            navigation,
            current,
            self.roster.friendlies(),
            self.roster.hostiles(),
        ))
    }

    fn disarm(&mut self) {
        self.selection.armed = false;
        self.selection.data = self.selection.character.clone().map(BattleActionData::new);
        self.event_bus
            .publish(Event::Selection(SelectionEvent::ActionArmed { armed: false }));
        self.publish_selected(SelectionRole::Target, &[]);
    }

    fn publish_targets(&self) {
        let targets = self
            .selection
            .data
            .as_ref()
            .map(|data| data.targets.as_slice())
            .unwrap_or_default();
        self.publish_selected(SelectionRole::Target, targets);
    }

    fn publish_selected(&self, role: SelectionRole, entities: &[BattleEntity]) {
        self.event_bus
            .publish(Event::Selection(SelectionEvent::EntitySelected {
                role,
                entities: entities.iter().map(BattleEntity::snapshot).collect(),
            }));
    }
}
