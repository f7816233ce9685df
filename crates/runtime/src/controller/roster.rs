//! Friendly and hostile rosters plus the board seats hostiles occupy.

use std::sync::Arc;

use battle_core::{
    BattleConfig, BattleEntity, CombatParticipant, ParticipantId, PlacementError,
    PositionAllocator, Seat,
};

#[derive(Debug)]
pub(crate) struct Roster {
    friendlies: Vec<BattleEntity>,
    hostiles: Vec<BattleEntity>,
    mat: PositionAllocator,
}

impl Roster {
    pub(crate) fn new(config: &BattleConfig) -> Self {
        Self {
            friendlies: Vec::new(),
            hostiles: Vec::new(),
            mat: PositionAllocator::new(config),
        }
    }

    pub(crate) fn friendlies(&self) -> &[BattleEntity] {
        &self.friendlies
    }

    pub(crate) fn hostiles(&self) -> &[BattleEntity] {
        &self.hostiles
    }

    pub(crate) fn mat(&self) -> &PositionAllocator {
        &self.mat
    }

    pub(crate) fn find(&self, id: ParticipantId) -> Option<&BattleEntity> {
        self.friendlies
            .iter()
            .chain(&self.hostiles)
            .find(|entity| entity.id() == id)
    }

    pub(crate) fn contains(&self, id: ParticipantId) -> bool {
        self.find(id).is_some()
    }

    pub(crate) fn add_friendly(&mut self, entity: BattleEntity) {
        self.friendlies.push(entity);
    }

    /// Seats a hostile on the board and adds it to the roster.
    pub(crate) fn seat_hostile(
        &mut self,
        participant: Arc<dyn CombatParticipant>,
    ) -> Result<BattleEntity, PlacementError> {
        let seat = self.mat.allocate(participant.preferred_row())?;
        let entity = BattleEntity::hostile(participant, seat);
        self.hostiles.push(entity.clone());
        Ok(entity)
    }

    /// Frees `seat` if `id` still occupies it. The hostile stays in the
    /// roster so the outcome sees every defeated foe.
    pub(crate) fn vacate_hostile(&mut self, id: ParticipantId, seat: Seat) -> Option<&BattleEntity> {
        let entity = self
            .hostiles
            .iter_mut()
            .find(|entity| entity.id() == id && entity.seat() == Some(seat))?;
        entity.vacate_seat();
        self.mat.release(seat);
        Some(entity)
    }

    /// First player character able to act right now.
    pub(crate) fn first_ready_character(&self) -> Option<&BattleEntity> {
        self.friendlies.iter().find(|entity| {
            entity.is_character() && !entity.is_dead() && !entity.participant().is_in_cooldown()
        })
    }

    pub(crate) fn all(&self) -> impl Iterator<Item = &BattleEntity> {
        self.friendlies.iter().chain(&self.hostiles)
    }

    /// Empties both rosters and the board, returning every entity that was
    /// still on it. Hostiles already vacated are not returned twice.
    pub(crate) fn clear(&mut self) -> Vec<BattleEntity> {
        self.mat.clear();
        let mut removed = std::mem::take(&mut self.friendlies);
        removed.extend(
            std::mem::take(&mut self.hostiles)
                .into_iter()
                .filter(|entity| entity.seat().is_some()),
        );
        removed
    }
}
