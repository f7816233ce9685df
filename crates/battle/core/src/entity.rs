use std::fmt;
use std::sync::Arc;

use crate::participant::{CombatParticipant, ParticipantId};
use crate::position::{BattleRow, Seat};

/// A participant as seen by the encounter: the shared participant handle plus
/// its role and, for hostiles, the board seat it occupies.
#[derive(Clone)]
pub struct BattleEntity {
    participant: Arc<dyn CombatParticipant>,
    is_character: bool,
    is_assist_character: bool,
    seat: Option<Seat>,
}

impl BattleEntity {
    /// A selectable player character.
    pub fn character(participant: Arc<dyn CombatParticipant>) -> Self {
        Self {
            participant,
            is_character: true,
            is_assist_character: false,
            seat: None,
        }
    }

    /// A friendly that fights alongside the party but cannot be selected.
    pub fn assist(participant: Arc<dyn CombatParticipant>) -> Self {
        Self {
            participant,
            is_character: false,
            is_assist_character: true,
            seat: None,
        }
    }

    pub fn hostile(participant: Arc<dyn CombatParticipant>, seat: Seat) -> Self {
        Self {
            participant,
            is_character: false,
            is_assist_character: false,
            seat: Some(seat),
        }
    }

    pub fn id(&self) -> ParticipantId {
        self.participant.id()
    }

    pub fn name(&self) -> &str {
        self.participant.name()
    }

    pub fn participant(&self) -> &Arc<dyn CombatParticipant> {
        &self.participant
    }

    pub fn is_character(&self) -> bool {
        self.is_character
    }

    pub fn is_assist_character(&self) -> bool {
        self.is_assist_character
    }

    pub fn is_friendly(&self) -> bool {
        self.is_character || self.is_assist_character
    }

    pub fn is_dead(&self) -> bool {
        self.participant.is_dead()
    }

    pub fn seat(&self) -> Option<Seat> {
        self.seat
    }

    /// Takes the entity off the board, keeping it in its roster.
    pub fn vacate_seat(&mut self) -> Option<Seat> {
        self.seat.take()
    }

    /// Board row, or [`BattleRow::Any`] for unseated friendlies.
    pub fn row(&self) -> BattleRow {
        self.seat.map_or(BattleRow::Any, |seat| seat.row)
    }

    pub fn column(&self) -> Option<u8> {
        self.seat.map(|seat| seat.column)
    }

    /// Detached copy safe to hand to event subscribers.
    pub fn snapshot(&self) -> EntitySnapshot {
        EntitySnapshot {
            id: self.id(),
            name: self.name().to_owned(),
            is_character: self.is_character,
            is_assist_character: self.is_assist_character,
            row: self.seat.map(|seat| seat.row),
            column: self.column(),
            is_dead: self.is_dead(),
        }
    }
}

impl PartialEq for BattleEntity {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for BattleEntity {}

impl fmt::Debug for BattleEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleEntity")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("is_character", &self.is_character)
            .field("is_assist_character", &self.is_assist_character)
            .field("seat", &self.seat)
            .finish()
    }
}

/// Point-in-time view of a [`BattleEntity`] carried by events.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntitySnapshot {
    pub id: ParticipantId,
    pub name: String,
    pub is_character: bool,
    pub is_assist_character: bool,
    pub row: Option<BattleRow>,
    pub column: Option<u8>,
    pub is_dead: bool,
}

impl EntitySnapshot {
    pub fn is_friendly(&self) -> bool {
        self.is_character || self.is_assist_character
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestParticipant;

    #[test]
    fn roles_and_seats() {
        let hero = TestParticipant::shared(1, "hero");
        let slime = TestParticipant::shared(2, "slime");

        let character = BattleEntity::character(hero.clone());
        assert!(character.is_friendly());
        assert_eq!(character.row(), BattleRow::Any);
        assert_eq!(character.column(), None);

        let hostile = BattleEntity::hostile(slime, Seat::new(BattleRow::Top, 2));
        assert!(!hostile.is_friendly());
        assert_eq!(hostile.row(), BattleRow::Top);
        assert_eq!(hostile.column(), Some(2));

        assert!(BattleEntity::assist(hero).is_assist_character());
    }

    #[test]
    fn vacated_hostile_reports_no_seat() {
        let slime = TestParticipant::shared(2, "slime");
        let mut hostile = BattleEntity::hostile(slime, Seat::new(BattleRow::Middle, 2));

        assert_eq!(hostile.vacate_seat(), Some(Seat::new(BattleRow::Middle, 2)));
        assert_eq!(hostile.vacate_seat(), None);
        assert_eq!(hostile.row(), BattleRow::Any);
        assert_eq!(hostile.snapshot().row, None);
    }

    #[test]
    fn equality_is_by_participant_id() {
        let hero = TestParticipant::shared(1, "hero");
        assert_eq!(
            BattleEntity::character(hero.clone()),
            BattleEntity::assist(hero)
        );
    }

    #[test]
    fn snapshot_tracks_death() {
        let slime = TestParticipant::shared(7, "slime");
        let entity = BattleEntity::hostile(slime.clone(), Seat::new(BattleRow::Middle, 0));
        assert!(!entity.snapshot().is_dead);

        slime.kill();
        let snapshot = entity.snapshot();
        assert!(snapshot.is_dead);
        assert_eq!(snapshot.name, "slime");
        assert_eq!(snapshot.row, Some(BattleRow::Middle));
        assert!(!snapshot.is_friendly());
    }
}
