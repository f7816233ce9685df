//! Boundary to the combat participant collaborator.
//!
//! The encounter never computes stats, HP or cooldown timers itself. It only
//! queries and nudges participants through [`CombatParticipant`], and learns
//! about their changes through [`StateAltered`] notifications.

use core::fmt;

use crate::position::BattleRow;

/// Stable identity of a combat participant within an encounter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stats that are derived by the participant from its own and an opponent's
/// base stats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CalculatedStat {
    /// In-battle speed used for run attempts.
    RunSpeed,
    /// Positive when this participant would scare the opponent into fleeing.
    Fearsome,
    /// Positive when this participant dominates the opponent outright.
    Imposing,
}

/// How the encounter was entered, as reported by the upstream driver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransitionType {
    /// The party caught the hostiles off guard.
    BattleGood,
    #[default]
    BattleNeutral,
    /// The hostiles caught the party off guard.
    BattleBad,
}

impl TransitionType {
    /// Advantage for one side of the encounter: `Some(true)` when that side
    /// got the jump, `Some(false)` when it was ambushed, `None` when neutral.
    pub const fn battle_advantage(self, is_friendly: bool) -> Option<bool> {
        match self {
            Self::BattleGood => Some(is_friendly),
            Self::BattleBad => Some(!is_friendly),
            Self::BattleNeutral => None,
        }
    }
}

/// What changed about a participant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StateAlteredKind {
    Dead,
    Resurrected,
    CooldownSet,
    HpChanged,
    ApChanged,
    StatusApplied,
}

/// Notification announced by a participant whenever its state changes.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateAltered {
    pub participant: ParticipantId,
    pub kind: StateAlteredKind,
    pub points: Option<f32>,
}

impl StateAltered {
    pub const fn new(participant: ParticipantId, kind: StateAlteredKind) -> Self {
        Self {
            participant,
            kind,
            points: None,
        }
    }

    pub const fn with_points(mut self, points: f32) -> Self {
        self.points = Some(points);
        self
    }

    pub const fn died(participant: ParticipantId) -> Self {
        Self::new(participant, StateAlteredKind::Dead)
    }

    pub fn is_death(&self) -> bool {
        self.kind == StateAlteredKind::Dead
    }
}

/// A combatant the encounter can query and nudge.
///
/// All methods take `&self`: participants are shared between the encounter
/// and the systems that animate them, so implementations own their interior
/// mutability.
pub trait CombatParticipant: Send + Sync {
    fn id(&self) -> ParticipantId;

    fn name(&self) -> &str;

    fn is_dead(&self) -> bool;

    fn is_in_cooldown(&self) -> bool;

    /// Sets the remaining cooldown in seconds. `f32::INFINITY` locks the
    /// participant until the cooldown is explicitly set again.
    fn set_cooldown(&self, seconds: f32);

    /// Resets the cooldown for a fresh encounter, biased by battle advantage.
    fn initialize_cooldown(&self, _is_player: bool, _battle_advantage: Option<bool>) {}

    /// Adds the penalty for a failed run attempt to the stored cooldown.
    fn increment_cooldown_store_for_run(&self);

    fn run_speed(&self) -> f32;

    /// Contested stat against `opponent`, or the uncontested value when `None`.
    fn calculated_stat(&self, stat: CalculatedStat, opponent: Option<&dyn CombatParticipant>)
    -> f32;

    /// Kills the participant outright; it is expected to announce its death.
    fn self_implode(&self);

    /// Arranges for the participant to clean itself up once the encounter ends.
    fn setup_self_destroy_on_battle_complete(&self);

    /// Toggled on every phase change: true only while in combat.
    fn set_combat_active(&self, _active: bool) {}

    fn preferred_row(&self) -> BattleRow {
        BattleRow::Any
    }
}

impl fmt::Debug for dyn CombatParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatParticipant")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
