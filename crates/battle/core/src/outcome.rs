use crate::entity::BattleEntity;
use crate::participant::CalculatedStat;

/// Phase of an encounter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleState {
    #[default]
    Inactive,
    Intro,
    PreCombat,
    Combat,
    Outro,
    Rewards,
    Complete,
}

impl BattleState {
    /// Phases in which deaths can still decide the encounter.
    pub const fn is_combat_capable(self) -> bool {
        matches!(self, Self::Intro | Self::PreCombat | Self::Combat)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleOutcome {
    #[default]
    Undetermined,
    Won,
    Lost,
    Ran,
}

/// True when, for every hostile, some friendly has a positive imposing stat
/// against it. An encounter without hostiles is never imposing.
pub fn is_imposing_encounter(friendlies: &[BattleEntity], hostiles: &[BattleEntity]) -> bool {
    if hostiles.is_empty() {
        return false;
    }

    hostiles.iter().all(|hostile| {
        let best = friendlies.iter().fold(-1.0_f32, |best, friendly| {
            let imposing = friendly
                .participant()
                .calculated_stat(CalculatedStat::Imposing, Some(hostile.participant().as_ref()));
            best.max(imposing)
        });
        best > 0.0
    })
}

/// Probability that the party escapes, from its average run speed and the
/// fastest hostile's.
///
/// Negative speeds count as zero; when neither side has any speed the odds
/// are even.
pub fn run_chance(party_speed: f32, enemy_speed: f32) -> f32 {
    let party = party_speed.max(0.0);
    let enemy = enemy_speed.max(0.0);
    let total = party + enemy;
    if total <= 0.0 {
        return 0.5;
    }
    (party / total).clamp(0.0, 1.0)
}
