//! Reward collaborator consulted when the party wins.

use battle_core::BattleEntity;

/// Decides whether a won encounter has rewards to hand out.
///
/// Consulted once, at the win transition. A controller without an oracle
/// treats every win as reward-less.
pub trait RewardOracle: Send + Sync {
    fn has_reward(&self, friendlies: &[BattleEntity], hostiles: &[BattleEntity]) -> bool;
}

impl<F> RewardOracle for F
where
    F: Fn(&[BattleEntity], &[BattleEntity]) -> bool + Send + Sync,
{
    fn has_reward(&self, friendlies: &[BattleEntity], hostiles: &[BattleEntity]) -> bool {
        self(friendlies, hostiles)
    }
}
