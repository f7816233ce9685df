//! Encounter outcome evaluation: victory, defeat, auto-win and run attempts.

use battle_core::{
    BattleEntity, BattleOutcome, BattleState, CombatParticipant, is_imposing_encounter,
    run_chance,
};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info};

use crate::oracle::RewardOracle;

/// Result of [`OutcomeEvaluator::attempt_to_run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunAttempt {
    Escaped { chance: f32, draw: f32 },
    Caught { chance: f32, draw: f32 },
    /// No friendly was able to run; nothing was rolled.
    NoRunners,
}

impl RunAttempt {
    pub fn escaped(&self) -> bool {
        matches!(self, Self::Escaped { .. })
    }
}

pub struct OutcomeEvaluator {
    early_run_eligible: bool,
    rng: Box<dyn RngCore + Send>,
}

impl OutcomeEvaluator {
    /// Seeded evaluators replay the same run rolls.
    pub fn new(rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(rng)
    }

    pub fn with_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            early_run_eligible: false,
            rng: Box::new(rng),
        }
    }

    /// Lets the next run attempt ignore cooldowns. Armed at encounter setup.
    pub fn arm_early_run(&mut self) {
        self.early_run_eligible = true;
    }

    pub fn clear_early_run(&mut self) {
        self.early_run_eligible = false;
    }

    pub fn is_early_run_eligible(&self) -> bool {
        self.early_run_eligible
    }

    /// Decides the transition caused by a death, if any.
    ///
    /// A friendly wipe is checked first, so a mutual wipe is a loss.
    pub fn evaluate_death(
        &self,
        state: BattleState,
        friendlies: &[BattleEntity],
        hostiles: &[BattleEntity],
        rewards: Option<&dyn RewardOracle>,
    ) -> Option<(BattleState, BattleOutcome)> {
        if !state.is_combat_capable() {
            return None;
        }

        if friendlies.iter().all(BattleEntity::is_dead) {
            info!(target: "battle::outcome", "party wiped out");
            return Some((BattleState::Outro, BattleOutcome::Lost));
        }

        if hostiles.iter().all(BattleEntity::is_dead) {
            let has_reward = rewards.is_some_and(|oracle| oracle.has_reward(friendlies, hostiles));
            info!(target: "battle::outcome", has_reward, "hostiles defeated");
            let next = if has_reward {
                BattleState::Rewards
            } else {
                BattleState::Outro
            };
            return Some((next, BattleOutcome::Won));
        }

        None
    }

    pub fn check_auto_win(&self, friendlies: &[BattleEntity], hostiles: &[BattleEntity]) -> bool {
        let imposing = is_imposing_encounter(friendlies, hostiles);
        debug!(target: "battle::outcome", imposing, hostiles = hostiles.len(), "auto-win check");
        imposing
    }

    /// Rolls an escape. Consumes the early-run leniency either way.
    pub fn attempt_to_run(
        &mut self,
        friendlies: &[BattleEntity],
        hostiles: &[BattleEntity],
    ) -> RunAttempt {
        let lenient = std::mem::take(&mut self.early_run_eligible);

        let runners: Vec<&dyn CombatParticipant> = friendlies
            .iter()
            .filter(|entity| !entity.is_dead())
            .map(|entity| entity.participant().as_ref())
            .filter(|participant| lenient || !participant.is_in_cooldown())
            .collect();
        if runners.is_empty() {
            debug!(target: "battle::outcome", lenient, "no friendly able to run");
            return RunAttempt::NoRunners;
        }

        let party_speed =
            runners.iter().map(|runner| runner.run_speed()).sum::<f32>() / runners.len() as f32;
        let enemy_speed = hostiles
            .iter()
            .filter(|entity| !entity.is_dead())
            .map(|entity| entity.participant().run_speed())
            .fold(0.0_f32, f32::max);

        let chance = run_chance(party_speed, enemy_speed);
        let draw: f32 = self.rng.r#gen();
        debug!(
            target: "battle::outcome",
            party_speed,
            enemy_speed,
            chance,
            draw,
            lenient,
            "run attempt rolled"
        );

        if draw < chance {
            RunAttempt::Escaped { chance, draw }
        } else {
            RunAttempt::Caught { chance, draw }
        }
    }
}

impl std::fmt::Debug for OutcomeEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeEvaluator")
            .field("early_run_eligible", &self.early_run_eligible)
            .finish_non_exhaustive()
    }
}
