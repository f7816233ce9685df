//! Scripted combatants and actions for the headless driver.
//!
//! Stands in for the stat, skill and animation systems a real game plugs
//! into the runtime: combatants keep hit points and a cooldown timer, and
//! actions resolve instantly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use battle_core::{
    ActionCompletion, BattleAction, BattleActionData, BattleRow, CalculatedStat,
    CombatParticipant, ParticipantId, StateAltered, TargetingStrategy,
};
use battle_runtime::{EventBus, ParticipantEvent};
use tracing::{debug, info};

/// Static stat block of a combatant.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: &'static str,
    pub max_hp: u32,
    pub power: u32,
    pub run_speed: f32,
    pub recovery: Duration,
    pub row: BattleRow,
}

#[derive(Debug)]
struct Vitals {
    hp: u32,
    cooldown: f32,
    combat_active: bool,
    run_penalties: u32,
}

pub struct Combatant {
    id: ParticipantId,
    profile: Profile,
    vitals: Mutex<Vitals>,
    bus: EventBus,
}

impl Combatant {
    pub fn new(id: u32, profile: Profile, bus: EventBus) -> Self {
        Self {
            id: ParticipantId(id),
            vitals: Mutex::new(Vitals {
                hp: profile.max_hp,
                cooldown: 0.0,
                combat_active: false,
                run_penalties: 0,
            }),
            profile,
            bus,
        }
    }

    fn vitals(&self) -> MutexGuard<'_, Vitals> {
        self.vitals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn hp(&self) -> u32 {
        self.vitals().hp
    }

    /// Applies damage; announces the death when it drops to zero.
    pub fn hit(&self, damage: u32) {
        let died = {
            let mut vitals = self.vitals();
            if vitals.hp == 0 {
                return;
            }
            vitals.hp = vitals.hp.saturating_sub(damage);
            vitals.hp == 0
        };
        debug!(target: "battle::arena", participant = %self.id, damage, hp = self.hp(), "hit");
        if died {
            self.bus
                .announce(ParticipantEvent::StateAltered(StateAltered::died(self.id)));
        }
    }

    /// Cooldown after acting, lengthened by failed escapes.
    fn rest(&self) {
        let mut vitals = self.vitals();
        let penalty = vitals.run_penalties as f32 * 0.5;
        vitals.cooldown = self.profile.recovery.as_secs_f32() + penalty;
    }

    /// Counts the cooldown down while combat runs.
    pub fn tick(&self, elapsed: Duration) {
        let mut vitals = self.vitals();
        if vitals.combat_active && vitals.cooldown.is_finite() {
            vitals.cooldown = (vitals.cooldown - elapsed.as_secs_f32()).max(0.0);
        }
    }
}

impl CombatParticipant for Combatant {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        self.profile.name
    }

    fn is_dead(&self) -> bool {
        self.vitals().hp == 0
    }

    fn is_in_cooldown(&self) -> bool {
        self.vitals().cooldown > 0.0
    }

    fn set_cooldown(&self, seconds: f32) {
        self.vitals().cooldown = seconds;
    }

    fn initialize_cooldown(&self, is_player: bool, battle_advantage: Option<bool>) {
        let recovery = self.profile.recovery.as_secs_f32();
        let cooldown = match battle_advantage {
            Some(true) => 0.0,
            Some(false) => recovery,
            // characters get the first move on neutral ground
            None if is_player => 0.0,
            None => recovery * 0.5,
        };
        self.vitals().cooldown = cooldown;
    }

    fn increment_cooldown_store_for_run(&self) {
        self.vitals().run_penalties += 1;
    }

    fn run_speed(&self) -> f32 {
        self.profile.run_speed
    }

    fn calculated_stat(&self, stat: CalculatedStat, opponent: Option<&dyn CombatParticipant>) -> f32 {
        let power = self.profile.power as f32;
        match stat {
            CalculatedStat::RunSpeed => self.profile.run_speed,
            CalculatedStat::Fearsome => power,
            CalculatedStat::Imposing => {
                let threat = opponent.map_or(0.0, |opponent| {
                    opponent.calculated_stat(CalculatedStat::Fearsome, None)
                });
                power - threat * 3.0
            }
        }
    }

    fn self_implode(&self) {
        info!(target: "battle::arena", participant = %self.id, name = self.profile.name, "flees in terror");
        self.hit(u32::MAX);
    }

    fn setup_self_destroy_on_battle_complete(&self) {
        debug!(target: "battle::arena", participant = %self.id, "despawns after the encounter");
    }

    fn set_combat_active(&self, active: bool) {
        self.vitals().combat_active = active;
    }

    fn preferred_row(&self) -> BattleRow {
        self.profile.row
    }
}

/// Every combatant of the encounter by id.
#[derive(Default)]
pub struct Arena {
    combatants: HashMap<ParticipantId, Arc<Combatant>>,
}

impl Arena {
    pub fn insert(&mut self, combatant: Combatant) -> Arc<Combatant> {
        let combatant = Arc::new(combatant);
        self.combatants.insert(combatant.id, combatant.clone());
        combatant
    }

    pub fn get(&self, id: ParticipantId) -> Option<&Arc<Combatant>> {
        self.combatants.get(&id)
    }

    pub fn tick(&self, elapsed: Duration) {
        for combatant in self.combatants.values() {
            combatant.tick(elapsed);
        }
    }
}

/// Damage dealt to every resolved target, scaled by the sender's power.
pub struct Attack {
    name: &'static str,
    targeting: TargetingStrategy,
    scale: f32,
    arena: Arc<Arena>,
}

impl Attack {
    pub fn new(name: &'static str, targeting: TargetingStrategy, scale: f32, arena: Arc<Arena>) -> Self {
        Self {
            name,
            targeting,
            scale,
            arena,
        }
    }
}

impl BattleAction for Attack {
    fn name(&self) -> &str {
        self.name
    }

    fn targeting(&self) -> TargetingStrategy {
        self.targeting
    }

    fn use_action(&self, data: &BattleActionData, completion: ActionCompletion) {
        let sender = self.arena.get(data.sender.id());
        let power = sender.map_or(0, |sender| sender.profile.power);
        let damage = (power as f32 * self.scale).round() as u32;

        for target in data.target_ids() {
            if let Some(target) = self.arena.get(target) {
                target.hit(damage);
            }
        }
        if let Some(sender) = sender {
            sender.rest();
        }
        completion.complete();
    }
}
