//! Scripted participants and actions for tests.
//!
//! Enabled by the `test-utils` feature so downstream crates can drive an
//! encounter without real stat or skill systems.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::action::{ActionCompletion, BattleAction, BattleActionData};
use crate::participant::{
    CalculatedStat, CombatParticipant, ParticipantId, StateAltered, StateAlteredKind,
};
use crate::position::BattleRow;
use crate::targeting::TargetingStrategy;

type Announcer = Box<dyn Fn(StateAltered) + Send + Sync>;

#[derive(Debug, Clone)]
struct ParticipantState {
    dead: bool,
    cooldown: f32,
    run_speed: f32,
    imposing: f32,
    imposing_against: HashMap<ParticipantId, f32>,
    fearsome: f32,
    preferred_row: BattleRow,
    combat_active: bool,
    run_penalties: u32,
    self_destruct_armed: bool,
    initialized_with: Option<(bool, Option<bool>)>,
}

/// Participant whose state is set directly by the test.
///
/// Deaths are announced through the callback installed with
/// [`TestParticipant::on_state_altered`], mirroring how real participants
/// report to the encounter.
pub struct TestParticipant {
    id: ParticipantId,
    name: String,
    state: Mutex<ParticipantState>,
    announcer: Mutex<Option<Announcer>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TestParticipant {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id: ParticipantId(id),
            name: name.into(),
            state: Mutex::new(ParticipantState {
                dead: false,
                cooldown: 0.0,
                run_speed: 1.0,
                imposing: 0.0,
                imposing_against: HashMap::new(),
                fearsome: 0.0,
                preferred_row: BattleRow::Any,
                combat_active: false,
                run_penalties: 0,
                self_destruct_armed: false,
                initialized_with: None,
            }),
            announcer: Mutex::new(None),
        }
    }

    pub fn shared(id: u32, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(id, name))
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn with_run_speed(self, run_speed: f32) -> Self {
        lock(&self.state).run_speed = run_speed;
        self
    }

    /// Imposing stat against every opponent without an explicit override.
    pub fn with_imposing(self, imposing: f32) -> Self {
        lock(&self.state).imposing = imposing;
        self
    }

    pub fn with_imposing_against(self, opponent: u32, imposing: f32) -> Self {
        lock(&self.state)
            .imposing_against
            .insert(ParticipantId(opponent), imposing);
        self
    }

    pub fn with_fearsome(self, fearsome: f32) -> Self {
        lock(&self.state).fearsome = fearsome;
        self
    }

    pub fn with_preferred_row(self, row: BattleRow) -> Self {
        lock(&self.state).preferred_row = row;
        self
    }

    pub fn with_cooldown(self, seconds: f32) -> Self {
        lock(&self.state).cooldown = seconds;
        self
    }

    /// Installs the callback that receives this participant's notifications.
    pub fn on_state_altered(&self, announcer: impl Fn(StateAltered) + Send + Sync + 'static) {
        *lock(&self.announcer) = Some(Box::new(announcer));
    }

    fn announce(&self, info: StateAltered) {
        if let Some(announcer) = lock(&self.announcer).as_ref() {
            announcer(info);
        }
    }

    /// Marks the participant dead and announces it.
    pub fn kill(&self) {
        lock(&self.state).dead = true;
        self.announce(StateAltered::died(self.id));
    }

    pub fn revive(&self) {
        lock(&self.state).dead = false;
        self.announce(StateAltered::new(self.id, StateAlteredKind::Resurrected));
    }

    pub fn cooldown(&self) -> f32 {
        lock(&self.state).cooldown
    }

    pub fn run_penalties(&self) -> u32 {
        lock(&self.state).run_penalties
    }

    pub fn is_self_destruct_armed(&self) -> bool {
        lock(&self.state).self_destruct_armed
    }

    pub fn is_combat_active(&self) -> bool {
        lock(&self.state).combat_active
    }

    /// Arguments of the last `initialize_cooldown` call.
    pub fn initialized_with(&self) -> Option<(bool, Option<bool>)> {
        lock(&self.state).initialized_with
    }
}

impl CombatParticipant for TestParticipant {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_dead(&self) -> bool {
        lock(&self.state).dead
    }

    fn is_in_cooldown(&self) -> bool {
        lock(&self.state).cooldown > 0.0
    }

    fn set_cooldown(&self, seconds: f32) {
        lock(&self.state).cooldown = seconds;
        self.announce(
            StateAltered::new(self.id, StateAlteredKind::CooldownSet).with_points(seconds),
        );
    }

    fn initialize_cooldown(&self, is_player: bool, battle_advantage: Option<bool>) {
        let mut state = lock(&self.state);
        state.initialized_with = Some((is_player, battle_advantage));
        state.cooldown = match battle_advantage {
            Some(true) => 0.0,
            Some(false) => 2.0,
            None => state.cooldown,
        };
    }

    fn increment_cooldown_store_for_run(&self) {
        lock(&self.state).run_penalties += 1;
    }

    fn run_speed(&self) -> f32 {
        lock(&self.state).run_speed
    }

    fn calculated_stat(
        &self,
        stat: CalculatedStat,
        opponent: Option<&dyn CombatParticipant>,
    ) -> f32 {
        let state = lock(&self.state);
        match stat {
            CalculatedStat::RunSpeed => state.run_speed,
            CalculatedStat::Fearsome => state.fearsome,
            CalculatedStat::Imposing => opponent
                .and_then(|opponent| state.imposing_against.get(&opponent.id()).copied())
                .unwrap_or(state.imposing),
        }
    }

    fn self_implode(&self) {
        self.kill();
    }

    fn setup_self_destroy_on_battle_complete(&self) {
        lock(&self.state).self_destruct_armed = true;
    }

    fn set_combat_active(&self, active: bool) {
        lock(&self.state).combat_active = active;
    }

    fn preferred_row(&self) -> BattleRow {
        lock(&self.state).preferred_row
    }
}

/// Record of one `use_action` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionUse {
    pub sender: ParticipantId,
    pub targets: Vec<ParticipantId>,
}

/// Action that records its uses.
///
/// By default the completion fires immediately. A held action keeps its
/// completions until [`TestAction::finish_pending`] is called, so tests can
/// observe the queue blocked on an in-flight action.
pub struct TestAction {
    name: String,
    strategy: TargetingStrategy,
    hold_completion: bool,
    uses: Mutex<Vec<ActionUse>>,
    pending: Mutex<Vec<ActionCompletion>>,
}

impl TestAction {
    pub fn new(name: impl Into<String>, strategy: TargetingStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
            hold_completion: false,
            uses: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn held(mut self) -> Self {
        self.hold_completion = true;
        self
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn uses(&self) -> Vec<ActionUse> {
        lock(&self.uses).clone()
    }

    pub fn use_count(&self) -> usize {
        lock(&self.uses).len()
    }

    /// Fires every held completion; returns how many were pending.
    pub fn finish_pending(&self) -> usize {
        let pending: Vec<_> = lock(&self.pending).drain(..).collect();
        let count = pending.len();
        pending.into_iter().for_each(ActionCompletion::complete);
        count
    }
}

impl BattleAction for TestAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn targeting(&self) -> TargetingStrategy {
        self.strategy
    }

    fn use_action(&self, data: &BattleActionData, completion: ActionCompletion) {
        lock(&self.uses).push(ActionUse {
            sender: data.sender.id(),
            targets: data.target_ids(),
        });
        if self.hold_completion {
            lock(&self.pending).push(completion);
        } else {
            completion.complete();
        }
    }
}
