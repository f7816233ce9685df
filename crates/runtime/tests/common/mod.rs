//! Shared fixture for encounter integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use battle_core::testing::TestParticipant;
use battle_core::{
    BattleAction, BattleActionData, BattleEntity, BattleOutcome, BattleSequence, BattleState,
    CombatParticipant, TransitionType,
};
use battle_runtime::{
    BattleController, BattleControllerBuilder, Event, EventBus, ParticipantEvent, RewardOracle,
};
use rand::rngs::mock::StepRng;
use tokio::sync::broadcast;

pub const FRAME: Duration = Duration::from_millis(100);

/// Run attempts always succeed when the odds are positive.
pub fn lucky_rng() -> StepRng {
    StepRng::new(0, 0)
}

/// Run attempts fail unless escape is certain.
pub fn unlucky_rng() -> StepRng {
    StepRng::new(u64::MAX, 0)
}

pub struct Rewards(pub bool);

impl RewardOracle for Rewards {
    fn has_reward(&self, _: &[BattleEntity], _: &[BattleEntity]) -> bool {
        self.0
    }
}

pub struct Fixture {
    pub controller: BattleController,
    pub bus: EventBus,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with(BattleController::builder().rng(lucky_rng()))
    }

    pub fn with(builder: BattleControllerBuilder) -> Self {
        let controller = builder.build().expect("default config is valid");
        let bus = controller.event_bus().clone();
        Self { controller, bus }
    }

    /// Shares `participant` and routes its notifications onto the bus.
    pub fn join(&self, participant: TestParticipant) -> Arc<TestParticipant> {
        let participant = participant.into_shared();
        let bus = self.bus.clone();
        participant.on_state_altered(move |info| {
            bus.announce(ParticipantEvent::StateAltered(info));
        });
        participant
    }

    pub fn hero(&self, id: u32) -> Arc<TestParticipant> {
        self.join(TestParticipant::new(id, format!("hero-{id}")))
    }

    pub fn slime(&self, id: u32) -> Arc<TestParticipant> {
        self.join(TestParticipant::new(id, format!("slime-{id}")))
    }

    pub fn setup(&mut self, characters: &[&Arc<TestParticipant>], hostiles: &[&Arc<TestParticipant>]) {
        self.controller
            .setup(
                shared(characters),
                Vec::new(),
                shared(hostiles),
                TransitionType::BattleNeutral,
            )
            .expect("unique participants");
    }

    /// Starts the encounter and acknowledges intro and pre-combat.
    pub fn enter_combat(&mut self) {
        self.controller.start();
        self.controller
            .set_state(BattleState::Combat, BattleOutcome::Undetermined);
    }

    pub fn tick(&mut self) {
        self.controller.tick(FRAME);
    }

    pub fn tick_for(&mut self, duration: Duration) {
        let frames = duration.as_millis() / FRAME.as_millis();
        for _ in 0..frames {
            self.tick();
        }
    }

    /// Sequence from the friendly `sender` against the hostile `target`.
    pub fn sequence(
        &self,
        action: &Arc<impl BattleAction + 'static>,
        sender: &Arc<TestParticipant>,
        target: &Arc<TestParticipant>,
    ) -> BattleSequence {
        let find = |id| {
            self.controller
                .friendlies()
                .iter()
                .chain(self.controller.hostiles())
                .find(|entity| entity.id() == id)
                .cloned()
                .expect("participant is in the encounter")
        };
        let data = BattleActionData::new(find(sender.id())).with_targets(vec![find(target.id())]);
        BattleSequence::new(action.clone(), data)
    }
}

pub fn shared(participants: &[&Arc<TestParticipant>]) -> Vec<Arc<dyn CombatParticipant>> {
    participants
        .iter()
        .map(|participant| Arc::clone(participant) as Arc<dyn CombatParticipant>)
        .collect()
}

pub fn drain(receiver: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

pub fn ids(entities: &[BattleEntity]) -> Vec<u32> {
    entities.iter().map(|entity| entity.id().0).collect()
}
