//! Battle state machine.
//!
//! [`BattleController`] owns the encounter: rosters and board seats, the
//! current selection, the turn queue, and the outcome evaluator. It is
//! driven by [`BattleController::tick`] from a single thread and talks to
//! everything else through the [`EventBus`].

mod roster;
mod selection;

use std::sync::Arc;
use std::time::Duration;

use battle_core::{
    BattleConfig, BattleEntity, BattleError, BattleOutcome, BattleState, CombatParticipant,
    ParticipantId, PositionAllocator, Seat, StateAltered, TransitionType,
};
use rand::RngCore;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::events::{
    BattleRequest, BoardEvent, Event, EventBus, ParticipantEvent, StateChanged, Topic,
};
use crate::oracle::RewardOracle;
use crate::outcome::{OutcomeEvaluator, RunAttempt};
use crate::queue::{QueuePoll, TurnQueue};

use roster::Roster;
use selection::Selection;

/// Drives one encounter from setup to completion.
pub struct BattleController {
    config: BattleConfig,
    event_bus: EventBus,
    participant_rx: broadcast::Receiver<Event>,
    request_rx: broadcast::Receiver<Event>,
    rewards: Option<Box<dyn RewardOracle>>,

    state: BattleState,
    outcome: BattleOutcome,
    transition: TransitionType,
    outro_cleanup_done: bool,

    roster: Roster,
    selection: Selection,
    queue: TurnQueue,
    evaluator: OutcomeEvaluator,
}

impl BattleController {
    pub fn builder() -> BattleControllerBuilder {
        BattleControllerBuilder::new()
    }

    pub fn state(&self) -> BattleState {
        self.state
    }

    pub fn outcome(&self) -> BattleOutcome {
        self.outcome
    }

    pub fn config(&self) -> &BattleConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn friendlies(&self) -> &[BattleEntity] {
        self.roster.friendlies()
    }

    pub fn hostiles(&self) -> &[BattleEntity] {
        self.roster.hostiles()
    }

    pub fn battle_mat(&self) -> &PositionAllocator {
        self.roster.mat()
    }

    pub fn is_position_available(&self) -> bool {
        self.roster.mat().is_position_available()
    }

    pub fn queue(&self) -> &TurnQueue {
        &self.queue
    }

    pub fn is_early_run_eligible(&self) -> bool {
        self.evaluator.is_early_run_eligible()
    }

    // ===== lifecycle =====

    /// Populates the encounter. Hostiles that cannot be seated are skipped.
    pub fn setup(
        &mut self,
        characters: Vec<Arc<dyn CombatParticipant>>,
        assists: Vec<Arc<dyn CombatParticipant>>,
        hostiles: Vec<Arc<dyn CombatParticipant>>,
        transition: TransitionType,
    ) -> Result<()> {
        self.transition = transition;
        self.outcome = BattleOutcome::Undetermined;
        self.outro_cleanup_done = false;
        self.evaluator.arm_early_run();

        for participant in characters {
            self.add_friendly(BattleEntity::character(participant))?;
        }
        for participant in assists {
            self.add_friendly(BattleEntity::assist(participant))?;
        }
        for participant in hostiles {
            match self.add_enemy(participant) {
                Ok(_) | Err(RuntimeError::Placement(_)) => {}
                Err(error) => return Err(error),
            }
        }

        info!(
            target: "battle::state",
            friendlies = self.roster.friendlies().len(),
            hostiles = self.roster.hostiles().len(),
            ?transition,
            "encounter set up"
        );
        Ok(())
    }

    fn add_friendly(&mut self, entity: BattleEntity) -> Result<()> {
        if self.roster.contains(entity.id()) {
            return Err(RuntimeError::DuplicateParticipant(entity.id()));
        }
        entity.participant().initialize_cooldown(
            entity.is_character(),
            self.transition.battle_advantage(true),
        );
        self.event_bus
            .publish(Event::Board(BoardEvent::EntityAdded(entity.snapshot())));
        self.roster.add_friendly(entity);
        Ok(())
    }

    /// Seats a hostile, either at setup or as a mid-combat reinforcement.
    pub fn add_enemy(&mut self, participant: Arc<dyn CombatParticipant>) -> Result<BattleEntity> {
        let id = participant.id();
        if self.roster.contains(id) {
            return Err(RuntimeError::DuplicateParticipant(id));
        }

        let entity = self.roster.seat_hostile(participant).map_err(|error| {
            warn!(
                target: "battle::mat",
                participant = %id,
                code = error.error_code(),
                %error,
                "hostile not placed"
            );
            RuntimeError::from(error)
        })?;

        let participant = entity.participant();
        participant.initialize_cooldown(false, self.transition.battle_advantage(false));
        if self.state == BattleState::Combat {
            participant.set_combat_active(true);
        }
        self.event_bus
            .publish(Event::Board(BoardEvent::EntityAdded(entity.snapshot())));
        Ok(entity)
    }

    /// Leaves `Inactive`. An imposing party wins outright: every hostile
    /// implodes and the encounter goes straight to combat, where the deaths
    /// are picked up.
    pub fn start(&mut self) {
        if self
            .evaluator
            .check_auto_win(self.roster.friendlies(), self.roster.hostiles())
        {
            info!(target: "battle::state", "imposing encounter, hostiles implode");
            for hostile in self.roster.hostiles() {
                hostile.participant().self_implode();
            }
            self.set_state(BattleState::Combat, BattleOutcome::Undetermined);
        } else {
            self.set_state(BattleState::Intro, BattleOutcome::Undetermined);
        }
    }

    /// Overwrites the phase and outcome and broadcasts them.
    pub fn set_state(&mut self, state: BattleState, outcome: BattleOutcome) {
        let previous = self.state;
        self.state = state;
        self.outcome = outcome;

        if state == BattleState::Combat {
            self.evaluator.clear_early_run();
        }
        let combat_active = state == BattleState::Combat;
        for entity in self.roster.all() {
            entity.participant().set_combat_active(combat_active);
        }

        info!(target: "battle::state", from = %previous, to = %state, %outcome, "state changed");
        self.event_bus.publish(Event::StateChanged(StateChanged::new(
            state,
            outcome,
            self.roster.friendlies(),
            self.roster.hostiles(),
        )));
    }

    /// Tries to flee. Returns true when the party escaped.
    pub fn attempt_to_run(&mut self) -> bool {
        if !self.state.is_combat_capable() {
            warn!(target: "battle::outcome", state = %self.state, "run attempt outside combat");
            return false;
        }

        match self
            .evaluator
            .attempt_to_run(self.roster.friendlies(), self.roster.hostiles())
        {
            RunAttempt::Escaped { .. } => {
                for hostile in self.roster.hostiles() {
                    hostile.participant().setup_self_destroy_on_battle_complete();
                }
                self.set_state(BattleState::Outro, BattleOutcome::Ran);
                true
            }
            RunAttempt::Caught { .. } | RunAttempt::NoRunners => {
                for friendly in self.roster.friendlies().iter().filter(|f| !f.is_dead()) {
                    friendly.participant().increment_cooldown_store_for_run();
                }
                false
            }
        }
    }

    // ===== tick =====

    /// Advances the encounter by one frame.
    pub fn tick(&mut self, elapsed: Duration) {
        self.process_inbound();

        match self.state {
            BattleState::Outro if !self.outro_cleanup_done => {
                self.outro_cleanup_done = true;
                self.clean_up_encounter();
            }
            BattleState::Complete => self.outro_cleanup_done = false,
            _ => {}
        }

        if self.state == BattleState::Combat {
            self.queue.advance(elapsed);
            if self.queue.poll(&self.event_bus) == QueuePoll::Dispatched {
                debug!(target: "battle::queue", remaining = self.queue.len(), "queue advanced");
            }
            self.auto_select_character();
        }
    }

    fn auto_select_character(&mut self) {
        if self.state != BattleState::Combat || self.selected_character().is_some() {
            return;
        }
        if let Some(id) = self.roster.first_ready_character().map(BattleEntity::id) {
            if let Err(error) = self.set_selected_character(Some(id)) {
                debug!(target: "battle::targeting", code = error.error_code(), %error, "auto-select skipped");
            }
        }
    }

    fn process_inbound(&mut self) {
        // Handlers may publish further participant events (board removals),
        // so keep draining until the topic is quiet.
        let mut lagged = false;
        loop {
            let (events, dropped) = drain(&mut self.participant_rx);
            lagged |= dropped;
            if events.is_empty() {
                break;
            }
            for event in events {
                if let Event::Participant(event) = event {
                    self.handle_participant_event(event);
                }
            }
        }
        if lagged {
            self.resync_after_lag();
        }

        let (requests, _) = drain(&mut self.request_rx);
        for event in requests {
            if let Event::Request(request) = event {
                self.handle_request(request);
            }
        }
    }

    fn handle_participant_event(&mut self, event: ParticipantEvent) {
        match event {
            ParticipantEvent::StateAltered(info) => self.handle_state_altered(info),
            ParticipantEvent::RemovedFromBoard { participant, seat } => {
                self.handle_removed_from_board(participant, seat)
            }
        }
    }

    fn handle_state_altered(&mut self, info: StateAltered) {
        if !info.is_death() {
            return;
        }
        let Some(entity) = self.roster.find(info.participant).cloned() else {
            debug!(target: "battle::state", participant = %info.participant, "death of unknown participant");
            return;
        };
        debug!(target: "battle::state", participant = %entity.id(), name = entity.name(), "participant died");

        if let Some(seat) = entity.seat() {
            self.event_bus.announce(ParticipantEvent::RemovedFromBoard {
                participant: entity.id(),
                seat,
            });
        }
        self.refresh_selection_after_death(entity.id());
        self.evaluate_outcome();
    }

    fn evaluate_outcome(&mut self) {
        let rewards = self.rewards.as_deref();
        if let Some((state, outcome)) = self.evaluator.evaluate_death(
            self.state,
            self.roster.friendlies(),
            self.roster.hostiles(),
            rewards,
        ) {
            self.set_state(state, outcome);
        }
    }

    fn handle_removed_from_board(&mut self, id: ParticipantId, seat: Seat) {
        let Some(entity) = self.roster.vacate_hostile(id, seat) else {
            debug!(target: "battle::mat", participant = %id, row = %seat.row, column = seat.column, "stale board removal ignored");
            return;
        };
        let snapshot = entity.snapshot();
        debug!(target: "battle::mat", participant = %id, row = %seat.row, column = seat.column, "left the board");
        self.event_bus
            .publish(Event::Board(BoardEvent::EntityRemoved(snapshot)));
    }

    /// Rebuilds death bookkeeping from the participants themselves after
    /// participant events were dropped.
    fn resync_after_lag(&mut self) {
        let dead: Vec<(ParticipantId, Option<Seat>)> = self
            .roster
            .all()
            .filter(|entity| entity.is_dead())
            .map(|entity| (entity.id(), entity.seat()))
            .collect();
        info!(target: "battle::state", dead = dead.len(), "resyncing after dropped events");

        for (id, seat) in dead {
            if let Some(seat) = seat {
                self.handle_removed_from_board(id, seat);
            }
            self.refresh_selection_after_death(id);
        }
        self.evaluate_outcome();
    }

    fn handle_request(&mut self, request: BattleRequest) {
        let result = match request {
            BattleRequest::SelectCharacter(id) => self.set_selected_character(id),
            BattleRequest::SelectAction(action) => self.set_active_action(action),
            BattleRequest::ArmAction(armed) => self.set_action_armed(armed),
            BattleRequest::CycleTargets(navigation) => self.cycle_targets(navigation),
            BattleRequest::SubmitSelection => self.submit_selection(),
            BattleRequest::QueueSubmission(sequence) => {
                self.submit(sequence);
                Ok(())
            }
        };

        if let Err(error) = result {
            warn!(
                target: "battle::state",
                code = error.error_code(),
                severity = error.severity().as_str(),
                %error,
                "request rejected"
            );
        }
    }

    /// One-shot teardown on entering `Outro`.
    fn clean_up_encounter(&mut self) {
        self.clear_selection();
        self.queue.clear();
        let removed = self.roster.clear();
        for entity in &removed {
            self.event_bus
                .publish(Event::Board(BoardEvent::EntityRemoved(entity.snapshot())));
        }
        info!(target: "battle::state", removed = removed.len(), outcome = %self.outcome, "encounter cleaned up");
    }
}

/// Everything pending on `receiver`, plus whether any events were lost.
fn drain(receiver: &mut broadcast::Receiver<Event>) -> (Vec<Event>, bool) {
    let mut events = Vec::new();
    let mut lagged = false;
    loop {
        match receiver.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(target: "battle::state", skipped, "inbound events dropped");
                lagged = true;
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    (events, lagged)
}

impl std::fmt::Debug for BattleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BattleController")
            .field("state", &self.state)
            .field("outcome", &self.outcome)
            .field("friendlies", &self.roster.friendlies().len())
            .field("hostiles", &self.roster.hostiles().len())
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

/// Builder for [`BattleController`].
pub struct BattleControllerBuilder {
    config: RuntimeConfig,
    event_bus: Option<EventBus>,
    rewards: Option<Box<dyn RewardOracle>>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl BattleControllerBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            event_bus: None,
            rewards: None,
            rng: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing bus instead of creating one
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn rewards(mut self, rewards: impl RewardOracle + 'static) -> Self {
        self.rewards = Some(Box::new(rewards));
        self
    }

    /// Replace the run-attempt RNG. Takes precedence over `rng_seed`.
    pub fn rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    pub fn build(self) -> Result<BattleController> {
        let RuntimeConfig {
            battle,
            event_buffer_size,
            rng_seed,
        } = self.config;
        battle.validate()?;

        let event_bus = self
            .event_bus
            .unwrap_or_else(|| EventBus::with_capacity(event_buffer_size));
        let evaluator = match self.rng {
            Some(rng) => OutcomeEvaluator::with_rng(rng),
            None => OutcomeEvaluator::new(rng_seed),
        };

        Ok(BattleController {
            participant_rx: event_bus.subscribe(Topic::Participant),
            request_rx: event_bus.subscribe(Topic::Request),
            event_bus,
            rewards: self.rewards,
            state: BattleState::Inactive,
            outcome: BattleOutcome::Undetermined,
            transition: TransitionType::default(),
            outro_cleanup_done: false,
            roster: Roster::new(&battle),
            selection: Selection::default(),
            queue: TurnQueue::new(battle.queue_delay),
            evaluator,
            config: battle,
        })
    }
}
