//! Headless battle driver.
//!
//! Composition root that wires scripted combatants into a
//! [`BattleController`] and plays one encounter to completion. Phase
//! acknowledgements the presentation layer would normally send (intro
//! finished, rewards shown) are issued immediately. Board, state and queue
//! events are printed to stdout as JSON lines; logs go to stderr.
//!
//! ```bash
//! RUST_LOG=battle=debug BATTLE_RNG_SEED=7 cargo run -p battle-client
//! ```

mod arena;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use battle_core::{
    BattleAction, BattleActionData, BattleEntity, BattleOutcome, BattleRow, BattleSequence,
    BattleState, CombatParticipant, TargetFilter, TargetingNavigation, TargetingStrategy,
    TransitionType,
};
use battle_runtime::{BattleController, BattleRequest, Event, EventBus, RuntimeConfig, Topic};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

use arena::{Arena, Attack, Combatant, Profile};

const FRAME: Duration = Duration::from_millis(50);
const MAX_FRAMES: u32 = 6_000;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig::from_env();
    info!(?config, "starting encounter");

    let bus = EventBus::with_capacity(config.event_buffer_size);
    let mut controller = BattleController::builder()
        .config(config)
        .event_bus(bus.clone())
        // flawless victories are rewarded
        .rewards(|friendlies: &[BattleEntity], _: &[BattleEntity]| {
            friendlies.iter().all(|friendly| !friendly.is_dead())
        })
        .build()?;

    let encounter = Encounter::assemble(&bus);
    let mut feed = bus.subscribe_multiple(&[Topic::State, Topic::Board, Topic::Queue]);

    controller.setup(
        encounter.characters.clone(),
        encounter.assists.clone(),
        encounter.hostiles.clone(),
        TransitionType::BattleNeutral,
    )?;
    controller.start();
    print_events(&mut feed)?;

    let mut interval = tokio::time::interval(FRAME);
    for _ in 0..MAX_FRAMES {
        interval.tick().await;

        if controller.state() == BattleState::Combat {
            encounter.arena.tick(FRAME);
        }
        controller.tick(FRAME);
        print_events(&mut feed)?;

        match controller.state() {
            BattleState::Intro => {
                controller.set_state(BattleState::PreCombat, BattleOutcome::Undetermined)
            }
            BattleState::PreCombat => {
                controller.set_state(BattleState::Combat, BattleOutcome::Undetermined)
            }
            BattleState::Combat => encounter.play_turns(&controller, &bus),
            BattleState::Rewards => {
                info!("rewards granted");
                controller.set_state(BattleState::Outro, controller.outcome());
            }
            BattleState::Outro => {
                controller.set_state(BattleState::Complete, controller.outcome());
            }
            BattleState::Complete => break,
            BattleState::Inactive => {}
        }
    }
    print_events(&mut feed)?;

    if controller.state() != BattleState::Complete {
        warn!(state = %controller.state(), "encounter did not finish");
    }
    info!(outcome = %controller.outcome(), "encounter finished");
    Ok(())
}

/// Combatants and the actions they use.
struct Encounter {
    arena: Arc<Arena>,
    characters: Vec<Arc<dyn CombatParticipant>>,
    assists: Vec<Arc<dyn CombatParticipant>>,
    hostiles: Vec<Arc<dyn CombatParticipant>>,
    strike: Arc<dyn BattleAction>,
    sweep: Arc<dyn BattleAction>,
    bite: Arc<dyn BattleAction>,
}

impl Encounter {
    fn assemble(bus: &EventBus) -> Self {
        let mut arena = Arena::default();
        let mut join = |id, profile| -> Arc<dyn CombatParticipant> {
            arena.insert(Combatant::new(id, profile, bus.clone()))
        };

        let characters = vec![
            join(1, hero("Ayla", 42, 9, Duration::from_millis(1_200))),
            join(2, hero("Bram", 55, 7, Duration::from_millis(1_600))),
        ];
        let assists = vec![join(3, hero("Wisp", 20, 4, Duration::from_millis(900)))];
        let hostiles = vec![
            join(10, monster("slime", 18, 4, BattleRow::Any)),
            join(11, monster("slime", 18, 4, BattleRow::Any)),
            join(12, monster("slime", 18, 4, BattleRow::Any)),
            join(13, monster("ogre", 60, 8, BattleRow::Top)),
        ];

        let arena = Arc::new(arena);
        let strike = Attack::new("strike", TargetingStrategy::single_foe(), 1.0, arena.clone());
        let sweep = Attack::new(
            "sweep",
            TargetingStrategy::Row(TargetFilter::FOE),
            0.6,
            arena.clone(),
        );
        let bite = Attack::new("bite", TargetingStrategy::single_foe(), 1.0, arena.clone());

        Self {
            arena,
            characters,
            assists,
            hostiles,
            strike: Arc::new(strike),
            sweep: Arc::new(sweep),
            bite: Arc::new(bite),
        }
    }

    /// One frame of scripted decisions: the selected character attacks,
    /// every ready hostile bites, and assists heckle from the back.
    fn play_turns(&self, controller: &BattleController, bus: &EventBus) {
        if let Some(character) = controller.selected_character() {
            let standing = controller.hostiles().iter().filter(|h| !h.is_dead()).count();
            let action = if standing > 2 {
                &self.sweep
            } else {
                &self.strike
            };
            if !controller.is_action_armed() {
                info!(character = character.name(), action = action.name(), "player turn");
                bus.request(BattleRequest::SelectAction(Some(action.clone())));
                bus.request(BattleRequest::ArmAction(true));
                bus.request(BattleRequest::SubmitSelection);
            }
        }

        let ready = controller
            .hostiles()
            .iter()
            .chain(controller.friendlies().iter().filter(|f| f.is_assist_character()))
            .filter(|entity| !entity.is_dead() && !entity.participant().is_in_cooldown());
        for entity in ready {
            let action = if entity.is_friendly() {
                &self.strike
            } else {
                &self.bite
            };
            let mut data = BattleActionData::new(entity.clone());
            action.select_targets(
                TargetingNavigation::Hold,
                &mut data,
                controller.friendlies(),
                controller.hostiles(),
            );
            if data.targets.is_empty() {
                continue;
            }
            bus.request(BattleRequest::QueueSubmission(BattleSequence::new(
                action.clone(),
                data,
            )));
        }
    }
}

fn hero(name: &'static str, max_hp: u32, power: u32, recovery: Duration) -> Profile {
    Profile {
        name,
        max_hp,
        power,
        run_speed: 1.2,
        recovery,
        row: BattleRow::Any,
    }
}

fn monster(name: &'static str, max_hp: u32, power: u32, row: BattleRow) -> Profile {
    Profile {
        name,
        max_hp,
        power,
        run_speed: 0.8,
        recovery: Duration::from_millis(2_000),
        row,
    }
}

fn print_events(feed: &mut HashMap<Topic, broadcast::Receiver<Event>>) -> Result<()> {
    for receiver in feed.values_mut() {
        loop {
            let event = match receiver.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "event feed lagged");
                    continue;
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            };
            let line = match &event {
                Event::StateChanged(changed) => serde_json::to_string(changed)?,
                Event::Board(board) => serde_json::to_string(board)?,
                Event::SequenceProcessed(processed) => serde_json::to_string(processed)?,
                _ => continue,
            };
            println!("{:?} {line}", event.topic());
        }
    }
    Ok(())
}
