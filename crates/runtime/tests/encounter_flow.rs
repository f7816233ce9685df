//! Phase transitions, outcomes and run attempts of a whole encounter.

mod common;

use std::sync::{Arc, Mutex};

use battle_core::testing::TestParticipant;
use battle_core::{
    BattleConfig, BattleEntity, BattleError, BattleOutcome, BattleRow, BattleState, CombatParticipant,
    ConfigError, ErrorSeverity, ParticipantId, TransitionType,
};
use battle_runtime::{
    BattleController, BoardEvent, Event, RuntimeConfig, RuntimeError, StateChanged, Topic,
};
use common::{Fixture, Rewards, drain, ids, lucky_rng, shared, unlucky_rng};

fn states(events: Vec<Event>) -> Vec<(BattleState, BattleOutcome)> {
    events
        .into_iter()
        .filter_map(|event| match event {
            Event::StateChanged(StateChanged { state, outcome, .. }) => Some((state, outcome)),
            _ => None,
        })
        .collect()
}

#[test]
fn start_enters_intro_and_broadcasts_rosters() {
    let mut fx = Fixture::new();
    let mut state_rx = fx.bus.subscribe(Topic::State);
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    assert!(fx.controller.is_early_run_eligible());

    fx.controller.start();
    assert_eq!(fx.controller.state(), BattleState::Intro);

    match drain(&mut state_rx).as_slice() {
        [Event::StateChanged(changed)] => {
            assert_eq!(changed.state, BattleState::Intro);
            assert_eq!(changed.outcome, BattleOutcome::Undetermined);
            assert_eq!(changed.friendlies[0].name, "hero-1");
            assert_eq!(changed.hostiles[0].row, Some(BattleRow::Middle));
        }
        other => panic!("unexpected {other:?}"),
    }

    fx.controller
        .set_state(BattleState::PreCombat, BattleOutcome::Undetermined);
    assert!(fx.controller.is_early_run_eligible());
    fx.controller
        .set_state(BattleState::Combat, BattleOutcome::Undetermined);
    assert!(!fx.controller.is_early_run_eligible());
}

#[test]
fn imposing_party_wins_without_fighting() {
    let mut fx = Fixture::new();
    let mut state_rx = fx.bus.subscribe(Topic::State);
    let hero = fx.join(TestParticipant::new(1, "hero").with_imposing(2.0));
    let slimes = [fx.slime(10), fx.slime(11)];
    fx.setup(&[&hero], &[&slimes[0], &slimes[1]]);

    fx.controller.start();
    assert_eq!(fx.controller.state(), BattleState::Combat);
    assert!(slimes.iter().all(|slime| slime.is_dead()));

    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Outro);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Won);
    assert_eq!(
        states(drain(&mut state_rx)),
        vec![
            (BattleState::Combat, BattleOutcome::Undetermined),
            (BattleState::Outro, BattleOutcome::Won),
        ]
    );
    assert!(fx.controller.hostiles().is_empty());
}

#[test]
fn unimposing_party_must_fight() {
    let mut fx = Fixture::new();
    let hero = fx.join(
        TestParticipant::new(1, "hero")
            .with_imposing(2.0)
            .with_imposing_against(11, 0.0),
    );
    let slimes = [fx.slime(10), fx.slime(11)];
    fx.setup(&[&hero], &[&slimes[0], &slimes[1]]);

    fx.controller.start();
    assert_eq!(fx.controller.state(), BattleState::Intro);
    assert!(!slimes[0].is_dead());
}

#[test]
fn win_with_rewards_then_cleanup_runs_once() {
    let mut fx = Fixture::with(
        BattleController::builder()
            .rng(lucky_rng())
            .rewards(Rewards(true)),
    );
    let mut board_rx = fx.bus.subscribe(Topic::Board);
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    fx.enter_combat();
    fx.tick();

    slime.kill();
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Rewards);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Won);
    let hostiles = fx.controller.hostiles();
    assert_eq!(hostiles.len(), 1, "defeated hostile stays on the roster");
    assert_eq!(hostiles[0].seat(), None, "but leaves the board");
    assert!(fx.controller.is_position_available());
    assert_eq!(fx.controller.friendlies().len(), 1);

    fx.controller.set_state(BattleState::Outro, BattleOutcome::Won);
    for _ in 0..5 {
        fx.tick();
    }
    assert!(fx.controller.friendlies().is_empty());

    let removed: Vec<_> = drain(&mut board_rx)
        .into_iter()
        .filter_map(|event| match event {
            Event::Board(BoardEvent::EntityRemoved(snapshot)) => Some(snapshot.id),
            _ => None,
        })
        .collect();
    assert_eq!(removed, vec![ParticipantId(10), ParticipantId(1)]);

    fx.controller.set_state(BattleState::Complete, BattleOutcome::Won);
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Complete);
}

#[test]
fn win_without_reward_oracle_skips_rewards() {
    let mut fx = Fixture::new();
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    fx.enter_combat();

    slime.kill();
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Outro);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Won);
}

#[test]
fn party_wipe_is_a_loss() {
    let mut fx = Fixture::new();
    let heroes = [fx.hero(1), fx.hero(2)];
    let slime = fx.slime(10);
    fx.setup(&[&heroes[0], &heroes[1]], &[&slime]);
    fx.enter_combat();

    heroes[0].kill();
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Combat);

    heroes[1].kill();
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Outro);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Lost);
}

#[test]
fn mutual_wipe_is_a_loss() {
    let mut fx = Fixture::with(
        BattleController::builder()
            .rng(lucky_rng())
            .rewards(Rewards(true)),
    );
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    fx.enter_combat();

    slime.kill();
    hero.kill();
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Outro);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Lost);
}

#[test]
fn deaths_before_start_decide_nothing() {
    let mut fx = Fixture::new();
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);

    slime.kill();
    fx.tick();
    assert_eq!(fx.controller.state(), BattleState::Inactive);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Undetermined);
}

#[test]
fn early_run_ignores_cooldown() {
    let mut fx = Fixture::new();
    let hero = fx.join(TestParticipant::new(1, "hero").with_cooldown(5.0));
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    fx.controller.start();

    assert!(fx.controller.attempt_to_run());
    assert_eq!(fx.controller.state(), BattleState::Outro);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Ran);
    assert!(slime.is_self_destruct_armed());
}

#[test]
fn early_run_is_consumed_by_first_attempt() {
    let mut fx = Fixture::with(BattleController::builder().rng(unlucky_rng()));
    let hero = fx.join(TestParticipant::new(1, "hero").with_cooldown(5.0));
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    fx.controller.start();

    assert!(!fx.controller.attempt_to_run(), "even odds, worst draw");
    assert_eq!(hero.run_penalties(), 1);
    assert!(!fx.controller.is_early_run_eligible());

    // hero is cooling down and leniency is gone: nobody can run, which
    // still counts as a failed attempt
    assert!(!fx.controller.attempt_to_run());
    assert_eq!(hero.run_penalties(), 2);
    assert_eq!(fx.controller.state(), BattleState::Intro);
}

#[test]
fn failed_run_penalizes_living_friendlies_only() {
    let mut fx = Fixture::with(BattleController::builder().rng(unlucky_rng()));
    let heroes = [fx.hero(1), fx.hero(2)];
    let slime = fx.slime(10);
    fx.setup(&[&heroes[0], &heroes[1]], &[&slime]);
    fx.enter_combat();

    heroes[1].kill();
    fx.tick();
    assert!(!fx.controller.attempt_to_run());
    assert_eq!(heroes[0].run_penalties(), 1);
    assert_eq!(heroes[1].run_penalties(), 0);
    assert_eq!(fx.controller.state(), BattleState::Combat);
}

#[test]
fn run_with_nobody_able_fails_with_penalty() {
    let mut fx = Fixture::with(BattleController::builder().rng(unlucky_rng()));
    let hero = fx.join(TestParticipant::new(1, "hero").with_cooldown(5.0));
    let assist = fx.join(TestParticipant::new(2, "wisp").with_cooldown(5.0));
    let slime = fx.slime(10);
    fx.controller
        .setup(
            shared(&[&hero]),
            shared(&[&assist]),
            shared(&[&slime]),
            TransitionType::BattleNeutral,
        )
        .unwrap();
    fx.enter_combat();
    fx.tick();

    assert!(!fx.controller.attempt_to_run());
    assert_eq!(hero.run_penalties(), 1);
    assert_eq!(assist.run_penalties(), 1);
    assert_eq!(fx.controller.state(), BattleState::Combat);
}

#[test]
fn run_outside_combat_is_refused() {
    let mut fx = Fixture::new();
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    assert!(!fx.controller.attempt_to_run());
    assert_eq!(fx.controller.state(), BattleState::Inactive);
}

#[test]
fn battle_advantage_biases_initial_cooldowns() {
    let mut fx = Fixture::new();
    let hero = fx.hero(1);
    let helper = fx.hero(2);
    let slime = fx.slime(10);
    fx.controller
        .setup(
            shared(&[&hero]),
            shared(&[&helper]),
            shared(&[&slime]),
            TransitionType::BattleGood,
        )
        .expect("unique participants");

    assert_eq!(hero.initialized_with(), Some((true, Some(true))));
    assert_eq!(helper.initialized_with(), Some((false, Some(true))));
    assert_eq!(slime.initialized_with(), Some((false, Some(false))));
    assert!(fx.controller.friendlies()[1].is_assist_character());
}

#[test]
fn combat_flag_follows_the_phase() {
    let mut fx = Fixture::new();
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);

    fx.controller.start();
    assert!(!hero.is_combat_active());
    fx.controller
        .set_state(BattleState::Combat, BattleOutcome::Undetermined);
    assert!(hero.is_combat_active());
    assert!(slime.is_combat_active());
    fx.controller
        .set_state(BattleState::Outro, BattleOutcome::Ran);
    assert!(!hero.is_combat_active());
}

#[test]
fn duplicate_participants_are_rejected() {
    let mut fx = Fixture::new();
    let hero = fx.hero(1);
    let result = fx.controller.setup(
        shared(&[&hero, &hero]),
        Vec::new(),
        Vec::new(),
        TransitionType::BattleNeutral,
    );
    let error = result.unwrap_err();
    assert_eq!(error, RuntimeError::DuplicateParticipant(ParticipantId(1)));
    assert_eq!(error.severity(), ErrorSeverity::Internal);
}

#[test]
fn invalid_config_fails_the_build() {
    let config = RuntimeConfig::default()
        .with_battle(BattleConfig::new().with_default_row_priority(Vec::new()));
    let error = BattleController::builder().config(config).build().unwrap_err();
    assert_eq!(
        error,
        RuntimeError::InvalidConfig(ConfigError::EmptyRowPriority)
    );
    assert_eq!(error.severity(), ErrorSeverity::Fatal);
}

#[test]
fn reward_oracle_sees_every_defeated_hostile() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let mut fx = Fixture::with(BattleController::builder().rng(lucky_rng()).rewards(
        move |friendlies: &[BattleEntity], hostiles: &[BattleEntity]| {
            let all_dead = hostiles.iter().all(BattleEntity::is_dead);
            recorded
                .lock()
                .unwrap()
                .push((ids(friendlies), ids(hostiles), all_dead));
            true
        },
    ));
    let mut state_rx = fx.bus.subscribe(Topic::State);
    let hero = fx.hero(1);
    let slimes = [fx.slime(10), fx.slime(11), fx.slime(12)];
    fx.setup(&[&hero], &[&slimes[0], &slimes[1], &slimes[2]]);
    fx.enter_combat();
    fx.tick();

    for slime in &slimes {
        slime.kill();
        fx.tick();
    }
    assert_eq!(fx.controller.state(), BattleState::Rewards);
    assert_eq!(
        *seen.lock().unwrap(),
        vec![(vec![1], vec![10, 11, 12], true)]
    );

    let won = drain(&mut state_rx)
        .into_iter()
        .find_map(|event| match event {
            Event::StateChanged(changed) if changed.outcome == BattleOutcome::Won => Some(changed),
            _ => None,
        })
        .expect("win was broadcast");
    assert_eq!(won.hostiles.len(), 3);
    assert!(won.hostiles.iter().all(|snapshot| snapshot.is_dead && snapshot.row.is_none()));
}

#[test]
fn dropped_death_notice_is_recovered() {
    let config = RuntimeConfig {
        event_buffer_size: 2,
        ..RuntimeConfig::default()
    };
    let mut fx = Fixture::with(BattleController::builder().config(config).rng(lucky_rng()));
    let mut board_rx = fx.bus.subscribe(Topic::Board);
    let hero = fx.hero(1);
    let slime = fx.slime(10);
    fx.setup(&[&hero], &[&slime]);
    fx.enter_combat();
    fx.tick();

    // the death is pushed out of the participant topic before the next tick
    slime.kill();
    hero.set_cooldown(0.0);
    hero.set_cooldown(0.0);
    fx.tick();

    assert_eq!(fx.controller.state(), BattleState::Outro);
    assert_eq!(fx.controller.outcome(), BattleOutcome::Won);
    let removed: Vec<_> = drain(&mut board_rx)
        .into_iter()
        .filter_map(|event| match event {
            Event::Board(BoardEvent::EntityRemoved(snapshot)) => Some(snapshot.id),
            _ => None,
        })
        .collect();
    assert_eq!(removed, vec![ParticipantId(10), ParticipantId(1)]);
}
