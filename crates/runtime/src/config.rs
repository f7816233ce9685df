//! Runtime configuration loaded from the environment.

use std::env;
use std::time::Duration;

use battle_core::BattleConfig;
use serde::{Deserialize, Serialize};

use crate::events::EventBus;

/// Configuration shared by the controller and its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub battle: BattleConfig,
    /// Capacity of each event bus topic.
    pub event_buffer_size: usize,
    /// Seed for run attempts. `None` draws from OS entropy.
    pub rng_seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            battle: BattleConfig::default(),
            event_buffer_size: EventBus::DEFAULT_CAPACITY,
            rng_seed: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(width) = parse::<u8>(lookup("BATTLE_MAX_ENTITIES_PER_ROW")) {
            config.battle.max_entities_per_row = width;
        }
        if let Some(threshold) = parse::<u8>(lookup("BATTLE_ROW_SPLIT_THRESHOLD")) {
            config.battle.row_split_threshold = threshold;
        }
        if let Some(millis) = parse::<u64>(lookup("BATTLE_QUEUE_DELAY_MS")) {
            config.battle.queue_delay = Duration::from_millis(millis);
        }
        if let Some(capacity) = parse::<usize>(lookup("BATTLE_EVENT_BUFFER")) {
            config.event_buffer_size = capacity.max(1);
        }
        config.rng_seed = parse::<u64>(lookup("BATTLE_RNG_SEED"));

        config
    }

    pub fn with_battle(mut self, battle: BattleConfig) -> Self {
        self.battle = battle;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }
}

fn parse<T>(value: Option<String>) -> Option<T>
where
    T: std::str::FromStr,
{
    value?.trim().parse().ok()
}
