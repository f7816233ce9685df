use core::time::Duration;

use crate::error::{BattleError, ErrorSeverity};
use crate::position::BattleRow;

/// Encounter configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleConfig {
    /// Columns per board row. Also the capacity of a row.
    pub max_entities_per_row: u8,
    /// A row whose occupancy is at or below this value is filled directly
    /// before load-balancing across rows kicks in.
    pub row_split_threshold: u8,
    /// Rows hostiles are seated in by default, in priority order. Further rows
    /// are unlocked the first time a hostile prefers them.
    pub default_row_priority: Vec<BattleRow>,
    /// Minimum pacing delay between two dequeued battle sequences.
    pub queue_delay: Duration,
}

impl BattleConfig {
    // ===== compile-time constants =====
    /// Occupancy is stored in a `u32` bitmask per row.
    pub const MAX_ROW_WIDTH: u8 = 32;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_ENTITIES_PER_ROW: u8 = 5;
    pub const DEFAULT_ROW_SPLIT_THRESHOLD: u8 = 5;
    pub const DEFAULT_QUEUE_DELAY: Duration = Duration::from_secs(1);

    pub fn new() -> Self {
        Self {
            max_entities_per_row: Self::DEFAULT_MAX_ENTITIES_PER_ROW,
            row_split_threshold: Self::DEFAULT_ROW_SPLIT_THRESHOLD,
            default_row_priority: vec![BattleRow::Middle, BattleRow::Top],
            queue_delay: Self::DEFAULT_QUEUE_DELAY,
        }
    }

    pub fn with_max_entities_per_row(mut self, max_entities_per_row: u8) -> Self {
        self.max_entities_per_row = max_entities_per_row;
        self
    }

    pub fn with_row_split_threshold(mut self, row_split_threshold: u8) -> Self {
        self.row_split_threshold = row_split_threshold;
        self
    }

    pub fn with_default_row_priority(mut self, rows: Vec<BattleRow>) -> Self {
        self.default_row_priority = rows;
        self
    }

    pub fn with_queue_delay(mut self, queue_delay: Duration) -> Self {
        self.queue_delay = queue_delay;
        self
    }

    /// Checks the invariants the allocator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities_per_row == 0 || self.max_entities_per_row > Self::MAX_ROW_WIDTH {
            return Err(ConfigError::RowWidthOutOfRange(self.max_entities_per_row));
        }
        if self.default_row_priority.is_empty() {
            return Err(ConfigError::EmptyRowPriority);
        }
        if self.default_row_priority.contains(&BattleRow::Any) {
            return Err(ConfigError::WildcardRowInPriority);
        }
        Ok(())
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors raised when a [`BattleConfig`] cannot drive an encounter.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("row width {0} must be between 1 and {max}", max = BattleConfig::MAX_ROW_WIDTH)]
    RowWidthOutOfRange(u8),

    #[error("default row priority must name at least one row")]
    EmptyRowPriority,

    #[error("default row priority cannot contain the `Any` wildcard")]
    WildcardRowInPriority,
}

impl BattleError for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Fatal
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::RowWidthOutOfRange(_) => "CONFIG_ROW_WIDTH",
            Self::EmptyRowPriority => "CONFIG_EMPTY_PRIORITY",
            Self::WildcardRowInPriority => "CONFIG_WILDCARD_PRIORITY",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(BattleConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_row_width_outside_bitmask() {
        let config = BattleConfig::new().with_max_entities_per_row(33);
        assert_eq!(config.validate(), Err(ConfigError::RowWidthOutOfRange(33)));

        let config = BattleConfig::new().with_max_entities_per_row(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_wildcard_priority() {
        let config =
            BattleConfig::new().with_default_row_priority(vec![BattleRow::Middle, BattleRow::Any]);
        assert_eq!(config.validate(), Err(ConfigError::WildcardRowInPriority));
    }
}
