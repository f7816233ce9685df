//! Common error infrastructure for battle-core.
//!
//! Domain-specific errors (`PlacementError`, `TargetingError`, `ConfigError`)
//! live next to the component that produces them. None of them are fatal to
//! an encounter: each is handled at the boundary where it occurs, and the
//! severity classification below tells the caller how loudly to report it.

/// Severity level of an error, used for categorization and logging priority.
///
/// - **Recoverable**: the encounter continues with reduced scope (e.g. a spawn is skipped)
/// - **Validation**: invalid input that should be rejected and the prior state restored
/// - **Internal**: unexpected inconsistency that indicates a logic defect
/// - **Fatal**: the encounter cannot be constructed at all
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Recoverable error - the caller abandons the operation and carries on.
    ///
    /// Examples: no free seat for a reinforcement
    Recoverable,

    /// Validation error - input rejected, previous state stays in effect.
    ///
    /// Examples: every resolved target is already dead
    Validation,

    /// Internal error - unexpected state inconsistency.
    ///
    /// Examples: a row passed the capacity filter but has no free column
    Internal,

    /// Fatal error - the encounter cannot be set up.
    ///
    /// Examples: board width outside the bitmask range
    Fatal,
}

impl ErrorSeverity {
    /// Returns a human-readable description of this severity level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Recoverable => "recoverable",
            Self::Validation => "validation",
            Self::Internal => "internal",
            Self::Fatal => "fatal",
        }
    }

    /// Returns true if this error is potentially recoverable.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable)
    }
}

/// Common trait for all battle-core errors.
///
/// # Implementation Guidelines
///
/// - Use `#[derive(thiserror::Error)]` for Display/Error impl
/// - Classify severity based on recoverability, not impact
pub trait BattleError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity level of this error.
    fn severity(&self) -> ErrorSeverity;

    /// Returns a static string identifier for this error variant.
    ///
    /// Useful for log fields and test assertions.
    fn error_code(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
