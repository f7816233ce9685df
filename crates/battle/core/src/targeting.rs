//! Target resolution for armed actions.
//!
//! Actions pick their targets through a [`TargetingStrategy`] applied to a
//! candidate pool. The pool is filtered by side (relative to the sender) and
//! by whether candidates are alive, then put in board order: rows top to
//! bottom, columns left to right. Friendlies have no seat and keep roster
//! order.

use tracing::trace;

use crate::action::{BattleAction, BattleActionData};
use crate::entity::BattleEntity;
use crate::error::{BattleError, ErrorSeverity};
use crate::position::{BattleRow, next_row};

/// One input step while choosing targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetingNavigation {
    /// Re-resolve in place.
    #[default]
    Hold,
    Up,
    Down,
    Left,
    Right,
}

impl TargetingNavigation {
    /// Horizontal step for a forward/backward traverse request.
    pub const fn from_traverse(forward: bool) -> Self {
        if forward { Self::Right } else { Self::Left }
    }

    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Up | Self::Down)
    }

    /// Offset within an ordered pool: forward is +1.
    pub const fn step(self) -> isize {
        match self {
            Self::Right | Self::Down => 1,
            Self::Left | Self::Up => -1,
            Self::Hold => 0,
        }
    }
}

/// Which side a target must be on, relative to the sender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParticipantSide {
    #[default]
    Foe,
    Friendly,
    Either,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LivingFilter {
    #[default]
    Alive,
    Dead,
    Any,
}

impl LivingFilter {
    pub const fn accepts(self, is_dead: bool) -> bool {
        match self {
            Self::Alive => !is_dead,
            Self::Dead => is_dead,
            Self::Any => true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TargetFilter {
    pub side: ParticipantSide,
    pub living: LivingFilter,
}

impl TargetFilter {
    pub const FOE: Self = Self::new(ParticipantSide::Foe, LivingFilter::Alive);
    pub const FRIENDLY: Self = Self::new(ParticipantSide::Friendly, LivingFilter::Alive);

    pub const fn new(side: ParticipantSide, living: LivingFilter) -> Self {
        Self { side, living }
    }

    /// Eligible candidates for `sender`, in board order.
    pub fn pool(
        &self,
        sender: &BattleEntity,
        friendlies: &[BattleEntity],
        hostiles: &[BattleEntity],
    ) -> Vec<BattleEntity> {
        let (allies, foes) = if sender.is_friendly() {
            (friendlies, hostiles)
        } else {
            (hostiles, friendlies)
        };

        let mut pool = match self.side {
            ParticipantSide::Foe => board_order(foes),
            ParticipantSide::Friendly => board_order(allies),
            ParticipantSide::Either => {
                let mut both = board_order(foes);
                both.extend(board_order(allies));
                both
            }
        };
        pool.retain(|entity| self.living.accepts(entity.is_dead()));
        pool
    }
}

fn board_order(entities: &[BattleEntity]) -> Vec<BattleEntity> {
    let mut ordered = entities.to_vec();
    ordered.sort_by_key(|entity| {
        (
            entity.row().board_index().unwrap_or(BattleRow::BOARD.len()),
            entity.column().unwrap_or(0),
        )
    });
    ordered
}

/// Built-in targeting rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetingStrategy {
    /// The sender itself.
    SelfOnly,
    /// One focal target.
    Single(TargetFilter),
    /// `count` consecutive candidates, or the whole pool.
    Multi {
        filter: TargetFilter,
        count: usize,
        hit_everything: bool,
    },
    /// Every candidate on the focal row.
    Row(TargetFilter),
    /// Every candidate sharing the focal column.
    Column(TargetFilter),
    All(TargetFilter),
}

impl TargetingStrategy {
    pub const fn single_foe() -> Self {
        Self::Single(TargetFilter::FOE)
    }

    pub const fn filter(&self) -> Option<TargetFilter> {
        match *self {
            Self::SelfOnly => None,
            Self::Single(filter)
            | Self::Multi { filter, .. }
            | Self::Row(filter)
            | Self::Column(filter)
            | Self::All(filter) => Some(filter),
        }
    }

    /// Replaces `data.targets` according to this rule, anchored on the
    /// current focal target.
    pub fn apply(
        &self,
        navigation: TargetingNavigation,
        data: &mut BattleActionData,
        friendlies: &[BattleEntity],
        hostiles: &[BattleEntity],
    ) {
        let pool = match self.filter() {
            Some(filter) => filter.pool(&data.sender, friendlies, hostiles),
            None => Vec::new(),
        };
        let focus = data.first_target();

        let targets = match *self {
            Self::SelfOnly => vec![data.sender.clone()],
            Self::Single(_) => single(&pool, focus, navigation).into_iter().collect(),
            Self::Multi {
                count,
                hit_everything,
                ..
            } => multi(&pool, focus, navigation, count, hit_everything),
            Self::Row(_) => row(&pool, focus, navigation),
            Self::Column(_) => column(&pool, focus, navigation),
            Self::All(_) => pool,
        };

        trace!(
            target: "battle::targeting",
            strategy = ?self,
            ?navigation,
            sender = %data.sender.id(),
            count = targets.len(),
            "targets resolved"
        );
        data.targets = targets;
    }
}

fn position_of(pool: &[BattleEntity], focus: Option<&BattleEntity>) -> Option<usize> {
    let focus = focus?;
    pool.iter().position(|entity| entity == focus)
}

fn cycle(len: usize, index: usize, step: isize) -> usize {
    (index as isize + step).rem_euclid(len as isize) as usize
}

/// Next row in the navigation direction that has a candidate on it.
fn next_populated_row(
    pool: &[BattleEntity],
    from: BattleRow,
    navigation: TargetingNavigation,
) -> Option<BattleRow> {
    let mut row = from;
    for _ in 0..BattleRow::BOARD.len() - 1 {
        row = next_row(row, navigation);
        if pool.iter().any(|entity| entity.row() == row) {
            return Some(row);
        }
    }
    None
}

fn single(
    pool: &[BattleEntity],
    focus: Option<&BattleEntity>,
    navigation: TargetingNavigation,
) -> Option<BattleEntity> {
    let first = pool.first()?;
    let Some(index) = position_of(pool, focus) else {
        return Some(first.clone());
    };

    let next = match navigation {
        TargetingNavigation::Hold => index,
        TargetingNavigation::Left | TargetingNavigation::Right => {
            cycle(pool.len(), index, navigation.step())
        }
        TargetingNavigation::Up | TargetingNavigation::Down => match pool[index].seat() {
            Some(seat) => next_populated_row(pool, seat.row, navigation)
                .and_then(|row| {
                    pool.iter()
                        .enumerate()
                        .filter(|(_, entity)| entity.row() == row)
                        .min_by_key(|(_, entity)| {
                            entity
                                .column()
                                .map_or(u8::MAX, |column| column.abs_diff(seat.column))
                        })
                        .map(|(i, _)| i)
                })
                .unwrap_or(index),
            None => cycle(pool.len(), index, navigation.step()),
        },
    };
    Some(pool[next].clone())
}

fn multi(
    pool: &[BattleEntity],
    focus: Option<&BattleEntity>,
    navigation: TargetingNavigation,
    count: usize,
    hit_everything: bool,
) -> Vec<BattleEntity> {
    if hit_everything || pool.len() <= count {
        return pool.to_vec();
    }
    let head = match position_of(pool, focus) {
        Some(index) => cycle(pool.len(), index, navigation.step()),
        None => 0,
    };
    (0..count)
        .map(|offset| pool[(head + offset) % pool.len()].clone())
        .collect()
}

fn row(
    pool: &[BattleEntity],
    focus: Option<&BattleEntity>,
    navigation: TargetingNavigation,
) -> Vec<BattleEntity> {
    let Some(first) = pool.first() else {
        return Vec::new();
    };
    let mut row = focus
        .map(BattleEntity::row)
        .filter(|row| pool.iter().any(|entity| entity.row() == *row))
        .unwrap_or_else(|| first.row());
    if navigation.is_vertical() {
        row = next_populated_row(pool, row, navigation).unwrap_or(row);
    }
    pool.iter().filter(|entity| entity.row() == row).cloned().collect()
}

fn column(
    pool: &[BattleEntity],
    focus: Option<&BattleEntity>,
    navigation: TargetingNavigation,
) -> Vec<BattleEntity> {
    let Some(first) = pool.first() else {
        return Vec::new();
    };
    let mut columns: Vec<Option<u8>> = pool.iter().map(BattleEntity::column).collect();
    columns.sort_unstable();
    columns.dedup();

    let current = focus
        .map(BattleEntity::column)
        .filter(|column| columns.contains(column))
        .unwrap_or_else(|| first.column());
    let mut index = columns.iter().position(|column| *column == current).unwrap_or(0);
    if matches!(navigation, TargetingNavigation::Left | TargetingNavigation::Right) {
        index = cycle(columns.len(), index, navigation.step());
    }

    let column = columns[index];
    pool.iter()
        .filter(|entity| entity.column() == column)
        .cloned()
        .collect()
}

/// Errors raised when a resolved selection cannot be used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TargetingError {
    #[error("selection resolved to no targets")]
    NoTargets,

    #[error("every resolved target is already dead")]
    AllTargetsDead,
}

impl BattleError for TargetingError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NoTargets => "TARGETING_NO_TARGETS",
            Self::AllTargetsDead => "TARGETING_ALL_DEAD",
        }
    }
}

/// Resolves the selection for `action`, starting from `current`.
///
/// Without an action the result is the baseline: the sender alone with no
/// targets.
pub fn resolve_targets(
    action: Option<&dyn BattleAction>,
    navigation: TargetingNavigation,
    current: &BattleActionData,
    friendlies: &[BattleEntity],
    hostiles: &[BattleEntity],
) -> BattleActionData {
    let Some(action) = action else {
        return BattleActionData::new(current.sender.clone());
    };
    let mut data = current.clone();
    action.select_targets(navigation, &mut data, friendlies, hostiles);
    data
}

pub fn validate_targets(data: &BattleActionData) -> Result<(), TargetingError> {
    if data.targets.is_empty() {
        return Err(TargetingError::NoTargets);
    }
    if data.all_targets_dead() {
        return Err(TargetingError::AllTargetsDead);
    }
    Ok(())
}
