//! Seating of hostiles on the battle board.
//!
//! The board is a small grid of rows (Top/Middle/Bottom) whose occupancy is
//! tracked as one `u32` bitmask per row: bit `c` set means column `c` is
//! taken. [`PositionAllocator`] is the only writer of those masks besides
//! explicit [`PositionAllocator::release`] calls made when an entity leaves
//! the board.

use tracing::debug;

use crate::config::BattleConfig;
use crate::error::{BattleError, ErrorSeverity};
use crate::targeting::TargetingNavigation;

/// A row on the battle board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleRow {
    Top,
    Middle,
    Bottom,
    /// No preference; the allocator picks the row.
    #[default]
    Any,
}

impl BattleRow {
    /// Concrete rows in on-screen order, top to bottom.
    pub const BOARD: [BattleRow; 3] = [BattleRow::Top, BattleRow::Middle, BattleRow::Bottom];

    /// Index into [`Self::BOARD`], `None` for [`BattleRow::Any`].
    pub const fn board_index(self) -> Option<usize> {
        match self {
            Self::Top => Some(0),
            Self::Middle => Some(1),
            Self::Bottom => Some(2),
            Self::Any => None,
        }
    }

    /// The neighbouring board row, wrapping at the edges. `Any` resolves to
    /// the middle row.
    pub fn shifted(self, downward: bool) -> BattleRow {
        let Some(index) = self.board_index() else {
            return BattleRow::Middle;
        };
        let len = Self::BOARD.len();
        let next = if downward {
            (index + 1) % len
        } else {
            (index + len - 1) % len
        };
        Self::BOARD[next]
    }
}

/// Row reached from `row` by a vertical navigation step. Horizontal and hold
/// steps stay on the same row.
pub fn next_row(row: BattleRow, navigation: TargetingNavigation) -> BattleRow {
    match navigation {
        TargetingNavigation::Up => row.shifted(false),
        TargetingNavigation::Down => row.shifted(true),
        TargetingNavigation::Hold | TargetingNavigation::Left | TargetingNavigation::Right => row,
    }
}

/// A (row, column) position on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Seat {
    pub row: BattleRow,
    pub column: u8,
}

impl Seat {
    pub const fn new(row: BattleRow, column: u8) -> Self {
        Self { row, column }
    }
}

/// Errors that can occur when seating a hostile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("every board row is at capacity")]
    NoRowCapacity,

    #[error("row {0} passed the capacity filter but has no free column")]
    NoColumnCapacity(BattleRow),
}

impl BattleError for PlacementError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoRowCapacity => ErrorSeverity::Recoverable,
            Self::NoColumnCapacity(_) => ErrorSeverity::Internal,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NoRowCapacity => "PLACEMENT_NO_ROW",
            Self::NoColumnCapacity(_) => "PLACEMENT_NO_COLUMN",
        }
    }
}

/// Number of set bits in `mask`.
///
/// `n & (n - 1)` always clears the least significant set bit, so the loop runs
/// once per occupant.
pub fn occupied_columns(mut mask: u32) -> u32 {
    let mut count = 0;
    while mask != 0 {
        mask &= mask - 1;
        count += 1;
    }
    count
}

/// Assigns board seats to hostiles entering the encounter.
#[derive(Clone, Debug)]
pub struct PositionAllocator {
    width: u8,
    split_threshold: u8,
    row_priority: Vec<BattleRow>,
    occupancy: [u32; 3],
}

impl PositionAllocator {
    pub fn new(config: &BattleConfig) -> Self {
        Self {
            width: config.max_entities_per_row.min(BattleConfig::MAX_ROW_WIDTH),
            split_threshold: config.row_split_threshold,
            row_priority: config.default_row_priority.clone(),
            occupancy: [0; 3],
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    /// Rows currently eligible for "any row" seating, in priority order.
    pub fn row_priority(&self) -> &[BattleRow] {
        &self.row_priority
    }

    pub fn row_mask(&self, row: BattleRow) -> u32 {
        row.board_index().map_or(0, |index| self.occupancy[index])
    }

    pub fn count_in_row(&self, row: BattleRow) -> u32 {
        occupied_columns(self.row_mask(row))
    }

    pub fn is_occupied(&self, seat: Seat) -> bool {
        seat.column < self.width && self.row_mask(seat.row) & (1 << seat.column) != 0
    }

    fn is_row_full(&self, row: BattleRow) -> bool {
        self.count_in_row(row) >= u32::from(self.width)
    }

    /// True while at least one row in the priority list has room.
    pub fn is_position_available(&self) -> bool {
        let available = self.row_priority.iter().any(|&row| !self.is_row_full(row));
        if !available {
            debug!(target: "battle::mat", "no remaining positions for hostiles");
        }
        available
    }

    /// Seats an entrant, preferring `preferred` when it has room.
    pub fn allocate(&mut self, preferred: BattleRow) -> Result<Seat, PlacementError> {
        let candidates = self.candidate_rows(preferred);
        if candidates.is_empty() {
            return Err(PlacementError::NoRowCapacity);
        }

        let row = if preferred != BattleRow::Any && candidates.contains(&preferred) {
            preferred
        } else {
            self.pick_any_row(&candidates)
        };

        let column = self
            .free_column(row)
            .ok_or(PlacementError::NoColumnCapacity(row))?;
        let seat = Seat::new(row, column);
        debug_assert!(!self.is_occupied(seat), "seat {seat:?} assigned twice");

        self.set_occupied(seat, true);
        debug!(target: "battle::mat", ?row, column, "hostile seated");
        Ok(seat)
    }

    /// Frees a seat. Returns false if the seat was not occupied.
    pub fn release(&mut self, seat: Seat) -> bool {
        if !self.is_occupied(seat) {
            return false;
        }
        self.set_occupied(seat, false);
        debug!(target: "battle::mat", row = ?seat.row, column = seat.column, "seat released");
        true
    }

    /// Empties the board. The unlocked row priority is kept.
    pub fn clear(&mut self) {
        self.occupancy = [0; 3];
    }

    fn set_occupied(&mut self, seat: Seat, occupied: bool) {
        let Some(index) = seat.row.board_index() else {
            return;
        };
        let mask = 1u32 << seat.column;
        if occupied {
            self.occupancy[index] |= mask;
        } else {
            self.occupancy[index] &= !mask;
        }
    }

    /// Preferred row first, then the remaining priority rows, minus full rows.
    fn candidate_rows(&mut self, preferred: BattleRow) -> Vec<BattleRow> {
        let mut rows = Vec::with_capacity(BattleRow::BOARD.len());
        if preferred != BattleRow::Any {
            rows.push(preferred);
            if !self.row_priority.contains(&preferred) {
                // e.g. two rows by default; a hostile preferring Bottom opens a third
                self.row_priority.push(preferred);
            }
        }
        rows.extend(self.row_priority.iter().copied().filter(|&row| row != preferred));
        rows.retain(|&row| !self.is_row_full(row));
        rows
    }

    fn pick_any_row(&self, candidates: &[BattleRow]) -> BattleRow {
        let head = candidates[0];
        if self.count_in_row(head) <= u32::from(self.split_threshold) {
            return head;
        }
        // min_by_key keeps the first minimum, so priority order breaks ties
        candidates
            .iter()
            .copied()
            .min_by_key(|&row| self.count_in_row(row))
            .unwrap_or(head)
    }

    /// Center column first, then alternating outward: -1, +1, -2, +2, ...
    fn free_column(&self, row: BattleRow) -> Option<u8> {
        let center = self.width / 2;
        let is_free = |column: u8| !self.is_occupied(Seat::new(row, column));

        if is_free(center) {
            return Some(center);
        }
        for offset in 1..=center {
            if is_free(center - offset) {
                return Some(center - offset);
            }
            if center + offset >= self.width {
                break;
            }
            if is_free(center + offset) {
                return Some(center + offset);
            }
        }
        None
    }
}
