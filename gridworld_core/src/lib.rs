//! Empowerment-driven agents on a bounded square grid.
//!
//! The engine ([`action`], [`simulate`], [`empowerment`], [`policy`]) is pure
//! and stateless; [`environment`] and [`agent`] drive it over a world of moving
//! agents.
#![warn(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod action;
pub mod agent;
pub mod empowerment;
pub mod environment;
pub mod map;
pub mod policy;
pub mod simulate;

pub use action::{Action, ActionSequence, apply_action, default_sequences, enumerate_sequences};
pub use empowerment::{Empowerment, empowerment};
pub use map::GridBounds;
pub use policy::{Candidate, Decision, TieBreaker, choose_action, evaluate_candidates};
pub use simulate::{Obstacles, simulate_sequence, step};

/// Unique identifier for agents in the world.
pub type EntityId = usize;

/// A (row, column) coordinate.
///
/// Coordinates are signed so that a proposed move may land outside the grid;
/// see [`GridBounds::in_bounds`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    /// Row index, growing southwards.
    pub row: isize,
    /// Column index, growing eastwards.
    pub col: isize,
}

impl Position {
    /// Creates a position from its row and column.
    pub const fn new(row: isize, col: isize) -> Self {
        Position { row, col }
    }

    /// Rotates the position by 180 degrees inside a grid of the given size.
    pub fn rotated_180(self, bounds: GridBounds) -> Self {
        let last = bounds.size() as isize - 1;
        Position {
            row: last - self.row,
            col: last - self.col,
        }
    }
}

/// Displays the position 1-based as `RxC`.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.row + 1, self.col + 1)
    }
}

impl From<(isize, isize)> for Position {
    fn from((row, col): (isize, isize)) -> Self {
        Position { row, col }
    }
}
