//! Forward simulation of moves under wall and obstacle collision rules.

use std::collections::HashSet;

use crate::{GridBounds, Position, action::Action, action::apply_action};

/// Cells that block movement for the duration of one decision.
pub type Obstacles = HashSet<Position>;

/// Attempts a single move.
///
/// The agent stays at `position` when the proposed cell is outside `bounds`
/// or is a member of `occupied`; otherwise it lands on the proposed cell.
#[inline]
pub fn step(
    position: Position,
    action: Action,
    bounds: GridBounds,
    occupied: &Obstacles,
) -> Position {
    let proposed = apply_action(position, action);
    if !bounds.in_bounds(proposed) || occupied.contains(&proposed) {
        position
    } else {
        proposed
    }
}

/// Applies [`step`] for each action of `sequence` in order.
pub fn simulate_sequence(
    position: Position,
    sequence: &[Action],
    bounds: GridBounds,
    occupied: &Obstacles,
) -> Position {
    sequence
        .iter()
        .fold(position, |current, &action| step(current, action, bounds, occupied))
}
