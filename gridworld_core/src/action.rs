//! The action catalog and sequence enumeration.

use std::{fmt, sync::LazyLock};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Number of actions simulated when scoring a position.
pub const LOOKAHEAD_DEPTH: usize = 3;

/// A unit move on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// One row up.
    North,
    /// One row down.
    South,
    /// One column right.
    East,
    /// One column left.
    West,
}

/// An ordered list of actions executed one after the other.
pub type ActionSequence = Vec<Action>;

impl Action {
    /// The fixed action catalog.
    pub const ALL: [Action; 4] = [Action::North, Action::South, Action::East, Action::West];

    /// Returns the `(d_row, d_col)` displacement of this action.
    pub const fn delta(self) -> (isize, isize) {
        match self {
            Action::North => (-1, 0),
            Action::South => (1, 0),
            Action::East => (0, 1),
            Action::West => (0, -1),
        }
    }

    /// Returns the lowercase name used in narration, e.g. `north`.
    pub const fn name(self) -> &'static str {
        match self {
            Action::North => "north",
            Action::South => "south",
            Action::East => "east",
            Action::West => "west",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns `position` displaced by `action`, with no bounds checking.
#[inline]
pub fn apply_action(position: Position, action: Action) -> Position {
    let (d_row, d_col) = action.delta();
    Position::new(position.row + d_row, position.col + d_col)
}

/// Builds every sequence of length `depth` over `catalog` (the cartesian power).
///
/// Sequences are ordered lexicographically by catalog index, the first action
/// varying slowest. A depth of zero yields a single empty sequence.
///
/// # Panics
///
/// Panics if `catalog` is empty.
pub fn enumerate_sequences(catalog: &[Action], depth: usize) -> Vec<ActionSequence> {
    assert!(!catalog.is_empty(), "action catalog must not be empty");

    let mut sequences: Vec<ActionSequence> = vec![Vec::with_capacity(depth)];
    for _ in 0..depth {
        sequences = sequences
            .into_iter()
            .flat_map(|prefix| {
                catalog.iter().map(move |&action| {
                    let mut sequence = prefix.clone();
                    sequence.push(action);
                    sequence
                })
            })
            .collect();
    }
    sequences
}

static DEFAULT_SEQUENCES: LazyLock<Vec<ActionSequence>> =
    LazyLock::new(|| enumerate_sequences(&Action::ALL, LOOKAHEAD_DEPTH));

/// The shared table of all 64 depth-3 sequences over [`Action::ALL`].
pub fn default_sequences() -> &'static [ActionSequence] {
    &DEFAULT_SEQUENCES
}
