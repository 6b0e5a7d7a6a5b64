//! Empowerment scoring: how many distinguishable outcomes an agent can
//! produce from a position with a fixed-length lookahead.

use std::{borrow::Cow, collections::HashSet};

use crate::{
    GridBounds, Position,
    action::{Action, ActionSequence, LOOKAHEAD_DEPTH, default_sequences, enumerate_sequences},
    simulate::{Obstacles, simulate_sequence},
};

/// An empowerment scorer over an action catalog and lookahead depth.
///
/// The default scorer uses the four cardinal moves with a depth of three and
/// shares the process-wide sequence table.
#[derive(Debug, Clone)]
pub struct Empowerment {
    catalog: Cow<'static, [Action]>,
    depth: usize,
    sequences: Cow<'static, [ActionSequence]>,
}

impl Default for Empowerment {
    fn default() -> Self {
        Empowerment {
            catalog: Cow::Borrowed(&Action::ALL),
            depth: LOOKAHEAD_DEPTH,
            sequences: Cow::Borrowed(default_sequences()),
        }
    }
}

impl Empowerment {
    /// Creates a scorer with its own sequence table.
    ///
    /// # Arguments
    ///
    /// * `catalog`: The actions available at every step.
    /// * `depth`: The number of steps simulated per sequence.
    ///
    /// # Panics
    ///
    /// Panics if `catalog` is empty.
    pub fn new(catalog: &[Action], depth: usize) -> Self {
        Empowerment {
            catalog: Cow::Owned(catalog.to_vec()),
            depth,
            sequences: Cow::Owned(enumerate_sequences(catalog, depth)),
        }
    }

    /// Returns the actions each sequence is built from.
    pub fn catalog(&self) -> &[Action] {
        &self.catalog
    }

    /// Returns the number of actions simulated per sequence.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns every sequence the scorer simulates, `catalog.len() ^ depth` in total.
    pub fn sequences(&self) -> &[ActionSequence] {
        &self.sequences
    }

    /// Returns the distinct end positions of every sequence run from `position`.
    pub fn reachable(
        &self,
        position: Position,
        bounds: GridBounds,
        occupied: &Obstacles,
    ) -> HashSet<Position> {
        self.sequences
            .iter()
            .map(|sequence| simulate_sequence(position, sequence, bounds, occupied))
            .collect()
    }

    /// Returns log2 of the number of distinct reachable positions.
    pub fn score(&self, position: Position, bounds: GridBounds, occupied: &Obstacles) -> f64 {
        let outcomes = self.reachable(position, bounds, occupied).len();
        if outcomes == 0 {
            0.0
        } else {
            (outcomes as f64).log2()
        }
    }
}

/// Scores `position` with the default four-action, depth-three lookahead.
pub fn empowerment(position: Position, bounds: GridBounds, occupied: &Obstacles) -> f64 {
    Empowerment::default().score(position, bounds, occupied)
}
