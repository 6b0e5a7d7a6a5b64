//! Greedy empowerment-maximizing action selection.

use rand::{Rng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    GridBounds, Position,
    action::{Action, apply_action},
    empowerment::Empowerment,
    simulate::{Obstacles, step},
};

/// Picks one of several equally good options.
pub trait TieBreaker {
    /// Returns an index in `0..count`. `count` is never zero.
    fn pick(&mut self, count: usize) -> usize;
}

impl TieBreaker for StdRng {
    fn pick(&mut self, count: usize) -> usize {
        self.random_range(0..count)
    }
}

/// The action chosen for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// The action to attempt.
    pub action: Action,
    /// The raw cell the action targets; may be off-grid or occupied.
    pub target: Position,
}

/// One scored option considered by the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// The action being scored.
    pub action: Action,
    /// The raw cell the action targets.
    pub target: Position,
    /// Where the agent would actually end up after collisions.
    pub landing: Position,
    /// Empowerment measured from `landing`.
    pub empowerment: f64,
}

impl Candidate {
    /// Returns the decision that commits to this candidate.
    pub fn decision(&self) -> Decision {
        Decision {
            action: self.action,
            target: self.target,
        }
    }
}

impl Empowerment {
    /// Scores every catalog action by the empowerment of its landing cell.
    pub fn evaluate_candidates(
        &self,
        position: Position,
        bounds: GridBounds,
        occupied: &Obstacles,
    ) -> Vec<Candidate> {
        self.catalog()
            .iter()
            .map(|&action| {
                let landing = step(position, action, bounds, occupied);
                Candidate {
                    action,
                    target: apply_action(position, action),
                    landing,
                    empowerment: self.score(landing, bounds, occupied),
                }
            })
            .collect()
    }

    /// Chooses uniformly among the actions whose landing cell has maximal empowerment.
    pub fn choose_action(
        &self,
        position: Position,
        bounds: GridBounds,
        occupied: &Obstacles,
        tie_breaker: &mut dyn TieBreaker,
    ) -> Decision {
        let candidates = self.evaluate_candidates(position, bounds, occupied);
        let best = best_candidates(&candidates, f64::gt);
        let index = tie_breaker.pick(best.len());
        let chosen = best[index];
        debug!(
            %position,
            action = %chosen.action,
            empowerment = chosen.empowerment,
            ties = best.len(),
            "Chose empowerment-maximizing action"
        );
        chosen.decision()
    }
}

/// Keeps every candidate whose score is not beaten under `better`.
///
/// Scores are compared exactly; equal scores are ties.
pub(crate) fn best_candidates(
    candidates: &[Candidate],
    better: fn(&f64, &f64) -> bool,
) -> Vec<Candidate> {
    let mut best: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        match best.first() {
            Some(leader) if better(&leader.empowerment, &candidate.empowerment) => {}
            Some(leader) if leader.empowerment == candidate.empowerment => best.push(*candidate),
            _ => best = vec![*candidate],
        }
    }
    assert!(!best.is_empty(), "no candidate actions to choose from");
    best
}

/// Scores each of the four cardinal actions with the default scorer.
pub fn evaluate_candidates(
    position: Position,
    bounds: GridBounds,
    occupied: &Obstacles,
) -> Vec<Candidate> {
    Empowerment::default().evaluate_candidates(position, bounds, occupied)
}

/// Chooses the VIP's next action with the default scorer.
pub fn choose_action(
    position: Position,
    bounds: GridBounds,
    occupied: &Obstacles,
    tie_breaker: &mut dyn TieBreaker,
) -> Decision {
    Empowerment::default().choose_action(position, bounds, occupied, tie_breaker)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    /// Always picks the same index.
    struct Fixed(usize);

    impl TieBreaker for Fixed {
        fn pick(&mut self, count: usize) -> usize {
            assert!(self.0 < count);
            self.0
        }
    }

    #[test]
    fn corner_prefers_leaving_the_walls() {
        let bounds = GridBounds::new(5);
        let decision = choose_action(Position::new(0, 0), bounds, &Obstacles::new(), &mut Fixed(0));
        assert!(matches!(decision.action, Action::South | Action::East));
    }

    #[test]
    fn ties_are_kept_in_catalog_order() {
        let bounds = GridBounds::new(7);
        let centre = Position::new(3, 3);
        let none = Obstacles::new();
        let picks: Vec<Action> = (0..4)
            .map(|index| choose_action(centre, bounds, &none, &mut Fixed(index)).action)
            .collect();
        assert_eq!(picks, Action::ALL.to_vec());
    }

    #[test]
    fn decision_reports_raw_target() {
        let bounds = GridBounds::new(1);
        let origin = Position::new(0, 0);
        let decision = choose_action(origin, bounds, &Obstacles::new(), &mut Fixed(0));
        assert_eq!(decision.action, Action::North);
        assert_eq!(decision.target, Position::new(-1, 0));
    }

    #[test]
    fn minimizing_keeps_lowest_scores() {
        let candidates: Vec<Candidate> = [2.0, 1.0, 3.0, 1.0]
            .into_iter()
            .zip(Action::ALL)
            .map(|(empowerment, action)| Candidate {
                action,
                target: Position::new(0, 0),
                landing: Position::new(0, 0),
                empowerment,
            })
            .collect();
        let lowest: Vec<Action> = best_candidates(&candidates, f64::lt)
            .iter()
            .map(|c| c.action)
            .collect();
        assert_eq!(lowest, vec![Action::South, Action::West]);
        let highest = best_candidates(&candidates, f64::gt);
        assert_eq!(highest.len(), 1);
        assert_eq!(highest[0].action, Action::East);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let bounds = GridBounds::new(9);
        let centre = Position::new(4, 4);
        let none = Obstacles::new();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..8)
                .map(|_| choose_action(centre, bounds, &none, &mut rng).action)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(42), run(42));
    }
}
