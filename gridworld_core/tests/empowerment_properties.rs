use std::collections::HashSet;

use gridworld_core::{
    Action, GridBounds, Obstacles, Position, TieBreaker, choose_action, default_sequences,
    empowerment, evaluate_candidates, simulate_sequence,
};
use proptest::prelude::*;

/// Counts the cells reachable with exactly three wall-clamped moves by
/// expanding the frontier one step at a time.
fn oracle_outcomes(start: (isize, isize), size: isize, blocked: &HashSet<(isize, isize)>) -> usize {
    let moves = [(-1, 0), (1, 0), (0, 1), (0, -1)];
    let mut frontier = HashSet::from([start]);
    for _ in 0..3 {
        let mut next = HashSet::new();
        for &(row, col) in &frontier {
            for (d_row, d_col) in moves {
                let cell = (row + d_row, col + d_col);
                let inside = (0..size).contains(&cell.0) && (0..size).contains(&cell.1);
                if inside && !blocked.contains(&cell) {
                    next.insert(cell);
                } else {
                    next.insert((row, col));
                }
            }
        }
        frontier = next;
    }
    frontier.len()
}

struct Recording {
    offered: Vec<usize>,
    pick: usize,
}

impl TieBreaker for Recording {
    fn pick(&mut self, count: usize) -> usize {
        self.offered.push(count);
        self.pick.min(count - 1)
    }
}

fn cell(size: usize) -> impl Strategy<Value = (GridBounds, Position)> {
    (0..size as isize, 0..size as isize)
        .prop_map(move |(row, col)| (GridBounds::new(size), Position::new(row, col)))
}

fn grid_and_cell() -> impl Strategy<Value = (GridBounds, Position)> {
    (1usize..9).prop_flat_map(cell)
}

#[test]
fn open_centre_of_five_by_five_reaches_sixteen_cells() {
    let bounds = GridBounds::new(5);
    let centre = Position::new(2, 2);
    assert_eq!(oracle_outcomes((2, 2), 5, &HashSet::new()), 16);
    assert_eq!(empowerment(centre, bounds, &Obstacles::new()), 4.0);
}

#[test]
fn blocked_north_is_scored_from_the_start_cell() {
    let bounds = GridBounds::new(3);
    let start = Position::new(1, 1);
    let occupied = Obstacles::from([Position::new(0, 1)]);

    let candidates = evaluate_candidates(start, bounds, &occupied);
    let north = candidates
        .iter()
        .find(|candidate| candidate.action == Action::North)
        .unwrap();
    assert_eq!(north.target, Position::new(0, 1));
    assert_eq!(north.landing, start);
    assert_eq!(north.empowerment, empowerment(start, bounds, &occupied));
    assert_ne!(
        north.empowerment,
        empowerment(Position::new(0, 1), bounds, &occupied)
    );
}

#[test]
fn single_cell_grid_ties_all_actions() {
    let bounds = GridBounds::new(1);
    let only = Position::new(0, 0);
    let none = Obstacles::new();

    assert_eq!(empowerment(only, bounds, &none), 0.0);
    let candidates = evaluate_candidates(only, bounds, &none);
    assert!(candidates.iter().all(|c| c.landing == only && c.empowerment == 0.0));

    for pick in 0..4 {
        let mut tie_breaker = Recording { offered: Vec::new(), pick };
        let decision = choose_action(only, bounds, &none, &mut tie_breaker);
        assert_eq!(tie_breaker.offered, vec![4]);
        assert_eq!(decision.action, Action::ALL[pick]);
    }
}

#[test]
fn corners_are_weaker_than_the_centre() {
    for size in 5..10 {
        let bounds = GridBounds::new(size);
        let last = size as isize - 1;
        let centre = Position::new(last / 2, last / 2);
        let centre_score = empowerment(centre, bounds, &Obstacles::new());
        for corner in [(0, 0), (0, last), (last, 0), (last, last)] {
            let corner_score = empowerment(corner.into(), bounds, &Obstacles::new());
            assert!(
                corner_score < centre_score,
                "corner {corner:?} of {size}x{size} scored {corner_score}"
            );
        }
    }
}

#[test]
fn sequence_table_is_shared() {
    assert!(std::ptr::eq(default_sequences(), default_sequences()));
    assert_eq!(default_sequences().len(), 64);
}

proptest! {
    #[test]
    fn open_grid_matches_oracle((bounds, start) in grid_and_cell()) {
        let expected = oracle_outcomes(
            (start.row, start.col),
            bounds.size() as isize,
            &HashSet::new(),
        );
        let score = empowerment(start, bounds, &Obstacles::new());
        prop_assert_eq!(score, (expected as f64).log2());
        prop_assert!((0.0..=6.0).contains(&score));
    }

    #[test]
    fn obstructed_grid_matches_oracle(
        (bounds, start) in grid_and_cell(),
        raw in prop::collection::vec((0isize..9, 0isize..9), 0..12),
    ) {
        let occupied: Obstacles = raw
            .into_iter()
            .map(Position::from)
            .filter(|p| bounds.in_bounds(*p) && *p != start)
            .collect();
        let blocked: HashSet<(isize, isize)> = occupied.iter().map(|p| (p.row, p.col)).collect();
        let expected = oracle_outcomes((start.row, start.col), bounds.size() as isize, &blocked);
        prop_assert_eq!(empowerment(start, bounds, &occupied), (expected as f64).log2());
    }

    #[test]
    fn simulation_is_deterministic(
        (bounds, start) in grid_and_cell(),
        index in 0usize..64,
    ) {
        let sequence = &default_sequences()[index];
        let none = Obstacles::new();
        prop_assert_eq!(
            simulate_sequence(start, sequence, bounds, &none),
            simulate_sequence(start, sequence, bounds, &none)
        );
        prop_assert_eq!(
            empowerment(start, bounds, &none).to_bits(),
            empowerment(start, bounds, &none).to_bits()
        );
    }

    #[test]
    fn half_turn_symmetry((bounds, start) in grid_and_cell()) {
        let none = Obstacles::new();
        prop_assert_eq!(
            empowerment(start, bounds, &none),
            empowerment(start.rotated_180(bounds), bounds, &none)
        );
    }

    #[test]
    fn fully_surrounded_agent_still_chooses((bounds, start) in grid_and_cell(), pick in 0usize..4) {
        let occupied: Obstacles = Action::ALL
            .iter()
            .map(|&action| gridworld_core::apply_action(start, action))
            .filter(|p| bounds.in_bounds(*p))
            .collect();
        let candidates = evaluate_candidates(start, bounds, &occupied);
        prop_assert!(candidates.iter().all(|c| c.landing == start));

        let mut tie_breaker = Recording { offered: Vec::new(), pick };
        let decision = choose_action(start, bounds, &occupied, &mut tie_breaker);
        prop_assert_eq!(tie_breaker.offered.clone(), vec![4]);
        prop_assert_eq!(decision.action, Action::ALL[pick]);
        prop_assert_eq!(empowerment(start, bounds, &occupied), 0.0);
    }

    #[test]
    fn chosen_action_is_a_maximizer((bounds, start) in grid_and_cell(), pick in 0usize..4) {
        let none = Obstacles::new();
        let candidates = evaluate_candidates(start, bounds, &none);
        let best = candidates
            .iter()
            .map(|c| c.empowerment)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut tie_breaker = Recording { offered: Vec::new(), pick };
        let decision = choose_action(start, bounds, &none, &mut tie_breaker);
        let chosen = candidates.iter().find(|c| c.action == decision.action).unwrap();
        prop_assert_eq!(chosen.empowerment, best);
        prop_assert_eq!(decision.target, chosen.target);
    }
}
