//! Agent behaviours: the VIP, static obstacles and antagonists.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Position,
    action::apply_action,
    empowerment::Empowerment,
    environment::EnvironmentView,
    policy::{Candidate, Decision, TieBreaker, best_candidates},
    simulate::step,
};

/// The behaviour class of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Moves to maximize its own empowerment.
    Vip,
    /// Never moves; acts purely as an obstacle.
    Static,
    /// Moves to minimize the VIP's empowerment.
    Antagonist,
}

impl AgentKind {
    /// Builds the default behaviour for this kind.
    pub fn behavior(self) -> Box<dyn Agent> {
        match self {
            AgentKind::Vip => Box::new(EmpowermentAgent::default()),
            AgentKind::Static => Box::new(StaticAgent),
            AgentKind::Antagonist => Box::new(AntagonistAgent::default()),
        }
    }
}

/// Trait defining the behavior of an agent.
/// Agents decide which action to take based on the EnvironmentView.
pub trait Agent {
    /// Returns the behaviour class, used for naming and turn order.
    fn kind(&self) -> AgentKind;

    /// Determines the move the agent wants to attempt, or `None` to stay put.
    ///
    /// The returned target is the raw cell; the environment applies the
    /// wall and obstacle rules when committing the move.
    fn get_action(
        &mut self,
        view: &EnvironmentView,
        tie_breaker: &mut dyn TieBreaker,
    ) -> Option<Decision>;
}

/// An agent that never moves.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticAgent;

impl Agent for StaticAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Static
    }

    fn get_action(&mut self, _view: &EnvironmentView, _: &mut dyn TieBreaker) -> Option<Decision> {
        None
    }
}

/// The VIP: greedily moves to the neighbouring cell with the highest empowerment,
/// treating every other agent as a static obstacle.
#[derive(Debug, Clone, Default)]
pub struct EmpowermentAgent {
    scorer: Empowerment,
}

impl EmpowermentAgent {
    /// Creates a VIP that scores moves with `scorer`.
    pub fn new(scorer: Empowerment) -> Self {
        Self { scorer }
    }
}

impl Agent for EmpowermentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Vip
    }

    fn get_action(
        &mut self,
        view: &EnvironmentView,
        tie_breaker: &mut dyn TieBreaker,
    ) -> Option<Decision> {
        Some(
            self.scorer
                .choose_action(view.location, view.bounds, view.occupied, tie_breaker),
        )
    }
}

/// An obstacle agent that moves to wherever it hurts the VIP's empowerment most.
#[derive(Debug, Clone, Default)]
pub struct AntagonistAgent {
    scorer: Empowerment,
}

impl AntagonistAgent {
    /// Creates an antagonist that scores the VIP with `scorer`.
    pub fn new(scorer: Empowerment) -> Self {
        Self { scorer }
    }

    /// Scores each action by the VIP's empowerment after this agent lands.
    fn vip_empowerment_after(&self, view: &EnvironmentView, vip: Position) -> Vec<Candidate> {
        let mut blockers = view.occupied.clone();
        blockers.remove(&vip);

        self.scorer
            .catalog()
            .iter()
            .map(|&action| {
                // The landing cell is never already in `blockers`.
                let landing = step(view.location, action, view.bounds, view.occupied);
                blockers.insert(landing);
                let empowerment = self.scorer.score(vip, view.bounds, &blockers);
                blockers.remove(&landing);
                Candidate {
                    action,
                    target: apply_action(view.location, action),
                    landing,
                    empowerment,
                }
            })
            .collect()
    }
}

impl Agent for AntagonistAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Antagonist
    }

    fn get_action(
        &mut self,
        view: &EnvironmentView,
        tie_breaker: &mut dyn TieBreaker,
    ) -> Option<Decision> {
        let vip = view.vip?;
        let candidates = self.vip_empowerment_after(view, vip);
        let best = best_candidates(&candidates, f64::lt);
        let chosen = best[tie_breaker.pick(best.len())];
        debug!(
            agent = %view.agent_state.name,
            action = %chosen.action,
            vip_empowerment = chosen.empowerment,
            "Antagonist chose action"
        );
        Some(chosen.decision())
    }
}

#[cfg(test)]
mod tests {
    use crate::{GridBounds, action::Action, environment::AgentState, simulate::Obstacles};

    use super::*;

    /// Records how many options it was offered and picks the last one.
    #[derive(Default)]
    struct Last {
        offered: Vec<usize>,
    }

    impl TieBreaker for Last {
        fn pick(&mut self, count: usize) -> usize {
            self.offered.push(count);
            count - 1
        }
    }

    fn state(kind: AgentKind, position: Position) -> AgentState {
        AgentState {
            id: 1,
            name: "A1".to_string(),
            kind,
            position,
        }
    }

    #[test]
    fn antagonist_squeezes_the_vip() {
        let me = state(AgentKind::Antagonist, Position::new(2, 2));
        let vip = Position::new(0, 0);
        let occupied = Obstacles::from([vip]);
        let view = EnvironmentView {
            agent_state: &me,
            location: me.position,
            bounds: GridBounds::new(3),
            occupied: &occupied,
            vip: Some(vip),
        };
        let mut tie_breaker = Last::default();
        let decision = AntagonistAgent::default()
            .get_action(&view, &mut tie_breaker)
            .unwrap();
        // Moving north or west cuts the VIP from 8 outcomes to 7.
        assert_eq!(tie_breaker.offered, vec![2]);
        assert_eq!(decision.action, Action::West);
        assert_eq!(decision.target, Position::new(2, 1));
    }

    #[test]
    fn antagonist_waits_without_a_vip() {
        let me = state(AgentKind::Antagonist, Position::new(0, 0));
        let occupied = Obstacles::new();
        let view = EnvironmentView {
            agent_state: &me,
            location: me.position,
            bounds: GridBounds::new(3),
            occupied: &occupied,
            vip: None,
        };
        assert_eq!(AntagonistAgent::default().get_action(&view, &mut Last::default()), None);
    }

    #[test]
    fn static_agent_never_moves() {
        let me = state(AgentKind::Static, Position::new(1, 1));
        let occupied = Obstacles::new();
        let view = EnvironmentView {
            agent_state: &me,
            location: me.position,
            bounds: GridBounds::new(3),
            occupied: &occupied,
            vip: Some(Position::new(0, 0)),
        };
        let mut tie_breaker = Last::default();
        assert_eq!(StaticAgent.get_action(&view, &mut tie_breaker), None);
        assert!(tie_breaker.offered.is_empty());
    }

    #[test]
    fn vip_uses_its_scorer_depth() {
        let me = state(AgentKind::Vip, Position::new(0, 0));
        let occupied = Obstacles::new();
        let view = EnvironmentView {
            agent_state: &me,
            location: me.position,
            bounds: GridBounds::new(5),
            occupied: &occupied,
            vip: Some(me.position),
        };
        let mut agent = EmpowermentAgent::new(Empowerment::new(&Action::ALL, 1));
        let mut tie_breaker = Last::default();
        let decision = agent.get_action(&view, &mut tie_breaker).unwrap();
        // South and east both reach four cells in one step; north and west only three.
        assert_eq!(tie_breaker.offered, vec![2]);
        assert_eq!(decision.action, Action::East);
    }
}
