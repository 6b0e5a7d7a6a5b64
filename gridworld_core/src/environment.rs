//! The world: agents, turn processing, placement, map loading and rendering.

use std::{collections::HashMap, fmt};

use rand::{Rng, seq::index};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    EntityId, GridBounds, Position,
    action::Action,
    agent::{Agent, AgentKind},
    empowerment::empowerment,
    map::{Grid, GridError},
    policy::TieBreaker,
    simulate::Obstacles,
};

/// Largest number of cells a randomly generated world may have.
pub const MAX_WORLD_CELLS: usize = 1 << 20;

/// Name given to the VIP agent.
pub const VIP_NAME: &str = "V";

/// Represents errors raised while building a world.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// The agent was placed off the grid.
    #[error(transparent)]
    Grid(#[from] GridError),
    /// Another agent already stands on the cell.
    #[error("Position {0} is already occupied by an agent")]
    Occupied(Position),
    /// A second VIP was added.
    #[error("The world already has a VIP agent")]
    DuplicateVip,
    /// The grid has fewer cells than agents to place.
    #[error("Cannot place {agents} agents on a grid with {cells} cells")]
    TooManyAgents {
        /// Agents requested, VIP included.
        agents: usize,
        /// Cells available.
        cells: usize,
    },
    /// The requested grid has no cells.
    #[error("Grid size must be positive")]
    ZeroSize,
    /// The requested grid exceeds [`MAX_WORLD_CELLS`].
    #[error("Grid size {size} exceeds the limit of {max_cells} cells")]
    TooLarge {
        /// The requested side length.
        size: usize,
        /// The cell limit.
        max_cells: usize,
    },
}

/// Represents the outcome of attempting a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The agent landed on its target.
    Moved,
    /// The target was off the grid.
    HitWall,
    /// Another agent held the target.
    Blocked,
    /// The agent did not try to move.
    Waited,
}

/// What one agent did during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveEvent {
    /// Name of the acting agent.
    pub agent: String,
    /// The attempted action, `None` when the agent waited.
    pub action: Option<Action>,
    /// The raw cell the action targeted.
    pub target: Position,
    /// Position before the move.
    pub from: Position,
    /// Position after the move.
    pub to: Position,
    /// How the attempt resolved.
    pub outcome: MoveOutcome,
}

impl MoveEvent {
    /// Returns the console narration for this event; agents that waited are silent.
    pub fn narration(&self) -> Option<String> {
        let action = self.action?;
        let line = match self.outcome {
            MoveOutcome::Moved => format!("{} moves {} to {}", self.agent, action, self.to),
            MoveOutcome::HitWall => format!(
                "{} tried to move {} to {} but hit a wall",
                self.agent, action, self.target
            ),
            MoveOutcome::Blocked => format!(
                "{} tried to move {} to {} but was blocked by another agent",
                self.agent, action, self.target
            ),
            MoveOutcome::Waited => return None,
        };
        Some(line)
    }
}

/// The VIP's empowerment right after it moved.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VipStatus {
    /// Where the VIP ended up.
    pub position: Position,
    /// Empowerment at that position.
    pub empowerment: f64,
}

impl fmt::Display for VipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "3-step empowerment for {} at {}: {:.2}",
            VIP_NAME, self.position, self.empowerment
        )
    }
}

/// Everything that happened during one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnReport {
    /// One-based turn number.
    pub turn: u64,
    /// One event per agent, in turn order.
    pub events: Vec<MoveEvent>,
    /// The VIP's status after its move, if the world has a VIP.
    pub vip: Option<VipStatus>,
}

impl TurnReport {
    /// Returns the narration lines of the turn in the order they happened.
    pub fn narration(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for event in &self.events {
            lines.extend(event.narration());
            if event.agent == VIP_NAME {
                if let Some(status) = &self.vip {
                    lines.push(status.to_string());
                }
            }
        }
        lines
    }
}

/// Holds the state of an agent within the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    /// Unique id within the world.
    pub id: EntityId,
    /// Display name: `V` or `A<n>`.
    pub name: String,
    /// Behaviour class.
    pub kind: AgentKind,
    /// Current cell.
    pub position: Position,
}

/// Provides a read-only view of the environment relevant to an agent.
#[derive(Debug)]
pub struct EnvironmentView<'a> {
    /// The acting agent.
    pub agent_state: &'a AgentState,
    /// The acting agent's current cell.
    pub location: Position,
    /// Bounds of the grid.
    pub bounds: GridBounds,
    /// Cells held by every other agent.
    pub occupied: &'a Obstacles,
    /// The VIP's current cell, if the world has a VIP.
    pub vip: Option<Position>,
}

/// Manages the simulation environment.
pub struct Environment {
    bounds: GridBounds,
    agent_locations: Grid<Option<EntityId>>,
    /// Agents in turn order.
    agents: Vec<AgentState>,
    agent_behaviors: HashMap<EntityId, Box<dyn Agent>>,
    vip: Option<EntityId>,
    next_entity_id: EntityId,
    turn: u64,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("bounds", &self.bounds)
            .field("agents", &self.agents)
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}

impl Environment {
    /// Creates a new, empty environment.
    pub fn new(bounds: GridBounds) -> Self {
        Environment {
            bounds,
            agent_locations: Grid::new(bounds),
            agents: Vec::new(),
            agent_behaviors: HashMap::new(),
            vip: None,
            next_entity_id: 0,
            turn: 0,
        }
    }

    /// Creates a world with one VIP and `obstacles` agents of `obstacle_kind`,
    /// all on distinct random cells.
    ///
    /// # Arguments
    ///
    /// * `size`: The side length of the grid.
    /// * `obstacles`: The number of non-VIP agents to place.
    /// * `obstacle_kind`: The behaviour given to every non-VIP agent.
    /// * `rng`: The source of randomness for placement.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::ZeroSize`] for an empty grid,
    /// [`WorldError::TooLarge`] when the grid would exceed [`MAX_WORLD_CELLS`],
    /// and [`WorldError::TooManyAgents`] when the agents do not fit.
    pub fn random<R: Rng + ?Sized>(
        size: usize,
        obstacles: usize,
        obstacle_kind: AgentKind,
        rng: &mut R,
    ) -> Result<Self, WorldError> {
        if size == 0 {
            return Err(WorldError::ZeroSize);
        }
        match size.checked_mul(size) {
            Some(cells) if cells <= MAX_WORLD_CELLS => {}
            _ => {
                return Err(WorldError::TooLarge {
                    size,
                    max_cells: MAX_WORLD_CELLS,
                });
            }
        }
        let bounds = GridBounds::new(size);
        let agents = obstacles.saturating_add(1);
        if agents > bounds.cell_count() {
            return Err(WorldError::TooManyAgents {
                agents,
                cells: bounds.cell_count(),
            });
        }

        let mut environment = Environment::new(bounds);
        let mut cells = index::sample(rng, bounds.cell_count(), agents)
            .into_iter()
            .filter_map(|index| bounds.index_to_position(index));
        if let Some(position) = cells.next() {
            environment.add_agent(position, AgentKind::Vip.behavior())?;
        }
        for position in cells {
            environment.add_agent(position, obstacle_kind.behavior())?;
        }
        Ok(environment)
    }

    /// Adds an agent; the VIP is named `V`, every other agent `A<n>`.
    pub fn add_agent(
        &mut self,
        position: Position,
        behavior: Box<dyn Agent>,
    ) -> Result<EntityId, WorldError> {
        let kind = behavior.kind();
        match self.agent_locations.get(position) {
            None => {
                return Err(GridError::OutOfBounds {
                    position,
                    size: self.bounds.size(),
                }
                .into());
            }
            Some(Some(_)) => return Err(WorldError::Occupied(position)),
            Some(None) => {}
        }
        if kind == AgentKind::Vip && self.vip.is_some() {
            return Err(WorldError::DuplicateVip);
        }

        let id = self.next_entity_id;
        self.next_entity_id += 1;
        let name = if kind == AgentKind::Vip {
            self.vip = Some(id);
            VIP_NAME.to_string()
        } else {
            let obstacles = self.agents.iter().filter(|a| a.kind != AgentKind::Vip).count();
            format!("A{}", obstacles + 1)
        };

        self.agent_locations.set(position, Some(id))?;
        let state = AgentState {
            id,
            name,
            kind,
            position,
        };
        // The VIP always acts first.
        if kind == AgentKind::Vip {
            self.agents.insert(0, state);
        } else {
            self.agents.push(state);
        }
        self.agent_behaviors.insert(id, behavior);
        Ok(id)
    }

    /// Processes one turn: every agent acts once, in order, seeing the moves
    /// already made this turn.
    pub fn process_turn(&mut self, tie_breaker: &mut dyn TieBreaker) -> TurnReport {
        self.turn += 1;
        let mut report = TurnReport {
            turn: self.turn,
            events: Vec::with_capacity(self.agents.len()),
            vip: None,
        };

        for index in 0..self.agents.len() {
            let event = self.process_agent(index, tie_breaker);
            if self.agents[index].kind == AgentKind::Vip {
                let occupied = self.occupied_except(self.agents[index].id);
                report.vip = Some(VipStatus {
                    position: event.to,
                    empowerment: empowerment(event.to, self.bounds, &occupied),
                });
            }
            report.events.push(event);
        }
        report
    }

    fn process_agent(&mut self, index: usize, tie_breaker: &mut dyn TieBreaker) -> MoveEvent {
        let state = self.agents[index].clone();
        let occupied = self.occupied_except(state.id);
        let vip = self.vip_position();

        let decision = match self.agent_behaviors.get_mut(&state.id) {
            Some(behavior) => {
                let view = EnvironmentView {
                    agent_state: &state,
                    location: state.position,
                    bounds: self.bounds,
                    occupied: &occupied,
                    vip,
                };
                behavior.get_action(&view, tie_breaker)
            }
            None => None,
        };

        let Some(decision) = decision else {
            return MoveEvent {
                agent: state.name,
                action: None,
                target: state.position,
                from: state.position,
                to: state.position,
                outcome: MoveOutcome::Waited,
            };
        };

        let outcome = if !self.bounds.in_bounds(decision.target) {
            MoveOutcome::HitWall
        } else if occupied.contains(&decision.target) {
            MoveOutcome::Blocked
        } else {
            MoveOutcome::Moved
        };
        let to = if outcome == MoveOutcome::Moved {
            self.agent_locations[state.position] = None;
            self.agent_locations[decision.target] = Some(state.id);
            self.agents[index].position = decision.target;
            decision.target
        } else {
            state.position
        };
        trace!(agent = %state.name, action = %decision.action, ?outcome, %to, "Processed move");

        MoveEvent {
            agent: state.name,
            action: Some(decision.action),
            target: decision.target,
            from: state.position,
            to,
            outcome,
        }
    }

    /// Returns the cells held by every agent other than `id`.
    pub fn occupied_except(&self, id: EntityId) -> Obstacles {
        self.agents
            .iter()
            .filter(|agent| agent.id != id)
            .map(|agent| agent.position)
            .collect()
    }

    /// Returns the bounds of the grid.
    pub fn bounds(&self) -> GridBounds {
        self.bounds
    }

    /// Returns the number of turns processed so far.
    pub fn turn(&self) -> u64 {
        self.turn
    }

    /// Returns every agent in turn order, VIP first.
    pub fn agents(&self) -> &[AgentState] {
        &self.agents
    }

    /// Returns the grid mapping each cell to the agent standing on it.
    pub fn agent_locations(&self) -> &Grid<Option<EntityId>> {
        &self.agent_locations
    }

    /// Looks up an agent by id.
    pub fn get_agent_state(&self, id: EntityId) -> Option<&AgentState> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    /// Returns the VIP's state, if the world has one.
    pub fn vip(&self) -> Option<&AgentState> {
        self.vip.and_then(|id| self.get_agent_state(id))
    }

    /// Returns the VIP's current position, if the world has one.
    pub fn vip_position(&self) -> Option<Position> {
        self.vip().map(|vip| vip.position)
    }

    /// The VIP's current empowerment with every other agent as an obstacle.
    pub fn vip_empowerment(&self) -> Option<f64> {
        let vip = self.vip()?;
        let occupied = self.occupied_except(vip.id);
        Some(empowerment(vip.position, self.bounds, &occupied))
    }

    /// Width of one rendered cell: the longest agent name, at least two columns.
    pub fn cell_width(&self) -> usize {
        self.agents
            .iter()
            .map(|agent| agent.name.chars().count())
            .fold(2, usize::max)
    }

    /// Renders the grid as `[V |A1|  ]` rows, one per line, with every cell
    /// padded to [`Environment::cell_width`].
    pub fn render_text(&self) -> String {
        let width = self.cell_width();
        let mut out = String::new();
        for row in self.agent_locations.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| {
                    let name = cell
                        .and_then(|id| self.get_agent_state(id))
                        .map_or("", |agent| agent.name.as_str());
                    format!("{name:<width$}")
                })
                .collect();
            out.push('[');
            out.push_str(&cells.join("|"));
            out.push_str("]\n");
        }
        out
    }
}

/// Represents errors raised while parsing a map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// The map has no rows.
    #[error("Map string is empty")]
    Empty,
    /// A row's width differs from the first row's.
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    Ragged {
        /// Zero-based row index.
        row: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },
    /// Width and height differ.
    #[error("Map must be square, found {width} columns and {height} rows")]
    NotSquare {
        /// Number of columns.
        width: usize,
        /// Number of rows.
        height: usize,
    },
    /// A cell holds an unrecognised code.
    #[error("Unknown map code '{token}' at row {row}, column {col}")]
    UnknownToken {
        /// The offending code.
        token: String,
        /// Zero-based row index.
        row: usize,
        /// Zero-based column index.
        col: usize,
    },
    /// The map places no VIP.
    #[error("No VIP ('V') found in map")]
    MissingVip,
    /// Placing an agent failed.
    #[error(transparent)]
    World(#[from] WorldError),
}

/// Loads an environment from whitespace-separated map codes.
///
/// `.` is an empty cell, `V` the VIP, `A` a static obstacle agent and `X` an
/// antagonist. The map must be square and contain exactly one VIP.
pub fn load_environment_from_string(map_string: &str) -> Result<Environment, MapError> {
    let rows: Vec<Vec<&str>> = map_string
        .trim()
        .lines()
        .map(|line| line.split_whitespace().collect())
        .collect();
    let width = rows.first().map_or(0, Vec::len);
    if width == 0 {
        return Err(MapError::Empty);
    }
    for (row, tokens) in rows.iter().enumerate() {
        if tokens.len() != width {
            return Err(MapError::Ragged {
                row,
                expected: width,
                found: tokens.len(),
            });
        }
    }
    if rows.len() != width {
        return Err(MapError::NotSquare {
            width,
            height: rows.len(),
        });
    }

    let mut environment = Environment::new(GridBounds::new(width));
    for (row, tokens) in rows.iter().enumerate() {
        for (col, token) in tokens.iter().enumerate() {
            let kind = match *token {
                "." => continue,
                "V" => AgentKind::Vip,
                "A" => AgentKind::Static,
                "X" => AgentKind::Antagonist,
                unknown => {
                    return Err(MapError::UnknownToken {
                        token: unknown.to_string(),
                        row,
                        col,
                    });
                }
            };
            let position = Position::new(row as isize, col as isize);
            environment.add_agent(position, kind.behavior())?;
        }
    }

    if environment.vip.is_none() {
        return Err(MapError::MissingVip);
    }
    Ok(environment)
}
