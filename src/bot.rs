// Per-step agent loop
//
// Each observation runs to completion: update the world model and agent
// state, let the mode controller decide whether the cached path survives,
// plan along the fallback chain when it does not, and turn the first queued
// position into a move.

use log::{debug, info, warn};
use std::time::Instant;
use thiserror::Error;

use crate::agent_state::AgentState;
use crate::config::Config;
use crate::eating::FoodPlanner;
use crate::exploration::ExplorationPlanner;
use crate::mode::{Mode, ModeController};
use crate::search::{Deadline, Path, PlanError};
use crate::survival::{fallback_direction, SurvivalPlanner};
use crate::tile::TileError;
use crate::types::{Coord, Direction, GameInfo, StepState};
use crate::world::{parse_sight, WorldModel};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentError {
    #[error(transparent)]
    Tile(#[from] TileError),
    #[error("step received before the initial map")]
    NotStarted,
    #[error("observation carries an empty body")]
    EmptyBody,
}

/// Outcome of one step, for logging and replay
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub direction: Direction,
    /// Mode selected by the controller
    pub mode: Mode,
    /// Planner that produced the path being followed; `None` for the degraded move
    pub planner: Option<Mode>,
    /// Positions still queued after this move
    pub remaining_path: usize,
    pub replanned: bool,
    pub elapsed_us: u128,
}

/// Everything that lives from the initial map to the end of the session
struct Session {
    world: WorldModel,
    agent: Option<AgentState>,
    previous_body: Vec<Coord>,
}

struct Planners {
    food: FoodPlanner,
    exploration: ExplorationPlanner,
    survival: SurvivalPlanner,
}

impl Planners {
    fn plan(
        &self,
        mode: Mode,
        agent: &AgentState,
        world: &WorldModel,
        deadline: &Deadline,
    ) -> Result<Path, PlanError> {
        match mode {
            Mode::Eating => self.food.get_path(agent, world, deadline),
            Mode::Exploration => self.exploration.get_path(agent, world, deadline),
            Mode::Survival => self.survival.get_path(agent, world, deadline),
        }
    }
}

pub struct Bot {
    config: Config,
    controller: ModeController,
    planners: Planners,
    session: Option<Session>,
    /// Planner behind the cached path
    planner: Option<Mode>,
}

impl Bot {
    /// Creates a new Bot instance with the given configuration
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    pub fn new(config: Config) -> Self {
        Bot {
            controller: ModeController::new(config.mode.clone()),
            planners: Planners {
                food: FoodPlanner::new(&config),
                exploration: ExplorationPlanner::new(&config),
                survival: SurvivalPlanner::new(&config),
            },
            config,
            session: None,
            planner: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn world(&self) -> Option<&WorldModel> {
        self.session.as_ref().map(|s| &s.world)
    }

    pub fn agent(&self) -> Option<&AgentState> {
        self.session.as_ref().and_then(|s| s.agent.as_ref())
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    /// Builds the world model from the session-start map, discarding any previous session
    pub fn start(&mut self, game: &GameInfo) -> Result<(), AgentError> {
        let world = WorldModel::new(game.size, &game.map, self.config.aging.clone())?;
        info!(
            "GAME START: {}x{} grid, {} stones, {} food",
            game.size.0,
            game.size.1,
            world.stones().len(),
            world.food().len()
        );
        self.controller = ModeController::new(self.config.mode.clone());
        self.planner = None;
        self.session = Some(Session {
            world,
            agent: None,
            previous_body: Vec::new(),
        });
        Ok(())
    }

    /// Computes the move for one observation
    pub fn get_move(&mut self, state: &StepState) -> Result<Direction, AgentError> {
        self.decide(state, Instant::now()).map(|d| d.direction)
    }

    /// Like `get_move`, with the deadline measured from `started`
    pub fn decide(&mut self, state: &StepState, started: Instant) -> Result<Decision, AgentError> {
        let deadline = Deadline::after(started, self.config.timing.search_budget());

        // Decode before touching any state so a bad tile aborts the step cleanly
        let sight = parse_sight(&state.sight)?;
        let head = *state.body.first().ok_or(AgentError::EmptyBody)?;
        let session = self.session.as_mut().ok_or(AgentError::NotStarted)?;

        session.world.update(
            head,
            &session.previous_body,
            &state.body,
            &sight,
            state.traverse,
            state.step,
        );
        if session.world.ate_super_food() {
            self.controller.record_super_food();
            info!(
                "Step {}: ate super food ({} so far)",
                state.step,
                self.controller.super_food_eaten()
            );
        }

        let grid_size = session.world.size();
        let agent = session
            .agent
            .get_or_insert_with(|| AgentState::new(state.body.clone(), state.range));
        agent.update(state.body.clone(), sight, state.range, grid_size);
        agent.eat_super_food = self
            .controller
            .super_food_intent(state.step, state.range, state.traverse);

        let world = &session.world;
        if self.controller.begin_step(agent, world).is_some() {
            self.planner = None;
        }

        let mut replanned = false;
        if !self.controller.has_path() {
            replanned = true;
            self.planner = None;
            for &mode in self.controller.mode().fallback_chain() {
                match self.planners.plan(mode, agent, world, &deadline) {
                    Ok(path) if !path.is_empty() => {
                        debug!("Step {}: {} planner found {} steps", state.step, mode.as_str(), path.len());
                        self.controller.set_path(path, mode, world);
                        self.planner = Some(mode);
                        break;
                    }
                    Ok(_) => debug!("Step {}: {} planner returned an empty path", state.step, mode.as_str()),
                    Err(e) => debug!("Step {}: {} planner failed: {}", state.step, mode.as_str(), e),
                }
            }
        }

        let planned = self
            .controller
            .next_step()
            .and_then(|next| Direction::between(agent.position, next, grid_size.0, grid_size.1));
        let direction = match planned {
            Some(direction) => direction,
            None => {
                warn!(
                    "Step {}: no planner produced a path, falling back to local risk",
                    state.step
                );
                self.controller.clear_path();
                self.planner = None;
                fallback_direction(agent, world, self.config.safety.probe_limit)
            }
        };

        // Degraded local-risk moves count as survival
        agent.mode = self.planner.unwrap_or(Mode::Survival);
        session.previous_body = state.body.clone();

        let decision = Decision {
            direction,
            mode: self.controller.mode(),
            planner: self.planner,
            remaining_path: self.controller.path().len(),
            replanned,
            elapsed_us: started.elapsed().as_micros(),
        };

        info!(
            "Step {}: Chose {} (mode: {}, planner: {}, queued: {}, time: {}us)",
            state.step,
            direction.as_str(),
            decision.mode.as_str(),
            decision.planner.map_or("fallback", |m| m.as_str()),
            decision.remaining_path,
            decision.elapsed_us
        );

        Ok(decision)
    }

    /// Called when the server closes the session
    pub fn end(&mut self) {
        info!(
            "GAME OVER (super food eaten: {})",
            self.controller.super_food_eaten()
        );
        self.session = None;
    }
}
