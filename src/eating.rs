// Food planner: A* toward the most promising food or super-food,
// accepting a goal only if the projected body still has room to move

use log::debug;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::agent_state::AgentState;
use crate::config::{Config, EatingConfig, SafetyConfig, TileCosts};
use crate::search::{project_body, reconstruct_path, Deadline, Node, Path, PlanError, Projection};
use crate::types::Coord;
use crate::world::WorldModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodKind {
    Food,
    SuperFood,
}

#[derive(Debug, Clone)]
pub struct FoodPlanner {
    config: EatingConfig,
    safety: SafetyConfig,
}

impl FoodPlanner {
    pub fn new(config: &Config) -> Self {
        FoodPlanner {
            config: config.eating.clone(),
            safety: config.safety.clone(),
        }
    }

    /// Nearest food (and super-food when wanted) by wrap-aware Manhattan distance
    pub fn candidate_goals(&self, agent: &AgentState, world: &WorldModel) -> Vec<(Coord, FoodKind)> {
        let mut candidates: Vec<(i32, Coord, FoodKind)> = world
            .food()
            .iter()
            .map(|&pos| (world.distance(agent.position, pos), pos, FoodKind::Food))
            .collect();

        if agent.eat_super_food {
            candidates.extend(
                world
                    .super_food()
                    .iter()
                    .map(|&pos| (world.distance(agent.position, pos), pos, FoodKind::SuperFood)),
            );
        }

        candidates.sort_by_key(|&(distance, pos, _)| (distance, pos));
        candidates
            .into_iter()
            .take(self.config.max_candidates)
            .map(|(_, pos, kind)| (pos, kind))
            .collect()
    }

    /// Lowest-cost safe path to one of the candidate goals
    pub fn get_path(
        &self,
        agent: &AgentState,
        world: &WorldModel,
        deadline: &Deadline,
    ) -> Result<Path, PlanError> {
        let goals = self.candidate_goals(agent, world);
        if goals.is_empty() {
            return Err(PlanError::NoGoal);
        }

        let threshold = self.safety.threshold_for(agent.size());
        let mut projection = Projection::new(world, &agent.body);

        for (goal, kind) in goals {
            match self.search(agent, world, goal, kind, threshold, &mut projection, deadline) {
                Ok(path) => {
                    debug!("Eating: {:?} at {:?} reached in {} steps", kind, goal, path.len());
                    return Ok(path);
                }
                Err(e) => debug!("Eating: goal {:?} rejected ({})", goal, e),
            }
        }

        Err(PlanError::NoPath)
    }

    fn costs(&self, kind: FoodKind) -> &TileCosts {
        match kind {
            FoodKind::Food => &self.config.food_costs,
            FoodKind::SuperFood => &self.config.super_food_costs,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        agent: &AgentState,
        world: &WorldModel,
        goal: Coord,
        kind: FoodKind,
        threshold: usize,
        projection: &mut Projection,
        deadline: &Deadline,
    ) -> Result<Path, PlanError> {
        let costs = self.costs(kind);

        let mut open = BinaryHeap::new();
        let mut closed = HashSet::new();
        let mut came_from = HashMap::new();
        let mut g_costs = HashMap::new();
        let mut seq = 0u64;

        g_costs.insert(agent.position, 0.0);
        open.push(Node {
            priority: f64::from(world.distance(agent.position, goal)),
            cost: 0.0,
            position: agent.position,
            heading: agent.heading,
            depth: 0,
            seq,
        });

        while let Some(current) = open.pop() {
            deadline.check()?;

            if !closed.insert(current.position) {
                continue;
            }

            if current.position == goal {
                let path = reconstruct_path(&came_from, goal);
                let body = project_body(&agent.body, &path);
                return if projection.is_safe(&body, current.heading, threshold) {
                    Ok(path)
                } else {
                    Err(PlanError::NoPath)
                };
            }

            for (next, dir) in world.neighbours(current.position, current.heading) {
                if closed.contains(&next) {
                    continue;
                }
                let tentative = current.cost + costs.cost(world.tile(next), agent.eat_super_food);
                if g_costs.get(&next).map_or(true, |&known| tentative < known) {
                    g_costs.insert(next, tentative);
                    came_from.insert(next, current.position);
                    seq += 1;
                    open.push(Node {
                        priority: tentative + f64::from(world.distance(next, goal)),
                        cost: tentative,
                        position: next,
                        heading: Some(dir),
                        depth: current.depth + 1,
                        seq,
                    });
                }
            }
        }

        Err(PlanError::NoPath)
    }
}
