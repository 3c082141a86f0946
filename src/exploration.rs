// Exploration planner: cost-ordered frontier search for stale or never-seen
// cells, ranking a handful of nearby candidates by how stale their
// surroundings are

use log::debug;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::agent_state::AgentState;
use crate::config::{Config, ExplorationConfig, SafetyConfig};
use crate::search::{project_body, reconstruct_path, Deadline, Node, Path, PlanError, Projection};
use crate::tile::TileState;
use crate::types::Coord;
use crate::world::WorldModel;

/// A confirmed exploration goal
#[derive(Debug, Clone)]
pub struct Candidate {
    pub position: Coord,
    pub cost: f64,
    pub path: Path,
}

#[derive(Debug, Clone)]
pub struct ExplorationPlanner {
    config: ExplorationConfig,
    safety: SafetyConfig,
}

impl ExplorationPlanner {
    pub fn new(config: &Config) -> Self {
        ExplorationPlanner {
            config: config.exploration.clone(),
            safety: config.safety.clone(),
        }
    }

    /// Staleness a tile contributes; `None` when it is not an exploration target.
    /// Never-seen passage counts as exactly stale.
    fn staleness(&self, tile: TileState) -> Option<f64> {
        match tile {
            TileState::Visited { age, .. } if age >= self.config.stale_age => Some(age),
            TileState::Passage => Some(self.config.stale_age),
            _ => None,
        }
    }

    pub fn get_path(
        &self,
        agent: &AgentState,
        world: &WorldModel,
        deadline: &Deadline,
    ) -> Result<Path, PlanError> {
        let candidates = self.collect_candidates(agent, world, deadline)?;
        match self.select_best(&candidates, world, agent.range) {
            Some(best) => {
                debug!(
                    "Exploration: goal {:?} (cost {:.1}) out of {} candidates",
                    best.position,
                    best.cost,
                    candidates.len()
                );
                Ok(best.path.clone())
            }
            None => Err(PlanError::NoPath),
        }
    }

    /// Expands in cost order until the candidate quota or the depth cutoff is hit
    pub fn collect_candidates(
        &self,
        agent: &AgentState,
        world: &WorldModel,
        deadline: &Deadline,
    ) -> Result<Vec<Candidate>, PlanError> {
        let threshold = self.safety.threshold_for(agent.size());
        let mut projection = Projection::new(world, &agent.body);

        let mut open = BinaryHeap::new();
        let mut settled = HashSet::new();
        let mut came_from = HashMap::new();
        let mut costs = HashMap::new();
        let mut candidates = Vec::new();
        let mut first_goal_depth: Option<usize> = None;
        let mut seq = 0u64;

        costs.insert(agent.position, 0.0);
        open.push(Node {
            priority: 0.0,
            cost: 0.0,
            position: agent.position,
            heading: agent.heading,
            depth: 0,
            seq,
        });

        while let Some(current) = open.pop() {
            deadline.check()?;

            if !settled.insert(current.position) {
                continue;
            }

            if let Some(first) = first_goal_depth {
                if current.depth > first + self.config.depth_slack
                    || candidates.len() >= self.config.max_candidates
                {
                    break;
                }
            }

            if current.position != agent.position && self.staleness(world.tile(current.position)).is_some() {
                let path = reconstruct_path(&came_from, current.position);
                let body = project_body(&agent.body, &path);
                if projection.is_safe(&body, current.heading, threshold) {
                    first_goal_depth.get_or_insert(current.depth);
                    candidates.push(Candidate {
                        position: current.position,
                        cost: current.cost,
                        path,
                    });
                }
            }

            for (next, dir) in world.neighbours(current.position, current.heading) {
                if settled.contains(&next) {
                    continue;
                }
                let new_cost = current.cost + self.config.costs.cost(world.tile(next), agent.eat_super_food);
                if costs.get(&next).map_or(true, |&known| new_cost < known) {
                    costs.insert(next, new_cost);
                    came_from.insert(next, current.position);
                    seq += 1;
                    open.push(Node {
                        priority: new_cost,
                        cost: new_cost,
                        position: next,
                        heading: Some(dir),
                        depth: current.depth + 1,
                        seq,
                    });
                }
            }
        }

        Ok(candidates)
    }

    /// Candidate minimising `path cost - staleness of the surrounding zone`
    pub fn select_best<'c>(
        &self,
        candidates: &'c [Candidate],
        world: &WorldModel,
        range: u32,
    ) -> Option<&'c Candidate> {
        let mut best: Option<(&Candidate, f64)> = None;
        for candidate in candidates {
            let zone_age: f64 = world
                .zone(candidate.position, range)
                .into_iter()
                .filter_map(|(_, tile)| match tile {
                    TileState::Visited { age, .. } => Some(age),
                    TileState::Passage => Some(self.config.stale_age),
                    _ => None,
                })
                .sum();
            let value = candidate.cost - zone_age;
            if best.map_or(true, |(_, v)| value < v) {
                best = Some((candidate, value));
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}
