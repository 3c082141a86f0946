// Survival planner: last-resort search maximising short-term free space,
// plus the local-risk move used when even that fails

use log::debug;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::agent_state::AgentState;
use crate::config::{Config, SafetyConfig, SurvivalConfig};
use crate::safety::reachable_count;
use crate::search::{advance_body, reconstruct_path, Deadline, Path, PlanError, Projection};
use crate::types::{Coord, Direction};
use crate::world::WorldModel;

#[derive(Debug, Clone, Copy)]
struct Leaf {
    position: Coord,
    reachable: usize,
    tail_distance: i32,
}

#[derive(Debug, Clone)]
pub struct SurvivalPlanner {
    config: SurvivalConfig,
    safety: SafetyConfig,
}

impl SurvivalPlanner {
    pub fn new(config: &Config) -> Self {
        SurvivalPlanner {
            config: config.survival.clone(),
            safety: config.safety.clone(),
        }
    }

    /// Path to the leaf with the most reachable space, shrinking the depth until one exists
    pub fn get_path(
        &self,
        agent: &AgentState,
        world: &WorldModel,
        deadline: &Deadline,
    ) -> Result<Path, PlanError> {
        let cap = self.safety.threshold_for(agent.size()) + self.config.threshold_bonus;

        for depth in (1..=self.config.goal_depth.max(1)).rev() {
            match self.search(agent, world, depth, cap, deadline) {
                Ok(path) => return Ok(path),
                Err(PlanError::DeadlineExceeded) => return Err(PlanError::DeadlineExceeded),
                Err(_) => debug!("Survival: nothing safe at depth {}", depth),
            }
        }

        Err(PlanError::NoPath)
    }

    fn search(
        &self,
        agent: &AgentState,
        world: &WorldModel,
        goal_depth: usize,
        cap: usize,
        deadline: &Deadline,
    ) -> Result<Path, PlanError> {
        let mut projection = Projection::new(world, &agent.body);
        let tail = agent.tail().unwrap_or(agent.position);

        let mut queue = VecDeque::new();
        queue.push_back((agent.position, agent.heading, agent.body.clone(), 0usize));
        let mut visited: HashSet<Coord> = HashSet::new();
        visited.insert(agent.position);
        let mut came_from = HashMap::new();
        let mut leaves = Vec::new();

        while let Some((position, heading, body, depth)) = queue.pop_front() {
            deadline.check()?;

            if depth == goal_depth {
                let reachable = projection.reachable_with(&body, heading, Some(cap));
                // Only the head itself: the leaf is a dead end
                if reachable > 1 {
                    leaves.push(Leaf {
                        position,
                        reachable,
                        tail_distance: world.distance(position, tail),
                    });
                }
                continue;
            }

            for (next, dir) in world.neighbours(position, heading) {
                if visited.insert(next) {
                    came_from.insert(next, position);
                    queue.push_back((next, Some(dir), advance_body(next, &body), depth + 1));
                }
            }
        }

        leaves
            .iter()
            .max_by(|a, b| {
                a.reachable
                    .cmp(&b.reachable)
                    .then_with(|| b.tail_distance.cmp(&a.tail_distance))
            })
            .map(|leaf| {
                debug!(
                    "Survival: leaf {:?} keeps {} cells reachable",
                    leaf.position, leaf.reachable
                );
                reconstruct_path(&came_from, leaf.position)
            })
            .ok_or(PlanError::NoPath)
    }
}

/// Policy move when no planner produced a path: straight on if free, else the
/// free neighbour with the most room, else keep the heading
pub fn fallback_direction(agent: &AgentState, world: &WorldModel, probe_limit: usize) -> Direction {
    let options = world.neighbours(agent.position, agent.heading);

    if let Some(heading) = agent.heading {
        if options.iter().any(|&(_, dir)| dir == heading) {
            return heading;
        }
    }

    options
        .iter()
        .map(|&(next, dir)| (reachable_count(world, next, Some(dir), Some(probe_limit)), dir))
        .max_by_key(|&(reach, _)| reach)
        .map(|(_, dir)| dir)
        .or(agent.heading)
        .unwrap_or(Direction::North)
}
