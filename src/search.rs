// Plumbing shared by the planners: deadline, frontier ordering, path
// reconstruction, body projection and tile costs

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::TileCosts;
use crate::safety::reachable_count;
use crate::tile::TileState;
use crate::types::{Coord, Direction};
use crate::world::WorldModel;

/// Planned moves, excluding the starting head position
pub type Path = VecDeque<Coord>;

/// Recoverable planner outcomes; each one moves the agent down the fallback chain
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum PlanError {
    #[error("no goal available")]
    NoGoal,
    #[error("no path to an accepted goal")]
    NoPath,
    #[error("search deadline exceeded")]
    DeadlineExceeded,
}

/// Wall-clock limit for one step's planning, passed into every search
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(start: Instant, budget: Duration) -> Self {
        Deadline { at: start + budget }
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn check(&self) -> Result<(), PlanError> {
        if self.expired() {
            Err(PlanError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }
}

/// Frontier entry ordered so that `BinaryHeap` pops the lowest priority first
#[derive(Debug, Clone)]
pub struct Node {
    pub priority: f64,
    pub cost: f64,
    pub position: Coord,
    pub heading: Option<Direction>,
    pub depth: usize,
    /// Insertion counter; earlier pushes win ties
    pub seq: u64,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Walks `came_from` back from `goal`; the start itself is not included
pub fn reconstruct_path(came_from: &HashMap<Coord, Coord>, goal: Coord) -> Path {
    let mut path = Path::new();
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        path.push_front(current);
        current = previous;
        if path.len() > came_from.len() {
            break;
        }
    }
    path
}

/// Body after the head moves to `head`, keeping the length
pub fn advance_body(head: Coord, body: &[Coord]) -> Vec<Coord> {
    let mut next = Vec::with_capacity(body.len().max(1));
    next.push(head);
    if body.len() > 1 {
        next.extend_from_slice(&body[..body.len() - 1]);
    }
    next
}

/// Body after following every step of `path`
pub fn project_body(body: &[Coord], path: &Path) -> Vec<Coord> {
    path.iter()
        .fold(body.to_vec(), |current, &step| advance_body(step, &current))
}

/// Planner-owned copy of the world onto which hypothetical bodies are stamped
pub struct Projection {
    world: WorldModel,
    stamped: HashSet<Coord>,
}

impl Projection {
    pub fn new(world: &WorldModel, body: &[Coord]) -> Self {
        Projection {
            world: world.clone(),
            stamped: body.iter().copied().collect(),
        }
    }

    /// Restamps `body` on the copy and flood-fills from its head
    pub fn reachable_with(
        &mut self,
        body: &[Coord],
        heading: Option<Direction>,
        threshold: Option<usize>,
    ) -> usize {
        self.world.speculative_update_body(&self.stamped, body);
        self.stamped = body.iter().copied().collect();
        match body.first() {
            Some(&head) => reachable_count(&self.world, head, heading, threshold),
            None => 0,
        }
    }

    /// Whether the agent keeps at least `threshold` reachable cells after `body`
    pub fn is_safe(&mut self, body: &[Coord], heading: Option<Direction>, threshold: usize) -> bool {
        self.reachable_with(body, heading, Some(threshold)) >= threshold
    }
}

impl TileCosts {
    /// Cost of stepping onto `tile`
    pub fn cost(&self, tile: TileState, eat_super_food: bool) -> f64 {
        match tile {
            TileState::Passage | TileState::OwnBody | TileState::Enemy => self.passage,
            TileState::Stone => self.stone,
            TileState::Food => self.food,
            TileState::SuperFood if eat_super_food => self.super_food_wanted,
            TileState::SuperFood => self.super_food_avoided,
            TileState::EnemySupposition => self.enemy_supposition,
            TileState::Visited { age, .. } => {
                let discount = ((age - 1.0).max(0.0) * self.age_discount).min(self.max_age_discount);
                (self.visited - discount).max(0.0)
            }
        }
    }
}
