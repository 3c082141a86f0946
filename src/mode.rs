// Mode selection and the cached path it guards
//
// One transition table decides the active mode each step; the same
// controller decides when the cached path has to be thrown away and in
// which order planners are tried when one of them fails.

use log::debug;
use std::collections::BTreeSet;

use crate::agent_state::AgentState;
use crate::config::ModeConfig;
use crate::search::Path;
use crate::tile::TileState;
use crate::types::Coord;
use crate::world::WorldModel;

/// Behaviour the agent is in; each mode owns one planner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Exploration,
    Eating,
    Survival,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Exploration => "exploration",
            Mode::Eating => "eating",
            Mode::Survival => "survival",
        }
    }

    /// Planners to try, in order, when this mode is selected
    pub fn fallback_chain(&self) -> &'static [Mode] {
        match self {
            Mode::Eating => &[Mode::Eating, Mode::Exploration, Mode::Survival],
            Mode::Exploration => &[Mode::Exploration, Mode::Survival],
            Mode::Survival => &[Mode::Survival],
        }
    }
}

/// Why a cached path was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    ModeChanged,
    FoodChanged,
    SuperFoodChanged,
    Revalidate,
    EnemyAhead,
    IllegalStep,
    /// The path came from a fallback planner; the preferred one gets another try
    FallbackPath,
}

/// Mode state machine plus the path cache
#[derive(Debug, Clone)]
pub struct ModeController {
    config: ModeConfig,
    mode: Mode,
    path: Path,
    /// Planner that produced `path`
    path_source: Mode,
    consumed: usize,
    food_snapshot: BTreeSet<Coord>,
    super_food_snapshot: BTreeSet<Coord>,
    super_food_eaten: u32,
}

impl ModeController {
    pub fn new(config: ModeConfig) -> Self {
        ModeController {
            config,
            mode: Mode::Exploration,
            path: Path::new(),
            path_source: Mode::Exploration,
            consumed: 0,
            food_snapshot: BTreeSet::new(),
            super_food_snapshot: BTreeSet::new(),
            super_food_eaten: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_path(&self) -> bool {
        !self.path.is_empty()
    }

    pub fn super_food_eaten(&self) -> u32 {
        self.super_food_eaten
    }

    pub fn record_super_food(&mut self) {
        self.super_food_eaten += 1;
    }

    /// Whether super-food is worth going for this step
    pub fn super_food_intent(&self, step: u64, range: u32, traverse: bool) -> bool {
        if step >= self.config.late_game_step {
            return true;
        }
        self.super_food_eaten < self.config.max_super_food
            && (range < self.config.preferred_range || !traverse)
    }

    /// The transition table
    pub fn select_mode(world: &WorldModel, eat_super_food: bool) -> Mode {
        if !world.food().is_empty() || (eat_super_food && !world.super_food().is_empty()) {
            Mode::Eating
        } else {
            Mode::Exploration
        }
    }

    /// Recomputes the mode for this step and drops the cached path when it is
    /// no longer trustworthy. Returns the reason it was dropped, if it was.
    pub fn begin_step(&mut self, agent: &AgentState, world: &WorldModel) -> Option<Invalidation> {
        let next_mode = Self::select_mode(world, agent.eat_super_food);
        let reason = self.invalidation(next_mode, agent, world);
        self.mode = next_mode;

        if let Some(reason) = reason {
            debug!("Dropping cached path ({} steps left): {:?}", self.path.len(), reason);
            self.clear_path();
        }
        reason
    }

    fn invalidation(&self, next_mode: Mode, agent: &AgentState, world: &WorldModel) -> Option<Invalidation> {
        let next = *self.path.front()?;

        if next_mode != self.mode {
            return Some(Invalidation::ModeChanged);
        }
        if self.path_source != self.mode {
            return Some(Invalidation::FallbackPath);
        }
        if *world.food() != self.food_snapshot {
            return Some(Invalidation::FoodChanged);
        }
        if agent.eat_super_food && *world.super_food() != self.super_food_snapshot {
            return Some(Invalidation::SuperFoodChanged);
        }
        if self.consumed >= self.config.replan_interval {
            return Some(Invalidation::Revalidate);
        }
        if matches!(world.tile(next), TileState::Enemy | TileState::EnemySupposition) {
            return Some(Invalidation::EnemyAhead);
        }
        let legal = world
            .neighbours(agent.position, agent.heading)
            .iter()
            .any(|&(pos, _)| pos == next);
        if !legal {
            return Some(Invalidation::IllegalStep);
        }
        None
    }

    /// Caches a freshly planned path
    pub fn set_path(&mut self, path: Path, source: Mode, world: &WorldModel) {
        self.path = path;
        self.path_source = source;
        self.consumed = 0;
        self.food_snapshot = world.food().clone();
        self.super_food_snapshot = world.super_food().clone();
    }

    pub fn clear_path(&mut self) {
        self.path.clear();
        self.consumed = 0;
    }

    /// Pops the next queued position
    pub fn next_step(&mut self) -> Option<Coord> {
        let next = self.path.pop_front()?;
        self.consumed += 1;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::tile::TileCode;
    use crate::world::Sight;

    fn mode_config() -> ModeConfig {
        Config::default_hardcoded().mode
    }

    fn world_with(map: Vec<Vec<u8>>, body: &[Coord]) -> WorldModel {
        let size = (map.len() as i32, map[0].len() as i32);
        let mut world = WorldModel::new(size, &map, Config::default_hardcoded().aging).unwrap();
        world.update(body[0], &[], body, &Sight::new(), false, 1);
        world
    }

    fn agent_with(body: Vec<Coord>, size: (i32, i32)) -> AgentState {
        let mut agent = AgentState::new(body.clone(), 3);
        agent.update(body, Sight::new(), 3, size);
        agent
    }

    fn straight_path(cells: &[(i32, i32)]) -> Path {
        cells.iter().map(|&(x, y)| Coord::new(x, y)).collect()
    }

    #[test]
    fn test_transition_table() {
        let body = [Coord::new(0, 0)];
        let mut map = vec![vec![0u8; 5]; 5];
        let world = world_with(map.clone(), &body);
        assert_eq!(ModeController::select_mode(&world, true), Mode::Exploration);

        map[4][4] = 3;
        let world = world_with(map.clone(), &body);
        assert_eq!(ModeController::select_mode(&world, false), Mode::Exploration);
        assert_eq!(ModeController::select_mode(&world, true), Mode::Eating);

        map[2][2] = 2;
        let world = world_with(map, &body);
        assert_eq!(ModeController::select_mode(&world, false), Mode::Eating);
    }

    #[test]
    fn test_fallback_chain_order() {
        assert_eq!(
            Mode::Eating.fallback_chain(),
            &[Mode::Eating, Mode::Exploration, Mode::Survival]
        );
        assert_eq!(Mode::Exploration.fallback_chain(), &[Mode::Exploration, Mode::Survival]);
    }

    #[test]
    fn test_super_food_intent() {
        let mut controller = ModeController::new(mode_config());
        assert!(controller.super_food_intent(10, 3, true));
        assert!(controller.super_food_intent(10, 5, false));
        assert!(!controller.super_food_intent(10, 5, true));

        for _ in 0..5 {
            controller.record_super_food();
        }
        assert!(!controller.super_food_intent(10, 2, false));
        assert!(controller.super_food_intent(2500, 6, true));
    }

    #[test]
    fn test_path_is_revalidated_periodically() {
        let body = vec![Coord::new(1, 2), Coord::new(0, 2)];
        let world = world_with(vec![vec![0u8; 8]; 8], &body);
        let mut agent = agent_with(body, (8, 8));
        let mut controller = ModeController::new(mode_config());

        assert_eq!(controller.begin_step(&agent, &world), None);
        controller.set_path(straight_path(&[(2, 2), (3, 2), (4, 2), (5, 2)]), Mode::Exploration, &world);

        assert_eq!(controller.next_step(), Some(Coord::new(2, 2)));
        agent.update(vec![Coord::new(2, 2), Coord::new(1, 2)], Sight::new(), 3, (8, 8));
        assert_eq!(controller.begin_step(&agent, &world), None);

        assert_eq!(controller.next_step(), Some(Coord::new(3, 2)));
        agent.update(vec![Coord::new(3, 2), Coord::new(2, 2)], Sight::new(), 3, (8, 8));
        assert_eq!(controller.begin_step(&agent, &world), Some(Invalidation::Revalidate));
        assert!(!controller.has_path());
    }

    #[test]
    fn test_enemy_on_next_step_drops_path() {
        let body = vec![Coord::new(1, 2), Coord::new(0, 2)];
        let mut world = world_with(vec![vec![0u8; 8]; 8], &body);
        let agent = agent_with(body.clone(), (8, 8));
        let mut controller = ModeController::new(mode_config());
        controller.set_path(straight_path(&[(2, 2), (3, 2)]), Mode::Exploration, &world);

        let sight: Sight = vec![(Coord::new(2, 2), TileCode::EnemySupposition)].into_iter().collect();
        world.update(body[0], &body, &body, &sight, false, 2);
        assert_eq!(controller.begin_step(&agent, &world), Some(Invalidation::EnemyAhead));
    }

    #[test]
    fn test_new_food_changes_mode_and_drops_path() {
        let body = vec![Coord::new(1, 2), Coord::new(0, 2)];
        let mut world = world_with(vec![vec![0u8; 8]; 8], &body);
        let agent = agent_with(body.clone(), (8, 8));
        let mut controller = ModeController::new(mode_config());
        controller.set_path(straight_path(&[(2, 2), (3, 2)]), Mode::Exploration, &world);

        let sight: Sight = vec![(Coord::new(5, 5), TileCode::Food)].into_iter().collect();
        world.update(body[0], &body, &body, &sight, false, 2);
        assert_eq!(controller.begin_step(&agent, &world), Some(Invalidation::ModeChanged));
        assert_eq!(controller.mode(), Mode::Eating);
    }

    #[test]
    fn test_fallback_path_is_replanned() {
        let body = vec![Coord::new(1, 2), Coord::new(0, 2)];
        let world = world_with(vec![vec![0u8; 8]; 8], &body);
        let agent = agent_with(body, (8, 8));
        let mut controller = ModeController::new(mode_config());
        controller.set_path(straight_path(&[(2, 2), (3, 2)]), Mode::Survival, &world);
        assert_eq!(controller.begin_step(&agent, &world), Some(Invalidation::FallbackPath));
    }

    #[test]
    fn test_unreachable_next_step_is_illegal() {
        let body = vec![Coord::new(1, 2), Coord::new(0, 2)];
        let world = world_with(vec![vec![0u8; 8]; 8], &body);
        let agent = agent_with(body, (8, 8));
        let mut controller = ModeController::new(mode_config());
        controller.set_path(straight_path(&[(4, 4)]), Mode::Exploration, &world);
        assert_eq!(controller.begin_step(&agent, &world), Some(Invalidation::IllegalStep));
    }
}
