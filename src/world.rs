// World model: the agent's persistent belief about every grid cell
//
// The authoritative instance is mutated only by `update` once per step.
// Planners that need to project the body forward clone it and call
// `speculative_update_body` on the clone.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::convert::TryFrom;

use crate::config::AgingConfig;
use crate::tile::{TileCode, TileError, TileState};
use crate::types::{Coord, Direction, RawSight};

/// Decoded sight window
pub type Sight = HashMap<Coord, TileCode>;

/// Decodes the server's sparse sight mapping, rejecting unknown tile codes
pub fn parse_sight(raw: &RawSight) -> Result<Sight, TileError> {
    let mut sight = Sight::new();
    for (&x, column) in raw {
        for (&y, &code) in column {
            sight.insert(Coord::new(x, y), TileCode::try_from(code)?);
        }
    }
    Ok(sight)
}

#[derive(Debug, Clone)]
pub struct WorldModel {
    width: i32,
    height: i32,
    /// Row-major: `y * width + x`
    cells: Vec<TileState>,
    stones: HashSet<Coord>,
    food: BTreeSet<Coord>,
    super_food: BTreeSet<Coord>,
    enemies: HashSet<Coord>,
    traverse: bool,
    ate_food: bool,
    ate_super_food: bool,
    aging: AgingConfig,
}

impl WorldModel {
    /// Builds the model from the session-start map (`map[x][y]` tile codes)
    pub fn new(size: (i32, i32), map: &[Vec<u8>], aging: AgingConfig) -> Result<Self, TileError> {
        let (width, height) = size;
        let mut world = WorldModel {
            width,
            height,
            cells: vec![TileState::Passage; (width.max(0) * height.max(0)) as usize],
            stones: HashSet::new(),
            food: BTreeSet::new(),
            super_food: BTreeSet::new(),
            enemies: HashSet::new(),
            traverse: false,
            ate_food: false,
            ate_super_food: false,
            aging,
        };

        for (x, column) in map.iter().enumerate().take(width.max(0) as usize) {
            for (y, &code) in column.iter().enumerate().take(height.max(0) as usize) {
                let pos = Coord::new(x as i32, y as i32);
                let tile = TileState::from_map_code(TileCode::try_from(code)?, world.aging.slow_down_effect);
                match tile {
                    TileState::Stone => {
                        world.stones.insert(pos);
                    }
                    TileState::Food => {
                        world.food.insert(pos);
                    }
                    TileState::SuperFood => {
                        world.super_food.insert(pos);
                    }
                    _ => {}
                }
                world.set_tile(pos, tile);
            }
        }

        Ok(world)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn traverse(&self) -> bool {
        self.traverse
    }

    pub fn food(&self) -> &BTreeSet<Coord> {
        &self.food
    }

    pub fn super_food(&self) -> &BTreeSet<Coord> {
        &self.super_food
    }

    pub fn stones(&self) -> &HashSet<Coord> {
        &self.stones
    }

    pub fn enemies(&self) -> &HashSet<Coord> {
        &self.enemies
    }

    pub fn ate_food(&self) -> bool {
        self.ate_food
    }

    pub fn ate_super_food(&self) -> bool {
        self.ate_super_food
    }

    pub fn in_bounds(&self, pos: Coord) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    pub fn wrap(&self, pos: Coord) -> Coord {
        Coord::new(pos.x.rem_euclid(self.width), pos.y.rem_euclid(self.height))
    }

    /// In-grid position for `pos`: wrapped when traversing, `None` when off-grid otherwise
    fn normalise(&self, pos: Coord) -> Option<Coord> {
        if self.in_bounds(pos) {
            Some(pos)
        } else if self.traverse {
            Some(self.wrap(pos))
        } else {
            None
        }
    }

    fn index(&self, pos: Coord) -> Option<usize> {
        self.normalise(pos)
            .map(|p| (p.y * self.width + p.x) as usize)
    }

    /// Tile at `pos`; off-grid positions read as stone
    pub fn tile(&self, pos: Coord) -> TileState {
        self.index(pos)
            .map(|i| self.cells[i])
            .unwrap_or(TileState::Stone)
    }

    fn set_tile(&mut self, pos: Coord, tile: TileState) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = tile;
        }
    }

    /// Applies one step's observation. Order matters: food, aging, own body, enemies.
    pub fn update(
        &mut self,
        agent_position: Coord,
        previous_body: &[Coord],
        current_body: &[Coord],
        sight: &Sight,
        traverse: bool,
        step: u64,
    ) {
        self.traverse = traverse;

        let previously_ate_super = self.ate_super_food;
        let under_head = self.tile(agent_position);
        self.ate_food = matches!(under_head, TileState::Food);
        self.ate_super_food = matches!(under_head, TileState::SuperFood);

        let observed: Vec<(Coord, TileCode)> = sight
            .iter()
            .filter_map(|(&pos, &code)| self.normalise(pos).map(|p| (p, code)))
            .collect();

        self.reconcile_food(&observed);
        self.age_tiles(&observed, step);
        self.place_body(previous_body, current_body, previously_ate_super);
        self.track_enemies(&observed, current_body);

        debug_assert!(self.food_sets_consistent());
    }

    fn reconcile_food(&mut self, observed: &[(Coord, TileCode)]) {
        for &(pos, code) in observed {
            if self.stones.contains(&pos) {
                continue;
            }
            match code {
                TileCode::Food => {
                    self.super_food.remove(&pos);
                    self.food.insert(pos);
                    self.set_tile(pos, TileState::Food);
                }
                TileCode::SuperFood => {
                    self.food.remove(&pos);
                    self.super_food.insert(pos);
                    self.set_tile(pos, TileState::SuperFood);
                }
                _ => {
                    let was_food = self.food.remove(&pos);
                    let was_super = self.super_food.remove(&pos);
                    if was_food || was_super {
                        self.set_tile(pos, TileState::Passage);
                    }
                }
            }
        }
    }

    fn age_tiles(&mut self, observed: &[(Coord, TileCode)], step: u64) {
        let rate = self.aging.age_update_rate;
        if rate > 0 && step % rate == 0 {
            let growth = self.aging.growth_factor;
            for cell in self.cells.iter_mut() {
                cell.tick(growth);
            }
        }

        let cooldown = self.aging.slow_down_effect;
        for &(pos, code) in observed {
            if code == TileCode::Passage && !self.stones.contains(&pos) {
                self.set_tile(pos, TileState::fresh_visited(cooldown));
            }
        }
    }

    fn place_body(&mut self, previous_body: &[Coord], current_body: &[Coord], previously_ate_super: bool) {
        if previous_body.is_empty() {
            for &segment in current_body {
                self.stamp_body(segment);
            }
            return;
        }

        // Incremental update only when the body moved exactly one cell since `previous_body`
        let kept = if self.ate_food {
            previous_body.len()
        } else {
            previous_body.len() - 1
        };
        let shifted_by_one = current_body.len() == kept + 1 && current_body[1..] == previous_body[..kept];
        if previously_ate_super || self.ate_super_food || !shifted_by_one {
            for &segment in previous_body {
                self.vacate(segment);
            }
            for &segment in current_body {
                self.stamp_body(segment);
            }
            return;
        }

        if !self.ate_food {
            if let Some(&tail) = previous_body.last() {
                if !current_body.contains(&tail) {
                    self.vacate(tail);
                }
            }
        }
        if let Some(&head) = current_body.first() {
            self.stamp_body(head);
        }
    }

    fn track_enemies(&mut self, observed: &[(Coord, TileCode)], own_body: &[Coord]) {
        for pos in std::mem::take(&mut self.enemies) {
            if matches!(self.tile(pos), TileState::Enemy | TileState::EnemySupposition) {
                self.vacate(pos);
            }
        }

        for &(pos, code) in observed {
            if own_body.contains(&pos) || self.stones.contains(&pos) {
                continue;
            }
            let marker = match code {
                TileCode::Snake | TileCode::Enemy => TileState::Enemy,
                TileCode::EnemySupposition => TileState::EnemySupposition,
                _ => continue,
            };
            self.food.remove(&pos);
            self.super_food.remove(&pos);
            self.set_tile(pos, marker);
            self.enemies.insert(pos);
        }
    }

    /// Marks a body cell; food under it counts as eaten
    fn stamp_body(&mut self, pos: Coord) {
        self.food.remove(&pos);
        self.super_food.remove(&pos);
        self.set_tile(pos, TileState::OwnBody);
    }

    /// Returns a cell left by a body or enemy to its static state
    fn vacate(&mut self, pos: Coord) {
        let tile = if self.stones.contains(&pos) {
            TileState::Stone
        } else {
            TileState::fresh_visited(self.aging.slow_down_effect)
        };
        self.set_tile(pos, tile);
    }

    /// Rewrites only body cells; meant for planner-owned copies
    pub fn speculative_update_body(&mut self, old_body: &HashSet<Coord>, new_body: &[Coord]) {
        for &segment in old_body {
            if !new_body.contains(&segment) && self.tile(segment) == TileState::OwnBody {
                self.vacate(segment);
            }
        }
        for &segment in new_body {
            self.stamp_body(segment);
        }
    }

    pub fn is_blocked(&self, pos: Coord) -> bool {
        if !self.traverse && !self.in_bounds(pos) {
            return true;
        }
        match self.tile(pos) {
            TileState::Stone => !self.traverse,
            TileState::OwnBody | TileState::Enemy => true,
            TileState::Passage
            | TileState::Visited { .. }
            | TileState::Food
            | TileState::SuperFood
            | TileState::EnemySupposition => false,
        }
    }

    /// Position after moving one step; `current` itself when the move is blocked
    pub fn step_position(&self, current: Coord, direction: Direction) -> Coord {
        let mut next = direction.apply(&current);
        if self.traverse {
            next = self.wrap(next);
        }
        if self.is_blocked(next) {
            current
        } else {
            next
        }
    }

    /// Legal successors of `current`, never reversing `heading`
    pub fn neighbours(&self, current: Coord, heading: Option<Direction>) -> Vec<(Coord, Direction)> {
        Direction::all()
            .iter()
            .filter(|&&dir| heading.map_or(true, |h| dir != h.opposite()))
            .filter_map(|&dir| {
                let next = self.step_position(current, dir);
                if next == current {
                    None
                } else {
                    Some((next, dir))
                }
            })
            .collect()
    }

    /// Wrap-aware Manhattan distance
    pub fn distance(&self, a: Coord, b: Coord) -> i32 {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        if !self.traverse {
            return dx + dy;
        }
        dx.min(self.width - dx) + dy.min(self.height - dy)
    }

    /// Cells within Euclidean `radius` of `center`
    pub fn zone(&self, center: Coord, radius: u32) -> Vec<(Coord, TileState)> {
        let r = radius as i32;
        let mut cells = Vec::new();
        for dx in -r..=r {
            for dy in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                if let Some(pos) = self.normalise(Coord::new(center.x + dx, center.y + dy)) {
                    cells.push((pos, self.tile(pos)));
                }
            }
        }
        cells
    }

    /// A coordinate is tracked as (super) food iff its tile says so
    pub fn food_sets_consistent(&self) -> bool {
        (0..self.width).all(|x| {
            (0..self.height).all(|y| {
                let pos = Coord::new(x, y);
                let tile = self.tile(pos);
                (tile == TileState::Food) == self.food.contains(&pos)
                    && (tile == TileState::SuperFood) == self.super_food.contains(&pos)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn aging() -> AgingConfig {
        Config::default_hardcoded().aging
    }

    fn open_map(width: usize, height: usize) -> Vec<Vec<u8>> {
        vec![vec![0; height]; width]
    }

    fn sight_of(cells: &[(i32, i32, TileCode)]) -> Sight {
        cells.iter().map(|&(x, y, code)| (Coord::new(x, y), code)).collect()
    }

    #[test]
    fn test_new_collects_stones_and_food() {
        let mut map = open_map(5, 5);
        map[1][2] = 1;
        map[3][3] = 2;
        map[0][4] = 3;
        let world = WorldModel::new((5, 5), &map, aging()).unwrap();

        assert!(world.stones().contains(&Coord::new(1, 2)));
        assert!(world.food().contains(&Coord::new(3, 3)));
        assert!(world.super_food().contains(&Coord::new(0, 4)));
        assert_eq!(world.tile(Coord::new(1, 2)), TileState::Stone);
        assert!(world.food_sets_consistent());
    }

    #[test]
    fn test_new_rejects_unknown_code() {
        let mut map = open_map(3, 3);
        map[1][1] = 42;
        assert_eq!(
            WorldModel::new((3, 3), &map, aging()).unwrap_err(),
            TileError::UnknownCode(42)
        );
    }

    #[test]
    fn test_parse_sight_propagates_unknown_code() {
        let mut raw = RawSight::new();
        raw.entry(2).or_default().insert(3, 9);
        assert_eq!(parse_sight(&raw).unwrap_err(), TileError::UnknownCode(9));
    }

    #[test]
    fn test_is_blocked_rules() {
        let mut map = open_map(4, 4);
        map[2][2] = 1;
        let mut world = WorldModel::new((4, 4), &map, aging()).unwrap();
        world.update(Coord::new(0, 0), &[], &[Coord::new(0, 0)], &Sight::new(), false, 1);

        assert!(world.is_blocked(Coord::new(-1, 0)));
        assert!(world.is_blocked(Coord::new(2, 2)));
        assert!(world.is_blocked(Coord::new(0, 0)));
        assert!(!world.is_blocked(Coord::new(1, 1)));

        world.update(Coord::new(0, 0), &[Coord::new(0, 0)], &[Coord::new(0, 0)], &Sight::new(), true, 2);
        assert!(!world.is_blocked(Coord::new(-1, 0)));
        assert!(!world.is_blocked(Coord::new(2, 2)));
        assert!(world.is_blocked(Coord::new(0, 0)));
        assert!(world.is_blocked(Coord::new(4, 0)));
    }

    #[test]
    fn test_step_position_wraps_only_when_traversing() {
        let mut world = WorldModel::new((4, 4), &open_map(4, 4), aging()).unwrap();
        assert_eq!(world.step_position(Coord::new(3, 1), Direction::East), Coord::new(3, 1));
        world.traverse = true;
        assert_eq!(world.step_position(Coord::new(3, 1), Direction::East), Coord::new(0, 1));
        assert_eq!(world.step_position(Coord::new(1, 0), Direction::North), Coord::new(1, 3));
    }

    #[test]
    fn test_neighbours_exclude_reverse_and_blocked() {
        let mut map = open_map(5, 5);
        map[2][1] = 1;
        let world = WorldModel::new((5, 5), &map, aging()).unwrap();

        let next: Vec<Direction> = world
            .neighbours(Coord::new(2, 2), Some(Direction::East))
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        assert_eq!(next, vec![Direction::East, Direction::South]);

        assert_eq!(world.neighbours(Coord::new(0, 0), None).len(), 2);
    }

    #[test]
    fn test_food_reconciliation_tracks_sight() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let body = [Coord::new(0, 0)];
        let sight = sight_of(&[(1, 0, TileCode::Food), (2, 0, TileCode::SuperFood)]);
        world.update(body[0], &[], &body, &sight, false, 1);
        assert!(world.food().contains(&Coord::new(1, 0)));
        assert!(world.super_food().contains(&Coord::new(2, 0)));

        let sight = sight_of(&[(1, 0, TileCode::Passage), (2, 0, TileCode::Snake)]);
        world.update(body[0], &body, &body, &sight, false, 2);
        assert!(world.food().is_empty());
        assert!(world.super_food().is_empty());
        assert_eq!(world.tile(Coord::new(2, 0)), TileState::Enemy);
        assert!(world.food_sets_consistent());
    }

    #[test]
    fn test_sighted_passage_becomes_fresh_visited() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let body = [Coord::new(0, 0)];
        world.update(body[0], &[], &body, &sight_of(&[(3, 3, TileCode::Passage)]), false, 1);
        assert_eq!(world.tile(Coord::new(3, 3)), TileState::fresh_visited(3));
    }

    #[test]
    fn test_aging_is_monotonic_and_waits_for_cooldown() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let body = [Coord::new(0, 0)];
        let cell = Coord::new(4, 4);
        world.update(body[0], &[], &body, &sight_of(&[(4, 4, TileCode::Passage)]), false, 1);

        let mut last = world.tile(cell).age().unwrap();
        let mut increases = 0;
        for step in 2..=20 {
            world.update(body[0], &body, &body, &Sight::new(), false, step);
            let age = world.tile(cell).age().unwrap();
            assert!(age >= last);
            if age > last {
                increases += 1;
            }
            last = age;
        }
        // 10 aging ticks, the first 3 absorbed by the cooldown
        assert_eq!(increases, 7);
        let expected = 1.12f64.powi(7);
        assert!((last - expected).abs() < 1e-9);
    }

    #[test]
    fn test_body_moves_incrementally() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let first = [Coord::new(2, 2), Coord::new(1, 2), Coord::new(0, 2)];
        world.update(first[0], &[], &first, &Sight::new(), false, 1);
        for c in &first {
            assert_eq!(world.tile(*c), TileState::OwnBody);
        }

        let second = [Coord::new(3, 2), Coord::new(2, 2), Coord::new(1, 2)];
        world.update(second[0], &first, &second, &Sight::new(), false, 2);
        assert_eq!(world.tile(Coord::new(3, 2)), TileState::OwnBody);
        assert!(matches!(world.tile(Coord::new(0, 2)), TileState::Visited { .. }));
    }

    #[test]
    fn test_body_that_moved_two_cells_is_redrawn() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let first = [Coord::new(2, 2), Coord::new(1, 2), Coord::new(0, 2)];
        world.update(first[0], &[], &first, &Sight::new(), false, 1);

        // Same length, but two moves later
        let third = [Coord::new(4, 2), Coord::new(3, 2), Coord::new(2, 2)];
        world.update(third[0], &first, &third, &Sight::new(), false, 3);
        for c in &third {
            assert_eq!(world.tile(*c), TileState::OwnBody);
        }
        assert!(matches!(world.tile(Coord::new(1, 2)), TileState::Visited { .. }));
        assert!(matches!(world.tile(Coord::new(0, 2)), TileState::Visited { .. }));
    }

    #[test]
    fn test_eating_food_keeps_tail() {
        let mut map = open_map(6, 6);
        map[3][2] = 2;
        let mut world = WorldModel::new((6, 6), &map, aging()).unwrap();
        let first = [Coord::new(2, 2), Coord::new(1, 2)];
        world.update(first[0], &[], &first, &Sight::new(), false, 1);

        let grown = [Coord::new(3, 2), Coord::new(2, 2), Coord::new(1, 2)];
        world.update(grown[0], &first, &grown, &Sight::new(), false, 2);
        assert!(world.ate_food());
        assert_eq!(world.tile(Coord::new(1, 2)), TileState::OwnBody);
        assert!(world.food().is_empty());
    }

    #[test]
    fn test_super_food_forces_full_restamp() {
        let mut map = open_map(8, 8);
        map[4][2] = 3;
        let mut world = WorldModel::new((8, 8), &map, aging()).unwrap();

        let first = [Coord::new(3, 2), Coord::new(2, 2), Coord::new(1, 2), Coord::new(0, 2)];
        world.update(first[0], &[], &first, &Sight::new(), false, 1);

        let on_super = [Coord::new(4, 2), Coord::new(3, 2), Coord::new(2, 2), Coord::new(1, 2)];
        world.update(on_super[0], &first, &on_super, &Sight::new(), false, 2);
        assert!(world.ate_super_food());

        // Super food shrank the body by two and switched traverse on
        let after = [Coord::new(5, 2), Coord::new(4, 2)];
        world.update(after[0], &on_super, &after, &Sight::new(), true, 3);

        assert_eq!(world.tile(Coord::new(5, 2)), TileState::OwnBody);
        assert_eq!(world.tile(Coord::new(4, 2)), TileState::OwnBody);
        for gone in &[Coord::new(3, 2), Coord::new(2, 2), Coord::new(1, 2), Coord::new(0, 2)] {
            assert!(matches!(world.tile(*gone), TileState::Visited { .. }), "{:?}", gone);
        }
        assert!(world.traverse());
    }

    #[test]
    fn test_enemies_are_replaced_each_step() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let body = [Coord::new(0, 0)];
        let sight = sight_of(&[(0, 0, TileCode::Snake), (3, 3, TileCode::Snake), (4, 4, TileCode::EnemySupposition)]);
        world.update(body[0], &[], &body, &sight, false, 1);
        assert_eq!(world.tile(Coord::new(0, 0)), TileState::OwnBody);
        assert_eq!(world.tile(Coord::new(3, 3)), TileState::Enemy);
        assert_eq!(world.tile(Coord::new(4, 4)), TileState::EnemySupposition);
        assert_eq!(world.enemies().len(), 2);

        let sight = sight_of(&[(3, 4, TileCode::Snake)]);
        world.update(body[0], &body, &body, &sight, false, 2);
        assert!(matches!(world.tile(Coord::new(3, 3)), TileState::Visited { .. }));
        assert!(matches!(world.tile(Coord::new(4, 4)), TileState::Visited { .. }));
        assert_eq!(world.tile(Coord::new(3, 4)), TileState::Enemy);
        assert_eq!(world.enemies().len(), 1);
    }

    #[test]
    fn test_speculative_update_only_touches_body() {
        let mut world = WorldModel::new((6, 6), &open_map(6, 6), aging()).unwrap();
        let body = [Coord::new(1, 1), Coord::new(0, 1)];
        world.update(body[0], &[], &body, &Sight::new(), false, 1);

        let mut copy = world.clone();
        let old: HashSet<Coord> = body.iter().copied().collect();
        let projected = [Coord::new(2, 1), Coord::new(1, 1)];
        copy.speculative_update_body(&old, &projected);

        assert_eq!(copy.tile(Coord::new(2, 1)), TileState::OwnBody);
        assert!(matches!(copy.tile(Coord::new(0, 1)), TileState::Visited { .. }));
        assert_eq!(world.tile(Coord::new(0, 1)), TileState::OwnBody);
        assert_eq!(world.tile(Coord::new(2, 1)), TileState::Passage);
    }

    #[test]
    fn test_distance_wraps_when_traversing() {
        let mut world = WorldModel::new((10, 10), &open_map(10, 10), aging()).unwrap();
        assert_eq!(world.distance(Coord::new(0, 0), Coord::new(9, 9)), 18);
        world.traverse = true;
        assert_eq!(world.distance(Coord::new(0, 0), Coord::new(9, 9)), 2);
    }

    #[test]
    fn test_zone_is_a_clipped_disc() {
        let world = WorldModel::new((10, 10), &open_map(10, 10), aging()).unwrap();
        assert_eq!(world.zone(Coord::new(5, 5), 1).len(), 5);
        assert_eq!(world.zone(Coord::new(5, 5), 2).len(), 13);
        assert_eq!(world.zone(Coord::new(0, 0), 1).len(), 3);
    }
}
