// Minimal game server stand-in for integration tests
//
// Keeps the true grid, hands out sight windows around the head and applies
// moves the way the real server does: the tail is kept on the step food is eaten.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};

use sight_snake::types::{Coord, Direction, GameInfo, RawSight, StepState};

pub struct Arena {
    pub width: i32,
    pub height: i32,
    pub stones: HashSet<Coord>,
    pub food: HashSet<Coord>,
    pub body: Vec<Coord>,
    pub step: u64,
    pub range: u32,
    pub eaten: usize,
    respawns: VecDeque<Coord>,
}

impl Arena {
    pub fn new(width: i32, height: i32, body: &[(i32, i32)], range: u32) -> Self {
        Arena {
            width,
            height,
            stones: HashSet::new(),
            food: HashSet::new(),
            body: body.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
            step: 1,
            range,
            eaten: 0,
            respawns: VecDeque::new(),
        }
    }

    pub fn with_stones(mut self, stones: &[(i32, i32)]) -> Self {
        self.stones.extend(stones.iter().map(|&(x, y)| Coord::new(x, y)));
        self
    }

    pub fn with_food(mut self, food: &[(i32, i32)]) -> Self {
        self.food.extend(food.iter().map(|&(x, y)| Coord::new(x, y)));
        self
    }

    /// Food placed, one at a time, whenever something is eaten
    pub fn with_respawns(mut self, spots: &[(i32, i32)]) -> Self {
        self.respawns.extend(spots.iter().map(|&(x, y)| Coord::new(x, y)));
        self
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    /// Initial map: stones only, food has to be seen
    pub fn game_info(&self) -> GameInfo {
        let mut map = vec![vec![0u8; self.height as usize]; self.width as usize];
        for stone in &self.stones {
            map[stone.x as usize][stone.y as usize] = 1;
        }
        GameInfo {
            size: (self.width, self.height),
            map,
            fps: None,
            timeout: None,
        }
    }

    fn code_at(&self, pos: Coord) -> u8 {
        if self.stones.contains(&pos) {
            1
        } else if self.body.contains(&pos) {
            4
        } else if self.food.contains(&pos) {
            2
        } else {
            0
        }
    }

    pub fn observe(&self) -> StepState {
        let head = self.head();
        let r = self.range as i32;
        let mut sight = RawSight::new();
        for dx in -r..=r {
            for dy in -r..=r {
                if dx * dx + dy * dy > r * r {
                    continue;
                }
                let pos = Coord::new(head.x + dx, head.y + dy);
                if pos.x < 0 || pos.y < 0 || pos.x >= self.width || pos.y >= self.height {
                    continue;
                }
                sight.entry(pos.x).or_default().insert(pos.y, self.code_at(pos));
            }
        }
        StepState {
            step: self.step,
            body: self.body.clone(),
            sight,
            range: self.range,
            traverse: false,
            size: None,
        }
    }

    /// Moves the snake; an error describes the collision
    pub fn apply(&mut self, direction: Direction) -> Result<(), String> {
        let next = direction.apply(&self.head());
        if next.x < 0 || next.y < 0 || next.x >= self.width || next.y >= self.height {
            return Err(format!("step {}: left the grid at {:?}", self.step, next));
        }
        if self.stones.contains(&next) {
            return Err(format!("step {}: hit a stone at {:?}", self.step, next));
        }

        let eats = self.food.contains(&next);
        let occupied = if eats {
            &self.body[..]
        } else {
            &self.body[..self.body.len() - 1]
        };
        if occupied.contains(&next) {
            return Err(format!("step {}: bit itself at {:?}", self.step, next));
        }

        self.body.insert(0, next);
        if eats {
            self.food.remove(&next);
            self.eaten += 1;
            if let Some(spot) = self.respawns.pop_front() {
                self.food.insert(spot);
            }
        } else {
            self.body.pop();
        }
        self.step += 1;
        Ok(())
    }
}
