// Tile codes on the wire and the per-cell belief state kept by the world model

use std::convert::TryFrom;
use thiserror::Error;

/// Wire tile codes, bit-exact with the game server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TileCode {
    Passage = 0,
    Stone = 1,
    Food = 2,
    SuperFood = 3,
    Snake = 4,
    Visited = 5,
    Blocked = 6,
    Enemy = 7,
    EnemySupposition = 8,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TileError {
    #[error("unknown tile code {0}")]
    UnknownCode(u8),
}

impl TryFrom<u8> for TileCode {
    type Error = TileError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => TileCode::Passage,
            1 => TileCode::Stone,
            2 => TileCode::Food,
            3 => TileCode::SuperFood,
            4 => TileCode::Snake,
            5 => TileCode::Visited,
            6 => TileCode::Blocked,
            7 => TileCode::Enemy,
            8 => TileCode::EnemySupposition,
            other => return Err(TileError::UnknownCode(other)),
        })
    }
}

impl From<TileCode> for u8 {
    fn from(code: TileCode) -> u8 {
        code as u8
    }
}

/// What the agent believes occupies a cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TileState {
    Passage,
    Stone,
    Food,
    SuperFood,
    OwnBody,
    Enemy,
    EnemySupposition,
    /// Seen before but not currently in sight. `age` only grows; while
    /// `cooldown` is positive it is spent instead of aging.
    Visited { age: f64, cooldown: u32 },
}

impl TileState {
    /// Freshly observed passage
    pub fn fresh_visited(cooldown: u32) -> Self {
        TileState::Visited { age: 1.0, cooldown }
    }

    pub fn code(&self) -> TileCode {
        match self {
            TileState::Passage => TileCode::Passage,
            TileState::Stone => TileCode::Stone,
            TileState::Food => TileCode::Food,
            TileState::SuperFood => TileCode::SuperFood,
            TileState::OwnBody => TileCode::Snake,
            TileState::Enemy => TileCode::Enemy,
            TileState::EnemySupposition => TileCode::EnemySupposition,
            TileState::Visited { .. } => TileCode::Visited,
        }
    }

    /// Age of a visited cell, `None` for every other state
    pub fn age(&self) -> Option<f64> {
        match self {
            TileState::Visited { age, .. } => Some(*age),
            _ => None,
        }
    }

    /// Advances a visited cell by one aging tick
    pub fn tick(&mut self, growth_factor: f64) {
        if let TileState::Visited { age, cooldown } = self {
            if *cooldown > 0 {
                *cooldown -= 1;
            } else {
                *age *= growth_factor;
            }
        }
    }

    /// Cell state for a code found in the initial map
    ///
    /// Transient occupants (snakes, enemy markers) are not part of the static
    /// map and start as passage; blocked cells are treated as stone.
    pub fn from_map_code(code: TileCode, cooldown: u32) -> Self {
        match code {
            TileCode::Stone | TileCode::Blocked => TileState::Stone,
            TileCode::Food => TileState::Food,
            TileCode::SuperFood => TileState::SuperFood,
            TileCode::Visited => TileState::fresh_visited(cooldown),
            TileCode::Passage
            | TileCode::Snake
            | TileCode::Enemy
            | TileCode::EnemySupposition => TileState::Passage,
        }
    }
}
