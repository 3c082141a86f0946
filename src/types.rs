// Wire and geometry types shared by the world model, planners and session
//
// Coordinates are screen-oriented: x grows east, y grows south, so North is y - 1.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 2D coordinate on the grid, serialized as an `[x, y]` pair
#[derive(Deserialize, Serialize, Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
#[serde(from = "(i32, i32)", into = "(i32, i32)")]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Coord { x, y }
    }
}

impl From<Coord> for (i32, i32) {
    fn from(c: Coord) -> Self {
        (c.x, c.y)
    }
}

/// The four cardinal moves
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    /// Returns all possible directions, in expansion order
    pub fn all() -> [Direction; 4] {
        [Direction::West, Direction::East, Direction::North, Direction::South]
    }

    /// Converts direction to the key token sent to the game server
    pub fn as_key(&self) -> &'static str {
        match self {
            Direction::North => "w",
            Direction::West => "a",
            Direction::South => "s",
            Direction::East => "d",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::East => "east",
            Direction::South => "south",
            Direction::West => "west",
        }
    }

    pub fn from_key(key: &str) -> Option<Direction> {
        match key {
            "w" => Some(Direction::North),
            "a" => Some(Direction::West),
            "s" => Some(Direction::South),
            "d" => Some(Direction::East),
            _ => None,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Unit step of this direction, without wrapping
    pub fn apply(&self, coord: &Coord) -> Coord {
        match self {
            Direction::North => Coord { x: coord.x, y: coord.y - 1 },
            Direction::South => Coord { x: coord.x, y: coord.y + 1 },
            Direction::West => Coord { x: coord.x - 1, y: coord.y },
            Direction::East => Coord { x: coord.x + 1, y: coord.y },
        }
    }

    /// Direction of a single step from `from` to `to` on a `width` x `height` grid.
    /// Recognises steps that cross a wrapped edge.
    pub fn between(from: Coord, to: Coord, width: i32, height: i32) -> Option<Direction> {
        let dx = (to.x - from.x).rem_euclid(width);
        let dy = (to.y - from.y).rem_euclid(height);
        match (dx, dy) {
            (1, 0) if width > 1 => Some(Direction::East),
            (d, 0) if d == width - 1 && width > 1 => Some(Direction::West),
            (0, 1) if height > 1 => Some(Direction::South),
            (0, d) if d == height - 1 && height > 1 => Some(Direction::North),
            _ => None,
        }
    }
}

/// Raw sight window as sent by the server: x -> (y -> tile code)
pub type RawSight = BTreeMap<i32, BTreeMap<i32, u8>>;

/// Session-start message carrying the full initial map
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GameInfo {
    pub size: (i32, i32),
    /// Column-major tile codes: `map[x][y]`
    pub map: Vec<Vec<u8>>,
    #[serde(default)]
    pub fps: Option<u32>,
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// One per-step observation
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct StepState {
    pub step: u64,
    /// Head first
    pub body: Vec<Coord>,
    pub sight: RawSight,
    pub range: u32,
    pub traverse: bool,
    #[serde(default)]
    pub size: Option<(i32, i32)>,
}

/// Messages the agent sends to the server
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ClientMessage {
    Join { name: String },
    Key { key: String },
}

impl ClientMessage {
    pub fn key(direction: Direction) -> Self {
        ClientMessage::Key {
            key: direction.as_key().to_string(),
        }
    }
}
