// The agent's own kinematic state, refreshed from every observation

use crate::mode::Mode;
use crate::types::{Coord, Direction};
use crate::world::Sight;

#[derive(Debug, Clone)]
pub struct AgentState {
    pub position: Coord,
    /// `None` while the body has a single segment
    pub heading: Option<Direction>,
    /// Head first
    pub body: Vec<Coord>,
    pub sight: Sight,
    pub range: u32,
    pub mode: Mode,
    pub eat_super_food: bool,
}

impl AgentState {
    pub fn new(body: Vec<Coord>, range: u32) -> Self {
        AgentState {
            position: body.first().copied().unwrap_or(Coord::new(0, 0)),
            heading: None,
            body,
            sight: Sight::new(),
            range,
            mode: Mode::Exploration,
            eat_super_food: false,
        }
    }

    pub fn size(&self) -> usize {
        self.body.len()
    }

    pub fn tail(&self) -> Option<Coord> {
        self.body.last().copied()
    }

    /// Replaces position, body, sight and range; heading follows the first two segments
    pub fn update(&mut self, body: Vec<Coord>, sight: Sight, range: u32, grid_size: (i32, i32)) {
        if let Some(&head) = body.first() {
            self.position = head;
        }
        self.heading = match (body.get(1), body.first()) {
            (Some(&neck), Some(&head)) => Direction::between(neck, head, grid_size.0, grid_size.1),
            _ => None,
        };
        self.body = body;
        self.sight = sight;
        self.range = range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_comes_from_neck_to_head() {
        let mut agent = AgentState::new(vec![Coord::new(2, 2)], 3);
        assert_eq!(agent.heading, None);

        agent.update(vec![Coord::new(3, 2), Coord::new(2, 2)], Sight::new(), 3, (10, 10));
        assert_eq!(agent.heading, Some(Direction::East));
        assert_eq!(agent.position, Coord::new(3, 2));

        agent.update(vec![Coord::new(3, 9), Coord::new(3, 0)], Sight::new(), 4, (10, 10));
        assert_eq!(agent.heading, Some(Direction::North));
        assert_eq!(agent.range, 4);
        assert_eq!(agent.tail(), Some(Coord::new(3, 0)));
    }
}
