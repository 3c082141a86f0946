// Flood-fill reachability, used as a standalone probe and as the
// entrapment gate inside every planner

use std::collections::{HashSet, VecDeque};

use crate::types::{Coord, Direction};
use crate::world::WorldModel;

/// Counts distinct non-blocked cells reachable from `start`, including `start`.
///
/// With a `threshold` the count stops as soon as it reaches the threshold,
/// so the result is `min(true_count, threshold)`.
pub fn reachable_count(
    world: &WorldModel,
    start: Coord,
    heading: Option<Direction>,
    threshold: Option<usize>,
) -> usize {
    let mut visited = HashSet::new();
    let mut queue = VecDeque::new();
    queue.push_back((start, heading));
    let mut reachable = 0;

    while let Some((current, dir)) = queue.pop_front() {
        if !visited.insert(current) {
            continue;
        }
        reachable += 1;

        if threshold.map_or(false, |t| reachable >= t) {
            return reachable;
        }

        for (next, next_dir) in world.neighbours(current, dir) {
            if !visited.contains(&next) {
                queue.push_back((next, Some(next_dir)));
            }
        }
    }

    reachable
}
