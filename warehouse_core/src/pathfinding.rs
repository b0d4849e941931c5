//! A* search over the 4-connected grid.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque},
};

use tracing::trace;

use crate::{Position, world::GridWorld};

/// Remaining cells to traverse, excluding the current position.
pub type Route = VecDeque<Position>;

/// Frontier entry. Lower f-score pops first; equal f-scores pop in insertion
/// order.
#[derive(Clone, Eq, PartialEq)]
struct FrontierItem {
    priority: usize,
    sequence: u64,
    position: Position,
}

impl Ord for FrontierItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for FrontierItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest-path search on a [`GridWorld`] with unit step cost and a
/// manhattan heuristic.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    world: &'a GridWorld,
}

impl<'a> PathFinder<'a> {
    pub fn new(world: &'a GridWorld) -> Self {
        PathFinder { world }
    }

    /// Finds a shortest route from `start` to `goal`.
    ///
    /// The route excludes `start` and ends with `goal`; it is empty when the
    /// two coincide. Returns `None` when the goal is not walkable or cannot be
    /// reached.
    pub fn find_path(&self, start: Position, goal: Position) -> Option<Route> {
        if !self.world.is_walkable(goal) {
            trace!(%start, %goal, "goal is not walkable");
            return None;
        }
        if start == goal {
            return Some(Route::new());
        }

        let mut frontier = BinaryHeap::new();
        let mut came_from: HashMap<Position, Position> = HashMap::new();
        let mut cost_so_far: HashMap<Position, usize> = HashMap::new();
        let mut sequence = 0u64;

        frontier.push(FrontierItem {
            priority: start.manhattan(&goal),
            sequence,
            position: start,
        });
        cost_so_far.insert(start, 0);

        let mut expanded = 0usize;
        let mut goal_reached = false;

        while let Some(FrontierItem {
            priority,
            position: current,
            ..
        }) = frontier.pop()
        {
            let current_cost = cost_so_far[&current];
            // Stale entry superseded by a cheaper push
            if current_cost + current.manhattan(&goal) < priority {
                continue;
            }
            if current == goal {
                goal_reached = true;
                break;
            }
            expanded += 1;

            for neighbour in self.world.neighbours(current) {
                let new_cost = current_cost + 1;
                if cost_so_far
                    .get(&neighbour)
                    .is_none_or(|&known| new_cost < known)
                {
                    cost_so_far.insert(neighbour, new_cost);
                    came_from.insert(neighbour, current);
                    sequence += 1;
                    frontier.push(FrontierItem {
                        priority: new_cost + neighbour.manhattan(&goal),
                        sequence,
                        position: neighbour,
                    });
                }
            }
        }

        if !goal_reached {
            trace!(%start, %goal, expanded, "no path");
            return None;
        }

        // Walk back from the goal, stopping before the start cell
        let mut route = Route::new();
        let mut current = goal;
        while current != start {
            route.push_front(current);
            current = *came_from.get(&current)?;
        }
        trace!(%start, %goal, expanded, length = route.len(), "path found");
        Some(route)
    }
}
