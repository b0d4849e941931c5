//! Seeded random warehouse maps.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};

use crate::{
    Position,
    layout::{DELIVERY, FREE, PICKUP, WALL},
    map::Grid,
    world::{CellKind, GridWorld},
};

/// Glyphs handed out to generated agents, letters first. Motion priority
/// follows `AgentId` order, where digits rank ahead of letters.
const AGENT_GLYPHS: &str = "ABCDFGHJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    #[error("Map of {width}x{height} is too small, both sides must be at least 3")]
    TooSmall { width: usize, height: usize },
    #[error("At most {max} agents are supported, {requested} requested")]
    TooManyAgents { requested: usize, max: usize },
    #[error("Wall density {0} is outside [0, 1)")]
    InvalidDensity(f64),
    #[error("Only {available} connected free cells for {needed} agents and items")]
    NotEnoughSpace { needed: usize, available: usize },
}

/// Shape of a generated map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub width: usize,
    pub height: usize,
    pub agents: usize,
    pub pickups: usize,
    /// Probability that an interior cell becomes a wall.
    pub wall_density: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            width: 16,
            height: 10,
            agents: 3,
            pickups: 3,
            wall_density: 0.15,
        }
    }
}

/// Builds a walled room with scattered interior walls and returns it as a
/// map string.
///
/// The delivery point, agents and items are all placed inside the largest
/// connected region, so every item in the result can be fetched and
/// delivered. The same config and seed always produce the same map.
pub fn generate_layout(config: &GeneratorConfig, seed: u64) -> Result<String, GenerateError> {
    let GeneratorConfig {
        width,
        height,
        agents,
        pickups,
        wall_density,
    } = *config;
    if width < 3 || height < 3 {
        return Err(GenerateError::TooSmall { width, height });
    }
    let max_agents = AGENT_GLYPHS.len();
    if agents > max_agents {
        return Err(GenerateError::TooManyAgents {
            requested: agents,
            max: max_agents,
        });
    }
    if !(0.0..1.0).contains(&wall_density) {
        return Err(GenerateError::InvalidDensity(wall_density));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut glyphs = Grid::from_generator(width, height, |p| {
        let border = p.x == 0 || p.y == 0 || p.x == width - 1 || p.y == height - 1;
        if border || rng.random_bool(wall_density) {
            WALL
        } else {
            FREE
        }
    });

    let world = GridWorld::new(Grid::from_generator(width, height, |p| {
        if glyphs[p] == WALL {
            CellKind::Wall
        } else {
            CellKind::Free
        }
    }));
    let mut region = largest_region(&world);
    let needed = agents + pickups + 1;
    if region.len() < needed {
        return Err(GenerateError::NotEnoughSpace {
            needed,
            available: region.len(),
        });
    }

    region.shuffle(&mut rng);
    let Some((delivery, rest)) = region.split_first() else {
        return Err(GenerateError::NotEnoughSpace {
            needed,
            available: 0,
        });
    };
    glyphs[*delivery] = DELIVERY;
    for (position, glyph) in rest.iter().zip(AGENT_GLYPHS.chars()).take(agents) {
        glyphs[*position] = glyph;
    }
    for position in rest.iter().skip(agents).take(pickups) {
        glyphs[*position] = PICKUP;
    }

    let mut map = String::with_capacity((width + 1) * height);
    for y in 0..height {
        map.extend((0..width).map(|x| glyphs[Position { x, y }]));
        map.push('\n');
    }
    Ok(map)
}

/// The biggest 4-connected group of walkable cells. Ties keep the region
/// found first in row-major order.
fn largest_region(world: &GridWorld) -> Vec<Position> {
    let mut seen = Grid::filled(world.width(), world.height(), false);
    let mut best = Vec::new();
    for (start, kind) in world.cells() {
        if kind == CellKind::Wall || seen[start] {
            continue;
        }
        let region = flood_fill(world, start, &mut seen);
        if region.len() > best.len() {
            best = region;
        }
    }
    best
}

/// Breadth-first visit of every cell connected to `origin`, marking `seen`.
fn flood_fill(world: &GridWorld, origin: Position, seen: &mut Grid<bool>) -> Vec<Position> {
    let mut region = vec![origin];
    let mut queue = VecDeque::from([origin]);
    seen[origin] = true;
    while let Some(current) = queue.pop_front() {
        for next in world.neighbours(current) {
            if !seen[next] {
                seen[next] = true;
                region.push(next);
                queue.push_back(next);
            }
        }
    }
    region
}
