//! Character-map loading.
//!
//! A layout is a rectangular block of glyphs, one per cell:
//!
//! ```text
//! #R.......S#
//! #I.......I#
//! ####.E#####
//! ```
//!
//! `#` is a wall, `.` free floor, `I` an item to collect, `E` a delivery
//! point. Any other uppercase ASCII letter or digit places the agent with that
//! id. Agent, item and delivery cells are floor underneath.

use std::collections::BTreeSet;

use crate::{
    AgentId, Position,
    map::{Grid, GridError},
    world::{CellKind, GridWorld},
};

pub const WALL: char = '#';
pub const FREE: char = '.';
pub const PICKUP: char = 'I';
pub const DELIVERY: char = 'E';

/// Reasons a map cannot be turned into a simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("Map is empty")]
    Empty,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map glyph '{glyph}' at position ({x}, {y})")]
    UnknownGlyph { glyph: char, x: usize, y: usize },
    #[error("Agent '{id}' appears more than once (again at {at})")]
    DuplicateAgent { id: AgentId, at: Position },
    #[error("Map contains no agents")]
    NoAgents,
    #[error("Map has {pickups} item(s) but no delivery point")]
    NoDeliveryPoint { pickups: usize },
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// A parsed map: the static world plus initial dynamic entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub world: GridWorld,
    /// Agents in ascending id order.
    pub agents: Vec<(AgentId, Position)>,
    pub pickups: BTreeSet<Position>,
    /// Delivery points in row-major order.
    pub deliveries: Vec<Position>,
}

impl Layout {
    /// Parses a map string.
    pub fn parse(map: &str) -> Result<Layout, LayoutError> {
        let rows: Vec<Vec<char>> = map
            .trim()
            .lines()
            .map(|line| line.trim().chars().collect())
            .collect();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(LayoutError::Empty);
        }
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != width)
        {
            return Err(LayoutError::Ragged {
                row,
                expected: width,
                found,
            });
        }

        let height = rows.len();
        let mut agents: Vec<(AgentId, Position)> = Vec::new();
        let mut pickups = BTreeSet::new();
        let mut deliveries = Vec::new();
        let mut cells = Grid::filled(width, height, CellKind::Free);

        for (y, row) in rows.iter().enumerate() {
            for (x, &glyph) in row.iter().enumerate() {
                let position = Position { x, y };
                match glyph {
                    WALL => cells.set(position, CellKind::Wall)?,
                    FREE => {}
                    PICKUP => {
                        pickups.insert(position);
                    }
                    DELIVERY => deliveries.push(position),
                    other => {
                        let id = AgentId::from_glyph(other)
                            .ok_or(LayoutError::UnknownGlyph { glyph: other, x, y })?;
                        if agents.iter().any(|(known, _)| *known == id) {
                            return Err(LayoutError::DuplicateAgent { id, at: position });
                        }
                        agents.push((id, position));
                    }
                }
            }
        }

        if agents.is_empty() {
            return Err(LayoutError::NoAgents);
        }
        if deliveries.is_empty() && !pickups.is_empty() {
            return Err(LayoutError::NoDeliveryPoint {
                pickups: pickups.len(),
            });
        }
        agents.sort_by_key(|(id, _)| *id);

        Ok(Layout {
            world: GridWorld::new(cells),
            agents,
            pickups,
            deliveries,
        })
    }
}
