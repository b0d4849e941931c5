use serde::{Deserialize, Serialize};

use crate::{Position, map::Grid};

/// Static kind of a cell in the world grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Free,
    Wall,
}

/// Neighbour offsets, in expansion order.
pub const DIRECTIONS: [(isize, isize); 4] = [
    (0, 1),  // Down
    (0, -1), // Up
    (1, 0),  // Right
    (-1, 0), // Left
];

/// The immutable obstacle map.
///
/// Only walls live here. Agents, pickups and delivery points are dynamic and
/// owned by the simulation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    cells: Grid<CellKind>,
}

impl GridWorld {
    pub fn new(cells: Grid<CellKind>) -> Self {
        GridWorld { cells }
    }

    /// An obstacle-free world.
    pub fn open(width: usize, height: usize) -> Self {
        GridWorld {
            cells: Grid::filled(width, height, CellKind::Free),
        }
    }

    pub fn width(&self) -> usize {
        self.cells.width()
    }

    pub fn height(&self) -> usize {
        self.cells.height()
    }

    /// True iff `position` is in bounds and not a wall.
    pub fn is_walkable(&self, position: Position) -> bool {
        matches!(self.cells.get(position), Some(CellKind::Free))
    }

    /// Walkable 4-neighbours of `position`, in [`DIRECTIONS`] order.
    pub fn neighbours(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        DIRECTIONS
            .iter()
            .filter_map(move |&(dx, dy)| position.offset(dx, dy))
            .filter(|next| self.is_walkable(*next))
    }

    /// Iterates over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Position, CellKind)> + '_ {
        self.cells.enumerate().map(|(position, kind)| (position, *kind))
    }
}
