use std::{cmp::Ordering, fmt};

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod assign;
pub mod event;
pub mod generate;
pub mod layout;
pub mod map;
pub mod motion;
pub mod observer;
pub mod pathfinding;
pub mod simulation;
pub mod world;

#[cfg(test)]
mod tests;

/// Represents a 2D coordinate.
///
/// Positions order row-major (by `y`, then `x`), so ordered sets of positions
/// enumerate in map reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the manhattan distance between two positions.
    pub fn manhattan(&self, other: &Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Returns the position offset by `(dx, dy)`, or `None` on underflow.
    pub fn offset(&self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Opaque identifier of a fleet member.
///
/// Identifiers are totally ordered; that order is the motion priority (lower
/// moves first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(char);

impl AgentId {
    /// Creates an id from a map glyph. Returns `None` for glyphs that cannot
    /// name an agent.
    pub fn from_glyph(glyph: char) -> Option<Self> {
        let reserved = matches!(
            glyph,
            layout::WALL | layout::FREE | layout::PICKUP | layout::DELIVERY
        );
        if !reserved && (glyph.is_ascii_uppercase() || glyph.is_ascii_digit()) {
            Some(AgentId(glyph))
        } else {
            None
        }
    }

    pub fn glyph(&self) -> char {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
