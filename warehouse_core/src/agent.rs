use serde::{Deserialize, Serialize};

use crate::{AgentId, Position, pathfinding::Route};

/// Lifecycle of a fleet member.
///
/// `Idle` is initial and `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    Idle,
    MovingToPickup,
    MovingToDelivery,
    Done,
}

impl AgentStatus {
    /// Whether an agent in this status is still mid-task.
    pub fn is_busy(self) -> bool {
        matches!(self, AgentStatus::MovingToPickup | AgentStatus::MovingToDelivery)
    }
}

/// A single robot: where it is, where it is going and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    position: Position,
    status: AgentStatus,
    /// Claimed pickup, only set while `MovingToPickup`.
    target: Option<Position>,
    route: Route,
}

impl Agent {
    pub fn new(id: AgentId, position: Position) -> Self {
        Agent {
            id,
            position,
            status: AgentStatus::Idle,
            target: None,
            route: Route::new(),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Done agents are inert: they neither move nor occupy cells.
    pub fn is_active(&self) -> bool {
        self.status != AgentStatus::Done
    }

    /// The cell this agent wants to enter this tick, if any.
    pub fn intent(&self) -> Option<Position> {
        if self.is_active() {
            self.route.front().copied()
        } else {
            None
        }
    }

    /// Idle → MovingToPickup.
    pub(crate) fn assign(&mut self, pickup: Position, route: Route) {
        debug_assert_eq!(self.status, AgentStatus::Idle);
        self.status = AgentStatus::MovingToPickup;
        self.target = Some(pickup);
        self.route = route;
    }

    /// Consumes the head of the route. Returns `(from, to)`.
    pub(crate) fn advance(&mut self) -> Option<(Position, Position)> {
        let next = self.route.pop_front()?;
        let from = std::mem::replace(&mut self.position, next);
        Some((from, next))
    }

    /// MovingToPickup → MovingToDelivery. Returns the released claim.
    pub(crate) fn pick_up(&mut self) -> Option<Position> {
        debug_assert_eq!(self.status, AgentStatus::MovingToPickup);
        self.status = AgentStatus::MovingToDelivery;
        self.target.take()
    }

    pub(crate) fn set_route(&mut self, route: Route) {
        self.route = route;
    }

    /// MovingToDelivery → Done.
    pub(crate) fn deliver(&mut self) {
        debug_assert_eq!(self.status, AgentStatus::MovingToDelivery);
        self.status = AgentStatus::Done;
        self.route.clear();
    }

    #[cfg(test)]
    pub(crate) fn with_route(
        id: AgentId,
        position: Position,
        status: AgentStatus,
        route: &[Position],
    ) -> Self {
        Agent {
            id,
            position,
            status,
            target: None,
            route: route.iter().copied().collect(),
        }
    }
}
