use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AgentId, Position};

/// Something observable that happened during a tick.
///
/// Events are emitted in the order they occur: assignments first, then motion
/// denials, the deadlock alert, moves, and finally pickups and deliveries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// An idle agent claimed a pickup and received a route to it.
    Assigned { agent: AgentId, pickup: Position },
    /// The intended cell was already granted to a higher-priority agent.
    Waiting { agent: AgentId, cell: Position },
    /// The intended cell is held by an agent that is not leaving it.
    Blocked {
        agent: AgentId,
        cell: Position,
        by: AgentId,
    },
    /// No agent with a pending move could move this tick.
    Deadlock { pending: usize },
    Moved {
        agent: AgentId,
        from: Position,
        to: Position,
    },
    PickedUp { agent: AgentId, at: Position },
    Delivered { agent: AgentId, at: Position },
    /// A loaded agent has no route to any delivery point.
    Stalled { agent: AgentId, at: Position },
}

impl Event {
    /// The agent this event is about, if any.
    pub fn agent(&self) -> Option<AgentId> {
        match self {
            Event::Assigned { agent, .. }
            | Event::Waiting { agent, .. }
            | Event::Blocked { agent, .. }
            | Event::Moved { agent, .. }
            | Event::PickedUp { agent, .. }
            | Event::Delivered { agent, .. }
            | Event::Stalled { agent, .. } => Some(*agent),
            Event::Deadlock { .. } => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Assigned { agent, pickup } => {
                write!(f, "{agent} assigned: fetch item at {pickup}")
            }
            Event::Waiting { agent, cell } => {
                write!(f, "{agent} waits: {cell} reserved by a higher-priority agent")
            }
            Event::Blocked { agent, cell, by } => {
                write!(f, "{agent} blocked: {by} is holding {cell}")
            }
            Event::Deadlock { pending } => {
                write!(f, "DEADLOCK: none of {pending} pending moves could proceed")
            }
            Event::Moved { agent, from, to } => write!(f, "{agent} moved {from} -> {to}"),
            Event::PickedUp { agent, at } => write!(f, "{agent} picked up the item at {at}"),
            Event::Delivered { agent, at } => write!(f, "{agent} delivered at {at}"),
            Event::Stalled { agent, at } => {
                write!(f, "{agent} stalled at {at}: no route to a delivery point")
            }
        }
    }
}
