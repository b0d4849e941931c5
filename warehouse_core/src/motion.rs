//! Per-tick movement arbitration.
//!
//! Every active agent with a non-empty route intends to step onto the head of
//! that route. Intents are granted in ascending [`AgentId`] order:
//!
//! 1. a cell already granted this tick makes the agent wait;
//! 2. a cell held by an agent with no intent of its own blocks the agent;
//! 3. a cell held by an agent that wants to step into the mover's cell (a
//!    head-on swap) blocks the agent;
//! 4. otherwise the move is granted and the cell reserved.
//!
//! Occupants with an intent are assumed to vacate. A settling pass then
//! revokes any grant whose target is still held by an agent that ended up not
//! moving, repeating until stable, so no two active agents ever share a cell.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::{AgentId, Position, agent::Agent, event::Event};

/// A granted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub agent: AgentId,
    pub from: Position,
    pub to: Position,
}

/// The outcome of arbitration for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotionPlan {
    /// Granted moves in priority order.
    pub moves: Vec<Move>,
    /// Wait, blocked and deadlock events, in the order they were decided.
    pub events: Vec<Event>,
    /// Number of agents that had an intent.
    pub pending: usize,
}

impl MotionPlan {
    /// At least one agent wanted to move and none could.
    pub fn is_deadlock(&self) -> bool {
        self.pending > 0 && self.moves.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MotionCoordinator;

impl MotionCoordinator {
    pub fn new() -> Self {
        MotionCoordinator
    }

    /// Decides which intents proceed this tick without mutating any agent.
    pub fn resolve(&self, agents: &[Agent]) -> MotionPlan {
        let intents: BTreeMap<AgentId, (Position, Position)> = agents
            .iter()
            .filter_map(|agent| Some((agent.id(), (agent.position(), agent.intent()?))))
            .collect();
        let occupants: HashMap<Position, AgentId> = agents
            .iter()
            .filter(|agent| agent.is_active())
            .map(|agent| (agent.position(), agent.id()))
            .collect();

        let mut plan = MotionPlan {
            pending: intents.len(),
            ..MotionPlan::default()
        };
        let mut reserved: HashSet<Position> = HashSet::new();
        let mut granted: BTreeMap<AgentId, Move> = BTreeMap::new();

        for (&agent, &(from, to)) in &intents {
            if reserved.contains(&to) {
                debug!(%agent, cell = %to, "waiting on reserved cell");
                plan.events.push(Event::Waiting { agent, cell: to });
                continue;
            }

            if let Some(&holder) = occupants.get(&to).filter(|holder| **holder != agent) {
                let vacating = intents
                    .get(&holder)
                    .is_some_and(|&(_, holder_to)| holder_to != from);
                if !vacating {
                    debug!(%agent, cell = %to, by = %holder, "blocked by occupant");
                    plan.events.push(Event::Blocked {
                        agent,
                        cell: to,
                        by: holder,
                    });
                    continue;
                }
            }

            reserved.insert(to);
            granted.insert(agent, Move { agent, from, to });
        }

        // A grant into a cell whose holder stays put must be withdrawn; that
        // can in turn strand whoever was following the withdrawn agent.
        loop {
            let stranded = granted.values().find_map(|granted_move| {
                let holder = *occupants.get(&granted_move.to)?;
                (holder != granted_move.agent && !granted.contains_key(&holder))
                    .then_some((granted_move.agent, granted_move.to, holder))
            });
            let Some((agent, cell, holder)) = stranded else {
                break;
            };
            debug!(%agent, %cell, by = %holder, "grant withdrawn, occupant did not move");
            granted.remove(&agent);
            plan.events.push(Event::Blocked {
                agent,
                cell,
                by: holder,
            });
        }

        plan.moves = granted.into_values().collect();
        if plan.is_deadlock() {
            warn!(pending = plan.pending, "deadlock: no agent could move");
            plan.events.push(Event::Deadlock {
                pending: plan.pending,
            });
        }
        plan
    }

    /// Resolves intents and applies the granted moves.
    ///
    /// Denied agents keep their full route and retry the same step next tick.
    /// Returns the number of agents that moved.
    pub fn step(&self, agents: &mut [Agent], events: &mut Vec<Event>) -> usize {
        let plan = self.resolve(agents);
        events.extend(plan.events);

        let mut moved = 0;
        for granted in &plan.moves {
            let Some(agent) = agents.iter_mut().find(|agent| agent.id() == granted.agent) else {
                continue;
            };
            if let Some((from, to)) = agent.advance() {
                events.push(Event::Moved {
                    agent: granted.agent,
                    from,
                    to,
                });
                moved += 1;
            }
        }
        moved
    }
}
