//! Nearest-unclaimed-pickup task assignment.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::{
    Position,
    agent::{Agent, AgentStatus},
    event::Event,
    pathfinding::PathFinder,
};

/// Hands idle agents the closest pickup nobody else has claimed.
#[derive(Debug, Clone, Copy)]
pub struct TaskAssigner<'a> {
    finder: PathFinder<'a>,
}

impl<'a> TaskAssigner<'a> {
    pub fn new(finder: PathFinder<'a>) -> Self {
        TaskAssigner { finder }
    }

    /// Runs one assignment pass over `agents` in slice order.
    ///
    /// Candidates are ranked by manhattan distance; ties go to the first
    /// pickup in row-major order. An agent whose chosen pickup is unreachable
    /// stays idle and is retried on the next pass. Returns the number of
    /// assignments made.
    pub fn assign(
        &self,
        agents: &mut [Agent],
        pickups: &BTreeSet<Position>,
        events: &mut Vec<Event>,
    ) -> usize {
        let mut claimed: HashSet<Position> = agents.iter().filter_map(Agent::target).collect();
        let mut assigned = 0;

        for agent in agents
            .iter_mut()
            .filter(|agent| agent.status() == AgentStatus::Idle)
        {
            let origin = agent.position();
            let Some(pickup) = pickups
                .iter()
                .filter(|pickup| !claimed.contains(*pickup))
                .min_by_key(|pickup| origin.manhattan(pickup))
                .copied()
            else {
                break;
            };

            match self.finder.find_path(origin, pickup) {
                Some(route) => {
                    info!(agent = %agent.id(), %pickup, steps = route.len(), "task assigned");
                    agent.assign(pickup, route);
                    claimed.insert(pickup);
                    events.push(Event::Assigned {
                        agent: agent.id(),
                        pickup,
                    });
                    assigned += 1;
                }
                None => {
                    debug!(agent = %agent.id(), %pickup, "pickup unreachable, staying idle");
                }
            }
        }

        assigned
    }
}
