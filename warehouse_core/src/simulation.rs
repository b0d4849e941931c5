//! The tick loop: assign, move, then advance agent lifecycles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    AgentId, Position,
    agent::{Agent, AgentStatus},
    assign::TaskAssigner,
    event::Event,
    layout::{Layout, LayoutError},
    motion::MotionCoordinator,
    observer::TickObserver,
    pathfinding::{PathFinder, Route},
    world::GridWorld,
};

/// Which delivery point a loaded agent heads for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Always the first delivery point in row-major order.
    #[default]
    First,
    /// The reachable delivery point closest by manhattan distance.
    Nearest,
}

/// Tunables for a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    pub delivery_policy: DeliveryPolicy,
    /// Upper bound on ticks for [`Simulation::run`]. `None` runs until done.
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    #[error("Tick limit of {limit} reached with {remaining} item(s) still undelivered")]
    TickLimitExceeded { limit: u64, remaining: usize },
}

/// Read-only view of one agent at the end of a tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub position: Position,
    pub status: AgentStatus,
    /// Claimed pickup while fetching, final route cell while delivering.
    pub destination: Option<Position>,
    pub remaining_steps: usize,
}

impl From<&Agent> for AgentSnapshot {
    fn from(agent: &Agent) -> Self {
        let destination = match agent.status() {
            AgentStatus::MovingToPickup => agent.target(),
            AgentStatus::MovingToDelivery => agent.route().back().copied(),
            AgentStatus::Idle | AgentStatus::Done => None,
        };
        AgentSnapshot {
            id: agent.id(),
            position: agent.position(),
            status: agent.status(),
            destination,
            remaining_steps: agent.route().len(),
        }
    }
}

/// The frame produced by one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickReport {
    /// Zero-based index of the tick that produced this report.
    pub tick: u64,
    pub agents: Vec<AgentSnapshot>,
    pub pickups: Vec<Position>,
    pub events: Vec<Event>,
    pub complete: bool,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: u64,
    pub delivered: usize,
    pub deadlock_ticks: u64,
}

/// The whole mutable state of a warehouse run.
#[derive(Debug, Clone)]
pub struct Simulation {
    world: GridWorld,
    /// Fleet order: ascending id. Assignment walks this order.
    agents: Vec<Agent>,
    pickups: BTreeSet<Position>,
    deliveries: Vec<Position>,
    options: SimulationOptions,
    coordinator: MotionCoordinator,
    tick: u64,
    delivered: usize,
    deadlock_ticks: u64,
}

impl Simulation {
    pub fn new(layout: Layout, options: SimulationOptions) -> Self {
        let agents = layout
            .agents
            .iter()
            .map(|&(id, position)| Agent::new(id, position))
            .collect();
        Simulation {
            world: layout.world,
            agents,
            pickups: layout.pickups,
            deliveries: layout.deliveries,
            options,
            coordinator: MotionCoordinator::new(),
            tick: 0,
            delivered: 0,
            deadlock_ticks: 0,
        }
    }

    /// Parses `map` and builds a simulation from it.
    pub fn from_map(map: &str, options: SimulationOptions) -> Result<Self, LayoutError> {
        Ok(Simulation::new(Layout::parse(map)?, options))
    }

    pub fn world(&self) -> &GridWorld {
        &self.world
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn pickups(&self) -> &BTreeSet<Position> {
        &self.pickups
    }

    pub fn deliveries(&self) -> &[Position] {
        &self.deliveries
    }

    /// Number of ticks executed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// True once no items remain and no agent is mid-task.
    pub fn is_complete(&self) -> bool {
        self.pickups.is_empty() && !self.agents.iter().any(|agent| agent.status().is_busy())
    }

    /// Runs a single tick and returns the resulting frame.
    pub fn step(&mut self) -> TickReport {
        let tick = self.tick;
        let mut events = Vec::new();
        debug!(tick, "tick started");

        let finder = PathFinder::new(&self.world);
        TaskAssigner::new(finder).assign(&mut self.agents, &self.pickups, &mut events);

        let before = events.len();
        self.coordinator.step(&mut self.agents, &mut events);
        if events[before..]
            .iter()
            .any(|event| matches!(event, Event::Deadlock { .. }))
        {
            self.deadlock_ticks += 1;
        }

        self.advance_lifecycles(&mut events);

        self.tick += 1;
        TickReport {
            tick,
            agents: self.agents.iter().map(AgentSnapshot::from).collect(),
            pickups: self.pickups.iter().copied().collect(),
            events,
            complete: self.is_complete(),
        }
    }

    /// Runs until complete, reporting every tick to `observer`.
    ///
    /// Fails only when `max_ticks` is configured and exhausted first.
    pub fn run<O: TickObserver + ?Sized>(
        &mut self,
        observer: &mut O,
    ) -> Result<RunSummary, SimulationError> {
        while !self.is_complete() {
            if let Some(limit) = self.options.max_ticks.filter(|limit| self.tick >= *limit) {
                warn!(limit, remaining = self.pickups.len(), "tick limit reached");
                return Err(SimulationError::TickLimitExceeded {
                    limit,
                    remaining: self.pickups.len(),
                });
            }
            let report = self.step();
            observer.on_tick(&report);
        }

        info!(ticks = self.tick, delivered = self.delivered, "simulation complete");
        observer.on_complete(self.tick);
        Ok(RunSummary {
            ticks: self.tick,
            delivered: self.delivered,
            deadlock_ticks: self.deadlock_ticks,
        })
    }

    /// Handles agents whose route ran out this tick.
    fn advance_lifecycles(&mut self, events: &mut Vec<Event>) {
        let finder = PathFinder::new(&self.world);
        let policy = self.options.delivery_policy;

        for agent in self.agents.iter_mut().filter(|agent| agent.route().is_empty()) {
            let at = agent.position();
            match agent.status() {
                AgentStatus::MovingToPickup => {
                    self.pickups.remove(&at);
                    let item = agent.pick_up().unwrap_or(at);
                    info!(agent = %agent.id(), at = %item, "item picked up");
                    events.push(Event::PickedUp {
                        agent: agent.id(),
                        at: item,
                    });
                    route_to_delivery(agent, &finder, &self.deliveries, policy, events);
                }
                AgentStatus::MovingToDelivery if self.deliveries.contains(&at) => {
                    agent.deliver();
                    self.delivered += 1;
                    info!(agent = %agent.id(), %at, "delivery complete");
                    events.push(Event::Delivered {
                        agent: agent.id(),
                        at,
                    });
                }
                AgentStatus::MovingToDelivery => {
                    route_to_delivery(agent, &finder, &self.deliveries, policy, events);
                }
                AgentStatus::Idle | AgentStatus::Done => {}
            }
        }
    }
}

/// Installs a route to a delivery point, or reports the agent as stalled.
fn route_to_delivery(
    agent: &mut Agent,
    finder: &PathFinder<'_>,
    deliveries: &[Position],
    policy: DeliveryPolicy,
    events: &mut Vec<Event>,
) {
    let at = agent.position();
    let route: Option<Route> = match policy {
        DeliveryPolicy::First => deliveries
            .first()
            .and_then(|&point| finder.find_path(at, point)),
        DeliveryPolicy::Nearest => {
            let mut candidates = deliveries.to_vec();
            candidates.sort_by_key(|point| (at.manhattan(point), *point));
            candidates
                .into_iter()
                .find_map(|point| finder.find_path(at, point))
        }
    };

    match route {
        Some(route) => agent.set_route(route),
        None => {
            warn!(agent = %agent.id(), %at, "no route to a delivery point");
            events.push(Event::Stalled {
                agent: agent.id(),
                at,
            });
        }
    }
}
