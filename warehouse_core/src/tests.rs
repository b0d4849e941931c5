//! Unit and scenario tests for warehouse_core.
//!
//! Maps are written inline with the loader's glyphs so each scenario reads
//! like the warehouse it describes.

#[cfg(test)]
mod helpers {
    use crate::{AgentId, Position};

    pub fn id(glyph: char) -> AgentId {
        AgentId::from_glyph(glyph).expect("valid agent glyph")
    }

    pub fn p(x: usize, y: usize) -> Position {
        Position::new(x, y)
    }

    /// The reference warehouse: two robots, two items, one shared exit.
    pub const WAREHOUSE: &str = "
        #R.......S#
        #.........#
        #.........#
        #I.......I#
        #####.#####
        #....E....#
        ###########
    ";
}

// ── Grid & world ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod world {
    use super::helpers::p;
    use crate::{
        map::{Grid, GridError},
        world::{CellKind, GridWorld},
    };

    #[test]
    fn grid_enumerates_row_major() {
        let grid = Grid::from_generator(2, 2, |pos| pos.x + 10 * pos.y);
        let cells: Vec<_> = grid.enumerate().map(|(pos, v)| (pos, *v)).collect();
        assert_eq!(
            cells,
            vec![(p(0, 0), 0), (p(1, 0), 1), (p(0, 1), 10), (p(1, 1), 11)]
        );
    }

    #[test]
    fn grid_set_out_of_bounds() {
        let mut grid = Grid::filled(3, 2, 0u8);
        assert!(grid.set(p(2, 1), 7).is_ok());
        assert_eq!(grid[p(2, 1)], 7);
        assert_eq!(
            grid.set(p(3, 0), 1),
            Err(GridError::OutOfBounds {
                position: p(3, 0),
                width: 3,
                height: 2
            })
        );
    }

    #[test]
    fn walkability() {
        let mut cells = Grid::filled(3, 3, CellKind::Free);
        cells[p(1, 1)] = CellKind::Wall;
        let world = GridWorld::new(cells);
        assert!(world.is_walkable(p(0, 0)));
        assert!(!world.is_walkable(p(1, 1)));
        assert!(!world.is_walkable(p(3, 0)));
        assert!(!world.is_walkable(p(0, 3)));
    }

    #[test]
    fn neighbours_skip_walls_and_edges() {
        let mut cells = Grid::filled(3, 3, CellKind::Free);
        cells[p(1, 0)] = CellKind::Wall;
        let world = GridWorld::new(cells);
        let around_origin: Vec<_> = world.neighbours(p(0, 0)).collect();
        assert_eq!(around_origin, vec![p(0, 1)]);
        let around_centre: Vec<_> = world.neighbours(p(1, 1)).collect();
        assert_eq!(around_centre, vec![p(1, 2), p(2, 1), p(0, 1)]);
    }

    #[test]
    fn position_order_is_row_major() {
        assert!(p(5, 0) < p(0, 1));
        assert!(p(0, 1) < p(1, 1));
        assert_eq!(p(1, 4).manhattan(&p(3, 1)), 5);
    }
}

// ── Layout loading ────────────────────────────────────────────────────────────

#[cfg(test)]
mod layout {
    use super::helpers::{WAREHOUSE, id, p};
    use crate::{
        layout::{Layout, LayoutError},
        world::CellKind,
    };

    #[test]
    fn parses_reference_warehouse() {
        let layout = Layout::parse(WAREHOUSE).unwrap();
        assert_eq!(layout.world.width(), 11);
        assert_eq!(layout.world.height(), 7);
        assert_eq!(layout.agents, vec![(id('R'), p(1, 0)), (id('S'), p(9, 0))]);
        assert_eq!(
            layout.pickups.iter().copied().collect::<Vec<_>>(),
            vec![p(1, 3), p(9, 3)]
        );
        assert_eq!(layout.deliveries, vec![p(5, 5)]);
        // Entity glyphs sit on floor
        assert!(layout.world.is_walkable(p(1, 0)));
        assert!(layout.world.is_walkable(p(1, 3)));
        assert!(layout.world.is_walkable(p(5, 5)));
        assert!(!layout.world.is_walkable(p(4, 4)));
    }

    #[test]
    fn agents_sorted_by_id() {
        let layout = Layout::parse("S.R\nI.E").unwrap();
        assert_eq!(layout.agents, vec![(id('R'), p(2, 0)), (id('S'), p(0, 0))]);
    }

    #[test]
    fn walls_land_on_their_glyphs() {
        let layout = Layout::parse("#A.\n.#E").unwrap();
        let walls: Vec<_> = layout
            .world
            .cells()
            .filter(|(_, kind)| *kind == CellKind::Wall)
            .map(|(pos, _)| pos)
            .collect();
        assert_eq!(walls, vec![p(0, 0), p(1, 1)]);
    }

    #[test]
    fn digit_agents_rank_ahead_of_letters() {
        let layout = Layout::parse("A.1\n.E.").unwrap();
        assert_eq!(layout.agents, vec![(id('1'), p(2, 0)), (id('A'), p(0, 0))]);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(Layout::parse("  \n \n"), Err(LayoutError::Empty));
    }

    #[test]
    fn rejects_ragged_rows() {
        assert_eq!(
            Layout::parse("A..\n..\nE.I"),
            Err(LayoutError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn rejects_unknown_glyph() {
        assert_eq!(
            Layout::parse("A.?\n.EI"),
            Err(LayoutError::UnknownGlyph {
                glyph: '?',
                x: 2,
                y: 0
            })
        );
    }

    #[test]
    fn rejects_duplicate_agent() {
        assert_eq!(
            Layout::parse("A.A\n.EI"),
            Err(LayoutError::DuplicateAgent {
                id: id('A'),
                at: p(2, 0)
            })
        );
    }

    #[test]
    fn rejects_missing_agents() {
        assert_eq!(Layout::parse("..I\n..E"), Err(LayoutError::NoAgents));
    }

    #[test]
    fn rejects_items_without_delivery() {
        assert_eq!(
            Layout::parse("A.I\n..I"),
            Err(LayoutError::NoDeliveryPoint { pickups: 2 })
        );
    }
}

// ── Pathfinding ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod pathfinding {
    use super::helpers::p;
    use crate::{layout::Layout, pathfinding::PathFinder, world::GridWorld};

    #[test]
    fn straight_line() {
        let world = GridWorld::open(5, 1);
        let route = PathFinder::new(&world).find_path(p(0, 0), p(4, 0)).unwrap();
        assert_eq!(route, [p(1, 0), p(2, 0), p(3, 0), p(4, 0)]);
    }

    #[test]
    fn same_cell_is_empty_route() {
        let world = GridWorld::open(3, 3);
        let route = PathFinder::new(&world).find_path(p(1, 1), p(1, 1)).unwrap();
        assert!(route.is_empty());
    }

    #[test]
    fn detours_around_walls() {
        let layout = Layout::parse(
            "
            A.#..
            ..#..
            ....E
            ",
        )
        .unwrap();
        let route = PathFinder::new(&layout.world)
            .find_path(p(0, 0), p(4, 2))
            .unwrap();
        assert_eq!(route.len(), 6);
        assert_eq!(route.back(), Some(&p(4, 2)));
        assert!(route.iter().all(|cell| layout.world.is_walkable(*cell)));
    }

    #[test]
    fn sealed_goal_is_not_found() {
        let layout = Layout::parse(
            "
            A..#.
            ...#E
            ...##
            ",
        )
        .unwrap();
        assert_eq!(
            PathFinder::new(&layout.world).find_path(p(0, 0), p(4, 1)),
            None
        );
    }

    #[test]
    fn wall_or_outside_goal_is_not_found() {
        let layout = Layout::parse("A#E").unwrap();
        let finder = PathFinder::new(&layout.world);
        assert_eq!(finder.find_path(p(0, 0), p(1, 0)), None);
        assert_eq!(finder.find_path(p(0, 0), p(7, 0)), None);
    }

    #[test]
    fn repeated_searches_agree() {
        let world = GridWorld::open(6, 6);
        let finder = PathFinder::new(&world);
        let first = finder.find_path(p(0, 0), p(5, 5));
        assert_eq!(first.as_ref().map(|r| r.len()), Some(10));
        assert_eq!(first, finder.find_path(p(0, 0), p(5, 5)));
    }
}

// ── Task assignment ───────────────────────────────────────────────────────────

#[cfg(test)]
mod assign {
    use std::collections::BTreeSet;

    use super::helpers::{id, p};
    use crate::{
        agent::{Agent, AgentStatus},
        assign::TaskAssigner,
        event::Event,
        layout::Layout,
        pathfinding::PathFinder,
        world::GridWorld,
    };

    #[test]
    fn nearest_pickup_wins() {
        let world = GridWorld::open(6, 6);
        let mut agents = vec![Agent::new(id('A'), p(0, 0))];
        let pickups: BTreeSet<_> = [p(5, 5), p(1, 2)].into();
        let mut events = Vec::new();

        let assigner = TaskAssigner::new(PathFinder::new(&world));
        let made = assigner.assign(&mut agents, &pickups, &mut events);

        assert_eq!(made, 1);
        assert_eq!(agents[0].status(), AgentStatus::MovingToPickup);
        assert_eq!(agents[0].target(), Some(p(1, 2)));
        assert_eq!(agents[0].route().len(), 3);
        assert_eq!(
            events,
            vec![Event::Assigned {
                agent: id('A'),
                pickup: p(1, 2)
            }]
        );
    }

    #[test]
    fn distance_ties_resolve_row_major() {
        let world = GridWorld::open(5, 5);
        let mut agents = vec![Agent::new(id('A'), p(2, 2))];
        let pickups: BTreeSet<_> = [p(0, 2), p(2, 0), p(4, 2)].into();
        let mut events = Vec::new();
        let assigner = TaskAssigner::new(PathFinder::new(&world));
        assigner.assign(&mut agents, &pickups, &mut events);
        assert_eq!(agents[0].target(), Some(p(2, 0)));
    }

    #[test]
    fn one_pickup_is_claimed_once_per_pass() {
        let world = GridWorld::open(5, 1);
        let mut agents = vec![Agent::new(id('A'), p(0, 0)), Agent::new(id('B'), p(4, 0))];
        let pickups: BTreeSet<_> = [p(3, 0)].into();
        let mut events = Vec::new();

        let assigner = TaskAssigner::new(PathFinder::new(&world));
        let made = assigner.assign(&mut agents, &pickups, &mut events);

        // Fleet order, not proximity, decides who gets it
        assert_eq!(made, 1);
        assert_eq!(agents[0].target(), Some(p(3, 0)));
        assert_eq!(agents[1].status(), AgentStatus::Idle);
        assert_eq!(agents[1].target(), None);
    }

    #[test]
    fn claims_of_busy_agents_are_respected() {
        let world = GridWorld::open(5, 1);
        let mut agents = vec![Agent::new(id('A'), p(0, 0)), Agent::new(id('B'), p(4, 0))];
        let pickups: BTreeSet<_> = [p(1, 0), p(3, 0)].into();
        let assigner = TaskAssigner::new(PathFinder::new(&world));
        let mut events = Vec::new();

        assigner.assign(&mut agents[..1], &pickups, &mut events);
        assert_eq!(agents[0].target(), Some(p(1, 0)));

        assigner.assign(&mut agents, &pickups, &mut events);
        assert_eq!(agents[1].target(), Some(p(3, 0)));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn unreachable_pickup_leaves_agent_idle() {
        let layout = Layout::parse(
            "
            A..#I
            ...##
            ....E
            ",
        )
        .unwrap();
        let mut agents = vec![Agent::new(id('A'), p(0, 0))];
        let mut events = Vec::new();

        let made = TaskAssigner::new(PathFinder::new(&layout.world)).assign(
            &mut agents,
            &layout.pickups,
            &mut events,
        );

        assert_eq!(made, 0);
        assert_eq!(agents[0].status(), AgentStatus::Idle);
        assert_eq!(agents[0].target(), None);
        assert!(events.is_empty());
    }
}

// ── Motion arbitration ────────────────────────────────────────────────────────

#[cfg(test)]
mod motion {
    use std::collections::HashSet;

    use super::helpers::{id, p};
    use crate::{
        agent::{Agent, AgentStatus::*},
        event::Event,
        motion::{MotionCoordinator, Move},
    };

    #[test]
    fn free_moves_all_proceed() {
        let mut agents = vec![
            Agent::with_route(id('A'), p(0, 0), MovingToPickup, &[p(1, 0), p(2, 0)]),
            Agent::with_route(id('B'), p(0, 2), MovingToPickup, &[p(0, 3)]),
        ];
        let mut events = Vec::new();
        let moved = MotionCoordinator::new().step(&mut agents, &mut events);

        assert_eq!(moved, 2);
        assert_eq!(agents[0].position(), p(1, 0));
        assert_eq!(agents[0].route().len(), 1);
        assert_eq!(agents[1].position(), p(0, 3));
        assert_eq!(
            events,
            vec![
                Event::Moved {
                    agent: id('A'),
                    from: p(0, 0),
                    to: p(1, 0)
                },
                Event::Moved {
                    agent: id('B'),
                    from: p(0, 2),
                    to: p(0, 3)
                },
            ]
        );
    }

    #[test]
    fn shared_destination_goes_to_lower_id() {
        // B is listed first; priority comes from the id, not the slice order
        let mut agents = vec![
            Agent::with_route(id('B'), p(2, 1), MovingToPickup, &[p(1, 1), p(0, 1)]),
            Agent::with_route(id('A'), p(1, 0), MovingToPickup, &[p(1, 1)]),
        ];
        let mut events = Vec::new();
        MotionCoordinator::new().step(&mut agents, &mut events);

        assert_eq!(agents[1].position(), p(1, 1));
        assert_eq!(agents[0].position(), p(2, 1));
        assert_eq!(
            agents[0].route().iter().copied().collect::<Vec<_>>(),
            vec![p(1, 1), p(0, 1)]
        );
        assert_eq!(
            events,
            vec![
                Event::Waiting {
                    agent: id('B'),
                    cell: p(1, 1)
                },
                Event::Moved {
                    agent: id('A'),
                    from: p(1, 0),
                    to: p(1, 1)
                },
            ]
        );
    }

    #[test]
    fn stationary_occupant_blocks() {
        let agents = vec![
            Agent::with_route(id('A'), p(0, 0), MovingToPickup, &[p(1, 0)]),
            Agent::with_route(id('B'), p(1, 0), Idle, &[]),
        ];
        let plan = MotionCoordinator::new().resolve(&agents);
        assert!(plan.moves.is_empty());
        assert_eq!(
            plan.events,
            vec![
                Event::Blocked {
                    agent: id('A'),
                    cell: p(1, 0),
                    by: id('B')
                },
                Event::Deadlock { pending: 1 },
            ]
        );
    }

    #[test]
    fn vacating_occupant_hands_off_cell() {
        let agents = vec![
            Agent::with_route(id('A'), p(0, 0), MovingToPickup, &[p(1, 0)]),
            Agent::with_route(id('B'), p(1, 0), MovingToPickup, &[p(2, 0)]),
        ];
        let plan = MotionCoordinator::new().resolve(&agents);
        assert!(plan.events.is_empty());
        assert_eq!(
            plan.moves,
            vec![
                Move {
                    agent: id('A'),
                    from: p(0, 0),
                    to: p(1, 0)
                },
                Move {
                    agent: id('B'),
                    from: p(1, 0),
                    to: p(2, 0)
                },
            ]
        );
    }

    #[test]
    fn head_on_swap_is_blocked() {
        let mut agents = vec![
            Agent::with_route(id('A'), p(1, 0), MovingToDelivery, &[p(2, 0)]),
            Agent::with_route(id('B'), p(2, 0), MovingToDelivery, &[p(1, 0)]),
        ];
        let mut events = Vec::new();
        let moved = MotionCoordinator::new().step(&mut agents, &mut events);

        // Neither may pass through the other, so both stay and retry
        assert_eq!(moved, 0);
        assert_eq!(agents[0].position(), p(1, 0));
        assert_eq!(agents[1].position(), p(2, 0));
        assert_eq!(agents[0].route().len(), 1);
        assert_eq!(agents[1].route().len(), 1);
        assert_eq!(
            events,
            vec![
                Event::Blocked {
                    agent: id('A'),
                    cell: p(2, 0),
                    by: id('B')
                },
                Event::Blocked {
                    agent: id('B'),
                    cell: p(1, 0),
                    by: id('A')
                },
                Event::Deadlock { pending: 2 },
            ]
        );
    }

    #[test]
    fn grant_withdrawn_when_occupant_stays() {
        // A takes (2,0); B waits for it and so stays put; C was counting on B
        // leaving (1,0).
        let agents = vec![
            Agent::with_route(id('A'), p(2, 1), MovingToPickup, &[p(2, 0)]),
            Agent::with_route(id('B'), p(1, 0), MovingToPickup, &[p(2, 0)]),
            Agent::with_route(id('C'), p(0, 0), MovingToPickup, &[p(1, 0)]),
        ];
        let plan = MotionCoordinator::new().resolve(&agents);
        assert_eq!(
            plan.moves,
            vec![Move {
                agent: id('A'),
                from: p(2, 1),
                to: p(2, 0)
            }]
        );
        assert_eq!(
            plan.events,
            vec![
                Event::Waiting {
                    agent: id('B'),
                    cell: p(2, 0)
                },
                Event::Blocked {
                    agent: id('C'),
                    cell: p(1, 0),
                    by: id('B')
                },
            ]
        );
        assert!(!plan.is_deadlock());
    }

    #[test]
    fn withdrawal_cascades_down_a_queue() {
        // B waits behind A, so C cannot enter B's cell and D cannot enter C's.
        let mut agents = vec![
            Agent::with_route(id('A'), p(3, 1), MovingToPickup, &[p(3, 0)]),
            Agent::with_route(id('B'), p(2, 0), MovingToPickup, &[p(3, 0)]),
            Agent::with_route(id('C'), p(1, 0), MovingToPickup, &[p(2, 0)]),
            Agent::with_route(id('D'), p(0, 0), MovingToPickup, &[p(1, 0)]),
        ];
        let plan = MotionCoordinator::new().resolve(&agents);
        assert_eq!(
            plan.moves,
            vec![Move {
                agent: id('A'),
                from: p(3, 1),
                to: p(3, 0)
            }]
        );
        assert_eq!(
            plan.events,
            vec![
                Event::Waiting {
                    agent: id('B'),
                    cell: p(3, 0)
                },
                Event::Blocked {
                    agent: id('C'),
                    cell: p(2, 0),
                    by: id('B')
                },
                Event::Blocked {
                    agent: id('D'),
                    cell: p(1, 0),
                    by: id('C')
                },
            ]
        );

        let mut events = Vec::new();
        MotionCoordinator::new().step(&mut agents, &mut events);
        let cells: HashSet<_> = agents.iter().map(Agent::position).collect();
        assert_eq!(cells.len(), agents.len());
        assert_eq!(agents[3].position(), p(0, 0));
    }

    #[test]
    fn total_deadlock_reported_once() {
        let mut agents = vec![
            Agent::with_route(id('A'), p(0, 0), MovingToPickup, &[p(1, 0)]),
            Agent::with_route(id('B'), p(2, 0), MovingToPickup, &[p(1, 0)]),
            Agent::with_route(id('C'), p(1, 0), Idle, &[]),
        ];
        let before: Vec<_> = agents.iter().map(Agent::position).collect();
        let mut events = Vec::new();
        let moved = MotionCoordinator::new().step(&mut agents, &mut events);

        assert_eq!(moved, 0);
        let after: Vec<_> = agents.iter().map(Agent::position).collect();
        assert_eq!(before, after);
        let alerts = events
            .iter()
            .filter(|event| matches!(event, Event::Deadlock { .. }))
            .count();
        assert_eq!(alerts, 1);
        assert_eq!(events.last(), Some(&Event::Deadlock { pending: 2 }));
    }

    #[test]
    fn done_agents_neither_move_nor_block() {
        let agents = vec![
            Agent::with_route(id('A'), p(0, 0), MovingToDelivery, &[p(1, 0)]),
            Agent::with_route(id('B'), p(1, 0), Done, &[p(2, 0)]),
        ];
        let plan = MotionCoordinator::new().resolve(&agents);
        assert_eq!(plan.pending, 1);
        assert_eq!(plan.moves.len(), 1);
        assert_eq!(plan.moves[0].agent, id('A'));
    }

    #[test]
    fn no_intents_is_not_deadlock() {
        let agents = vec![Agent::with_route(id('A'), p(0, 0), Idle, &[])];
        let plan = MotionCoordinator::new().resolve(&agents);
        assert!(!plan.is_deadlock());
        assert!(plan.events.is_empty());
    }
}

// ── Simulation ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod simulation {
    use super::helpers::{WAREHOUSE, id, p};
    use crate::{
        agent::AgentStatus,
        event::Event,
        observer::{NoopObserver, Recorder},
        simulation::{DeliveryPolicy, Simulation, SimulationError, SimulationOptions},
    };

    const OPEN_ROOM: &str = "
        A....
        .I...
        .....
        ...E.
        .....
    ";

    #[test]
    fn single_agent_fetch_and_deliver() {
        let mut sim = Simulation::from_map(OPEN_ROOM, SimulationOptions::default()).unwrap();

        let first = sim.step();
        assert_eq!(
            first.events[0],
            Event::Assigned {
                agent: id('A'),
                pickup: p(1, 1)
            }
        );
        assert_eq!(first.agents[0].status, AgentStatus::MovingToPickup);

        let second = sim.step();
        assert_eq!(second.agents[0].position, p(1, 1));
        assert_eq!(second.agents[0].status, AgentStatus::MovingToDelivery);
        assert_eq!(second.agents[0].remaining_steps, 4);
        assert!(second.pickups.is_empty());
        assert!(second.events.contains(&Event::PickedUp {
            agent: id('A'),
            at: p(1, 1)
        }));

        for _ in 0..3 {
            let report = sim.step();
            assert_eq!(report.agents[0].status, AgentStatus::MovingToDelivery);
            assert!(!report.complete);
        }
        let last = sim.step();
        assert_eq!(last.tick, 5);
        assert_eq!(last.agents[0].position, p(3, 3));
        assert_eq!(last.agents[0].status, AgentStatus::Done);
        assert!(last.events.contains(&Event::Delivered {
            agent: id('A'),
            at: p(3, 3)
        }));
        assert!(last.complete);
        assert!(sim.is_complete());
        assert_eq!(sim.tick(), 6);
    }

    #[test]
    fn reference_warehouse_completes() {
        let mut sim = Simulation::from_map(WAREHOUSE, SimulationOptions::default()).unwrap();
        let mut recorder = Recorder::default();
        let summary = sim.run(&mut recorder).unwrap();

        assert_eq!(summary.ticks, 10);
        assert_eq!(summary.delivered, 2);
        assert_eq!(summary.deadlock_ticks, 0);
        assert_eq!(recorder.completed_after, Some(10));
        assert!(sim.agents().iter().all(|a| a.status() == AgentStatus::Done));

        // Both arrive at the gap in the wall together; R has priority
        let waits: Vec<_> = recorder
            .reports
            .iter()
            .flat_map(|report| report.events.iter().map(move |e| (report.tick, e)))
            .filter(|(_, e)| matches!(e, Event::Waiting { .. }))
            .collect();
        assert_eq!(
            waits,
            vec![(
                6,
                &Event::Waiting {
                    agent: id('S'),
                    cell: p(5, 3)
                }
            )]
        );
    }

    #[test]
    fn replay_is_deterministic() {
        let run = || {
            let mut sim = Simulation::from_map(WAREHOUSE, SimulationOptions::default()).unwrap();
            let mut recorder = Recorder::default();
            sim.run(&mut recorder).unwrap();
            recorder.reports
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn idle_agent_in_corridor_deadlocks() {
        let mut sim = Simulation::from_map("ABI.E", SimulationOptions::default()).unwrap();
        let report = sim.step();
        assert_eq!(
            report.events,
            vec![
                Event::Assigned {
                    agent: id('A'),
                    pickup: p(2, 0)
                },
                Event::Blocked {
                    agent: id('A'),
                    cell: p(1, 0),
                    by: id('B')
                },
                Event::Deadlock { pending: 1 },
            ]
        );
        assert_eq!(report.agents[0].position, p(0, 0));
        assert_eq!(report.agents[1].position, p(1, 0));
    }

    #[test]
    fn tick_limit_stops_a_stuck_run() {
        let options = SimulationOptions {
            max_ticks: Some(20),
            ..SimulationOptions::default()
        };
        let mut sim = Simulation::from_map("ABI.E", options).unwrap();
        assert_eq!(
            sim.run(&mut NoopObserver),
            Err(SimulationError::TickLimitExceeded {
                limit: 20,
                remaining: 1
            })
        );
        assert_eq!(sim.tick(), 20);
    }

    #[test]
    fn sealed_delivery_point_stalls_agent() {
        let mut sim = Simulation::from_map("A.I#E", SimulationOptions::default()).unwrap();
        sim.step();
        let picked = sim.step();
        assert!(picked.events.contains(&Event::PickedUp {
            agent: id('A'),
            at: p(2, 0)
        }));
        assert!(picked.events.contains(&Event::Stalled {
            agent: id('A'),
            at: p(2, 0)
        }));

        // Retried, and still stuck, on every following tick
        let later = sim.step();
        assert_eq!(
            later.events,
            vec![Event::Stalled {
                agent: id('A'),
                at: p(2, 0)
            }]
        );
        assert_eq!(later.agents[0].status, AgentStatus::MovingToDelivery);
        assert!(!later.complete);
    }

    #[test]
    fn nearest_delivery_policy() {
        let map = "
            E...A.I...E
        ";
        let nearest = SimulationOptions {
            delivery_policy: DeliveryPolicy::Nearest,
            ..SimulationOptions::default()
        };
        let mut sim = Simulation::from_map(map, nearest).unwrap();
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.agents()[0].position(), p(10, 0));

        let mut sim = Simulation::from_map(map, SimulationOptions::default()).unwrap();
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.agents()[0].position(), p(0, 0));
    }

    #[test]
    fn map_without_items_is_already_complete() {
        let mut sim = Simulation::from_map("A.E", SimulationOptions::default()).unwrap();
        assert!(sim.is_complete());
        let summary = sim.run(&mut NoopObserver).unwrap();
        assert_eq!(summary.ticks, 0);
    }

    #[test]
    fn surplus_items_outlast_the_fleet() {
        let map = "
            A....
            .I.I.
            ..E..
            .I...
        ";
        let options = SimulationOptions {
            max_ticks: Some(50),
            ..SimulationOptions::default()
        };
        let mut sim = Simulation::from_map(map, options).unwrap();
        // Done is terminal, so a lone robot moves exactly one item
        assert_eq!(
            sim.run(&mut NoopObserver),
            Err(SimulationError::TickLimitExceeded {
                limit: 50,
                remaining: 2
            })
        );
        assert_eq!(sim.agents()[0].status(), AgentStatus::Done);
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod generate {
    use crate::{
        AgentId,
        generate::{GenerateError, GeneratorConfig, generate_layout},
        layout::Layout,
    };

    #[test]
    fn digits_handed_out_after_letters_still_lead_the_fleet() {
        let config = GeneratorConfig {
            width: 12,
            height: 8,
            agents: 25,
            pickups: 2,
            wall_density: 0.0,
        };
        let layout = Layout::parse(&generate_layout(&config, 3).unwrap()).unwrap();
        assert_eq!(layout.agents.len(), 25);
        assert_eq!(layout.agents[0].0, AgentId::from_glyph('0').unwrap());
        assert_eq!(layout.agents[1].0, AgentId::from_glyph('A').unwrap());
    }

    #[test]
    fn same_seed_same_map() {
        let config = GeneratorConfig::default();
        assert_eq!(
            generate_layout(&config, 7).unwrap(),
            generate_layout(&config, 7).unwrap()
        );
    }

    #[test]
    fn generated_map_loads_with_requested_counts() {
        let config = GeneratorConfig {
            width: 12,
            height: 8,
            agents: 4,
            pickups: 5,
            wall_density: 0.2,
        };
        for seed in 0..20 {
            let map = generate_layout(&config, seed).unwrap();
            let layout = Layout::parse(&map).unwrap();
            assert_eq!(layout.agents.len(), 4);
            assert_eq!(layout.pickups.len(), 5);
            assert_eq!(layout.deliveries.len(), 1);
        }
    }

    #[test]
    fn rejects_tiny_maps() {
        let config = GeneratorConfig {
            width: 2,
            ..GeneratorConfig::default()
        };
        assert_eq!(
            generate_layout(&config, 0),
            Err(GenerateError::TooSmall {
                width: 2,
                height: 10
            })
        );
    }

    #[test]
    fn rejects_overfull_maps() {
        let config = GeneratorConfig {
            width: 3,
            height: 3,
            agents: 1,
            pickups: 1,
            wall_density: 0.0,
        };
        assert_eq!(
            generate_layout(&config, 0),
            Err(GenerateError::NotEnoughSpace {
                needed: 3,
                available: 1
            })
        );
    }
}
