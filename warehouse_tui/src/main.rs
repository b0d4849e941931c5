mod config;
mod record;

use anyhow::{Context, Result};
use clap::Parser;
use config::AppConfig;
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use record::{Both, EventLog, Printer};
use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufWriter, Stdout},
    path::{Path, PathBuf},
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use warehouse_core::{
    AgentId, Position,
    agent::AgentStatus,
    generate::generate_layout,
    observer::{NoopObserver, TickObserver},
    simulation::{Simulation, SimulationError, TickReport},
    world::CellKind,
};

#[derive(Parser, Debug)]
#[command(version, about = "Warehouse fleet simulator", long_about = None)]
struct Args {
    /// Map file to load
    #[arg(short, long, value_name = "MAP_FILE", conflicts_with = "random")]
    map: Option<PathBuf>,

    /// Generate a random warehouse from this seed instead of loading a map
    #[arg(short, long, value_name = "SEED")]
    random: Option<u64>,

    /// Configuration file (defaults to warehouse.toml when present)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Print events to stdout instead of drawing the terminal UI
    #[arg(long)]
    headless: bool,

    /// Stop after this many ticks even if items remain
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Milliseconds between ticks in the terminal UI
    #[arg(long)]
    tick_rate_ms: Option<u64>,

    /// Write every tick report to this file as JSON lines
    #[arg(long, value_name = "FILE")]
    event_log: Option<PathBuf>,

    /// Where logs go while the terminal UI owns the screen
    #[arg(long, value_name = "FILE", default_value = "warehouse.log")]
    log_file: PathBuf,
}

/// Colours handed to agents in fleet order.
const AGENT_PALETTE: [Color; 6] = [
    Color::Green,
    Color::Magenta,
    Color::Blue,
    Color::LightRed,
    Color::LightCyan,
    Color::LightGreen,
];

struct App {
    /// The core simulation.
    simulation: Simulation,
    /// Presentation-only colour lookup.
    colours: HashMap<AgentId, Color>,
    /// Frame produced by the most recent tick.
    last_report: Option<TickReport>,
    event_log: Option<EventLog<BufWriter<File>>>,
    /// Set when the run stopped early.
    halted: Option<String>,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(simulation: Simulation, event_log: Option<EventLog<BufWriter<File>>>) -> Self {
        let colours = simulation
            .agents()
            .iter()
            .zip(AGENT_PALETTE.iter().cycle())
            .map(|(agent, colour)| (agent.id(), *colour))
            .collect();
        App {
            simulation,
            colours,
            last_report: None,
            event_log,
            halted: None,
            should_quit: false,
        }
    }

    fn finished(&self) -> bool {
        self.simulation.is_complete() || self.halted.is_some()
    }

    /// Handles one step of the simulation.
    fn tick(&mut self, max_ticks: Option<u64>) {
        if self.finished() {
            return;
        }
        if let Some(limit) = max_ticks.filter(|limit| self.simulation.tick() >= *limit) {
            let reason = SimulationError::TickLimitExceeded {
                limit,
                remaining: self.simulation.pickups().len(),
            };
            error!(%reason, "simulation halted");
            self.halted = Some(reason.to_string());
            return;
        }

        let report = self.simulation.step();
        if let Some(log) = self.event_log.as_mut() {
            log.on_tick(&report);
            if report.complete {
                log.on_complete(self.simulation.tick());
            }
        }
        if report.complete {
            info!(ticks = self.simulation.tick(), "all items delivered");
        }
        self.last_report = Some(report);
    }

    fn colour_of(&self, id: AgentId) -> Color {
        self.colours.get(&id).copied().unwrap_or(Color::White)
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = AppConfig::resolve(args.config.as_deref())?;
    if args.max_ticks.is_some() {
        config.simulation.max_ticks = args.max_ticks;
    }
    if let Some(rate) = args.tick_rate_ms {
        config.display.tick_rate_ms = rate;
    }

    init_logging(args.headless, &args.log_file)?;

    let map = match args.random {
        Some(seed) => {
            info!(seed, "generating random warehouse");
            generate_layout(&config.generator, seed)?
        }
        None => {
            // If no map file is provided, use the default map
            let map_file = args.map.unwrap_or(PathBuf::from("maps/warehouse.txt"));
            if !map_file.exists() {
                return Err(anyhow::anyhow!(
                    "Map file does not exist: {}",
                    map_file.display()
                ));
            }
            std::fs::read_to_string(&map_file)
                .with_context(|| format!("Failed to read map file {}", map_file.display()))?
        }
    };

    let simulation = Simulation::from_map(&map, config.simulation.clone())
        .context("Failed to load warehouse layout")?;
    info!(
        width = simulation.world().width(),
        height = simulation.world().height(),
        agents = simulation.agents().len(),
        items = simulation.pickups().len(),
        "warehouse loaded"
    );
    let event_log = args
        .event_log
        .as_deref()
        .map(EventLog::create)
        .transpose()?;

    if args.headless {
        return run_headless(simulation, event_log);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state
    let mut app = App::new(simulation, event_log);

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app, &config);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Installs the tracing subscriber. Logs go to stderr when headless and to
/// `log_file` otherwise.
fn init_logging(headless: bool, log_file: &Path) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warehouse_core=info,warehouse_tui=info"));
    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        let file = File::create(log_file)
            .with_context(|| format!("Failed to create log file {}", log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

/// Runs to completion printing every tick to stdout.
fn run_headless(
    mut simulation: Simulation,
    event_log: Option<EventLog<BufWriter<File>>>,
) -> Result<()> {
    let mut printer = Printer::new(io::stdout().lock());
    let summary = match event_log {
        Some(mut log) => simulation.run(&mut Both(&mut printer, &mut log)),
        None => simulation.run(&mut Both(&mut printer, &mut NoopObserver)),
    }?;
    info!(
        ticks = summary.ticks,
        delivered = summary.delivered,
        deadlock_ticks = summary.deadlock_ticks,
        "run finished"
    );
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?; // Use alternate screen and enable mouse capture
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    config: &AppConfig,
) -> Result<()> {
    let tick_rate = config.display.tick_rate();
    let max_ticks = config.simulation.max_ticks;
    // Hold the initial frame on screen before the first tick
    let mut last_tick = Instant::now() + config.display.start_delay();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = last_tick
            .checked_add(tick_rate)
            .and_then(|due| due.checked_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO);

        // Poll for events (keyboard, mouse, etc.)
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        // Update application state if enough time has passed
        let now = Instant::now();
        if now >= last_tick && now.duration_since(last_tick) >= tick_rate {
            app.tick(max_ticks); // Perform simulation step
            last_tick = now;
        }

        // Exit loop if requested
        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55), // Area for the map
            Constraint::Percentage(40), // Area for fleet status and events
            Constraint::Length(2),      // Area for status/help
        ])
        .split(frame.area());
    let lower = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(main_layout[1]);

    render_map(frame, main_layout[0], app);
    render_fleet(frame, lower[0], app);
    render_events(frame, lower[1], app);

    let status = if let Some(reason) = &app.halted {
        format!("Halted: {reason}  |  press 'q' or 'Esc' to quit.")
    } else if app.simulation.is_complete() {
        format!(
            "All items delivered in {} ticks  |  press 'q' or 'Esc' to quit.",
            app.simulation.tick()
        )
    } else {
        format!(
            "Tick {}  |  Items left: {}  |  I item  E delivery  # wall  |  'q'/'Esc' quits.",
            app.simulation.tick(),
            app.simulation.pickups().len()
        )
    };
    let help_text = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the warehouse map with items, delivery points and agents overlaid.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let simulation = &app.simulation;
    let world = simulation.world();

    // Dynamic overlay: later entries win, so agents draw over items
    let mut overlay: HashMap<Position, Span> = HashMap::new();
    for point in simulation.deliveries() {
        overlay.insert(*point, Span::styled("E", Style::default().fg(Color::Cyan)));
    }
    for item in simulation.pickups() {
        overlay.insert(*item, Span::styled("I", Style::default().fg(Color::Yellow)));
    }
    for agent in simulation
        .agents()
        .iter()
        .filter(|agent| agent.status() != AgentStatus::Done)
    {
        overlay.insert(
            agent.position(),
            Span::styled(
                agent.id().to_string(),
                Style::default().fg(app.colour_of(agent.id())).bold(),
            ),
        );
    }

    let mut lines: Vec<Line> = Vec::with_capacity(world.height());
    let mut spans: Vec<Span> = Vec::with_capacity(world.width() * 2);
    for (position, kind) in world.cells() {
        let span = overlay.remove(&position).unwrap_or_else(|| match kind {
            CellKind::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
            CellKind::Free => Span::styled(".", Style::default().fg(Color::Gray)),
        });
        spans.push(span);
        if position.x + 1 == world.width() {
            lines.push(Line::from(std::mem::take(&mut spans)));
        } else {
            spans.push(Span::raw(" "));
        }
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Warehouse").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders one line per agent with its position, status and destination.
fn render_fleet(frame: &mut Frame, area: Rect, app: &App) {
    let rows: Vec<ListItem> = app
        .simulation
        .agents()
        .iter()
        .map(|agent| {
            let destination = match agent.status() {
                AgentStatus::MovingToPickup => agent.target(),
                AgentStatus::MovingToDelivery => agent.route().back().copied(),
                AgentStatus::Idle | AgentStatus::Done => None,
            }
            .map(|cell| format!(" -> {cell}"))
            .unwrap_or_default();
            ListItem::from(Line::from(vec![
                Span::styled(
                    format!("● {} ", agent.id()),
                    Style::default().fg(app.colour_of(agent.id())).bold(),
                ),
                Span::raw(format!(
                    "{:<10} {:?}{}",
                    agent.position().to_string(),
                    agent.status(),
                    destination
                )),
            ]))
        })
        .collect();

    let fleet_widget =
        List::new(rows).block(Block::default().borders(Borders::ALL).title("Fleet"));
    frame.render_widget(fleet_widget, area);
}

/// Renders the events of the most recent tick.
fn render_events(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = match &app.last_report {
        Some(report) if !report.events.is_empty() => report
            .events
            .iter()
            .map(|event| {
                let style = match event {
                    warehouse_core::event::Event::Deadlock { .. } => {
                        Style::default().fg(Color::Red).bold()
                    }
                    warehouse_core::event::Event::Stalled { .. } => {
                        Style::default().fg(Color::Red)
                    }
                    other => other
                        .agent()
                        .map(|id| Style::default().fg(app.colour_of(id)))
                        .unwrap_or_default(),
                };
                ListItem::new(Span::styled(event.to_string(), style))
            })
            .collect(),
        Some(_) => vec![ListItem::new("No significant events this tick.")],
        None => vec![ListItem::new("Waiting for the first tick...")],
    };

    let title = match &app.last_report {
        Some(report) => format!("Events (tick {})", report.tick),
        None => "Events".to_string(),
    };
    let events_widget = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(events_widget, area);
}
