use std::{
    collections::VecDeque,
    fs::File,
    io::{self, Stdout},
    path::PathBuf,
    sync::Mutex,
    thread,
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use anyhow::{Context, Result};
use clap::Parser;
use gridworld_core::{
    EntityId,
    agent::AgentKind,
    environment::{Environment, TurnReport, load_environment_from_string},
};
use rand::{SeedableRng, rngs::StdRng};
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

/// Number of narration lines kept for the status panel.
const HISTORY_LINES: usize = 8;

#[derive(Parser, Debug)]
#[command(version, about = "Empowerment-driven VIP agent on a grid world", long_about = None)]
struct Args {
    /// Map file to load instead of placing agents randomly
    #[arg(short, long, value_name = "MAP_FILE")]
    map: Option<PathBuf>,

    /// Side length of a randomly generated grid
    #[arg(long, default_value_t = 5)]
    size: usize,

    /// Number of obstacle agents on a randomly generated grid
    #[arg(long, default_value_t = 5)]
    obstacles: usize,

    /// Random obstacles move to minimize the VIP's empowerment instead of standing still
    #[arg(long)]
    antagonists: bool,

    /// Seed for placement and tie-breaking; defaults to the current time
    #[arg(long)]
    seed: Option<u64>,

    /// Number of turns to run (headless default: 30, interactive default: unlimited)
    #[arg(long)]
    steps: Option<u64>,

    /// Delay between turns in milliseconds
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,

    /// Print turns to the console instead of drawing the terminal UI
    #[arg(long)]
    headless: bool,

    /// In headless mode, print one JSON turn report per line
    #[arg(long, requires = "headless")]
    json: bool,

    /// Write logs to this file (interactive mode logs nowhere otherwise)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

struct App {
    /// The core simulation environment.
    environment: Environment,
    /// Source of randomness for tie-breaking.
    rng: StdRng,
    /// Most recent narration lines, oldest first.
    history: VecDeque<String>,
    /// Turns left to run, if limited.
    remaining: Option<u64>,
    paused: bool,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let seed = args.seed.unwrap_or_else(clock_seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let environment = match &args.map {
            Some(map_file) => {
                let map = std::fs::read_to_string(map_file)
                    .with_context(|| format!("Failed to read map file {}", map_file.display()))?;
                load_environment_from_string(&map)
                    .with_context(|| format!("Failed to load map {}", map_file.display()))?
            }
            None => {
                let kind = if args.antagonists {
                    AgentKind::Antagonist
                } else {
                    AgentKind::Static
                };
                Environment::random(args.size, args.obstacles, kind, &mut rng)
                    .context("Failed to place agents")?
            }
        };
        info!(
            size = environment.bounds().size(),
            agents = environment.agents().len(),
            seed,
            "Starting simulation"
        );

        Ok(App {
            environment,
            rng,
            history: VecDeque::with_capacity(HISTORY_LINES),
            remaining: args.steps,
            paused: false,
            should_quit: false,
        })
    }

    fn finished(&self) -> bool {
        self.remaining == Some(0)
    }

    /// Handles one step of the simulation.
    fn tick(&mut self) -> Option<TurnReport> {
        if self.paused || self.finished() {
            return None;
        }
        let report = self.environment.process_turn(&mut self.rng);
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        if let Some(status) = &report.vip {
            info!(
                turn = report.turn,
                position = %status.position,
                empowerment = status.empowerment,
                "Turn complete"
            );
        }
        for line in report.narration() {
            if self.history.len() == HISTORY_LINES {
                self.history.pop_front();
            }
            self.history.push_back(line);
        }
        Some(report)
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Seeds from wall-clock time when no seed is given.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gridworld_core=info,gridworld_tui=info"));

    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file {}", path.display()))?;
        fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if args.headless {
        fmt().with_env_filter(filter).with_writer(io::stderr).init();
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse command line arguments
    let mut args = Args::parse();
    if args.headless && args.steps.is_none() {
        args.steps = Some(30);
    }
    init_logging(&args)?;

    if let Some(map_file) = &args.map {
        if !map_file.exists() {
            return Err(anyhow::anyhow!(
                "Map file does not exist: {}",
                map_file.display()
            ));
        }
    }

    // Create the application state
    let mut app = App::new(&args)?;
    let tick_rate = Duration::from_millis(args.tick_ms);

    if args.headless {
        return run_headless(&mut app, tick_rate, args.json);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the main application loop
    let result = run_app(&mut terminal, &mut app, tick_rate);

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Prints each turn the way the console simulation always has.
fn run_headless(app: &mut App, tick_rate: Duration, json: bool) -> Result<()> {
    while let Some(report) = app.tick() {
        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("\nStep {}", report.turn);
            for line in report.narration() {
                println!("{line}");
            }
            println!("\nGrid State:");
            print!("{}", app.environment.render_text());
        }
        if !tick_rate.is_zero() {
            thread::sleep(tick_rate);
        }
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

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
            Constraint::Percentage(35), // Area for status and narration
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], &app.environment);
    render_status(frame, main_layout[1], app);

    let help_text = Paragraph::new("Press 'space' to pause, 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Renders the turn counter, VIP empowerment and recent narration.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let environment = &app.environment;
    let state = if app.finished() {
        "finished"
    } else if app.paused {
        "paused"
    } else {
        "running"
    };
    let vip = match (environment.vip_position(), environment.vip_empowerment()) {
        (Some(position), Some(empowerment)) => {
            format!("VIP at {position}, empowerment {empowerment:.2}")
        }
        _ => "no VIP".to_string(),
    };

    let mut items = vec![ListItem::from(Line::from(vec![
        Span::styled(
            format!("Turn {} ({state}) ", environment.turn()),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(vip, Style::default().fg(Color::Yellow)),
    ]))];
    items.extend(
        app.history
            .iter()
            .map(|line| ListItem::from(Line::from(line.as_str()))),
    );

    let status_widget =
        List::new(items).block(Block::default().borders(Borders::ALL).title("Status"));
    frame.render_widget(status_widget, area);
}

/// Renders the environment map onto the frame.
fn render_map(frame: &mut Frame, area: Rect, environment: &Environment) {
    let lines = map_lines(environment);

    let map_widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Grid State"))
        .alignment(Alignment::Center);
    frame.render_widget(map_widget, area);
}

/// Builds one `[..|..]` line per grid row, every cell padded to the longest agent name.
fn map_lines(environment: &Environment) -> Vec<Line<'static>> {
    let vip = environment.vip().map(|vip| vip.id);
    let width = environment.cell_width();
    let name_of = move |id: EntityId| {
        environment
            .get_agent_state(id)
            .map_or("??", |agent| agent.name.as_str())
    };

    environment
        .agent_locations()
        .rows()
        .map(|row| {
            let mut spans: Vec<Span> = Vec::with_capacity(row.len() * 2 + 1);
            spans.push(Span::raw("["));
            for (col, cell) in row.iter().enumerate() {
                if col > 0 {
                    spans.push(Span::raw("|"));
                }
                let span = match *cell {
                    Some(id) if Some(id) == vip => Span::styled(
                        format!("{:<width$}", name_of(id)),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ),
                    Some(id) => Span::styled(
                        format!("{:<width$}", name_of(id)),
                        Style::default().fg(Color::Red),
                    ),
                    None => Span::raw(" ".repeat(width)),
                };
                spans.push(span);
            }
            spans.push(Span::raw("]"));
            Line::from(spans)
        })
        .collect()
}
