use anyhow::Result;
use autonav_core::{
    Action, Direction as Facing, Position,
    agent::{Policy, RandomPolicy},
    environment::{Environment, StepInfo},
    render::ViewSink,
};
use clap::Parser;
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
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory containing the view images
    #[arg(short, long, value_name = "RESOURCE_DIR", default_value = "images")]
    resources: PathBuf,
    /// Seed for the random autopilot policy
    #[arg(short, long, default_value_t = 0)]
    seed: u64,
    /// Run a logged random walk instead of the TUI
    #[arg(long)]
    headless: bool,
    /// Number of steps to take in headless mode
    #[arg(long, default_value_t = 1000)]
    steps: u32,
}

/// Outcome of the most recent step, kept for the status panel.
struct LastStep {
    action: Action,
    reward: f32,
    info: StepInfo,
}

/// Keeps the most recent composed stereo frame for the view panel.
#[derive(Default)]
struct TerminalSink {
    frame: Option<autonav_core::obs::RgbFrame>,
}

impl ViewSink for TerminalSink {
    fn present(&mut self, frame: &autonav_core::obs::RgbFrame) {
        self.frame = Some(frame.clone());
    }
}

struct App {
    /// The core navigation environment.
    environment: Environment,
    /// Autopilot action source.
    policy: RandomPolicy,
    /// Latest composed stereo frame.
    sink: TerminalSink,
    last: Option<LastStep>,
    autopilot: bool,
    /// Flag to control the main loop.
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let mut environment = Environment::new(&args.resources)?;
        environment.reset_default()?;
        let mut app = App {
            environment,
            policy: RandomPolicy::new(args.seed),
            sink: TerminalSink::default(),
            last: None,
            autopilot: false,
            should_quit: false,
        };
        app.environment.render(&mut app.sink)?;
        Ok(app)
    }

    /// Applies one action and refreshes the stereo frame.
    fn apply(&mut self, action: Action) -> Result<()> {
        let step = self.environment.step(action)?;
        self.last = Some(LastStep {
            action,
            reward: step.reward,
            info: step.info,
        });
        self.environment.render(&mut self.sink)?;
        Ok(())
    }

    /// Handles one tick of the simulation.
    fn tick(&mut self) -> Result<()> {
        if self.autopilot {
            let action = self
                .policy
                .next_action(self.environment.position(), self.environment.direction());
            self.apply(action)?;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        self.environment.reset_default()?;
        self.last = None;
        self.environment.render(&mut self.sink)?;
        Ok(())
    }

    /// Sets the quit flag.
    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    // Ensure the resource directory exists before doing anything else
    if !args.resources.exists() {
        return Err(anyhow::anyhow!(
            "resource directory does not exist: {}",
            args.resources.display()
        ));
    }

    if args.headless {
        return run_headless(&args);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Create the application state and run the main loop
    let result = App::new(&args).and_then(|mut app| run_app(&mut terminal, &mut app));

    // Restore the terminal state
    restore_terminal(&mut terminal)?;

    result
}

/// Drives a seeded random walk without a terminal UI, logging every step.
fn run_headless(args: &Args) -> Result<()> {
    tracing_subscriber::fmt().init();

    let mut environment = Environment::new(&args.resources)?;
    environment.reset_default()?;
    let mut policy = RandomPolicy::new(args.seed);

    for i in 0..args.steps {
        let action = policy.next_action(environment.position(), environment.direction());
        let step = environment.step(action)?;
        let position = environment.position();
        tracing::info!(
            step = i,
            action = ?action,
            x = position.x,
            y = position.y,
            facing = environment.direction().label(),
            reward = step.reward,
            info = %step.info,
            "step"
        );
    }
    tracing::info!(
        operations = environment.num_of_operations(),
        moves = environment.num_of_moves(),
        collisions = environment.num_of_collisions(),
        "random walk finished"
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
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250); // Autopilot update rate
    let mut last_tick = Instant::now();

    loop {
        // Draw the UI
        terminal.draw(|f| ui(f, app))?;

        // Calculate timeout for event polling
        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        // Poll for events (keyboard, mouse, etc.)
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    KeyCode::Up => app.apply(Action::Forward)?,
                    KeyCode::Down => app.apply(Action::Backward)?,
                    KeyCode::Left => app.apply(Action::TurnLeft)?,
                    KeyCode::Right => app.apply(Action::TurnRight)?,
                    KeyCode::Char('a') => app.autopilot = !app.autopilot,
                    KeyCode::Char('r') => app.reset()?,
                    _ => {}
                }
            }
        }

        // Update application state if enough time has passed
        if last_tick.elapsed() >= tick_rate {
            app.tick()?; // Perform autopilot step
            last_tick = Instant::now();
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
            Constraint::Percentage(45), // Area for the room map
            Constraint::Percentage(35), // Area for the stereo frame
            Constraint::Percentage(20), // Area for status/help
        ])
        .split(frame.area());

    render_map(frame, main_layout[0], app);
    render_views(frame, main_layout[1], app);
    render_status(frame, main_layout[2], app);
}

/// Glyph for the agent oriented by its facing: +x is right, +y is down.
fn facing_glyph(facing: Facing) -> &'static str {
    match facing {
        Facing::Front => ">",
        Facing::Right => "v",
        Facing::Back => "<",
        Facing::Left => "^",
    }
}

/// Renders the walkable cells and the agent onto the frame.
fn render_map(frame: &mut Frame, area: Rect, app: &App) {
    let map = app.environment.map();
    let Some((min, max)) = map.bounds() else {
        return;
    };

    let mut lines: Vec<Line> = Vec::with_capacity((max.y - min.y + 1) as usize);
    for y in min.y..=max.y {
        let mut spans: Vec<Span> = Vec::with_capacity((max.x - min.x + 1) as usize);
        for x in min.x..=max.x {
            let pos = Position::new(x, y);
            if pos == app.environment.position() {
                // Display the agent with its facing glyph
                spans.push(Span::styled(
                    facing_glyph(app.environment.direction()),
                    Style::default().fg(Color::Red).bold(),
                ));
            } else if map.contains(pos) {
                spans.push(Span::styled(".", Style::default().fg(Color::DarkGray)));
            } else {
                spans.push(Span::raw(" "));
            }
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Room").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

/// Renders the composed stereo frame using half-block cells.
fn render_views(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Stereo View").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(composed) = app.sink.frame.as_ref() else {
        return;
    };
    if inner.width == 0 || inner.height == 0 || composed.width == 0 || composed.height == 0 {
        return;
    }

    // Each terminal cell shows two vertically stacked pixels via '▀':
    // the foreground colors the upper half, the background the lower.
    let rows = inner.height as u32;
    let cols = inner.width as u32;
    let mut lines: Vec<Line> = Vec::with_capacity(rows as usize);
    for cy in 0..rows {
        let mut spans: Vec<Span> = Vec::with_capacity(cols as usize);
        for cx in 0..cols {
            let px = (cx * composed.width) / cols;
            let top_py = (cy * 2 * composed.height) / (rows * 2);
            let bottom_py = ((cy * 2 + 1) * composed.height) / (rows * 2);
            let top = composed.pixel(px, top_py);
            let bottom = composed.pixel(px, bottom_py);
            spans.push(Span::styled(
                "▀",
                Style::default()
                    .fg(Color::Rgb(top[0], top[1], top[2]))
                    .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
            ));
        }
        lines.push(Line::from(spans));
    }

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Renders counters, the last step outcome and the help line.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let env = &app.environment;
    let pos = env.position();

    let mut lines = vec![Line::from(format!(
        "pos ({}, {})  facing {}  ops {}  moves {}  collisions {}",
        pos.x,
        pos.y,
        env.direction().label(),
        env.num_of_operations(),
        env.num_of_moves(),
        env.num_of_collisions(),
    ))];
    if let Some(last) = &app.last {
        lines.push(Line::from(format!(
            "last {:?}: {} (reward {:+.0})",
            last.action, last.info, last.reward
        )));
    }
    lines.push(Line::from(format!(
        "arrows move/turn | 'a' autopilot: {} | 'r' reset | 'q' quit",
        if app.autopilot { "on" } else { "off" }
    )));

    let status = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, area);
}
