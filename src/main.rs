mod ui;

use catwalk::{
    app_dirs::AppDirs,
    clock::SystemClock,
    config::{Config, ConfigStore, FileConfigStore},
    discovery::DiscoveryEvent,
    error::TrackerError,
    export::{read_route_csv, write_route_csv},
    manual::Direction,
    runtime::{spawn_route_replay, CrosstermEventSource, FixedTicker, Runner, TrackerEvent},
    session::WalkState,
    store::SessionStore,
    summary::{format_distance, format_duration, format_pace, SessionSummary},
    tracker::Tracker,
};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use rand::{rngs::StdRng, SeedableRng};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, File},
    io::{self, stdin},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "catwalk.log";

/// walking tracker tui with route recording and random cat encounters
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Track a walk in the terminal: record the route from a live feed or move by hand with the arrow keys, pause and resume without losing time, and meet a random cat every now and then."
)]
pub struct Cli {
    /// start in manual mode, moving with the arrow keys or wasd
    #[clap(short = 'm', long)]
    manual: bool,

    /// seconds between cat encounter checks
    #[clap(short = 'i', long)]
    interval: Option<u64>,

    /// a check finds a cat when a random draw in [0, 1) exceeds this
    #[clap(short = 't', long)]
    threshold: Option<f64>,

    /// degrees moved per tick in manual mode
    #[clap(long)]
    step: Option<f64>,

    /// favour common cats over rare ones
    #[clap(long)]
    weighted: bool,

    /// replay a recorded CSV route as the live location feed
    #[clap(short = 'r', long)]
    replay: Option<PathBuf>,

    /// replay speed multiplier
    #[clap(long, default_value_t = 1.0)]
    replay_speed: f64,

    /// directory holding the saved walk and log file
    #[clap(long)]
    state_dir: Option<PathBuf>,

    /// config file to read (and write with --save-config)
    #[clap(long)]
    config: Option<PathBuf>,

    /// print the saved walk and exit
    #[clap(long)]
    summary: bool,

    /// list the N walking courses nearest to the last known position and exit
    #[clap(long, value_name = "N")]
    nearby: Option<usize>,

    /// write the saved walk's route to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// forget the saved walk and exit
    #[clap(long)]
    clear: bool,

    /// persist the effective settings to the config file
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Command line flags take precedence over the config file
    fn apply_to(&self, config: &mut Config) {
        if let Some(interval) = self.interval {
            config.discovery_interval_secs = interval;
        }
        if let Some(threshold) = self.threshold {
            config.discovery_threshold = threshold;
        }
        if let Some(step) = self.step {
            config.manual_step_degrees = step;
        }
        if self.weighted {
            config.rarity_weighted = true;
        }
    }

    fn state_dir(&self) -> Option<PathBuf> {
        self.state_dir.clone().or_else(AppDirs::state_dir)
    }

    fn open_store(&self) -> SessionStore {
        match &self.state_dir {
            Some(dir) => SessionStore::open(dir.join("state.db")),
            None => SessionStore::open_default(),
        }
    }

    fn is_one_shot(&self) -> bool {
        self.summary || self.nearby.is_some() || self.export.is_some() || self.clear
    }
}

pub struct App {
    pub tracker: Tracker<SystemClock, StdRng>,
    pub last_discovery: Option<DiscoveryEvent>,
    pub cats_met: Vec<DiscoveryEvent>,
    pub summary: Option<SessionSummary>,
    pub message: Option<String>,
    /// Whether the terminal reports key releases; without them a press moves
    /// for a single tick.
    pub key_releases: bool,
}

impl App {
    pub fn new(tracker: Tracker<SystemClock, StdRng>, key_releases: bool) -> Self {
        let summary = tracker.summary().ok();
        Self {
            tracker,
            last_discovery: None,
            cats_met: Vec::new(),
            summary,
            message: None,
            key_releases,
        }
    }

    fn report(&mut self, result: Result<(), TrackerError>) {
        if let Err(e) = result {
            warn!(error = %e, "action rejected");
            self.message = Some(e.to_string());
        }
    }

    fn new_walk(&mut self) {
        let result = self.tracker.start().map(|_| ());
        if result.is_ok() {
            self.last_discovery = None;
            self.cats_met.clear();
            self.summary = None;
            self.message = None;
        }
        self.report(result);
    }

    fn finish_walk(&mut self) {
        match self.tracker.finish() {
            Ok(summary) => {
                self.summary = Some(summary);
                self.message = None;
            }
            Err(e) => self.report(Err(e)),
        }
    }

    fn on_tick(&mut self) {
        let outcome = self.tracker.on_tick();
        if let Some(event) = outcome.discovery {
            self.cats_met.push(event.clone());
            self.last_discovery = Some(event);
        }
        if !self.key_releases {
            self.tracker.release_all();
        }
    }
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') => Some(Direction::North),
        KeyCode::Down | KeyCode::Char('s') => Some(Direction::South),
        KeyCode::Left | KeyCode::Char('a') => Some(Direction::West),
        KeyCode::Right | KeyCode::Char('d') => Some(Direction::East),
        _ => None,
    }
}

fn init_logging(state_dir: Option<&Path>) -> Option<WorkerGuard> {
    let dir = state_dir?;
    if let Err(e) = fs::create_dir_all(dir) {
        eprintln!("logging disabled: {e}");
        return None;
    }

    let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_env("CATWALK_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn Error>> {
    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let mut config = store.load();
    cli.apply_to(&mut config);
    config.validate()?;

    if cli.save_config {
        store.save(&config)?;
        println!("settings saved to {}", store.path().display());
    }
    Ok(config)
}

fn print_summary(tracker: &Tracker<SystemClock, StdRng>) {
    let Some(session) = tracker.session() else {
        println!("no saved walk");
        return;
    };

    println!("walk {} ({})", session.id, session.state);
    if let Some(start) = session.start_time {
        println!("started   {}", start.to_rfc3339());
    }
    match tracker.summary() {
        Ok(summary) => {
            println!("distance  {}", format_distance(summary.total_distance_meters));
            println!("time      {}", format_duration(summary.total_duration_millis));
            println!("pace      {}", format_pace(summary.average_pace_sec_per_km));
        }
        Err(_) => {
            println!("distance  {}", format_distance(tracker.total_distance()));
            println!(
                "time      {}",
                format_duration(tracker.elapsed_millis().unwrap_or(0))
            );
        }
    }
    println!("samples   {}", session.route.len());
}

fn run_one_shot(
    cli: &Cli,
    tracker: &mut Tracker<SystemClock, StdRng>,
) -> Result<(), Box<dyn Error>> {
    if cli.clear {
        tracker.clear_saved();
        println!("saved walk cleared");
        return Ok(());
    }
    if cli.summary {
        print_summary(tracker);
    }
    if let Some(k) = cli.nearby {
        let here = tracker.current_position();
        println!("courses near {:.4}, {:.4}", here.latitude, here.longitude);
        for (course, meters) in tracker.nearby_courses(k) {
            println!(
                "{:>10}  {} ({})",
                format_distance(meters),
                course.name,
                course.region
            );
        }
    }
    if let Some(path) = &cli.export {
        let Some(session) = tracker.session() else {
            println!("no saved walk");
            return Ok(());
        };
        write_route_csv(&session.route, File::create(path)?)?;
        println!(
            "{} samples written to {}",
            session.route.len(),
            path.display()
        );
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.state_dir().as_deref());

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, e.to_string()).exit();
        }
    };

    let replay = match &cli.replay {
        Some(path) => Some(read_route_csv(File::open(path)?)?),
        None => None,
    };

    let mut tracker = Tracker::new(
        config,
        SystemClock,
        StdRng::from_entropy(),
        cli.open_store(),
    )?;
    tracker.restore();

    if cli.is_one_shot() {
        return run_one_shot(&cli, &mut tracker);
    }
    if cli.save_config {
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if cli.manual {
        tracker.set_manual_mode(true);
    }

    let events = CrosstermEventSource::new();
    if let Some(route) = replay {
        if tracker.state() != WalkState::Active && tracker.state() != WalkState::Paused {
            tracker.start()?;
        }
        info!(samples = route.len(), speed = cli.replay_speed, "replaying route");
        spawn_route_replay(route, cli.replay_speed, events.sender());
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let key_releases = matches!(supports_keyboard_enhancement(), Ok(true));
    if key_releases {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = tracker.config().tick_rate();
    let mut app = App::new(tracker, key_releases);
    let result = start_tui(
        &mut terminal,
        &mut app,
        Runner::new(events, FixedTicker::new(tick_rate)),
    );
    app.tracker.flush();

    if key_releases {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: Runner<CrosstermEventSource, FixedTicker>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        match runner.step() {
            TrackerEvent::Tick => app.on_tick(),
            TrackerEvent::Resize => {}
            TrackerEvent::Location(sample) => {
                let result = app.tracker.on_location(sample).map(|_| ());
                app.report(result);
            }
            TrackerEvent::Key(key) => {
                if handle_key(app, key) {
                    break;
                }
            }
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;
    }

    Ok(())
}

/// Returns true when the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if let Some(dir) = direction_for(key.code) {
        match key.kind {
            KeyEventKind::Release => app.tracker.release(dir),
            _ => app.tracker.press(dir),
        }
        return false;
    }
    if key.kind == KeyEventKind::Release {
        return false;
    }

    match key.code {
        KeyCode::Esc => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char(' ') => {
            let result = app.tracker.toggle_pause();
            app.report(result);
        }
        KeyCode::Char('m') => {
            let manual = !app.tracker.is_manual_mode();
            app.tracker.set_manual_mode(manual);
        }
        KeyCode::Char('f') => app.finish_walk(),
        KeyCode::Char('n') => app.new_walk(),
        _ => {}
    }
    false
}
