use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Instant,
};
use tracing::{info, warn};

use reflex::{
    app::{App, Collaborators, Flow},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    delay::DelayGenerator,
    logging::init_file_logging,
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    store::{BestScoreStore, MemoryStore, SqliteStore},
    ui::screen::current_screen,
};

/// terminal reaction-time test: wait for green, then click as fast as you can
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Wait for the screen to turn green, then click (or press enter) as fast as you can. Each session is a fixed number of rounds and ends with a summary, a chart of your times, and an optional leaderboard submission."
)]
pub struct Cli {
    /// number of rounds per session
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// shortest wait before the cue, in milliseconds
    #[clap(long)]
    min_delay: Option<u64>,

    /// longest wait before the cue, in milliseconds
    #[clap(long)]
    max_delay: Option<u64>,

    /// never submit scores to the leaderboard
    #[clap(long)]
    no_submit: bool,

    /// path to a config file (default: platform config dir)
    #[clap(short = 'c', long)]
    config: Option<PathBuf>,

    /// seed the cue delay generator for reproducible runs
    #[clap(long)]
    seed: Option<u64>,
}

impl Cli {
    /// CLI flags take precedence over the config file
    fn apply_to(&self, mut config: Config) -> Config {
        if let Some(rounds) = self.rounds {
            config.total_rounds = rounds;
        }
        if let Some(min) = self.min_delay {
            config.min_delay_ms = min;
        }
        if let Some(max) = self.max_delay {
            config.max_delay_ms = max;
        }
        if self.no_submit {
            config.submit_scores = false;
        }
        config
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn delay_generator(&self, config: &Config) -> DelayGenerator {
        match self.seed {
            Some(seed) => DelayGenerator::seeded(config.delay_range(), seed),
            None => DelayGenerator::new(config.delay_range()),
        }
    }
}

fn open_store() -> Box<dyn BestScoreStore> {
    match SqliteStore::open_default() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "best-score database unavailable, using in-memory store");
            Box::new(MemoryStore::default())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_store = cli.config_store();
    let config = cli.apply_to(config_store.load());
    if let Err(e) = config.validate() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::ValueValidation, e.to_string()).exit();
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_file_logging(&AppDirs::log_path())?;
    info!(path = %config_store.path().display(), ?config, "starting");
    if cli.config.is_none() && !config_store.path().exists() {
        if let Err(e) = config_store.save(&Config::default()) {
            warn!(error = %e, "could not write default config");
        }
    }

    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());
    let mut app = App::new(
        config.clone(),
        cli.delay_generator(&config),
        Collaborators::from_config(&config),
        open_store(),
        runner.sender(),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, &runner, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res
}

fn draw<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> io::Result<()> {
    terminal.draw(|f| current_screen(app.game.phase()).render(app, f))?;
    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    runner: &Runner<CrosstermEventSource, FixedTicker>,
    app: &mut App,
) -> Result<(), Box<dyn Error>> {
    draw(terminal, app)?;

    loop {
        let event = runner.step();
        match app.handle_event(event, Instant::now()) {
            Flow::Quit => break,
            Flow::Redraw => draw(terminal, app)?,
            Flow::Skip => {}
        }
    }

    info!("exiting");
    Ok(())
}
