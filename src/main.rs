use std::io::{self, Stdout};
use std::panic;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{error, info};

mod animation;
mod app;
mod config;
mod controller;
mod document;
mod input;
mod logging;
mod models;
mod page;
mod placement;
mod template;
mod theme;
mod ui;
mod utils;

use crate::app::App;
use crate::config::Settings;
use crate::logging::LogLevel;
use crate::models::Variant;

#[derive(Parser, Debug)]
#[command(version, about = "A page with anchored contact popups")]
struct Args {
    /// Extra config file, applied over the built-in and discovered ones.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use this popup variant for every link.
    #[arg(long, value_enum)]
    variant: Option<Variant>,

    /// Write logs to this file. Without it nothing is logged.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Print the merged configuration as TOML and exit.
    #[arg(long)]
    dump_config: bool,
}

type Term = Terminal<CrosstermBackend<Stdout>>;

fn setup_terminal() -> Result<Term> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    Ok(())
}

/// Puts the terminal back before the default hook prints the panic.
fn install_panic_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
        default_hook(info);
    }));
}

fn run(terminal: &mut Term, settings: &Settings) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(settings, i32::from(size.width), i32::from(size.height));
    info!(width = size.width, height = size.height, "terminal ready");

    let mut open_link = |href: &str| open::that_detached(href);
    loop {
        let now = Instant::now();
        app.tick(now);
        terminal.draw(|f| ui::render(f, &app, now))?;

        if event::poll(app.poll_timeout(Instant::now()))? {
            let event = event::read()?;
            if !input::handle_event(&mut app, event, Instant::now(), &mut open_link) {
                return Ok(());
            }
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref(), args.log_level.into())?;

    let mut settings = Settings::load(args.config.as_deref()).context("loading configuration")?;
    if let Some(variant) = args.variant {
        settings.override_variant(variant);
    }
    settings.validate().context("invalid configuration")?;

    if args.dump_config {
        print!("{}", settings.to_toml().context("serializing configuration")?);
        return Ok(());
    }

    install_panic_hook();
    let mut terminal = setup_terminal()?;
    let result = run(&mut terminal, &settings);
    restore_terminal(&mut terminal)?;
    if let Err(err) = &result {
        error!(%err, "event loop failed");
    }
    result
}
