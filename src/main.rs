//! Math Adventure - AI-tutored grade 3 math practice in the terminal.

mod app;
mod catalog;
mod chat;
mod config;
mod models;
mod provider;
mod quiz;
mod ui;

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use app::App;
use config::Config;
use provider::TutorClient;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load();
    // Write the defaults on first run so the config file is discoverable.
    if Config::config_path().is_some_and(|p| !p.exists()) {
        if let Err(err) = config.save() {
            tracing::warn!(%err, "could not write default config");
        }
    }
    let client = match TutorClient::from_env(&config.provider) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(%err, "starting without a provider client");
            None
        }
    };
    let mut app = App::new(config, client);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }
                if app.handle_key(key) {
                    return Ok(());
                }
            }
        }

        // Apply completed provider calls.
        app.poll_events();
    }
}

fn init_logging() {
    let Some(path) = Config::log_path() else { return };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let Ok(file) = std::fs::File::create(&path) else { return };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("math_adventure=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
}
