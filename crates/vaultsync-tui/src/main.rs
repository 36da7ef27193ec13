//! vaultsync - terminal dashboard for a vault session
//!
//! Built with Ratatui and crossterm.

mod app;
mod config;
mod handlers;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vaultsync_core::{Dashboard, MemoryBackend};

use app::{App, AppState};
use config::Config;

/// vaultsync - terminal dashboard for vault entries and categories
#[derive(Parser, Debug)]
#[command(name = "vaultsync")]
#[command(about = "A terminal dashboard for vault entries and categories")]
struct Args {
    /// Path to a config file (defaults to ~/.config/vaultsync/vaultsync.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed vault to load instead of the configured one
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Simulated backend latency in milliseconds
    #[arg(long)]
    latency_ms: Option<u64>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vaultsync_tui=info".parse()?))
        .with_writer(std::io::stderr) // Write logs to stderr to not interfere with TUI
        .init();

    let args = Args::parse();
    let mut config = Config::load(args.config)?;
    if let Some(seed) = args.seed {
        config.seed_path = Some(seed);
    }
    if let Some(latency_ms) = args.latency_ms {
        config.latency_ms = latency_ms;
    }

    let seed = config.load_seed()?;
    tracing::info!(
        "Starting vaultsync with {} entries, {}ms backend latency",
        seed.entries.len(),
        config.latency_ms
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let _guard = runtime.enter();

    let backend = MemoryBackend::from_seed(&seed);
    backend.set_latency_all(Duration::from_millis(config.latency_ms));
    let dashboard = Dashboard::mount(Arc::new(backend), config.sync.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(dashboard);

    // Main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    app.dashboard.unmount();
    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, app))?;

        // Poll for events with timeout for smooth updates
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handlers::handle_key(app, key) {
                    break;
                }
            }
        }

        // Check if we should quit
        if matches!(app.state, AppState::Quit) {
            break;
        }
    }

    Ok(())
}
