// flowdeck - terminal dashboard for a traffic/flow visualization backend
// Fetches timeline, flow, stats and band fragments for a time window and
// keeps them fresh while the window is live.

mod app;
mod dom;
mod net;
mod scheduler;
mod theme;
mod ui;
mod window;

use anyhow::{Context, Result};
use app::{event::handle_terminal_event, Dashboard, Screen};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dom::HoverController;
use futures::StreamExt;
use net::{FragmentClient, FragmentSource};
use ratatui::{backend::CrosstermBackend, Terminal};
use scheduler::RefreshScheduler;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use window::SystemClock;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = app::config::Cli::parse().into_config()?;
    init_logging(config.log_file.as_deref())?;
    let client = FragmentClient::new(config.base_url.clone(), config.timeout)
        .context("failed to build HTTP client")?;
    tracing::info!(base = %client.base(), variant = ?config.variant, "starting dashboard");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, config, Arc::new(client)).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "dashboard exited with error");
        println!("Error: {:?}", err);
    }
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    config: app::DashboardConfig,
    source: Arc<dyn FragmentSource>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let size = terminal.size()?;
    let screen = Screen::detect(size.width, size.height);
    let scheduler = RefreshScheduler::new(
        source,
        Arc::new(SystemClock),
        tx,
        config.schedule(),
        HoverController::default(),
        screen.viewport(),
    );
    let mut app = Dashboard::new(config, scheduler, screen);
    app.start();

    let mut terminal_events = EventStream::new();
    loop {
        terminal.draw(|f| ui::draw(f, &mut app))?;

        if !app.running {
            return Ok(());
        }

        // Wake once more when the cadence highlight expires
        let highlight = app.config.highlight_remaining();

        tokio::select! {
            maybe_event = terminal_events.next() => match maybe_event {
                Some(Ok(event)) => {
                    handle_terminal_event(&mut app, event);
                }
                Some(Err(e)) => {
                    app.teardown();
                    return Err(e).context("terminal input failed");
                }
                None => app.teardown(),
            },
            Some(event) = rx.recv() => app.handle_scheduler_event(event),
            _ = tokio::time::sleep(highlight.unwrap_or_default()), if highlight.is_some() => {}
        }
    }
}

/// Log to `path` when given; the terminal itself is owned by the dashboard
fn init_logging(path: Option<&Path>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    tracing::info!(log_file = %path.display(), "logging initialized");
    Ok(())
}
