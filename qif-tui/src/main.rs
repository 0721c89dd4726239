//! TUI entrypoint: renders a spike raster (time on X, neuron IDs on Y) and the
//! membrane trace of one neuron of a configured QIF population.
//! Controls: [s] Step, [r] Run/Pause, [q] Quit

mod app;
mod backend;
mod config;
mod logging;
mod ui;

use anyhow::Result;
use app::App;
use backend::{PopulationBackend, QifBackend};
use clap::Parser;
use config::{Cli, SimConfig};
use ui::draw;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event as CEvent, KeyCode},
    execute, terminal,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;

/// Ticks simulated by `--headless` when no tick count is configured.
const DEFAULT_HEADLESS_TICKS: u64 = 1000;
const RASTER_COLUMNS: usize = 80;
const FRAME: Duration = Duration::from_millis(100);

fn restore_terminal() -> Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    Ok(())
}

fn run_headless(mut backend: PopulationBackend, ticks: u64) -> Result<()> {
    let started = Instant::now();
    let mut spikes = 0u64;
    for _ in 0..ticks {
        spikes += backend.step()?.len() as u64;
    }
    info!(ticks, spikes, "headless run finished");
    println!(
        "ticks: {ticks}  neurons: {}  spikes: {spikes}  saturated: {}  elapsed: {:.2?}",
        backend.neurons(),
        backend.saturation_events(),
        started.elapsed()
    );
    Ok(())
}

/// Interactive session; the terminal is restored whether or not the loop fails.
fn run_interactive(backend: PopulationBackend, pause_at: Option<u64>) -> Result<()> {
    terminal::enable_raw_mode()?;
    execute!(io::stdout(), terminal::EnterAlternateScreen)?;

    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_terminal();
        default_hook(panic_info);
    }));

    let mut app = App::new(backend, RASTER_COLUMNS);
    app.pause_at = pause_at;
    let outcome = Terminal::new(CrosstermBackend::new(io::stdout()))
        .map_err(anyhow::Error::from)
        .and_then(|mut terminal| {
            terminal.clear()?;
            event_loop(&mut terminal, &mut app)
        });
    restore_terminal()?;

    info!(tick = app.backend.tick(), spikes = app.total_spikes, "session closed");
    outcome
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App<PopulationBackend>) -> Result<()> {
    let mut last_frame = Instant::now();
    loop {
        draw(terminal, app)?;

        let wait = FRAME.saturating_sub(last_frame.elapsed());
        if event::poll(wait)? {
            if let CEvent::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('s') => app.step(),
                    KeyCode::Char('r') => app.toggle_running(),
                    _ => {}
                }
            }
        }

        if last_frame.elapsed() >= FRAME {
            if app.running {
                app.step();
            }
            last_frame = Instant::now();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SimConfig::load(&cli)?;
    logging::init_logging(&config.logging.file, &config.logging.level)?;
    let backend = PopulationBackend::from_config(&config)?;

    if cli.headless {
        run_headless(backend, config.ticks.unwrap_or(DEFAULT_HEADLESS_TICKS))
    } else {
        run_interactive(backend, config.ticks)
    }
}
