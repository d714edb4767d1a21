//! Supply Chain Flow Demo
//!
//! A supplier → warehouse → customer board drawn in the terminal with live
//! flow edges between the tiles.
//! - Space steps one simulated day (four pulse trains)
//! - `a` toggles auto mode, one day every 1.2 seconds
//! - `f` flashes the next edge
//! - `q`, Esc or Ctrl-C quits
//!
//! Set `FLOWPULSE_LOG=debug` to see engine activity in `supply_chain.log`.

mod board;
mod error;
mod sim;

use board::Board;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use error::Result;
use flowpulse_core::{
    Clock, EventBus, FlowEmitter, OverlayController, StaticRegions, SystemClock,
};
use flowpulse_term::{Canvas, CellScale, TermSurface, Tone};
use sim::{DemoConfig, Simulation};
use std::fs::File;
use std::io::{stdout, Stdout};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, trace, warn};
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "supply_chain.log";
const FRAME_INTERVAL_MS: u64 = 16;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    let config = DemoConfig::load()?;

    terminal::enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, Hide)?;

    let result = run(&mut stdout, config);

    execute!(stdout, Show, LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    if let Err(err) = &result {
        warn!(error = %err, "demo exited with error");
    }
    result?;
    Ok(())
}

/// Log to a file; the terminal belongs to the board
fn init_logging() -> Result<()> {
    let file = File::create(LOG_FILE)?;
    let filter = EnvFilter::try_from_env("FLOWPULSE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(stdout: &mut Stdout, config: DemoConfig) -> Result<()> {
    let scale = CellScale::default();
    let (width, height) = terminal::size()?;
    let mut board = Board::layout(width, height);

    let layout = StaticRegions::new(board.origin(scale));
    layout.resize_window(board.origin(scale), board.regions(scale));

    let clock = SystemClock::new();
    let bus = EventBus::new();
    let emitter = FlowEmitter::new(bus.clone());
    let mut sim = Simulation::new(config.day.clone());

    let mut overlay = OverlayController::new(config.overlay, layout.clone(), bus, clock);
    overlay.attach()?;
    info!(width, height, anchors = overlay.anchors().len(), "board ready");

    let mut surface = TermSurface::new(stdout, Canvas::new(width, height, scale));
    board.paint(surface.canvas_mut());

    let mut next_flash = 0usize;
    loop {
        if event::poll(Duration::from_millis(FRAME_INTERVAL_MS))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => break,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                    KeyCode::Char(' ') | KeyCode::Char('s') => {
                        sim.step(clock.now(), &emitter);
                    }
                    KeyCode::Char('a') => sim.toggle_auto(clock.now()),
                    KeyCode::Char('f') => {
                        let edges = overlay.edges();
                        if !edges.is_empty() {
                            let edge = &edges[next_flash % edges.len()];
                            emitter.request_flash(edge.from.clone(), edge.to.clone());
                            next_flash = next_flash.wrapping_add(1);
                        }
                    }
                    _ => {}
                },
                Event::Resize(width, height) => {
                    board = Board::layout(width, height);
                    surface.resize(width, height);
                    board.paint(surface.canvas_mut());
                    layout.resize_window(board.origin(scale), board.regions(scale));
                    trace!(width, height, "terminal resized");
                }
                _ => {}
            }
        }

        sim.update(clock.now(), &emitter);
        draw_status(surface.canvas_mut(), &sim, overlay.live_pulses().len());

        match overlay.tick(&mut surface) {
            Ok(report) if report.item_failures + report.surface_failures > 0 => {
                trace!(report = ?report, "frame drawn with failures");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "frame failed"),
        }
    }

    overlay.dispose();
    info!(days = sim.day(), "demo finished");
    Ok(())
}

fn draw_status(canvas: &mut Canvas, sim: &Simulation, live: usize) {
    let width = canvas.width() as usize;
    let bottom = canvas.height().saturating_sub(1);

    let status = format!(
        " Flowpulse supply chain | Day {} | auto {} | pulses {}",
        sim.day(),
        if sim.is_auto() { "on" } else { "off" },
        live
    );
    canvas.text(0, 0, &format!("{:<width$}", status, width = width), Tone::Status);

    let help = " space step | a auto | f flash | q quit";
    canvas.text(0, bottom, &format!("{:<width$}", help, width = width), Tone::Status);
}
