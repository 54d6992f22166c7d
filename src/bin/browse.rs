//! VTable Browse Binary
//!
//! Headless browsing session: jumps the viewport to each requested row,
//! waits for its window, selects it and prints the detail pane.

use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use vtable::{Column, Config, RawValue, Session};

/// How long to wait for a window or a detail before giving up on a row
const ROW_TIMEOUT: Duration = Duration::from_secs(10);

/// VTable Browser
#[derive(Parser, Debug)]
#[command(name = "vtable-browse")]
#[command(about = "Browse a VTable record store by row position")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./vtable_data")]
    data_dir: String,

    /// Rows per fetched window
    #[arg(short, long, default_value = "1000")]
    window_size: usize,

    /// Max resident windows
    #[arg(short, long, default_value = "8")]
    cache_capacity: usize,

    /// Row positions to visit (0-based)
    #[arg(short, long, num_args = 1..)]
    jump: Vec<u64>,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vtable=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("VTable Browse v{}", vtable::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let config = Config::builder()
        .data_dir(&args.data_dir)
        .window_size(args.window_size)
        .cache_capacity(args.cache_capacity)
        .build();

    if let Err(e) = run(&config, &args.jump) {
        tracing::error!("Browse failed: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config, jumps: &[u64]) -> vtable::Result<()> {
    let mut session = Session::open(config, RawValue)?;
    let total_rows = session.model().total_rows();
    println!("rows: {}", total_rows);

    if session.select_first_row_if_available()? {
        wait_for_row(&mut session, 0)?;
        print_row(&mut session, 0);
    }

    for &position in jumps {
        if position >= total_rows {
            println!("row {} is out of range (rows: {})", position, total_rows);
            continue;
        }
        session.select_row(Some(position))?;
        wait_for_row(&mut session, position)?;
        print_row(&mut session, position);
    }

    session.close()
}

/// Pump until the row is cached and its detail has settled, or time out
fn wait_for_row(session: &mut Session, position: u64) -> vtable::Result<()> {
    let deadline = Instant::now() + ROW_TIMEOUT;
    while session.model().cached_record(position).is_none() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            tracing::warn!("Timed out waiting for row {}", position);
            return Ok(());
        }
        for event in session.pump_wait(remaining)? {
            tracing::debug!("Model event: {:?}", event);
        }
    }

    let remaining = deadline.saturating_duration_since(Instant::now());
    session.wait_detail(remaining);
    Ok(())
}

fn print_row(session: &mut Session, position: u64) {
    let model = session.model_mut();
    let key = model.get_cell(position, Column::Key);
    let value = model.get_cell(position, Column::Value);
    match (key, value) {
        (Some(key), Some(value)) => {
            println!("#{}  id={}  value={}", model.row_header(position), key, value);
        }
        _ => println!("#{}  <not loaded>", model.row_header(position)),
    }
    println!("    detail: {}", session.detail_view());
}
