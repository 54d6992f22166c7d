//! VTable Seeder Binary
//!
//! Fills a record store up to a target row count.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};
use vtable::{ensure_store, Config};

/// VTable Seeder
#[derive(Parser, Debug)]
#[command(name = "vtable-seed")]
#[command(about = "Populate a VTable record store with random rows")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./vtable_data")]
    data_dir: String,

    /// Row count to reach
    #[arg(short, long, default_value = "3000000")]
    rows: u64,

    /// Rows appended per committed batch
    #[arg(short, long, default_value = "10000")]
    batch_size: usize,

    /// Fixed RNG seed for reproducible data
    #[arg(short, long)]
    seed: Option<u64>,
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

    tracing::info!("VTable Seeder v{}", vtable::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);

    let mut builder = Config::builder()
        .data_dir(&args.data_dir)
        .target_rows(args.rows)
        .batch_size(args.batch_size);
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    let config = builder.build();

    match ensure_store(&config) {
        Ok(report) => {
            println!(
                "existing: {}  inserted: {}  total: {}",
                report.existing, report.inserted, report.total
            );
        }
        Err(e) => {
            tracing::error!("Seeding failed: {}", e);
            std::process::exit(1);
        }
    }
}
