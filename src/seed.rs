//! Store seeding
//!
//! Fills the record store up to `Config::target_rows` with random
//! alphanumeric values. Safe to run repeatedly: rows already present are
//! kept and only the shortfall is appended.

use rand::distributions::Alphanumeric;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::config::Config;
use crate::error::Result;
use crate::store::RecordWriter;

/// What `ensure_store` found and did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    /// Rows present before seeding
    pub existing: u64,
    /// Rows appended by this run
    pub inserted: u64,
    /// Rows present afterwards
    pub total: u64,
}

/// Bring the store in `config.data_dir` up to `config.target_rows` rows
pub fn ensure_store(config: &Config) -> Result<SeedReport> {
    config.validate()?;

    let mut writer = RecordWriter::open(
        &config.data_dir,
        config.index_interval,
        config.sync_strategy,
    )?;
    let existing = writer.count();

    if existing >= config.target_rows {
        tracing::info!(
            "Store already holds {} rows (target {}); nothing to seed",
            existing,
            config.target_rows
        );
        writer.close()?;
        return Ok(SeedReport {
            existing,
            inserted: 0,
            total: existing,
        });
    }

    let mut rng = match config.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_entropy(),
    };

    let missing = config.target_rows - existing;
    tracing::info!(
        "Seeding {} rows into {} (batches of {})",
        missing,
        config.data_dir.display(),
        config.batch_size
    );

    let mut inserted = 0u64;
    while inserted < missing {
        let batch = (missing - inserted).min(config.batch_size as u64) as usize;
        let values: Vec<String> = (0..batch)
            .map(|_| random_text(&mut rng, config.min_len, config.max_len))
            .collect();

        if let Some(keys) = writer.append_batch(values)? {
            tracing::debug!("Committed keys {}..={}", keys.start(), keys.end());
        }
        inserted += batch as u64;
    }

    let total = writer.count();
    writer.close()?;
    tracing::info!("Seeding complete: {} rows", total);

    Ok(SeedReport {
        existing,
        inserted,
        total,
    })
}

/// Random ASCII alphanumeric string with length in `[min_len, max_len]`
pub fn random_text<R: Rng>(rng: &mut R, min_len: usize, max_len: usize) -> String {
    let len = rng.gen_range(min_len..=max_len);
    rng.sample_iter(Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
