//! # VTable
//!
//! A windowed browser over a multi-million-row record store:
//! - Position-addressable table model that never blocks on the store
//! - Fixed-size windows fetched by keyset pagination on one background thread
//! - Bounded FIFO window cache with duplicate-fetch suppression
//! - Selection detail computed off-thread, stale results dropped on arrival
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Session                             │
//! │             (selection ↔ detail, single close)              │
//! └───────────────┬─────────────────────────────┬───────────────┘
//!                 │                             │
//!                 ▼                             ▼
//!       ┌──────────────────┐          ┌──────────────────┐
//!       │ VirtualTable     │          │ SelectionDetail  │
//!       │ Model            │          │ Pipeline         │
//!       │  + ChunkCache    │          │ (detail-worker)  │
//!       └────────┬─────────┘          └──────────────────┘
//!                │ FetchRequest / ChunkLoaded
//!                ▼
//!       ┌──────────────────┐
//!       │   ChunkLoader    │
//!       │  (chunk-loader)  │
//!       └────────┬─────────┘
//!                │ KeysetReader::read_range
//!                ▼
//!       ┌──────────────────┐
//!       │   RecordStore    │
//!       │ records.dat/.idx │
//!       └──────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod store;
pub mod keyset;
pub mod cache;
pub mod loader;
pub mod model;
pub mod detail;
pub mod session;
pub mod seed;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VtError};
pub use config::{Config, SyncStrategy};
pub use keyset::KeysetReader;
pub use model::{CellValue, Column, ModelEvent, RowRange, VirtualTableModel};
pub use detail::{DetailTransform, DetailView, RawValue, SelectionDetailPipeline, TransformError};
pub use session::Session;
pub use seed::{ensure_store, SeedReport};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of VTable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
