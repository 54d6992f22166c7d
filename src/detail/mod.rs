//! Detail Module
//!
//! Computes a derived text for the selected row off the consumer thread and
//! keeps only the answer to the most recent selection.
//!
//! ## Generation rule
//! ```text
//!   select(A) ─▶ gen 1 ──▶ worker ──▶ outcome(gen 1) ─┐
//!   select(B) ─▶ gen 2 ──▶ worker ──▶ outcome(gen 2) ─┤
//!                                                     ▼
//!                              applied only if gen == current
//! ```
//!
//! Nothing is cancelled. Work for an old selection either never starts (the
//! worker skips to the newest queued request) or finishes and is dropped
//! when it arrives.

mod pipeline;
mod transform;

pub use pipeline::{DetailStats, SelectionDetailPipeline};
pub use transform::{DetailTransform, RawValue, TransformError};

use std::fmt;

/// Prefix of every failure shown in the detail pane
pub const FAILURE_PREFIX: &str = "detail computation failed: ";

/// One unit of detail work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    /// Generation current when the request was made
    pub generation: u64,
    pub key: u64,
    pub value: String,
}

/// What came back from the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailOutcome {
    /// Generation of the request this answers
    pub generation: u64,

    /// Detail text, or the failure message
    pub result: Result<String, String>,
}

/// What the detail pane shows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailView {
    /// Nothing selected
    #[default]
    Empty,
    /// Waiting for row data or for the worker
    Loading,
    Ready(String),
    /// Full failure text, including `FAILURE_PREFIX`
    Failed(String),
}

impl fmt::Display for DetailView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailView::Empty => Ok(()),
            DetailView::Loading => f.write_str("Loading..."),
            DetailView::Ready(text) | DetailView::Failed(text) => f.write_str(text),
        }
    }
}
