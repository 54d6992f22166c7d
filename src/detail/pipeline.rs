//! Selection Detail Pipeline
//!
//! One worker thread, one transform, a generation counter owned by the
//! consumer side.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::error::{Result, VtError};

use super::{
    DetailOutcome, DetailRequest, DetailTransform, DetailView, TransformError, FAILURE_PREFIX,
};

/// Commands accepted by the detail worker
#[derive(Debug)]
enum DetailCommand {
    Compute(DetailRequest),
    Close,
}

/// Counters kept by the detail worker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailStats {
    /// Requests the transform actually ran for
    pub computed: u64,

    /// Queued requests dropped because a newer one was waiting behind them
    pub skipped: u64,

    /// Transform runs that panicked
    pub panics: u64,
}

/// Background detail computation with discard-on-arrival
pub struct SelectionDetailPipeline {
    /// Generation of the most recent selection
    generation: u64,
    /// Currently displayed state
    view: DetailView,
    /// Queue into the worker
    requests: Sender<DetailCommand>,
    /// Outcomes from the worker
    outcomes: Receiver<DetailOutcome>,
    /// Counters updated by the worker
    stats: Arc<Mutex<DetailStats>>,
    /// Worker thread (None once joined)
    handle: Option<JoinHandle<()>>,
}

impl SelectionDetailPipeline {
    /// Start the detail worker with `transform`
    pub fn spawn<T>(transform: T) -> Result<Self>
    where
        T: DetailTransform + Send + 'static,
    {
        let (request_tx, request_rx) = channel::unbounded();
        let (outcome_tx, outcome_rx) = channel::unbounded();
        let stats = Arc::new(Mutex::new(DetailStats::default()));

        let worker_stats = Arc::clone(&stats);
        let handle = thread::Builder::new()
            .name("detail-worker".to_string())
            .spawn(move || worker_loop(transform, request_rx, outcome_tx, worker_stats))?;

        Ok(Self {
            generation: 0,
            view: DetailView::Empty,
            requests: request_tx,
            outcomes: outcome_rx,
            stats,
            handle: Some(handle),
        })
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// New selection: `Some((key, value))` submits work, `None` clears the pane
    ///
    /// Either way every earlier request becomes stale. Returns the new
    /// generation.
    pub fn select(&mut self, selection: Option<(u64, String)>) -> Result<u64> {
        self.generation += 1;

        let Some((key, value)) = selection else {
            self.view = DetailView::Empty;
            return Ok(self.generation);
        };

        self.view = DetailView::Loading;
        let request = DetailRequest {
            generation: self.generation,
            key,
            value,
        };
        if self.requests.send(DetailCommand::Compute(request)).is_err() {
            self.view = DetailView::Failed(format!("{}worker stopped", FAILURE_PREFIX));
            return Err(VtError::WorkerClosed("detail worker stopped".to_string()));
        }

        tracing::trace!("Submitted detail for key {} (generation {})", key, self.generation);
        Ok(self.generation)
    }

    /// The selected row has no data yet: show `Loading` and stale out
    /// whatever is in flight
    pub fn mark_loading(&mut self) -> u64 {
        self.generation += 1;
        self.view = DetailView::Loading;
        self.generation
    }

    // =========================================================================
    // Outcomes
    // =========================================================================

    /// Apply every outcome that has arrived; returns whether the view changed
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.outcomes.try_recv() {
            changed |= self.apply(outcome);
        }
        changed
    }

    /// Wait up to `timeout` for the outcome of the current generation
    ///
    /// Stale outcomes arriving in the meantime are discarded. Returns whether
    /// the view changed.
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut changed = false;

        while !changed {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.outcomes.recv_timeout(remaining) {
                Ok(outcome) => changed = self.apply(outcome),
                Err(_) => break,
            }
        }

        self.poll() || changed
    }

    pub fn view(&self) -> &DetailView {
        &self.view
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn stats(&self) -> DetailStats {
        self.stats.lock().clone()
    }

    /// Stop the worker and wait for it to exit
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        let _ = self.requests.send(DetailCommand::Close);
        handle
            .join()
            .map_err(|_| VtError::WorkerClosed("detail worker panicked".to_string()))?;
        tracing::debug!("Detail worker joined");
        Ok(())
    }

    fn apply(&mut self, outcome: DetailOutcome) -> bool {
        if outcome.generation != self.generation {
            tracing::trace!(
                "Discarding stale detail (generation {}, current {})",
                outcome.generation,
                self.generation
            );
            return false;
        }

        self.view = match outcome.result {
            Ok(text) => DetailView::Ready(text),
            Err(message) => DetailView::Failed(format!("{}{}", FAILURE_PREFIX, message)),
        };
        true
    }
}

impl Drop for SelectionDetailPipeline {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Detail worker shutdown failed: {}", e);
        }
    }
}

// =============================================================================
// Worker Thread
// =============================================================================

fn worker_loop<T: DetailTransform>(
    transform: T,
    requests: Receiver<DetailCommand>,
    outcomes: Sender<DetailOutcome>,
    stats: Arc<Mutex<DetailStats>>,
) {
    while let Ok(command) = requests.recv() {
        let mut latest = match command {
            DetailCommand::Compute(request) => request,
            DetailCommand::Close => break,
        };

        // Only the newest queued request is worth running
        let mut closing = false;
        let mut skipped = 0;
        for queued in requests.try_iter() {
            match queued {
                DetailCommand::Compute(request) => {
                    latest = request;
                    skipped += 1;
                }
                DetailCommand::Close => {
                    closing = true;
                    break;
                }
            }
        }
        if closing {
            break;
        }

        let (result, panicked) = run_transform(&transform, &latest);
        {
            let mut stats = stats.lock();
            stats.computed += 1;
            stats.skipped += skipped;
            if panicked {
                stats.panics += 1;
            }
        }

        let outcome = DetailOutcome {
            generation: latest.generation,
            result,
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }

    tracing::debug!("Detail worker exiting");
}

/// Run the transform, mapping fallback, failure and panic to an outcome
fn run_transform<T: DetailTransform>(
    transform: &T,
    request: &DetailRequest,
) -> (std::result::Result<String, String>, bool) {
    let ran = panic::catch_unwind(AssertUnwindSafe(|| {
        transform.transform(request.key, &request.value)
    }));

    match ran {
        Ok(Ok(text)) => (Ok(text), false),
        Ok(Err(TransformError::Unimplemented)) => (Ok(request.value.clone()), false),
        Ok(Err(TransformError::Failed(message))) => {
            tracing::warn!("Detail transform failed for key {}: {}", request.key, message);
            (Err(message), false)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::warn!("Detail transform panicked for key {}: {}", request.key, message);
            (Err(message), true)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "transform panicked".to_string()
    }
}
