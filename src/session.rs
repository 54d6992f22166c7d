//! Browsing session
//!
//! Wires the table model to the detail pipeline the way a view controller
//! would: the current row's detail follows the selection, and a selection
//! made before its window was cached is re-submitted once the window lands.

use std::time::Duration;

use crate::config::Config;
use crate::detail::{DetailTransform, DetailView, SelectionDetailPipeline};
use crate::error::Result;
use crate::model::{ModelEvent, VirtualTableModel};

/// Table model plus detail pane for one open store
pub struct Session {
    model: VirtualTableModel,
    detail: SelectionDetailPipeline,
    /// Selected row, if any
    current_row: Option<u64>,
    /// The detail pane shows `Loading` until the current row's window arrives
    awaiting_row: bool,
}

impl Session {
    /// Open the store in `config.data_dir` and start both workers
    pub fn open<T>(config: &Config, transform: T) -> Result<Self>
    where
        T: DetailTransform + Send + 'static,
    {
        let model = VirtualTableModel::open(config)?;
        let detail = SelectionDetailPipeline::spawn(transform)?;
        Ok(Self::from_parts(model, detail))
    }

    /// Assemble a session from an existing model and pipeline
    pub fn from_parts(model: VirtualTableModel, detail: SelectionDetailPipeline) -> Self {
        Self {
            model,
            detail,
            current_row: None,
            awaiting_row: false,
        }
    }

    /// Change the selection
    ///
    /// Panics if `row` is outside the table.
    pub fn select_row(&mut self, row: Option<u64>) -> Result<()> {
        self.current_row = row;
        match row {
            Some(position) => self.submit_detail(position),
            None => {
                self.awaiting_row = false;
                self.detail.select(None)?;
                Ok(())
            }
        }
    }

    /// Select row 0 if the table has any rows; returns whether it did
    pub fn select_first_row_if_available(&mut self) -> Result<bool> {
        if self.model.total_rows() == 0 {
            return Ok(false);
        }
        self.select_row(Some(0))?;
        Ok(true)
    }

    /// Apply arrived window fetches and detail outcomes without waiting
    pub fn pump(&mut self) -> Result<Vec<ModelEvent>> {
        let events = self.model.process_completions();
        self.follow_events(&events)?;
        self.detail.poll();
        Ok(events)
    }

    /// Like `pump`, but wait up to `timeout` for the first window fetch
    pub fn pump_wait(&mut self, timeout: Duration) -> Result<Vec<ModelEvent>> {
        let events = self.model.wait_for_completions(timeout);
        self.follow_events(&events)?;
        self.detail.poll();
        Ok(events)
    }

    /// Wait up to `timeout` for the detail of the current selection
    pub fn wait_detail(&mut self, timeout: Duration) -> bool {
        self.detail.wait(timeout)
    }

    /// Clear failed windows; re-requests the current row's window if the
    /// detail pane is waiting on it
    pub fn retry_failed(&mut self) -> usize {
        let cleared = self.model.retry_failed();
        if let (true, Some(position)) = (self.awaiting_row, self.current_row) {
            let _ = self.model.get_record(position);
        }
        cleared
    }

    pub fn current_row(&self) -> Option<u64> {
        self.current_row
    }

    pub fn detail_view(&self) -> &DetailView {
        self.detail.view()
    }

    pub fn model(&self) -> &VirtualTableModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut VirtualTableModel {
        &mut self.model
    }

    pub fn detail(&self) -> &SelectionDetailPipeline {
        &self.detail
    }

    /// Stop the detail worker, then the loader
    ///
    /// Once this returns no thread holds a store handle.
    pub fn close(self) -> Result<()> {
        let Session { model, detail, .. } = self;
        detail.close()?;
        model.close()?;
        tracing::info!("Session closed");
        Ok(())
    }

    fn submit_detail(&mut self, position: u64) -> Result<()> {
        let selection = self
            .model
            .get_record(position)
            .map(|record| (record.key, record.value.clone()));

        match selection {
            Some(selection) => {
                self.awaiting_row = false;
                self.detail.select(Some(selection))?;
            }
            None => {
                self.awaiting_row = true;
                self.detail.mark_loading();
            }
        }
        Ok(())
    }

    fn follow_events(&mut self, events: &[ModelEvent]) -> Result<()> {
        let Some(position) = self.current_row.filter(|_| self.awaiting_row) else {
            return Ok(());
        };

        let covered = events.iter().any(|event| match event {
            ModelEvent::RowsChanged(range) => range.contains(position),
            ModelEvent::FetchFailed { .. } => false,
        });
        if covered {
            tracing::debug!("Row {} arrived; submitting its detail", position);
            self.submit_detail(position)?;
        }
        Ok(())
    }
}
