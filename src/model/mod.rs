//! Model Module
//!
//! Position-addressable table façade consumed by the UI layer.
//!
//! ## Responsibilities
//! - Turn "cell at row p" into a cache lookup, never blocking
//! - Trigger background fetches on misses, one per window
//! - Apply fetch results on the consumer thread and report which rows
//!   became available

mod table;

pub use table::VirtualTableModel;

use std::fmt;

use crate::store::Record;

/// Columns exposed by the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Store-assigned key (`id`)
    Key,
    /// Row payload (`value`)
    Value,
}

impl Column {
    /// All columns in display order
    pub const ALL: [Column; 2] = [Column::Key, Column::Value];

    /// Column at display index `index`
    pub fn from_index(index: usize) -> Option<Column> {
        Self::ALL.get(index).copied()
    }

    /// Display index of this column
    pub fn index(self) -> usize {
        match self {
            Column::Key => 0,
            Column::Value => 1,
        }
    }

    /// Horizontal header label
    pub fn header(self) -> &'static str {
        match self {
            Column::Key => "id",
            Column::Value => "value",
        }
    }
}

/// Value of one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Key(u64),
    Value(String),
}

impl CellValue {
    /// Project one column out of a record
    pub fn from_record(record: &Record, column: Column) -> Self {
        match column {
            Column::Key => CellValue::Key(record.key),
            Column::Value => CellValue::Value(record.value.clone()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Key(key) => write!(f, "{}", key),
            CellValue::Value(value) => f.write_str(value),
        }
    }
}

/// Inclusive range of absolute rows, spanning every column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub first: u64,
    pub last: u64,
}

impl RowRange {
    pub fn new(first: u64, last: u64) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, row: u64) -> bool {
        self.first <= row && row <= self.last
    }

    /// Number of rows covered (never zero)
    pub fn row_count(&self) -> u64 {
        self.last - self.first + 1
    }
}

/// Notification emitted while applying fetch results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// These rows became readable; re-read them
    RowsChanged(RowRange),

    /// The fetch for a window failed; its rows stay unavailable until
    /// `retry_failed` is called
    FetchFailed { window_start: u64, error: String },
}
